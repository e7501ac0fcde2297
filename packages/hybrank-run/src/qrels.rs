use std::{
	collections::{HashMap, HashSet},
	fs::File,
	io::{BufRead, BufReader},
	path::Path,
};

use crate::{Error, Result, Run};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Judgment {
	pub doc_id: String,
	pub relevance: i32,
}

/// Relevance judgments keyed by query, with queries kept in file order.
#[derive(Clone, Debug, Default)]
pub struct Qrels {
	order: Vec<String>,
	judgments: HashMap<String, Vec<Judgment>>,
}
impl Qrels {
	pub fn query_ids(&self) -> &[String] {
		&self.order
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	pub fn judgments(&self, query_id: &str) -> &[Judgment] {
		self.judgments.get(query_id).map(Vec::as_slice).unwrap_or_default()
	}

	/// Doc ids judged with a positive grade.
	pub fn relevant(&self, query_id: &str) -> HashSet<&str> {
		self.judgments(query_id)
			.iter()
			.filter(|judgment| judgment.relevance > 0)
			.map(|judgment| judgment.doc_id.as_str())
			.collect()
	}
}

pub fn read_qrels(path: &Path) -> Result<Qrels> {
	let file = File::open(path).map_err(Error::io(path))?;

	parse_qrels(BufReader::new(file), path)
}

/// Accepts `query_id iteration doc_id relevance` records, whitespace separated.
pub fn parse_qrels<R>(reader: R, source: &Path) -> Result<Qrels>
where
	R: BufRead,
{
	let mut qrels = Qrels::default();

	for (idx, line) in reader.lines().enumerate() {
		let line = line.map_err(Error::io(source))?;
		let fields: Vec<&str> = line.split_whitespace().collect();

		if fields.is_empty() {
			continue;
		}

		let malformed = |field: &'static str, message: String| Error::Parse {
			path: source.to_path_buf(),
			line: idx + 1,
			field,
			message,
		};

		if fields.len() != 4 {
			return Err(malformed("record", format!("expected 4 fields, found {}", fields.len())));
		}

		let relevance = fields[3].parse::<i32>().map_err(|err| {
			malformed("relevance", format!("{:?} is not an integer: {err}", fields[3]))
		})?;
		let query_id = fields[0];

		if !qrels.judgments.contains_key(query_id) {
			qrels.order.push(query_id.to_string());
		}

		qrels
			.judgments
			.entry(query_id.to_string())
			.or_default()
			.push(Judgment { doc_id: fields[2].to_string(), relevance });
	}

	Ok(qrels)
}

/// Keeps `query_ids` order, dropping queries the run has no list for.
pub fn select_queries<'a, I>(query_ids: I, run: &Run) -> Vec<String>
where
	I: IntoIterator<Item = &'a String>,
{
	let mut seen = HashSet::new();
	let mut selected = Vec::new();

	for query_id in query_ids {
		if run.contains(query_id) && seen.insert(query_id.as_str()) {
			selected.push(query_id.clone());
		}
	}

	selected
}
