use std::{
	collections::{HashMap, HashSet},
	fs::File,
	io::{BufRead, BufReader},
	path::Path,
};

use hybrank_config::MalformedRecords;

use crate::{Error, Result, Run};

const FIELD_COUNT: usize = 6;

/// One parsed line of a run file.
#[derive(Clone, Debug, PartialEq)]
pub struct Record<'a> {
	pub query_id: &'a str,
	pub doc_id: &'a str,
	pub rank: u32,
	pub score: f64,
	pub method_tag: &'a str,
}

#[derive(Debug, Default)]
pub struct ReadReport {
	/// Records appended to the run.
	pub records: usize,
	/// Records dropped under [`MalformedRecords::Skip`], in file order.
	pub skipped: Vec<Error>,
}

pub fn read_run(path: &Path, policy: MalformedRecords) -> Result<(Run, ReadReport)> {
	let file = File::open(path).map_err(Error::io(path))?;

	parse_run(BufReader::new(file), path, policy)
}

/// Builds a run from `reader`, appending records in input order. `source` only labels errors.
pub fn parse_run<R>(reader: R, source: &Path, policy: MalformedRecords) -> Result<(Run, ReadReport)>
where
	R: BufRead,
{
	let mut run = Run::new();
	let mut report = ReadReport::default();
	let mut seen: HashMap<String, HashSet<String>> = HashMap::new();

	for (idx, line) in reader.lines().enumerate() {
		let line = line.map_err(Error::io(source))?;
		let line_no = idx + 1;

		if line.trim().is_empty() {
			continue;
		}

		let parsed = parse_record(&line, source, line_no).and_then(|record| {
			let docs = seen.entry(record.query_id.to_string()).or_default();

			if docs.insert(record.doc_id.to_string()) {
				Ok(record)
			} else {
				Err(Error::Parse {
					path: source.to_path_buf(),
					line: line_no,
					field: "doc_id",
					message: format!(
						"duplicate doc_id {:?} for query {:?}",
						record.doc_id, record.query_id
					),
				})
			}
		});

		match parsed {
			Ok(record) => {
				run.list_mut(record.query_id).push(record.doc_id, record.score);

				report.records += 1;
			},
			Err(err) => match policy {
				MalformedRecords::Abort => return Err(err),
				MalformedRecords::Skip => {
					tracing::warn!(error = %err, "Skipping malformed run record.");

					report.skipped.push(err);
				},
			},
		}
	}

	tracing::debug!(
		source = %source.display(),
		queries = run.len(),
		records = report.records,
		skipped = report.skipped.len(),
		"Read run."
	);

	Ok((run, report))
}

pub fn parse_record<'a>(line: &'a str, source: &Path, line_no: usize) -> Result<Record<'a>> {
	let malformed = |field: &'static str, message: String| Error::Parse {
		path: source.to_path_buf(),
		line: line_no,
		field,
		message,
	};
	let fields: Vec<&str> = line.split_whitespace().collect();

	if fields.len() != FIELD_COUNT {
		return Err(malformed(
			"record",
			format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
		));
	}

	let rank = fields[3]
		.parse::<u32>()
		.ok()
		.filter(|rank| *rank > 0)
		.ok_or_else(|| malformed("rank", format!("{:?} is not a positive integer", fields[3])))?;
	let score = fields[4]
		.parse::<f64>()
		.map_err(|err| malformed("score", format!("{:?} is not a number: {err}", fields[4])))?;

	Ok(Record { query_id: fields[0], doc_id: fields[2], rank, score, method_tag: fields[5] })
}
