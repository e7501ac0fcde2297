use std::{
	collections::HashSet,
	fs::File,
	io::{BufRead, BufReader, BufWriter, Write},
	path::Path,
};

use crate::{Error, Result};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SubsetReport {
	pub read: usize,
	pub kept: usize,
}

/// One id per line; surrounding whitespace and blank lines are ignored.
pub fn read_id_set(path: &Path) -> Result<HashSet<String>> {
	let file = File::open(path).map_err(Error::io(path))?;
	let mut ids = HashSet::new();

	for line in BufReader::new(file).lines() {
		let line = line.map_err(Error::io(path))?;
		let id = line.trim();

		if !id.is_empty() {
			ids.insert(id.to_string());
		}
	}

	Ok(ids)
}

/// Copies the `doc_id<TAB>text` lines of `collection` whose id is in `ids` to `out`.
pub fn filter_collection(collection: &Path, ids: &HashSet<String>, out: &Path) -> Result<SubsetReport> {
	let input = File::open(collection).map_err(Error::io(collection))?;
	let output = File::create(out).map_err(Error::io(out))?;
	let mut writer = BufWriter::new(output);
	let mut report = SubsetReport::default();

	for line in BufReader::new(input).lines() {
		let line = line.map_err(Error::io(collection))?;

		report.read += 1;

		if keep_line(&line, ids) {
			writeln!(writer, "{line}").map_err(Error::io(out))?;

			report.kept += 1;
		}
	}

	writer.flush().map_err(Error::io(out))?;

	tracing::info!(read = report.read, kept = report.kept, "Filtered collection.");

	Ok(report)
}

fn keep_line(line: &str, ids: &HashSet<String>) -> bool {
	let doc_id = line.trim().split('\t').next().unwrap_or_default();

	!doc_id.is_empty() && ids.contains(doc_id)
}
