use std::{
	fs::File,
	io::{BufWriter, Write},
	path::Path,
};

use crate::{Error, PLACEHOLDER, Result, Run};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
	pub queries: usize,
	pub records: usize,
	/// Requested query ids that the run had no list for.
	pub missing: Vec<String>,
}

/// Writes `run` to `path`, visiting queries in the order of `query_ids`.
pub fn write_run<S>(path: &Path, run: &Run, query_ids: &[S], method_tag: &str) -> Result<WriteReport>
where
	S: AsRef<str>,
{
	hybrank_config::validate_method_tag("method tag", method_tag)
		.map_err(|err| Error::InvalidArgument(err.to_string()))?;

	let file = File::create(path).map_err(Error::io(path))?;
	let mut out = BufWriter::new(file);
	let report = write_records(&mut out, run, query_ids, method_tag).map_err(Error::io(path))?;

	out.flush().map_err(Error::io(path))?;

	tracing::debug!(
		path = %path.display(),
		queries = report.queries,
		records = report.records,
		"Wrote run."
	);

	Ok(report)
}

/// Emits one record per (query, rank). Each list is written in its stored order.
pub fn write_records<W, S>(
	out: &mut W,
	run: &Run,
	query_ids: &[S],
	method_tag: &str,
) -> std::io::Result<WriteReport>
where
	W: Write,
	S: AsRef<str>,
{
	let mut report = WriteReport::default();

	for query_id in query_ids {
		let query_id = query_id.as_ref();
		let Some(list) = run.get(query_id) else {
			tracing::debug!(query_id, "Query has no ranked list; nothing written.");

			report.missing.push(query_id.to_string());

			continue;
		};

		for (rank, doc) in list.ranked() {
			writeln!(out, "{query_id} {PLACEHOLDER} {} {rank} {} {method_tag}", doc.doc_id, doc.score)?;
		}

		report.queries += 1;
		report.records += list.len();
	}

	Ok(report)
}
