use std::{fmt, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{kind} {id:?} not found in {within}.")]
	Lookup { kind: LookupKind, id: String, within: &'static str },
	#[error("Dimension mismatch for {context}: expected {expected}, found {actual}.")]
	Dimension { context: String, expected: usize, actual: usize },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("ANN adapter error: {message}")]
	Adapter { message: String },
	#[error("I/O failure on {path:?}.")]
	Io { path: PathBuf, source: std::io::Error },
	#[error("Malformed embedding record at {path:?} line {line}: {message}")]
	Parse { path: PathBuf, line: usize, message: String },
	#[error(transparent)]
	ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
	Query,
	QueryEmbedding,
	DocEmbedding,
}
impl fmt::Display for LookupKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			Self::Query => "Query",
			Self::QueryEmbedding => "Query embedding",
			Self::DocEmbedding => "Document embedding",
		};

		f.write_str(label)
	}
}
