use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("I/O failure on {path:?}.")]
	Io { path: PathBuf, source: std::io::Error },
	#[error("Malformed record at {path:?} line {line} ({field}): {message}")]
	Parse { path: PathBuf, line: usize, field: &'static str, message: String },
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
impl Error {
	pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self {
		move |source| Self::Io { path: path.to_path_buf(), source }
	}
}
