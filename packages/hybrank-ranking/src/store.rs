use std::{
	collections::HashMap,
	fs::File,
	io::{BufRead, BufReader},
	path::Path,
};

use serde::Deserialize;

use crate::{Error, Result};

/// Ids paired with fixed-width vectors: `ids[i]` owns row `i`.
///
/// A store is fully built by its constructor and exposes no mutation, so it can be shared by
/// reference across worker threads.
#[derive(Clone, Debug)]
pub struct EmbeddingStore {
	ids: Vec<String>,
	vectors: Vec<f32>,
	dimension: usize,
	index: HashMap<String, usize>,
}
impl EmbeddingStore {
	pub fn new(ids: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
		if ids.len() != vectors.len() {
			return Err(Error::InvalidConfig {
				message: format!(
					"Embedding store has {} ids but {} vectors.",
					ids.len(),
					vectors.len()
				),
			});
		}

		let dimension = vectors.first().map(Vec::len).unwrap_or(0);
		let mut flat = Vec::with_capacity(dimension * vectors.len());

		for (id, vector) in ids.iter().zip(&vectors) {
			if vector.len() != dimension {
				return Err(Error::Dimension {
					context: format!("embedding {id:?}"),
					expected: dimension,
					actual: vector.len(),
				});
			}

			flat.extend_from_slice(vector);
		}

		Self::from_flat(ids, flat, dimension)
	}

	/// `vectors` is row-major with `dimension` values per id.
	pub fn from_flat(ids: Vec<String>, vectors: Vec<f32>, dimension: usize) -> Result<Self> {
		if ids.is_empty() {
			return Err(Error::InvalidConfig {
				message: "Embedding store must contain at least one vector.".to_string(),
			});
		}
		if dimension == 0 {
			return Err(Error::InvalidConfig {
				message: "Embedding dimension must be greater than zero.".to_string(),
			});
		}
		if vectors.len() != ids.len() * dimension {
			return Err(Error::InvalidConfig {
				message: format!(
					"Embedding store expected {} values for {} ids of dimension {dimension}, found {}.",
					ids.len() * dimension,
					ids.len(),
					vectors.len()
				),
			});
		}

		let mut index = HashMap::with_capacity(ids.len());

		for (row, id) in ids.iter().enumerate() {
			if index.insert(id.clone(), row).is_some() {
				return Err(Error::InvalidConfig {
					message: format!("Embedding id {id:?} appears more than once."),
				});
			}
		}

		Ok(Self { ids, vectors, dimension, index })
	}

	/// Reads one `{"id": ..., "embedding": [...]}` object per line. Numeric ids are kept as their
	/// decimal text.
	pub fn load_jsonl(path: &Path) -> Result<Self> {
		let file = File::open(path)
			.map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
		let mut ids = Vec::new();
		let mut vectors = Vec::new();

		for (idx, line) in BufReader::new(file).lines().enumerate() {
			let line = line.map_err(|source| Error::Io { path: path.to_path_buf(), source })?;

			if line.trim().is_empty() {
				continue;
			}

			let record: EmbeddingRecord = serde_json::from_str(&line).map_err(|err| {
				Error::Parse { path: path.to_path_buf(), line: idx + 1, message: err.to_string() }
			})?;

			ids.push(record.id.into_string());
			vectors.push(record.embedding);
		}

		let store = Self::new(ids, vectors)?;

		tracing::info!(
			path = %path.display(),
			count = store.len(),
			dimension = store.dimension(),
			"Loaded embeddings."
		);

		Ok(store)
	}

	pub fn dimension(&self) -> usize {
		self.dimension
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn ids(&self) -> &[String] {
		&self.ids
	}

	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	pub fn row(&self, row: usize) -> Option<&[f32]> {
		let start = row.checked_mul(self.dimension)?;

		self.vectors.get(start..start + self.dimension)
	}

	pub fn get(&self, id: &str) -> Option<&[f32]> {
		self.index_of(id).and_then(|row| self.row(row))
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
		self.ids.iter().map(String::as_str).zip(self.vectors.chunks_exact(self.dimension))
	}

	pub fn require_dimension(&self, expected: usize, context: &str) -> Result<()> {
		if self.dimension != expected {
			return Err(Error::Dimension {
				context: context.to_string(),
				expected,
				actual: self.dimension,
			});
		}

		Ok(())
	}
}

#[derive(Deserialize)]
struct EmbeddingRecord {
	id: RawId,
	embedding: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
	Text(String),
	Number(u64),
}
impl RawId {
	fn into_string(self) -> String {
		match self {
			Self::Text(text) => text,
			Self::Number(number) => number.to_string(),
		}
	}
}
