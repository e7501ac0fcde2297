use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub runtime: Runtime,
	#[serde(default)]
	pub runs: Runs,
	pub embeddings: Embeddings,
	#[serde(default)]
	pub fusion: Fusion,
	#[serde(default)]
	pub rerank: Rerank,
	#[serde(default)]
	pub ann: Ann,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Runtime {
	/// `tracing_subscriber::EnvFilter` directive, e.g. "info" or "hybrank_ranking=debug".
	pub log_level: String,
	/// Query-level worker threads. 0 uses one per CPU, 1 runs on the calling thread.
	#[serde(default = "default_workers")]
	pub workers: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Runs {
	pub malformed_records: MalformedRecords,
}

/// What the run reader does with a record it cannot parse.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRecords {
	/// Fail the whole read on the first malformed record.
	#[default]
	Abort,
	/// Drop the record, log it, and report it back to the caller.
	Skip,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Fusion {
	/// RRF `k`: added to every 1-based rank before taking the reciprocal.
	pub rank_constant: f64,
	/// Maximum fused list length per query.
	pub top_k: u32,
	pub missing_query: MissingQuery,
	pub method_tag: String,
}
impl Default for Fusion {
	fn default() -> Self {
		Self {
			rank_constant: 60.0,
			top_k: 100,
			missing_query: MissingQuery::default(),
			method_tag: "RRF".to_string(),
		}
	}
}

/// How run-level fusion treats a query that only one input run contains.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingQuery {
	/// Fuse against an empty list.
	#[default]
	Empty,
	/// Fail that query with a lookup error.
	Error,
}

/// Shared by every stage that reads query or passage vectors.
#[derive(Clone, Debug, Deserialize)]
pub struct Embeddings {
	pub dimensions: u32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub missing_embedding: MissingEmbedding,
	pub method_tag: String,
}
impl Default for Rerank {
	fn default() -> Self {
		Self { missing_embedding: MissingEmbedding::default(), method_tag: "BM25+Rerank".to_string() }
	}
}

/// How the dense reranker treats a candidate with no stored embedding.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingEmbedding {
	/// Fail the query on the first missing candidate.
	#[default]
	Abort,
	/// Drop missing candidates and report them with the reranked list.
	Skip,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ann {
	/// Graph out-degree (HNSW `M`).
	pub max_neighbors: u32,
	pub ef_construction: u32,
	pub ef_search: u32,
	pub top_k: u32,
	pub method_tag: String,
}
impl Default for Ann {
	fn default() -> Self {
		Self {
			max_neighbors: 4,
			ef_construction: 50,
			ef_search: 50,
			top_k: 100,
			method_tag: "HNSW".to_string(),
		}
	}
}

fn default_workers() -> usize {
	1
}
