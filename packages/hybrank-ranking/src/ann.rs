//! Approximate nearest-neighbour retrieval behind a build/search/drop lifecycle.
//!
//! Engines plug in through [`AnnBuilder`] and [`AnnIndex`]. [`HnswBuilder`] builds an `hnsw_rs`
//! graph ranked by inner product.

use std::{collections::HashSet, sync::Arc};

use hnsw_rs::prelude::*;

use hybrank_config::Ann;
use hybrank_run::RankedList;

use crate::{
	Error, LookupKind, Result,
	batch::{BatchOutcome, Executor, QueryOutput},
	order, rerank,
	store::EmbeddingStore,
};

/// Upper bound on graph layers; `hnsw_rs` caps it at 16 as well.
const MAX_LAYERS: usize = 16;
/// Largest out-degree `hnsw_rs` accepts.
const MAX_NEIGHBORS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnnParams {
	/// Graph out-degree (`M`).
	pub max_neighbors: usize,
	pub ef_construction: usize,
	pub ef_search: usize,
	pub top_k: usize,
}
impl AnnParams {
	pub fn from_config(cfg: &Ann) -> Self {
		Self {
			max_neighbors: cfg.max_neighbors as usize,
			ef_construction: cfg.ef_construction as usize,
			ef_search: cfg.ef_search as usize,
			top_k: cfg.top_k as usize,
		}
	}
}
impl Default for AnnParams {
	fn default() -> Self {
		Self { max_neighbors: 4, ef_construction: 50, ef_search: 50, top_k: 100 }
	}
}

/// A built index over passage vectors. Dropping it releases the index.
pub trait AnnIndex: Send + Sync {
	fn dimension(&self) -> usize;

	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns, per query, up to `top_k` `(passage_id, inner_product)` pairs best first.
	fn search(
		&self,
		queries: &[&[f32]],
		top_k: usize,
		ef_search: usize,
	) -> Result<Vec<Vec<(String, f32)>>>;
}

pub trait AnnBuilder {
	type Index: AnnIndex;

	fn build(&self, passages: Arc<EmbeddingStore>, params: &AnnParams) -> Result<Self::Index>;
}

/// `1 - <a, b>`. Vectors are not assumed normalized, so the distance may be negative.
#[derive(Clone, Copy, Debug, Default)]
pub struct InnerProduct;
impl Distance<f32> for InnerProduct {
	fn eval(&self, va: &[f32], vb: &[f32]) -> f32 {
		1.0 - rerank::dot(va, vb)
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HnswBuilder;
impl AnnBuilder for HnswBuilder {
	type Index = HnswIndex;

	fn build(&self, passages: Arc<EmbeddingStore>, params: &AnnParams) -> Result<HnswIndex> {
		if params.max_neighbors == 0 || params.max_neighbors > MAX_NEIGHBORS {
			return Err(Error::InvalidConfig {
				message: format!(
					"HNSW max_neighbors must be between 1 and {MAX_NEIGHBORS}, got {}.",
					params.max_neighbors
				),
			});
		}
		if params.ef_construction == 0 {
			return Err(Error::InvalidConfig {
				message: "HNSW ef_construction must be greater than zero.".to_string(),
			});
		}

		let mut graph = Hnsw::new(
			params.max_neighbors,
			passages.len(),
			MAX_LAYERS,
			params.ef_construction,
			InnerProduct,
		);

		for (row, (_, vector)) in passages.iter().enumerate() {
			graph.insert_slice((vector, row));
		}

		graph.set_searching_mode(true);

		tracing::info!(
			passages = passages.len(),
			dimension = passages.dimension(),
			max_neighbors = params.max_neighbors,
			ef_construction = params.ef_construction,
			"Built HNSW index."
		);

		Ok(HnswIndex { graph, passages })
	}
}

/// HNSW graph over the rows of an [`EmbeddingStore`]. Graph ids are store rows.
pub struct HnswIndex {
	graph: Hnsw<'static, f32, InnerProduct>,
	passages: Arc<EmbeddingStore>,
}
impl AnnIndex for HnswIndex {
	fn dimension(&self) -> usize {
		self.passages.dimension()
	}

	fn len(&self) -> usize {
		self.passages.len()
	}

	fn search(
		&self,
		queries: &[&[f32]],
		top_k: usize,
		ef_search: usize,
	) -> Result<Vec<Vec<(String, f32)>>> {
		check_query_dimensions(queries, self.dimension())?;

		if top_k == 0 {
			return Ok(vec![Vec::new(); queries.len()]);
		}

		let ef = ef_search.max(top_k);

		Ok(queries
			.iter()
			.map(|query| {
				self.graph
					.search(query, top_k, ef)
					.into_iter()
					.filter_map(|neighbour| {
						self.passages
							.ids()
							.get(neighbour.d_id)
							.map(|id| (id.clone(), 1.0 - neighbour.distance))
					})
					.collect()
			})
			.collect())
	}
}

pub fn check_query_dimensions(queries: &[&[f32]], dimension: usize) -> Result<()> {
	for query in queries {
		if query.len() != dimension {
			return Err(Error::Dimension {
				context: "ANN query".to_string(),
				expected: dimension,
				actual: query.len(),
			});
		}
	}

	Ok(())
}

/// Searches `index` once per query embedding on `executor`, in `queries` order.
///
/// Each list is re-sorted by score, de-duplicated and cut to `top_k` before it is stored. A query
/// the index answers with anything but exactly one list is reported as a failure.
pub fn ann_run<I>(
	index: &I,
	queries: &EmbeddingStore,
	params: &AnnParams,
	executor: &Executor,
) -> Result<BatchOutcome>
where
	I: AnnIndex + ?Sized,
{
	queries.require_dimension(index.dimension(), "query embeddings")?;

	let outcome = executor.run_queries(queries.ids(), |query_id| {
		let vector = queries.get(query_id).ok_or_else(|| Error::Lookup {
			kind: LookupKind::QueryEmbedding,
			id: query_id.to_string(),
			within: "query embeddings",
		})?;
		let mut results = index.search(&[vector], params.top_k, params.ef_search)?;
		let answered = results.len();
		let hits = match (results.pop(), results.is_empty()) {
			(Some(hits), true) => hits,
			_ =>
				return Err(Error::Adapter {
					message: format!("index answered {answered} result lists for one query."),
				}),
		};

		Ok(QueryOutput::from(collect_hits(hits, params.top_k)))
	});

	tracing::info!(
		queries = outcome.run.len(),
		failures = outcome.failures.len(),
		top_k = params.top_k,
		"Collected ANN run."
	);

	Ok(outcome)
}

fn collect_hits(mut hits: Vec<(String, f32)>, top_k: usize) -> RankedList {
	let mut seen = HashSet::with_capacity(hits.len());

	hits.sort_by(|a, b| order::cmp_f32_desc(a.1, b.1));
	hits.retain(|(doc_id, _)| seen.insert(doc_id.clone()));
	hits.truncate(top_k);

	RankedList::from_pairs(hits.into_iter().map(|(doc_id, score)| (doc_id, f64::from(score))))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hits_are_sorted_deduplicated_and_cut() {
		let hits = vec![
			("b".to_string(), 0.2),
			("a".to_string(), 0.9),
			("b".to_string(), 0.2),
			("c".to_string(), f32::NAN),
			("d".to_string(), 0.1),
		];
		let list = collect_hits(hits, 3);

		assert_eq!(list.doc_ids().collect::<Vec<_>>(), vec!["a", "b", "d"]);
	}

	#[test]
	fn inner_product_distance_inverts_back_to_the_dot_product() {
		let distance = InnerProduct.eval(&[2.0, 1.0], &[3.0, 0.5]);

		assert_eq!(1.0 - distance, 6.5);
	}
}
