//! Dense reranking of sparse candidate lists.

use hybrank_config::MissingEmbedding;
use hybrank_run::{RankedList, Run};

use crate::{
	Error, LookupKind, Result,
	batch::{BatchOutcome, Executor, QueryOutput},
	order,
	store::EmbeddingStore,
};

#[derive(Debug, Default, PartialEq)]
pub struct RerankOutcome {
	pub list: RankedList,
	/// Candidates dropped under [`MissingEmbedding::Skip`], in candidate order.
	pub missing: Vec<String>,
}

/// Unnormalized inner product. Callers guarantee equal lengths.
pub fn dot(lhs: &[f32], rhs: &[f32]) -> f32 {
	lhs.iter().zip(rhs).map(|(a, b)| a * b).sum()
}

/// Scores each candidate by `dot(query, embedding)` and sorts descending.
///
/// Every scorable candidate is kept. Equal scores keep their candidate order; NaN scores go last.
pub fn rerank<'a, I>(
	query: &[f32],
	candidates: I,
	passages: &EmbeddingStore,
	missing: MissingEmbedding,
) -> Result<RerankOutcome>
where
	I: IntoIterator<Item = &'a str>,
{
	if query.len() != passages.dimension() {
		return Err(Error::Dimension {
			context: "query embedding".to_string(),
			expected: passages.dimension(),
			actual: query.len(),
		});
	}

	let mut scored = Vec::new();
	let mut outcome = RerankOutcome::default();

	for doc_id in candidates {
		match passages.get(doc_id) {
			Some(embedding) => scored.push((doc_id, dot(query, embedding))),
			None if missing == MissingEmbedding::Skip => {
				tracing::warn!(doc_id, "Candidate has no embedding; dropped from rerank.");

				outcome.missing.push(doc_id.to_string());
			},
			None =>
				return Err(Error::Lookup {
					kind: LookupKind::DocEmbedding,
					id: doc_id.to_string(),
					within: "passage embeddings",
				}),
		}
	}

	scored.sort_by(|a, b| order::cmp_f32_desc(a.1, b.1));

	outcome.list =
		RankedList::from_pairs(scored.into_iter().map(|(doc_id, score)| (doc_id, f64::from(score))));

	Ok(outcome)
}

/// Reranks every query of `sparse` in its own order. A query without an embedding, or one whose
/// candidates fail under [`MissingEmbedding::Abort`], is reported and left out of the run.
pub fn rerank_run(
	sparse: &Run,
	queries: &EmbeddingStore,
	passages: &EmbeddingStore,
	missing: MissingEmbedding,
	executor: &Executor,
) -> Result<BatchOutcome> {
	queries.require_dimension(passages.dimension(), "query embeddings")?;

	Ok(executor.run_queries(sparse.query_ids(), |query_id| {
		let query = queries.get(query_id).ok_or_else(|| Error::Lookup {
			kind: LookupKind::QueryEmbedding,
			id: query_id.to_string(),
			within: "query embeddings",
		})?;
		let candidates = sparse.get(query_id).map(RankedList::doc_ids).into_iter().flatten();
		let outcome = rerank(query, candidates, passages, missing)?;

		Ok(QueryOutput { list: outcome.list, dropped: outcome.missing })
	}))
}
