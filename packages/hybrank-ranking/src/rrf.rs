//! Reciprocal Rank Fusion of a primary and a secondary ranked list.
//!
//! Only positions matter: a document at 1-based rank `r` of a list gains `1 / (k + r)`, so the
//! producers' score scales never need to be comparable.

use std::collections::{HashMap, HashSet};

use hybrank_config::{Fusion, MissingQuery};
use hybrank_run::{RankedList, Run};

use crate::{
	Error, LookupKind, Result,
	batch::{BatchOutcome, Executor, QueryOutput},
	order,
};

pub const DEFAULT_RANK_CONSTANT: f64 = 60.0;
pub const DEFAULT_TOP_K: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RrfParams {
	rank_constant: f64,
	top_k: usize,
}
impl RrfParams {
	pub fn new(rank_constant: f64, top_k: usize) -> Result<Self> {
		if !rank_constant.is_finite() || rank_constant < 0.0 {
			return Err(Error::InvalidConfig {
				message: format!(
					"RRF rank constant must be a finite, non-negative number, got {rank_constant}."
				),
			});
		}

		Ok(Self { rank_constant, top_k })
	}

	pub fn from_config(cfg: &Fusion) -> Result<Self> {
		Self::new(cfg.rank_constant, cfg.top_k as usize)
	}

	/// Score contributed by a 1-based `rank`.
	pub fn contribution(&self, rank: usize) -> f64 {
		1.0 / (self.rank_constant + rank as f64)
	}
}
impl Default for RrfParams {
	fn default() -> Self {
		Self { rank_constant: DEFAULT_RANK_CONSTANT, top_k: DEFAULT_TOP_K }
	}
}

/// Fuses two lists for one query.
///
/// The output holds at most `top_k` documents, best first. Equal fused scores keep the order in
/// which documents were first seen, scanning `primary` before `secondary`. A document repeated
/// within one list counts only at its first position.
pub fn fuse(primary: &RankedList, secondary: &RankedList, params: &RrfParams) -> RankedList {
	let mut slots: HashMap<&str, usize> = HashMap::new();
	let mut fused: Vec<(&str, f64)> = Vec::new();

	for list in [primary, secondary] {
		let mut counted = HashSet::with_capacity(list.len());

		for (rank, doc) in list.ranked() {
			let doc_id = doc.doc_id.as_str();

			if !counted.insert(doc_id) {
				continue;
			}

			let contribution = params.contribution(rank);

			match slots.get(doc_id) {
				Some(&slot) => fused[slot].1 += contribution,
				None => {
					slots.insert(doc_id, fused.len());
					fused.push((doc_id, contribution));
				},
			}
		}
	}

	// Stable, so ties stay in first-seen order.
	fused.sort_by(|a, b| order::cmp_f64_desc(a.1, b.1));
	fused.truncate(params.top_k);

	RankedList::from_pairs(fused)
}

/// Fuses every query of two runs.
///
/// Queries are visited in `primary` order, followed by queries only `secondary` knows. Under
/// [`MissingQuery::Empty`] a query absent from one run is fused against an empty list; under
/// [`MissingQuery::Error`] it is reported as a failure and left out of the output.
pub fn fuse_runs(
	primary: &Run,
	secondary: &Run,
	params: &RrfParams,
	missing: MissingQuery,
	executor: &Executor,
) -> BatchOutcome {
	let query_ids = union_query_ids(primary, secondary);
	let empty = RankedList::new();

	executor.run_queries(&query_ids, |query_id| {
		let lhs = lookup(primary, query_id, "primary run", missing)?;
		let rhs = lookup(secondary, query_id, "secondary run", missing)?;

		Ok(QueryOutput::from(fuse(lhs.unwrap_or(&empty), rhs.unwrap_or(&empty), params)))
	})
}

fn union_query_ids(primary: &Run, secondary: &Run) -> Vec<String> {
	let mut query_ids = primary.query_ids().to_vec();

	query_ids.extend(
		secondary.query_ids().iter().filter(|query_id| !primary.contains(query_id)).cloned(),
	);

	query_ids
}

fn lookup<'a>(
	run: &'a Run,
	query_id: &str,
	within: &'static str,
	missing: MissingQuery,
) -> Result<Option<&'a RankedList>> {
	match (run.get(query_id), missing) {
		(Some(list), _) => Ok(Some(list)),
		(None, MissingQuery::Empty) => {
			tracing::debug!(query_id, within, "Query absent; fusing against an empty list.");

			Ok(None)
		},
		(None, MissingQuery::Error) =>
			Err(Error::Lookup { kind: LookupKind::Query, id: query_id.to_string(), within }),
	}
}
