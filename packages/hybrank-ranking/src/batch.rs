use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use hybrank_run::{RankedList, Run};

use crate::{Error, Result};

/// A query that produced no list, with the reason.
#[derive(Debug)]
pub struct QueryFailure {
	pub query_id: String,
	pub error: Error,
}

/// Candidates removed from a query's list because they could not be scored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedDocs {
	pub query_id: String,
	pub doc_ids: Vec<String>,
}

/// Result of a batch: the queries that succeeded plus a report of everything that did not.
#[derive(Debug, Default)]
pub struct BatchOutcome {
	pub run: Run,
	pub failures: Vec<QueryFailure>,
	pub dropped: Vec<DroppedDocs>,
}
impl BatchOutcome {
	pub fn is_clean(&self) -> bool {
		self.failures.is_empty() && self.dropped.is_empty()
	}
}

/// Per-query output of a batch closure.
#[derive(Debug, Default)]
pub struct QueryOutput {
	pub list: RankedList,
	pub dropped: Vec<String>,
}
impl From<RankedList> for QueryOutput {
	fn from(list: RankedList) -> Self {
		Self { list, dropped: Vec::new() }
	}
}

/// Runs per-query work either inline or on a dedicated rayon pool.
pub struct Executor {
	pool: Option<ThreadPool>,
}
impl Executor {
	/// `1` runs on the calling thread, `0` sizes the pool to the CPU count.
	pub fn new(workers: usize) -> Result<Self> {
		if workers == 1 {
			return Ok(Self::sequential());
		}

		let mut builder = ThreadPoolBuilder::new().thread_name(|idx| format!("hybrank-{idx}"));

		if workers > 1 {
			builder = builder.num_threads(workers);
		}

		Ok(Self { pool: Some(builder.build()?) })
	}

	pub fn sequential() -> Self {
		Self { pool: None }
	}

	pub fn workers(&self) -> usize {
		self.pool.as_ref().map(ThreadPool::current_num_threads).unwrap_or(1)
	}

	/// Applies `work` to each query id. Results come back in `query_ids` order no matter how the
	/// pool schedules them.
	pub fn map_queries<F, T>(&self, query_ids: &[String], work: F) -> Vec<T>
	where
		F: Fn(&str) -> T + Sync + Send,
		T: Send,
	{
		match &self.pool {
			None => query_ids.iter().map(|query_id| work(query_id)).collect(),
			Some(pool) =>
				pool.install(|| query_ids.par_iter().map(|query_id| work(query_id)).collect()),
		}
	}

	/// Runs `work` for every query and folds the results into a [`BatchOutcome`]. A failing query
	/// is reported and left out of the run; the others are unaffected.
	pub fn run_queries<F>(&self, query_ids: &[String], work: F) -> BatchOutcome
	where
		F: Fn(&str) -> Result<QueryOutput> + Sync + Send,
	{
		let results = self.map_queries(query_ids, work);
		let mut outcome = BatchOutcome::default();

		for (query_id, result) in query_ids.iter().zip(results) {
			match result {
				Ok(output) => {
					if !output.dropped.is_empty() {
						outcome
							.dropped
							.push(DroppedDocs { query_id: query_id.clone(), doc_ids: output.dropped });
					}

					outcome.run.insert(query_id.clone(), output.list);
				},
				Err(error) => {
					tracing::warn!(query_id = %query_id, error = %error, "Query failed; excluded from run.");

					outcome.failures.push(QueryFailure { query_id: query_id.clone(), error });
				},
			}
		}

		outcome
	}
}
impl Default for Executor {
	fn default() -> Self {
		Self::sequential()
	}
}
