use std::collections::HashSet;

use serde::Serialize;

use hybrank_run::{Run, qrels::Qrels};

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub settings: EvalSettings,
	pub summary: EvalSummary,
	pub queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
pub struct EvalSettings {
	pub run_path: String,
	pub qrels_path: String,
	pub depth: usize,
}

#[derive(Debug, Serialize)]
pub struct EvalSummary {
	pub query_count: usize,
	/// Judged queries the run has no list for. They still count toward the means.
	pub missing_queries: usize,
	pub avg_recall_at_k: f64,
	pub avg_precision_at_k: f64,
	pub mean_rr: f64,
	pub mean_ndcg: f64,
	pub retrieved_p50: f64,
	pub retrieved_p95: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryReport {
	pub id: String,
	pub expected_count: usize,
	pub retrieved_count: usize,
	pub relevant_count: usize,
	pub recall_at_k: f64,
	pub precision_at_k: f64,
	pub rr: f64,
	pub ndcg: f64,
}

#[derive(Debug, PartialEq)]
struct Metrics {
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	relevant_count: usize,
}

/// Scores the first `depth` documents of every judged query.
pub fn evaluate(run: &Run, qrels: &Qrels, depth: usize) -> (EvalSummary, Vec<QueryReport>) {
	let mut reports = Vec::with_capacity(qrels.len());
	let mut missing_queries = 0;

	for query_id in qrels.query_ids() {
		let retrieved: Vec<&str> = match run.get(query_id) {
			Some(list) => list.doc_ids().take(depth).collect(),
			None => {
				missing_queries += 1;

				Vec::new()
			},
		};
		let expected = qrels.relevant(query_id);
		let metrics = compute_metrics(&retrieved, &expected, depth);

		reports.push(QueryReport {
			id: query_id.clone(),
			expected_count: expected.len(),
			retrieved_count: retrieved.len(),
			relevant_count: metrics.relevant_count,
			recall_at_k: metrics.recall_at_k,
			precision_at_k: metrics.precision_at_k,
			rr: metrics.rr,
			ndcg: metrics.ndcg,
		});
	}

	let summary = summarize(&reports, missing_queries);

	(summary, reports)
}

/// Cutoff metrics at `depth`: a list shorter than `depth` is scored as if padded with
/// non-relevant documents.
fn compute_metrics(retrieved: &[&str], expected: &HashSet<&str>, depth: usize) -> Metrics {
	let expected_count = expected.len();
	let mut relevant_count = 0usize;
	let mut dcg = 0.0_f64;
	let mut first_hit: Option<usize> = None;

	for (idx, id) in retrieved.iter().take(depth).enumerate() {
		if expected.contains(id) {
			let rank = idx + 1;

			relevant_count += 1;
			dcg += 1.0 / (rank as f64 + 1.0).log2();

			if first_hit.is_none() {
				first_hit = Some(rank);
			}
		}
	}

	let rr = first_hit.map(|rank| 1.0 / rank as f64).unwrap_or(0.0);
	let idcg: f64 =
		(1..=expected_count.min(depth)).map(|rank| 1.0 / (rank as f64 + 1.0).log2()).sum();
	let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };
	let precision_at_k = if depth == 0 { 0.0 } else { relevant_count as f64 / depth as f64 };
	let recall_at_k =
		if expected_count == 0 { 0.0 } else { relevant_count as f64 / expected_count as f64 };

	Metrics { recall_at_k, precision_at_k, rr, ndcg, relevant_count }
}

fn summarize(reports: &[QueryReport], missing_queries: usize) -> EvalSummary {
	let count = reports.len().max(1) as f64;
	let avg_recall_at_k = reports.iter().map(|r| r.recall_at_k).sum::<f64>() / count;
	let avg_precision_at_k = reports.iter().map(|r| r.precision_at_k).sum::<f64>() / count;
	let mean_rr = reports.iter().map(|r| r.rr).sum::<f64>() / count;
	let mean_ndcg = reports.iter().map(|r| r.ndcg).sum::<f64>() / count;
	let mut lengths: Vec<f64> = reports.iter().map(|r| r.retrieved_count as f64).collect();

	lengths.sort_by(f64::total_cmp);

	EvalSummary {
		query_count: reports.len(),
		missing_queries,
		avg_recall_at_k,
		avg_precision_at_k,
		mean_rr,
		mean_ndcg,
		retrieved_p50: quantile(&lengths, 0.50),
		retrieved_p95: quantile(&lengths, 0.95),
	}
}

/// Linear interpolation between closest ranks of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
	let Some(last) = sorted.len().checked_sub(1) else {
		return 0.0;
	};
	let position = q.clamp(0.0, 1.0) * last as f64;
	let below = position.floor() as usize;
	let above = (below + 1).min(last);

	sorted[below] + (sorted[above] - sorted[below]) * (position - below as f64)
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use hybrank_run::{RankedList, qrels};

	use super::*;

	#[test]
	fn metrics_reward_early_hits() {
		let expected: HashSet<&str> = HashSet::from(["d2", "d9"]);
		let metrics = compute_metrics(&["d1", "d2", "d3", "d4"], &expected, 4);
		let ideal = 1.0 + 1.0 / 3.0_f64.log2();

		assert_eq!(metrics.relevant_count, 1);
		assert_eq!(metrics.rr, 0.5);
		assert_eq!(metrics.precision_at_k, 0.25);
		assert_eq!(metrics.recall_at_k, 0.5);
		assert!((metrics.ndcg - (1.0 / 3.0_f64.log2()) / ideal).abs() < 1e-12);
	}

	#[test]
	fn empty_retrieval_scores_zero() {
		let expected: HashSet<&str> = HashSet::from(["d1"]);

		assert_eq!(
			compute_metrics(&[], &expected, 10),
			Metrics { recall_at_k: 0.0, precision_at_k: 0.0, rr: 0.0, ndcg: 0.0, relevant_count: 0 }
		);
	}

	#[test]
	fn short_list_is_scored_against_the_full_depth() {
		let expected: HashSet<&str> = HashSet::from(["r1", "r2", "r3", "r4", "r5"]);
		let metrics = compute_metrics(&["r1"], &expected, 10);
		let ideal: f64 = (1..=5).map(|rank| 1.0 / (rank as f64 + 1.0).log2()).sum();

		assert_eq!(metrics.precision_at_k, 0.1);
		assert_eq!(metrics.recall_at_k, 0.2);
		assert!((metrics.ndcg - 1.0 / ideal).abs() < 1e-12);
		assert!((metrics.ndcg - 0.339).abs() < 1e-3, "nDCG was {}", metrics.ndcg);
	}

	#[test]
	fn quantile_interpolates_between_neighbours() {
		assert_eq!(quantile(&[], 0.5), 0.0);
		assert_eq!(quantile(&[4.0], 0.95), 4.0);
		assert_eq!(quantile(&[1.0, 3.0], 0.5), 2.0);
		assert_eq!(quantile(&[1.0, 2.0, 10.0], 0.5), 2.0);
		assert_eq!(quantile(&[1.0, 2.0, 10.0], 1.0), 10.0);
	}

	#[test]
	fn evaluate_truncates_to_depth_and_counts_missing_queries() {
		let judgments = qrels::parse_qrels(
			"q1 0 d1 1\nq1 0 d2 1\nq2 0 d7 1\n".as_bytes(),
			Path::new("qrels.tsv"),
		)
		.expect("Qrels must parse.");
		let mut run = Run::new();

		run.insert("q1", RankedList::from_pairs([("d3", 3.0), ("d1", 2.0), ("d2", 1.0)]));

		let (summary, reports) = evaluate(&run, &judgments, 2);

		assert_eq!(summary.query_count, 2);
		assert_eq!(summary.missing_queries, 1);
		assert_eq!(reports[0].retrieved_count, 2);
		assert_eq!(reports[0].recall_at_k, 0.5);
		assert_eq!(reports[1].retrieved_count, 0);
		assert_eq!(summary.mean_rr, 0.25);
	}
}
