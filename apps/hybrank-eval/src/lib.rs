mod metrics;

use std::{
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use hybrank_config::Config;
use hybrank_ranking::{
	AnnBuilder, AnnParams, BatchOutcome, EmbeddingStore, Executor, HnswBuilder, RrfParams, ann,
	rerank, rrf,
};
use hybrank_run::{Run, collection, qrels, reader, writer};

#[derive(Debug, Parser)]
#[command(
	version = hybrank_cli::VERSION,
	rename_all = "kebab",
	styles = hybrank_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Fuse a sparse and a dense run with Reciprocal Rank Fusion.
	Fuse {
		#[arg(long, value_name = "FILE")]
		primary: PathBuf,
		#[arg(long, value_name = "FILE")]
		secondary: PathBuf,
		#[command(flatten)]
		output: OutputArgs,
	},
	/// Rerank a sparse run by query/passage embedding dot product.
	Rerank {
		#[arg(long, value_name = "FILE")]
		run: PathBuf,
		#[arg(long, value_name = "FILE")]
		queries: PathBuf,
		#[arg(long, value_name = "FILE")]
		passages: PathBuf,
		#[command(flatten)]
		output: OutputArgs,
	},
	/// Retrieve passages for every query embedding through an ANN index.
	Ann {
		#[arg(long, value_name = "FILE")]
		queries: PathBuf,
		#[arg(long, value_name = "FILE")]
		passages: PathBuf,
		#[command(flatten)]
		output: OutputArgs,
	},
	/// Keep only the collection passages whose ids are listed.
	Subset {
		#[arg(long, value_name = "FILE")]
		collection: PathBuf,
		#[arg(long, value_name = "FILE")]
		ids: PathBuf,
		#[arg(long, value_name = "FILE")]
		out: PathBuf,
	},
	/// Score a run against relevance judgments.
	Evaluate {
		#[arg(long, value_name = "FILE")]
		run: PathBuf,
		#[arg(long, value_name = "FILE")]
		qrels: PathBuf,
		#[arg(long, value_name = "N", default_value_t = 10)]
		depth: usize,
	},
}

#[derive(Debug, clap::Args)]
pub struct OutputArgs {
	#[arg(long, value_name = "FILE")]
	pub out: PathBuf,
	/// Write only the judged queries, in qrels order.
	#[arg(long, value_name = "FILE")]
	pub qrels: Option<PathBuf>,
	/// Overrides the method tag from the config.
	#[arg(long, value_name = "TAG")]
	pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteSummary {
	command: &'static str,
	out: String,
	method_tag: String,
	queries_written: usize,
	records_written: usize,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	missing_queries: Vec<String>,
	failures: Vec<FailureReport>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	dropped_candidates: Vec<DroppedReport>,
	skipped_records: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FailureReport {
	query_id: String,
	message: String,
}

#[derive(Debug, Serialize)]
struct DroppedReport {
	query_id: String,
	doc_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SubsetSummary {
	out: String,
	lines_read: usize,
	lines_kept: usize,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let config = hybrank_config::load(&args.config)?;
	let filter = EnvFilter::new(config.runtime.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let executor = Executor::new(config.runtime.workers)?;
	let output = match args.command {
		Command::Fuse { primary, secondary, output } =>
			run_fuse(&config, &executor, &primary, &secondary, &output)?,
		Command::Rerank { run, queries, passages, output } =>
			run_rerank(&config, &executor, &run, &queries, &passages, &output)?,
		Command::Ann { queries, passages, output } =>
			run_ann(&config, &executor, &queries, &passages, &output)?,
		Command::Subset { collection, ids, out } => run_subset(&collection, &ids, &out)?,
		Command::Evaluate { run, qrels, depth } => run_evaluate(&config, &run, &qrels, depth)?,
	};

	println!("{output}");

	Ok(())
}

fn run_fuse(
	config: &Config,
	executor: &Executor,
	primary: &Path,
	secondary: &Path,
	output: &OutputArgs,
) -> color_eyre::Result<String> {
	let params = RrfParams::from_config(&config.fusion)?;
	let mut skipped = Vec::new();
	let primary = read_run(config, primary, &mut skipped)?;
	let secondary = read_run(config, secondary, &mut skipped)?;
	let outcome =
		rrf::fuse_runs(&primary, &secondary, &params, config.fusion.missing_query, executor);

	write_outcome("fuse", outcome, output, &config.fusion.method_tag, skipped)
}

fn run_rerank(
	config: &Config,
	executor: &Executor,
	run: &Path,
	queries: &Path,
	passages: &Path,
	output: &OutputArgs,
) -> color_eyre::Result<String> {
	let mut skipped = Vec::new();
	let sparse = read_run(config, run, &mut skipped)?;
	let queries = load_embeddings(config, queries, "query embeddings")?;
	let passages = load_embeddings(config, passages, "passage embeddings")?;
	let outcome = rerank::rerank_run(
		&sparse,
		&queries,
		&passages,
		config.rerank.missing_embedding,
		executor,
	)?;

	write_outcome("rerank", outcome, output, &config.rerank.method_tag, skipped)
}

fn run_ann(
	config: &Config,
	executor: &Executor,
	queries: &Path,
	passages: &Path,
	output: &OutputArgs,
) -> color_eyre::Result<String> {
	let params = AnnParams::from_config(&config.ann);
	let queries = load_embeddings(config, queries, "query embeddings")?;
	let passages = Arc::new(load_embeddings(config, passages, "passage embeddings")?);
	let outcome = {
		let index = HnswBuilder.build(passages, &params)?;

		ann::ann_run(&index, &queries, &params, executor)?
	};

	write_outcome("ann", outcome, output, &config.ann.method_tag, Vec::new())
}

fn run_subset(collection: &Path, ids: &Path, out: &Path) -> color_eyre::Result<String> {
	let ids = collection::read_id_set(ids)?;
	let report = collection::filter_collection(collection, &ids, out)?;
	let summary = SubsetSummary {
		out: out.display().to_string(),
		lines_read: report.read,
		lines_kept: report.kept,
	};

	Ok(serde_json::to_string_pretty(&summary)?)
}

fn run_evaluate(
	config: &Config,
	run_path: &Path,
	qrels_path: &Path,
	depth: usize,
) -> color_eyre::Result<String> {
	if depth == 0 {
		return Err(eyre::eyre!("--depth must be greater than zero."));
	}

	let run = read_run(config, run_path, &mut Vec::new())?;
	let judgments = qrels::read_qrels(qrels_path)?;
	let (summary, queries) = metrics::evaluate(&run, &judgments, depth);
	let output = metrics::EvalOutput {
		settings: metrics::EvalSettings {
			run_path: run_path.display().to_string(),
			qrels_path: qrels_path.display().to_string(),
			depth,
		},
		summary,
		queries,
	};

	Ok(serde_json::to_string_pretty(&output)?)
}

fn read_run(config: &Config, path: &Path, skipped: &mut Vec<String>) -> color_eyre::Result<Run> {
	let (run, report) = reader::read_run(path, config.runs.malformed_records)?;

	tracing::info!(
		path = %path.display(),
		queries = run.len(),
		records = report.records,
		skipped = report.skipped.len(),
		"Loaded run."
	);

	skipped.extend(report.skipped.iter().map(ToString::to_string));

	Ok(run)
}

fn load_embeddings(
	config: &Config,
	path: &Path,
	context: &str,
) -> color_eyre::Result<EmbeddingStore> {
	let store = EmbeddingStore::load_jsonl(path)?;

	store.require_dimension(config.embeddings.dimensions as usize, context)?;

	Ok(store)
}

fn write_outcome(
	command: &'static str,
	outcome: BatchOutcome,
	output: &OutputArgs,
	configured_tag: &str,
	skipped_records: Vec<String>,
) -> color_eyre::Result<String> {
	let method_tag = match &output.tag {
		Some(tag) => {
			hybrank_config::validate_method_tag("--tag", tag)?;

			tag.as_str()
		},
		None => configured_tag,
	};
	let query_ids = match &output.qrels {
		Some(path) => qrels::select_queries(qrels::read_qrels(path)?.query_ids(), &outcome.run),
		None => outcome.run.query_ids().to_vec(),
	};
	let report = writer::write_run(&output.out, &outcome.run, &query_ids, method_tag)?;
	let summary = WriteSummary {
		command,
		out: output.out.display().to_string(),
		method_tag: method_tag.to_string(),
		queries_written: report.queries,
		records_written: report.records,
		missing_queries: report.missing,
		failures: outcome
			.failures
			.into_iter()
			.map(|failure| FailureReport {
				query_id: failure.query_id,
				message: failure.error.to_string(),
			})
			.collect(),
		dropped_candidates: outcome
			.dropped
			.into_iter()
			.map(|dropped| DroppedReport { query_id: dropped.query_id, doc_ids: dropped.doc_ids })
			.collect(),
		skipped_records,
	};

	tracing::info!(
		command,
		queries = summary.queries_written,
		failures = summary.failures.len(),
		"Wrote run."
	);

	Ok(serde_json::to_string_pretty(&summary)?)
}
