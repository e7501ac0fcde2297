use std::{collections::HashSet, fs, path::Path};

use tempfile::TempDir;

use hybrank_config::MalformedRecords;
use hybrank_run::{
	Error, RankedList, Run, collection,
	qrels::{self, Qrels},
	reader, writer,
};

fn sample_run() -> Run {
	let mut run = Run::new();

	run.insert("q2", RankedList::from_pairs([("d3", 12.5), ("d1", 7.25), ("d9", -0.125)]));
	run.insert("q1", RankedList::from_pairs([("d4", 0.9), ("d5", 0.333_333_3)]));

	run
}

fn parse(text: &str, policy: MalformedRecords) -> hybrank_run::Result<(Run, reader::ReadReport)> {
	reader::parse_run(text.as_bytes(), Path::new("inline.trec"), policy)
}

fn assert_runs_close(left: &Run, right: &Run) {
	assert_eq!(left.query_ids(), right.query_ids());

	for (query_id, list) in left.iter() {
		let other = right.get(query_id).expect("Query must exist in both runs.");

		assert_eq!(list.len(), other.len(), "Length mismatch for {query_id}.");

		for (lhs, rhs) in list.iter().zip(other.iter()) {
			assert_eq!(lhs.doc_id, rhs.doc_id);
			assert!((lhs.score - rhs.score).abs() < 1e-6, "Score drift for {query_id}.");
		}
	}
}

#[test]
fn write_then_read_round_trips() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = dir.path().join("run.trec");
	let run = sample_run();
	let report =
		writer::write_run(&path, &run, run.query_ids(), "RRF").expect("Write must succeed.");

	assert_eq!(report.queries, 2);
	assert_eq!(report.records, 5);

	let (read_back, read_report) =
		reader::read_run(&path, MalformedRecords::Abort).expect("Read must succeed.");

	assert_eq!(read_report.records, 5);
	assert!(read_report.skipped.is_empty());
	assert_runs_close(&run, &read_back);
}

#[test]
fn written_records_use_six_columns_and_one_based_ranks() {
	let run = sample_run();
	let mut out = Vec::new();

	writer::write_records(&mut out, &run, &["q1"], "BM25+Rerank").expect("Write must succeed.");

	let text = String::from_utf8(out).expect("Output must be UTF-8.");
	let lines: Vec<&str> = text.lines().collect();

	assert_eq!(lines, vec!["q1 Q0 d4 1 0.9 BM25+Rerank", "q1 Q0 d5 2 0.3333333 BM25+Rerank"]);
}

#[test]
fn outer_order_follows_the_caller() {
	let run = sample_run();
	let mut out = Vec::new();
	let report = writer::write_records(&mut out, &run, &["q1", "q404", "q2"], "HNSW")
		.expect("Write must succeed.");
	let text = String::from_utf8(out).expect("Output must be UTF-8.");
	let queries: Vec<&str> =
		text.lines().filter_map(|line| line.split_whitespace().next()).collect();

	assert_eq!(queries, vec!["q1", "q1", "q2", "q2", "q2"]);
	assert_eq!(report.missing, vec!["q404".to_string()]);
	assert_eq!(report.queries, 2);
}

#[test]
fn method_tag_with_whitespace_is_rejected_before_touching_disk() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = dir.path().join("run.trec");
	let run = sample_run();
	let err = writer::write_run(&path, &run, run.query_ids(), "BM25 Rerank")
		.expect_err("Tag with whitespace must be rejected.");

	assert!(matches!(err, Error::InvalidArgument(_)), "Unexpected error: {err:?}");
	assert!(err.to_string().contains("method tag must not contain whitespace."), "{err}");
	assert!(!path.exists());

	let err = writer::write_run(&path, &run, run.query_ids(), "").expect_err("Empty tag must fail.");

	assert!(err.to_string().contains("method tag must be non-empty."), "{err}");
	assert!(!path.exists());
}

#[test]
fn writing_into_a_missing_directory_is_an_io_error() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = dir.path().join("absent").join("run.trec");
	let run = sample_run();
	let err = writer::write_run(&path, &run, run.query_ids(), "RRF")
		.expect_err("Missing directory must fail.");

	match err {
		Error::Io { path: reported, .. } => assert_eq!(reported, path),
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[test]
fn file_order_defines_rank_without_resorting() {
	let text = "q1 Q0 low 1 0.1 X\nq1 Q0 high 2 99.0 X\nq2 Q0 only 1 5 X\nq1 Q0 mid 3 1.0 X\n";
	let (run, _) = parse(text, MalformedRecords::Abort).expect("Run must parse.");
	let q1: Vec<&str> = run.get("q1").expect("q1 must exist.").doc_ids().collect();

	assert_eq!(q1, vec!["low", "high", "mid"]);
	assert_eq!(run.query_ids(), ["q1".to_string(), "q2".to_string()]);
}

#[test]
fn blank_lines_are_ignored() {
	let text = "\nq1 Q0 d1 1 1.0 X\n   \nq1 Q0 d2 2 0.5 X\n";
	let (run, report) = parse(text, MalformedRecords::Abort).expect("Run must parse.");

	assert_eq!(run.record_count(), 2);
	assert_eq!(report.records, 2);
}

#[test]
fn wrong_field_count_aborts_with_line_context() {
	let text = "q1 Q0 d1 1 1.0 X\nq1 Q0 d2 2 0.5\n";
	let err = parse(text, MalformedRecords::Abort).expect_err("Short record must fail.");

	match &err {
		Error::Parse { path, line, field, .. } => {
			assert_eq!(path, Path::new("inline.trec"));
			assert_eq!(*line, 2);
			assert_eq!(*field, "record");
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	assert!(err.to_string().contains("line 2"), "Unexpected message: {err}");
}

#[test]
fn non_numeric_score_and_rank_name_their_fields() {
	let score_err = parse("q1 Q0 d1 1 high X\n", MalformedRecords::Abort)
		.expect_err("Non-numeric score must fail.");
	let rank_err = parse("q1 Q0 d1 first 1.0 X\n", MalformedRecords::Abort)
		.expect_err("Non-numeric rank must fail.");

	assert!(matches!(score_err, Error::Parse { field: "score", .. }), "{score_err:?}");
	assert!(matches!(rank_err, Error::Parse { field: "rank", .. }), "{rank_err:?}");
}

#[test]
fn skip_policy_reports_every_dropped_record() {
	let text = "\
q1 Q0 d1 1 1.0 X
q1 Q0 d2 two 0.5 X
q1 Q0 d3 3 0.25 X
q1 Q0 d1 4 0.1 X
q2 Q0 d1 1 1.0
";
	let (run, report) = parse(text, MalformedRecords::Skip).expect("Skip policy must not fail.");
	let lines: Vec<usize> = report
		.skipped
		.iter()
		.map(|err| match err {
			Error::Parse { line, .. } => *line,
			other => panic!("Unexpected error: {other:?}"),
		})
		.collect();
	let q1: Vec<&str> = run.get("q1").expect("q1 must exist.").doc_ids().collect();

	assert_eq!(lines, vec![2, 4, 5]);
	assert_eq!(report.records, 2);
	assert_eq!(q1, vec!["d1", "d3"]);
	assert!(!run.contains("q2"));
}

#[test]
fn duplicate_doc_within_a_query_is_malformed() {
	let err = parse("q1 Q0 d1 1 1.0 X\nq1 Q0 d1 2 0.5 X\n", MalformedRecords::Abort)
		.expect_err("Duplicate doc must fail.");

	assert!(matches!(err, Error::Parse { line: 2, field: "doc_id", .. }), "{err:?}");

	let (run, _) = parse("q1 Q0 d1 1 1.0 X\nq2 Q0 d1 1 0.5 X\n", MalformedRecords::Abort)
		.expect("Same doc under different queries is fine.");

	assert_eq!(run.len(), 2);
}

#[test]
fn missing_run_file_is_an_io_error() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let path = dir.path().join("absent.trec");
	let err = reader::read_run(&path, MalformedRecords::Abort).expect_err("Missing file must fail.");

	assert!(matches!(err, Error::Io { .. }), "Unexpected error: {err:?}");
}

#[test]
fn qrels_keep_first_seen_query_order() {
	let text = "q9\t0\td1\t1\nq3\t0\td2\t1\nq9\t0\td3\t0\nq3 0 d4 2\n";
	let qrels: Qrels =
		qrels::parse_qrels(text.as_bytes(), Path::new("qrels.tsv")).expect("Qrels must parse.");

	assert_eq!(qrels.query_ids(), ["q9".to_string(), "q3".to_string()]);
	assert_eq!(qrels.judgments("q9").len(), 2);
	assert_eq!(qrels.relevant("q9"), HashSet::from(["d1"]));
	assert_eq!(qrels.relevant("q3"), HashSet::from(["d2", "d4"]));
	assert!(qrels.relevant("absent").is_empty());
}

#[test]
fn qrels_reject_short_records() {
	let err = qrels::parse_qrels("q1 0 d1\n".as_bytes(), Path::new("qrels.tsv"))
		.expect_err("Short qrels record must fail.");

	assert!(matches!(err, Error::Parse { line: 1, .. }), "Unexpected error: {err:?}");
}

#[test]
fn selected_queries_follow_qrels_and_skip_absent_runs() {
	let run = sample_run();
	let ids = vec!["q1".to_string(), "q7".to_string(), "q2".to_string(), "q1".to_string()];

	assert_eq!(qrels::select_queries(&ids, &run), vec!["q1".to_string(), "q2".to_string()]);
}

#[test]
fn collection_subset_keeps_listed_passages_verbatim() {
	let dir = TempDir::new().expect("Failed to create temp dir.");
	let collection_path = dir.path().join("collection.tsv");
	let ids_path = dir.path().join("ids.txt");
	let out_path = dir.path().join("subset.tsv");

	fs::write(&collection_path, "1\tfirst passage\n2\tsecond\tpassage\n3\tthird\n")
		.expect("Failed to write collection.");
	fs::write(&ids_path, " 3 \n\n2\n").expect("Failed to write ids.");

	let ids = collection::read_id_set(&ids_path).expect("Ids must load.");
	let report =
		collection::filter_collection(&collection_path, &ids, &out_path).expect("Filter must run.");
	let written = fs::read_to_string(&out_path).expect("Subset must be readable.");

	assert_eq!(report, collection::SubsetReport { read: 3, kept: 2 });
	assert_eq!(written, "2\tsecond\tpassage\n3\tthird\n");
}
