//! Ranked-list runs in the six-column TREC format, plus the qrels and collection files that
//! accompany them in a passage-retrieval evaluation.

pub mod collection;
pub mod qrels;
pub mod reader;
pub mod writer;

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{RankedList, Run, ScoredDoc};

/// Literal placed in the second column of every run record.
pub const PLACEHOLDER: &str = "Q0";
