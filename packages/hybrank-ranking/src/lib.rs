//! Ranking stages for hybrid passage retrieval: rank fusion, dense reranking, and ANN retrieval
//! over a shared embedding store.

pub mod ann;
pub mod batch;
pub mod rerank;
pub mod rrf;
pub mod store;

mod error;
mod order;

pub use ann::{AnnBuilder, AnnIndex, AnnParams, HnswBuilder, HnswIndex, InnerProduct};
pub use batch::{BatchOutcome, DroppedDocs, Executor, QueryFailure};
pub use error::{Error, LookupKind, Result};
pub use order::{cmp_f32_desc, cmp_f64_desc};
pub use rerank::RerankOutcome;
pub use rrf::RrfParams;
pub use store::EmbeddingStore;
