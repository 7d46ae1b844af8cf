//! pensive-query - Structured filtering and hybrid search
//!
//! Evaluates structured field filters against stored documents and
//! merges them with ranked semantic results from the vector index.

mod engine;
mod filter;

pub use engine::{QueryEngine, QueryHit, QueryRequest};
pub use filter::{matches_all, Filter, FilterOp};
