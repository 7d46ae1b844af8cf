//! pensive-index - In-memory vector index
//!
//! Exact cosine-similarity search over normalized vectors. The index
//! holds only transient ranking state and is fully reconstructable from
//! storage; an accelerated backend can substitute behind the
//! [`pensive_core::VectorIndex`] contract.

mod flat;
mod norm;

pub use flat::FlatIndex;
pub use norm::{dot, l2_normalize};
