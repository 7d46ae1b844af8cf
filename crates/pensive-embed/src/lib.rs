//! pensive-embed - Embedding backends
//!
//! Text-to-vector generation is an external collaborator: the store only
//! requires a deterministic dimension per session. This crate ships
//! [`HashEmbedder`], a fully local, deterministic backend suitable for
//! the CLI and tests. A model-backed embedder plugs in behind the same
//! [`pensive_core::Embedder`] trait.

mod hash;

pub use hash::HashEmbedder;

// Re-export the Embedder trait for convenience
pub use pensive_core::Embedder;
