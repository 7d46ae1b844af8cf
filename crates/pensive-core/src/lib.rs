//! pensive-core - Core types and traits for PensiveDB
//!
//! This crate provides the foundational types, traits, and error handling
//! used throughout the pensive workspace.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
pub mod vector;

pub use config::*;
pub use error::{PensiveError, Result};
pub use traits::*;
pub use types::*;
pub use vector::{vector_from_bytes, vector_to_bytes};
