//! Library error type.
//!
//! Resolution failures are reported through [`crate::resolver::ResolutionError`] instead,
//! since they carry the provider's requirement and candidate types.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("validation error: {0}")]
	Validation(String),
	#[error("node not found in graph: {0}")]
	NodeNotFound(String),
	#[error("candidate not found in index: {0}")]
	CandidateNotFound(String),
}
