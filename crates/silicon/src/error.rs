//! Errors of the composite domain objects.

use thiserror::Error;

/// Errors reported by domain objects and their backend plumbing.
#[derive(Debug, Error)]
pub enum Error {
	/// The operation needs a backend but none is attached.
	#[error("no backend attached")]
	NoBackend,

	/// Backend failure while loading or storing.
	#[error(transparent)]
	Backend(#[from] faultmap_backend::BackendError),

	/// Resource-state failure, e.g. a coordinate rejected by a predicate.
	#[error(transparent)]
	State(#[from] faultmap_core::Error),
}

/// Result type for domain-object operations.
pub type Result<T> = std::result::Result<T, Error>;
