//! Error types for resource-state tracking.

use thiserror::Error;

/// Errors reported by index construction, managers, and snapshot decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
	/// A raw value lies outside the index space's declared domain.
	#[error("raw value {value} outside index domain [{begin}, {end})")]
	OutOfRange {
		/// The offending raw value.
		value: u64,
		/// Inclusive lower bound of the domain.
		begin: u64,
		/// Exclusive upper bound of the domain.
		end: u64,
	},

	/// An index was rejected by the manager's predicate.
	#[error("index {value} rejected by the active predicate")]
	Rejected {
		/// Raw value of the rejected index.
		value: u64,
	},

	/// Strict enable of an index that is already enabled.
	#[error("resource {value} is already enabled")]
	AlreadyEnabled {
		/// Raw value of the index.
		value: u64,
	},

	/// Strict disable of an index that is already disabled.
	#[error("resource {value} is already disabled")]
	AlreadyDisabled {
		/// Raw value of the index.
		value: u64,
	},

	/// A snapshot carries a version tag newer than this build understands.
	#[error("unsupported snapshot version {found} (newest supported: {supported})")]
	UnsupportedVersion {
		/// Version tag found in the snapshot.
		found: u32,
		/// Newest version this build can decode.
		supported: u32,
	},

	/// A snapshot does not have the shape the payload expects.
	#[error("malformed snapshot: {reason}")]
	MalformedSnapshot {
		/// What was wrong with the snapshot.
		reason: &'static str,
	},
}

/// Result type for resource-state operations.
pub type Result<T> = std::result::Result<T, Error>;
