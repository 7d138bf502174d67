//! Error types for persistence backends and plugin loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by [`Backend`](crate::Backend) implementations.
#[derive(Debug, Error)]
pub enum BackendError {
	/// No persisted object exists under the given id.
	///
	/// The only error domain objects may catch and ignore, and only when
	/// the caller explicitly asked to tolerate missing data.
	#[error("no persisted object under id {id:?}")]
	NotFound {
		/// The identifier that was looked up.
		id: String,
	},

	/// `init` found the accumulated configuration invalid.
	#[error("backend configuration invalid: {0}")]
	Config(String),

	/// Underlying filesystem failure.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// The payload could not be encoded.
	#[error("failed to encode payload: {0}")]
	Encode(String),

	/// The persisted bytes could not be decoded.
	#[error("failed to decode persisted object: {0}")]
	Decode(String),

	/// Applying the decoded snapshot onto the payload failed.
	#[error(transparent)]
	State(#[from] faultmap_core::Error),
}

/// Errors reported while loading a backend plugin library.
///
/// All of them surface before any backend instance is produced.
#[derive(Debug, Error)]
pub enum PluginError {
	/// The shared library could not be loaded.
	#[error("cannot load backend library {path}: {reason}")]
	Library {
		/// Path that was passed to the loader.
		path: PathBuf,
		/// Loader error text.
		reason: String,
	},

	/// A required ABI symbol is missing from the library.
	#[error("cannot resolve symbol {name} in {path}: {reason}")]
	Symbol {
		/// Name of the missing symbol.
		name: &'static str,
		/// Path of the library.
		path: PathBuf,
		/// Loader error text.
		reason: String,
	},

	/// The factory symbol ran but produced no backend.
	#[error("backend factory in {path} returned no backend")]
	Factory {
		/// Path of the library.
		path: PathBuf,
	},
}
