//! Persistence backends for resource state.
//!
//! Defines the [`Backend`] contract (configure, init, load, store over
//! string ids and opaque [`Payload`](faultmap_core::Payload) objects), an
//! in-memory implementation, and the dynamic loader that produces backends
//! from shared-library plugins.

/// The backend contract and shared handle type.
pub mod backend;
/// Accumulated string/int configuration.
pub mod config;
/// Backend and plugin error types.
pub mod error;
/// The in-memory mock backend.
pub mod mem;
/// Shared-library plugin loading.
pub mod plugin;

pub use backend::{Backend, SharedBackend, shared};
pub use config::{BackendConfig, ConfigValue};
pub use error::{BackendError, PluginError};
pub use mem::MemBackend;
pub use plugin::{
	CREATE_SYMBOL, CreateBackendFn, DESTROY_SYMBOL, DestroyBackendFn, Library, LoadOptions,
	PluginBackend, backend_library_name, load_backend,
};
