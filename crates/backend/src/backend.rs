//! The persistence backend contract.

use std::sync::Arc;

use faultmap_core::Payload;
use parking_lot::Mutex;

use crate::config::BackendConfig;
use crate::error::BackendError;

/// A pluggable store for serialized resource state, keyed by string id.
///
/// Lifecycle: construct, accumulate configuration, [`init`](Backend::init),
/// then any number of [`load`](Backend::load)/[`store`](Backend::store)
/// calls. Stores are whole-object overwrites with no atomicity guarantee;
/// calls are blocking and not reentrant-safe for the same id.
pub trait Backend {
	/// The accumulated configuration map.
	fn config_mut(&mut self) -> &mut BackendConfig;

	/// Validates and applies the accumulated configuration.
	fn init(&mut self) -> Result<(), BackendError>;

	/// Loads the object stored under `id` and applies it onto `out`.
	///
	/// Fails with [`BackendError::NotFound`] when nothing is stored under
	/// `id`; `out` keeps its identity and receives only the decoded state.
	fn load(&self, id: &str, out: &mut dyn Payload) -> Result<(), BackendError>;

	/// Stores `payload` under `id`, overwriting any previous object.
	fn store(&mut self, id: &str, payload: &dyn Payload) -> Result<(), BackendError>;
}

/// Shared handle to a backend, as held by domain objects.
pub type SharedBackend = Arc<Mutex<dyn Backend>>;

/// Wraps a backend into a [`SharedBackend`] handle.
pub fn shared(backend: impl Backend + 'static) -> SharedBackend {
	Arc::new(Mutex::new(backend))
}
