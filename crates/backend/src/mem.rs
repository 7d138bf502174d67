//! In-memory backend: `{id → blob}` with no durability.

use std::collections::HashMap;

use faultmap_core::{Payload, Snapshot};
use tracing::debug;

use crate::backend::Backend;
use crate::config::BackendConfig;
use crate::error::BackendError;

/// Map-backed backend for tests and tooling.
///
/// Snapshots are held as encoded blobs so that load/store exercise the same
/// codec path as a durable backend; contents vanish with the instance.
#[derive(Debug, Default)]
pub struct MemBackend {
	config: BackendConfig,
	blobs: HashMap<String, Vec<u8>>,
}

impl MemBackend {
	/// Creates an empty backend.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored objects.
	pub fn len(&self) -> usize {
		self.blobs.len()
	}

	/// Returns whether nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.blobs.is_empty()
	}
}

impl Backend for MemBackend {
	fn config_mut(&mut self) -> &mut BackendConfig {
		&mut self.config
	}

	fn init(&mut self) -> Result<(), BackendError> {
		Ok(())
	}

	fn load(&self, id: &str, out: &mut dyn Payload) -> Result<(), BackendError> {
		let blob = self.blobs.get(id).ok_or_else(|| BackendError::NotFound {
			id: id.to_string(),
		})?;
		let snapshot: Snapshot =
			postcard::from_bytes(blob).map_err(|e| BackendError::Decode(e.to_string()))?;
		out.apply(&snapshot)?;
		debug!(id, "loaded state from memory");
		Ok(())
	}

	fn store(&mut self, id: &str, payload: &dyn Payload) -> Result<(), BackendError> {
		let blob = postcard::to_allocvec(&payload.capture())
			.map_err(|e| BackendError::Encode(e.to_string()))?;
		debug!(id, bytes = blob.len(), "stored state in memory");
		self.blobs.insert(id.to_string(), blob);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use faultmap_core::{Blacklist, ResourceManager, SwitchMode, index_space};

	use super::*;

	index_space! {
		struct Slot in 0..384;
	}

	#[test]
	fn round_trips_a_manager() {
		let mut manager = ResourceManager::<Slot, Blacklist>::new();
		manager.enable_all();
		manager
			.disable(Slot::new(7).unwrap(), SwitchMode::Strict)
			.unwrap();

		let mut backend = MemBackend::new();
		backend.init().unwrap();
		backend.store("wafer-3", &manager).unwrap();

		let mut restored = ResourceManager::<Slot, Blacklist>::new();
		backend.load("wafer-3", &mut restored).unwrap();
		assert_eq!(restored, manager);
		assert_eq!(restored.available(), 383);
		assert!(!restored.has(Slot::new(7).unwrap()).unwrap());
	}

	#[test]
	fn missing_ids_report_not_found() {
		let backend = MemBackend::new();
		let mut out = ResourceManager::<Slot, Blacklist>::new();
		let err = backend.load("wafer-0", &mut out).unwrap_err();
		assert!(matches!(err, BackendError::NotFound { id } if id == "wafer-0"));
	}

	#[test]
	fn store_overwrites_previous_objects() {
		let mut first = ResourceManager::<Slot, Blacklist>::new();
		first.enable_all();
		let mut second = first.clone();
		second
			.disable(Slot::new(12).unwrap(), SwitchMode::Strict)
			.unwrap();

		let mut backend = MemBackend::new();
		backend.store("wafer-1", &first).unwrap();
		backend.store("wafer-1", &second).unwrap();
		assert_eq!(backend.len(), 1);

		let mut restored = ResourceManager::<Slot, Blacklist>::new();
		backend.load("wafer-1", &mut restored).unwrap();
		assert_eq!(restored, second);
	}
}
