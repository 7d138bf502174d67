//! Wafer-level defect state and backend-cached child lookup.

use std::collections::HashMap;
use std::sync::Arc;

use faultmap_backend::{BackendError, SharedBackend};
use faultmap_core::{CompositeSnapshot, Error as StateError, Payload, Snapshot};
use parking_lot::Mutex;
use tracing::debug;

use crate::chip::Chip;
use crate::components::{Chips, Fpgas};
use crate::coords::{ChipOnWafer, FpgaOnWafer, WaferId};
use crate::error::{Error, Result};
use crate::fpga::Fpga;

/// Defect state of one wafer: which chip slots and FPGAs are usable.
///
/// Snapshot history: version 1 stored `chips` only; version 2 added the
/// `fpgas` section. Older blobs leave `fpgas` at its default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wafer {
	/// Chip slots.
	pub chips: Chips,
	/// FPGAs.
	pub fpgas: Fpgas,
}

impl Wafer {
	/// Composite schema version written by this build.
	pub const SNAPSHOT_VERSION: u32 = 2;

	/// Creates a wafer with every slot at its policy default.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns whether the chip slot is usable.
	pub fn has_chip(&self, coord: ChipOnWafer) -> Result<bool> {
		Ok(self.chips.has(coord)?)
	}

	/// Returns whether the FPGA is usable.
	pub fn has_fpga(&self, coord: FpgaOnWafer) -> Result<bool> {
		Ok(self.fpgas.has(coord)?)
	}
}

impl Payload for Wafer {
	fn capture(&self) -> Snapshot {
		let mut composite = CompositeSnapshot::new(Self::SNAPSHOT_VERSION);
		composite.insert("chips", self.chips.capture());
		composite.insert("fpgas", self.fpgas.capture());
		Snapshot::Composite(composite)
	}

	fn apply(&mut self, snapshot: &Snapshot) -> std::result::Result<(), StateError> {
		let composite = snapshot.as_composite()?;
		if composite.version > Self::SNAPSHOT_VERSION {
			return Err(StateError::UnsupportedVersion {
				found: composite.version,
				supported: Self::SNAPSHOT_VERSION,
			});
		}

		let mut next = self.clone();
		if let Some(section) = composite.section("chips") {
			next.chips.apply(section)?;
		}
		if let Some(section) = composite.section("fpgas") {
			next.fpgas.apply(section)?;
		}
		*self = next;
		Ok(())
	}
}

/// A wafer bound to a backend, with lazily loaded child objects.
///
/// Child chips and FPGAs are fetched from the backend on first access and
/// held in a cache keyed by coordinate; cache hits never touch the backend.
/// A pre-built child can be [`inject`](WaferWithBackend::inject_chip)ed,
/// shadowing whatever the backend holds.
pub struct WaferWithBackend {
	id: WaferId,
	backend: SharedBackend,
	/// The wafer-level state itself.
	pub wafer: Wafer,
	ignore_missing: bool,
	ignore_disabled: bool,
	chip_cache: HashMap<ChipOnWafer, Arc<Mutex<Chip>>>,
	fpga_cache: HashMap<FpgaOnWafer, Arc<Mutex<Fpga>>>,
}

impl std::fmt::Debug for WaferWithBackend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WaferWithBackend")
			.field("id", &self.id)
			.field("wafer", &self.wafer)
			.field("ignore_missing", &self.ignore_missing)
			.field("ignore_disabled", &self.ignore_disabled)
			.field("chip_cache", &self.chip_cache)
			.field("fpga_cache", &self.fpga_cache)
			.finish_non_exhaustive()
	}
}

impl WaferWithBackend {
	/// Loads the wafer stored under `wafer-{id}`.
	///
	/// With `ignore_missing`, missing persisted objects (the wafer itself
	/// as well as children fetched later) yield default state instead of an
	/// error.
	pub fn new(backend: SharedBackend, id: WaferId, ignore_missing: bool) -> Result<Self> {
		let mut this = Self {
			id,
			backend,
			wafer: Wafer::new(),
			ignore_missing,
			ignore_disabled: false,
			chip_cache: HashMap::new(),
			fpga_cache: HashMap::new(),
		};
		this.load(ignore_missing)?;
		Ok(this)
	}

	/// The wafer site this object belongs to.
	pub fn id(&self) -> WaferId {
		self.id
	}

	/// Identifier the wafer-level state is stored under.
	pub fn storage_id(&self) -> String {
		format!("wafer-{}", self.id)
	}

	/// When set, [`chip`](Self::chip) and [`fpga`](Self::fpga) hand out
	/// children even for coordinates disabled in the wafer-level managers.
	pub fn set_ignore_disabled(&mut self, ignore: bool) {
		self.ignore_disabled = ignore;
	}

	/// Returns the chip behind `coord`, loading it on first access.
	///
	/// Yields `None` when the slot is disabled in [`Wafer::chips`] and
	/// disabled coordinates are not ignored.
	pub fn chip(&mut self, coord: ChipOnWafer) -> Result<Option<Arc<Mutex<Chip>>>> {
		if !self.ignore_disabled && !self.wafer.chips.has(coord)? {
			return Ok(None);
		}
		if let Some(cached) = self.chip_cache.get(&coord) {
			return Ok(Some(cached.clone()));
		}

		let mut chip = Chip::new();
		let id = format!("chip-{}-{}", self.id, coord);
		match self.backend.lock().load(&id, &mut chip) {
			Ok(()) => {}
			Err(BackendError::NotFound { .. }) if self.ignore_missing => {
				debug!(id = %id, "no persisted chip state, using defaults");
			}
			Err(err) => return Err(err.into()),
		}

		let entry = Arc::new(Mutex::new(chip));
		self.chip_cache.insert(coord, entry.clone());
		Ok(Some(entry))
	}

	/// Returns the FPGA behind `coord`, loading it on first access.
	pub fn fpga(&mut self, coord: FpgaOnWafer) -> Result<Option<Arc<Mutex<Fpga>>>> {
		if !self.ignore_disabled && !self.wafer.fpgas.has(coord)? {
			return Ok(None);
		}
		if let Some(cached) = self.fpga_cache.get(&coord) {
			return Ok(Some(cached.clone()));
		}

		let mut fpga = Fpga::new();
		let id = format!("fpga-{}-{}", self.id, coord);
		match self.backend.lock().load(&id, &mut fpga) {
			Ok(()) => {}
			Err(BackendError::NotFound { .. }) if self.ignore_missing => {
				debug!(id = %id, "no persisted fpga state, using defaults");
			}
			Err(err) => return Err(err.into()),
		}

		let entry = Arc::new(Mutex::new(fpga));
		self.fpga_cache.insert(coord, entry.clone());
		Ok(Some(entry))
	}

	/// Puts a pre-built chip into the cache, shadowing the backend.
	///
	/// Lookup through [`chip`](Self::chip) still depends on the slot's
	/// status in [`Wafer::chips`].
	pub fn inject_chip(&mut self, coord: ChipOnWafer, chip: Arc<Mutex<Chip>>) {
		self.chip_cache.insert(coord, chip);
	}

	/// Puts a pre-built FPGA into the cache, shadowing the backend.
	pub fn inject_fpga(&mut self, coord: FpgaOnWafer, fpga: Arc<Mutex<Fpga>>) {
		self.fpga_cache.insert(coord, fpga);
	}

	/// Re-fetches the wafer-level state from the backend.
	pub fn load(&mut self, ignore_missing: bool) -> Result<()> {
		let id = self.storage_id();
		match self.backend.lock().load(&id, &mut self.wafer) {
			Ok(()) => Ok(()),
			Err(BackendError::NotFound { .. }) if ignore_missing => {
				debug!(id = %id, "no persisted wafer state, starting from defaults");
				Ok(())
			}
			Err(err) => Err(err.into()),
		}
	}

	/// Persists the wafer-level state.
	///
	/// Cached children are separate objects and save through their own
	/// `*WithBackend` wrappers.
	pub fn save(&self) -> Result<()> {
		self.backend
			.lock()
			.store(&self.storage_id(), &self.wafer)
			.map_err(Error::from)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use faultmap_backend::{MemBackend, shared};
	use faultmap_core::SwitchMode;

	use super::*;

	fn backend() -> SharedBackend {
		shared(MemBackend::new())
	}

	#[test]
	fn wafer_snapshot_round_trips_both_sections() {
		let mut wafer = Wafer::new();
		wafer.chips.enable_all();
		wafer
			.chips
			.disable(ChipOnWafer::new(7).unwrap(), SwitchMode::Strict)
			.unwrap();
		wafer.fpgas.enable_all();

		let mut restored = Wafer::new();
		restored.apply(&wafer.capture()).unwrap();
		assert_eq!(restored, wafer);
		assert_eq!(restored.chips.available(), 383);
	}

	#[test]
	fn version_one_blobs_leave_fpgas_untouched() {
		let mut wafer = Wafer::new();
		wafer.chips.enable_all();
		wafer.fpgas.enable_all();

		let Snapshot::Composite(mut composite) = wafer.capture() else {
			panic!("wafer captures as a composite");
		};
		composite.version = 1;
		composite.sections.remove("fpgas");

		let mut restored = Wafer::new();
		restored.apply(&Snapshot::Composite(composite)).unwrap();
		assert!(restored.chips.has_value());
		assert!(!restored.fpgas.has_value());
	}

	#[test]
	fn children_are_cached_after_the_first_lookup() {
		let mut wafer = WaferWithBackend::new(backend(), WaferId(3), true).unwrap();
		wafer.wafer.chips.enable_all();

		let coord = ChipOnWafer::new(27).unwrap();
		let first = wafer.chip(coord).unwrap().expect("slot is enabled");
		first
			.lock()
			.neurons
			.disable_all();

		let second = wafer.chip(coord).unwrap().expect("slot is enabled");
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(second.lock().neurons.available(), 0);
	}

	#[test]
	fn disabled_slots_yield_no_child() {
		let mut wafer = WaferWithBackend::new(backend(), WaferId(3), true).unwrap();
		wafer.wafer.chips.enable_all();
		let coord = ChipOnWafer::new(5).unwrap();
		wafer
			.wafer
			.chips
			.disable(coord, SwitchMode::Strict)
			.unwrap();

		assert!(wafer.chip(coord).unwrap().is_none());

		wafer.set_ignore_disabled(true);
		assert!(wafer.chip(coord).unwrap().is_some());
	}

	#[test]
	fn injected_children_shadow_the_backend() {
		let mut wafer = WaferWithBackend::new(backend(), WaferId(3), true).unwrap();
		wafer.wafer.chips.enable_all();

		let coord = ChipOnWafer::new(12).unwrap();
		let mut chip = Chip::new();
		chip.drivers.disable_all();
		let injected = Arc::new(Mutex::new(chip));
		wafer.inject_chip(coord, injected.clone());

		let got = wafer.chip(coord).unwrap().expect("slot is enabled");
		assert!(Arc::ptr_eq(&injected, &got));
		assert_eq!(got.lock().drivers.available(), 0);
	}

	#[test]
	fn save_and_reload_through_a_shared_backend() {
		let backend = backend();
		{
			let mut wafer = WaferWithBackend::new(backend.clone(), WaferId(3), true).unwrap();
			wafer.wafer.chips.enable_all();
			wafer
				.wafer
				.chips
				.disable(ChipOnWafer::new(7).unwrap(), SwitchMode::Strict)
				.unwrap();
			wafer.save().unwrap();
		}

		let reloaded = WaferWithBackend::new(backend, WaferId(3), false).unwrap();
		assert_eq!(reloaded.wafer.chips.available(), 383);
		assert!(
			!reloaded
				.wafer
				.has_chip(ChipOnWafer::new(7).unwrap())
				.unwrap()
		);
	}

	#[test]
	fn missing_wafer_state_errors_unless_ignored() {
		let err = WaferWithBackend::new(backend(), WaferId(9), false).unwrap_err();
		assert!(matches!(
			err,
			Error::Backend(BackendError::NotFound { id }) if id == "wafer-9"
		));
	}
}
