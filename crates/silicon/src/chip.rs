//! Chip-level defect state.

use faultmap_backend::{BackendError, SharedBackend};
use faultmap_core::{CompositeSnapshot, Error as StateError, Payload, Snapshot};
use tracing::debug;

use crate::components::{AnalogOuts, ColumnBuses, Drivers, Mergers, Neurons, RowBuses};
use crate::coords::{ChipOnWafer, WaferId};
use crate::error::Result;

/// Defect state of every tracked component class of one chip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chip {
	/// Neuron circuits.
	pub neurons: Neurons,
	/// Synapse drivers.
	pub drivers: Drivers,
	/// Horizontal bus lanes.
	pub row_buses: RowBuses,
	/// Vertical bus lanes.
	pub column_buses: ColumnBuses,
	/// Event mergers.
	pub mergers: Mergers,
	/// Analog readout channels.
	pub analog_outs: AnalogOuts,
}

impl Chip {
	/// Composite schema version written by this build.
	pub const SNAPSHOT_VERSION: u32 = 1;

	/// Creates a chip with every component at its policy default.
	pub fn new() -> Self {
		Self::default()
	}

	/// Intersects every component manager with its counterpart in `other`.
	pub fn intersection(&mut self, other: &Chip) {
		self.neurons.intersection(&other.neurons);
		self.drivers.intersection(&other.drivers);
		self.row_buses.intersection(&other.row_buses);
		self.column_buses.intersection(&other.column_buses);
		self.mergers.intersection(&other.mergers);
		self.analog_outs.intersection(&other.analog_outs);
	}
}

impl Payload for Chip {
	fn capture(&self) -> Snapshot {
		let mut composite = CompositeSnapshot::new(Self::SNAPSHOT_VERSION);
		composite.insert("neurons", self.neurons.capture());
		composite.insert("drivers", self.drivers.capture());
		composite.insert("row_buses", self.row_buses.capture());
		composite.insert("column_buses", self.column_buses.capture());
		composite.insert("mergers", self.mergers.capture());
		composite.insert("analog_outs", self.analog_outs.capture());
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

		// Sections absent from older blobs leave the component untouched.
		let mut next = self.clone();
		if let Some(section) = composite.section("neurons") {
			next.neurons.apply(section)?;
		}
		if let Some(section) = composite.section("drivers") {
			next.drivers.apply(section)?;
		}
		if let Some(section) = composite.section("row_buses") {
			next.row_buses.apply(section)?;
		}
		if let Some(section) = composite.section("column_buses") {
			next.column_buses.apply(section)?;
		}
		if let Some(section) = composite.section("mergers") {
			next.mergers.apply(section)?;
		}
		if let Some(section) = composite.section("analog_outs") {
			next.analog_outs.apply(section)?;
		}
		*self = next;
		Ok(())
	}
}

/// A chip bound to a backend and a storage identity.
pub struct ChipWithBackend {
	wafer: WaferId,
	coord: ChipOnWafer,
	backend: SharedBackend,
	/// The chip state itself.
	pub chip: Chip,
}

impl ChipWithBackend {
	/// Loads the chip stored under `chip-{wafer}-{coord}`.
	///
	/// With `ignore_missing`, a missing persisted object yields default
	/// (all-usable) state instead of an error.
	pub fn new(
		backend: SharedBackend,
		wafer: WaferId,
		coord: ChipOnWafer,
		ignore_missing: bool,
	) -> Result<Self> {
		let mut this = Self {
			wafer,
			coord,
			backend,
			chip: Chip::new(),
		};
		match this.backend.lock().load(&this.storage_id(), &mut this.chip) {
			Ok(()) => {}
			Err(BackendError::NotFound { id }) if ignore_missing => {
				debug!(id = %id, "no persisted chip state, starting from defaults");
			}
			Err(err) => return Err(err.into()),
		}
		Ok(this)
	}

	/// Identifier this chip is stored under.
	pub fn storage_id(&self) -> String {
		format!("chip-{}-{}", self.wafer, self.coord)
	}

	/// The chip coordinate on its wafer.
	pub fn coord(&self) -> ChipOnWafer {
		self.coord
	}

	/// Persists the current state.
	pub fn save(&self) -> Result<()> {
		self.backend
			.lock()
			.store(&self.storage_id(), &self.chip)?;
		Ok(())
	}
}
