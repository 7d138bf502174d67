//! FPGA-level defect state.

use faultmap_backend::{BackendError, SharedBackend};
use faultmap_core::{CompositeSnapshot, Error as StateError, Payload, Snapshot};
use tracing::debug;

use crate::components::Links;
use crate::coords::{FpgaOnWafer, WaferId};
use crate::error::Result;

/// Defect state of one wafer FPGA.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fpga {
	/// Highspeed links to the chips this FPGA drives.
	pub links: Links,
}

impl Fpga {
	/// Composite schema version written by this build.
	pub const SNAPSHOT_VERSION: u32 = 1;

	/// Creates an FPGA with every link at its policy default.
	pub fn new() -> Self {
		Self::default()
	}
}

impl Payload for Fpga {
	fn capture(&self) -> Snapshot {
		let mut composite = CompositeSnapshot::new(Self::SNAPSHOT_VERSION);
		composite.insert("links", self.links.capture());
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
		if let Some(section) = composite.section("links") {
			next.links.apply(section)?;
		}
		*self = next;
		Ok(())
	}
}

/// An FPGA bound to a backend and a storage identity.
pub struct FpgaWithBackend {
	wafer: WaferId,
	coord: FpgaOnWafer,
	backend: SharedBackend,
	/// The FPGA state itself.
	pub fpga: Fpga,
}

impl FpgaWithBackend {
	/// Loads the FPGA stored under `fpga-{wafer}-{coord}`.
	pub fn new(
		backend: SharedBackend,
		wafer: WaferId,
		coord: FpgaOnWafer,
		ignore_missing: bool,
	) -> Result<Self> {
		let mut this = Self {
			wafer,
			coord,
			backend,
			fpga: Fpga::new(),
		};
		match this.backend.lock().load(&this.storage_id(), &mut this.fpga) {
			Ok(()) => {}
			Err(BackendError::NotFound { id }) if ignore_missing => {
				debug!(id = %id, "no persisted fpga state, starting from defaults");
			}
			Err(err) => return Err(err.into()),
		}
		Ok(this)
	}

	/// Identifier this FPGA is stored under.
	pub fn storage_id(&self) -> String {
		format!("fpga-{}-{}", self.wafer, self.coord)
	}

	/// The FPGA coordinate on its wafer.
	pub fn coord(&self) -> FpgaOnWafer {
		self.coord
	}

	/// Persists the current state.
	pub fn save(&self) -> Result<()> {
		self.backend
			.lock()
			.store(&self.storage_id(), &self.fpga)?;
		Ok(())
	}
}
