//! Wafer-scale hardware coordinates and composite defect-state objects.
//!
//! Builds on `faultmap-core` managers and the `faultmap-backend` contract:
//! coordinate spaces for one wafer generation, per-component blacklist
//! managers, and the [`Wafer`]/[`Chip`]/[`Fpga`] bundles with lazy,
//! backend-cached child lookup.

/// Chip-level state and backend binding.
pub mod chip;
/// Per-component manager aliases.
pub mod components;
/// Coordinate spaces and the wafer site id.
pub mod coords;
/// Domain-object errors.
pub mod error;
/// FPGA-level state and backend binding.
pub mod fpga;
/// Wafer-level state, child caches, and backend binding.
pub mod wafer;

pub use chip::{Chip, ChipWithBackend};
pub use components::{
	AnalogOuts, Chips, ColumnBuses, Drivers, Fpgas, Links, Mergers, Neurons, RowBuses,
};
pub use coords::{
	AnalogOutOnChip, ChipOnWafer, ColumnBusOnChip, DriverOnChip, FpgaOnWafer, LinkOnFpga,
	MergerOnChip, NeuronOnChip, RowBusOnChip, WaferId,
};
pub use error::{Error, Result};
pub use fpga::{Fpga, FpgaWithBackend};
pub use wafer::{Wafer, WaferWithBackend};
