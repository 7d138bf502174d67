//! Coordinate spaces of the wafer-scale system.

use std::fmt;

use faultmap_core::index_space;

index_space! {
	/// One of the 384 chip slots on a wafer.
	pub struct ChipOnWafer in 0..384;

	/// One of the 48 FPGAs driving a wafer.
	pub struct FpgaOnWafer in 0..48;

	/// One of the 8 highspeed links of an FPGA.
	pub struct LinkOnFpga in 0..8;

	/// One of the 512 neuron circuits of a chip.
	pub struct NeuronOnChip in 0..512;

	/// One of the 224 synapse drivers of a chip.
	pub struct DriverOnChip in 0..224;

	/// One of the 64 horizontal bus lanes of a chip.
	pub struct RowBusOnChip in 0..64;

	/// One of the 256 vertical bus lanes of a chip.
	pub struct ColumnBusOnChip in 0..256;

	/// One of the 24 event mergers of a chip.
	pub struct MergerOnChip in 0..24;

	/// One of the 2 analog readout channels of a chip.
	pub struct AnalogOutOnChip in 0..2;
}

/// Global wafer site number, used only for storage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaferId(pub u32);

impl fmt::Display for WaferId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}
