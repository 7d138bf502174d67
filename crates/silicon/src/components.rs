//! Per-component resource managers.
//!
//! Defect data is blacklist-encoded throughout: a freshly constructed
//! manager reports every component usable, and only the defects are stored.

use faultmap_core::{Blacklist, ResourceManager};

use crate::coords::{
	AnalogOutOnChip, ChipOnWafer, ColumnBusOnChip, DriverOnChip, FpgaOnWafer, LinkOnFpga,
	MergerOnChip, NeuronOnChip, RowBusOnChip,
};

/// Chip slots of a wafer.
pub type Chips = ResourceManager<ChipOnWafer, Blacklist>;
/// FPGAs of a wafer.
pub type Fpgas = ResourceManager<FpgaOnWafer, Blacklist>;
/// Highspeed links of an FPGA.
pub type Links = ResourceManager<LinkOnFpga, Blacklist>;
/// Neuron circuits of a chip.
pub type Neurons = ResourceManager<NeuronOnChip, Blacklist>;
/// Synapse drivers of a chip.
pub type Drivers = ResourceManager<DriverOnChip, Blacklist>;
/// Horizontal bus lanes of a chip.
pub type RowBuses = ResourceManager<RowBusOnChip, Blacklist>;
/// Vertical bus lanes of a chip.
pub type ColumnBuses = ResourceManager<ColumnBusOnChip, Blacklist>;
/// Event mergers of a chip.
pub type Mergers = ResourceManager<MergerOnChip, Blacklist>;
/// Analog readout channels of a chip.
pub type AnalogOuts = ResourceManager<AnalogOutOnChip, Blacklist>;
