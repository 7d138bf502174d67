//! Operator tool for persisted defect data.
//!
//! Works directly on a file-backend directory: inspect wafer and chip
//! state, flip single components, or seed a fresh all-usable wafer entry.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use faultmap_backend::{Backend, SharedBackend, shared};
use faultmap_backend_file::FileBackend;
use faultmap_core::{Blacklist, Index, ResourceManager, SwitchMode};
use faultmap_silicon::{ChipOnWafer, ChipWithBackend, WaferId, WaferWithBackend};
use tracing::info;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "faultmap")]
#[command(about = "Inspect and edit persisted hardware defect data")]
struct Args {
	/// Directory holding the persisted state files
	#[arg(long, value_name = "DIR", default_value = ".")]
	path: PathBuf,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print usable/disabled counts for a wafer or one of its chips
	Show {
		/// Wafer site number
		#[arg(long)]
		wafer: u32,
		/// Chip slot to inspect instead of the wafer level
		#[arg(long)]
		chip: Option<u64>,
	},
	/// Mark a component usable
	Enable {
		#[command(flatten)]
		target: Target,
	},
	/// Mark a component defective
	Disable {
		#[command(flatten)]
		target: Target,
	},
	/// Seed an all-usable wafer entry
	InitWafer {
		/// Wafer site number
		#[arg(long)]
		wafer: u32,
	},
}

/// What a switch command operates on.
#[derive(clap::Args, Debug)]
struct Target {
	/// Wafer site number
	#[arg(long)]
	wafer: u32,
	/// Chip slot; required for chip-level components
	#[arg(long)]
	chip: Option<u64>,
	/// Component class
	#[arg(long)]
	component: Component,
	/// Component index within its space
	#[arg(long)]
	index: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Component {
	/// Chip slots of the wafer (wafer level)
	Chips,
	/// FPGAs of the wafer (wafer level)
	Fpgas,
	Neurons,
	Drivers,
	RowBuses,
	ColumnBuses,
	Mergers,
	AnalogOuts,
}

impl Component {
	fn is_wafer_level(self) -> bool {
		matches!(self, Component::Chips | Component::Fpgas)
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::WARN
		})
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let backend = open_backend(&args.path)?;

	match args.command {
		Command::Show { wafer, chip } => show(backend, WaferId(wafer), chip),
		Command::Enable { target } => switch(backend, &target, true),
		Command::Disable { target } => switch(backend, &target, false),
		Command::InitWafer { wafer } => init_wafer(backend, WaferId(wafer)),
	}
}

fn open_backend(path: &Path) -> Result<SharedBackend, Box<dyn std::error::Error>> {
	let mut backend = FileBackend::new();
	backend
		.config_mut()
		.set("path", path.to_string_lossy().into_owned());
	backend.init()?;
	Ok(shared(backend))
}

fn show(
	backend: SharedBackend,
	wafer: WaferId,
	chip: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
	match chip {
		None => {
			let handle = WaferWithBackend::new(backend, wafer, true)?;
			println!("wafer {wafer}");
			report("chips", &handle.wafer.chips);
			report("fpgas", &handle.wafer.fpgas);
		}
		Some(slot) => {
			let coord = ChipOnWafer::new(slot)?;
			let handle = ChipWithBackend::new(backend, wafer, coord, true)?;
			println!("chip {coord} on wafer {wafer}");
			report("neurons", &handle.chip.neurons);
			report("drivers", &handle.chip.drivers);
			report("row-buses", &handle.chip.row_buses);
			report("column-buses", &handle.chip.column_buses);
			report("mergers", &handle.chip.mergers);
			report("analog-outs", &handle.chip.analog_outs);
		}
	}
	Ok(())
}

fn report<I: Index>(name: &str, manager: &ResourceManager<I, Blacklist>) {
	let disabled: Vec<String> = manager.iter_disabled().map(|i| i.raw().to_string()).collect();
	let state = if manager.has_value() { "" } else { " (unconfigured)" };
	if disabled.is_empty() {
		println!("  {name}: {} usable{state}", manager.available());
	} else {
		println!(
			"  {name}: {} usable, disabled: {}{state}",
			manager.available(),
			disabled.join(", ")
		);
	}
}

fn switch(
	backend: SharedBackend,
	target: &Target,
	enable: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	if target.component.is_wafer_level() {
		let mut handle = WaferWithBackend::new(backend, WaferId(target.wafer), true)?;
		match target.component {
			Component::Chips => flip(&mut handle.wafer.chips, target.index, enable)?,
			Component::Fpgas => flip(&mut handle.wafer.fpgas, target.index, enable)?,
			_ => unreachable!("checked by is_wafer_level"),
		}
		handle.save()?;
		info!(wafer = target.wafer, "stored wafer state");
		return Ok(());
	}

	let slot = target
		.chip
		.ok_or("--chip is required for chip-level components")?;
	let coord = ChipOnWafer::new(slot)?;
	let mut handle = ChipWithBackend::new(backend, WaferId(target.wafer), coord, true)?;
	match target.component {
		Component::Neurons => flip(&mut handle.chip.neurons, target.index, enable)?,
		Component::Drivers => flip(&mut handle.chip.drivers, target.index, enable)?,
		Component::RowBuses => flip(&mut handle.chip.row_buses, target.index, enable)?,
		Component::ColumnBuses => flip(&mut handle.chip.column_buses, target.index, enable)?,
		Component::Mergers => flip(&mut handle.chip.mergers, target.index, enable)?,
		Component::AnalogOuts => flip(&mut handle.chip.analog_outs, target.index, enable)?,
		Component::Chips | Component::Fpgas => unreachable!("checked by is_wafer_level"),
	}
	handle.save()?;
	info!(wafer = target.wafer, chip = slot, "stored chip state");
	Ok(())
}

fn flip<I: Index>(
	manager: &mut ResourceManager<I, Blacklist>,
	raw: u64,
	enable: bool,
) -> Result<(), faultmap_core::Error> {
	let index = I::from_raw(raw)?;
	if !manager.has_value() {
		// Start from "everything usable" before recording the first defect.
		manager.enable_all();
	}
	if enable {
		manager.enable(index, SwitchMode::Lenient)
	} else {
		manager.disable(index, SwitchMode::Lenient)
	}
}

fn init_wafer(backend: SharedBackend, wafer: WaferId) -> Result<(), Box<dyn std::error::Error>> {
	let mut handle = WaferWithBackend::new(backend, wafer, true)?;
	handle.wafer.chips.enable_all();
	handle.wafer.fpgas.enable_all();
	handle.save()?;
	println!("initialized wafer {wafer}: all chips and fpgas usable");
	Ok(())
}
