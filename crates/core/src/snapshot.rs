//! Versioned serial form of resource state.
//!
//! Persistence backends never see managers or domain objects directly; they
//! exchange [`Snapshot`] values. A snapshot is a tagged tree: managers
//! serialize to [`ManagerSnapshot`] leaves, domain objects to
//! [`CompositeSnapshot`] nodes keyed by section name. Schema evolution is
//! additive: newer writers may add sections, older blobs simply lack them,
//! and decoding leaves the corresponding state untouched. Version tags are
//! checked first; an unknown version is an error, never a best-effort
//! partial decode.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::index::Index;
use crate::manager::ResourceManager;
use crate::policy::Policy;
use crate::predicate::Predicate;

/// Serial form of a single manager.
///
/// Version history:
/// - 0: `selection` only; `has_value` did not exist yet and decodes as
///   `true`, since every file written at that time had been explicitly
///   configured.
/// - 1: adds `has_value`; the field is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
	/// Schema version tag, checked before anything else.
	pub version: u32,
	/// Raw values of the stored selection, ascending.
	pub selection: Vec<u64>,
	/// Whether the manager was ever explicitly configured.
	#[serde(default)]
	pub has_value: Option<bool>,
}

impl ManagerSnapshot {
	/// Newest manager schema version this build reads and writes.
	pub const VERSION: u32 = 1;

	/// Resolves the has-value flag according to the version branch rules.
	pub fn resolve_has_value(&self) -> Result<bool, Error> {
		match self.version {
			0 => Ok(true),
			Self::VERSION => self.has_value.ok_or(Error::MalformedSnapshot {
				reason: "version 1 manager snapshot without has_value",
			}),
			newer => Err(Error::UnsupportedVersion {
				found: newer,
				supported: Self::VERSION,
			}),
		}
	}
}

/// Serial form of a domain object bundling several managers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSnapshot {
	/// Schema version tag of the composite layout.
	pub version: u32,
	/// Child snapshots keyed by section name.
	pub sections: BTreeMap<String, Snapshot>,
}

impl CompositeSnapshot {
	/// Creates an empty composite at the given version.
	pub fn new(version: u32) -> Self {
		Self {
			version,
			sections: BTreeMap::new(),
		}
	}

	/// Adds a section.
	pub fn insert(&mut self, name: &str, snapshot: Snapshot) {
		self.sections.insert(name.to_string(), snapshot);
	}

	/// Looks up a section by name.
	pub fn section(&self, name: &str) -> Option<&Snapshot> {
		self.sections.get(name)
	}
}

/// A persisted object: either a single manager or a named bundle of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Snapshot {
	/// State of one resource manager.
	Manager(ManagerSnapshot),
	/// State of a domain object with named sub-snapshots.
	Composite(CompositeSnapshot),
}

impl Snapshot {
	/// Returns the manager snapshot or fails on shape mismatch.
	pub fn as_manager(&self) -> Result<&ManagerSnapshot, Error> {
		match self {
			Snapshot::Manager(manager) => Ok(manager),
			Snapshot::Composite(_) => Err(Error::MalformedSnapshot {
				reason: "expected a manager snapshot, found a composite",
			}),
		}
	}

	/// Returns the composite snapshot or fails on shape mismatch.
	pub fn as_composite(&self) -> Result<&CompositeSnapshot, Error> {
		match self {
			Snapshot::Composite(composite) => Ok(composite),
			Snapshot::Manager(_) => Err(Error::MalformedSnapshot {
				reason: "expected a composite snapshot, found a manager",
			}),
		}
	}
}

/// An object that can cross the persistence boundary.
///
/// `apply` merges loaded state onto an existing instance instead of
/// replacing it, so identity (ids, attached backends, caches) survives a
/// load.
pub trait Payload {
	/// Captures the current state as a snapshot.
	fn capture(&self) -> Snapshot;

	/// Applies a loaded snapshot onto this instance.
	///
	/// On error the instance is left unchanged.
	fn apply(&mut self, snapshot: &Snapshot) -> Result<(), Error>;
}

impl<I, P, Pr> ResourceManager<I, P, Pr>
where
	I: Index,
	P: Policy<I>,
	Pr: Predicate<I>,
{
	/// Captures the stored selection and configuration flag.
	pub fn snapshot(&self) -> ManagerSnapshot {
		ManagerSnapshot {
			version: ManagerSnapshot::VERSION,
			selection: self.selection().iter().map(|i| i.raw()).collect(),
			has_value: Some(self.has_value()),
		}
	}

	/// Restores state from a snapshot.
	///
	/// Every raw value is range-checked and validated against the active
	/// predicate before anything is committed; on error the manager keeps
	/// its previous state.
	pub fn restore(&mut self, snapshot: &ManagerSnapshot) -> Result<(), Error> {
		let has_value = snapshot.resolve_has_value()?;

		let mut selection = BTreeSet::new();
		for &raw in &snapshot.selection {
			let index = I::from_raw(raw)?;
			if !self.predicate().contains(index) {
				return Err(Error::Rejected { value: raw });
			}
			selection.insert(index);
		}

		self.replace_state(selection, has_value);
		Ok(())
	}
}

impl<I, P, Pr> Payload for ResourceManager<I, P, Pr>
where
	I: Index,
	P: Policy<I>,
	Pr: Predicate<I>,
{
	fn capture(&self) -> Snapshot {
		Snapshot::Manager(self.snapshot())
	}

	fn apply(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
		self.restore(snapshot.as_manager()?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::policy::{Blacklist, SwitchMode, Whitelist};
	use crate::index_space;

	index_space! {
		struct Slot in 0..384;
	}

	fn slot(raw: u64) -> Slot {
		Slot::new(raw).unwrap()
	}

	#[test]
	fn snapshot_round_trips_selection_and_flag() {
		let mut manager = ResourceManager::<Slot, Blacklist>::new();
		manager.enable_all();
		manager.disable(slot(7), SwitchMode::Strict).unwrap();

		let mut restored = ResourceManager::<Slot, Blacklist>::new();
		restored.restore(&manager.snapshot()).unwrap();
		assert_eq!(restored, manager);
		assert!(!restored.has(slot(7)).unwrap());
		assert_eq!(restored.available(), 383);
	}

	#[test]
	fn unconfigured_flag_survives_the_round_trip() {
		let manager = ResourceManager::<Slot, Whitelist>::new();
		let mut restored = ResourceManager::<Slot, Whitelist>::new();
		restored.enable_all();
		restored.restore(&manager.snapshot()).unwrap();
		assert!(!restored.has_value());
		assert_eq!(restored, manager);
	}

	#[test]
	fn version_zero_decodes_as_configured() {
		let snapshot = ManagerSnapshot {
			version: 0,
			selection: vec![3, 5],
			has_value: None,
		};

		let mut manager = ResourceManager::<Slot, Whitelist>::new();
		manager.restore(&snapshot).unwrap();
		assert!(manager.has_value());
		assert!(manager.has(slot(3)).unwrap());
		assert_eq!(manager.available(), 2);
	}

	#[test]
	fn unknown_version_is_rejected() {
		let snapshot = ManagerSnapshot {
			version: 99,
			selection: vec![],
			has_value: Some(true),
		};

		let mut manager = ResourceManager::<Slot, Whitelist>::new();
		let err = manager.restore(&snapshot).unwrap_err();
		assert_eq!(
			err,
			Error::UnsupportedVersion {
				found: 99,
				supported: ManagerSnapshot::VERSION,
			}
		);
	}

	#[test]
	fn restore_validates_raw_values_without_partial_mutation() {
		let mut manager = ResourceManager::<Slot, Whitelist>::new();
		manager.enable(slot(1), SwitchMode::Strict).unwrap();
		let before = manager.clone();

		let snapshot = ManagerSnapshot {
			version: ManagerSnapshot::VERSION,
			selection: vec![2, 9000],
			has_value: Some(true),
		};
		assert!(manager.restore(&snapshot).is_err());
		assert_eq!(manager, before);
	}

	#[test]
	fn apply_rejects_shape_mismatches() {
		let composite = Snapshot::Composite(CompositeSnapshot::new(1));
		let mut manager = ResourceManager::<Slot, Whitelist>::new();
		let err = manager.apply(&composite).unwrap_err();
		assert!(matches!(err, Error::MalformedSnapshot { .. }));
	}
}
