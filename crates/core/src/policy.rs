//! Accounting policies: how usable/unusable state is encoded in the stored
//! selection.
//!
//! [`Whitelist`] stores the enabled indices, [`Blacklist`] stores the
//! disabled ones. Both answer the same six-operation contract, so every
//! higher-level operation of the manager behaves identically under either
//! encoding.

use std::collections::BTreeSet;

use crate::error::Error;
use crate::index::Index;
use crate::predicate::Predicate;

/// Conflict handling for [`Policy::enable`] and [`Policy::disable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SwitchMode {
	/// Switching a resource into the state it already has is an error.
	#[default]
	Strict,
	/// Switching a resource into the state it already has is a no-op.
	Lenient,
}

/// Encoding strategy for the stored selection.
///
/// Stateless; implementations carry no data and are only ever used as type
/// parameters of the manager.
pub trait Policy<I: Index> {
	/// Resets the selection so that every legal index is enabled.
	fn enable_all(selection: &mut BTreeSet<I>, predicate: &impl Predicate<I>);

	/// Resets the selection so that every legal index is disabled.
	fn disable_all(selection: &mut BTreeSet<I>, predicate: &impl Predicate<I>);

	/// Returns whether `index` counts as enabled under this encoding.
	fn has(selection: &BTreeSet<I>, index: I) -> bool;

	/// Marks `index` enabled.
	///
	/// Under [`SwitchMode::Strict`] an already-enabled index fails with
	/// [`Error::AlreadyEnabled`].
	fn enable(selection: &mut BTreeSet<I>, index: I, mode: SwitchMode) -> Result<(), Error>;

	/// Marks `index` disabled.
	///
	/// Under [`SwitchMode::Strict`] an already-disabled index fails with
	/// [`Error::AlreadyDisabled`].
	fn disable(selection: &mut BTreeSet<I>, index: I, mode: SwitchMode) -> Result<(), Error>;

	/// Number of enabled indices.
	fn available(selection: &BTreeSet<I>, predicate: &impl Predicate<I>) -> usize;

	/// Replaces the selection so that exactly `other ∩ legal` is enabled.
	///
	/// Indices failing the predicate are clipped silently; the strict
	/// validation lives in the manager.
	fn from_set(selection: &mut BTreeSet<I>, predicate: &impl Predicate<I>, other: &BTreeSet<I>);
}

/// Stores the enabled indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Whitelist;

impl<I: Index> Policy<I> for Whitelist {
	fn enable_all(selection: &mut BTreeSet<I>, predicate: &impl Predicate<I>) {
		selection.clear();
		selection.extend(predicate.indices());
	}

	fn disable_all(selection: &mut BTreeSet<I>, _predicate: &impl Predicate<I>) {
		selection.clear();
	}

	fn has(selection: &BTreeSet<I>, index: I) -> bool {
		selection.contains(&index)
	}

	fn enable(selection: &mut BTreeSet<I>, index: I, mode: SwitchMode) -> Result<(), Error> {
		if !selection.insert(index) && mode == SwitchMode::Strict {
			return Err(Error::AlreadyEnabled { value: index.raw() });
		}
		Ok(())
	}

	fn disable(selection: &mut BTreeSet<I>, index: I, mode: SwitchMode) -> Result<(), Error> {
		if !selection.remove(&index) && mode == SwitchMode::Strict {
			return Err(Error::AlreadyDisabled { value: index.raw() });
		}
		Ok(())
	}

	fn available(selection: &BTreeSet<I>, _predicate: &impl Predicate<I>) -> usize {
		selection.len()
	}

	fn from_set(selection: &mut BTreeSet<I>, predicate: &impl Predicate<I>, other: &BTreeSet<I>) {
		selection.clear();
		selection.extend(other.iter().copied().filter(|i| predicate.contains(*i)));
	}
}

/// Stores the disabled indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blacklist;

impl<I: Index> Policy<I> for Blacklist {
	fn enable_all(selection: &mut BTreeSet<I>, _predicate: &impl Predicate<I>) {
		selection.clear();
	}

	fn disable_all(selection: &mut BTreeSet<I>, predicate: &impl Predicate<I>) {
		selection.clear();
		selection.extend(predicate.indices());
	}

	fn has(selection: &BTreeSet<I>, index: I) -> bool {
		!selection.contains(&index)
	}

	fn enable(selection: &mut BTreeSet<I>, index: I, mode: SwitchMode) -> Result<(), Error> {
		if !selection.remove(&index) && mode == SwitchMode::Strict {
			return Err(Error::AlreadyEnabled { value: index.raw() });
		}
		Ok(())
	}

	fn disable(selection: &mut BTreeSet<I>, index: I, mode: SwitchMode) -> Result<(), Error> {
		if !selection.insert(index) && mode == SwitchMode::Strict {
			return Err(Error::AlreadyDisabled { value: index.raw() });
		}
		Ok(())
	}

	fn available(selection: &BTreeSet<I>, predicate: &impl Predicate<I>) -> usize {
		predicate.indices().count() - selection.len()
	}

	fn from_set(selection: &mut BTreeSet<I>, predicate: &impl Predicate<I>, other: &BTreeSet<I>) {
		selection.clear();
		selection.extend(predicate.indices().filter(|i| !other.contains(i)));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::index_space;

	index_space! {
		struct Slot in 0..8;
	}

	fn slot(raw: u64) -> Slot {
		Slot::new(raw).unwrap()
	}

	#[test]
	fn whitelist_from_set_clips_to_predicate() {
		#[derive(Debug, Clone, Copy)]
		struct EvenSlots;

		impl Predicate<Slot> for EvenSlots {
			fn contains(&self, index: Slot) -> bool {
				index.value() % 2 == 0
			}
		}

		let mut selection = BTreeSet::new();
		let other: BTreeSet<Slot> = [slot(1), slot(2), slot(4)].into();
		Whitelist::from_set(&mut selection, &EvenSlots, &other);
		assert_eq!(selection, [slot(2), slot(4)].into());
	}

	#[test]
	fn blacklist_from_set_stores_the_complement() {
		let mut selection = BTreeSet::new();
		let other: BTreeSet<Slot> = [slot(0), slot(3)].into();
		Blacklist::from_set(&mut selection, &crate::All, &other);

		let expected: BTreeSet<Slot> =
			[slot(1), slot(2), slot(4), slot(5), slot(6), slot(7)].into();
		assert_eq!(selection, expected);
		assert!(Blacklist::has(&selection, slot(0)));
		assert!(!Blacklist::has(&selection, slot(1)));
	}

	#[test]
	fn lenient_switches_are_idempotent() {
		let mut selection = BTreeSet::new();
		Whitelist::enable(&mut selection, slot(3), SwitchMode::Lenient).unwrap();
		Whitelist::enable(&mut selection, slot(3), SwitchMode::Lenient).unwrap();
		assert_eq!(selection.len(), 1);

		let err = Whitelist::enable(&mut selection, slot(3), SwitchMode::Strict).unwrap_err();
		assert_eq!(err, crate::Error::AlreadyEnabled { value: 3 });
	}
}
