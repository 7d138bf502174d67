//! The generic resource-state manager.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use crate::error::Error;
use crate::index::Index;
use crate::policy::{Policy, SwitchMode};
use crate::predicate::{All, Predicate};

/// Tracks which resources of a bounded index space are usable.
///
/// The manager owns a single ordered selection whose meaning is defined by
/// the policy type parameter (`Whitelist` stores enabled indices,
/// `Blacklist` stores disabled ones), restricted by a predicate deciding
/// which indices are legal at all. Not safe for concurrent mutation; callers
/// sharing a manager across threads must serialize access externally.
#[derive(Debug, Clone)]
pub struct ResourceManager<I, P, Pr = All>
where
	I: Index,
	P: Policy<I>,
	Pr: Predicate<I>,
{
	predicate: Pr,
	selection: BTreeSet<I>,
	has_value: bool,
	_policy: PhantomData<P>,
}

impl<I, P> ResourceManager<I, P, All>
where
	I: Index,
	P: Policy<I>,
{
	/// Creates a manager accepting every in-domain index.
	pub fn new() -> Self {
		Self::with_predicate(All)
	}
}

impl<I, P> Default for ResourceManager<I, P, All>
where
	I: Index,
	P: Policy<I>,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<I, P, Pr> ResourceManager<I, P, Pr>
where
	I: Index,
	P: Policy<I>,
	Pr: Predicate<I>,
{
	/// Creates a manager restricted to the indices accepted by `predicate`.
	pub fn with_predicate(predicate: Pr) -> Self {
		Self {
			predicate,
			selection: BTreeSet::new(),
			has_value: false,
			_policy: PhantomData,
		}
	}

	/// Returns the predicate restricting this manager.
	pub fn predicate(&self) -> &Pr {
		&self.predicate
	}

	/// Returns whether the manager was ever explicitly mutated.
	///
	/// Distinguishes "never configured" from "configured to the policy
	/// default"; survives persistence round-trips.
	pub fn has_value(&self) -> bool {
		self.has_value
	}

	/// Clears the selection and the has-value flag.
	///
	/// The only way back to the unconfigured state.
	pub fn reset(&mut self) {
		self.selection.clear();
		self.has_value = false;
	}

	/// Enables every legal resource.
	pub fn enable_all(&mut self) {
		P::enable_all(&mut self.selection, &self.predicate);
		self.has_value = true;
	}

	/// Disables every legal resource.
	pub fn disable_all(&mut self) {
		P::disable_all(&mut self.selection, &self.predicate);
		self.has_value = true;
	}

	/// Enables a single resource.
	///
	/// Fails with [`Error::Rejected`] when the predicate refuses `index` and
	/// with [`Error::AlreadyEnabled`] when the resource is already enabled
	/// under [`SwitchMode::Strict`].
	pub fn enable(&mut self, index: I, mode: SwitchMode) -> Result<(), Error> {
		self.check(index)?;
		P::enable(&mut self.selection, index, mode)?;
		self.has_value = true;
		Ok(())
	}

	/// Disables a single resource.
	///
	/// Fails with [`Error::Rejected`] when the predicate refuses `index` and
	/// with [`Error::AlreadyDisabled`] when the resource is already disabled
	/// under [`SwitchMode::Strict`].
	pub fn disable(&mut self, index: I, mode: SwitchMode) -> Result<(), Error> {
		self.check(index)?;
		P::disable(&mut self.selection, index, mode)?;
		self.has_value = true;
		Ok(())
	}

	/// Replaces the current state so that exactly `other` is enabled.
	///
	/// Strict counterpart of the clipping applied by the algebra operators:
	/// if any member of `other` fails the predicate, the call fails with
	/// [`Error::Rejected`] and the manager is left unchanged.
	pub fn from_set(&mut self, other: &BTreeSet<I>) -> Result<(), Error> {
		for index in other {
			self.check(*index)?;
		}
		P::from_set(&mut self.selection, &self.predicate, other);
		self.has_value = true;
		Ok(())
	}

	/// Returns whether the resource is enabled.
	///
	/// Fails with [`Error::Rejected`] when the predicate refuses `index`.
	pub fn has(&self, index: I) -> Result<bool, Error> {
		self.check(index)?;
		Ok(P::has(&self.selection, index))
	}

	/// Number of enabled resources.
	pub fn available(&self) -> usize {
		P::available(&self.selection, &self.predicate)
	}

	/// Keeps only resources that are not enabled in `other`.
	pub fn difference(&mut self, other: &Self) {
		let theirs: BTreeSet<I> = other.iter_enabled().collect();
		let result = self.iter_enabled().filter(|i| !theirs.contains(i)).collect();
		self.apply_clipped(result);
	}

	/// Keeps only resources enabled in exactly one of the two managers.
	pub fn symmetric_difference(&mut self, other: &Self) {
		let ours: BTreeSet<I> = self.iter_enabled().collect();
		let theirs: BTreeSet<I> = other.iter_enabled().collect();
		let result = ours.symmetric_difference(&theirs).copied().collect();
		self.apply_clipped(result);
	}

	/// Keeps only resources enabled in both managers.
	pub fn intersection(&mut self, other: &Self) {
		let theirs: BTreeSet<I> = other.iter_enabled().collect();
		let result = self.iter_enabled().filter(|i| theirs.contains(i)).collect();
		self.apply_clipped(result);
	}

	/// Also enables resources that are enabled in `other`.
	pub fn merge(&mut self, other: &Self) {
		let result = self.iter_enabled().chain(other.iter_enabled()).collect();
		self.apply_clipped(result);
	}

	/// Returns a fresh iterator over the enabled resources, ascending.
	///
	/// A live filtered view over the predicate enumeration; consistent only
	/// if the manager is not mutated during the traversal.
	pub fn iter_enabled(&self) -> impl Iterator<Item = I> + '_ {
		self.predicate
			.indices()
			.filter(|i| P::has(&self.selection, *i))
	}

	/// Returns a fresh iterator over the disabled resources, ascending.
	pub fn iter_disabled(&self) -> impl Iterator<Item = I> + '_ {
		self.predicate
			.indices()
			.filter(|i| !P::has(&self.selection, *i))
	}

	pub(crate) fn selection(&self) -> &BTreeSet<I> {
		&self.selection
	}

	pub(crate) fn replace_state(&mut self, selection: BTreeSet<I>, has_value: bool) {
		self.selection = selection;
		self.has_value = has_value;
	}

	/// Re-applies an algebra result through the policy's clipping
	/// `from_set`; indices failing this manager's predicate are dropped
	/// rather than reported, so managers with compatible but different
	/// predicates can be combined.
	fn apply_clipped(&mut self, result: BTreeSet<I>) {
		P::from_set(&mut self.selection, &self.predicate, &result);
		self.has_value = true;
	}

	fn check(&self, index: I) -> Result<(), Error> {
		if !self.predicate.contains(index) {
			return Err(Error::Rejected { value: index.raw() });
		}
		Ok(())
	}
}

/// Managers are equal when their selections and has-value flags are equal;
/// predicate identity is not compared.
impl<I, P, Pr> PartialEq for ResourceManager<I, P, Pr>
where
	I: Index,
	P: Policy<I>,
	Pr: Predicate<I>,
{
	fn eq(&self, other: &Self) -> bool {
		self.selection == other.selection && self.has_value == other.has_value
	}
}

impl<I, P, Pr> Eq for ResourceManager<I, P, Pr>
where
	I: Index,
	P: Policy<I>,
	Pr: Predicate<I>,
{
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::policy::{Blacklist, Whitelist};
	use crate::{Index, index_space};

	index_space! {
		struct Slot in 0..384;
	}

	#[derive(Debug, Clone, Copy, Default)]
	struct EvenSlots;

	impl Predicate<Slot> for EvenSlots {
		fn contains(&self, index: Slot) -> bool {
			index.value() % 2 == 0
		}
	}

	type Wl = ResourceManager<Slot, Whitelist>;
	type Bl = ResourceManager<Slot, Blacklist>;

	fn slot(raw: u64) -> Slot {
		Slot::new(raw).unwrap()
	}

	fn set(raws: &[u64]) -> BTreeSet<Slot> {
		raws.iter().map(|&r| slot(r)).collect()
	}

	fn enabled<P, Pr>(manager: &ResourceManager<Slot, P, Pr>) -> BTreeSet<Slot>
	where
		P: Policy<Slot>,
		Pr: Predicate<Slot>,
	{
		manager.iter_enabled().collect()
	}

	fn exercise_basic_operations<P: Policy<Slot>>() {
		let mut manager = ResourceManager::<Slot, P>::new();

		let avail = manager.available();
		assert!(avail == 0 || avail == 384, "default is a policy extreme");
		assert!(!manager.has_value());

		manager.enable_all();
		assert_eq!(manager.available(), 384);
		assert!(manager.has(slot(2)).unwrap());
		assert!(manager.has_value());

		manager.disable(slot(7), SwitchMode::Strict).unwrap();
		assert_eq!(manager.available(), 383);
		assert!(!manager.has(slot(7)).unwrap());

		manager.disable_all();
		assert_eq!(manager.available(), 0);

		manager.enable(slot(4), SwitchMode::Strict).unwrap();
		manager.enable(slot(7), SwitchMode::Strict).unwrap();
		manager.enable(slot(22), SwitchMode::Strict).unwrap();
		assert_eq!(manager.available(), 3);
		assert!(manager.has(slot(4)).unwrap());
		assert!(!manager.has(slot(8)).unwrap());
	}

	#[test]
	fn basic_operations_work_under_both_policies() {
		exercise_basic_operations::<Whitelist>();
		exercise_basic_operations::<Blacklist>();
	}

	fn exercise_switch_conflicts<P: Policy<Slot>>() {
		let mut manager = ResourceManager::<Slot, P>::new();

		manager.enable_all();
		assert!(manager.enable(slot(8), SwitchMode::Strict).is_err());
		manager.enable(slot(8), SwitchMode::Lenient).unwrap();

		manager.disable_all();
		assert!(manager.disable(slot(7), SwitchMode::Strict).is_err());
		manager.disable(slot(7), SwitchMode::Lenient).unwrap();
	}

	#[test]
	fn strict_mode_reports_redundant_switches() {
		exercise_switch_conflicts::<Whitelist>();
		exercise_switch_conflicts::<Blacklist>();
	}

	#[test]
	fn policy_duality_preserves_observable_state() {
		let mut wl = Wl::new();
		let mut bl = Bl::new();

		wl.enable_all();
		bl.enable_all();
		for raw in [3, 77, 250] {
			wl.disable(slot(raw), SwitchMode::Strict).unwrap();
			bl.disable(slot(raw), SwitchMode::Strict).unwrap();
		}
		wl.enable(slot(77), SwitchMode::Strict).unwrap();
		bl.enable(slot(77), SwitchMode::Strict).unwrap();

		assert_eq!(wl.available(), bl.available());
		for index in Slot::domain() {
			assert_eq!(wl.has(index).unwrap(), bl.has(index).unwrap());
		}
	}

	#[test]
	fn predicate_rejections_do_not_mutate() {
		let mut manager =
			ResourceManager::<Slot, Whitelist, EvenSlots>::with_predicate(EvenSlots);
		manager.enable_all();
		assert_eq!(manager.available(), 192);

		assert!(manager.has(slot(1)).is_err());
		assert!(manager.enable(slot(1), SwitchMode::Lenient).is_err());
		assert!(manager.disable(slot(1), SwitchMode::Lenient).is_err());
		assert_eq!(manager.available(), 192);

		assert!(manager.has(slot(2)).is_ok());
	}

	#[test]
	fn from_set_is_strict_and_atomic() {
		let mut manager =
			ResourceManager::<Slot, Whitelist, EvenSlots>::with_predicate(EvenSlots);
		manager.from_set(&set(&[2, 4, 8])).unwrap();
		assert_eq!(enabled(&manager), set(&[2, 4, 8]));

		let err = manager.from_set(&set(&[2, 3, 4])).unwrap_err();
		assert_eq!(err, Error::Rejected { value: 3 });
		assert_eq!(enabled(&manager), set(&[2, 4, 8]), "no partial mutation");
	}

	#[test]
	fn from_set_is_idempotent() {
		let mut manager = Bl::new();
		manager.from_set(&set(&[1, 5, 9])).unwrap();
		let first = manager.clone();
		manager.from_set(&set(&[1, 5, 9])).unwrap();
		assert_eq!(manager, first);
	}

	#[test]
	fn iteration_splits_enabled_and_disabled() {
		let mut manager = Bl::new();
		manager.enable_all();
		manager.disable(slot(33), SwitchMode::Strict).unwrap();
		manager.disable(slot(324), SwitchMode::Strict).unwrap();

		let enabled: BTreeSet<Slot> = manager.iter_enabled().collect();
		assert_eq!(enabled.len(), 382);
		assert!(!enabled.contains(&slot(33)));
		assert!(enabled.contains(&slot(31)));

		let disabled: BTreeSet<Slot> = manager.iter_disabled().collect();
		assert_eq!(disabled, set(&[33, 324]));
	}

	fn algebra_fixtures<P: Policy<Slot>>() -> (ResourceManager<Slot, P>, ResourceManager<Slot, P>)
	{
		let mut a = ResourceManager::<Slot, P>::new();
		let mut b = ResourceManager::<Slot, P>::new();
		a.from_set(&set(&[1, 2, 3, 4])).unwrap();
		b.from_set(&set(&[3, 4, 5])).unwrap();
		(a, b)
	}

	fn exercise_algebra<P: Policy<Slot>>() {
		let (mut a, b) = algebra_fixtures::<P>();
		a.merge(&b);
		assert_eq!(enabled(&a), set(&[1, 2, 3, 4, 5]));

		let (mut a, b) = algebra_fixtures::<P>();
		a.intersection(&b);
		assert_eq!(enabled(&a), set(&[3, 4]));

		let (mut a, b) = algebra_fixtures::<P>();
		a.difference(&b);
		assert_eq!(enabled(&a), set(&[1, 2]));

		let (mut a, b) = algebra_fixtures::<P>();
		let before = enabled(&a);
		a.symmetric_difference(&b);
		assert_eq!(enabled(&a), set(&[1, 2, 5]));
		a.symmetric_difference(&b);
		assert_eq!(enabled(&a), before, "applying twice restores the input");
	}

	#[test]
	fn algebra_follows_set_semantics_under_both_policies() {
		exercise_algebra::<Whitelist>();
		exercise_algebra::<Blacklist>();
	}

	/// Accepts slots below a configurable bound; lets two managers of the
	/// same type carry different predicate values.
	#[derive(Debug, Clone, Copy)]
	struct Below(u64);

	impl Predicate<Slot> for Below {
		fn contains(&self, index: Slot) -> bool {
			index.value() < self.0
		}
	}

	#[test]
	fn algebra_clips_to_the_own_predicate() {
		let mut narrow = ResourceManager::<Slot, Whitelist, Below>::with_predicate(Below(5));
		narrow.from_set(&set(&[2, 4])).unwrap();

		let mut wide = ResourceManager::<Slot, Whitelist, Below>::with_predicate(Below(10));
		wide.from_set(&set(&[4, 7])).unwrap();

		// 7 fails the narrow predicate and is dropped, not reported.
		narrow.merge(&wide);
		assert_eq!(enabled(&narrow), set(&[2, 4]));

		let mut narrow = ResourceManager::<Slot, Whitelist, Below>::with_predicate(Below(5));
		narrow.from_set(&set(&[2])).unwrap();
		narrow.symmetric_difference(&wide);
		assert_eq!(enabled(&narrow), set(&[2, 4]));
	}

	#[test]
	fn reset_returns_to_unconfigured() {
		let mut manager = Wl::new();
		manager.enable_all();
		assert!(manager.has_value());

		manager.reset();
		assert!(!manager.has_value());
		assert_eq!(manager.available(), 0);
	}

	#[test]
	fn equality_compares_selection_and_history_flag() {
		let mut a = Wl::new();
		let mut b = Wl::new();
		assert_eq!(a, b);

		a.enable(slot(1), SwitchMode::Strict).unwrap();
		assert_ne!(a, b);

		b.enable(slot(1), SwitchMode::Strict).unwrap();
		assert_eq!(a, b);

		// Same selection but different configuration history.
		let mut c = Wl::new();
		c.enable(slot(1), SwitchMode::Strict).unwrap();
		let mut d = Wl::new();
		d.from_set(&set(&[1])).unwrap();
		assert_eq!(c, d);

		let fresh = Wl::new();
		let mut emptied = Wl::new();
		emptied.disable_all();
		assert_ne!(fresh, emptied, "has_value participates in equality");
	}
}
