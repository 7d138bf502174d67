//! Bounded, densely enumerable index spaces.
//!
//! Every trackable hardware component is addressed by an index drawn from a
//! fixed domain `[BEGIN, END)` over raw `u64` values. Concrete index types
//! are declared with [`index_space!`], which enforces range checking at
//! construction time.

use std::fmt;
use std::hash::Hash;

use crate::error::Error;
use crate::predicate::{All, Indices};

/// An index into a bounded, densely enumerable domain.
///
/// Implementations are cheap value types with total order; the raw value of
/// a constructed index always satisfies `BEGIN <= raw < END`.
pub trait Index: Copy + Eq + Ord + Hash + fmt::Debug {
	/// Inclusive lower bound of the raw value domain.
	const BEGIN: u64;

	/// Exclusive upper bound of the raw value domain.
	const END: u64;

	/// Constructs an index from a raw value.
	///
	/// Fails with [`Error::OutOfRange`] when `raw` lies outside
	/// `[BEGIN, END)`.
	fn from_raw(raw: u64) -> Result<Self, Error>;

	/// Returns the raw value of this index.
	fn raw(self) -> u64;

	/// Number of raw values in the domain.
	fn domain_len() -> u64 {
		Self::END - Self::BEGIN
	}

	/// Returns a fresh ascending iterator over the whole domain.
	fn domain() -> Indices<Self, All> {
		Indices::new(All)
	}
}

/// Declares a new index space: a range-checked newtype over `u64` with a
/// fixed `[begin, end)` domain.
///
/// ```
/// use faultmap_core::{Index, index_space};
///
/// index_space! {
///     /// One of the 384 chip slots on a wafer.
///     pub struct ChipOnWafer in 0..384;
/// }
///
/// assert!(ChipOnWafer::new(383).is_ok());
/// assert!(ChipOnWafer::new(384).is_err());
/// ```
#[macro_export]
macro_rules! index_space {
	($($(#[$meta:meta])* $vis:vis struct $name:ident in $begin:literal .. $end:literal;)+) => {
		$(
			$(#[$meta])*
			#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
			$vis struct $name(u64);

			impl $name {
				/// Constructs the index, failing when `raw` is out of domain.
				pub fn new(raw: u64) -> ::std::result::Result<Self, $crate::Error> {
					<Self as $crate::Index>::from_raw(raw)
				}

				/// Returns the raw value.
				pub fn value(self) -> u64 {
					self.0
				}
			}

			impl $crate::Index for $name {
				const BEGIN: u64 = $begin;
				const END: u64 = $end;

				fn from_raw(raw: u64) -> ::std::result::Result<Self, $crate::Error> {
					if raw < Self::BEGIN || raw >= Self::END {
						return Err($crate::Error::OutOfRange {
							value: raw,
							begin: Self::BEGIN,
							end: Self::END,
						});
					}
					Ok(Self(raw))
				}

				fn raw(self) -> u64 {
					self.0
				}
			}

			impl ::std::fmt::Display for $name {
				fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
					write!(f, "{}", self.0)
				}
			}

			impl ::std::convert::TryFrom<u64> for $name {
				type Error = $crate::Error;

				fn try_from(raw: u64) -> ::std::result::Result<Self, $crate::Error> {
					<Self as $crate::Index>::from_raw(raw)
				}
			}

			impl ::std::convert::From<$name> for u64 {
				fn from(index: $name) -> u64 {
					index.0
				}
			}
		)+
	};
}

#[cfg(test)]
mod tests {
	use crate::Index;

	index_space! {
		struct Slot in 0..384;
		struct Offset in 8..16;
	}

	#[test]
	fn construction_is_range_checked() {
		assert_eq!(Slot::new(0).map(Slot::value), Ok(0));
		assert_eq!(Slot::new(383).map(Slot::value), Ok(383));
		assert!(Slot::new(384).is_err());

		assert!(Offset::new(7).is_err());
		assert!(Offset::new(8).is_ok());
		assert!(Offset::new(16).is_err());
	}

	#[test]
	fn out_of_range_error_reports_bounds() {
		let err = Offset::new(42).unwrap_err();
		assert_eq!(
			err,
			crate::Error::OutOfRange {
				value: 42,
				begin: 8,
				end: 16,
			}
		);
	}

	#[test]
	fn domain_enumerates_every_index_in_order() {
		let raws: Vec<u64> = Offset::domain().map(Offset::raw).collect();
		assert_eq!(raws, (8..16).collect::<Vec<_>>());
	}

	#[test]
	fn domain_len_matches_bounds() {
		assert_eq!(Slot::domain_len(), 384);
		assert_eq!(Offset::domain_len(), 8);
	}
}
