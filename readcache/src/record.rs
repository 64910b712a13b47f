//! Per-record header: validity/sealing/tombstone bits, the shared and
//! exclusive lock state, and the `PreviousAddress` chain pointer.
//!
//! The header is two words so that `try_update_address` can CAS the chain
//! pointer alone, leaving lock and flag bits — which are mutated by
//! independent atomic ops — untouched.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::address::AddressWord;

const INVALID_BIT: u64 = 1 << 0;
const SEALED_BIT: u64 = 1 << 1;
const TOMBSTONE_BIT: u64 = 1 << 2;
const EXCLUSIVE_BIT: u64 = 1 << 3;
const NULL_BIT: u64 = 1 << 4;

const SHARED_COUNT_SHIFT: u32 = 8;
const SHARED_COUNT_BITS: u32 = 8;
const SHARED_COUNT_MASK: u64 = ((1u64 << SHARED_COUNT_BITS) - 1) << SHARED_COUNT_SHIFT;

const SIZE_SHIFT: u32 = 16;
const SIZE_BITS: u32 = 32;
const SIZE_MASK: u64 = ((1u64 << SIZE_BITS) - 1) << SIZE_SHIFT;

#[repr(C)]
pub struct RecordInfo {
	control: AtomicU64,
	previous_address: AtomicU64,
}

impl RecordInfo {
	/// Bytes occupied by the header, for log layout arithmetic.
	pub const SIZE: usize = std::mem::size_of::<Self>();

	/// A zeroed, uninitialized header. Exposed crate-wide so other modules'
	/// tests can build a standalone `RecordInfo` without going through a
	/// full `ReadCacheLog`.
	#[cfg(test)]
	pub(crate) fn blank() -> Self {
		Self {
			control: AtomicU64::new(0),
			previous_address: AtomicU64::new(0),
		}
	}

	pub fn init(&self, previous_address: AddressWord, record_size: u32) {
		let control = ((record_size as u64) << SIZE_SHIFT) & SIZE_MASK;
		self.control.store(control, Ordering::Release);
		self.previous_address
			.store(previous_address.word(), Ordering::Release);
	}

	/// Writes a pad/null header in place, for records that straddle a page
	/// boundary.
	pub fn init_null(&self) {
		self.control
			.store(NULL_BIT | INVALID_BIT, Ordering::Release);
		self.previous_address
			.store(AddressWord::INVALID.word(), Ordering::Release);
	}

	#[inline]
	pub fn is_null(&self) -> bool {
		self.control.load(Ordering::Acquire) & NULL_BIT != 0
	}

	#[inline]
	pub fn is_invalid(&self) -> bool {
		self.control.load(Ordering::Acquire) & INVALID_BIT != 0
	}

	#[inline]
	pub fn is_sealed(&self) -> bool {
		self.control.load(Ordering::Acquire) & SEALED_BIT != 0
	}

	#[inline]
	pub fn is_tombstone(&self) -> bool {
		self.control.load(Ordering::Acquire) & TOMBSTONE_BIT != 0
	}

	#[inline]
	pub fn record_size(&self) -> u32 {
		((self.control.load(Ordering::Acquire) & SIZE_MASK) >> SIZE_SHIFT) as u32
	}

	#[inline]
	pub fn shared_lock_count(&self) -> u8 {
		((self.control.load(Ordering::Acquire) & SHARED_COUNT_MASK) >> SHARED_COUNT_SHIFT) as u8
	}

	/// Idempotent: setting Invalid on an already-invalid record is a no-op.
	pub fn set_invalid(&self) {
		self.control.fetch_or(INVALID_BIT, Ordering::AcqRel);
	}

	pub fn set_tombstone(&self) {
		self.control.fetch_or(TOMBSTONE_BIT, Ordering::AcqRel);
	}

	#[inline]
	pub fn previous_address(&self) -> AddressWord {
		AddressWord::from_word(self.previous_address.load(Ordering::Acquire))
	}

	/// CAS on the chain pointer alone. Used to splice and to unlink.
	pub fn try_update_address(&self, expected: AddressWord, new: AddressWord) -> bool {
		self.previous_address
			.compare_exchange(expected.word(), new.word(), Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}

	/// Unconditional store, for records not yet reachable from any chain
	/// (freshly allocated, or just unlinked by the evictor).
	pub fn force_previous_address(&self, new: AddressWord) {
		self.previous_address.store(new.word(), Ordering::Release);
	}

	/// Attempts to take a shared (read) lock: fails if the record is
	/// invalid, sealed, or exclusively locked.
	pub fn try_lock_shared(&self) -> bool {
		let mut current = self.control.load(Ordering::Acquire);
		loop {
			if current & (INVALID_BIT | SEALED_BIT | EXCLUSIVE_BIT) != 0 {
				return false;
			}
			let count = (current & SHARED_COUNT_MASK) >> SHARED_COUNT_SHIFT;
			if count == u8::MAX as u64 {
				return false;
			}
			let new = (current & !SHARED_COUNT_MASK) | ((count + 1) << SHARED_COUNT_SHIFT);
			match self.control.compare_exchange_weak(
				current,
				new,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => return true,
				Err(observed) => current = observed,
			}
		}
	}

	pub fn unlock_shared(&self) {
		let mut current = self.control.load(Ordering::Acquire);
		loop {
			let count = (current & SHARED_COUNT_MASK) >> SHARED_COUNT_SHIFT;
			debug_assert!(count > 0, "unlock_shared on a record with no shared locks");
			let new = (current & !SHARED_COUNT_MASK) | ((count - 1) << SHARED_COUNT_SHIFT);
			match self.control.compare_exchange_weak(
				current,
				new,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => return,
				Err(observed) => current = observed,
			}
		}
	}

	/// Speculative exclusive (tentative) lock, confirmed by the caller
	/// winning its CAS onto the chain. Fails if the record is invalid,
	/// sealed, or already exclusively locked.
	pub fn try_lock_exclusive(&self) -> bool {
		let current = self.control.load(Ordering::Acquire);
		if current & (INVALID_BIT | SEALED_BIT | EXCLUSIVE_BIT) != 0 {
			return false;
		}
		self.control
			.compare_exchange(
				current,
				current | EXCLUSIVE_BIT,
				Ordering::AcqRel,
				Ordering::Acquire,
			)
			.is_ok()
	}

	pub fn unlock_exclusive(&self) {
		self.control.fetch_and(!EXCLUSIVE_BIT, Ordering::AcqRel);
	}

	/// Atomically reads this record's shared-lock count and marks it
	/// invalid in one CAS, zeroing the count as it does. Used when the
	/// transfer destination is outside this crate's `RecordInfo` type — see
	/// `engine::verify::check_tail_after_splice` — and a two-sided
	/// `RecordInfo`-to-`RecordInfo` copy isn't available.
	pub fn take_shared_locks_and_invalidate(&self) -> u8 {
		let mut current = self.control.load(Ordering::Acquire);
		loop {
			let count = (current & SHARED_COUNT_MASK) >> SHARED_COUNT_SHIFT;
			let new = (current | INVALID_BIT) & !SHARED_COUNT_MASK;
			match self.control.compare_exchange_weak(
				current,
				new,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => return count as u8,
				Err(observed) => current = observed,
			}
		}
	}

	/// Atomically copies `src`'s shared-lock count onto `self` and marks
	/// `src` invalid, in a single pass per side. Exclusive locks are never
	/// transferred.
	///
	/// Returns the number of shared locks transferred.
	pub fn copy_read_locks_from_and_mark_source_invalid(&self, src: &RecordInfo) -> u8 {
		let mut src_current = src.control.load(Ordering::Acquire);
		let transferred = loop {
			let count = ((src_current & SHARED_COUNT_MASK) >> SHARED_COUNT_SHIFT) as u8;
			let new_src = src_current | INVALID_BIT;
			match src.control.compare_exchange_weak(
				src_current,
				new_src,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => break count,
				Err(observed) => src_current = observed,
			}
		};

		if transferred > 0 {
			let mut self_current = self.control.load(Ordering::Acquire);
			loop {
				let self_count = (self_current & SHARED_COUNT_MASK) >> SHARED_COUNT_SHIFT;
				let new_count = (self_count + transferred as u64).min(u8::MAX as u64);
				let new_self =
					(self_current & !SHARED_COUNT_MASK) | (new_count << SHARED_COUNT_SHIFT);
				match self.control.compare_exchange_weak(
					self_current,
					new_self,
					Ordering::AcqRel,
					Ordering::Acquire,
				) {
					Ok(_) => break,
					Err(observed) => self_current = observed,
				}
			}
		}

		transferred
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn blank() -> RecordInfo {
		RecordInfo::blank()
	}

	#[test]
	fn init_sets_previous_address_and_size() {
		let rec = blank();
		rec.init(AddressWord::main_log(0x2000), 48);
		assert_eq!(rec.previous_address(), AddressWord::main_log(0x2000));
		assert_eq!(rec.record_size(), 48);
		assert!(!rec.is_invalid());
	}

	#[test]
	fn null_header_is_invalid_and_null() {
		let rec = blank();
		rec.init_null();
		assert!(rec.is_null());
		assert!(rec.is_invalid());
	}

	#[test]
	fn set_invalid_is_idempotent() {
		let rec = blank();
		rec.init(AddressWord::INVALID, 16);
		rec.set_invalid();
		rec.set_invalid();
		assert!(rec.is_invalid());
	}

	#[test]
	fn try_update_address_cas_semantics() {
		let rec = blank();
		rec.init(AddressWord::main_log(0x100), 16);

		assert!(!rec.try_update_address(AddressWord::main_log(0x999), AddressWord::main_log(0x200)));
		assert!(rec.try_update_address(AddressWord::main_log(0x100), AddressWord::main_log(0x200)));
		assert_eq!(rec.previous_address(), AddressWord::main_log(0x200));
	}

	#[test]
	fn shared_lock_count_round_trips() {
		let rec = blank();
		rec.init(AddressWord::INVALID, 16);
		assert!(rec.try_lock_shared());
		assert!(rec.try_lock_shared());
		assert_eq!(rec.shared_lock_count(), 2);
		rec.unlock_shared();
		assert_eq!(rec.shared_lock_count(), 1);
	}

	#[test]
	fn exclusive_lock_excludes_shared_and_exclusive() {
		let rec = blank();
		rec.init(AddressWord::INVALID, 16);
		assert!(rec.try_lock_exclusive());
		assert!(!rec.try_lock_exclusive());
		assert!(!rec.try_lock_shared());
		rec.unlock_exclusive();
		assert!(rec.try_lock_shared());
	}

	#[test]
	fn invalid_record_refuses_new_locks() {
		let rec = blank();
		rec.init(AddressWord::INVALID, 16);
		rec.set_invalid();
		assert!(!rec.try_lock_shared());
		assert!(!rec.try_lock_exclusive());
	}

	#[test]
	fn take_shared_locks_and_invalidate_zeroes_and_marks_invalid() {
		let rec = blank();
		rec.init(AddressWord::INVALID, 16);
		rec.try_lock_shared();
		rec.try_lock_shared();

		let taken = rec.take_shared_locks_and_invalidate();

		assert_eq!(taken, 2);
		assert_eq!(rec.shared_lock_count(), 0);
		assert!(rec.is_invalid());
	}

	#[test]
	fn lock_transfer_conserves_count_and_invalidates_source() {
		let src = blank();
		src.init(AddressWord::INVALID, 16);
		src.try_lock_shared();
		src.try_lock_shared();
		src.try_lock_shared();

		let dst = blank();
		dst.init(AddressWord::INVALID, 16);

		let moved = dst.copy_read_locks_from_and_mark_source_invalid(&src);

		assert_eq!(moved, 3);
		assert_eq!(dst.shared_lock_count(), 3);
		assert!(src.is_invalid());
	}

	#[test]
	fn lock_transfer_with_no_shared_locks_leaves_destination_untouched() {
		let src = blank();
		src.init(AddressWord::INVALID, 16);

		let dst = blank();
		dst.init(AddressWord::INVALID, 16);
		dst.try_lock_shared();

		let moved = dst.copy_read_locks_from_and_mark_source_invalid(&src);

		assert_eq!(moved, 0);
		assert_eq!(dst.shared_lock_count(), 1);
		assert!(src.is_invalid());
	}
}
