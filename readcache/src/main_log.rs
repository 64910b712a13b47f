//! The main-log allocator is an external collaborator: this crate
//! depends on it only through a narrow trait surface. Production code
//! plugs in the real allocator; tests plug in [`FakeMainLog`] or a
//! `mockall`-generated mock.

#[cfg(test)]
use mockall::automock;

use crate::address::AddressWord;

/// Operations the engine needs from the main log.
#[cfg_attr(test, automock(type Key=u64;))]
pub trait MainLog {
	type Key: PartialEq + Clone;

	/// `> 0` success, `0` flush-required, `< 0` retry-later.
	fn try_allocate(&self, size: u32) -> i64;

	fn head_address(&self) -> u64;
	fn begin_address(&self) -> u64;
	fn tail_address(&self) -> u64;

	fn get_physical_address(&self, logical: u64) -> u64 {
		logical
	}

	fn get_previous_address(&self, logical: u64) -> AddressWord;
	fn get_key(&self, logical: u64) -> Self::Key;
	fn get_record_size(&self, logical: u64) -> u32;

	/// The record's current shared-lock count. Part of the lock-transfer
	/// protocol: a main-log record's `RecordInfo` is
	/// internal to the allocator, so the transfer is expressed as two trait
	/// calls rather than one atomic cross-type copy.
	fn shared_lock_count(&self, logical: u64) -> u8;

	/// Adds `count` shared locks onto the record's lock state. Called after
	/// [`crate::record::RecordInfo::take_shared_locks_and_invalidate`] has
	/// atomically taken them from the source read-cache record.
	fn add_shared_locks(&self, logical: u64, count: u8);
}

/// An in-memory stand-in for the main log, for unit and integration tests
/// that need a real (if tiny) chain below the read-cache prefix. Exposed
/// under `test-util` so the `tests/` integration suite can depend on it
/// without pulling in `mockall`.
#[cfg(any(test, feature = "test-util"))]
pub mod fake {
	use std::sync::atomic::{AtomicU64, Ordering};
	use std::sync::Mutex;

	use super::*;

	struct Slot<K> {
		previous_address: AddressWord,
		key: Option<K>,
		shared_locks: u8,
	}

	/// Real main-log allocators reserve a header region below their first
	/// valid record, so `kTempInvalidAddress` (1) never collides with a
	/// live absolute address. This fake reserves the same low range.
	const RESERVED_SLOTS: usize = 64;

	pub struct FakeMainLog<K> {
		// The first `RESERVED_SLOTS` entries are unaddressable sentinels.
		records: Mutex<Vec<Slot<K>>>,
		head: AtomicU64,
		begin: AtomicU64,
	}

	impl<K: PartialEq + Clone> FakeMainLog<K> {
		pub fn new() -> Self {
			let sentinel = || Slot {
				previous_address: AddressWord::INVALID,
				key: None,
				shared_locks: 0,
			};
			Self {
				records: Mutex::new((0..RESERVED_SLOTS).map(|_| sentinel()).collect()),
				head: AtomicU64::new(0),
				begin: AtomicU64::new(RESERVED_SLOTS as u64),
			}
		}

		/// Appends a record with the given previous address, returning its
		/// new logical address.
		pub fn append(&self, previous_address: AddressWord, key: K) -> u64 {
			let mut records = self.records.lock().unwrap();
			let address = records.len() as u64;
			records.push(Slot {
				previous_address,
				key: Some(key),
				shared_locks: 0,
			});
			address
		}

		pub fn set_head_address(&self, head: u64) {
			self.head.store(head, Ordering::Release);
		}

		pub fn set_begin_address(&self, begin: u64) {
			self.begin.store(begin, Ordering::Release);
		}

		pub fn len(&self) -> usize {
			self.records.lock().unwrap().len()
		}
	}

	impl<K: PartialEq + Clone> MainLog for FakeMainLog<K> {
		type Key = K;

		fn try_allocate(&self, _size: u32) -> i64 {
			let mut records = self.records.lock().unwrap();
			let address = records.len() as u64;
			records.push(Slot {
				previous_address: AddressWord::INVALID,
				key: None,
				shared_locks: 0,
			});
			address as i64
		}

		fn head_address(&self) -> u64 {
			self.head.load(Ordering::Acquire)
		}

		fn begin_address(&self) -> u64 {
			self.begin.load(Ordering::Acquire)
		}

		fn tail_address(&self) -> u64 {
			self.records.lock().unwrap().len() as u64
		}

		fn get_previous_address(&self, logical: u64) -> AddressWord {
			self.records.lock().unwrap()[logical as usize].previous_address
		}

		fn get_key(&self, logical: u64) -> K {
			self.records.lock().unwrap()[logical as usize]
				.key
				.clone()
				.expect("get_key called on a sentinel/placeholder slot")
		}

		fn get_record_size(&self, _logical: u64) -> u32 {
			32
		}

		fn shared_lock_count(&self, logical: u64) -> u8 {
			self.records.lock().unwrap()[logical as usize].shared_locks
		}

		fn add_shared_locks(&self, logical: u64, count: u8) {
			self.records.lock().unwrap()[logical as usize].shared_locks += count;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::fake::FakeMainLog;
	use super::*;

	#[test]
	fn fake_main_log_appends_and_chains() {
		let log: FakeMainLog<u64> = FakeMainLog::new();
		let a = log.append(AddressWord::INVALID, 1);
		let b = log.append(AddressWord::main_log(a), 2);

		assert_eq!(log.get_key(a), 1);
		assert_eq!(log.get_key(b), 2);
		assert_eq!(log.get_previous_address(b), AddressWord::main_log(a));
		assert_eq!(log.tail_address(), b + 1);
	}

	#[test]
	fn fake_main_log_accumulates_shared_locks() {
		let log: FakeMainLog<u64> = FakeMainLog::new();
		let a = log.append(AddressWord::INVALID, 1);

		assert_eq!(log.shared_lock_count(a), 0);
		log.add_shared_locks(a, 2);
		log.add_shared_locks(a, 3);
		assert_eq!(log.shared_lock_count(a), 5);
	}
}
