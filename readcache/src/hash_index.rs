//! Fixed-size bucket table: one `AddressWord` per slot, published and
//! observed only through compare-and-swap.
//!
//! Resizing, splitting, and multi-entry buckets are out of scope —
//! collisions are resolved entirely by the shared hash chain each slot
//! roots.

use std::sync::atomic::{AtomicU64, Ordering};

use static_assertions::assert_impl_all;

use crate::address::AddressWord;

pub struct HashIndex {
	buckets: Box<[AtomicU64]>,
	mask: u64,
}

assert_impl_all!(HashIndex: Send, Sync);

impl HashIndex {
	/// `num_buckets` is rounded up to the next power of two.
	pub fn new(num_buckets: usize) -> Self {
		let num_buckets = num_buckets.next_power_of_two().max(1);
		let buckets = (0..num_buckets)
			.map(|_| AtomicU64::new(AddressWord::INVALID.word()))
			.collect();
		Self {
			buckets,
			mask: (num_buckets - 1) as u64,
		}
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.buckets.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty()
	}

	#[inline]
	pub fn bucket_index(&self, hash: u64) -> usize {
		(hash & self.mask) as usize
	}

	/// Locates the bucket for `hash` and snapshots its current contents.
	pub fn find_tag(&self, hash: u64) -> HashEntryInfo {
		let index = self.bucket_index(hash);
		let word = self.buckets[index].load(Ordering::Acquire);
		HashEntryInfo {
			index,
			expected: word,
		}
	}

	fn reload(&self, entry: &mut HashEntryInfo) {
		entry.expected = self.buckets[entry.index].load(Ordering::Acquire);
	}
}

/// A snapshot of one bucket slot, used to drive a subsequent CAS.
#[derive(Debug, Clone, Copy)]
pub struct HashEntryInfo {
	index: usize,
	expected: u64,
}

impl HashEntryInfo {
	#[inline]
	pub fn address(&self) -> AddressWord {
		AddressWord::from_word(self.expected)
	}

	#[inline]
	pub fn index(&self) -> usize {
		self.index
	}

	/// CAS the bucket from the snapshotted value to `new`.
	pub fn try_cas(&self, index_table: &HashIndex, new: AddressWord) -> bool {
		index_table.buckets[self.index]
			.compare_exchange(self.expected, new.word(), Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}

	/// Re-reads the bucket's current value after a failed CAS or a known
	/// eviction-driven restart.
	pub fn refresh(&mut self, index_table: &HashIndex) {
		index_table.reload(self);
	}
}
