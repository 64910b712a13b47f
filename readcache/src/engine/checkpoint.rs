//! The read-only projection used when serializing a hash-table page.

use byte_view::ByteView;
use std::hash::Hash;

use crate::address::AddressWord;
use crate::epoch;
use crate::main_log::MainLog;

use super::ReadCacheEngine;

impl<K, M> ReadCacheEngine<K, M>
where
	K: ByteView + Hash + PartialEq + Clone,
	M: MainLog<Key = K>,
{
	/// Follows `PreviousAddress` through the read-cache prefix and returns
	/// the first main-log address reachable. Does not modify the in-memory
	/// hash table; the caller writes the result into its checkpoint buffer.
	pub fn flatten_bucket_for_checkpoint(&self, bucket_word: AddressWord) -> AddressWord {
		let _guard = epoch::pin();

		let mut current = bucket_word;
		while current.is_read_cache() {
			let info = self.log.get_info(current.absolute());
			current = info.previous_address();
		}
		current
	}
}
