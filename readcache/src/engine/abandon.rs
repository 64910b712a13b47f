//! Detaches a record whose chain CAS lost a race, so the evictor never
//! attempts chain maintenance on it.

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
	pub fn abandon_record(&self, address: u64) {
		let _guard = epoch::pin();

		let info = self.log.get_info(address);
		info.set_invalid();
		info.force_previous_address(AddressWord::TEMP_INVALID);
	}
}
