//! Retires a half-open read-cache address range, unlinking each contained
//! record from its hash chain before the caller advances `HeadAddress`
//! past it.

use byte_view::ByteView;
use std::hash::Hash;

use crate::address::AddressWord;
use crate::epoch;
use crate::key::hash_key;
use crate::main_log::MainLog;

use super::ReadCacheEngine;

impl<K, M> ReadCacheEngine<K, M>
where
	K: ByteView + Hash + PartialEq + Clone,
	M: MainLog<Key = K>,
{
	/// Unlinks every non-padding, non-abandoned record in `[rc_from, rc_to)`
	/// from its hash chain. The caller is responsible for calling
	/// `self.log.advance_head(rc_to)` once this returns — `Evict` itself
	/// never moves `HeadAddress` (a single evictor thread owns it).
	///
	/// Chain walks here compare by bucket-index mask, not key equality:
	/// colliding keys share a chain, and every record in it must be walked
	/// regardless of which key it holds.
	pub fn evict(&self, rc_from: u64, rc_to: u64) {
		let _guard = epoch::pin();

		let addresses: Vec<u64> = self.log.iter_range(rc_from, rc_to).collect();
		for address in addresses {
			let info = self.log.get_info(address);
			if info.previous_address().word() <= AddressWord::TEMP_INVALID.word() {
				// Padding, already abandoned, or already unlinked by an earlier
				// address's descent through this same chain.
				continue;
			}
			let key = self.log.get_key::<K>(address);
			let hash = hash_key(key);
			self.unlink_range_from_chain(rc_to, hash);
		}
	}

	/// Walks the chain rooted at `hash`'s bucket once, unlinking *every*
	/// read-cache record below `rc_to` encountered along the way — not just
	/// a single target address. A chain can hold more than one record in
	/// the eviction range (e.g. the same key cached, replaced, and cached
	/// again); unlinking only the record `evict`'s outer loop happens to be
	/// looking for on this call would skip over the others mid-walk and
	/// leave `next_physical`'s splice CAS racing against an edge that was
	/// never the one actually observed, which never succeeds and loops
	/// forever. Processing every in-range record in one descent, as §4.9
	/// step 4 describes, makes each call for this chain a no-op once the
	/// range has already been cleared.
	fn unlink_range_from_chain(&self, rc_to: u64, hash: u64) {
		'restart: loop {
			let mut entry = self.index.find_tag(hash);
			let mut current = entry.address();
			let mut next_physical: Option<AddressWord> = None;

			while current.is_read_cache() {
				let current_abs = current.absolute();
				let info = self.log.get_info(current_abs);

				if current_abs >= rc_to {
					next_physical = Some(current);
					current = info.previous_address();
					continue;
				}

				let new_prev = info.previous_address();
				let unlinked = match next_physical {
					Some(next) => self
						.log
						.get_info(next.absolute())
						.try_update_address(current, new_prev),
					None => entry.try_cas(&self.index, new_prev),
				};

				if !unlinked {
					continue 'restart;
				}

				// Readers parked waiting for this record to close wait on this
				// bit, not on `PreviousAddress`, so it must flip before any walk
				// can safely restart past this address.
				info.force_previous_address(AddressWord::TEMP_INVALID);
				info.set_invalid();

				if next_physical.is_none() {
					// We just moved the bucket head out from under `entry`'s
					// snapshot; refresh it so a second consecutive in-range
					// record at the (new) head doesn't force a needless restart.
					entry.refresh(&self.index);
				}
				current = new_prev;
			}

			return;
		}
	}
}
