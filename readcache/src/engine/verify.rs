//! Post-insert verifications: the two race windows an insert must close
//! after it wins its CAS.

use byte_view::ByteView;
use std::hash::Hash;

use crate::address::AddressWord;
use crate::epoch;
use crate::main_log::MainLog;
use crate::status::OperationStatus;

use super::{ReadCacheEngine, StackContext};

impl<K, M> ReadCacheEngine<K, M>
where
	K: ByteView + Hash + PartialEq + Clone,
	M: MainLog<Key = K>,
{
	/// (a) Main-log splice followed by another main-log insert.
	///
	/// `splice_point` is the read-cache record whose `PreviousAddress` we
	/// just CAS'd, or `AddressWord::INVALID` if the chain had no read-cache
	/// prefix (the bucket itself holds the main-log head, looked up via
	/// `hash`). `until_logical_address` is the main-log address that was at
	/// the splice point when the operation began. `new_record` is the
	/// address of the record this operation just inserted, invalidated if
	/// this verification fails.
	pub fn ensure_no_new_main_log_record_was_spliced(
		&self,
		key: &K,
		hash: u64,
		splice_point: AddressWord,
		until_logical_address: AddressWord,
		new_record: u64,
	) -> OperationStatus {
		let _guard = epoch::pin();

		let current_prev = if splice_point.is_invalid() {
			self.index.find_tag(hash).address()
		} else {
			let info = self.log.get_info(splice_point.absolute());
			info.previous_address()
		};

		if current_prev.absolute() <= until_logical_address.absolute() {
			return OperationStatus::Success;
		}

		let mut cursor = current_prev;
		loop {
			if cursor.absolute() == until_logical_address.absolute() {
				return OperationStatus::Success;
			}
			if cursor.absolute() <= self.main_log.head_address() {
				log::warn!(
					"ensure_no_new_main_log_record_was_spliced: record at {new_record:#x} abandoned, intervening chain escaped to disk"
				);
				self.log.get_info(new_record).set_invalid();
				return OperationStatus::RecordOnDisk;
			}
			let candidate = self.main_log.get_key(cursor.absolute());
			if &candidate == key {
				log::debug!("ensure_no_new_main_log_record_was_spliced: record at {new_record:#x} abandoned, newer in-memory record exists");
				self.log.get_info(new_record).set_invalid();
				return OperationStatus::RecordExists;
			}
			cursor = self.main_log.get_previous_address(cursor.absolute());
		}
	}

	/// (b) Concurrent read-cache insert on the same key, observed after an
	/// updater has already CAS'd its new main-log record at the tail.
	///
	/// Walks from the current bucket head down to (and excluding)
	/// `start_position`, the position observed when the operation began. If
	/// a live matching read-cache record is found, its shared locks are
	/// transferred onto `new_main_log_address` and it is marked `Invalid`.
	/// Exclusive locks are never transferred.
	pub fn check_tail_after_splice(
		&self,
		key: &K,
		hash: u64,
		start_position: AddressWord,
		new_main_log_address: u64,
	) -> OperationStatus {
		let _guard = epoch::pin();

		loop {
			let entry = self.index.find_tag(hash);
			let mut current = entry.address();

			while current.is_read_cache() && current != start_position {
				let absolute = current.absolute();
				if absolute < self.log.head_address() {
					epoch::spin_wait_until_closed(self.log.get_info(absolute));
					break;
				}

				let info = self.log.get_info(absolute);
				if !info.is_invalid() {
					let candidate = self.log.get_key::<K>(absolute);
					if candidate == key {
						let transferred = info.take_shared_locks_and_invalidate();
						if transferred > 0 {
							log::trace!(
								"check_tail_after_splice: transferring {transferred} shared lock(s) from {absolute:#x} onto {new_main_log_address:#x}"
							);
							self.main_log.add_shared_locks(new_main_log_address, transferred);
						}
						return OperationStatus::Success;
					}
				}
				current = info.previous_address();
			}

			if !current.is_read_cache() || current == start_position {
				return OperationStatus::Success;
			}
			// fell out of the inner loop via an eviction wait; restart the walk.
		}
	}

	/// Locates the chain's current main-log splice point (the lowest
	/// read-cache record, or the bucket head itself if the chain has no
	/// read-cache prefix), for callers that need it ahead of
	/// `ensure_no_new_main_log_record_was_spliced` without a full
	/// `find_in_read_cache` pass.
	pub fn find_main_log_splice_point(&self, bucket_head: AddressWord) -> (AddressWord, StackContext) {
		let (_, ctx) = self.skip_read_cache(bucket_head);
		let splice_point = if ctx.lowest_read_cache_logical_address.is_invalid() {
			AddressWord::INVALID
		} else {
			ctx.lowest_read_cache_logical_address
		};
		(splice_point, ctx)
	}
}
