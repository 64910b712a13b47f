//! Splices a fresh main-log record onto the boundary between a chain's
//! read-cache prefix and its main-log suffix.

use byte_view::ByteView;
use std::hash::Hash;

use crate::address::AddressWord;
use crate::epoch;
use crate::main_log::MainLog;

use super::{ReadCacheEngine, StackContext};

impl<K, M> ReadCacheEngine<K, M>
where
	K: ByteView + Hash + PartialEq + Clone,
	M: MainLog<Key = K>,
{
	/// Attempts to splice `new_main_log_address` into the chain at the
	/// lowest read-cache record observed in `ctx`, replacing its prior
	/// `PreviousAddress` (`ctx.latest_logical_address`). A single CAS;
	/// the caller handles retry on failure.
	///
	/// Splicing mid-chain rather than at the bucket head preserves the
	/// monotone-prefix invariant: a main-log-to-main-log replacement below
	/// the read-cache prefix does not lose cached reads above it.
	pub fn splice_at_boundary(&self, ctx: &StackContext, new_main_log_address: AddressWord) -> bool {
		let _guard = epoch::pin();

		let splice_point = ctx.lowest_read_cache_logical_address;
		if splice_point.is_invalid() {
			return false;
		}
		if splice_point.absolute() < self.log.head_address() {
			return false;
		}
		let info = self.log.get_info(splice_point.absolute());
		info.try_update_address(ctx.latest_logical_address, new_main_log_address)
	}
}
