//! The single chain-walk primitive shared by `find_in_read_cache` and
//! `skip_read_cache`: one walk-step operation parameterized by the log
//! selected via the read-cache bit, rather than duplicating traversal code.

use crate::address::AddressWord;
use crate::log::ReadCacheLog;

/// What a caller should do after inspecting one position in a chain.
pub(super) enum Step {
	/// `current` is a live read-cache record at or above `HeadAddress`; the
	/// caller may inspect it, then continue to its `PreviousAddress`.
	ReadCache(AddressWord),
	/// `current` is not a read-cache address: the walk has reached the
	/// main-log suffix and is done.
	Exit(AddressWord),
	/// `current`'s absolute address has been evicted. The caller must spin
	/// until the evictor closes the record, then restart the whole walk
	/// from the bucket head (the chain may have been rewritten).
	NeedsRestart(u64),
}

pub(super) fn step(log: &ReadCacheLog, current: AddressWord) -> Step {
	if !current.is_read_cache() {
		return Step::Exit(current);
	}
	let absolute = current.absolute();
	if absolute < log.head_address() {
		return Step::NeedsRestart(absolute);
	}
	Step::ReadCache(current)
}
