//! Epoch protection: the sole memory-reclamation mechanism for read-cache
//! pages. Every traversal and CAS sequence runs inside a pinned
//! epoch; retired pages are deferred rather than freed inline, so a page is
//! only reused once every thread that could have observed an address into
//! it has advanced past the epoch in which it was unlinked.

use std::hint;

use crossbeam_epoch::Guard;

use crate::record::RecordInfo;

/// Pins the current thread's epoch for the duration of a traversal or CAS
/// sequence.
#[inline]
pub fn pin() -> Guard {
	crossbeam_epoch::pin()
}

/// The only cooperative wait in this subsystem: spins until the evictor has
/// published the unlinked state of a record below `HeadAddress`.
pub fn spin_wait_until_closed(info: &RecordInfo) {
	let mut spins = 0u32;
	while !info.is_invalid() {
		if spins < 64 {
			hint::spin_loop();
		} else {
			std::thread::yield_now();
		}
		spins = spins.saturating_add(1);
	}
}
