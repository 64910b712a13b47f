//! Outcomes the engine returns up the call stack.
//!
//! None of these are errors in the `std::error::Error` sense — every
//! variant is an outcome a well-behaved caller branches on, not a failure.
//! Genuinely exceptional conditions (bad configuration, a collaborator that
//! violates its contract) use [`crate::error::Error`] instead.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
	/// Completed; any chain updates this operation needed are published.
	Success,
	/// Transient contention (lost CAS, stale epoch, busy allocator). The
	/// caller refreshes its epoch and retries.
	RetryLater,
	/// The read-cache log has no room for this record. The caller must wait
	/// for the eviction task to advance `HeadAddress` and retry.
	AllocateFailed,
	/// Post-insert verification found that part of the chain it needed to
	/// inspect has escaped to disk; the caller's in-memory insertion was
	/// abandoned and it should proceed with its already-fetched value.
	RecordOnDisk,
	/// Post-insert verification found a newer in-memory record for the same
	/// key; the caller's insertion was abandoned.
	RecordExists,
}

impl OperationStatus {
	#[inline]
	pub fn is_success(self) -> bool {
		matches!(self, OperationStatus::Success)
	}
}
