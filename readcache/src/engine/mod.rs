//! The read-cache engine: the lock-free algorithms that tie [`crate::log::ReadCacheLog`]
//! and [`crate::hash_index::HashIndex`] together with an external main log.
//!
//! Split across files by operation, the way `acorn::manage` splits its page-access
//! operations across sibling modules sharing one `PageAccess` struct. Each file below
//! contributes an `impl<K, M> ReadCacheEngine<K, M>` block; none of them own the type.

mod abandon;
mod checkpoint;
mod evict;
mod find;
mod skip;
mod splice;
mod verify;
mod walk;

use std::hash::Hash;

use byte_view::ByteView;

use crate::address::AddressWord;
use crate::config::ReadCacheOptions;
use crate::hash_index::HashIndex;
use crate::log::ReadCacheLog;
use crate::main_log::MainLog;

/// Bundles the engine's three collaborators: the read-cache log, the shared
/// hash index, and the external main log.
pub struct ReadCacheEngine<K, M>
where
	K: ByteView + Hash + PartialEq + Clone,
	M: MainLog<Key = K>,
{
	pub log: ReadCacheLog,
	pub index: HashIndex,
	pub main_log: M,
}

impl<K, M> ReadCacheEngine<K, M>
where
	K: ByteView + Hash + PartialEq + Clone,
	M: MainLog<Key = K>,
{
	pub fn new(options: &ReadCacheOptions, num_buckets: usize, main_log: M) -> Result<Self, crate::error::Error> {
		Ok(Self {
			log: ReadCacheLog::new(options)?,
			index: HashIndex::new(num_buckets),
			main_log,
		})
	}
}

/// Per-call traversal state threaded through `find_in_read_cache` / `skip_read_cache`
/// and their post-insert verifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackContext {
	/// The first non-read-cache address reached: the splice point's current
	/// `PreviousAddress`, i.e. the top of the main-log suffix.
	pub latest_logical_address: AddressWord,
	/// The last (lowest) read-cache record visited — the splice-point candidate.
	pub lowest_read_cache_logical_address: AddressWord,
	/// The matched record, if `find_in_read_cache` found one.
	pub logical_address: Option<AddressWord>,
}

impl Default for StackContext {
	fn default() -> Self {
		Self {
			latest_logical_address: AddressWord::INVALID,
			lowest_read_cache_logical_address: AddressWord::INVALID,
			logical_address: None,
		}
	}
}
