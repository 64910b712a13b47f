//! An updater's walk to the main-log suffix, with no key comparison.

use crate::address::AddressWord;
use crate::epoch;

use super::walk::{self, Step};
use super::{ReadCacheEngine, StackContext};
use byte_view::ByteView;
use std::hash::Hash;

use crate::main_log::MainLog;

impl<K, M> ReadCacheEngine<K, M>
where
	K: ByteView + Hash + PartialEq + Clone,
	M: MainLog<Key = K>,
{
	/// Advances past the read-cache prefix to the first main-log address in
	/// the chain. Returns the resulting context and whether the walk had to
	/// wait on an in-progress eviction (`did_refresh`); callers that
	/// pre-computed state before calling must re-verify it when that's set.
	pub fn skip_read_cache(&self, bucket_head: AddressWord) -> (StackContext, bool) {
		let _guard = epoch::pin();

		if !bucket_head.is_read_cache() {
			let mut ctx = StackContext::default();
			ctx.latest_logical_address = bucket_head;
			return (ctx, false);
		}

		let mut did_refresh = false;
		'restart: loop {
			let mut current = bucket_head;
			let mut ctx = StackContext::default();

			loop {
				match walk::step(&self.log, current) {
					Step::Exit(addr) => {
						ctx.latest_logical_address = addr;
						return (ctx, did_refresh);
					}
					Step::NeedsRestart(absolute) => {
						did_refresh = true;
						log::debug!("skip_read_cache: address {absolute:#x} evicted mid-walk, restarting from bucket head");
						epoch::spin_wait_until_closed(self.log.get_info(absolute));
						continue 'restart;
					}
					Step::ReadCache(addr) => {
						ctx.lowest_read_cache_logical_address = addr;
						current = self.log.get_info(addr.absolute()).previous_address();
					}
				}
			}
		}
	}
}
