//! Looks up a key against the read-cache prefix of a chain.

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
	/// Looks up `key` starting from `bucket_head`. Returns `true` iff a live
	/// read-cache record for `key` at or above `min_address` was found.
	///
	/// `min_address` defaults to the read-cache log's current `HeadAddress`
	/// when `None` or when the caller passes an address that has since been
	/// evicted or never pointed into the read cache.
	///
	/// When `always_find_latest` is set, the walk continues past a hit all
	/// the way to the main-log suffix, so updaters can learn the splice
	/// point in the same pass.
	pub fn find_in_read_cache(
		&self,
		key: &K,
		bucket_head: AddressWord,
		min_address: Option<AddressWord>,
		always_find_latest: bool,
	) -> (bool, StackContext) {
		let _guard = epoch::pin();

		let min_absolute = min_address
			.filter(|a| a.is_read_cache() && a.absolute() >= self.log.head_address())
			.map(|a| a.absolute())
			.unwrap_or_else(|| self.log.head_address());

		if !bucket_head.is_read_cache() {
			let mut ctx = StackContext::default();
			ctx.latest_logical_address = bucket_head;
			return (false, ctx);
		}

		'restart: loop {
			let mut current = bucket_head;
			let mut ctx = StackContext::default();
			let mut hit: Option<AddressWord> = None;

			loop {
				match walk::step(&self.log, current) {
					Step::Exit(addr) => {
						ctx.latest_logical_address = addr;
						break;
					}
					Step::NeedsRestart(absolute) => {
						log::debug!("find_in_read_cache: address {absolute:#x} evicted mid-walk, restarting from bucket head");
						epoch::spin_wait_until_closed(self.log.get_info(absolute));
						continue 'restart;
					}
					Step::ReadCache(addr) => {
						ctx.lowest_read_cache_logical_address = addr;
						let info = self.log.get_info(addr.absolute());
						if hit.is_none() && !info.is_invalid() && addr.absolute() >= min_absolute {
							let candidate = self.log.get_key::<K>(addr.absolute());
							if candidate == key {
								hit = Some(addr);
								if !always_find_latest {
									ctx.logical_address = hit;
									return (true, ctx);
								}
							}
						}
						current = info.previous_address();
					}
				}
			}

			ctx.logical_address = hit;
			return (hit.is_some(), ctx);
		}
	}
}
