//! Stable key hashing and equality: the minimal stand-in for the
//! `EqualityComparer`-style collaborator (`GetHashCode64`/`Equals`)
//! alongside the allocator and hash index.

use std::hash::{Hash, Hasher};

use ahash::AHasher;

#[inline]
pub fn hash_key<K: Hash + ?Sized>(key: &K) -> u64 {
	let mut hasher = AHasher::default();
	key.hash(&mut hasher);
	hasher.finish()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_is_stable_within_a_process() {
		assert_eq!(hash_key(&"alpha"), hash_key(&"alpha"));
		assert_ne!(hash_key(&"alpha"), hash_key(&"beta"));
	}
}
