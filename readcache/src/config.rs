//! Configuration surface recognized by the read-cache subsystem.

use crate::error::ConfigError;
use crate::utils::units::{KiB, MiB};

pub const DEFAULT_PAGE_SIZE: usize = 256 * KiB;
pub const DEFAULT_MEMORY_SIZE: usize = 64 * MiB;
pub const DEFAULT_SECOND_CHANCE_FRACTION: f64 = 0.1;

/// Options recognized by [`crate::engine::ReadCacheEngine`].
///
/// Mirrors `acorn::manage::page_access::Params`: a plain struct handed to a
/// constructor, validated once up front rather than re-checked on every
/// access.
#[derive(Debug, Clone, Copy)]
pub struct ReadCacheOptions {
	/// Whether a `ReadCacheLog` is created at all. When `false`, callers
	/// should skip this subsystem entirely (reads go straight to the main
	/// log) — the engine itself does not special-case a disabled cache.
	pub enabled: bool,
	pub page_size: usize,
	pub memory_size: usize,
	pub second_chance_fraction: f64,
}

impl Default for ReadCacheOptions {
	fn default() -> Self {
		Self {
			enabled: true,
			page_size: DEFAULT_PAGE_SIZE,
			memory_size: DEFAULT_MEMORY_SIZE,
			second_chance_fraction: DEFAULT_SECOND_CHANCE_FRACTION,
		}
	}
}

impl ReadCacheOptions {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.page_size.is_power_of_two() {
			return Err(ConfigError::InvalidPageSize(self.page_size));
		}
		if !self.memory_size.is_power_of_two() || self.memory_size < self.page_size {
			return Err(ConfigError::InvalidMemorySize(self.memory_size, self.page_size));
		}
		if !(self.second_chance_fraction > 0.0 && self.second_chance_fraction < 1.0) {
			return Err(ConfigError::InvalidSecondChanceFraction(
				self.second_chance_fraction,
			));
		}
		Ok(())
	}

	#[inline]
	pub fn num_pages(&self) -> usize {
		self.memory_size / self.page_size
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_options_validate() {
		assert!(ReadCacheOptions::default().validate().is_ok());
	}

	#[test]
	fn rejects_non_power_of_two_page_size() {
		let opts = ReadCacheOptions {
			page_size: 3000,
			..Default::default()
		};
		assert!(matches!(
			opts.validate(),
			Err(ConfigError::InvalidPageSize(3000))
		));
	}

	#[test]
	fn rejects_memory_size_smaller_than_page_size() {
		let opts = ReadCacheOptions {
			page_size: 4 * KiB,
			memory_size: 2 * KiB,
			..Default::default()
		};
		assert!(matches!(opts.validate(), Err(ConfigError::InvalidMemorySize(_, _))));
	}

	#[test]
	fn rejects_out_of_range_second_chance_fraction() {
		let opts = ReadCacheOptions {
			second_chance_fraction: 1.5,
			..Default::default()
		};
		assert!(matches!(
			opts.validate(),
			Err(ConfigError::InvalidSecondChanceFraction(_))
		));
	}
}
