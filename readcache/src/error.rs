use thiserror::Error;

use crate::utils::units::{display_size, B, KiB};

pub const PAGE_SIZE_MIN: usize = 512 * B;
pub const PAGE_SIZE_MAX: usize = 64 * KiB * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error(
		"read-cache page size {0} is invalid; must be a power of two between {1} and {2}",
		display_size(PAGE_SIZE_MIN),
		display_size(PAGE_SIZE_MAX)
	)]
	InvalidPageSize(usize),

	#[error("read-cache memory size {0} is invalid; must be a power-of-two multiple of the page size ({1})")]
	InvalidMemorySize(usize, usize),

	#[error("read-cache second-chance fraction must lie in (0.0, 1.0), got {0}")]
	InvalidSecondChanceFraction(f64),
}

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error("read-cache record of size {0} can never fit a page of size {1}")]
	RecordTooLarge(usize, usize),
}
