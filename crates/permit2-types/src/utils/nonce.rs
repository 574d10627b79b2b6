//! Unordered nonce arithmetic.
//!
//! A signature-transfer nonce addresses one bit in one 256-bit word: the high
//! 248 bits select the nonce space (the word) and the low 8 bits select the
//! bit within it.

use alloy_primitives::U256;

/// Number of independently consumable nonces in one space.
pub const NONCES_PER_SPACE: usize = 256;

/// Splits a nonce into its `(nonce_space, bit_index)` position.
pub fn bitmap_position(nonce: U256) -> (U256, u8) {
	let space = nonce >> 8;
	let bit = (nonce & U256::from(0xffu8)).to::<u8>();
	(space, bit)
}

/// Builds the nonce addressing `bit_index` in `nonce_space`.
///
/// Spaces above `2^248 - 1` are truncated, as the top byte cannot be addressed.
pub fn compose_nonce(nonce_space: U256, bit_index: u8) -> U256 {
	(nonce_space << 8) | U256::from(bit_index)
}

/// Mask with only the bit for `bit_index` set.
pub fn bit_mask(bit_index: u8) -> U256 {
	U256::from(1u8) << (bit_index as usize)
}
