
// Bit numbering follows IS-GPS-200: bit 1 is the first transmitted (most significant) bit of a
// 30-bit navigation word, bit 30 the last.

use crate::DigSigProcErr;

pub const BITS_PER_WORD:u32 = 30;

fn field_mask(first:u32, last:u32) -> Result<(u32, u32), DigSigProcErr> {
	if first == 0 || last > BITS_PER_WORD || first > last {
		return Err(DigSigProcErr::InvalidTelemetryData("Bit range outside of a 30-bit word in bit_fields"));
	}
	let width = last - first + 1;
	Ok((width, (1u32 << width) - 1))
}

pub fn word_read(word:u32, first:u32, last:u32) -> Result<u32, DigSigProcErr> {
	let (_, mask) = field_mask(first, last)?;
	Ok((word >> (BITS_PER_WORD - last)) & mask)
}

/// Reads a two's-complement field, sign-extending from its first bit
pub fn sword_read(word:u32, first:u32, last:u32) -> Result<i32, DigSigProcErr> {
	let (width, _) = field_mask(first, last)?;
	Ok(sign_extend(word_read(word, first, last)?, width))
}

pub fn bit(word:u32, n:u32) -> Result<bool, DigSigProcErr> { Ok(word_read(word, n, n)? == 1) }

pub fn sign_extend(value:u32, width:u32) -> i32 {
	let shift = 32 - width;
	((value << shift) as i32) >> shift
}

/// Concatenates a field split across two words, `hi` supplying the most significant bits
pub fn concat(hi:u32, lo:u32, lo_width:u32) -> u32 { (hi << lo_width) | lo }

/// Returns `word` with the given bit range replaced by the low bits of `value`
pub fn word_write(word:u32, first:u32, last:u32, value:u32) -> Result<u32, DigSigProcErr> {
	let (_, mask) = field_mask(first, last)?;
	let shift = BITS_PER_WORD - last;
	Ok((word & !(mask << shift)) | ((value & mask) << shift))
}
