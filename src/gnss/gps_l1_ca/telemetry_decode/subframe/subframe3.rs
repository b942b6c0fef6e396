use ::serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::utils::bit_fields::{word_read, sword_read, concat};

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Body {
	pub cic:f64,
	pub omega0:f64,
	pub cis:f64,
	pub i0:f64,
	pub crc:f64,
	pub omega:f64,
	pub omega_dot:f64,
	pub iode:u8,
	pub idot:f64
}

fn split_i32(msb_word:u32, lsb_word:u32) -> Result<f64, DigSigProcErr> {
	Ok(concat(word_read(msb_word, 17, 24)?, word_read(lsb_word, 1, 24)?, 24) as i32 as f64)
}

impl Body {

	pub fn new(words:&[u32; 10]) -> Result<Body, DigSigProcErr> {
		let cic:f64       = (sword_read(words[2], 1, 16)? as f64) * (2.0_f64).powi(-29);
		let omega0:f64    = split_i32(words[2], words[3])? * (2.0_f64).powi(-31);
		let cis:f64       = (sword_read(words[4], 1, 16)? as f64) * (2.0_f64).powi(-29);
		let i0:f64        = split_i32(words[4], words[5])? * (2.0_f64).powi(-31);
		let crc:f64       = (sword_read(words[6], 1, 16)? as f64) * (2.0_f64).powi(-5);
		let omega:f64     = split_i32(words[6], words[7])? * (2.0_f64).powi(-31);
		let omega_dot:f64 = (sword_read(words[8], 1, 24)? as f64) * (2.0_f64).powi(-43);
		let iode:u8       =  word_read(words[9], 1, 8)? as u8;
		let idot:f64      = (sword_read(words[9], 9, 22)? as f64) * (2.0_f64).powi(-43);
		Ok(Body{ cic, omega0, cis, i0, crc, omega, omega_dot, iode, idot })
	}

}
