
use ::serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::utils::bit_fields::{word_read, sword_read, bit, concat};

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Body {
	pub iode:u8,
	pub crs:f64,
	pub dn:f64,
	pub m0:f64,
	pub cuc:f64,
	pub e:f64,
	pub cus:f64,
	pub sqrt_a:f64,
	pub t_oe:f64,
	pub fit_interval:bool,
	pub aodo:u16
}

impl Body {

	pub fn new(words:&[u32; 10]) -> Result<Body, DigSigProcErr> {
		let iode:u8    =  word_read(words[2], 1, 8)? as u8;
		let crs:f64    = (sword_read(words[2], 9, 24)? as f64) * (2.0_f64).powi(-5);
		let dn:f64     = (sword_read(words[3], 1, 16)? as f64) * (2.0_f64).powi(-43);
		let m0:f64     = (concat(word_read(words[3], 17, 24)?, word_read(words[4], 1, 24)?, 24) as i32 as f64) * (2.0_f64).powi(-31);
		let cuc:f64    = (sword_read(words[5], 1, 16)? as f64) * (2.0_f64).powi(-29);
		let e:f64      = (concat(word_read(words[5], 17, 24)?, word_read(words[6], 1, 24)?, 24) as f64) * (2.0_f64).powi(-33);
		let cus:f64    = (sword_read(words[7], 1, 16)? as f64) * (2.0_f64).powi(-29);
		let sqrt_a:f64 = (concat(word_read(words[7], 17, 24)?, word_read(words[8], 1, 24)?, 24) as f64) * (2.0_f64).powi(-19);
		let t_oe:f64   = (word_read(words[9], 1, 16)? as f64) * (2.0_f64).powi(4);
		let fit_interval:bool = bit(words[9], 17)?;
		let aodo:u16   = (word_read(words[9], 18, 22)? as u16) * 900;
		Ok(Body{ iode, crs, dn, m0, cuc, e, cus, sqrt_a, t_oe, fit_interval, aodo })
	}

}
