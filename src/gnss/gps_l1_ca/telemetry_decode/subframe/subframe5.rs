use ::serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::utils::bit_fields::{word_read, sword_read, sign_extend, concat};

/// Reference inclination the almanac's delta_i is relative to [semicircles]
pub const ALMANAC_I0:f64 = 0.30;

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Body {
	pub data_id:u8,
	pub sv_id:u8,
	pub page:Page
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub enum Page {
	AlmanacData(Almanac),
	NotDecoded,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Almanac {
	pub e:f64,
	pub t_oa:f64,
	pub inclination:f64,
	pub omega_dot:f64,
	pub sv_health:u8,
	pub sqrt_a:f64,
	pub omega0:f64,
	pub omega:f64,
	pub m0:f64,
	pub af0:f64,
	pub af1:f64,
}

impl Almanac {

	/// Names of the fields outside the ranges IS-GPS-200 documents for them
	pub fn out_of_range_fields(&self) -> Vec<&'static str> {
		let mut ans = vec![];
		if !(0.0..=0.03).contains(&self.e)                { ans.push("e"); }
		if !(0.0..=602112.0).contains(&self.t_oa)         { ans.push("t_oa"); }
		if !(-1.19e-7..=0.0).contains(&self.omega_dot)    { ans.push("omega_dot"); }
		if !(2530.0..=8192.0).contains(&self.sqrt_a)      { ans.push("sqrt_a"); }
		ans
	}

}

impl Body {

	pub fn new(words:&[u32; 10]) -> Result<Body, DigSigProcErr> {
		let data_id:u8 = word_read(words[2], 1, 2)? as u8;
		let sv_id:u8   = word_read(words[2], 3, 8)? as u8;
		let page:Page = match sv_id {
			1..=24 => {
				let e:f64         = (word_read(words[2], 9, 24)? as f64) * (2.0_f64).powi(-21);
				let t_oa:f64      = (word_read(words[3], 1, 8)? as f64) * (2.0_f64).powi(12);
				let delta_i:f64   = (sword_read(words[3], 9, 24)? as f64) * (2.0_f64).powi(-19);
				let omega_dot:f64 = (sword_read(words[4], 1, 16)? as f64) * (2.0_f64).powi(-38);
				let sv_health:u8  =  word_read(words[4], 17, 24)? as u8;
				let sqrt_a:f64    = (word_read(words[5], 1, 24)? as f64) * (2.0_f64).powi(-11);
				let omega0:f64    = (sword_read(words[6], 1, 24)? as f64) * (2.0_f64).powi(-23);
				let omega:f64     = (sword_read(words[7], 1, 24)? as f64) * (2.0_f64).powi(-23);
				let m0:f64        = (sword_read(words[8], 1, 24)? as f64) * (2.0_f64).powi(-23);
				let af0_raw:u32   = concat(word_read(words[9], 1, 8)?, word_read(words[9], 20, 22)?, 3);
				let af0:f64       = (sign_extend(af0_raw, 11) as f64) * (2.0_f64).powi(-20);
				let af1:f64       = (sword_read(words[9], 9, 19)? as f64) * (2.0_f64).powi(-38);
				Page::AlmanacData(Almanac{ e, t_oa, inclination: delta_i + ALMANAC_I0, omega_dot, sv_health,
					sqrt_a, omega0, omega, m0, af0, af1 })
			},
			// Pages 25 and the special-message pages aren't modeled
			_ => Page::NotDecoded,
		};
		Ok(Body{ data_id, sv_id, page })
	}

}
