use ::serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::utils::bit_fields::{word_read, sword_read, bit, concat};

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
#[allow(non_camel_case_types)]
pub enum CodeOnL2 {
	Reserved,
	P_Code,
	CA_Code,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Body {
	pub week_number:u16,
	pub code_on_l2:CodeOnL2,
	pub l2_p_data_off:bool,
	pub ura_index:u8,
	pub sv_health:u8,
	pub iodc:u16,
	pub t_gd:f64,
	pub t_oc:f64,
	pub a_f2:f64,
	pub a_f1:f64,
	pub a_f0:f64
}

impl Body {

	pub fn new(words:&[u32; 10]) -> Result<Body, DigSigProcErr> {
		let week_number:u16 =  word_read(words[2], 1, 10)? as u16;
		let code_on_l2 = match word_read(words[2], 11, 12)? {
			1 => CodeOnL2::P_Code,
			2 => CodeOnL2::CA_Code,
			_ => CodeOnL2::Reserved,
		};
		let ura_index:u8    =  word_read(words[2], 13, 16)? as u8;
		let sv_health:u8    =  word_read(words[2], 17, 22)? as u8;
		let iodc:u16        =  concat(word_read(words[2], 23, 24)?, word_read(words[7], 1, 8)?, 8) as u16;
		let l2_p_data_off   =  bit(words[3], 1)?;
		let t_gd:f64        = (sword_read(words[6], 17, 24)? as f64) * (2.0_f64).powi(-31);
		let t_oc:f64        = (word_read(words[7], 9, 24)? as f64) * (2.0_f64).powi(4);
		let a_f2:f64        = (sword_read(words[8], 1, 8)? as f64) * (2.0_f64).powi(-55);
		let a_f1:f64        = (sword_read(words[8], 9, 24)? as f64) * (2.0_f64).powi(-43);
		let a_f0:f64        = (sword_read(words[9], 1, 22)? as f64) * (2.0_f64).powi(-31);

		Ok(Body{ week_number, code_on_l2, l2_p_data_off, ura_index, sv_health, iodc, t_gd, t_oc, a_f2, a_f1, a_f0 })
	}

}
