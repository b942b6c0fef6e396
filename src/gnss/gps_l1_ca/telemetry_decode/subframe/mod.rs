
use serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::utils::bit_fields::{word_read, bit};

pub mod subframe1;
pub mod subframe2;
pub mod subframe3;
pub mod subframe5;

/// Telemetry and handover words common to every subframe
#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct TlmHow {
	pub tlm_message:u16,
	pub integrity_status:bool,
	pub time_of_week_truncated:u32,
	pub alert:bool,
	pub anti_spoof:bool,
	/// Receiver sample index at which the last bit of the subframe was processed
	pub sample_idx:usize,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Subframe {
	pub subframe_id:u8,
	pub tlm_how:TlmHow,
	pub body:SubframeBody,
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone)]
pub enum SubframeBody {
	Subframe1(subframe1::Body),
	Subframe2(subframe2::Body),
	Subframe3(subframe3::Body),
	Subframe4,
	Subframe5(subframe5::Body),
}

/// Decodes a subframe from its ten parity-checked words, data bits in bits 1 through 24
pub fn decode(words:&[u32; 10], sample_idx:usize) -> Result<Subframe, DigSigProcErr> {
	let subframe_id:u8 = word_read(words[1], 20, 22)? as u8;

	let tlm_how = TlmHow {
		tlm_message:            word_read(words[0], 9, 22)? as u16,
		integrity_status:       bit(words[0], 23)?,
		time_of_week_truncated: word_read(words[1], 1, 17)?,
		alert:                  bit(words[1], 18)?,
		anti_spoof:             bit(words[1], 19)?,
		sample_idx,
	};

	let body = match subframe_id {
		1 => SubframeBody::Subframe1(subframe1::Body::new(words)?),
		2 => SubframeBody::Subframe2(subframe2::Body::new(words)?),
		3 => SubframeBody::Subframe3(subframe3::Body::new(words)?),
		4 => SubframeBody::Subframe4,
		5 => SubframeBody::Subframe5(subframe5::Body::new(words)?),
		_ => return Err(DigSigProcErr::InvalidTelemetryData("Subframe number other than 1 through 5")),
	};

	Ok(Subframe{ subframe_id, tlm_how, body })
}
