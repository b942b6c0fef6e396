
use log::{debug, info, warn};

use crate::DigSigProcErr;
use crate::gnss::gps_l1_ca::N_SATELLITES;
use crate::gnss::gps_l1_ca::pvt::Fix;
use crate::gnss::gps_l1_ca::pvt::ephemeris::Ephemeris;

pub mod subframe;

use self::subframe::{Subframe, SubframeBody};
use self::subframe::subframe5::{Almanac, Page};

/*	LNAV words are held in the low 30 bits of a u32 with IS-GPS-200 bit 1 (first transmitted) in
	bit 29 and bit 30 in bit 0.  Bits 1-24 are data, 25-30 parity.
*/

pub const PREAMBLE:u32 = 0x8B;
pub const WORD_MASK:u32 = 0x3FFF_FFFF;
pub const DATA_MASK:u32 = 0x3FFF_FFC0;
pub const PARITY_MASK:u32 = 0x3F;

pub const BITS_PER_WORD:usize = 30;
pub const WORDS_PER_SUBFRAME:usize = 10;
pub const BITS_PER_SUBFRAME:usize = 300;
pub const SUBFRAMES_PER_FRAME:usize = 5;

// Solve-for bits 23 and 24
const SOLVE_FOR_MASK:u32 = 0xC0;

// IS-GPS-200 Table 20-XIV, D25 through D30.  Each entry is the set of source data bits d1-d24 that
// enter the equation and whether the equation starts from D29* (true) or D30* (false).
const PARITY_EQUATIONS:[(u32, bool); 6] = [
	(0x3B1F_3480, true),
	(0x1D8F_9A40, false),
	(0x2EC7_CD00, true),
	(0x1763_E680, false),
	(0x2BB1_F340, false),
	(0x0B7A_89C0, true),
];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Word {
	/// Source data bits d1-d24, already un-complemented, in bit positions 1-24
	pub data:u32,
	/// Six parity bits D25-D30, D30 in the least significant bit
	pub parity:u32,
}

/// Recovers the source data of `word` and computes its parity given the previous word's parity bits
/// (only D29* and D30*, the two least significant bits of `prev`, are used)
pub fn word_parity(word:u32, prev:u32) -> Word {
	let d29_star:u32 = (prev >> 1) & 1;
	let d30_star:u32 = prev & 1;
	let data:u32 = if d30_star == 1 { !word & DATA_MASK } else { word & DATA_MASK };

	let parity:u32 = PARITY_EQUATIONS.iter().fold(0, |acc, (mask, from_d29)| {
		let star = if *from_d29 { d29_star } else { d30_star };
		(acc << 1) | (((data & mask).count_ones() + star) & 1)
	});

	Word{ data, parity }
}

pub fn word_validate(word:u32, prev:u32) -> Result<Word, DigSigProcErr> {
	let ans = word_parity(word, prev);
	if ans.parity == (word & PARITY_MASK) { Ok(ans) }
	else { Err(DigSigProcErr::InvalidTelemetryData("Parity check failed")) }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Polarity {
	Upright,
	Inverted,
}

fn is_tlm(word:u32) -> bool {
	(word >> 22) == PREAMBLE && word_validate(word, 0).is_ok()
}

/// Whether `word` is a telemetry word as received, or after inverting every bit
pub fn tlm_test(word:u32) -> Option<Polarity> {
	let word = word & WORD_MASK;
	if      is_tlm(word)               { Some(Polarity::Upright)  }
	else if is_tlm(!word & WORD_MASK)  { Some(Polarity::Inverted) }
	else                               { None }
}

/// Transmitted form of the source data bits in `data`, complemented and parity-encoded as required by
/// the previous transmitted word `prev`
pub fn encode_word(data:u32, prev:u32) -> u32 {
	let tx:u32 = if prev & 1 == 1 { !data & DATA_MASK } else { data & DATA_MASK };
	tx | word_parity(tx, prev).parity
}

/// Encodes ten words of source data into a transmittable subframe.  Bits 23 and 24 of words 2 and 10
/// are overwritten so that D29 and D30 of those words come out zero.
pub fn encode_subframe(data:&[u32; WORDS_PER_SUBFRAME]) -> [u32; WORDS_PER_SUBFRAME] {
	let mut ans = [0u32; WORDS_PER_SUBFRAME];
	let mut prev:u32 = 0;
	for (idx, d) in data.iter().enumerate() {
		let word = if idx == 1 || idx == WORDS_PER_SUBFRAME - 1 {
			(0..4u32).map(|t| encode_word((d & !SOLVE_FOR_MASK) | (t << 6), prev))
				.find(|w| w & 0x3 == 0)
				.unwrap_or_else(|| encode_word(*d, prev))
		} else {
			encode_word(*d, prev)
		};
		ans[idx] = word;
		prev = word;
	}
	ans
}

/// Per-satellite navigation message state: the subframe being received, the latest subframe of each
/// type, and what has been extracted from them
pub struct NavMessage {
	words:[u32; WORDS_PER_SUBFRAME],
	subframes:[Option<Subframe>; SUBFRAMES_PER_FRAME],
	ephemeris:Option<Ephemeris>,
	almanac:[Option<Almanac>; N_SATELLITES],
}

impl Default for NavMessage {
	fn default() -> Self { Self::new() }
}

impl NavMessage {

	pub fn new() -> Self {
		Self{ words: [0; WORDS_PER_SUBFRAME], subframes: [None; SUBFRAMES_PER_FRAME], ephemeris: None, almanac: [None; N_SATELLITES] }
	}

	/// Starts a new subframe with an upright telemetry word
	pub fn start_subframe(&mut self, tlm_word:u32) {
		self.words = [0; WORDS_PER_SUBFRAME];
		self.words[0] = tlm_word & WORD_MASK;
	}

	/// Sets bit `bit_number` (1 through 300) of the subframe being received
	pub fn set_bit(&mut self, bit_number:usize, b:bool) -> Result<(), DigSigProcErr> {
		if bit_number == 0 || bit_number > BITS_PER_SUBFRAME {
			return Err(DigSigProcErr::InvalidTelemetryData("Bit number outside of a subframe"));
		}
		let word_idx = (bit_number - 1) / BITS_PER_WORD;
		let mask:u32 = 1 << (BITS_PER_WORD - 1 - (bit_number - 1) % BITS_PER_WORD);
		if b { self.words[word_idx] |=  mask; }
		else { self.words[word_idx] &= !mask; }
		Ok(())
	}

	/// Parity-checks and decodes the subframe just received, `sample_idx` being the receiver sample
	/// index at which its last bit ended
	pub fn subframe_decode(&mut self, sample_idx:usize) -> Result<Subframe, DigSigProcErr> {
		let mut data = [0u32; WORDS_PER_SUBFRAME];
		let mut prev:u32 = 0;
		for (idx, w) in self.words.iter().enumerate() {
			let word = word_validate(*w, prev)?;
			data[idx] = word.data;
			prev = word.parity;
		}
		if prev & 0x3 != 0 {
			return Err(DigSigProcErr::InvalidTelemetryData("Nonzero D29 or D30 at the end of a subframe"));
		}

		let sf = subframe::decode(&data, sample_idx)?;
		debug!("Subframe {} decoded, TOW={}, sample_idx={}", sf.subframe_id, sf.tlm_how.time_of_week_truncated, sample_idx);
		self.subframes[(sf.subframe_id - 1) as usize] = Some(sf);
		Ok(sf)
	}

	/// Extracts the ephemeris from subframes 1-3 and, if the latest subframe 5 carries one, an almanac page
	pub fn frame_decode(&mut self) -> Result<(), DigSigProcErr> {
		let (sf1, sf2, sf3) = match (self.subframe(1).map(|sf| sf.body), self.subframe(2).map(|sf| sf.body), self.subframe(3).map(|sf| sf.body)) {
			(Some(SubframeBody::Subframe1(sf1)), Some(SubframeBody::Subframe2(sf2)), Some(SubframeBody::Subframe3(sf3))) => (sf1, sf2, sf3),
			_ => return Err(DigSigProcErr::InvalidTelemetryData("Frame decode without subframes 1 through 3")),
		};

		if sf2.iode != sf3.iode || (sf1.iodc & 0xFF) as u8 != sf2.iode {
			warn!("Issue of data mismatch: IODC={}, IODE (subframe 2)={}, IODE (subframe 3)={}", sf1.iodc, sf2.iode, sf3.iode);
		}
		self.ephemeris = Some(Ephemeris::from_subframes(&sf1, &sf2, &sf3));

		if let Some(SubframeBody::Subframe5(sf5)) = self.subframe(5).map(|sf| sf.body) {
			match sf5.page {
				Page::AlmanacData(alm) => {
					let bad = alm.out_of_range_fields();
					if !bad.is_empty() {
						warn!("Almanac for SV {} has out-of-range fields: {:?}", sf5.sv_id, bad);
					}
					self.almanac[(sf5.sv_id - 1) as usize] = Some(alm);
				},
				Page::NotDecoded => info!("Subframe 5 page for SV id {} not decoded", sf5.sv_id),
			}
		}

		Ok(())
	}

	/// Satellite position and GPS time at the end of the latest subframe 5
	pub fn calculate_position(&self, prn:usize) -> Result<Fix, DigSigProcErr> {
		let eph = self.ephemeris.ok_or(DigSigProcErr::InvalidTelemetryData("No ephemeris"))?;
		let sf5 = self.subframe(5).ok_or(DigSigProcErr::InvalidTelemetryData("No subframe 5"))?;

		let gps_time = eph.gps_time(sf5.tlm_how.time_of_week_truncated);
		let pos_ecef = eph.position(gps_time);
		Ok(Fix{ prn, gps_time, pos_ecef, sample_idx: sf5.tlm_how.sample_idx })
	}

	/// Latest decoded subframe with id 1 through 5
	pub fn subframe(&self, id:u8) -> Option<Subframe> {
		match id {
			1..=5 => self.subframes[(id - 1) as usize],
			_ => None,
		}
	}

	pub fn ephemeris(&self) -> Option<Ephemeris> { self.ephemeris }

	pub fn almanac(&self, sv_id:usize) -> Option<Almanac> {
		sv_id.checked_sub(1).and_then(|i| self.almanac.get(i)).and_then(|a| *a)
	}

}
