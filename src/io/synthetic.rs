
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rustfft::num_complex::Complex;
use serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::nco::Oscillator;
use crate::gnss::gps_l1_ca::{self, CODE_LENGTH, PERIODS_PER_BIT};
use crate::gnss::gps_l1_ca::signal_modulation;
use crate::gnss::gps_l1_ca::telemetry_decode::{self, PREAMBLE, BITS_PER_WORD, WORDS_PER_SUBFRAME, SUBFRAMES_PER_FRAME};
use crate::utils::bit_fields::word_write;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSignalConfig {
	pub prn:usize,
	/// Carrier offset at the start of the ramp [Hz]
	pub freq_hz:f64,
	/// Chips the code is advanced by before the first sample
	pub advance_chips:usize,
	/// Peak of the triangular frequency ramp above `freq_hz` [Hz]
	pub ramp_hz:f64,
	/// Duration of each leg of the ramp [sec]; zero disables the ramp
	pub ramp_sec:f64,
	pub amplitude:f64,
	/// Standard deviation of the Gaussian noise on each of I and Q
	pub noise_std:f64,
	pub seed:u64,
}

impl Default for TestSignalConfig {
	fn default() -> Self {
		Self {
			prn: 32,
			freq_hz: 0.0,
			advance_chips: CODE_LENGTH - 10,
			ramp_hz: 40.0,
			ramp_sec: 20.0,
			amplitude: 0.00015,
			noise_std: 0.001,
			seed: 0,
		}
	}
}

/// Baseband signal of one satellite: C/A code, optional navigation bits, carrier offset with a
/// triangular frequency ramp, and additive Gaussian noise
pub struct TestSignal {
	osc:Oscillator,
	chips:Vec<i8>,
	chip_idx:usize,
	samples_per_chip:usize,
	sample_in_chip:usize,
	chip_value:f64,
	periods:usize,
	freq_hz:f64,
	ramp_hz:f64,
	samples_per_ramp:usize,
	ramp_idx:usize,
	ramp_up:bool,
	amplitude:f64,
	bits:Vec<bool>,
	nav_end_idx:usize,
	rng:StdRng,
	noise:Normal<f64>,
	idx:usize,
}

impl TestSignal {

	pub fn new(fs:f64, config:&TestSignalConfig) -> Result<Self, DigSigProcErr> {
		let samples_per_chip = gps_l1_ca::samples_per_chip(fs)?;
		let chips = signal_modulation::ca_code(config.prn)?;
		if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
			return Err(DigSigProcErr::InvalidConfiguration("Noise standard deviation must be finite and non-negative"));
		}
		let noise = Normal::new(0.0, config.noise_std)
			.map_err(|_| DigSigProcErr::InvalidConfiguration("Noise standard deviation must be finite and non-negative"))?;

		let mut osc = Oscillator::new(fs);
		osc.set_frequency(config.freq_hz);

		Ok(Self {
			osc, chips, samples_per_chip, noise,
			chip_idx: config.advance_chips % CODE_LENGTH,
			sample_in_chip: 0,
			chip_value: 0.0,
			periods: 0,
			freq_hz: config.freq_hz,
			ramp_hz: config.ramp_hz,
			samples_per_ramp: (fs * config.ramp_sec).round() as usize,
			ramp_idx: 0,
			ramp_up: true,
			amplitude: config.amplitude,
			bits: vec![],
			nav_end_idx: 0,
			rng: StdRng::seed_from_u64(config.seed),
			idx: 0,
		})
	}

	/// Modulates the code with `bits` at 50 bit/s, each bit starting on a code epoch.  Logical one is
	/// transmitted as an inverted code; the bits after the last are zeros.
	pub fn with_nav_bits(mut self, bits:Vec<bool>) -> Self {
		let samples_before = (self.periods * CODE_LENGTH + self.chip_idx) * self.samples_per_chip + self.sample_in_chip;
		let samples_total = bits.len() * PERIODS_PER_BIT * CODE_LENGTH * self.samples_per_chip;
		self.nav_end_idx = self.idx + samples_total.saturating_sub(samples_before);
		self.bits = bits;
		self
	}

	/// Index of the first sample after the last navigation bit
	pub fn nav_end_idx(&self) -> usize { self.nav_end_idx }

	fn nav_sign(&self) -> f64 {
		match self.bits.get(self.periods / PERIODS_PER_BIT) {
			Some(true) => -1.0,
			_ => 1.0,
		}
	}

	pub fn evaluate(&mut self) -> Complex<f64> {
		if self.sample_in_chip == 0 {
			self.chip_value = (self.chips[self.chip_idx] as f64) * self.nav_sign();
		}

		if self.samples_per_ramp > 0 {
			let t = (self.ramp_idx as f64) / (self.samples_per_ramp as f64);
			let f = if self.ramp_up { self.freq_hz + self.ramp_hz*t } else { self.freq_hz + self.ramp_hz*(1.0 - t) };
			self.osc.set_frequency(f);
			self.ramp_idx += 1;
			if self.ramp_idx == self.samples_per_ramp {
				self.ramp_idx = 0;
				self.ramp_up = !self.ramp_up;
			}
		}

		let noise = Complex::new(self.noise.sample(&mut self.rng), self.noise.sample(&mut self.rng));
		let ans = (self.osc.evaluate() * self.chip_value * self.amplitude) + noise;

		self.sample_in_chip += 1;
		if self.sample_in_chip == self.samples_per_chip {
			self.sample_in_chip = 0;
			self.chip_idx += 1;
			if self.chip_idx == CODE_LENGTH {
				self.chip_idx = 0;
				self.periods += 1;
			}
		}

		ans
	}

}

impl Iterator for TestSignal {
	type Item = (Complex<f64>, usize);

	fn next(&mut self) -> Option<(Complex<f64>, usize)> {
		let ans = (self.evaluate(), self.idx);
		self.idx += 1;
		Some(ans)
	}
}

/// Parity-encodes consecutive subframes of source data and flattens them into transmitted bits
pub fn subframe_bits(subframes:&[[u32; WORDS_PER_SUBFRAME]]) -> Vec<bool> {
	subframes.iter()
		.flat_map(|data| telemetry_decode::encode_subframe(data).to_vec())
		.flat_map(|word| (0..BITS_PER_WORD).rev().map(move |n| (word >> n) & 1 == 1))
		.collect()
}

fn scaled(value:f64, exponent:i32) -> i64 { (value / (2.0_f64).powi(exponent)).round() as i64 }

fn put(word:&mut u32, first:u32, last:u32, raw:i64) -> Result<(), DigSigProcErr> {
	*word = word_write(*word, first, last, raw as u32)?;
	Ok(())
}

// 32-bit quantity split between bits 17-24 of one word and bits 1-24 of the next
fn put_split(words:&mut [u32; WORDS_PER_SUBFRAME], msb_idx:usize, raw:i64) -> Result<(), DigSigProcErr> {
	put(&mut words[msb_idx], 17, 24, raw >> 24)?;
	put(&mut words[msb_idx + 1], 1, 24, raw)
}

/// Orbit of a synthetic satellite.  Angles in semicircles, `m0` and `omega0` in [-1, 1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyntheticOrbit {
	pub sqrt_a:f64,
	pub e:f64,
	pub i0:f64,
	pub omega0:f64,
	pub m0:f64,
	pub omega_dot:f64,
	pub a_f0:f64,
}

impl Default for SyntheticOrbit {
	fn default() -> Self {
		Self{ sqrt_a: 5153.6, e: 0.01, i0: 0.3, omega0: 0.25, m0: -0.5, omega_dot: -2.6e-9, a_f0: 1.0e-5 }
	}
}

const SYNTHETIC_IODE:i64 = 7;
const SYNTHETIC_TLM_MESSAGE:i64 = 0x1234;

/// Source data words of subframes 1 through 5 for `orbit`, the frame starting at TOW count
/// `tow_truncated`.  Subframe 5 carries almanac page 1 for the same orbit.
pub fn synthetic_frame(tow_truncated:u32, orbit:&SyntheticOrbit) -> Result<[[u32; WORDS_PER_SUBFRAME]; SUBFRAMES_PER_FRAME], DigSigProcErr> {
	let mut frame = [[0u32; WORDS_PER_SUBFRAME]; SUBFRAMES_PER_FRAME];
	let t_oe:i64 = ((tow_truncated as i64) * 6) / 16;

	for (sf_idx, w) in frame.iter_mut().enumerate() {
		let subframe_id = (sf_idx + 1) as i64;
		put(&mut w[0], 1, 8, PREAMBLE as i64)?;
		put(&mut w[0], 9, 22, SYNTHETIC_TLM_MESSAGE)?;
		put(&mut w[1], 1, 17, (tow_truncated as i64) + subframe_id)?;
		put(&mut w[1], 20, 22, subframe_id)?;

		match subframe_id {
			1 => {
				put(&mut w[2], 1, 10, 2100 % 1024)?;
				put(&mut w[2], 11, 12, 1)?;
				put(&mut w[6], 17, 24, scaled(-1.0e-8, -31))?;
				put(&mut w[7], 1, 8, SYNTHETIC_IODE)?;
				put(&mut w[7], 9, 24, t_oe)?;
				put(&mut w[8], 9, 24, scaled(1.0e-12, -43))?;
				put(&mut w[9], 1, 22, scaled(orbit.a_f0, -31))?;
			},
			2 => {
				put(&mut w[2], 1, 8, SYNTHETIC_IODE)?;
				put_split(w, 3, scaled(orbit.m0, -31))?;
				put_split(w, 5, scaled(orbit.e, -33))?;
				put_split(w, 7, scaled(orbit.sqrt_a, -19))?;
				put(&mut w[9], 1, 16, t_oe)?;
			},
			3 => {
				put_split(w, 2, scaled(orbit.omega0, -31))?;
				put_split(w, 4, scaled(orbit.i0, -31))?;
				put(&mut w[8], 1, 24, scaled(orbit.omega_dot, -43))?;
				put(&mut w[9], 1, 8, SYNTHETIC_IODE)?;
			},
			5 => {
				let af0 = scaled(orbit.a_f0, -20);
				put(&mut w[2], 1, 2, 1)?;
				put(&mut w[2], 3, 8, 1)?;
				put(&mut w[2], 9, 24, scaled(orbit.e, -21))?;
				put(&mut w[3], 1, 8, t_oe / 256)?;
				put(&mut w[3], 9, 24, scaled(orbit.i0 - 0.30, -19))?;
				put(&mut w[4], 1, 16, scaled(orbit.omega_dot, -38))?;
				put(&mut w[5], 1, 24, scaled(orbit.sqrt_a, -11))?;
				put(&mut w[6], 1, 24, scaled(orbit.omega0, -23))?;
				put(&mut w[8], 1, 24, scaled(orbit.m0, -23))?;
				put(&mut w[9], 1, 8, af0 >> 3)?;
				put(&mut w[9], 20, 22, af0)?;
			},
			_ => {},
		}
	}

	Ok(frame)
}
