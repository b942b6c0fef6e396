
use rustfft::num_complex::Complex;

use crate::DigSigProcErr;
use crate::fourier_analysis;
use crate::gnss::gps_l1_ca::{self, CODE_LENGTH, N_SATELLITES};

const REGISTER_MASK:u16 = 0x3FF;
const REGISTER_INIT:u16 = 0x3FF;

// Feedback taps, bit n-1 standing for stage n
const G1_POLY:u16 = 0x204;		// 1 + x^3 + x^10
const G2_POLY:u16 = 0x3A6;		// 1 + x^2 + x^3 + x^6 + x^8 + x^9 + x^10

// G2 phase-select taps for PRN 1 through 32, IS-GPS-200 Table 3-Ia
const PHASE_SELECT:[(u8, u8); N_SATELLITES] = [
	(2, 6), (3, 7), (4, 8), (5, 9), (1, 9), (2, 10), (1, 8), (2, 9),
	(3, 10), (2, 3), (3, 4), (5, 6), (6, 7), (7, 8), (8, 9), (9, 10),
	(1, 4), (2, 5), (3, 6), (4, 7), (5, 8), (6, 9), (1, 3), (4, 6),
	(5, 7), (6, 8), (7, 9), (8, 10), (1, 6), (2, 7), (3, 8), (4, 9),
];

#[derive(Debug, Clone, Copy)]
pub enum OutputTap {
	LastStage,
	PhaseSelect(u8, u8),
}

/// Ten-stage Fibonacci shift register; both C/A generators are instances of this type
#[derive(Debug, Clone)]
pub struct ShiftRegister {
	poly: u16,
	tap: OutputTap,
	reg: u16,
}

impl ShiftRegister {

	pub fn new(poly:u16, tap:OutputTap) -> Self { Self{ poly, tap, reg: REGISTER_INIT } }

	pub fn g1() -> Self { Self::new(G1_POLY, OutputTap::LastStage) }

	pub fn g2(prn:usize) -> Result<Self, DigSigProcErr> {
		match prn.checked_sub(1).and_then(|i| PHASE_SELECT.get(i)) {
			Some((a, b)) => Ok(Self::new(G2_POLY, OutputTap::PhaseSelect(*a, *b))),
			None => Err(DigSigProcErr::InvalidConfiguration("PRN outside of 1 through 32")),
		}
	}

	fn stage(&self, n:u8) -> u8 { ((self.reg >> (n - 1)) & 1) as u8 }

	pub fn read(&self) -> u8 {
		match self.tap {
			OutputTap::LastStage => self.stage(10),
			OutputTap::PhaseSelect(a, b) => self.stage(a) ^ self.stage(b),
		}
	}

	/// Returns the current output, then clocks the register once
	pub fn advance(&mut self) -> u8 {
		let ans = self.read();
		let feedback = ((self.reg & self.poly).count_ones() & 1) as u16;
		self.reg = ((self.reg << 1) | feedback) & REGISTER_MASK;
		ans
	}

}

/// One period of the C/A code for `prn` as +1/-1 chips (a logical one maps to +1)
pub fn ca_code(prn:usize) -> Result<Vec<i8>, DigSigProcErr> {
	let mut g1 = ShiftRegister::g1();
	let mut g2 = ShiftRegister::g2(prn)?;
	Ok((0..CODE_LENGTH).map(|_| if (g1.advance() ^ g2.advance()) == 1 { 1 } else { -1 }).collect())
}

/// One period of the C/A code for `prn` with each chip repeated to fill the samples at `fs`
pub fn ca_code_sampled(prn:usize, fs:f64) -> Result<Vec<f64>, DigSigProcErr> {
	let spc = gps_l1_ca::samples_per_chip(fs)?;
	Ok(ca_code(prn)?.into_iter().flat_map(|c| std::iter::repeat(c as f64).take(spc)).collect())
}

/// Conjugated code spectra for every satellite at one sample rate, computed once and then only read
pub struct PrnCodes {
	samples_per_period: usize,
	spectra: Vec<Vec<Complex<f64>>>,
}

impl PrnCodes {

	pub fn new(fs:f64) -> Result<Self, DigSigProcErr> {
		let samples_per_period = gps_l1_ca::samples_per_period(fs)?;
		let mut spectra = Vec::with_capacity(N_SATELLITES);
		for prn in 1..=N_SATELLITES {
			spectra.push(fourier_analysis::reference_spectrum(&ca_code_sampled(prn, fs)?));
		}
		Ok(Self{ samples_per_period, spectra })
	}

	pub fn samples_per_period(&self) -> usize { self.samples_per_period }

	/// Spectrum for PRN 1 through 32
	pub fn code_spectrum(&self, prn:usize) -> &[Complex<f64>] { &self.spectra[prn - 1] }

}

#[cfg(test)]
mod tests {

	use super::*;
	use rstest::rstest;

	fn first_ten_chips_octal(prn:usize) -> u16 {
		ca_code(prn).unwrap().iter().take(10).fold(0u16, |acc, c| (acc << 1) | if *c > 0 { 1 } else { 0 })
	}

	// First 10 chips in octal, IS-GPS-200 Table 3-Ia
	#[rstest]
	#[case(1, 0o1440)]
	#[case(2, 0o1620)]
	#[case(3, 0o1710)]
	#[case(4, 0o1744)]
	#[case(5, 0o1133)]
	#[case(10, 0o1504)]
	#[case(32, 0o1712)]
	fn matches_published_chips(#[case] prn:usize, #[case] octal:u16) {
		assert_eq!(first_ten_chips_octal(prn), octal);
	}

	#[test]
	fn registers_have_period_1023() {
		for mut reg in vec![ShiftRegister::g1(), ShiftRegister::g2(7).unwrap()] {
			let init = reg.reg;
			let mut n = 0;
			loop {
				reg.advance();
				n += 1;
				if reg.reg == init { break; }
			}
			assert_eq!(n, CODE_LENGTH);
		}
	}

	#[test]
	fn autocorrelation_peaks_only_at_zero_lag() {
		for prn in 1..=N_SATELLITES {
			let code = ca_code(prn).unwrap();
			assert_eq!(code.len(), CODE_LENGTH);
			for lag in 0..CODE_LENGTH {
				let r:i32 = (0..CODE_LENGTH).map(|i| (code[i] as i32) * (code[(i + lag) % CODE_LENGTH] as i32)).sum();
				if lag == 0 { assert_eq!(r, 1023); }
				else        { assert!(r.abs() <= 65, "PRN {} lag {} r {}", prn, lag, r); }
			}
		}
	}

	#[test]
	fn invalid_prn() {
		assert!(ca_code(0).is_err());
		assert!(ca_code(33).is_err());
	}

	#[test]
	fn spectra_have_period_length() {
		let codes = PrnCodes::new(2.046e6).unwrap();
		assert_eq!(codes.samples_per_period(), 2046);
		assert_eq!(codes.code_spectrum(32).len(), 2046);
		// DC bin of a conjugated real spectrum is the sum of the samples
		let dc:f64 = ca_code_sampled(32, 2.046e6).unwrap().iter().sum();
		assert!((codes.code_spectrum(32)[0].re - dc).abs() < 1.0e-9);
	}

}
