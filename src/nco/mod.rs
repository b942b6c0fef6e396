
use std::f64::consts;

use rustfft::num_complex::Complex;

const TWO_PI:f64 = 2.0 * consts::PI;

/// Numerically controlled oscillator producing a unit-magnitude complex exponential.
///
/// Used both to down-convert captured samples during acquisition and as the tunable carrier
/// replica inside each tracking loop.
#[derive(Debug, Clone)]
pub struct Oscillator {
	fs:f64,
	freq_hz:f64,
	theta:f64,
	dtheta:f64,
}

fn wrap_phase(theta:f64) -> f64 {
	let ans = theta.rem_euclid(TWO_PI);
	// rem_euclid can round up to exactly 2π for tiny negative inputs
	if ans >= TWO_PI { 0.0 } else { ans }
}

impl Oscillator {

	pub fn new(fs:f64) -> Self { Self{ fs, freq_hz: 0.0, theta: 0.0, dtheta: 0.0 } }

	/// Returns the current sample, then advances the phase by one sample period
	pub fn evaluate(&mut self) -> Complex<f64> {
		let ans = Complex::from_polar(1.0, self.theta);
		self.theta = wrap_phase(self.theta + self.dtheta);
		ans
	}

	pub fn set_frequency(&mut self, freq_hz:f64) {
		self.freq_hz = freq_hz;
		self.dtheta = TWO_PI * freq_hz / self.fs;
	}

	pub fn add_frequency(&mut self, dfreq_hz:f64) { self.set_frequency(self.freq_hz + dfreq_hz); }

	pub fn advance_phase(&mut self, dtheta:f64) { self.theta = wrap_phase(self.theta + dtheta); }

	pub fn reset(&mut self) { self.theta = 0.0; }

	pub fn frequency(&self) -> f64 { self.freq_hz }
	pub fn phase(&self) -> f64 { self.theta }

}

#[cfg(test)]
mod tests {

	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(1000.0, 2048)]
	#[case(-2500.0, 10_000)]
	#[case(37.5, 1)]
	#[case(0.0, 500)]
	fn phase_advances_by_frequency(#[case] freq_hz:f64, #[case] n:usize) {
		let fs = 2.046e6;
		let mut osc = Oscillator::new(fs);
		osc.set_frequency(freq_hz);
		for _ in 0..n { osc.evaluate(); }

		let expected = wrap_phase(TWO_PI * freq_hz / fs * (n as f64));
		let mut diff = (osc.phase() - expected).abs();
		if diff > consts::PI { diff = TWO_PI - diff; }
		assert!(diff < 1.0e-6, "phase {} expected {}", osc.phase(), expected);
	}

	#[test]
	fn output_has_unit_magnitude() {
		let mut osc = Oscillator::new(4.092e6);
		osc.set_frequency(-6950.0);
		for i in 0..50_000 {
			if i % 1000 == 0 { osc.add_frequency(3.0); }
			let x = osc.evaluate();
			assert!((x.norm() - 1.0).abs() < 1.0e-6);
		}
	}

	#[test]
	fn advance_phase_wraps() {
		let mut osc = Oscillator::new(1.0e6);
		osc.advance_phase(-0.25);
		assert!((osc.phase() - (TWO_PI - 0.25)).abs() < 1.0e-12);
		osc.advance_phase(0.5);
		assert!((osc.phase() - 0.25).abs() < 1.0e-12);
		osc.reset();
		assert_eq!(osc.phase(), 0.0);
	}

	#[test]
	fn add_frequency_accumulates() {
		let mut osc = Oscillator::new(1.0e6);
		osc.set_frequency(-120.0);
		osc.add_frequency(20.0);
		osc.add_frequency(-0.5);
		assert!((osc.frequency() + 100.5).abs() < 1.0e-12);
	}

}
