
use std::sync::Arc;

use rustfft::{Fft, FftPlanner};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

/// Circular cross-correlation against precomputed, conjugated reference spectra.
///
/// `transform` takes a time-domain block to the frequency domain in place; `correlate` multiplies
/// a spectrum by a reference spectrum and inverse-transforms the product into `corr`.
/// Outputs are unnormalized, which leaves peak-to-mean ratios and angles unchanged.
pub struct Correlator {
	fft: Arc<dyn Fft<f64>>,
	ifft: Arc<dyn Fft<f64>>,
	scratch: Vec<Complex<f64>>,
}

impl Correlator {

	pub fn new(len:usize) -> Self {
		let mut planner = FftPlanner::new();
		let fft  = planner.plan_fft_forward(len);
		let ifft = planner.plan_fft_inverse(len);
		let scratch_len = fft.get_inplace_scratch_len().max(ifft.get_inplace_scratch_len());
		Self{ fft, ifft, scratch: vec![Complex::zero(); scratch_len] }
	}

	pub fn transform(&mut self, buffer:&mut [Complex<f64>]) {
		self.fft.process_with_scratch(buffer, &mut self.scratch);
	}

	pub fn correlate(&mut self, spectrum:&[Complex<f64>], reference:&[Complex<f64>], corr:&mut [Complex<f64>]) {
		for ((c, s), r) in corr.iter_mut().zip(spectrum.iter()).zip(reference.iter()) {
			*c = s * r;
		}
		self.ifft.process_with_scratch(corr, &mut self.scratch);
	}

}

/// Conjugated spectrum of a real-valued reference, ready to be passed to `Correlator::correlate`
pub fn reference_spectrum(reference:&[f64]) -> Vec<Complex<f64>> {
	let mut buffer:Vec<Complex<f64>> = reference.iter().map(|x| Complex{ re: *x, im: 0.0 }).collect();
	let mut planner = FftPlanner::new();
	let fft = planner.plan_fft_forward(buffer.len());
	fft.process(&mut buffer);
	buffer.into_iter().map(|p| p.conj()).collect()
}

/// Index and magnitude of the largest-magnitude element
pub fn peak(x:&[Complex<f64>]) -> (usize, f64) {
	x.iter().map(|c| c.norm()).enumerate()
		.fold((0, 0.0), |(i_max, v_max), (i, v)| if v > v_max { (i, v) } else { (i_max, v_max) })
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn correlation_peak_tracks_delay() {
		let reference:Vec<f64> = (0..62).map(|i| if (i * 7) % 5 < 2 { 1.0 } else { -1.0 }).collect();
		let spectrum_ref = reference_spectrum(&reference);

		// Delay the reference by 9 samples circularly
		let mut rx:Vec<Complex<f64>> = (0..62).map(|i| Complex{ re: reference[(i + 62 - 9) % 62], im: 0.0 }).collect();
		let mut corr = vec![Complex::zero(); 62];

		let mut correlator = Correlator::new(62);
		correlator.transform(&mut rx);
		correlator.correlate(&rx, &spectrum_ref, &mut corr);

		let (idx, mag) = peak(&corr);
		assert_eq!(idx, 9);
		assert!((mag - 62.0 * 62.0).abs() < 1.0e-6);
	}

}
