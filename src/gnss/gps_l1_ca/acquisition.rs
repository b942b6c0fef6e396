
use std::sync::Arc;
use std::thread;

use log::{info, debug, warn};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use serde::{Serialize, Deserialize};

use crate::{DigSigProcErr as DSPErr};
use crate::fourier_analysis::Correlator;
use crate::nco::Oscillator;
use crate::gnss::gps_l1_ca::{self, N_SATELLITES};
use crate::gnss::gps_l1_ca::signal_modulation::PrnCodes;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
	/// Frequencies from -f_range_hz to +f_range_hz are tried
	pub f_range_hz:f64,
	pub f_step_hz:f64,
	/// Code periods captured and summed noncoherently
	pub n_epochs:usize,
	/// A capture starts at the first sample of every interval this long
	pub sec_per_trigger:f64,
	/// Minimum peak-to-mean ratio for a satellite to be reported
	pub threshold:f64,
}

impl Default for SearchConfig {
	fn default() -> Self {
		Self{ f_range_hz: 7000.0, f_step_hz: 50.0, n_epochs: 10, sec_per_trigger: 10.0, threshold: 3.0 }
	}
}

impl SearchConfig {

	pub fn frequencies(&self) -> Vec<f64> {
		if self.f_step_hz <= 0.0 { return vec![0.0]; }
		let n_freq = (2.0 * self.f_range_hz / self.f_step_hz).round() as usize + 1;
		(0..n_freq).map(|k| -self.f_range_hz + (k as f64)*self.f_step_hz).collect()
	}

}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
	pub prn:usize,
	pub ratio:f64,
	pub freq_hz:f64,
}

/// Searches `buffer` (whole code periods) for every satellite over the configured frequencies.
/// For each satellite the frequency with the largest peak-to-mean ratio of the noncoherently summed
/// correlation magnitude wins; those at or above the threshold are returned in PRN order.
pub fn sweep(buffer:&[Complex<f64>], codes:&PrnCodes, fs:f64, config:&SearchConfig) -> Vec<AcquisitionResult> {
	let len = codes.samples_per_period();
	let n_epochs = buffer.len() / len;
	if n_epochs == 0 { return vec![]; }

	let mut correlator = Correlator::new(len);
	let mut converted:Vec<Complex<f64>> = vec![Complex::zero(); n_epochs*len];
	let mut corr:Vec<Complex<f64>> = vec![Complex::zero(); len];
	let mut corr_acc:Vec<f64> = vec![0.0; len];
	let mut best:Vec<AcquisitionResult> = (1..=N_SATELLITES).map(|prn| AcquisitionResult{ prn, ratio: 0.0, freq_hz: 0.0 }).collect();

	for freq in config.frequencies() {
		let mut osc = Oscillator::new(fs);
		osc.set_frequency(-freq);
		for (c, x) in converted.iter_mut().zip(buffer.iter()) {
			*c = x * osc.evaluate();
		}
		for epoch in converted.chunks_exact_mut(len) {
			correlator.transform(epoch);
		}

		for result in best.iter_mut() {
			corr_acc.iter_mut().for_each(|a| *a = 0.0);
			for epoch in converted.chunks_exact(len) {
				correlator.correlate(epoch, codes.code_spectrum(result.prn), &mut corr);
				for (a, c) in corr_acc.iter_mut().zip(corr.iter()) {
					*a += c.norm();
				}
			}

			let abs_max = corr_acc.iter().cloned().fold(0.0, f64::max);
			let abs_avg = corr_acc.iter().sum::<f64>() / (len as f64);
			if abs_avg > 0.0 && abs_max / abs_avg > result.ratio {
				result.ratio = abs_max / abs_avg;
				result.freq_hz = freq;
			}
		}
	}

	best.into_iter().filter(|r| r.ratio >= config.threshold).collect()
}

/// Periodic background acquisition.  Samples are captured at the start of each trigger interval;
/// once a capture is complete a sweep runs on its own thread and `evaluate` hands its results back
/// on the first sample after it finishes.
pub struct Search {
	fs:f64,
	config:SearchConfig,
	codes:Arc<PrnCodes>,
	samples_per_trigger:usize,
	buff_size:usize,
	trigger_idx:usize,
	rx:Vec<Complex<f64>>,
	receiving:bool,
	scan:Option<thread::JoinHandle<Vec<AcquisitionResult>>>,
}

impl Search {

	pub fn new(fs:f64, config:&SearchConfig, codes:Arc<PrnCodes>) -> Result<Self, DSPErr> {
		let samples_per_period = gps_l1_ca::samples_per_period(fs)?;
		if codes.samples_per_period() != samples_per_period {
			return Err(DSPErr::InvalidConfiguration("Code spectra were built for a different sample rate"));
		}
		if config.n_epochs == 0 {
			return Err(DSPErr::InvalidConfiguration("Acquisition needs at least one epoch"));
		}
		let buff_size = samples_per_period * config.n_epochs;
		let samples_per_trigger = ((fs * config.sec_per_trigger).round() as usize).max(buff_size);

		Ok(Self {
			fs, codes, buff_size, samples_per_trigger,
			config: config.clone(),
			trigger_idx: 0,
			rx: Vec::with_capacity(buff_size),
			receiving: false,
			scan: None,
		})
	}

	pub fn is_scanning(&self) -> bool { self.scan.is_some() }

	/// Waits for a sweep in flight, discarding its results
	pub fn shutdown(self) -> Result<(), DSPErr> {
		match self.scan {
			Some(handle) => handle.join().map(|_| ()).map_err(|_| DSPErr::Other("Acquisition sweep panicked")),
			None => Ok(()),
		}
	}

	fn start_scan(&mut self) {
		let buffer = std::mem::replace(&mut self.rx, Vec::with_capacity(self.buff_size));
		if self.scan.is_some() {
			debug!("Sweep still running, discarding capture");
			return;
		}

		let codes = self.codes.clone();
		let config = self.config.clone();
		let fs = self.fs;
		info!("Starting acquisition sweep over {} frequencies", config.frequencies().len());
		match thread::Builder::new().name("acquisition".to_string()).spawn(move || sweep(&buffer, &codes, fs, &config)) {
			Ok(handle) => self.scan = Some(handle),
			Err(e) => warn!("Unable to start acquisition sweep: {}", e),
		}
	}

	/// Takes one sample; returns the results of a sweep that finished since the last call
	pub fn evaluate(&mut self, x:Complex<f64>) -> Option<Vec<AcquisitionResult>> {
		if self.trigger_idx == 0 {
			self.receiving = true;
			self.rx.clear();
		}
		self.trigger_idx += 1;
		if self.trigger_idx == self.samples_per_trigger {
			self.trigger_idx = 0;
		}

		if self.receiving {
			self.rx.push(x);
			if self.rx.len() == self.buff_size {
				self.receiving = false;
				self.start_scan();
			}
		}

		if self.scan.as_ref().map_or(false, |h| h.is_finished()) {
			let handle = self.scan.take()?;
			match handle.join() {
				Ok(results) => {
					log_results(&results);
					return Some(results);
				},
				Err(_) => warn!("Acquisition sweep panicked"),
			}
		}
		None
	}

}

fn log_results(results:&[AcquisitionResult]) {
	if results.is_empty() {
		info!("Acquisition found no satellites");
	}
	for r in results {
		info!("Satellite:{:2} ratio:{:7.2} freq:{:8.2}", r.prn, r.ratio, r.freq_hz);
	}
}

#[cfg(test)]
mod tests {

	use super::*;
	use std::time::{Duration, Instant};
	use crate::io::synthetic::{TestSignal, TestSignalConfig};

	const FS:f64 = 2.046e6;

	fn signal(prn:usize, freq_hz:f64) -> TestSignal {
		let cfg = TestSignalConfig{ prn, freq_hz, advance_chips: 300, ramp_hz: 0.0, ramp_sec: 0.0,
			amplitude: 0.2, noise_std: 0.5, seed: 11 };
		TestSignal::new(FS, &cfg).unwrap()
	}

	fn narrow() -> SearchConfig {
		SearchConfig{ f_range_hz: 300.0, f_step_hz: 50.0, n_epochs: 10, sec_per_trigger: 1.0, threshold: 3.0 }
	}

	#[test]
	fn frequency_grid() {
		let freqs = SearchConfig::default().frequencies();
		assert_eq!(freqs.len(), 281);
		assert_eq!(freqs[0], -7000.0);
		assert_eq!(freqs[140], 0.0);
		assert_eq!(freqs[280], 7000.0);
		assert_eq!(narrow().frequencies().len(), 13);
	}

	#[test]
	fn sweep_finds_the_only_satellite() {
		let codes = PrnCodes::new(FS).unwrap();
		let buffer:Vec<Complex<f64>> = signal(7, 130.0).take(2046*10).map(|(x, _)| x).collect();

		let results = sweep(&buffer, &codes, FS, &narrow());
		assert_eq!(results.len(), 1, "{:?}", results);
		assert_eq!(results[0].prn, 7);
		assert!(results[0].ratio >= 3.0);
		assert!((results[0].freq_hz - 130.0).abs() <= 50.0, "freq {}", results[0].freq_hz);
	}

	#[test]
	fn background_search_reports_once() {
		let codes = Arc::new(PrnCodes::new(FS).unwrap());
		let mut search = Search::new(FS, &narrow(), codes).unwrap();
		let mut sig = signal(7, -80.0);

		let start = Instant::now();
		let mut found = None;
		for (x, _) in sig.by_ref().take(2046*10) {
			assert!(search.evaluate(x).is_none());
		}
		assert!(search.is_scanning());
		while found.is_none() && start.elapsed() < Duration::from_secs(120) {
			found = sig.by_ref().take(100).filter_map(|(x, _)| search.evaluate(x)).next();
			thread::sleep(Duration::from_millis(1));
		}

		let results = found.unwrap();
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].prn, 7);
		assert!((results[0].freq_hz + 80.0).abs() <= 50.0);
		assert!(!search.is_scanning());
	}

	#[test]
	fn rejects_bad_configuration() {
		let codes = Arc::new(PrnCodes::new(FS).unwrap());
		assert!(Search::new(4.092e6, &SearchConfig::default(), codes.clone()).is_err());
		assert!(Search::new(FS, &SearchConfig{ n_epochs: 0, ..SearchConfig::default() }, codes).is_err());
	}

}
