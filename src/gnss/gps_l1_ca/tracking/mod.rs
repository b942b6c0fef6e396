
use std::f64::consts;
use std::sync::Arc;

use log::{info, warn};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use serde::{Serialize, Deserialize};

use crate::{DigSigProcErr as DSPErr};
use crate::block::{BlockFunctionality, BlockResult};
use crate::filters::{ScalarFilter, MovingAverage, MovingStats};
use crate::fourier_analysis::{self, Correlator};
use crate::nco::Oscillator;
use crate::gnss::gps_l1_ca::{self, CODE_PERIOD_SEC, N_SATELLITES, PERIODS_PER_BIT};
use crate::gnss::gps_l1_ca::pvt::Fix;
use crate::gnss::gps_l1_ca::signal_modulation::PrnCodes;
use crate::gnss::gps_l1_ca::telemetry_decode::{self, NavMessage, Polarity, BITS_PER_SUBFRAME, WORD_MASK};

// Consecutive periods needed to declare an offset lock, or to declare any lock lost
const OFFSET_LOCK_PERIODS:usize = 10;
const LOSS_PERIODS:usize = 10;

const DPHASE_PERIODS:usize = 20;
const FREQ_AVG_LEN:usize = 5;
const FREQ_LOCK_HZ:f64 = 0.02;

// Costas loop; an error of 1 is a 45 deg phase error, which corrected over one period is 1/8/T Hz
const PLL_STATS_LEN:usize = 5;
const PLL_LOCK_PERIODS:usize = 200;
const COSTAS_FREQ_MAX:f64 = 1.0 / 8.0 / CODE_PERIOD_SEC;
const COSTAS_PHASE_MAX:f64 = consts::FRAC_PI_4;
const COSTAS_FREQ_FACTOR:f64 = 0.0005;
const COSTAS_PHASE_FACTOR:f64 = 0.01;

pub const DEFAULT_PROMPT_BATCH_LEN:usize = 50;

/// One code period of samples, starting at receiver sample `start_idx`
#[derive(Debug, Clone)]
pub struct SampleBlock {
	pub start_idx:usize,
	pub iq:Vec<Complex<f64>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
	OffsetAcquire,
	FrequencyAcquire,
	PllAcquire,
	BitAcquire,
	PreambleAcquire,
	SubframeAcquire,
	SignalLost,
}

#[derive(Debug, Clone)]
pub struct TrackReport {
	pub prn:usize,
	pub state:TrackingState,
	pub fix:Option<Fix>,
	/// Prompt correlations, one per period once the code offset is locked
	pub prompts:Vec<Complex<f64>>,
}

pub struct Tracking {
	pub prn:usize,
	pub fs:f64,
	state:TrackingState,
	codes:Arc<PrnCodes>,
	samples_per_period:usize,
	sample_idx:usize,

	// Carrier wipeoff and correlation
	osc:Oscillator,
	correlator:Correlator,
	rx_buff:Vec<Complex<f64>>,
	spectrum:Vec<Complex<f64>>,
	corr:Vec<Complex<f64>>,
	buffer_idx:usize,

	// Code offset
	offset:i64,
	offset_max:usize,
	offset_range_max:i64,
	n_valid_offsets:usize,
	n_invalid_offsets:usize,

	// Frequency lock
	phase_reset:bool,
	phase_last:f64,
	dphase_sum:f64,
	n_dphase:usize,
	f_offset_avg:MovingAverage,

	// Phase lock
	pll_error_stats:MovingStats,
	n_valid_iq:usize,
	n_invalid_iq:usize,

	// Bit sync and navigation message
	bit_acquire_reset:bool,
	iq_sign_last:f64,
	sign_total:f64,
	n_periods:usize,
	bit_sign:f64,
	preamble_buff:u32,
	subframe_bit_count:usize,
	first_subframe_processed:bool,
	nav:NavMessage,
	subframes_decoded:usize,
	last_subframe_id:Option<u8>,

	// Outputs waiting to be reported
	prompts:Vec<Complex<f64>>,
	prompt_batch_len:usize,
	pending_fix:Option<Fix>,
}

fn wrap_angle(angle:f64) -> f64 {
	if      angle >  consts::PI { angle - 2.0*consts::PI }
	else if angle < -consts::PI { angle + 2.0*consts::PI }
	else                        { angle }
}

impl Tracking {

	/// Tracker for `prn` acquired at a carrier offset of `acq_freq_hz`; `codes` must have been built
	/// for the same sample rate
	pub fn new(prn:usize, acq_freq_hz:f64, fs:f64, codes:Arc<PrnCodes>) -> Result<Self, DSPErr> {
		if prn == 0 || prn > N_SATELLITES {
			return Err(DSPErr::InvalidConfiguration("PRN outside of 1 through 32"));
		}
		let samples_per_chip = gps_l1_ca::samples_per_chip(fs)?;
		let samples_per_period = gps_l1_ca::samples_per_period(fs)?;
		if codes.samples_per_period() != samples_per_period {
			return Err(DSPErr::InvalidConfiguration("Code spectra were built for a different sample rate"));
		}

		let mut osc = Oscillator::new(fs);
		osc.set_frequency(-acq_freq_hz);

		Ok(Self {
			prn, fs, codes, samples_per_period,
			state: TrackingState::OffsetAcquire,
			sample_idx: 0,
			osc,
			correlator: Correlator::new(samples_per_period),
			rx_buff:  vec![Complex::zero(); samples_per_period],
			spectrum: vec![Complex::zero(); samples_per_period],
			corr:     vec![Complex::zero(); samples_per_period],
			buffer_idx: 0,
			offset: 0,
			offset_max: 0,
			offset_range_max: ((samples_per_chip / 4) as i64).max(1),
			n_valid_offsets: 0,
			n_invalid_offsets: 0,
			phase_reset: true,
			phase_last: 0.0,
			dphase_sum: 0.0,
			n_dphase: 0,
			f_offset_avg: MovingAverage::new(FREQ_AVG_LEN),
			pll_error_stats: MovingStats::new(PLL_STATS_LEN),
			n_valid_iq: 0,
			n_invalid_iq: 0,
			bit_acquire_reset: true,
			iq_sign_last: 1.0,
			sign_total: 0.0,
			n_periods: 0,
			bit_sign: 1.0,
			preamble_buff: 0,
			subframe_bit_count: 1,
			first_subframe_processed: false,
			nav: NavMessage::new(),
			subframes_decoded: 0,
			last_subframe_id: None,
			prompts: vec![],
			prompt_batch_len: DEFAULT_PROMPT_BATCH_LEN,
			pending_fix: None,
		})
	}

	pub fn with_prompt_batch_len(mut self, n:usize) -> Self {
		self.prompt_batch_len = n.max(1);
		self
	}

	pub fn state(&self) -> TrackingState { self.state }
	pub fn nav(&self) -> &NavMessage { &self.nav }
	pub fn carrier_freq_hz(&self) -> f64 { -self.osc.frequency() }
	pub fn subframes_decoded(&self) -> usize { self.subframes_decoded }
	pub fn last_subframe_id(&self) -> Option<u8> { self.last_subframe_id }

	fn transition(&mut self, next:TrackingState) {
		if next == TrackingState::SignalLost {
			warn!("PRN {:2}: {:?} -> {:?}", self.prn, self.state, next);
		} else {
			info!("PRN {:2}: {:?} -> {:?}, carrier {:.2} Hz", self.prn, self.state, next, self.carrier_freq_hz());
		}
		self.state = next;
	}

	/// Wipes off the carrier and places one sample in the period buffer, applying the code offset
	/// feedback at the start of each period
	fn evaluate(&mut self, x_in:Complex<f64>) {
		let x = x_in * self.osc.evaluate();

		if self.buffer_idx == 0 {
			if self.offset > 0 {
				self.offset -= 1;
				return;
			} else if self.offset < 0 {
				let n = (-self.offset) as usize;
				let len = self.samples_per_period;
				self.rx_buff.copy_within((len - n)..len, 0);
				self.buffer_idx = n;
				self.offset = 0;
			}
		}

		self.rx_buff[self.buffer_idx] = x;
		self.buffer_idx += 1;
		if self.buffer_idx == self.samples_per_period {
			self.period();
			self.buffer_idx = 0;
		}
	}

	fn period(&mut self) {
		self.spectrum.copy_from_slice(&self.rx_buff);
		self.correlator.transform(&mut self.spectrum);
		self.correlator.correlate(&self.spectrum, self.codes.code_spectrum(self.prn), &mut self.corr);

		let (offset_max, _) = fourier_analysis::peak(&self.corr);
		let n = self.samples_per_period as i64;
		self.offset_max = offset_max;
		self.offset = if (offset_max as i64) > n/2 { (offset_max as i64) - n } else { offset_max as i64 };
		let offset_valid = self.offset.abs() <= self.offset_range_max;

		match self.state {
			TrackingState::SignalLost => {},
			TrackingState::OffsetAcquire => {
				if offset_valid {
					self.n_valid_offsets += 1;
					self.n_invalid_offsets = 0;
				} else {
					self.n_valid_offsets = 0;
					self.n_invalid_offsets += 1;
				}
				if self.n_valid_offsets == OFFSET_LOCK_PERIODS {
					self.transition(TrackingState::FrequencyAcquire);
				} else if self.n_invalid_offsets == LOSS_PERIODS {
					self.transition(TrackingState::SignalLost);
				}
			},
			_ => {
				if !offset_valid {
					self.n_invalid_offsets += 1;
					if self.n_invalid_offsets == LOSS_PERIODS {
						warn!("PRN {:2}: code offset lost, offset={}", self.prn, self.offset);
						self.transition(TrackingState::SignalLost);
					} else {
						self.offset = 0;
						self.offset_max = 0;
					}
					return;
				}
				self.n_invalid_offsets = 0;
				self.prompts.push(self.corr[self.offset_max]);

				if self.state == TrackingState::FrequencyAcquire { self.frequency(); }
				else                                              { self.phase();     }
			},
		}
	}

	fn apply_dphase(&mut self) -> f64 {
		let f_offset = -self.dphase_sum / (2.0 * consts::PI * CODE_PERIOD_SEC * (self.n_dphase as f64));
		self.osc.add_frequency(f_offset);
		self.n_dphase = 0;
		self.dphase_sum = 0.0;
		f_offset
	}

	fn frequency(&mut self) {
		let phase = self.corr[self.offset_max].arg();
		if self.phase_reset {
			self.phase_reset = false;
		} else {
			let dphase = wrap_angle(phase - self.phase_last);
			if dphase.abs() < consts::FRAC_PI_2 {
				self.dphase_sum += dphase;
				self.n_dphase += 1;
				if self.n_dphase == DPHASE_PERIODS {
					let f_offset = self.apply_dphase();
					let avg = self.f_offset_avg.apply(f_offset);
					if avg.abs() < FREQ_LOCK_HZ {
						self.transition(TrackingState::PllAcquire);
					}
				}
			} else if self.n_dphase > 0 {
				// Phase jump, most likely a data bit; use what has been accumulated so far
				self.apply_dphase();
			}
		}
		self.phase_last = phase;
	}

	fn phase(&mut self) {
		let iq = self.corr[self.offset_max];
		let mag2 = iq.norm_sqr();
		let error = if mag2 == 0.0 { 0.0 } else { 2.0*iq.re*iq.im / mag2 };

		if !self.pll_error_stats.push(error) { return; }

		let phi = {
			let phi = iq.arg();
			if      phi >  consts::FRAC_PI_2 { phi - consts::PI }
			else if phi < -consts::FRAC_PI_2 { phi + consts::PI }
			else                             { phi }
		};
		let iq_sign:f64 = if iq.re >= 0.0 { 1.0 } else { -1.0 };
		let valid_iq = phi.abs() < consts::FRAC_PI_4;

		let mean = self.pll_error_stats.mean();
		self.osc.add_frequency(-mean * COSTAS_FREQ_MAX * COSTAS_FREQ_FACTOR);
		self.osc.advance_phase(-mean * COSTAS_PHASE_MAX * COSTAS_PHASE_FACTOR);

		if self.state == TrackingState::PllAcquire {
			if valid_iq {
				self.n_valid_iq += 1;
				if self.n_valid_iq == PLL_LOCK_PERIODS {
					self.transition(TrackingState::BitAcquire);
				}
			} else {
				self.n_valid_iq = 0;
			}
			return;
		}

		if !valid_iq {
			self.n_invalid_iq += 1;
			if self.n_invalid_iq == LOSS_PERIODS {
				warn!("PRN {:2}: too many invalid prompt phases, PLL error std dev {:.3}", self.prn, self.pll_error_stats.std_dev());
				self.transition(TrackingState::SignalLost);
				return;
			}
		} else {
			self.n_invalid_iq = 0;
		}

		if self.state == TrackingState::BitAcquire {
			if self.bit_acquire_reset {
				self.bit_acquire_reset = false;
			} else if iq_sign != self.iq_sign_last {
				self.n_periods = 0;
				self.sign_total = 0.0;
				self.transition(TrackingState::PreambleAcquire);
			}
			self.iq_sign_last = iq_sign;
		} else {
			self.sign_total += iq_sign;
			self.n_periods += 1;
			if self.n_periods == PERIODS_PER_BIT {
				let avg = self.sign_total / (PERIODS_PER_BIT as f64);
				if avg != 0.0 {
					self.register_bit(avg * self.bit_sign > 0.0);
				} else {
					// Not a loss of lock; bit sync starts over
					info!("PRN {:2}: sign total was zero, reacquiring bit sync", self.prn);
					self.transition(TrackingState::BitAcquire);
					self.bit_acquire_reset = true;
					self.first_subframe_processed = false;
				}
				self.n_periods = 0;
				self.sign_total = 0.0;
			}
		}
	}

	fn register_bit(&mut self, b:bool) {
		match self.state {
			TrackingState::PreambleAcquire => {
				self.preamble_buff = ((self.preamble_buff << 1) | (b as u32)) & WORD_MASK;
				if let Some(polarity) = telemetry_decode::tlm_test(self.preamble_buff) {
					if polarity == Polarity::Inverted {
						self.bit_sign = -self.bit_sign;
						self.preamble_buff = !self.preamble_buff & WORD_MASK;
					}
					info!("PRN {:2}: preamble found, {:?}", self.prn, polarity);
					self.nav.start_subframe(self.preamble_buff);
					self.subframe_bit_count = telemetry_decode::BITS_PER_WORD + 1;
					self.transition(TrackingState::SubframeAcquire);
				}
			},
			TrackingState::SubframeAcquire => {
				if let Err(e) = self.nav.set_bit(self.subframe_bit_count, b) {
					warn!("PRN {:2}: {}", self.prn, e);
					self.transition(TrackingState::SignalLost);
					return;
				}
				self.subframe_bit_count += 1;
				if self.subframe_bit_count > BITS_PER_SUBFRAME {
					self.subframe_complete();
					self.subframe_bit_count = 1;
				}
			},
			_ => {},
		}
	}

	fn subframe_complete(&mut self) {
		match self.nav.subframe_decode(self.sample_idx) {
			Ok(sf) => {
				info!("PRN {:2}: decoded subframe {}", self.prn, sf.subframe_id);
				self.subframes_decoded += 1;
				self.last_subframe_id = Some(sf.subframe_id);
				if sf.subframe_id == 1 {
					self.first_subframe_processed = true;
				} else if sf.subframe_id == 5 && self.first_subframe_processed {
					match self.nav.frame_decode().and_then(|_| self.nav.calculate_position(self.prn)) {
						Ok(fix) => {
							info!("PRN {:2}: fix at GPS time {:.6}, sample {}", self.prn, fix.gps_time, fix.sample_idx);
							self.pending_fix = Some(fix);
						},
						Err(e) => warn!("PRN {:2}: frame not decoded, {}", self.prn, e),
					}
				}
			},
			Err(e) => {
				warn!("PRN {:2}: {}", self.prn, e);
				self.transition(TrackingState::SignalLost);
			},
		}
	}

}

impl BlockFunctionality<Arc<SampleBlock>, TrackReport> for Tracking {

	fn apply(&mut self, block:&Arc<SampleBlock>) -> BlockResult<TrackReport> {
		for (i, x) in block.iq.iter().enumerate() {
			self.sample_idx = block.start_idx + i;
			self.evaluate(*x);
			if self.state == TrackingState::SignalLost {
				return BlockResult::Err(DSPErr::LossOfLock);
			}
		}

		if self.pending_fix.is_some() || self.prompts.len() >= self.prompt_batch_len {
			BlockResult::Ready(TrackReport {
				prn: self.prn,
				state: self.state,
				fix: self.pending_fix.take(),
				prompts: std::mem::take(&mut self.prompts),
			})
		} else {
			BlockResult::NotReady
		}
	}

}

#[cfg(test)]
mod tests;
