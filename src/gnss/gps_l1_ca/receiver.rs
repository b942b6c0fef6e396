
use std::sync::Arc;

use log::{info, warn};
use rustfft::num_complex::Complex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{DigSigProcErr as DSPErr};
use crate::block::Block;
use crate::config::ReceiverConfig;
use crate::gnss::gps_l1_ca;
use crate::gnss::gps_l1_ca::acquisition::{AcquisitionResult, Search};
use crate::gnss::gps_l1_ca::channel::Channel;
use crate::gnss::gps_l1_ca::pvt::{PositionSolution, SolverMessage, Triangulator};
use crate::gnss::gps_l1_ca::signal_modulation::PrnCodes;
use crate::gnss::gps_l1_ca::tracking::SampleBlock;
use crate::sensors::SensorMessage;

/// Sample dispatcher.  Every sample goes to the acquisition search and, grouped into one-period
/// blocks, to every tracked satellite.  Satellites found by the search get a channel; lost ones
/// are joined and removed from the solver and the sensors.
pub struct GpsReceiver {
	fs:f64,
	samples_per_period:usize,
	iq_batch_len:usize,
	codes:Arc<PrnCodes>,
	search:Search,
	channels:Vec<Channel>,
	solver:Block<SolverMessage>,
	tx_sensors:Option<UnboundedSender<SensorMessage>>,
	rx_solutions:Option<UnboundedReceiver<PositionSolution>>,
	iq:Vec<Complex<f64>>,
	block_start_idx:usize,
	sample_idx:usize,
}

impl GpsReceiver {

	pub fn new(config:&ReceiverConfig, tx_sensors:Option<UnboundedSender<SensorMessage>>) -> Result<Self, DSPErr> {
		let fs = config.sample_rate_sps;
		let samples_per_period = gps_l1_ca::samples_per_period(fs)?;
		let codes = Arc::new(PrnCodes::new(fs)?);
		let search = Search::new(fs, &config.search, codes.clone())?;

		let (tx_solutions, rx_solutions) = mpsc::unbounded_channel();
		let solver = Block::from("triangulator", Triangulator::new(fs), move |soln:PositionSolution| {
			let _ = tx_solutions.send(soln);
		})?;

		info!("Receiver running at {} [samples/sec], {} samples per code period", fs, samples_per_period);

		Ok(Self {
			fs, samples_per_period, codes, search, solver, tx_sensors,
			iq_batch_len: config.iq_batch_len,
			channels: vec![],
			rx_solutions: Some(rx_solutions),
			iq: Vec::with_capacity(samples_per_period),
			block_start_idx: 0,
			sample_idx: 0,
		})
	}

	/// Position solutions as they are computed; can be taken once
	pub fn take_solutions(&mut self) -> Option<UnboundedReceiver<PositionSolution>> { self.rx_solutions.take() }

	pub fn tracked_prns(&self) -> Vec<usize> { self.channels.iter().map(|c| c.prn).collect() }

	pub fn sample_idx(&self) -> usize { self.sample_idx }

	fn notify_sensors(&self, msg:SensorMessage) {
		if let Some(tx) = &self.tx_sensors {
			let _ = tx.send(msg);
		}
	}

	fn dispatch(&mut self) {
		let iq = std::mem::replace(&mut self.iq, Vec::with_capacity(self.samples_per_period));
		let block = Arc::new(SampleBlock{ start_idx: self.block_start_idx, iq });

		let (active, lost):(Vec<Channel>, Vec<Channel>) = self.channels.drain(..).partition(|c| c.is_active());
		self.channels = active;
		for chn in self.channels.iter() {
			chn.send(block.clone());
		}

		for chn in lost {
			let prn = chn.prn;
			if let Err(e) = chn.shutdown() {
				warn!("PRN {:2}: {}", prn, e);
			}
			info!("Removing satellite {} from the list", prn);
			self.solver.send(SolverMessage::Delete(prn));
			self.notify_sensors(SensorMessage::Delete(prn));
		}
	}

	fn select_satellites(&mut self, found:Vec<AcquisitionResult>) {
		for result in found {
			if self.channels.iter().any(|c| c.prn == result.prn) { continue; }

			match Channel::new(result.prn, result.freq_hz, self.fs, self.codes.clone(), self.iq_batch_len,
				self.solver.sender(), self.tx_sensors.clone()) {
				Ok(chn) => {
					info!("Adding satellite {} to the list", result.prn);
					self.channels.push(chn);
					self.notify_sensors(SensorMessage::Add(result.prn));
				},
				Err(e) => warn!("PRN {:2}: unable to start tracking, {}", result.prn, e),
			}
		}
	}

	/// Takes the next sample.  Samples must be given in order with no gaps.
	pub fn evaluate(&mut self, x:Complex<f64>) {
		debug_assert!(!x.re.is_nan() && !x.im.is_nan(), "NaN sample at index {}", self.sample_idx);

		if self.iq.is_empty() {
			self.block_start_idx = self.sample_idx;
		}
		self.iq.push(x);
		if self.iq.len() == self.samples_per_period {
			self.dispatch();
		}

		if let Some(found) = self.search.evaluate(x) {
			self.select_satellites(found);
		}
		self.sample_idx += 1;
	}

	/// Stops every channel, the acquisition search and the solver, in that order
	pub fn shutdown(self) -> Result<(), DSPErr> {
		let GpsReceiver{ channels, search, solver, .. } = self;
		for chn in channels {
			let prn = chn.prn;
			chn.shutdown().map_err(|e| { warn!("PRN {:2}: {}", prn, e); e })?;
		}
		search.shutdown()?;
		solver.shutdown()
	}

}
