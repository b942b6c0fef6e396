
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{DigSigProcErr as DSPErr};
use crate::block::Block;
use crate::gnss::gps_l1_ca::pvt::SolverMessage;
use crate::gnss::gps_l1_ca::signal_modulation::PrnCodes;
use crate::gnss::gps_l1_ca::tracking::{SampleBlock, Tracking, TrackReport};
use crate::sensors::SensorMessage;

/// One tracked satellite: a tracking loop with its decoder on its own thread, forwarding fixes to
/// the position solver and prompt batches to the sensors
pub struct Channel {
	pub prn:usize,
	block:Block<Arc<SampleBlock>>,
}

impl Channel {

	pub fn new(prn:usize, acq_freq_hz:f64, fs:f64, codes:Arc<PrnCodes>, iq_batch_len:usize,
		tx_solver:UnboundedSender<SolverMessage>, tx_sensors:Option<UnboundedSender<SensorMessage>>) -> Result<Self, DSPErr> {

		let trk = Tracking::new(prn, acq_freq_hz, fs, codes)?.with_prompt_batch_len(iq_batch_len);
		let sink = move |report:TrackReport| {
			if let Some(fix) = report.fix {
				let _ = tx_solver.send(SolverMessage::Add(fix));
			}
			if let Some(tx) = &tx_sensors {
				if !report.prompts.is_empty() {
					let _ = tx.send(SensorMessage::Data(report.prn, report.prompts));
				}
			}
		};

		let block = Block::from(&format!("PRN {:02}", prn), trk, sink)?;
		Ok(Self{ prn, block })
	}

	pub fn send(&self, samples:Arc<SampleBlock>) -> bool { self.block.send(samples) }

	/// False once the satellite has been lost
	pub fn is_active(&self) -> bool { self.block.is_active() }

	pub fn shutdown(self) -> Result<(), DSPErr> { self.block.shutdown() }

}

#[cfg(test)]
mod tests {

	use super::*;
	use std::thread;
	use std::time::{Duration, Instant};
	use rustfft::num_complex::Complex;
	use tokio::sync::mpsc;
	use crate::io::synthetic::{TestSignal, TestSignalConfig};

	const FS:f64 = 2.046e6;

	fn blocks(cfg:&TestSignalConfig, n:usize) -> Vec<Arc<SampleBlock>> {
		let mut sig = TestSignal::new(FS, cfg).unwrap();
		(0..n).map(|k| {
			let iq:Vec<Complex<f64>> = sig.by_ref().take(2046).map(|(x, _)| x).collect();
			Arc::new(SampleBlock{ start_idx: k*2046, iq })
		}).collect()
	}

	#[test]
	fn prompts_reach_the_sensors() {
		let (tx_solver, mut rx_solver) = mpsc::unbounded_channel();
		let (tx_sensors, mut rx_sensors) = mpsc::unbounded_channel();
		let codes = Arc::new(PrnCodes::new(FS).unwrap());
		let chn = Channel::new(9, 0.0, FS, codes, 10, tx_solver, Some(tx_sensors)).unwrap();

		let cfg = TestSignalConfig{ prn: 9, ramp_sec: 0.0, amplitude: 1.0, noise_std: 0.1, seed: 3, ..TestSignalConfig::default() };
		for b in blocks(&cfg, 100) { assert!(chn.send(b)); }
		assert!(chn.is_active());
		chn.shutdown().unwrap();

		let mut n_data = 0;
		while let Ok(msg) = rx_sensors.try_recv() {
			match msg {
				SensorMessage::Data(prn, prompts) => {
					assert_eq!(prn, 9);
					assert_eq!(prompts.len(), 10);
					n_data += 1;
				},
				other => panic!("Unexpected {:?}", other),
			}
		}
		assert!(n_data >= 5, "only {} batches", n_data);
		assert!(rx_solver.try_recv().is_err());
	}

	#[test]
	fn lost_satellite_goes_inactive() {
		let (tx_solver, _rx_solver) = mpsc::unbounded_channel();
		let codes = Arc::new(PrnCodes::new(FS).unwrap());
		let chn = Channel::new(4, 0.0, FS, codes, 50, tx_solver, None).unwrap();

		let cfg = TestSignalConfig{ amplitude: 0.0, noise_std: 1.0, seed: 5, ..TestSignalConfig::default() };
		for b in blocks(&cfg, 100) { chn.send(b); }

		let start = Instant::now();
		while chn.is_active() && start.elapsed() < Duration::from_secs(60) {
			thread::sleep(Duration::from_millis(5));
		}
		assert!(!chn.is_active());
		chn.shutdown().unwrap();
	}

}
