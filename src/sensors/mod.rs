
use std::collections::BTreeMap;

use rustfft::num_complex::Complex;
use serde::{Serialize, Deserialize};

/// Messages pushed to the visualization sink.  Nothing is ever sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorMessage {
	Add(usize),
	Delete(usize),
	/// A batch of prompt correlations from one satellite
	Data(usize, Vec<Complex<f64>>),
	Render,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SatelliteSummary {
	pub prn:usize,
	pub n_prompts:usize,
	/// Mean prompt magnitude over the latest batch
	pub magnitude:f64,
	/// Mean |I| over mean |Q| for the latest batch; large once the carrier phase is locked
	pub iq_ratio:f64,
}

/// Per-satellite prompt statistics, the console stand-in for a constellation display
#[derive(Debug, Default)]
pub struct ConsoleSensors {
	satellites:BTreeMap<usize, SatelliteSummary>,
	renders:usize,
}

impl ConsoleSensors {

	pub fn new() -> Self { Self::default() }

	/// Applies one message; a `Render` returns the summaries to display, in PRN order
	pub fn apply(&mut self, msg:SensorMessage) -> Option<Vec<SatelliteSummary>> {
		match msg {
			SensorMessage::Add(prn) => {
				self.satellites.insert(prn, SatelliteSummary{ prn, ..SatelliteSummary::default() });
			},
			SensorMessage::Delete(prn) => {
				self.satellites.remove(&prn);
			},
			SensorMessage::Data(prn, prompts) => {
				if prompts.is_empty() { return None; }
				let n = prompts.len() as f64;
				let entry = self.satellites.entry(prn).or_insert(SatelliteSummary{ prn, ..SatelliteSummary::default() });
				let abs_i:f64 = prompts.iter().map(|p| p.re.abs()).sum::<f64>() / n;
				let abs_q:f64 = prompts.iter().map(|p| p.im.abs()).sum::<f64>() / n;
				entry.n_prompts += prompts.len();
				entry.magnitude = prompts.iter().map(|p| p.norm()).sum::<f64>() / n;
				entry.iq_ratio = if abs_q > 0.0 { abs_i / abs_q } else { f64::INFINITY };
			},
			SensorMessage::Render => {
				self.renders += 1;
				return Some(self.satellites.values().cloned().collect());
			},
		}
		None
	}

	pub fn renders(&self) -> usize { self.renders }

	pub fn len(&self) -> usize { self.satellites.len() }
	pub fn is_empty(&self) -> bool { self.satellites.is_empty() }

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn tracks_satellites_between_renders() {
		let mut sensors = ConsoleSensors::new();
		assert_eq!(sensors.apply(SensorMessage::Add(12)), None);
		assert_eq!(sensors.apply(SensorMessage::Add(3)), None);
		sensors.apply(SensorMessage::Data(12, vec![Complex::new(4.0, 1.0), Complex::new(-4.0, -1.0)]));

		let summary = sensors.apply(SensorMessage::Render).unwrap();
		assert_eq!(summary.iter().map(|s| s.prn).collect::<Vec<usize>>(), vec![3, 12]);
		assert_eq!(summary[1].n_prompts, 2);
		assert!((summary[1].iq_ratio - 4.0).abs() < 1.0e-12);
		assert!((summary[1].magnitude - 17.0f64.sqrt()).abs() < 1.0e-12);

		sensors.apply(SensorMessage::Delete(3));
		assert_eq!(sensors.len(), 1);
		assert_eq!(sensors.renders(), 1);
	}

	#[test]
	fn empty_batches_are_ignored() {
		let mut sensors = ConsoleSensors::new();
		sensors.apply(SensorMessage::Data(5, vec![]));
		assert!(sensors.is_empty());
	}

}
