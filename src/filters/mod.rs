
pub trait ScalarFilter {

	fn apply(&mut self, x:f64) -> f64;

}

/// Boxcar average over the last `n` inputs; the window starts out filled with zeros
pub struct MovingAverage { data: Vec<f64>, idx: usize }

impl MovingAverage {

	pub fn new(n:usize) -> Self { Self { data: vec![0.0; n.max(1)], idx: 0 } }

}

impl ScalarFilter for MovingAverage {

	fn apply(&mut self, x:f64) -> f64 {
		self.data[self.idx] = x;
		self.idx = (self.idx + 1) % self.data.len();
		self.data.iter().sum::<f64>() / (self.data.len() as f64)
	}

}

/// Sliding window that reports mean and standard deviation once it has been filled at least once
pub struct MovingStats { data: Vec<f64>, idx: usize, full: bool }

impl MovingStats {

	pub fn new(n:usize) -> Self { Self { data: vec![0.0; n.max(1)], idx: 0, full: false } }

	/// Stores `x` and returns true if the window has been filled at least once
	pub fn push(&mut self, x:f64) -> bool {
		self.data[self.idx] = x;
		self.idx += 1;
		if self.idx == self.data.len() {
			self.idx = 0;
			self.full = true;
		}
		self.full
	}

	pub fn mean(&self) -> f64 { self.data.iter().sum::<f64>() / (self.data.len() as f64) }

	pub fn std_dev(&self) -> f64 {
		let mean = self.mean();
		let var:f64 = self.data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (self.data.len() as f64);
		var.sqrt()
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn moving_average_window() {
		let mut avg = MovingAverage::new(5);
		assert_eq!(avg.apply(5.0), 1.0);
		for _ in 0..4 { avg.apply(5.0); }
		assert_eq!(avg.apply(0.0), 4.0);
		assert_eq!(avg.apply(10.0), 5.0);
	}

	#[test]
	fn moving_stats_fills_once() {
		let mut stats = MovingStats::new(5);
		for x in &[1.0, 2.0, 3.0, 4.0] { assert!(!stats.push(*x)); }
		assert!(stats.push(5.0));
		assert!((stats.mean() - 3.0).abs() < 1.0e-12);
		assert!((stats.std_dev() - 2.0_f64.sqrt()).abs() < 1.0e-12);

		// Stays full from here on
		assert!(stats.push(-1.0));
		assert!((stats.mean() - 2.6).abs() < 1.0e-12);
	}

}
