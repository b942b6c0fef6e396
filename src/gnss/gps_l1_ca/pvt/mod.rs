
use std::collections::VecDeque;

use log::{debug, info, warn};
use nalgebra::{Matrix4, Vector3, Vector4};
use serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::block::{BlockFunctionality, BlockResult};
use crate::utils::kinematics::{self, PositionWGS84, EARTH_RADIUS_METERS};

pub mod ephemeris;

pub const C:f64 = 2.99792458e8;					 // [m/s] speed of light

pub const FIXES_PER_SOLUTION:usize = 4;
pub const MAX_TIME_SPREAD_SEC:f64 = 0.5;

const MAX_ITER:usize = 20;
const CONVERGENCE_TOL:f64 = 1.0e-8;
const NOISE_FLOOR_TOL:f64 = 1.0e-6;

/// Position of one satellite at the GPS time its signal left it, tied to the receiver sample at
/// which that signal arrived
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Fix {
	pub prn:usize,
	pub gps_time:f64,
	pub pos_ecef:(f64, f64, f64),
	pub sample_idx:usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PositionSolution {
	pub x:f64,
	pub y:f64,
	pub z:f64,
	/// Receiver clock bias [sec] relative to the sample of the first fix used
	pub bias:f64,
	/// Spherical-earth longitude and latitude [rad]
	pub longitude:f64,
	pub latitude:f64,
	pub wgs84:PositionWGS84,
	pub prns:Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub enum SolverMessage {
	Add(Fix),
	Delete(usize),
}

fn initial_guess(sats:&[Vector3<f64>]) -> Vector4<f64> {
	let centroid:Vector3<f64> = sats.iter().fold(Vector3::<f64>::zeros(), |acc, s| acc + s) / (sats.len() as f64);
	let r = centroid.normalize() * EARTH_RADIUS_METERS;
	let bias = -(sats[0] - r).norm() / C;
	Vector4::new(r[0], r[1], r[2], bias)
}

/// Solves for receiver position and clock bias from four fixes, times and sample indices taken
/// relative to `fixes[0]`
pub fn solve(fixes:&[Fix; FIXES_PER_SOLUTION], fs:f64) -> Result<PositionSolution, DigSigProcErr> {
	let sats:Vec<Vector3<f64>> = fixes.iter().map(|f| Vector3::new(f.pos_ecef.0, f.pos_ecef.1, f.pos_ecef.2)).collect();
	let t:Vec<f64> = fixes.iter().map(|f| f.gps_time - fixes[0].gps_time).collect();
	let t_rx:Vec<f64> = fixes.iter().map(|f| ((f.sample_idx as f64) - (fixes[0].sample_idx as f64)) / fs).collect();

	let mut x = initial_guess(&sats);
	let mut last_step = f64::INFINITY;

	for _ in 0..MAX_ITER {
		let pos = Vector3::new(x[0], x[1], x[2]);
		let mut f:Vector4<f64> = Vector4::zeros();
		let mut jac:Matrix4<f64> = Matrix4::zeros();
		for k in 0..FIXES_PER_SOLUTION {
			let d = pos - sats[k];
			let tof = t_rx[k] - x[3] - t[k];
			f[k] = d.norm_squared() - (C*tof).powi(2);
			jac[(k, 0)] = 2.0*d[0];
			jac[(k, 1)] = 2.0*d[1];
			jac[(k, 2)] = 2.0*d[2];
			jac[(k, 3)] = 2.0*C*C*tof;
		}

		let jinv = jac.try_inverse().ok_or(DigSigProcErr::NoSolution("Singular Jacobian"))?;
		let dx = jinv * f;
		x -= dx;
		last_step = dx.amax();
		if last_step < CONVERGENCE_TOL { break; }
	}

	if !(last_step < NOISE_FLOOR_TOL) || x.iter().any(|a| !a.is_finite()) {
		return Err(DigSigProcErr::NoSolution("Newton iteration did not converge"));
	}

	let (longitude, latitude) = kinematics::ecef_to_spherical(x[0], x[1], x[2]);
	Ok(PositionSolution {
		x: x[0], y: x[1], z: x[2], bias: x[3], longitude, latitude,
		wgs84: kinematics::ecef_to_wgs84(x[0], x[1], x[2]),
		prns: fixes.iter().map(|f| f.prn).collect(),
	})
}

/// Holds at most one fix per satellite, newest first, and solves whenever a fix arrives
pub struct Triangulator {
	fs:f64,
	fixes:VecDeque<Fix>,
}

impl Triangulator {

	pub fn new(fs:f64) -> Self { Self{ fs, fixes: VecDeque::new() } }

	pub fn len(&self) -> usize { self.fixes.len() }
	pub fn is_empty(&self) -> bool { self.fixes.is_empty() }

	pub fn fixes(&self) -> impl Iterator<Item=&Fix> { self.fixes.iter() }

	pub fn delete(&mut self, prn:usize) {
		self.fixes.retain(|f| f.prn != prn);
	}

	/// Inserts `fix` at the front, replacing any fix from the same satellite.  Returns `None` when
	/// there are too few fixes or any two of the first four disagree in time.
	pub fn add(&mut self, fix:Fix) -> Option<Result<PositionSolution, DigSigProcErr>> {
		self.delete(fix.prn);
		self.fixes.push_front(fix);
		if self.fixes.len() < FIXES_PER_SOLUTION { return None; }

		let four:[Fix; FIXES_PER_SOLUTION] = [self.fixes[0], self.fixes[1], self.fixes[2], self.fixes[3]];
		if four.iter().any(|a| four.iter().any(|b| (a.gps_time - b.gps_time).abs() > MAX_TIME_SPREAD_SEC)) {
			debug!("Fixes for {:?} span more than {} sec, not solving", four.iter().map(|f| f.prn).collect::<Vec<usize>>(), MAX_TIME_SPREAD_SEC);
			return None;
		}

		Some(solve(&four, self.fs))
	}

}

impl BlockFunctionality<SolverMessage, PositionSolution> for Triangulator {

	fn apply(&mut self, input:&SolverMessage) -> BlockResult<PositionSolution> {
		match input {
			SolverMessage::Add(fix) => match self.add(*fix) {
				Some(Ok(soln)) => {
					info!("Position: lat={:.6} deg, lon={:.6} deg, h={:.1} m, bias={:.9} s, PRNs {:?}",
						soln.wgs84.latitude.to_degrees(), soln.wgs84.longitude.to_degrees(), soln.wgs84.height_above_ellipsoid, soln.bias, soln.prns);
					BlockResult::Ready(soln)
				},
				// Geometry failures skip this solve and keep the solver running
				Some(Err(e)) => {
					warn!("{}", e);
					BlockResult::NotReady
				},
				None => BlockResult::NotReady,
			},
			SolverMessage::Delete(prn) => {
				self.delete(*prn);
				BlockResult::NotReady
			},
		}
	}

}

#[cfg(test)]
mod tests;
