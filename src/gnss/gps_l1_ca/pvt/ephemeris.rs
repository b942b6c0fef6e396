
use std::f64::consts;

use serde::{Serialize, Deserialize};

use crate::gnss::gps_l1_ca::telemetry_decode::subframe::{subframe1, subframe2, subframe3};

pub const MU:f64 = 3.986005e14;              // [m^3/s^2] WGS-84 value of the earth's gravitational constant
pub const F:f64 = -4.442807633e-10;			 // [sec/root-meter]

// IS-GPS-200 calls this OMEGA_DOT_E, but it's an angular velocity
pub const OMEGA_E:f64 = 7.2921151467e-5;     // [rad/s] WGS-84 value of the earth's rotation rate

pub const HALF_WEEK_SEC:f64 = 302400.0;
pub const WEEK_SEC:f64 = 604800.0;

const KEPLER_ITERATIONS:usize = 10;
const CLOCK_ITERATIONS:usize = 2;

/// Clock and orbit parameters from subframes 1 through 3.  Angles are kept in semicircles, as
/// broadcast, and converted to radians where they're used.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct Ephemeris {
	pub week_number:u16, pub t_gd:f64,	  pub aodo: u16,   pub fit_interval:bool,
	pub t_oc: f64,       pub a_f0: f64,   pub a_f1: f64,   pub a_f2: f64,
	pub t_oe: f64,       pub sqrt_a: f64, pub dn: f64,     pub m0: f64,
	pub e: f64,          pub omega: f64,  pub omega0: f64, pub omega_dot: f64,
	pub cus: f64,        pub cuc: f64,    pub crs: f64,    pub crc: f64,
	pub cis: f64,        pub cic: f64,    pub i0: f64,     pub idot: f64,
	pub iodc: u16,       pub iode: u8,
}

/// Solves Kepler's equation, E - e*sin(E) = M, by Newton-Raphson starting from E = M
pub fn eccentric_anomaly(m:f64, e:f64) -> f64 {
	let mut ek:f64 = m;
	for _ in 0..KEPLER_ITERATIONS {
		ek = ek - (ek - e*ek.sin() - m)/(1.0 - e*ek.cos());
	}
	ek
}

impl Ephemeris {

	pub fn from_subframes(sf1:&subframe1::Body, sf2:&subframe2::Body, sf3:&subframe3::Body) -> Self {
		Self {
			week_number: sf1.week_number, t_gd: sf1.t_gd, aodo: sf2.aodo, fit_interval: sf2.fit_interval,
			t_oc: sf1.t_oc, a_f0: sf1.a_f0, a_f1: sf1.a_f1, a_f2: sf1.a_f2,
			t_oe: sf2.t_oe, sqrt_a: sf2.sqrt_a, dn: sf2.dn, m0: sf2.m0,
			e: sf2.e, omega: sf3.omega, omega0: sf3.omega0, omega_dot: sf3.omega_dot,
			cus: sf2.cus, cuc: sf2.cuc, crs: sf2.crs, crc: sf3.crc,
			cis: sf3.cis, cic: sf3.cic, i0: sf3.i0, idot: sf3.idot,
			iodc: sf1.iodc, iode: sf2.iode,
		}
	}

	/// Time from ephemeris reference epoch, accounting for beginning or end of week crossovers
	pub fn t_k(&self, t:f64) -> f64 {
		let tk = t - self.t_oe;
		if      tk >  HALF_WEEK_SEC { tk - WEEK_SEC }
		else if tk < -HALF_WEEK_SEC { tk + WEEK_SEC }
		else                        { tk }
	}

	pub fn eccentric_anomaly(&self, t:f64) -> f64 {
		let a:f64 = self.sqrt_a.powi(2);
		let n0:f64 = (MU / a.powi(3)).sqrt();
		let n:f64 = n0 + (self.dn * consts::PI);
		let mk:f64 = (self.m0 * consts::PI) + n*self.t_k(t);
		eccentric_anomaly(mk, self.e)
	}

	/// Correction between SV time and GPS system time, including the relativistic term and group delay
	pub fn dt_sv(&self, t:f64) -> f64 {
		let dt_r:f64 = F * self.e * self.sqrt_a * self.eccentric_anomaly(t).sin();
		let dt:f64 = t - self.t_oc;
		self.a_f0 + self.a_f1*dt + self.a_f2*dt.powi(2) + dt_r - self.t_gd
	}

	/// GPS system time of transmission for the subframe whose HOW carried `time_of_week_truncated`
	pub fn gps_time(&self, time_of_week_truncated:u32) -> f64 {
		let t_sv:f64 = (time_of_week_truncated as f64) * 6.0;
		let mut delta:f64 = 0.0;
		for _ in 0..CLOCK_ITERATIONS {
			delta = self.dt_sv(t_sv - delta);
		}
		t_sv - delta
	}

	/// ECEF satellite position [m] at GPS time `t`, IS-GPS-200 Table 20-IV
	pub fn position(&self, t:f64) -> (f64, f64, f64) {
		let a:f64 = self.sqrt_a.powi(2);
		let tk:f64 = self.t_k(t);
		let ek:f64 = self.eccentric_anomaly(t);

		let nu_k:f64 = {
			let y:f64 = ((1.0 - self.e.powi(2)).sqrt() * ek.sin()) / (1.0 - (self.e*ek.cos()));
			let x:f64 = (ek.cos() - self.e) / (1.0 - (self.e*ek.cos()));
			y.atan2(x)
		};

		// Argument of latitude and second harmonic perturbations
		let phi_k:f64 = nu_k + (self.omega * consts::PI);
		let du_k:f64 = self.cus*(2.0*phi_k).sin() + self.cuc*(2.0*phi_k).cos();
		let dr_k:f64 = self.crs*(2.0*phi_k).sin() + self.crc*(2.0*phi_k).cos();
		let di_k:f64 = self.cis*(2.0*phi_k).sin() + self.cic*(2.0*phi_k).cos();

		let u_k:f64 = phi_k + du_k;
		let r_k:f64 = a*(1.0 - self.e*ek.cos()) + dr_k;
		let i_k:f64 = (self.i0 * consts::PI) + di_k + (self.idot * consts::PI)*tk;

		// Position in the orbital plane
		let x_kp:f64 = r_k * u_k.cos();
		let y_kp:f64 = r_k * u_k.sin();

		// Corrected longitude of ascending node
		let omega_k:f64 = (self.omega0 * consts::PI) + ((self.omega_dot * consts::PI) - OMEGA_E)*tk - OMEGA_E*self.t_oe;

		let x_k:f64 = (x_kp * omega_k.cos()) - (y_kp * i_k.cos() * omega_k.sin());
		let y_k:f64 = (x_kp * omega_k.sin()) + (y_kp * i_k.cos() * omega_k.cos());
		let z_k:f64 = y_kp * i_k.sin();

		(x_k, y_k, z_k)
	}

}

#[cfg(test)]
mod tests {

	use super::*;
	use rstest::rstest;

	fn circular_equatorial(sqrt_a:f64) -> Ephemeris {
		Ephemeris {
			week_number: 0, t_gd: 0.0, aodo: 0, fit_interval: false,
			t_oc: 0.0, a_f0: 0.0, a_f1: 0.0, a_f2: 0.0,
			t_oe: 0.0, sqrt_a, dn: 0.0, m0: 0.0,
			e: 0.0, omega: 0.0, omega0: 0.0, omega_dot: 0.0,
			cus: 0.0, cuc: 0.0, crs: 0.0, crc: 0.0,
			cis: 0.0, cic: 0.0, i0: 0.0, idot: 0.0,
			iodc: 0, iode: 0,
		}
	}

	#[rstest]
	#[case(0.0)]
	#[case(1.234)]
	#[case(-2.9)]
	#[case(std::f64::consts::PI)]
	fn kepler_circular_is_identity(#[case] m:f64) {
		assert_eq!(eccentric_anomaly(m, 0.0), m);
	}

	#[rstest]
	#[case(0.3, 0.001)]
	#[case(-1.7, 0.01)]
	#[case(2.5, 0.02)]
	#[case(6.0, 0.0049)]
	fn kepler_small_eccentricity(#[case] m:f64, #[case] e:f64) {
		let ek = eccentric_anomaly(m, e);
		assert!((ek - e*ek.sin() - m).abs() < 1.0e-10);
	}

	#[test]
	fn t_k_wraps_at_half_week() {
		let mut eph = circular_equatorial(5153.6);
		eph.t_oe = 590_400.0;
		assert_eq!(eph.t_k(590_500.0), 100.0);
		assert_eq!(eph.t_k(3600.0), 3600.0 + WEEK_SEC - 590_400.0);
		eph.t_oe = 7200.0;
		assert_eq!(eph.t_k(604_000.0), 604_000.0 - 7200.0 - WEEK_SEC);
	}

	#[test]
	fn circular_equatorial_orbit() {
		let eph = circular_equatorial(5153.6);
		let a = 5153.6_f64.powi(2);

		let (x, y, z) = eph.position(0.0);
		assert!((x - a).abs() < 1.0e-6 && y.abs() < 1.0e-6 && z.abs() < 1.0e-6);

		// A quarter of an orbit later the satellite has moved 90 deg while the earth turned under it
		let t = 0.5 * consts::PI / (MU / a.powi(3)).sqrt();
		let omega_k = -OMEGA_E * t;
		let (x, y, z) = eph.position(t);
		assert!((x + a*omega_k.sin()).abs() < 1.0e-3);
		assert!((y - a*omega_k.cos()).abs() < 1.0e-3);
		assert!(z.abs() < 1.0e-6);
		assert!(((x*x + y*y).sqrt() - a).abs() < 1.0e-3);
	}

	#[test]
	fn clock_correction() {
		let mut eph = circular_equatorial(5153.6);
		eph.a_f0 = 1.0e-4;
		eph.t_gd = 4.0e-9;
		let t = eph.gps_time(1000);
		assert!((t - (6000.0 - 1.0e-4 + 4.0e-9)).abs() < 1.0e-9);

		// Drift term evaluated relative to t_oc
		eph.a_f1 = 1.0e-11;
		eph.t_oc = 5000.0;
		let t = eph.gps_time(1000);
		let expected = 6000.0 - (1.0e-4 + 1.0e-11*(6000.0 - 1.0e-4 - 5000.0) - 4.0e-9);
		assert!((t - expected).abs() < 1.0e-9);
	}

}
