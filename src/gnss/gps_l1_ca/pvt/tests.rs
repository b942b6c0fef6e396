
use super::*;

const FS:f64 = 2.046e6;
const RX_BIAS:f64 = 2.5e-4;
const SAT_RADIUS:f64 = 26_560.0e3;

fn on_sphere(radius:f64, lat_deg:f64, lon_deg:f64) -> Vector3<f64> {
	let (lat, lon) = (lat_deg.to_radians(), lon_deg.to_radians());
	Vector3::new(radius*lat.cos()*lon.cos(), radius*lat.cos()*lon.sin(), radius*lat.sin())
}

fn receiver() -> Vector3<f64> { on_sphere(EARTH_RADIUS_METERS, 37.4, -122.1) }

// Fixes consistent with a receiver at `receiver()` whose clock is off by RX_BIAS
fn fixes() -> Vec<Fix> {
	let sats = [(50.0, -110.0), (20.0, -130.0), (40.0, -150.0), (10.0, -100.0), (30.0, -90.0)];
	sats.iter().enumerate().map(|(k, (lat, lon))| {
		let s = on_sphere(SAT_RADIUS, *lat, *lon);
		let sample_idx = 2_046_000*3 + k*977;
		let gps_time = (sample_idx as f64)/FS - RX_BIAS - (s - receiver()).norm()/C;
		Fix{ prn: k + 1, gps_time, pos_ecef: (s[0], s[1], s[2]), sample_idx }
	}).collect()
}

fn range_to(fix:&Fix) -> f64 {
	(Vector3::new(fix.pos_ecef.0, fix.pos_ecef.1, fix.pos_ecef.2) - receiver()).norm()
}

fn assert_at_receiver(soln:&PositionSolution) {
	let rx = receiver();
	assert!((soln.x - rx[0]).abs() < 1.0e-3, "x={} expected {}", soln.x, rx[0]);
	assert!((soln.y - rx[1]).abs() < 1.0e-3, "y={} expected {}", soln.y, rx[1]);
	assert!((soln.z - rx[2]).abs() < 1.0e-3, "z={} expected {}", soln.z, rx[2]);
	assert!((soln.latitude.to_degrees() - 37.4).abs() < 1.0e-6);
	assert!((soln.longitude.to_degrees() + 122.1).abs() < 1.0e-6);
}

#[test]
fn round_trip() {
	let fixes = fixes();
	let mut tri = Triangulator::new(FS);
	for fix in fixes.iter().take(3) {
		assert!(tri.add(*fix).is_none());
	}

	let soln = tri.add(fixes[3]).unwrap().unwrap();
	assert_at_receiver(&soln);
	assert_eq!(soln.prns, vec![4, 3, 2, 1]);

	// Bias is relative to the newest fix's sample
	let expected_bias = -range_to(&fixes[3]) / C;
	assert!((soln.bias - expected_bias).abs() < 1.0e-12, "bias={} expected {}", soln.bias, expected_bias);
}

#[test]
fn solve_directly() {
	let f = fixes();
	let soln = solve(&[f[0], f[1], f[2], f[3]], FS).unwrap();
	assert_at_receiver(&soln);
	assert!((soln.bias + range_to(&f[0])/C).abs() < 1.0e-12);
	assert!((soln.wgs84.longitude.to_degrees() + 122.1).abs() < 1.0e-6);
}

#[test]
fn re_adding_a_fix_replaces_it() {
	let fixes = fixes();
	let mut tri = Triangulator::new(FS);
	for fix in fixes.iter().take(4) { tri.add(*fix); }
	assert_eq!(tri.len(), 4);

	let soln = tri.add(fixes[1]).unwrap().unwrap();
	assert_eq!(tri.len(), 4);
	assert_eq!(soln.prns, vec![2, 4, 3, 1]);
	assert_at_receiver(&soln);
	assert_eq!(tri.fixes().filter(|f| f.prn == 2).count(), 1);
}

#[test]
fn only_the_newest_four_are_used() {
	let fixes = fixes();
	let mut tri = Triangulator::new(FS);
	for fix in fixes.iter() { tri.add(*fix); }
	assert_eq!(tri.len(), 5);
	let soln = tri.add(fixes[4]).unwrap().unwrap();
	assert_eq!(soln.prns, vec![5, 4, 3, 2]);
	assert_at_receiver(&soln);
}

#[test]
fn times_must_agree() {
	let fixes = fixes();
	let mut tri = Triangulator::new(FS);
	for fix in fixes.iter().take(3) { tri.add(*fix); }
	let late = Fix{ gps_time: fixes[3].gps_time + 1.0, ..fixes[3] };
	assert!(tri.add(late).is_none());
	assert_eq!(tri.len(), 4);
}

#[test]
fn every_pair_of_times_must_agree() {
	let f = fixes();
	let mut tri = Triangulator::new(FS);
	// Both within 0.4 sec of the newest fix but 0.8 sec from each other
	tri.add(Fix{ gps_time: f[0].gps_time - 0.4, ..f[0] });
	tri.add(Fix{ gps_time: f[1].gps_time + 0.4, ..f[1] });
	tri.add(f[2]);
	assert!(tri.add(f[3]).is_none());
	assert_eq!(tri.len(), 4);

	// Once both are replaced the newest four agree again
	tri.add(f[0]);
	let soln = tri.add(f[1]).unwrap().unwrap();
	assert_eq!(soln.prns, vec![2, 1, 4, 3]);
	assert_at_receiver(&soln);
}

#[test]
fn delete_drops_without_solving() {
	let fixes = fixes();
	let mut tri = Triangulator::new(FS);
	for fix in fixes.iter().take(4) {
		tri.apply(&SolverMessage::Add(*fix));
	}
	match tri.apply(&SolverMessage::Delete(2)) {
		BlockResult::NotReady => {},
		_ => panic!("Delete should not produce a solution"),
	}
	assert_eq!(tri.len(), 3);
	assert!(tri.fixes().all(|f| f.prn != 2));

	match tri.apply(&SolverMessage::Add(fixes[1])) {
		BlockResult::Ready(soln) => assert_at_receiver(&soln),
		_ => panic!("Expected a solution"),
	}
}

#[test]
fn coincident_satellites_have_no_solution() {
	let f = fixes();
	let same = [f[0], Fix{ prn: 2, ..f[0] }, Fix{ prn: 3, ..f[0] }, Fix{ prn: 4, ..f[0] }];
	assert!(solve(&same, FS).is_err());
}
