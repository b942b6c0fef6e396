
use super::*;
use crate::io::synthetic::{TestSignal, TestSignalConfig, SyntheticOrbit, synthetic_frame, subframe_bits};

const FS:f64 = 2.046e6;
const SAMPLES_PER_PERIOD:usize = 2046;

fn codes() -> Arc<PrnCodes> { Arc::new(PrnCodes::new(FS).unwrap()) }

// Feeds `n_periods` one-period blocks, stopping early on an error
fn run(trk:&mut Tracking, sig:&mut TestSignal, n_periods:usize) -> (Vec<TrackReport>, Option<DSPErr>) {
	let mut reports = vec![];
	for k in 0..n_periods {
		let iq:Vec<Complex<f64>> = sig.by_ref().take(SAMPLES_PER_PERIOD).map(|(x, _)| x).collect();
		let block = Arc::new(SampleBlock{ start_idx: k*SAMPLES_PER_PERIOD, iq });
		match trk.apply(&block) {
			BlockResult::Ready(r)  => reports.push(r),
			BlockResult::NotReady  => {},
			BlockResult::Err(e)    => return (reports, Some(e)),
		}
	}
	(reports, None)
}

#[test]
fn tracks_and_decodes_synthetic_satellite() {
	let cfg = TestSignalConfig{ prn: 32, freq_hz: 0.0, advance_chips: 100, ramp_hz: 40.0, ramp_sec: 20.0,
		amplitude: 1.0, noise_std: 0.5, seed: 1 };
	let mut bits = vec![false; 50];
	bits.extend(subframe_bits(&synthetic_frame(1000, &SyntheticOrbit::default()).unwrap()));
	let mut sig = TestSignal::new(FS, &cfg).unwrap().with_nav_bits(bits);

	let mut trk = Tracking::new(32, 0.0, FS, codes()).unwrap();
	let (reports, err) = run(&mut trk, &mut sig, 7200);

	assert_eq!(err, None);
	assert_eq!(trk.state(), TrackingState::SubframeAcquire);
	assert!(trk.subframes_decoded() >= 1);
	let id = trk.last_subframe_id().unwrap();
	assert!((1..=5).contains(&id));

	let sf1 = trk.nav().subframe(1).unwrap();
	assert_eq!(sf1.tlm_how.time_of_week_truncated, 1001);
	assert_eq!(sf1.tlm_how.tlm_message, 0x1234);

	// The ramp has reached 14.4 Hz after 7.2 sec
	assert!((trk.carrier_freq_hz() - 14.4).abs() < 3.0, "carrier {}", trk.carrier_freq_hz());

	assert!(!reports.is_empty());
	assert_eq!(reports[0].prn, 32);
	assert_eq!(reports[0].prompts.len(), DEFAULT_PROMPT_BATCH_LEN);
	assert!(reports.iter().all(|r| r.fix.is_none()));
}

#[test]
fn noise_only_loses_signal() {
	let cfg = TestSignalConfig{ amplitude: 0.0, noise_std: 1.0, seed: 7, ..TestSignalConfig::default() };
	let mut sig = TestSignal::new(FS, &cfg).unwrap();
	let mut trk = Tracking::new(32, 0.0, FS, codes()).unwrap();
	let (_, err) = run(&mut trk, &mut sig, 200);
	assert_eq!(err, Some(DSPErr::LossOfLock));
	assert_eq!(trk.state(), TrackingState::SignalLost);
}

#[test]
fn rejects_bad_configuration() {
	assert!(Tracking::new(0, 0.0, FS, codes()).is_err());
	assert!(Tracking::new(33, 0.0, FS, codes()).is_err());
	assert!(Tracking::new(1, 0.0, 4.092e6, codes()).is_err());
	assert!(Tracking::new(1, 0.0, 2.0e6, codes()).is_err());
}

#[test]
fn angle_wrapping() {
	assert!((wrap_angle(1.5*consts::PI) + 0.5*consts::PI).abs() < 1.0e-12);
	assert!((wrap_angle(-1.5*consts::PI) - 0.5*consts::PI).abs() < 1.0e-12);
	assert_eq!(wrap_angle(0.25), 0.25);
}
