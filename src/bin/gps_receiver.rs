
use std::error::Error;
use std::fs::File;
use std::time::Duration;

use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use colored::*;
use env_logger::Env;
use log::info;
use rustfft::num_complex::Complex;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use gps_sdr::config::ReceiverConfig;
use gps_sdr::io::BufferedSource;
use gps_sdr::io::synthetic::{self, SyntheticOrbit, TestSignal, TestSignalConfig};
use gps_sdr::gnss::gps_l1_ca::receiver::GpsReceiver;
use gps_sdr::gnss::gps_l1_ca::pvt::PositionSolution;
use gps_sdr::sensors::{ConsoleSensors, SatelliteSummary, SensorMessage};

// Leading zero bits and frames of the synthetic navigation message
const SYNTHETIC_LEAD_BITS:usize = 50;
const SYNTHETIC_FRAMES:u32 = 20;
const SYNTHETIC_TOW:u32 = 1000;

fn print_summary(summary:&[SatelliteSummary]) {
	if summary.is_empty() {
		eprintln!("{}", "No satellites tracked".yellow());
	}
	for s in summary {
		let line = format!("PRN {:2}: {:8} prompts, |P|={:10.3e}, I/Q={:6.2}", s.prn, s.n_prompts, s.magnitude, s.iq_ratio);
		if s.iq_ratio > 3.0 { eprintln!("{}", line.green()); } else { eprintln!("{}", line.cyan()); }
	}
}

fn print_solution(soln:&PositionSolution) {
	eprintln!("{}", format!("Position Fix: {:.5} [deg] lat, {:.5} [deg] lon, {:.1} [m], bias {:.3e} [sec], PRNs {:?}",
		soln.wgs84.latitude.to_degrees(), soln.wgs84.longitude.to_degrees(), soln.wgs84.height_above_ellipsoid,
		soln.bias, soln.prns).green().bold());
}

fn synthetic_source(fs:f64) -> Result<TestSignal, Box<dyn Error>> {
	let orbit = SyntheticOrbit::default();
	let mut bits = vec![false; SYNTHETIC_LEAD_BITS];
	for k in 0..SYNTHETIC_FRAMES {
		bits.extend(synthetic::subframe_bits(&synthetic::synthetic_frame(SYNTHETIC_TOW + 5*k, &orbit)?));
	}
	Ok(TestSignal::new(fs, &TestSignalConfig::default())?.with_nav_bits(bits))
}

fn main() -> Result<(), Box<dyn Error>> {

	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let matches = Command::new("GPS L1 C/A Receiver")
		.version(crate_version!())
		.about("Takes IQ samples centered on 1575.42 MHz and produces a GPS fix")
		.arg(Arg::new("filename")
			.short('f').long("filename")
			.help("Input file or FIFO of interleaved little-endian f32 I/Q pairs")
			.required_unless_present("synthetic"))
		.arg(Arg::new("synthetic")
			.long("synthetic")
			.help("Use a synthetic signal for PRN 32 instead of an input file")
			.action(ArgAction::SetTrue)
			.conflicts_with("filename"))
		.arg(Arg::new("sample_rate_sps")
			.short('s').long("sample_rate_sps")
			.help("Sample rate, an integer multiple of 1.023e6; overrides the configuration file")
			.value_parser(value_parser!(f64)))
		.arg(Arg::new("config")
			.short('c').long("config")
			.help("JSON receiver configuration"))
		.arg(Arg::new("limit")
			.short('n').long("limit")
			.help("Stop after this many samples; a synthetic signal stops after its last navigation bit by default")
			.value_parser(value_parser!(usize)))
		.arg(Arg::new("render_hz")
			.long("render_hz")
			.help("Rate of the console summary")
			.default_value("1.0")
			.value_parser(value_parser!(f64)))
		.get_matches();

	let mut config = match matches.get_one::<String>("config") {
		Some(path) => ReceiverConfig::from_json_file(path)?,
		None => ReceiverConfig::default(),
	};
	if let Some(fs) = matches.get_one::<f64>("sample_rate_sps") {
		config.sample_rate_sps = *fs;
	}
	let mut limit:Option<usize> = matches.get_one::<usize>("limit").copied();
	let render_hz:f64 = matches.get_one::<f64>("render_hz").copied().unwrap_or(1.0).max(1.0e-3);
	let fs = config.sample_rate_sps;

	let source:Box<dyn Iterator<Item=(Complex<f64>, usize)>> = match matches.get_one::<String>("filename") {
		Some(fname) => {
			info!("Decoding {} at {} [samples/sec]", fname, fs);
			Box::new(BufferedSource::new(File::open(fname)?))
		},
		None => {
			let sig = synthetic_source(fs)?;
			let n_samples = limit.unwrap_or(sig.nav_end_idx());
			info!("Generating a synthetic signal at {} [samples/sec], {} samples", fs, n_samples);
			limit = Some(n_samples);
			Box::new(sig)
		}
	};

	let rt = Runtime::new()?;

	// Console sensors, refreshed by a periodic Render
	let (tx_sensors, mut rx_sensors) = mpsc::unbounded_channel::<SensorMessage>();
	let sensors_task = rt.spawn(async move {
		let mut sensors = ConsoleSensors::new();
		while let Some(msg) = rx_sensors.recv().await {
			if let Some(summary) = sensors.apply(msg) {
				print_summary(&summary);
			}
		}
	});
	let tx_render = tx_sensors.clone();
	let render_task = rt.spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / render_hz));
		loop {
			interval.tick().await;
			if tx_render.send(SensorMessage::Render).is_err() { break; }
		}
	});

	let mut receiver = GpsReceiver::new(&config, Some(tx_sensors).filter(|_| config.sensors_enabled))?;

	let mut rx_solutions = receiver.take_solutions().ok_or("Solutions already taken")?;
	let solutions_task = rt.spawn(async move {
		let mut all_solutions:Vec<PositionSolution> = vec![];
		while let Some(soln) = rx_solutions.recv().await {
			print_solution(&soln);
			all_solutions.push(soln);
		}
		all_solutions
	});

	for (x, idx) in source {
		if limit.map_or(false, |n| idx >= n) { break; }
		receiver.evaluate(x);
	}

	info!("Input ended after {} samples", receiver.sample_idx());
	receiver.shutdown()?;
	render_task.abort();

	let all_solutions = rt.block_on(solutions_task)?;
	rt.block_on(sensors_task)?;

	println!("{}", serde_json::to_string_pretty(&all_solutions)?);

	Ok(())
}
