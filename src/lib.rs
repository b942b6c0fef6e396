
pub mod block;
pub mod config;

pub mod filters;
pub mod fourier_analysis;
pub mod io;
pub mod gnss;
pub mod nco;
pub mod sensors;

pub mod utils;

#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum DigSigProcErr {
	#[error("loss of lock")]
	LossOfLock,
	#[error("invalid telemetry data: {0}")]
	InvalidTelemetryData(&'static str),
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(&'static str),
	#[error("no position solution: {0}")]
	NoSolution(&'static str),
	#[error("{0}")]
	Other(&'static str),
}
