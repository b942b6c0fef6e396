
use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::gnss::gps_l1_ca::acquisition::SearchConfig;
use crate::gnss::gps_l1_ca::tracking::DEFAULT_PROMPT_BATCH_LEN;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("unable to read configuration: {0}")]
	Io(#[from] std::io::Error),
	#[error("unable to parse configuration: {0}")]
	Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
	/// Must be an integer multiple of 1.023e6
	pub sample_rate_sps:f64,
	pub search:SearchConfig,
	/// Prompt correlations per SensorMessage::Data batch
	pub iq_batch_len:usize,
	pub sensors_enabled:bool,
}

impl Default for ReceiverConfig {
	fn default() -> Self {
		Self {
			sample_rate_sps: 24.552e6,
			search: SearchConfig::default(),
			iq_batch_len: DEFAULT_PROMPT_BATCH_LEN,
			sensors_enabled: true,
		}
	}
}

impl ReceiverConfig {

	pub fn from_json_str(s:&str) -> Result<Self, ConfigError> {
		Ok(serde_json::from_str(s)?)
	}

	pub fn from_json_file<P: AsRef<Path>>(path:P) -> Result<Self, ConfigError> {
		let s = fs::read_to_string(path)?;
		Self::from_json_str(&s)
	}

}
