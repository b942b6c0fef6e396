
pub mod acquisition;
pub mod channel;
pub mod pvt;
pub mod receiver;
pub mod signal_modulation;
pub mod telemetry_decode;
pub mod tracking;

pub const N_SATELLITES:usize = 32;

pub const CHIP_RATE_SPS:usize = 1_023_000;
pub const CODE_LENGTH:usize = 1023;

/// One code period, which is also the coherent integration time of every correlation
pub const CODE_PERIOD_SEC:f64 = 1.0e-3;
pub const PERIODS_PER_BIT:usize = 20;

/// Whole samples per chip, or a configuration error if `fs` isn't an integer multiple of the chip rate
pub fn samples_per_chip(fs:f64) -> Result<usize, crate::DigSigProcErr> {
	let fs_int = fs.round() as usize;
	if fs <= 0.0 || (fs - fs_int as f64).abs() > 1.0e-6 || fs_int % CHIP_RATE_SPS != 0 {
		Err(crate::DigSigProcErr::InvalidConfiguration("Sample rate is not an integer multiple of the chip rate, 1.023e6"))
	} else {
		Ok(fs_int / CHIP_RATE_SPS)
	}
}

pub fn samples_per_period(fs:f64) -> Result<usize, crate::DigSigProcErr> {
	Ok(samples_per_chip(fs)? * CODE_LENGTH)
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn sample_rate_must_be_multiple_of_chip_rate() {
		assert_eq!(samples_per_chip(2.046e6), Ok(2));
		assert_eq!(samples_per_period(24.552e6), Ok(24 * 1023));
		assert!(samples_per_chip(2.0e6).is_err());
		assert!(samples_per_chip(0.0).is_err());
	}

}
