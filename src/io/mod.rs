
use std::io::{self, Read, BufReader};

use byteorder::{LittleEndian, ReadBytesExt};
use log::warn;
use rustfft::num_complex::Complex;

pub mod synthetic;

pub const BUFFER_SIZE:usize = 1 << 16;

/// Interleaved little-endian f32 I/Q pairs from a file, FIFO or any other reader, tagged with
/// their sample index.  Iteration ends at end of stream; a trailing partial pair is dropped.
pub struct BufferedSource<R: Read> {
	src:BufReader<R>,
	idx:usize,
}

impl<R: Read> BufferedSource<R> {

	pub fn new(src:R) -> Self {
		Self{ src: BufReader::with_capacity(BUFFER_SIZE, src), idx: 0 }
	}

	fn read_sample(&mut self) -> io::Result<Complex<f64>> {
		let re = self.src.read_f32::<LittleEndian>()?;
		let im = self.src.read_f32::<LittleEndian>()?;
		Ok(Complex{ re: re as f64, im: im as f64 })
	}

}

impl<R: Read> Iterator for BufferedSource<R> {
	type Item = (Complex<f64>, usize);

	fn next(&mut self) -> Option<(Complex<f64>, usize)> {
		match self.read_sample() {
			Ok(x) => {
				let ans = (x, self.idx);
				self.idx += 1;
				Some(ans)
			},
			Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
			Err(e) => {
				warn!("Sample source failed after {} samples: {}", self.idx, e);
				None
			}
		}
	}
}
