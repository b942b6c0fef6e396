
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::{DigSigProcErr as DSPErr};

pub enum BlockResult<U> {
	NotReady,
	Ready(U),
	Err(DSPErr)
}

impl<U> BlockResult<U> {

	pub fn ready(self) -> Option<U> {
		match self {
			Self::Ready(u) => Some(u),
			_ => None
		}
	}

}

// A type that implements BlockFunctionality consumes instances of T and produces Ready(U) if an
// output is ready, NotReady if it isn't, or Err(_) if the operation fails and the block is done
pub trait BlockFunctionality<T, U> {

	fn apply(&mut self, input:&T) -> BlockResult<U>;

}

/// Runs a BlockFunctionality on its own thread, fed through an unbounded queue.  Outputs go to a
/// sink closure on the same thread.  The loop ends when the queue is closed or the block returns an
/// error, after which `is_active` reports false.
pub struct Block<T: 'static + Send> {
	name: String,
	tx_input: mpsc::UnboundedSender<T>,
	alive: Arc<AtomicBool>,
	handle: thread::JoinHandle<()>,
}

impl<T: 'static + Send> Block<T> {

	pub fn from<U, B, F>(name:&str, b:B, sink:F) -> Result<Self, DSPErr>
	where
		B: 'static + BlockFunctionality<T, U> + Send,
		F: 'static + FnMut(U) + Send,
	{
		let (tx_input, mut rx_input) = mpsc::unbounded_channel::<T>();
		let alive = Arc::new(AtomicBool::new(true));
		let alive_worker = alive.clone();
		let thread_name = name.to_string();

		let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
			let mut owned_b = b;
			let mut sink = sink;

			'rx: while let Some(t) = rx_input.blocking_recv() {
				match owned_b.apply(&t) {
					BlockResult::Ready(u) => sink(u),
					BlockResult::NotReady => (),
					BlockResult::Err(e)   => {
						warn!("{}: {}", thread_name, e);
						break 'rx;
					}
				}
			}

			drop(rx_input);
			debug!("{}: exiting", thread_name);
			alive_worker.store(false, Ordering::SeqCst);
		}).map_err(|_| DSPErr::Other("Unable to spawn block thread"))?;

		Ok(Block{ name: name.to_string(), tx_input, alive, handle })
	}

	/// Queues an input; false once the block's thread has stopped receiving
	pub fn send(&self, t:T) -> bool { self.tx_input.send(t).is_ok() }

	/// Another handle on the input queue; the block keeps running until every handle is dropped
	pub fn sender(&self) -> mpsc::UnboundedSender<T> { self.tx_input.clone() }

	pub fn is_active(&self) -> bool { self.alive.load(Ordering::SeqCst) }

	/// Closes the queue and waits for the thread to finish what was already queued.  Handles from
	/// `sender` must have been dropped first or this waits for them.
	pub fn shutdown(self) -> Result<(), DSPErr> {
		let Block{ name, tx_input, alive:_, handle } = self;
		drop(tx_input);
		handle.join().map_err(|_| DSPErr::Other("Block thread panicked"))?;
		debug!("{}: shut down", name);
		Ok(())
	}

}

#[cfg(test)]
mod tests {

	use super::*;
	use std::sync::Mutex;
	use std::time::{Duration, Instant};

	// Sums its inputs and reports the sum of every three
	struct Triples { sum:i32, n:usize }

	impl BlockFunctionality<i32, i32> for Triples {
		fn apply(&mut self, input:&i32) -> BlockResult<i32> {
			if *input < 0 { return BlockResult::Err(DSPErr::Other("Negative input")); }
			self.sum += input;
			self.n += 1;
			if self.n % 3 == 0 {
				let ans = self.sum;
				self.sum = 0;
				BlockResult::Ready(ans)
			} else { BlockResult::NotReady }
		}
	}

	#[test]
	fn outputs_reach_the_sink_in_order() {
		let out = Arc::new(Mutex::new(vec![]));
		let out_sink = out.clone();
		let blk = Block::from("triples", Triples{ sum: 0, n: 0 }, move |u| out_sink.lock().unwrap().push(u)).unwrap();
		for x in 1..=7 { assert!(blk.send(x)); }
		blk.shutdown().unwrap();
		assert_eq!(*out.lock().unwrap(), vec![6, 15]);
	}

	#[test]
	fn error_stops_the_block() {
		let blk = Block::from("triples", Triples{ sum: 0, n: 0 }, |_:i32| ()).unwrap();
		assert!(blk.is_active());
		blk.send(-1);

		let start = Instant::now();
		while blk.is_active() && start.elapsed() < Duration::from_secs(5) {
			thread::sleep(Duration::from_millis(1));
		}
		assert!(!blk.is_active());
		assert!(!blk.send(1));
		blk.shutdown().unwrap();
	}

	#[test]
	fn ready_extracts_output() {
		assert_eq!(BlockResult::Ready(3).ready(), Some(3));
		assert_eq!(BlockResult::<i32>::NotReady.ready(), None);
	}

}
