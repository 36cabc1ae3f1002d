//! Command Layer: serializes one pan/tilt/zoom/focus/preset operation at a
//! time over the Stream Layer, and validates the device's ACK/COMPLETION
//! reply shape.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use log::warn;

use crate::frame;
use crate::stream::Stream;

const ACK_TIMEOUT: Duration = Duration::from_secs(1);
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(3);
const POLL_STEP: Duration = Duration::from_millis(100);

/// Serializes command execution and optionally suppresses an immediate
/// repeat of the last frame sent, since the device treats re-issuing the
/// same pan/tilt/zoom vector as a no-op refresh.
pub struct CommandLayer {
	last_sent: Mutex<Option<Vec<u8>>>,
}

impl Default for CommandLayer {
	fn default() -> Self {
		Self { last_sent: Mutex::new(None) }
	}
}

impl CommandLayer {
	/// Sends `frame` and blocks until the device's ACK and COMPLETION have
	/// both been observed, or either window lapses. Returns `false` on any
	/// timeout, disconnection, or malformed reply, and forces the Stream
	/// Layer to reconnect before returning.
	pub fn send(&self, stream: &Stream, frame: Vec<u8>) -> bool {
		let mut last_sent = self.last_sent.lock().unwrap();

		if last_sent.as_deref() == Some(frame.as_slice()) {
			return true;
		}

		stream.drain_stale();

		if let Err(err) = stream.write(&frame) {
			warn!("ptz command write failed: {err}");
			stream.force_reconnect();
			return false;
		}

		let mut acc = Vec::new();
		if !collect_pattern(stream, &mut acc, frame::is_ack, ACK_TIMEOUT) {
			warn!("ptz camera did not ACK within the expected window");
			stream.force_reconnect();
			return false;
		}

		if !collect_pattern(stream, &mut acc, frame::is_completion, COMPLETION_TIMEOUT) {
			warn!("ptz camera did not COMPLETE within the expected window");
			stream.force_reconnect();
			return false;
		}

		*last_sent = Some(frame);
		true
	}
}

/// Accumulates bytes from `stream` into `acc`, consuming the leading 3-byte
/// reply once `matches` accepts it. Any bytes already sitting in `acc` ahead
/// of a match (there should be none in practice) are left untouched.
fn collect_pattern(stream: &Stream, acc: &mut Vec<u8>, matches: fn(&[u8]) -> bool, timeout: Duration) -> bool {
	let deadline = Instant::now() + timeout;

	loop {
		if acc.len() >= 3 {
			if matches(&acc[..3]) {
				acc.drain(..3);
				return true;
			}
			return false;
		}

		let remaining = deadline.saturating_duration_since(Instant::now());
		if remaining.is_zero() {
			return false;
		}

		match stream.recv_timeout(remaining.min(POLL_STEP)) {
			Ok(bytes) => acc.extend(bytes),
			Err(RecvTimeoutError::Timeout) => continue,
			Err(RecvTimeoutError::Disconnected) => return false,
		}
	}
}
