use std::time::Instant;

/// Lifecycle of a switcher session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Disconnected,
	Handshaking,
	/// The device is streaming the initial state dump.
	Initializing,
	Ready,
}

/// Session identity and liveness tracking, owned exclusively by the
/// Transport Layer.
#[derive(Debug)]
pub struct Session {
	pub phase: Phase,
	pub session_id: Option<u16>,
	pub last_received: Option<Instant>,
	pub local_sequence: u16,
}

impl Default for Session {
	fn default() -> Self {
		Self { phase: Phase::Disconnected, session_id: None, last_received: None, local_sequence: 0 }
	}
}

impl Session {
	/// Local sequence numbers start at 1 after the handshake completes.
	pub fn reset_for_handshake(&mut self) {
		self.phase = Phase::Handshaking;
		self.session_id = None;
		self.local_sequence = 0;
	}

	pub fn next_sequence(&mut self) -> u16 {
		self.local_sequence = self.local_sequence.wrapping_add(1);
		self.local_sequence
	}

	pub fn touch(&mut self) {
		self.last_received = Some(Instant::now());
	}

	pub fn silence(&self) -> Option<std::time::Duration> {
		self.last_received.map(|t| t.elapsed())
	}
}
