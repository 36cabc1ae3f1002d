use thiserror::Error;

/// The error taxonomy for the switcher client.
///
/// Lower layers only ever produce `NetworkFailure` or `ProtocolViolation`;
/// they never surface raw I/O errors directly to callers of [`crate::SwitcherClient`].
#[derive(Debug, Error)]
pub enum Error {
	/// Sending or receiving on the socket failed, or the socket could not be opened.
	#[error("network failure: {0}")]
	NetworkFailure(#[from] std::io::Error),

	/// A malformed packet, a bad handshake reply, or an otherwise inconsistent
	/// wire value. Invalidates the session; recovered by re-handshaking.
	#[error("protocol violation: {0}")]
	ProtocolViolation(String),

	/// No acknowledgement arrived within the command window.
	#[error("command timed out waiting for acknowledgement")]
	CommandTimeout,

	/// An argument supplied by the caller is out of range.
	#[error("invalid argument: {0}")]
	CallerError(String),
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
