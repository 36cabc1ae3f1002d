use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("network failure: {0}")]
	NetworkFailure(#[from] std::io::Error),

	#[error("protocol violation: {0}")]
	ProtocolViolation(String),

	#[error("command timed out waiting for a response")]
	CommandTimeout,

	#[error("invalid argument: {0}")]
	CallerError(String),
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
