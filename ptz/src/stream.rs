//! Stream Layer: a persistent TCP connection to the camera, reconnected on a
//! fixed interval whenever it drops.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use crate::events::{Bus, SubscriptionId};
use crate::Error;

const RECONNECT_INTERVAL: Duration = Duration::from_secs(3);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const READ_POLL: Duration = Duration::from_millis(500);

struct Shared {
	addr: SocketAddr,
	writer: Mutex<Option<TcpStream>>,
	connected: Bus,
	shutdown: AtomicBool,
}

/// Owns the reconnect-and-read worker thread for one camera. Dropping it
/// stops the worker.
pub struct Stream {
	shared: Arc<Shared>,
	inbound: Receiver<Vec<u8>>,
	worker: Option<JoinHandle<()>>,
}

impl Stream {
	pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, Error> {
		let addr = addr
			.to_socket_addrs()
			.map_err(Error::NetworkFailure)?
			.next()
			.ok_or_else(|| Error::CallerError("no address resolved for camera host".into()))?;

		let (tx, rx) = crossbeam_channel::unbounded();
		let shared = Arc::new(Shared {
			addr,
			writer: Mutex::new(None),
			connected: Bus::default(),
			shutdown: AtomicBool::new(false),
		});

		let worker_shared = Arc::clone(&shared);
		let worker = thread::spawn(move || run(worker_shared, tx));

		Ok(Self { shared, inbound: rx, worker: Some(worker) })
	}

	pub fn subscribe_connected(&self, callback: impl Fn(bool) + Send + 'static) -> SubscriptionId {
		self.shared.connected.subscribe(callback)
	}

	pub fn unsubscribe_connected(&self, id: SubscriptionId) {
		self.shared.connected.unsubscribe(id);
	}

	pub fn is_connected(&self) -> bool {
		self.shared.writer.lock().unwrap().is_some()
	}

	pub fn write(&self, bytes: &[u8]) -> Result<(), Error> {
		let mut guard = self.shared.writer.lock().unwrap();
		match guard.as_mut() {
			Some(stream) => stream.write_all(bytes).map_err(Error::NetworkFailure),
			None => Err(Error::ProtocolViolation("not connected".into())),
		}
	}

	pub fn drain_stale(&self) {
		while self.inbound.try_recv().is_ok() {}
	}

	pub fn recv_timeout(&self, timeout: Duration) -> Result<Vec<u8>, RecvTimeoutError> {
		self.inbound.recv_timeout(timeout)
	}

	/// Forces the current connection closed, which unblocks the read loop and
	/// lets the worker reconnect on its normal schedule. Used by the Command
	/// Layer when a response deviates from the expected ACK/COMPLETION shape.
	pub fn force_reconnect(&self) {
		if let Some(stream) = self.shared.writer.lock().unwrap().as_ref() {
			let _ = stream.shutdown(std::net::Shutdown::Both);
		}
	}
}

impl Drop for Stream {
	fn drop(&mut self) {
		self.shared.shutdown.store(true, Ordering::Relaxed);
		self.force_reconnect();
		if let Some(worker) = self.worker.take() {
			worker.join().ok();
		}
	}
}

fn run(shared: Arc<Shared>, tx: Sender<Vec<u8>>) {
	loop {
		if shared.shutdown.load(Ordering::Relaxed) {
			return;
		}

		match TcpStream::connect_timeout(&shared.addr, CONNECT_TIMEOUT) {
			Ok(stream) => {
				info!("ptz camera connected at {}", shared.addr);

				let write_handle = match stream.try_clone() {
					Ok(handle) => handle,
					Err(err) => {
						warn!("failed to clone ptz camera stream: {err}");
						continue;
					}
				};

				*shared.writer.lock().unwrap() = Some(write_handle);
				shared.connected.dispatch(true);

				read_until_closed(&shared, stream, &tx);

				*shared.writer.lock().unwrap() = None;
				shared.connected.dispatch(false);
			}
			Err(err) => {
				warn!("ptz camera connect to {} failed: {err}", shared.addr);
			}
		}

		if shared.shutdown.load(Ordering::Relaxed) {
			return;
		}
		thread::sleep(RECONNECT_INTERVAL);
	}
}

fn read_until_closed(shared: &Shared, mut stream: TcpStream, tx: &Sender<Vec<u8>>) {
	if let Err(err) = stream.set_read_timeout(Some(READ_POLL)) {
		warn!("failed to set ptz read timeout: {err}");
		return;
	}

	let mut buf = [0u8; 512];
	loop {
		if shared.shutdown.load(Ordering::Relaxed) {
			return;
		}

		match stream.read(&mut buf) {
			Ok(0) => {
				debug!("ptz camera closed the connection");
				return;
			}
			Ok(n) => {
				tx.send(buf[..n].to_vec()).ok();
			}
			Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
			Err(err) => {
				warn!("ptz camera read failed: {err}");
				return;
			}
		}
	}
}
