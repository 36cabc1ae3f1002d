//! Switcher Datagram Layer: owns the UDP socket and the background receive
//! thread. The Transport Layer supplies the delivery queue and the
//! steady-state dispatch callback; this module only knows about bytes.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use log::{debug, trace, warn};

use crate::error::Error;
use crate::packet::{Packet, DEVICE_PORT};

/// Binds an ephemeral local port and connects it to the device's fixed port,
/// so `send`/`recv` don't need to re-specify the peer per call.
pub fn connect(ip: impl ToSocketAddrs) -> Result<Arc<UdpSocket>, Error> {
	let socket = UdpSocket::bind(("0.0.0.0", 0))?;

	let addr = ip
		.to_socket_addrs()?
		.next()
		.map(|a| SocketAddr::new(a.ip(), DEVICE_PORT))
		.ok_or_else(|| Error::ProtocolViolation("could not resolve switcher address".into()))?;

	socket.connect(addr)?;
	Ok(Arc::new(socket))
}

pub fn send(socket: &UdpSocket, packet: &Packet) -> Result<(), Error> {
	let bytes = packet.encode();
	trace!("sending switcher packet: {} bytes, flags={:?}", bytes.len(), packet.flags);
	socket.send(&bytes)?;
	Ok(())
}

/// Spawns the blocking receive thread. Every well-formed packet is pushed
/// (non-blocking) onto `queue` and then handed to `on_packet` exactly once,
/// both from this thread. A malformed header is logged and dropped; the
/// loop exits, without panicking, when the socket is closed out from under
/// it.
pub fn spawn_receiver(socket: Arc<UdpSocket>, queue: Sender<Packet>, on_packet: impl Fn(Packet) + Send + 'static) -> JoinHandle<()> {
	std::thread::Builder::new()
		.name("switcher-datagram-recv".into())
		.spawn(move || receive_loop(socket, queue, on_packet))
		.expect("failed to spawn switcher receive thread")
}

fn receive_loop(socket: Arc<UdpSocket>, queue: Sender<Packet>, on_packet: impl Fn(Packet)) {
	let mut buf = [0u8; 2048];

	loop {
		let n = match socket.recv(&mut buf) {
			Ok(n) => n,
			Err(err) => {
				warn!("switcher socket closed, receive loop exiting: {err}");
				return;
			}
		};

		let packet = match Packet::decode(&buf[..n]) {
			Ok(packet) => packet,
			Err(err) => {
				warn!("dropping malformed switcher packet: {err}");
				continue;
			}
		};

		// During steady state nobody drains the queue (dispatch happens
		// inline via `on_packet`), so a full queue just means stale
		// handshake leftovers that are safe to discard.
		if queue.try_send(packet.clone()).is_err() {
			debug!("switcher delivery queue full, dropping queued copy");
		}

		on_packet(packet);
	}
}
