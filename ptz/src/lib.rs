//! Byte-framed command/response client for network pan-tilt-zoom cameras:
//! a persistent TCP connection, mutual-exclusion command dispatch, and
//! ACK/COMPLETION validation.

mod client;
mod command;
mod error;
mod events;
mod frame;
mod stream;

pub use client::PtzClient;
pub use error::Error;
pub use events::SubscriptionId;
pub use frame::SpeedLimits;

#[cfg(test)]
mod integration_tests {
	use std::io::{Read, Write};
	use std::net::TcpListener;
	use std::sync::mpsc;
	use std::time::Duration;

	use crate::PtzClient;

	fn mock_device() -> (TcpListener, u16) {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();
		(listener, port)
	}

	/// spec.md §8 scenario 5: pan right at 50% speed, device ACKs then
	/// COMPLETEs, command call returns true.
	#[test]
	fn pan_right_sends_frame_and_returns_true_on_ack_and_completion() {
		let (listener, port) = mock_device();

		let handle = std::thread::spawn(move || {
			let (mut conn, _) = listener.accept().unwrap();
			let mut buf = [0u8; 32];
			let n = conn.read(&mut buf).unwrap();
			assert_eq!(&buf[..n], &[0x81, 0x01, 0x06, 0x01, 0x05, 0x00, 0x02, 0x03, 0xFF]);

			conn.write_all(&[0x90, 0x41, 0xFF]).unwrap();
			conn.write_all(&[0x90, 0x51, 0xFF]).unwrap();
			conn
		});

		let client = PtzClient::with_speed_limits(
			("127.0.0.1", port),
			crate::SpeedLimits { pan_max: 10, ..Default::default() },
		)
		.unwrap();

		let deadline = std::time::Instant::now() + Duration::from_secs(2);
		while std::time::Instant::now() < deadline && !client.is_connected() {
			std::thread::sleep(Duration::from_millis(20));
		}
		assert!(client.is_connected());

		assert!(client.pan_tilt(0.5, 0.0));

		handle.join().unwrap();
	}

	/// spec.md §8 scenario 6: the connection drops mid-session; the client
	/// emits a disconnected event, then reconnects once the device accepts
	/// a new connection again.
	#[test]
	fn reconnects_after_the_connection_drops() {
		let (listener, port) = mock_device();

		let (first_tx, first_rx) = mpsc::channel();
		let handle = std::thread::spawn(move || {
			let (conn, _) = listener.accept().unwrap();
			first_tx.send(()).unwrap();
			drop(conn);

			let (_second, _) = listener.accept().unwrap();
		});

		let client = PtzClient::connect(("127.0.0.1", port)).unwrap();

		let (status_tx, status_rx) = mpsc::channel();
		client.on_connection_status(move |connected| {
			status_tx.send(connected).ok();
		});

		first_rx.recv_timeout(Duration::from_secs(2)).expect("mock device never accepted first connection");

		let mut saw_connected = false;
		let mut saw_disconnected = false;
		let deadline = std::time::Instant::now() + Duration::from_secs(5);
		while std::time::Instant::now() < deadline && !(saw_connected && saw_disconnected) {
			if let Ok(connected) = status_rx.recv_timeout(Duration::from_millis(200)) {
				if connected {
					saw_connected = true;
				} else if saw_connected {
					saw_disconnected = true;
				}
			}
		}

		assert!(saw_connected, "expected an initial connected event");
		assert!(saw_disconnected, "expected a disconnected event after the drop");

		handle.join().unwrap();
	}
}
