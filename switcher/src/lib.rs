//! Wire-level client for the video switcher's reliable UDP control protocol:
//! session handshake, sequenced acknowledgements, and TLV status decoding.

mod client;
mod datagram;
mod error;
mod events;
mod packet;
mod session;
mod state;
mod tlv;
mod transport;

pub use client::SwitcherClient;
pub use error::Error;
pub use events::SubscriptionId;
pub use packet::{decode_tlv_fields, encode_tlv, Flags, Packet, TlvField, DEVICE_PORT, HEADER_LEN};
pub use state::{Event, SwitcherState, TallyFlags};

#[cfg(test)]
mod integration_tests {
	use std::net::UdpSocket;
	use std::sync::mpsc;
	use std::time::Duration;

	use crate::packet::{encode_tlv, Flags, Packet};
	use crate::{Event, SwitcherClient};

	/// Spins up a mock switcher on loopback, accepts the handshake, then
	/// streams the three-packet dump from spec.md §8 scenario 1.
	fn mock_device() -> (UdpSocket, std::net::SocketAddr) {
		let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
		let addr = socket.local_addr().unwrap();
		(socket, addr)
	}

	#[test]
	fn handshake_assigns_session_and_emits_dump_events() {
		let (device, addr) = mock_device();
		let device_port = addr.port();

		let (ready_tx, ready_rx) = mpsc::channel();

		let handle = std::thread::spawn(move || {
			let mut buf = [0u8; 2048];

			// Step 1: SYN.
			let (n, client_addr) = device.recv_from(&mut buf).unwrap();
			let syn = Packet::decode(&buf[..n]).unwrap();
			assert!(syn.flags.syn);
			device.connect(client_addr).unwrap();

			let reply = Packet {
				flags: Flags::default(),
				payload: vec![0x02],
				..Packet::default()
			};
			device.send(&reply.encode()).unwrap();

			// Step 3: client's ACK.
			let (n, _) = device.recv_from(&mut buf).unwrap();
			let ack = Packet::decode(&buf[..n]).unwrap();
			assert!(ack.flags.ack);

			let session_id = 4242;

			let mut seq = 1u16;
			let mut send_dump = |payload: Vec<u8>| {
				let pkt = Packet {
					flags: Flags::RELIABLE,
					session_id,
					local_sequence: seq,
					payload,
					..Packet::default()
				};
				seq += 1;
				device.send(&pkt.encode()).unwrap();

				let (n, _) = device.recv_from(&mut buf).unwrap();
				Packet::decode(&buf[..n]).unwrap()
			};

			let prgi_ack = send_dump(encode_tlv(b"PrgI", &[0, 0, 0, 3]));
			assert_eq!(prgi_ack.ack_number, 1);

			let prvi_ack = send_dump(encode_tlv(b"PrvI", &[0, 0, 0, 4]));
			assert_eq!(prvi_ack.ack_number, 2);

			let final_ack = send_dump(Vec::new());
			assert_eq!(final_ack.ack_number, 3);
			assert_eq!(final_ack.remote_sequence, 0x61);

			ready_tx.send(()).unwrap();
		});

		let client = SwitcherClient::initialize(("127.0.0.1", device_port)).unwrap();

		let (tx, rx) = mpsc::channel();
		client.subscribe(move |event| {
			tx.send(event.clone()).ok();
		});

		ready_rx.recv_timeout(Duration::from_secs(2)).expect("mock device did not complete handshake");

		let mut saw_program = false;
		let mut saw_preview = false;
		let mut saw_connected = false;

		let deadline = std::time::Instant::now() + Duration::from_secs(1);
		while std::time::Instant::now() < deadline && !(saw_program && saw_preview && saw_connected) {
			if let Ok(event) = rx.recv_timeout(Duration::from_millis(100)) {
				match event {
					Event::ProgramInput(3) => saw_program = true,
					Event::PreviewInput(4) => saw_preview = true,
					Event::Connected(true) => saw_connected = true,
					_ => {}
				}
			}
		}

		assert!(saw_program, "expected a ProgramInput(3) event");
		assert!(saw_preview, "expected a PreviewInput(4) event");
		assert!(saw_connected, "expected a Connected(true) event");
		assert!(client.is_ready());

		handle.join().unwrap();
	}

	/// Drives a mock device through the handshake, then exercises the `cut`
	/// command per spec.md §8 scenario 2: one reliable packet with a single
	/// `DCut` TLV, sequence number `previous + 1`, acknowledged by the mock.
	#[test]
	fn cut_command_sends_one_reliable_packet_and_returns_true() {
		let (device, addr) = mock_device();
		let device_port = addr.port();

		let handle = std::thread::spawn(move || {
			let mut buf = [0u8; 2048];

			let (n, client_addr) = device.recv_from(&mut buf).unwrap();
			Packet::decode(&buf[..n]).unwrap();
			device.connect(client_addr).unwrap();

			device.send(&Packet { payload: vec![0x02], ..Packet::default() }.encode()).unwrap();

			device.recv_from(&mut buf).unwrap();

			let session_id = 99;
			let dump_end = Packet { flags: Flags::RELIABLE, session_id, local_sequence: 1, ..Packet::default() };
			device.send(&dump_end.encode()).unwrap();
			device.recv_from(&mut buf).unwrap();

			// Now Ready. Expect exactly one reliable `DCut` command.
			let (n, _) = device.recv_from(&mut buf).unwrap();
			let cmd = Packet::decode(&buf[..n]).unwrap();
			assert!(cmd.flags.reliable);
			assert_eq!(cmd.local_sequence, 1);

			let fields = crate::decode_tlv_fields(&cmd.payload).unwrap();
			assert_eq!(&fields[0].mnemonic, b"DCut");
			assert_eq!(fields[0].data, vec![0, 0, 0, 0]);

			let ack = Packet {
				flags: Flags::ACK,
				session_id,
				ack_number: cmd.local_sequence,
				..Packet::default()
			};
			device.send(&ack.encode()).unwrap();
		});

		let client = SwitcherClient::initialize(("127.0.0.1", device_port)).unwrap();

		let deadline = std::time::Instant::now() + Duration::from_secs(2);
		while std::time::Instant::now() < deadline && !client.is_ready() {
			std::thread::sleep(Duration::from_millis(20));
		}
		assert!(client.is_ready(), "client never reached Ready");

		assert!(client.cut());

		handle.join().unwrap();
	}
}
