//! Switcher Transport Layer: handshake, steady-state ACK/dispatch, and the
//! supervisor that watches liveness and re-handshakes on silence.

use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{info, warn};
use rand::Rng;

use crate::datagram;
use crate::error::Error;
use crate::events::{Bus, SubscriptionId};
use crate::packet::{decode_tlv_fields, encode_tlv, Flags, Packet};
use crate::session::{Phase, Session};
use crate::state::{Event, SwitcherState};
use crate::tlv;

const QUEUE_DEPTH: usize = 64;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(3);
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(100);
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);
const SUPERVISOR_TICK: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_millis(500);
/// Opaque sentinel the device requires in the remote-sequence field of the
/// ACK that concludes the initial state dump. See spec §9 Open Questions.
const DUMP_COMPLETE_SENTINEL: u16 = 0x61;

struct Shared {
	socket: Arc<UdpSocket>,
	inbound: Receiver<Packet>,
	session: Mutex<Session>,
	send_lock: Mutex<()>,
	state: Mutex<SwitcherState>,
	events: Bus,
	audio_floor_db: f32,
	shutdown: AtomicBool,
}

pub struct Transport {
	shared: Arc<Shared>,
	receiver: JoinHandle<()>,
	supervisor: JoinHandle<()>,
}

impl Transport {
	pub fn connect(ip: impl ToSocketAddrs, audio_floor_db: f32) -> Result<Self, Error> {
		let socket = datagram::connect(ip)?;
		socket.set_read_timeout(Some(READ_TIMEOUT))?;

		let (tx, rx): (Sender<Packet>, Receiver<Packet>) = bounded(QUEUE_DEPTH);

		let shared = Arc::new(Shared {
			socket: Arc::clone(&socket),
			inbound: rx,
			session: Mutex::new(Session::default()),
			send_lock: Mutex::new(()),
			state: Mutex::new(SwitcherState::default()),
			events: Bus::default(),
			audio_floor_db,
			shutdown: AtomicBool::new(false),
		});

		let dispatch_shared = Arc::clone(&shared);
		let receiver = datagram::spawn_receiver(socket, tx, move |packet| dispatch_shared.on_packet(packet));

		let supervisor_shared = Arc::clone(&shared);
		let supervisor = std::thread::Builder::new()
			.name("switcher-supervisor".into())
			.spawn(move || supervise(supervisor_shared))
			.expect("failed to spawn switcher supervisor thread");

		Ok(Self { shared, receiver, supervisor })
	}

	pub fn send_command(&self, mnemonic: [u8; 4], data: Vec<u8>) -> Result<(), Error> {
		self.shared.send_command(mnemonic, data)
	}

	pub fn subscribe(&self, callback: impl Fn(&Event) + Send + 'static) -> SubscriptionId {
		self.shared.events.subscribe(callback)
	}

	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.shared.events.unsubscribe(id)
	}

	pub fn state_snapshot(&self) -> SwitcherState {
		self.shared.state.lock().unwrap().clone()
	}

	pub fn is_ready(&self) -> bool {
		self.shared.session.lock().unwrap().phase == Phase::Ready
	}
}

impl Drop for Transport {
	fn drop(&mut self) {
		self.shared.shutdown.store(true, Ordering::Relaxed);
		// Read thread wakes on its 500ms read timeout and observes the flag;
		// the supervisor wakes on its own tick. Neither handle is joined on
		// drop to avoid blocking a caller inside e.g. an event callback.
		let _ = (&self.receiver, &self.supervisor);
	}
}

impl Shared {
	/// Invoked from the receive thread for every well-formed packet.
	fn on_packet(&self, packet: Packet) {
		self.session.lock().unwrap().touch();

		if self.session.lock().unwrap().phase == Phase::Ready {
			self.dispatch_steady(packet);
		}
	}

	fn dispatch_steady(&self, packet: Packet) {
		if packet.payload.is_empty() && !packet.flags.reliable {
			return;
		}

		let fields = match decode_tlv_fields(&packet.payload) {
			Ok(fields) => fields,
			Err(err) => {
				warn!("malformed TLV payload, invalidating switcher session: {err}");
				if packet.flags.reliable {
					self.session.lock().unwrap().phase = Phase::Disconnected;
				}
				return;
			}
		};

		for field in &fields {
			let event = tlv::decode_field(field, self.audio_floor_db);
			tlv::apply(&mut self.state.lock().unwrap(), &event);
			self.events.dispatch(&event);
		}

		if packet.flags.reliable {
			let session_id = self.session.lock().unwrap().session_id.unwrap_or(packet.session_id);

			let ack = Packet {
				flags: Flags::ACK,
				session_id,
				ack_number: packet.local_sequence,
				..Packet::default()
			};

			if let Err(err) = datagram::send(&self.socket, &ack) {
				warn!("failed to acknowledge switcher packet: {err}");
			}
		}
	}

	fn send_command(&self, mnemonic: [u8; 4], data: Vec<u8>) -> Result<(), Error> {
		let _guard = self.send_lock.lock().unwrap();

		let (session_id, seq) = {
			let mut session = self.session.lock().unwrap();

			if session.phase != Phase::Ready {
				return Err(Error::ProtocolViolation("switcher session is not ready".into()));
			}

			(session.session_id.expect("session id set once Ready"), session.next_sequence())
		};

		let packet = Packet {
			flags: Flags::RELIABLE,
			session_id,
			local_sequence: seq,
			payload: encode_tlv(&mnemonic, &data),
			..Packet::default()
		};

		datagram::send(&self.socket, &packet)?;

		let deadline = Instant::now() + COMMAND_TIMEOUT;

		loop {
			if Instant::now() >= deadline {
				self.session.lock().unwrap().phase = Phase::Disconnected;
				return Err(Error::CommandTimeout);
			}

			match self.inbound.recv_timeout(COMMAND_POLL_INTERVAL) {
				Ok(reply) if reply.flags.ack && reply.ack_number == seq => return Ok(()),
				Ok(_) => continue,
				Err(RecvTimeoutError::Timeout) => continue,
				Err(RecvTimeoutError::Disconnected) => return Err(Error::ProtocolViolation("delivery queue closed".into())),
			}
		}
	}

	/// Runs the three-step handshake and, on success, the initial state
	/// dump. Holds `send_lock` for its whole duration so a concurrent
	/// command call can't interleave sequence numbers with it.
	fn handshake(&self) -> Result<(), Error> {
		let _guard = self.send_lock.lock().unwrap();

		info!("starting switcher handshake");
		self.session.lock().unwrap().reset_for_handshake();
		while self.inbound.try_recv().is_ok() {}

		let temp_id: u16 = rand::thread_rng().gen_range(0..=999);

		let mut syn_payload = vec![0u8; 8];
		syn_payload[0] = 0x01;

		let syn = Packet {
			flags: Flags::SYN,
			session_id: temp_id,
			payload: syn_payload,
			..Packet::default()
		};
		datagram::send(&self.socket, &syn)?;

		let reply = self
			.inbound
			.recv_timeout(HANDSHAKE_TIMEOUT)
			.map_err(|_| Error::ProtocolViolation("no reply to SYN within 1s".into()))?;

		if reply.payload.first().copied() != Some(0x02) {
			return Err(Error::ProtocolViolation("handshake reply was not accepted".into()));
		}

		let ack = Packet { flags: Flags::ACK, session_id: temp_id, ..Packet::default() };
		datagram::send(&self.socket, &ack)?;

		self.session.lock().unwrap().phase = Phase::Initializing;

		let mut session_id = None;

		loop {
			let dump_packet = self
				.inbound
				.recv_timeout(LIVENESS_TIMEOUT)
				.map_err(|_| Error::ProtocolViolation("state dump stalled".into()))?;

			let session_id = *session_id.get_or_insert(dump_packet.session_id);
			let is_final = dump_packet.payload.is_empty();

			if !is_final {
				for field in decode_tlv_fields(&dump_packet.payload)? {
					let event = tlv::decode_field(&field, self.audio_floor_db);
					tlv::apply(&mut self.state.lock().unwrap(), &event);
					self.events.dispatch(&event);
				}
			}

			let ack = Packet {
				flags: Flags::ACK,
				session_id,
				ack_number: dump_packet.local_sequence,
				remote_sequence: if is_final { DUMP_COMPLETE_SENTINEL } else { 0 },
				..Packet::default()
			};
			datagram::send(&self.socket, &ack)?;

			if is_final {
				let mut session = self.session.lock().unwrap();
				session.session_id = Some(session_id);
				session.phase = Phase::Ready;
				session.touch();
				break;
			}
		}

		info!("switcher session ready");
		let connected = Event::Connected(true);
		tlv::apply(&mut self.state.lock().unwrap(), &connected);
		self.events.dispatch(&connected);

		Ok(())
	}
}

fn supervise(shared: Arc<Shared>) {
	// Attempt a handshake immediately rather than waiting out the first tick.
	attempt_handshake(&shared);

	loop {
		if shared.shutdown.load(Ordering::Relaxed) {
			return;
		}

		std::thread::sleep(SUPERVISOR_TICK);

		if shared.shutdown.load(Ordering::Relaxed) {
			return;
		}

		let (ready, silent) = {
			let session = shared.session.lock().unwrap();
			(session.phase == Phase::Ready, session.silence().is_some_and(|d| d > LIVENESS_TIMEOUT))
		};

		if ready && silent {
			warn!("switcher session silent for more than 5s, reconnecting");
			shared.session.lock().unwrap().phase = Phase::Disconnected;
			let disconnected = Event::Connected(false);
			tlv::apply(&mut shared.state.lock().unwrap(), &disconnected);
			shared.events.dispatch(&disconnected);
		}

		if !ready || silent {
			attempt_handshake(&shared);
		}
	}
}

fn attempt_handshake(shared: &Arc<Shared>) {
	if let Err(err) = shared.handshake() {
		warn!("switcher handshake attempt failed, retrying next tick: {err}");
		shared.session.lock().unwrap().phase = Phase::Disconnected;
	}
}
