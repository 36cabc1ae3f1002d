//! Public API surface consumed by the host UI: `SwitcherClient`.

use std::net::ToSocketAddrs;

use crate::error::Error;
use crate::events::SubscriptionId;
use crate::state::{Event, SwitcherState};
use crate::tlv;
use crate::transport::Transport;

/// Default audio-level floor used when no `audio_level_limits_db` config is
/// supplied. Overridden by [`SwitcherClient::with_audio_floor`].
const DEFAULT_AUDIO_FLOOR_DB: f32 = -60.0;

/// Drives one video production switcher over its reliable UDP protocol.
pub struct SwitcherClient {
	transport: Transport,
}

impl SwitcherClient {
	/// Opens the socket, spawns the receive and supervisor threads, and
	/// starts handshaking with `ip`. Returns as soon as the background
	/// threads are running; connection status is reported asynchronously
	/// through `subscribe_connected` and [`SwitcherClient::state`].
	pub fn initialize(ip: impl ToSocketAddrs) -> Result<Self, Error> {
		Self::with_audio_floor(ip, DEFAULT_AUDIO_FLOOR_DB)
	}

	/// As [`Self::initialize`], but with the device-configured audio-level
	/// floor (`audio_level_limits_db.min + 1` per spec §4.3) used to convert
	/// a raw level of zero into a decibel value.
	pub fn with_audio_floor(ip: impl ToSocketAddrs, audio_floor_db: f32) -> Result<Self, Error> {
		Ok(Self { transport: Transport::connect(ip, audio_floor_db)? })
	}

	pub fn state(&self) -> SwitcherState {
		self.transport.state_snapshot()
	}

	pub fn is_ready(&self) -> bool {
		self.transport.is_ready()
	}

	pub fn set_program(&self, idx: u16) -> bool {
		self.command(tlv::set_program(idx))
	}

	pub fn set_preview(&self, idx: u16) -> bool {
		self.command(tlv::set_preview(idx))
	}

	pub fn cut(&self) -> bool {
		self.command(tlv::cut())
	}

	pub fn auto(&self) -> bool {
		self.command(tlv::auto_transition())
	}

	pub fn fade_to_black(&self) -> bool {
		self.command(tlv::fade_to_black())
	}

	/// `position` is clamped to `[0, 9999]` and rejected outright only if
	/// out of `u16` range; callers are expected to pass a validated value.
	pub fn set_transition_position(&self, position: u16) -> bool {
		if position > 9999 {
			return self.reject(Error::CallerError(format!("transition position {position} out of [0, 9999]")));
		}

		self.command(tlv::set_transition_position(position))
	}

	pub fn set_keyer_on_air(&self, on: bool) -> bool {
		self.command(tlv::set_keyer_on_air(on))
	}

	pub fn enable_live_audio(&self, on: bool) -> bool {
		self.command(tlv::enable_live_audio(on))
	}

	/// `percent` must be within `[0.0, 1.0]`; out-of-range values are a
	/// `CallerError` and are rejected without transmitting.
	pub fn set_master_audio(&self, percent: f32) -> bool {
		if !(0.0..=1.0).contains(&percent) {
			return self.reject(Error::CallerError(format!("master audio percent {percent} out of [0.0, 1.0]")));
		}

		self.command(tlv::set_master_audio(percent))
	}

	pub fn set_aux(&self, idx: u16) -> bool {
		self.command(tlv::set_aux(idx))
	}

	fn command(&self, (mnemonic, data): ([u8; 4], Vec<u8>)) -> bool {
		match self.transport.send_command(mnemonic, data) {
			Ok(()) => true,
			Err(err) => {
				log::warn!("switcher command failed: {err}");
				false
			}
		}
	}

	/// Surfaces a caller-side validation failure through the same typed
	/// error the transport layer uses, logs it, and collapses it to the
	/// `bool` the public API returns without ever transmitting.
	fn reject(&self, err: Error) -> bool {
		log::warn!("rejecting switcher command: {err}");
		false
	}

	/// Subscribes to every state-change event. The typed `subscribe_*`
	/// helpers below are thin filters over this.
	pub fn subscribe(&self, callback: impl Fn(&Event) + Send + 'static) -> SubscriptionId {
		self.transport.subscribe(callback)
	}

	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.transport.unsubscribe(id)
	}

	pub fn subscribe_connected(&self, callback: impl Fn(bool) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::Connected(connected) = event {
				callback(*connected);
			}
		})
	}

	pub fn subscribe_program_input(&self, callback: impl Fn(u16) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::ProgramInput(idx) = event {
				callback(*idx);
			}
		})
	}

	pub fn subscribe_preview_input(&self, callback: impl Fn(u16) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::PreviewInput(idx) = event {
				callback(*idx);
			}
		})
	}

	pub fn subscribe_aux_input(&self, callback: impl Fn(u16) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::AuxInput(idx) = event {
				callback(*idx);
			}
		})
	}

	pub fn subscribe_keyer_on_air(&self, callback: impl Fn(bool) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::KeyerOnAir(on) = event {
				callback(*on);
			}
		})
	}

	pub fn subscribe_fade_to_black(&self, callback: impl Fn(bool, bool) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::FadeToBlack { active, transitioning } = event {
				callback(*active, *transitioning);
			}
		})
	}

	pub fn subscribe_transition(&self, callback: impl Fn(bool, u16) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::Transition { in_progress, position } = event {
				callback(*in_progress, *position);
			}
		})
	}

	pub fn subscribe_audio_levels(&self, callback: impl Fn(f32, f32) + Send + 'static) -> SubscriptionId {
		self.subscribe(move |event| {
			if let Event::AudioLevels { left_db, right_db } = event {
				callback(*left_db, *right_db);
			}
		})
	}
}
