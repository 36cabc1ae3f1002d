//! Public facade for a single PTZ camera: pan/tilt/zoom/focus and presets
//! over a persistent, auto-reconnecting TCP connection.

use std::net::ToSocketAddrs;

use log::warn;

use crate::command::CommandLayer;
use crate::events::SubscriptionId;
use crate::frame::{self, SpeedLimits};
use crate::stream::Stream;
use crate::Error;

pub struct PtzClient {
	stream: Stream,
	commands: CommandLayer,
	limits: SpeedLimits,
}

impl PtzClient {
	pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, Error> {
		Ok(Self { stream: Stream::connect(addr)?, commands: CommandLayer::default(), limits: SpeedLimits::default() })
	}

	pub fn with_speed_limits(addr: impl ToSocketAddrs, limits: SpeedLimits) -> Result<Self, Error> {
		Ok(Self { stream: Stream::connect(addr)?, commands: CommandLayer::default(), limits })
	}

	pub fn is_connected(&self) -> bool {
		self.stream.is_connected()
	}

	pub fn on_connection_status(&self, callback: impl Fn(bool) + Send + 'static) -> SubscriptionId {
		self.stream.subscribe_connected(callback)
	}

	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.stream.unsubscribe_connected(id);
	}

	/// `pan` and `tilt` are magnitudes in `[-1, 1]`.
	pub fn pan_tilt(&self, pan: f32, tilt: f32) -> bool {
		if !(-1.0..=1.0).contains(&pan) || !(-1.0..=1.0).contains(&tilt) {
			warn!("pan/tilt magnitude out of range: pan={pan}, tilt={tilt}");
			return false;
		}
		self.commands.send(&self.stream, frame::pan_tilt(pan, tilt, self.limits))
	}

	/// `v` in `[-1, 1]`; positive zooms in, negative zooms out.
	pub fn zoom(&self, v: f32) -> bool {
		if !(-1.0..=1.0).contains(&v) {
			warn!("zoom magnitude out of range: {v}");
			return false;
		}
		self.commands.send(&self.stream, frame::zoom(v, self.limits))
	}

	/// `v` in `[-1, 1]`; positive focuses far, negative focuses near.
	pub fn focus(&self, v: f32) -> bool {
		if !(-1.0..=1.0).contains(&v) {
			warn!("focus magnitude out of range: {v}");
			return false;
		}
		self.commands.send(&self.stream, frame::focus(v, self.limits))
	}

	/// `idx` occupies the low nibble; values above 15 are masked by the
	/// device, not rejected.
	pub fn save_preset(&self, idx: u8) -> bool {
		self.commands.send(&self.stream, frame::save_preset(idx))
	}

	pub fn recall_preset(&self, idx: u8) -> bool {
		self.commands.send(&self.stream, frame::recall_preset(idx))
	}
}
