//! Facade crate linked by the host UI collaborator: loads configuration,
//! composes one Switcher Client and zero-or-more PTZ Camera Clients, and
//! re-exports their public surfaces. Each client runs independently; this
//! crate holds no shared state between them.

pub mod config;

pub use config::{AudioLevelLimits, Config, ConfigError, InputNames, MultiviewConfig, PtzCameraConfig};
pub use ptz::{Error as PtzError, PtzClient};
pub use switcher::{Error as SwitcherError, SwitcherClient};

use log::{error, info};

/// One running PTZ camera client alongside the switcher input index the
/// configuration mapped it to, for UI-side correlation with tally state.
pub struct PtzCamera {
	pub display_name: String,
	pub switcher_input_index: u32,
	pub client: PtzClient,
}

/// The composed set of clients a host application drives from one config.
pub struct BroadcastCore {
	pub switcher: SwitcherClient,
	pub ptz_cameras: Vec<PtzCamera>,
}

impl BroadcastCore {
	/// Loads `config`, connects the Switcher Client, and connects a PTZ
	/// Camera Client for each configured camera. A camera that fails to
	/// connect is logged and skipped rather than aborting start-up — its
	/// `on_connection_status` subscriber is how the UI learns it never came
	/// up, the same path used for a later disconnect.
	pub fn start(config: &Config) -> Result<Self, SwitcherError> {
		let audio_floor_db = config.audio_level_limits_db.min + 1.0;
		let switcher = SwitcherClient::with_audio_floor((config.switcher_ip.as_str(), switcher::DEVICE_PORT), audio_floor_db)?;
		info!("switcher client connecting to {}", config.switcher_ip);

		let mut ptz_cameras = Vec::with_capacity(config.ptz_cameras.len());
		for camera in &config.ptz_cameras {
			match PtzClient::connect((camera.ip.as_str(), camera.port)) {
				Ok(client) => {
					info!("ptz camera '{}' connecting to {}:{}", camera.display_name, camera.ip, camera.port);
					ptz_cameras.push(PtzCamera {
						display_name: camera.display_name.clone(),
						switcher_input_index: camera.switcher_input_index,
						client,
					});
				}
				Err(err) => {
					error!("ptz camera '{}' failed to start: {err}", camera.display_name);
				}
			}
		}

		Ok(Self { switcher, ptz_cameras })
	}

	pub fn camera_for_input(&self, switcher_input_index: u32) -> Option<&PtzCamera> {
		self.ptz_cameras.iter().find(|camera| camera.switcher_input_index == switcher_input_index)
	}
}
