//! Manual smoke test: loads a config file, connects whatever it describes,
//! and logs every event to stderr. Not part of the public API.

use std::env;
use std::process::ExitCode;

use broadcast_core::{BroadcastCore, Config};
use log::{error, info};

fn main() -> ExitCode {
	env_logger::init();

	let Some(config_path) = env::args().nth(1) else {
		error!("usage: smoke <config.json>");
		return ExitCode::FAILURE;
	};

	let config = match Config::from_json_file(&config_path) {
		Ok(config) => config,
		Err(err) => {
			error!("configuration error: {err}");
			return ExitCode::FAILURE;
		}
	};

	let core = match BroadcastCore::start(&config) {
		Ok(core) => core,
		Err(err) => {
			error!("switcher client failed to start: {err}");
			return ExitCode::FAILURE;
		}
	};

	core.switcher.subscribe(|event| info!("switcher event: {event:?}"));
	for camera in &core.ptz_cameras {
		let name = camera.display_name.clone();
		camera.client.on_connection_status(move |connected| info!("{name} connected={connected}"));
	}

	info!("connected {} ptz camera(s); press ctrl-c to exit", core.ptz_cameras.len());
	loop {
		std::thread::sleep(std::time::Duration::from_secs(60));
	}
}
