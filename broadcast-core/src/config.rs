//! Start-up configuration consumed from the host UI collaborator, per the
//! keyed options it hands the core at launch.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("missing required configuration key: {0}")]
	Missing(String),

	#[error("malformed configuration: {0}")]
	Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PtzCameraConfig {
	pub display_name: String,
	pub ip: String,
	pub port: u16,
	pub switcher_input_index: u32,
}

/// Human labels for switcher video inputs, keyed by input index. Passed
/// through to the UI unmodified; the core never interprets the labels.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct InputNames {
	#[serde(flatten)]
	pub by_index: BTreeMap<u32, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioLevelLimits {
	pub min: f32,
	pub warn: f32,
	pub high: f32,
	pub max: f32,
}

/// Grid layout and media URL for the multiview surface. The core passes
/// this through verbatim; it never interprets the layout descriptors.
#[derive(Debug, Clone, Deserialize)]
pub struct MultiviewConfig {
	pub multiview_enabled: bool,
	#[serde(default)]
	pub grid_layout: Vec<String>,
	#[serde(default)]
	pub media_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub switcher_ip: String,
	#[serde(default)]
	pub ptz_cameras: Vec<PtzCameraConfig>,
	#[serde(default)]
	pub input_names_to_indices: InputNames,
	pub audio_level_limits_db: AudioLevelLimits,
	pub multiview: MultiviewConfig,
}

impl Config {
	pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
		serde_json::from_str(text).map_err(|err| ConfigError::Invalid(err.to_string()))
	}

	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|err| ConfigError::Missing(format!("{}: {err}", path.display())))?;
		Self::from_json_str(&text)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_a_complete_config() {
		let json = r#"{
			"switcher_ip": "192.168.1.50",
			"ptz_cameras": [
				{"display_name": "Stage Left", "ip": "192.168.1.60", "port": 5678, "switcher_input_index": 2}
			],
			"input_names_to_indices": {"1": "Podium", "2": "Stage Left"},
			"audio_level_limits_db": {"min": -65.0, "warn": -20.0, "high": -6.0, "max": 0.0},
			"multiview": {"multiview_enabled": true, "grid_layout": ["2x2"], "media_url": "rtsp://mv.local/feed"}
		}"#;

		let config = Config::from_json_str(json).unwrap();
		assert_eq!(config.switcher_ip, "192.168.1.50");
		assert_eq!(config.ptz_cameras.len(), 1);
		assert_eq!(config.ptz_cameras[0].switcher_input_index, 2);
		assert_eq!(config.input_names_to_indices.by_index.get(&1).unwrap(), "Podium");
		assert_eq!(config.audio_level_limits_db.min, -65.0);
		assert!(config.multiview.multiview_enabled);
	}

	#[test]
	fn missing_required_key_is_invalid_not_missing() {
		let json = r#"{"ptz_cameras": []}"#;
		let err = Config::from_json_str(json).unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)));
	}

	#[test]
	fn missing_file_reports_missing() {
		let err = Config::from_json_file("/nonexistent/path/does-not-exist.json").unwrap_err();
		assert!(matches!(err, ConfigError::Missing(_)));
	}
}
