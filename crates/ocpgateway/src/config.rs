// Gateway configuration loaded from YAML

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_PATH: &str = "/ocp-m/dynamic";

/// Top level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
	/// Address the HTTP API listens on
	#[serde(default = "default_bind")]
	pub bind: SocketAddr,
	/// Prefix of the dynamic catalog routes and of the links the registry emits
	#[serde(default = "default_base_path")]
	pub base_path: String,
	#[serde(default)]
	pub client: ClientConfig,
	/// Optional seed file with authenticators, services and catalogs
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub seed: Option<PathBuf>,
}

/// Outbound HTTP client settings. Every outbound call gets exactly one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientConfig {
	#[serde(default = "default_fetch_timeout", with = "serde_dur")]
	pub fetch_timeout: Duration,
	#[serde(default = "default_authenticator_timeout", with = "serde_dur")]
	pub authenticator_timeout: Duration,
	#[serde(default = "default_service_timeout", with = "serde_dur")]
	pub service_timeout: Duration,
	#[serde(default = "default_user_agent")]
	pub user_agent: String,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			fetch_timeout: default_fetch_timeout(),
			authenticator_timeout: default_authenticator_timeout(),
			service_timeout: default_service_timeout(),
			user_agent: default_user_agent(),
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			bind: default_bind(),
			base_path: default_base_path(),
			client: ClientConfig::default(),
			seed: None,
		}
	}
}

impl Config {
	pub fn from_yaml(contents: &str) -> Result<Self> {
		let config: Config = serde_yaml::from_str(contents)
			.map_err(|e| Error::BadRequest(format!("invalid configuration: {e}")))?;
		config.validate()?;
		Ok(config)
	}

	/// Load from a file. A relative seed path is resolved against the file's directory.
	pub fn load(path: &Path) -> Result<Self> {
		let contents = fs_err::read_to_string(path)
			.map_err(|e| Error::BadRequest(format!("failed to read configuration: {e}")))?;
		let mut config = Self::from_yaml(&contents)?;
		config.seed = config.seed.take().map(|seed| match path.parent() {
			Some(dir) if seed.is_relative() => dir.join(seed),
			_ => seed,
		});
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		let base = self.base_path.as_str();
		if !base.starts_with('/') || base == "/" || base.ends_with('/') {
			return Err(Error::BadRequest(format!(
				"basePath must start with '/', must not end with '/' and must not be the root: {base}"
			)));
		}
		Ok(())
	}
}

fn default_bind() -> SocketAddr {
	SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_base_path() -> String {
	DEFAULT_BASE_PATH.to_string()
}

fn default_fetch_timeout() -> Duration {
	Duration::from_secs(10)
}

fn default_authenticator_timeout() -> Duration {
	Duration::from_secs(10)
}

fn default_service_timeout() -> Duration {
	Duration::from_secs(15)
}

fn default_user_agent() -> String {
	concat!("ocpgateway/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Parse a duration string like "5m", "30s", "1h"
pub fn parse_duration(s: &str) -> Result<Duration> {
	let s = s.trim();
	if s.is_empty() {
		return Err(Error::BadRequest("empty duration string".into()));
	}

	let (num_str, unit) = if let Some(n) = s.strip_suffix("ms") {
		(n, "ms")
	} else if let Some(n) = s.strip_suffix('s') {
		(n, "s")
	} else if let Some(n) = s.strip_suffix('m') {
		(n, "m")
	} else if let Some(n) = s.strip_suffix('h') {
		(n, "h")
	} else {
		// Assume seconds if no unit
		(s, "s")
	};

	let num: u64 = num_str
		.parse()
		.map_err(|_| Error::BadRequest(format!("invalid duration number: {num_str}")))?;

	let scale = match unit {
		"ms" => return Ok(Duration::from_millis(num)),
		"m" => 60,
		"h" => 60 * 60,
		_ => 1,
	};
	num
		.checked_mul(scale)
		.map(Duration::from_secs)
		.ok_or_else(|| Error::BadRequest(format!("duration out of range: {s}")))
}

mod serde_dur {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("{}ms", d.as_millis()))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		let s = String::deserialize(deserializer)?;
		super::parse_duration(&s).map_err(serde::de::Error::custom)
	}
}
