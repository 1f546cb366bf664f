use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub session: Session,
	pub storage: Storage,
	#[serde(default)]
	pub catalog: Catalog,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub refresh: Refresh,
	#[serde(default)]
	pub notices: Notices,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	/// Origin of the site exposing the `/api/...` routes, without a trailing slash.
	pub api_base: String,
	pub log_level: String,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Session {
	/// Raw `Cookie` header value carrying the admin session, if any.
	pub cookie: Option<String>,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub state_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Catalog {
	pub recent_limit: usize,
	pub room_default_os: String,
	pub use_bundled: bool,
}
impl Default for Catalog {
	fn default() -> Self {
		Self { recent_limit: 3, room_default_os: "Linux".to_string(), use_bundled: true }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub records_ttl_seconds: u64,
	pub tools_ttl_seconds: u64,
	pub tools_fetch_limit: u32,
	pub tools_display_limit: usize,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			records_ttl_seconds: 300,
			tools_ttl_seconds: 300,
			tools_fetch_limit: 20,
			tools_display_limit: 3,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Refresh {
	pub stats_interval_seconds: u64,
	pub records_interval_seconds: u64,
	pub session_timeout_ms: u64,
}
impl Default for Refresh {
	fn default() -> Self {
		Self { stats_interval_seconds: 300, records_interval_seconds: 30, session_timeout_ms: 5_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Notices {
	pub success_clear_ms: u64,
}
impl Default for Notices {
	fn default() -> Self {
		Self { success_clear_ms: 3_000 }
	}
}

fn default_timeout_ms() -> u64 {
	10_000
}
