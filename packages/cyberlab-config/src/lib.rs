mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Cache, Catalog, Config, Notices, Refresh, Service, Session, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	let api_base = cfg.service.api_base.as_str();

	if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
		return Err(Error::Validation {
			message: "service.api_base must be an http or https URL.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.state_path.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.state_path must be non-empty.".to_string(),
		});
	}
	if cfg.catalog.room_default_os.trim().is_empty() {
		return Err(Error::Validation {
			message: "catalog.room_default_os must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("service.timeout_ms", cfg.service.timeout_ms),
		("catalog.recent_limit", cfg.catalog.recent_limit as u64),
		("cache.records_ttl_seconds", cfg.cache.records_ttl_seconds),
		("cache.tools_ttl_seconds", cfg.cache.tools_ttl_seconds),
		("cache.tools_fetch_limit", cfg.cache.tools_fetch_limit as u64),
		("cache.tools_display_limit", cfg.cache.tools_display_limit as u64),
		("refresh.stats_interval_seconds", cfg.refresh.stats_interval_seconds),
		("refresh.records_interval_seconds", cfg.refresh.records_interval_seconds),
		("refresh.session_timeout_ms", cfg.refresh.session_timeout_ms),
		("notices.success_clear_ms", cfg.notices.success_clear_ms),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	for (key, value) in &cfg.session.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("session.default_headers.{key} must be a string."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let trimmed = cfg.service.api_base.trim().trim_end_matches('/').to_string();

	cfg.service.api_base = trimmed;

	if cfg.session.cookie.as_deref().map(|cookie| cookie.trim().is_empty()).unwrap_or(false) {
		cfg.session.cookie = None;
	}
}
