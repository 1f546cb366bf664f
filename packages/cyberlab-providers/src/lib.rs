pub mod auth;
pub mod machines;
pub mod rooms;
pub mod stats;
pub mod tools;

mod error;

pub use error::{Error, Result, STORE_UNAVAILABLE_MARKER};
pub use stats::SaveTarget;

use std::time::Duration;

use reqwest::{
	Client, Response,
	header::{COOKIE, HeaderMap, HeaderName},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use cyberlab_config::{Config, Session};

/// HTTP client for the site's `/api/...` routes.
#[derive(Clone, Debug)]
pub struct CatalogClient {
	http: Client,
	api_base: String,
}
impl CatalogClient {
	pub fn new(cfg: &Config) -> Result<Self> {
		Self::with_base(&cfg.service.api_base, cfg.service.timeout_ms, &cfg.session)
	}

	pub fn with_base(api_base: &str, timeout_ms: u64, session: &Session) -> Result<Self> {
		let api_base = api_base.trim_end_matches('/');

		if api_base.is_empty() {
			return Err(Error::InvalidConfig { message: "API base must be non-empty.".to_string() });
		}

		let http = Client::builder()
			.timeout(Duration::from_millis(timeout_ms))
			.default_headers(session_headers(session.cookie.as_deref(), &session.default_headers)?)
			.build()?;

		Ok(Self { http, api_base: api_base.to_string() })
	}

	pub fn api_base(&self) -> &str {
		&self.api_base
	}

	pub(crate) fn url(&self, path: &str) -> String {
		format!("{}{}", self.api_base, path)
	}

	pub(crate) fn http(&self) -> &Client {
		&self.http
	}
}

/// Builds the headers attached to every request: the admin session cookie plus configured
/// extras.
pub fn session_headers(
	cookie: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(cookie) = cookie {
		headers.insert(COOKIE, cookie.parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Fails with [`Error::Rejected`] on non-success statuses, carrying the body's `error` field.
pub(crate) async fn expect_success(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();
	let message = serde_json::from_str::<Value>(&body)
		.ok()
		.and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
		.or_else(|| {
			let trimmed = body.trim();

			(!trimmed.is_empty() && trimmed.len() <= 512).then(|| trimmed.to_string())
		});

	Err(Error::Rejected { status: status.as_u16(), message })
}

pub(crate) async fn read_json<T>(res: Response) -> Result<T>
where
	T: DeserializeOwned,
{
	let res = expect_success(res).await?;
	let bytes = res.bytes().await?;

	Ok(serde_json::from_slice(&bytes)?)
}

/// Extracts a list that may arrive bare or wrapped as `{ "<key>": [...] }`.
pub(crate) fn list_field(value: Value, key: &str) -> Result<Vec<Value>> {
	match value {
		Value::Array(items) => Ok(items),
		Value::Object(mut map) => match map.remove(key) {
			Some(Value::Array(items)) => Ok(items),
			None | Some(Value::Null) => Ok(Vec::new()),
			Some(_) => Err(Error::InvalidResponse { message: format!("Field {key} must be a list.") }),
		},
		_ => Err(Error::InvalidResponse {
			message: format!("Expected a list or an object with {key}."),
		}),
	}
}

/// Decodes each item, logging and dropping the ones that do not fit `T`.
pub(crate) fn decode_each<T>(kind: &'static str, items: Vec<Value>) -> Vec<T>
where
	T: DeserializeOwned,
{
	let mut out = Vec::with_capacity(items.len());

	for (index, item) in items.into_iter().enumerate() {
		match serde_json::from_value(item) {
			Ok(decoded) => out.push(decoded),
			Err(err) => tracing::warn!(kind, index, error = %err, "Dropping malformed item."),
		}
	}

	out
}
