pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Marker the store puts in its 503 body when no database is bound.
pub const STORE_UNAVAILABLE_MARKER: &str = "Database not available";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("Request rejected with status {status}: {}", message.as_deref().unwrap_or("no message"))]
	Rejected { status: u16, message: Option<String> },
}
impl Error {
	/// The store answered but has no backing database provisioned.
	pub fn is_store_unavailable(&self) -> bool {
		matches!(
			self,
			Self::Rejected { status: 503, message: Some(message) }
				if message.contains(STORE_UNAVAILABLE_MARKER)
		)
	}

	/// Message supplied by the server in its `{ "error": ... }` body, if any.
	pub fn server_message(&self) -> Option<&str> {
		match self {
			Self::Rejected { message, .. } => message.as_deref(),
			_ => None,
		}
	}
}
