pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid value for {field}: {message}")]
	InvalidField { field: String, message: String },
	#[error("Malformed {kind}: {message}")]
	Malformed { kind: &'static str, message: String },
}
