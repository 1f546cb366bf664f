pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Provider(#[from] cyberlab_providers::Error),
	#[error(transparent)]
	Storage(#[from] cyberlab_storage::Error),
	#[error(transparent)]
	Domain(#[from] cyberlab_domain::Error),
	#[error("Admin session required.")]
	AdminRequired,
	#[error("A {label} stats save is in flight for {field}.")]
	CommitInFlight { label: &'static str, field: String },
	#[error("No {label} stats field is being edited.")]
	NotEditing { label: &'static str },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}
