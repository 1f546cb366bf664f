use serde::Deserialize;

use crate::{CatalogClient, Result};

pub const AUTH_PATH: &str = "/api/admin/auth";

#[derive(Debug, Deserialize)]
struct AuthStatus {
	#[serde(default)]
	authenticated: bool,
}

impl CatalogClient {
	/// Whether the attached session is an authenticated admin session.
	pub async fn session_status(&self) -> Result<bool> {
		let res = self.http().get(self.url(AUTH_PATH)).send().await?;
		let status: AuthStatus = crate::read_json(res).await?;

		Ok(status.authenticated)
	}
}
