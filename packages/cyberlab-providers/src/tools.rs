use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{CatalogClient, Result};
use cyberlab_domain::{Payload, Tool, tools};

pub const TOOLS_PATH: &str = "/api/tools/latest";
pub const PAYLOADS_PATH: &str = "/api/tools/payloads";

impl CatalogClient {
	pub async fn latest_tools(&self, limit: u32) -> Result<Vec<Tool>> {
		self.feed(TOOLS_PATH, "tools", "tool", limit).await
	}

	pub async fn latest_payloads(&self, limit: u32) -> Result<Vec<Payload>> {
		self.feed(PAYLOADS_PATH, "payloads", "payload", limit).await
	}

	async fn feed<T>(
		&self,
		path: &str,
		field: &str,
		kind: &'static str,
		limit: u32,
	) -> Result<Vec<T>>
	where
		T: DeserializeOwned,
	{
		let res = self
			.http()
			.get(self.url(path))
			.query(&[("limit", limit.to_string()), ("fresh", "true".to_string())])
			.send()
			.await?;
		let body: Value = crate::read_json(res).await?;
		let mut out = Vec::new();

		for item in crate::list_field(body, field)? {
			match tools::decode_item(kind, item) {
				Ok(decoded) => out.push(decoded),
				Err(err) => tracing::warn!(kind, error = %err, "Dropping invalid feed item."),
			}
		}

		Ok(out)
	}
}
