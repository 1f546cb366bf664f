use serde_json::Value;

use crate::{CatalogClient, Result};
use cyberlab_domain::Room;

pub const ROOMS_PATH: &str = "/api/admin/thm-rooms-d1";

impl CatalogClient {
	/// Lists the secondary store's rooms in their source shape.
	pub async fn list_rooms(&self) -> Result<Vec<Room>> {
		let res = self.http().get(self.url(ROOMS_PATH)).send().await?;
		let body: Value = crate::read_json(res).await?;
		let items = crate::list_field(body, "rooms")?;

		Ok(crate::decode_each("room", items))
	}
}
