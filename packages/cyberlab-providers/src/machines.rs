use serde_json::Value;

use crate::{CatalogClient, Error, Result};
use cyberlab_domain::{Machine, NewMachine};

pub const MACHINES_PATH: &str = "/api/admin/htb-machines-d1";

impl CatalogClient {
	/// Lists the primary store's machines. Items that fail to decode are dropped.
	pub async fn list_machines(&self) -> Result<Vec<Machine>> {
		let res = self.http().get(self.url(MACHINES_PATH)).send().await?;
		let body: Value = crate::read_json(res).await?;
		let items = crate::list_field(body, "machines")?;

		Ok(crate::decode_each("machine", items))
	}

	pub async fn create_machine(&self, machine: &NewMachine) -> Result<Machine> {
		let res = self.http().post(self.url(MACHINES_PATH)).json(machine).send().await?;

		written_machine(crate::read_json(res).await?)
	}

	pub async fn update_machine(&self, machine: &Machine) -> Result<Machine> {
		let res = self.http().put(self.url(MACHINES_PATH)).json(machine).send().await?;

		written_machine(crate::read_json(res).await?)
	}

	pub async fn delete_machine(&self, id: &str) -> Result<()> {
		let res =
			self.http().delete(self.url(MACHINES_PATH)).query(&[("id", id)]).send().await?;

		crate::expect_success(res).await?;

		Ok(())
	}
}

// Write responses wrap the stored machine as `{ "machine": {...} }`; older deployments answer
// with the bare machine.
fn written_machine(body: Value) -> Result<Machine> {
	let inner = match body {
		Value::Object(mut map) if map.contains_key("machine") =>
			map.remove("machine").unwrap_or(Value::Null),
		other => other,
	};

	serde_json::from_value(inner).map_err(|err| Error::InvalidResponse {
		message: format!("Write response is not a machine: {err}."),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_wrapped_and_bare_write_responses() {
		let bare = serde_json::json!({
			"id": 4, "name": "Lame", "os": "Linux", "difficulty": "Easy", "status": "Completed"
		});
		let wrapped = serde_json::json!({ "machine": bare.clone() });

		assert_eq!(written_machine(bare).expect("bare must decode").id, "4");
		assert_eq!(written_machine(wrapped).expect("wrapped must decode").name, "Lame");
		assert!(written_machine(serde_json::json!({ "ok": true })).is_err());
	}
}
