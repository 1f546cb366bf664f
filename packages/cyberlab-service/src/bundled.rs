//! Machine list shipped with the binary, used when the primary store cannot be reached.

use cyberlab_domain::Machine;

const MACHINES_JSON: &str = include_str!("../data/machines.json");

pub fn machines() -> Vec<Machine> {
	match serde_json::from_str(MACHINES_JSON) {
		Ok(machines) => machines,
		Err(err) => {
			tracing::error!(error = %err, "Bundled machine list is unreadable.");

			Vec::new()
		},
	}
}
