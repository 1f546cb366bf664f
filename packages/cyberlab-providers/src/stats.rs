use crate::{CatalogClient, Error, Result};
use cyberlab_domain::{HtbStats, ThmStats};

pub const HTB_STATS_PATH: &str = "/api/admin/htb-stats-d1";
pub const THM_STATS_PATH: &str = "/api/admin/thm-stats-d1";
/// Older HTB profile routes, used when the database routes answer with an error status.
pub const HTB_PROFILE_PATH: &str = "/api/htb-profile";
pub const HTB_STATS_FALLBACK_PATH: &str = "/api/admin/htb-stats";

/// Which route accepted a statistics write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
	Database,
	Fallback,
}

impl CatalogClient {
	/// Reads the HTB snapshot, falling back to the profile route when the database route
	/// rejects the read. Transport failures are not retried.
	pub async fn htb_stats(&self) -> Result<HtbStats> {
		let res = self.http().get(self.url(HTB_STATS_PATH)).send().await?;

		match crate::read_json(res).await {
			Err(err @ Error::Rejected { .. }) => {
				tracing::warn!(error = %err, "HTB stats read rejected. Trying the profile route.");

				let res = self.http().get(self.url(HTB_PROFILE_PATH)).send().await?;

				crate::read_json(res).await
			},
			other => other,
		}
	}

	/// Writes the snake_case snapshot to the database route. On rejection the camelCase body goes
	/// to the fallback route instead.
	pub async fn save_htb_stats(&self, stats: &HtbStats) -> Result<SaveTarget> {
		let res = self.http().post(self.url(HTB_STATS_PATH)).json(stats).send().await?;
		let err = match crate::expect_success(res).await {
			Ok(_) => return Ok(SaveTarget::Database),
			Err(err @ Error::Rejected { .. }) => err,
			Err(err) => return Err(err),
		};

		tracing::warn!(error = %err, "HTB stats write rejected. Trying the fallback route.");

		let res = self
			.http()
			.post(self.url(HTB_STATS_FALLBACK_PATH))
			.json(&stats.camel_case())
			.send()
			.await?;

		crate::expect_success(res).await?;

		Ok(SaveTarget::Fallback)
	}

	pub async fn thm_stats(&self) -> Result<ThmStats> {
		let res = self.http().get(self.url(THM_STATS_PATH)).send().await?;

		crate::read_json(res).await
	}

	pub async fn save_thm_stats(&self, stats: &ThmStats) -> Result<()> {
		let res = self.http().post(self.url(THM_STATS_PATH)).json(stats).send().await?;

		crate::expect_success(res).await?;

		Ok(())
	}
}
