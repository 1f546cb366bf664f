use time::OffsetDateTime;

use crate::CatalogService;
use cyberlab_domain::{Tool, tools};

pub const TOOLS_CACHE_KEY: &str = "homepage_tools";

impl CatalogService {
	/// Homepage feed: the newest tools and payloads, served from cache while it is fresh.
	pub async fn latest_tools(&self) -> Vec<Tool> {
		let now = OffsetDateTime::now_utc();
		let store = self.store.as_ref();

		if let Some(cached) = self.tools_cache.fresh(store, now) {
			return cached;
		}

		let limit = self.cfg.cache.tools_fetch_limit;
		let (fetched_tools, fetched_payloads) = tokio::join!(
			self.providers.tools.latest_tools(limit),
			self.providers.tools.latest_payloads(limit),
		);

		if fetched_tools.is_err() && fetched_payloads.is_err() {
			tracing::warn!("Tools feed unavailable. Serving cached tools.");

			return self.tools_cache.stale(store).unwrap_or_default();
		}

		let mut combined = fetched_tools.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Failed to fetch tools.");

			Vec::new()
		});
		let payloads = fetched_payloads.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Failed to fetch payloads.");

			Vec::new()
		});

		combined.extend(payloads.into_iter().map(|payload| payload.into_tool(now)));

		let latest = tools::latest(combined, self.cfg.cache.tools_display_limit);

		if let Err(err) = self.tools_cache.put(store, latest.clone(), now) {
			tracing::warn!(error = %err, "Failed to cache tools.");
		}

		latest
	}

	/// Drops the cached feed and fetches it again.
	pub async fn refresh_tools(&self) -> Vec<Tool> {
		if let Err(err) = self.tools_cache.expire(self.store.as_ref()) {
			tracing::warn!(error = %err, "Failed to expire cached tools.");
		}

		self.latest_tools().await
	}
}
