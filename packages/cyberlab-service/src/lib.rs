pub mod aggregate;
pub mod bundled;
pub mod editor;
pub mod gate;
pub mod mutation;
pub mod notice;
pub mod refresh;
pub mod tools;
pub mod view;

mod error;

pub use aggregate::{Aggregation, FALLBACK_ADVISORY, PrimarySource, RECORDS_CACHE_KEY};
pub use editor::{EditState, StatsEditor};
pub use error::{Error, Result};
pub use gate::{AdminGate, AdminSignal};
pub use mutation::{AdminActions, AutoConfirm, Confirm, DeleteOutcome};
pub use notice::{Notice, NoticeBoard, NoticeKind};
pub use refresh::RefreshTasks;
pub use tools::TOOLS_CACHE_KEY;
pub use view::CatalogView;
pub use cyberlab_providers::SaveTarget;

use std::{
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex, MutexGuard},
	time::Duration,
};

use tokio::sync::watch;

use cyberlab_config::Config;
use cyberlab_domain::{
	CatalogSummary, Criteria, HtbStats, Machine, NewMachine, Payload, Record, Room, ThmStats, Tool,
};
use cyberlab_providers::CatalogClient;
use cyberlab_storage::{KeyValueStore, TimedCache};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ProviderResult<T> = cyberlab_providers::Result<T>;

/// Primary (machines) and secondary (rooms) record sources plus the machine write routes.
pub trait RecordStore
where
	Self: Send + Sync,
{
	fn list_machines(&self) -> BoxFuture<'_, ProviderResult<Vec<Machine>>>;

	fn list_rooms(&self) -> BoxFuture<'_, ProviderResult<Vec<Room>>>;

	fn create_machine<'a>(&'a self, machine: &'a NewMachine) -> BoxFuture<'a, ProviderResult<Machine>>;

	fn update_machine<'a>(&'a self, machine: &'a Machine) -> BoxFuture<'a, ProviderResult<Machine>>;

	fn delete_machine<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>>;
}

pub trait SessionProvider
where
	Self: Send + Sync,
{
	fn session_status(&self) -> BoxFuture<'_, ProviderResult<bool>>;
}

pub trait StatsStore<S>
where
	Self: Send + Sync,
{
	fn load(&self) -> BoxFuture<'_, ProviderResult<S>>;

	fn save<'a>(&'a self, stats: &'a S) -> BoxFuture<'a, ProviderResult<SaveTarget>>;
}

pub trait ToolFeed
where
	Self: Send + Sync,
{
	fn latest_tools(&self, limit: u32) -> BoxFuture<'_, ProviderResult<Vec<Tool>>>;

	fn latest_payloads(&self, limit: u32) -> BoxFuture<'_, ProviderResult<Vec<Payload>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub records: Arc<dyn RecordStore>,
	pub session: Arc<dyn SessionProvider>,
	pub htb_stats: Arc<dyn StatsStore<HtbStats>>,
	pub thm_stats: Arc<dyn StatsStore<ThmStats>>,
	pub tools: Arc<dyn ToolFeed>,
}
impl Providers {
	/// Every collaborator served by one HTTP client.
	pub fn http(client: CatalogClient) -> Self {
		let client = Arc::new(client);

		Self {
			records: client.clone(),
			session: client.clone(),
			htb_stats: client.clone(),
			thm_stats: client.clone(),
			tools: client,
		}
	}
}

pub struct CatalogService {
	pub cfg: Config,
	pub store: Arc<dyn KeyValueStore>,
	pub providers: Providers,
	pub gate: Arc<AdminGate>,
	pub signal: AdminSignal,
	pub notices: NoticeBoard,
	htb: StatsEditor<HtbStats>,
	thm: StatsEditor<ThmStats>,
	view: Mutex<CatalogView>,
	catalog: watch::Sender<Aggregation>,
	records_cache: TimedCache<Vec<Machine>>,
	tools_cache: TimedCache<Vec<Tool>>,
}
impl CatalogService {
	pub fn new(cfg: Config, store: Arc<dyn KeyValueStore>, providers: Providers) -> Self {
		let notices = NoticeBoard::new(Duration::from_millis(cfg.notices.success_clear_ms));
		let gate = Arc::new(AdminGate::new(
			providers.session.clone(),
			Duration::from_millis(cfg.refresh.session_timeout_ms),
		));
		let htb = StatsEditor::new(providers.htb_stats.clone(), notices.clone(), HtbStats::default());
		let thm = StatsEditor::new(providers.thm_stats.clone(), notices.clone(), ThmStats::default());
		let records_cache = TimedCache::new(
			RECORDS_CACHE_KEY,
			Duration::from_secs(cfg.cache.records_ttl_seconds),
		);
		let tools_cache =
			TimedCache::new(TOOLS_CACHE_KEY, Duration::from_secs(cfg.cache.tools_ttl_seconds));
		let (catalog, _) = watch::channel(Aggregation::default());

		Self {
			cfg,
			store,
			providers,
			gate,
			signal: AdminSignal::new(),
			notices,
			htb,
			thm,
			view: Mutex::new(CatalogView::default()),
			catalog,
			records_cache,
			tools_cache,
		}
	}

	/// Latest aggregation, patched in place by confirmed mutations.
	pub fn subscribe_catalog(&self) -> watch::Receiver<Aggregation> {
		self.catalog.subscribe()
	}

	pub fn records(&self) -> Vec<Record> {
		self.lock_view().records().to_vec()
	}

	pub fn visible(&self) -> Vec<Record> {
		self.lock_view().visible().to_vec()
	}

	pub fn summary(&self) -> CatalogSummary {
		self.lock_view().summary()
	}

	pub fn recent(&self) -> Vec<Record> {
		self.lock_view().recent(self.cfg.catalog.recent_limit)
	}

	pub fn criteria(&self) -> Criteria {
		self.lock_view().criteria().clone()
	}

	pub fn set_criteria(&self, criteria: Criteria) {
		self.lock_view().set_criteria(criteria);
	}

	pub fn clear_criteria(&self) {
		self.lock_view().clear_criteria();
	}

	pub fn htb_stats(&self) -> HtbStats {
		self.htb.current()
	}

	pub fn thm_stats(&self) -> ThmStats {
		self.thm.current()
	}

	pub fn subscribe_htb_stats(&self) -> watch::Receiver<HtbStats> {
		self.htb.subscribe()
	}

	pub fn subscribe_thm_stats(&self) -> watch::Receiver<ThmStats> {
		self.thm.subscribe()
	}

	/// Reloads both statistics snapshots concurrently. A failed load keeps the current snapshot.
	pub async fn refresh_stats(&self) {
		let (htb, thm) = tokio::join!(self.providers.htb_stats.load(), self.providers.thm_stats.load());

		match htb {
			Ok(stats) => self.htb.replace_current(stats),
			Err(err) => tracing::warn!(error = %err, "Failed to load HTB stats. Keeping current."),
		}
		match thm {
			Ok(stats) => self.thm.replace_current(stats),
			Err(err) => tracing::warn!(error = %err, "Failed to load THM stats. Keeping current."),
		}
	}

	/// Mutation entry points, available only while the admin gate is open.
	pub fn admin_actions(&self) -> Option<AdminActions<'_>> {
		self.gate.is_admin().then(|| AdminActions::new(self))
	}

	/// Like [`Self::admin_actions`], failing with [`Error::AdminRequired`] while the gate is closed.
	pub fn require_admin(&self) -> Result<AdminActions<'_>> {
		self.admin_actions().ok_or(Error::AdminRequired)
	}

	pub(crate) fn htb_editor(&self) -> &StatsEditor<HtbStats> {
		&self.htb
	}

	pub(crate) fn thm_editor(&self) -> &StatsEditor<ThmStats> {
		&self.thm
	}

	/// Applies a confirmed write to the canonical collection and republishes the catalog.
	///
	/// The cached primary list predates the write, so it is expired and the next aggregation
	/// reads the store again.
	pub(crate) fn patch_catalog<T>(&self, patch: impl FnOnce(&mut CatalogView) -> T) -> T {
		if let Err(err) = self.records_cache.expire(self.store.as_ref()) {
			tracing::warn!(error = %err, "Failed to expire cached primary machines.");
		}

		let (out, records, recent) = {
			let mut view = self.lock_view();
			let out = patch(&mut view);

			(out, view.records().to_vec(), view.recent(self.cfg.catalog.recent_limit))
		};

		self.catalog.send_modify(|catalog| {
			catalog.records = records;
			catalog.recent = recent;
		});

		out
	}

	fn lock_view(&self) -> MutexGuard<'_, CatalogView> {
		self.view.lock().unwrap_or_else(|err| err.into_inner())
	}
}

impl RecordStore for CatalogClient {
	fn list_machines(&self) -> BoxFuture<'_, ProviderResult<Vec<Machine>>> {
		Box::pin(CatalogClient::list_machines(self))
	}

	fn list_rooms(&self) -> BoxFuture<'_, ProviderResult<Vec<Room>>> {
		Box::pin(CatalogClient::list_rooms(self))
	}

	fn create_machine<'a>(&'a self, machine: &'a NewMachine) -> BoxFuture<'a, ProviderResult<Machine>> {
		Box::pin(CatalogClient::create_machine(self, machine))
	}

	fn update_machine<'a>(&'a self, machine: &'a Machine) -> BoxFuture<'a, ProviderResult<Machine>> {
		Box::pin(CatalogClient::update_machine(self, machine))
	}

	fn delete_machine<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
		Box::pin(CatalogClient::delete_machine(self, id))
	}
}

impl SessionProvider for CatalogClient {
	fn session_status(&self) -> BoxFuture<'_, ProviderResult<bool>> {
		Box::pin(CatalogClient::session_status(self))
	}
}

impl StatsStore<HtbStats> for CatalogClient {
	fn load(&self) -> BoxFuture<'_, ProviderResult<HtbStats>> {
		Box::pin(self.htb_stats())
	}

	fn save<'a>(&'a self, stats: &'a HtbStats) -> BoxFuture<'a, ProviderResult<SaveTarget>> {
		Box::pin(self.save_htb_stats(stats))
	}
}

impl StatsStore<ThmStats> for CatalogClient {
	fn load(&self) -> BoxFuture<'_, ProviderResult<ThmStats>> {
		Box::pin(self.thm_stats())
	}

	fn save<'a>(&'a self, stats: &'a ThmStats) -> BoxFuture<'a, ProviderResult<SaveTarget>> {
		Box::pin(async move {
			self.save_thm_stats(stats).await?;

			Ok(SaveTarget::Database)
		})
	}
}

impl ToolFeed for CatalogClient {
	fn latest_tools(&self, limit: u32) -> BoxFuture<'_, ProviderResult<Vec<Tool>>> {
		Box::pin(CatalogClient::latest_tools(self, limit))
	}

	fn latest_payloads(&self, limit: u32) -> BoxFuture<'_, ProviderResult<Vec<Payload>>> {
		Box::pin(CatalogClient::latest_payloads(self, limit))
	}
}
