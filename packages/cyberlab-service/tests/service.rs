use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Map;
use time::OffsetDateTime;

use cyberlab_config::{Cache, Catalog, Config, Notices, Refresh, Service, Session, Storage};
use cyberlab_domain::{
	Choice, Criteria, Difficulty, HtbStats, Machine, NewMachine, Os, Payload, Platform, Room,
	Status, ThmStats, Tool,
};
use cyberlab_providers::Error as ProviderError;
use cyberlab_service::{
	AutoConfirm, BoxFuture, CatalogService, Confirm, DeleteOutcome, FALLBACK_ADVISORY, NoticeKind,
	PrimarySource, ProviderResult, Providers, RECORDS_CACHE_KEY, RecordStore, RefreshTasks,
	SaveTarget, SessionProvider, StatsStore, TOOLS_CACHE_KEY, ToolFeed,
};
use cyberlab_storage::{KeyValueStore, MemoryStore, TimedCache, overlay};

fn test_config() -> Config {
	Config {
		service: Service {
			api_base: "http://127.0.0.1:1".to_string(),
			log_level: "info".to_string(),
			timeout_ms: 1_000,
		},
		session: Session { cookie: None, default_headers: Map::new() },
		storage: Storage { state_path: "unused.json".to_string() },
		catalog: Catalog::default(),
		cache: Cache::default(),
		refresh: Refresh::default(),
		notices: Notices::default(),
	}
}

fn machine(id: &str, name: &str, status: Status, date: Option<&str>) -> Machine {
	Machine {
		id: id.to_string(),
		name: name.to_string(),
		os: Os::Linux,
		difficulty: Difficulty::Easy,
		status,
		date_completed: date.map(str::to_string),
		tags: vec!["web".to_string()],
		writeup: None,
	}
}

fn room(id: &str, title: &str) -> Room {
	serde_json::from_value(serde_json::json!({
		"id": id,
		"title": title,
		"difficulty": "Medium",
		"status": "Completed",
		"date_completed": "2024-04-01",
		"tags": "linux, privesc"
	}))
	.expect("room fixture must decode")
}

fn rejected(status: u16, message: &str) -> ProviderError {
	ProviderError::Rejected { status, message: Some(message.to_string()) }
}

#[derive(Default)]
struct FakeRecords {
	machines: Mutex<Option<Vec<Machine>>>,
	rooms: Mutex<Option<Vec<Room>>>,
	reject_writes: Mutex<Option<(u16, String)>>,
	list_calls: AtomicUsize,
	writes: Mutex<Vec<String>>,
}
impl FakeRecords {
	fn serving(machines: Vec<Machine>, rooms: Vec<Room>) -> Self {
		let fake = Self::default();

		*fake.machines.lock().expect("lock") = Some(machines);
		*fake.rooms.lock().expect("lock") = Some(rooms);

		fake
	}

	fn fail_machines(&self) {
		*self.machines.lock().expect("lock") = None;
	}

	fn reject_writes(&self, status: u16, message: &str) {
		*self.reject_writes.lock().expect("lock") = Some((status, message.to_string()));
	}

	fn writes(&self) -> Vec<String> {
		self.writes.lock().expect("lock").clone()
	}

	fn write(&self, entry: String) -> ProviderResult<()> {
		self.writes.lock().expect("lock").push(entry);

		match self.reject_writes.lock().expect("lock").clone() {
			Some((status, message)) => Err(rejected(status, &message)),
			None => Ok(()),
		}
	}
}
impl RecordStore for FakeRecords {
	fn list_machines(&self) -> BoxFuture<'_, ProviderResult<Vec<Machine>>> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);

		let machines = self.machines.lock().expect("lock").clone();

		Box::pin(async move { machines.ok_or_else(|| rejected(500, "primary down")) })
	}

	fn list_rooms(&self) -> BoxFuture<'_, ProviderResult<Vec<Room>>> {
		let rooms = self.rooms.lock().expect("lock").clone();

		Box::pin(async move { rooms.ok_or_else(|| rejected(500, "secondary down")) })
	}

	fn create_machine<'a>(&'a self, machine: &'a NewMachine) -> BoxFuture<'a, ProviderResult<Machine>> {
		Box::pin(async move {
			self.write(format!("POST {}", machine.name))?;

			Ok(Machine {
				id: "new-1".to_string(),
				name: machine.name.clone(),
				os: machine.os.clone(),
				difficulty: machine.difficulty.clone(),
				status: machine.status.clone(),
				date_completed: machine.date_completed.clone(),
				tags: machine.tags.clone(),
				writeup: machine.writeup.clone(),
			})
		})
	}

	fn update_machine<'a>(&'a self, machine: &'a Machine) -> BoxFuture<'a, ProviderResult<Machine>> {
		Box::pin(async move {
			self.write(format!("PUT {}", machine.id))?;

			Ok(machine.clone())
		})
	}

	fn delete_machine<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
		Box::pin(async move { self.write(format!("DELETE {id}")) })
	}
}

struct FakeSession {
	answer: Mutex<Option<bool>>,
}
impl FakeSession {
	fn new(answer: Option<bool>) -> Self {
		Self { answer: Mutex::new(answer) }
	}
}
impl SessionProvider for FakeSession {
	fn session_status(&self) -> BoxFuture<'_, ProviderResult<bool>> {
		let answer = *self.answer.lock().expect("lock");

		Box::pin(async move { answer.ok_or_else(|| rejected(500, "session service down")) })
	}
}

struct FakeStats<S> {
	stored: Mutex<Option<S>>,
}
impl<S> StatsStore<S> for FakeStats<S>
where
	S: Clone + Send + Sync,
{
	fn load(&self) -> BoxFuture<'_, ProviderResult<S>> {
		let stored = self.stored.lock().expect("lock").clone();

		Box::pin(async move { stored.ok_or_else(|| rejected(500, "stats down")) })
	}

	fn save<'a>(&'a self, stats: &'a S) -> BoxFuture<'a, ProviderResult<SaveTarget>> {
		*self.stored.lock().expect("lock") = Some(stats.clone());

		Box::pin(async { Ok(SaveTarget::Database) })
	}
}

#[derive(Default)]
struct FakeTools {
	tools: Mutex<Option<Vec<Tool>>>,
	payloads: Mutex<Option<Vec<Payload>>>,
	calls: AtomicUsize,
}
impl ToolFeed for FakeTools {
	fn latest_tools(&self, _limit: u32) -> BoxFuture<'_, ProviderResult<Vec<Tool>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let tools = self.tools.lock().expect("lock").clone();

		Box::pin(async move { tools.ok_or_else(|| rejected(500, "tools down")) })
	}

	fn latest_payloads(&self, _limit: u32) -> BoxFuture<'_, ProviderResult<Vec<Payload>>> {
		let payloads = self.payloads.lock().expect("lock").clone();

		Box::pin(async move { payloads.ok_or_else(|| rejected(500, "payloads down")) })
	}
}

struct Decline;
impl Confirm for Decline {
	fn confirm(&self, _prompt: &str) -> bool {
		false
	}
}

struct Harness {
	service: CatalogService,
	records: Arc<FakeRecords>,
	session: Arc<FakeSession>,
	tools: Arc<FakeTools>,
	store: Arc<MemoryStore>,
}

fn harness_with(cfg: Config, records: FakeRecords, admin: Option<bool>) -> Harness {
	let records = Arc::new(records);
	let session = Arc::new(FakeSession::new(admin));
	let tools = Arc::new(FakeTools::default());
	let store = Arc::new(MemoryStore::new());
	let providers = Providers {
		records: records.clone(),
		session: session.clone(),
		htb_stats: Arc::new(FakeStats::<HtbStats> { stored: Mutex::new(None) }),
		thm_stats: Arc::new(FakeStats::<ThmStats> { stored: Mutex::new(None) }),
		tools: tools.clone(),
	};
	let service = CatalogService::new(cfg, store.clone(), providers);

	Harness { service, records, session, tools, store }
}

fn harness(records: FakeRecords, admin: Option<bool>) -> Harness {
	harness_with(test_config(), records, admin)
}

fn ids(records: &[cyberlab_domain::Record]) -> Vec<&str> {
	records.iter().map(|record| record.id.as_str()).collect()
}

#[tokio::test]
async fn overlay_replaces_remote_record_in_place() {
	let h = harness(
		FakeRecords::serving(
			vec![
				machine("m1", "Remote", Status::Completed, Some("2024-01-01")),
				machine("m2", "Other", Status::InProgress, None),
			],
			vec![room("r1", "Pickle Rick")],
		),
		Some(false),
	);

	overlay::save(h.store.as_ref(), &[machine("m1", "Local", Status::InProgress, None)])
		.expect("overlay must save");

	let aggregation = h.service.load_catalog().await;

	assert_eq!(ids(&aggregation.records), ["m1", "m2", "r1"]);
	assert_eq!(aggregation.records[0].name, "Local");
	assert_eq!(aggregation.records[0].status, Status::InProgress);
	assert_eq!(aggregation.records[0].platform, Platform::Htb);
	assert_eq!(aggregation.records[2].platform, Platform::Thm);
	assert_eq!(aggregation.records[2].name, "Pickle Rick");
	assert_eq!(aggregation.records[2].tags, vec!["linux", "privesc"]);
	assert_eq!(aggregation.advisory, None);
	assert_eq!(h.service.records(), aggregation.records);
}

#[tokio::test]
async fn failing_secondary_source_contributes_nothing() {
	let records =
		FakeRecords::serving(vec![machine("m1", "Lame", Status::Completed, None)], Vec::new());

	*records.rooms.lock().expect("lock") = None;

	let h = harness(records, Some(false));

	overlay::save(h.store.as_ref(), &[machine("m9", "Local", Status::Completed, None)])
		.expect("overlay must save");

	let aggregation = h.service.load_catalog().await;

	assert_eq!(ids(&aggregation.records), ["m1", "m9"]);
	assert_eq!(aggregation.primary, PrimarySource::Remote);
	assert_eq!(aggregation.advisory, None);
}

#[tokio::test]
async fn fresh_cache_skips_the_primary_source() {
	let h = harness(
		FakeRecords::serving(vec![machine("m1", "Lame", Status::Completed, None)], Vec::new()),
		Some(false),
	);

	assert_eq!(h.service.load_catalog().await.primary, PrimarySource::Remote);
	assert_eq!(h.service.load_catalog().await.primary, PrimarySource::Cache);
	assert_eq!(h.records.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn primary_failure_falls_back_to_stale_cache_then_bundled() {
	let h = harness(FakeRecords::serving(Vec::new(), Vec::new()), Some(false));
	let cache =
		TimedCache::<Vec<Machine>>::new(RECORDS_CACHE_KEY, Duration::from_secs(300));

	h.records.fail_machines();

	let bundled = h.service.load_catalog().await;

	assert_eq!(bundled.primary, PrimarySource::Bundled);
	assert_eq!(bundled.advisory.as_deref(), Some(FALLBACK_ADVISORY));
	assert!(!bundled.records.is_empty());

	cache
		.put(
			h.store.as_ref(),
			vec![machine("c1", "Cached", Status::Completed, None)],
			OffsetDateTime::now_utc() - time::Duration::hours(1),
		)
		.expect("cache must accept entry");

	let stale = h.service.load_catalog().await;

	assert_eq!(stale.primary, PrimarySource::StaleCache);
	assert_eq!(ids(&stale.records), ["c1"]);
	assert_eq!(stale.advisory.as_deref(), Some(FALLBACK_ADVISORY));
}

#[tokio::test]
async fn without_bundled_data_a_dead_primary_yields_nothing() {
	let mut cfg = test_config();

	cfg.catalog.use_bundled = false;

	let h = harness_with(cfg, FakeRecords::serving(Vec::new(), Vec::new()), Some(false));
	let aggregation = h.service.load_catalog().await;

	assert_eq!(aggregation.primary, PrimarySource::Unavailable);
	assert!(aggregation.records.is_empty());
	assert_eq!(aggregation.advisory.as_deref(), Some(FALLBACK_ADVISORY));
}

#[tokio::test]
async fn recently_completed_takes_the_newest_three() {
	let h = harness(
		FakeRecords::serving(
			vec![
				machine("a", "A", Status::Completed, Some("2024-01-01")),
				machine("b", "B", Status::Completed, Some("2024-06-01")),
				machine("c", "C", Status::Completed, Some("2025-01-01")),
				machine("d", "D", Status::InProgress, Some("2025-06-01")),
			],
			Vec::new(),
		),
		Some(false),
	);
	let aggregation = h.service.load_catalog().await;

	assert_eq!(ids(&aggregation.recent), ["c", "b", "a"]);
	assert_eq!(ids(&h.service.recent()), ["c", "b", "a"]);
}

#[tokio::test]
async fn criteria_filter_the_visible_projection() {
	let mut windows = machine("w1", "Blue", Status::Completed, None);

	windows.os = Os::Windows;
	windows.tags = vec!["eternalblue".to_string()];

	let h = harness(
		FakeRecords::serving(
			vec![machine("l1", "Lame", Status::Completed, None), windows],
			Vec::new(),
		),
		Some(false),
	);

	h.service.load_catalog().await;
	h.service.set_criteria(Criteria { search: "ETERNAL".to_string(), ..Criteria::default() });

	assert_eq!(ids(&h.service.visible()), ["w1"]);

	h.service.set_criteria(Criteria { os: Choice::Only(Os::Linux), ..Criteria::default() });

	assert_eq!(ids(&h.service.visible()), ["l1"]);

	h.service.clear_criteria();

	assert_eq!(h.service.visible().len(), 2);
	assert_eq!(h.service.summary().total, 2);
	assert_eq!(h.service.summary().completed, 2);
}

#[tokio::test]
async fn failing_session_check_closes_the_gate() {
	let h = harness(FakeRecords::default(), None);

	assert!(!h.service.gate.check().await);
	assert!(h.service.admin_actions().is_none());
	assert!(matches!(h.service.require_admin(), Err(cyberlab_service::Error::AdminRequired)));

	*h.session.answer.lock().expect("lock") = Some(true);

	assert!(h.service.gate.check().await);
	assert!(h.service.admin_actions().is_some());
}

#[tokio::test]
async fn admin_signal_triggers_a_recheck() {
	let h = harness(FakeRecords::default(), Some(true));
	let gate = h.service.gate.clone();
	let follower = gate.clone().follow(&h.service.signal);
	let mut flag = gate.subscribe();

	h.service.signal.publish();
	tokio::time::timeout(Duration::from_secs(5), flag.changed())
		.await
		.expect("gate must re-check")
		.expect("gate must stay alive");

	assert!(gate.is_admin());

	follower.abort();
}

#[tokio::test]
async fn delete_requires_confirmation() {
	let h = harness(
		FakeRecords::serving(
			vec![
				machine("m1", "Lame", Status::Completed, None),
				machine("m2", "Legacy", Status::Completed, None),
			],
			Vec::new(),
		),
		Some(true),
	);

	h.service.load_catalog().await;
	h.service.gate.check().await;

	let actions = h.service.admin_actions().expect("gate must be open");

	assert_eq!(actions.delete("m1", &Decline).await.expect("delete must run"), DeleteOutcome::Declined);
	assert!(h.records.writes().is_empty());
	assert_eq!(
		actions.delete("m1", &AutoConfirm).await.expect("delete must run"),
		DeleteOutcome::Deleted
	);
	assert_eq!(h.records.writes(), ["DELETE m1"]);
	assert_eq!(ids(&h.service.records()), ["m2"]);
	assert_eq!(h.service.notices.current().map(|notice| notice.kind), Some(NoticeKind::Success));
}

#[tokio::test]
async fn create_and_update_patch_the_collection() {
	let h = harness(
		FakeRecords::serving(vec![machine("m1", "Lame", Status::InProgress, None)], Vec::new()),
		Some(true),
	);

	h.service.load_catalog().await;
	h.service.gate.check().await;

	let actions = h.service.admin_actions().expect("gate must be open");
	let created = actions
		.create(NewMachine {
			name: "Jerry".to_string(),
			os: Os::Windows,
			difficulty: Difficulty::Easy,
			status: Status::Completed,
			date_completed: Some("2025-02-02".to_string()),
			tags: vec!["tomcat".to_string()],
			writeup: None,
		})
		.await
		.expect("create must succeed");

	assert_eq!(created.platform, Platform::Htb);
	assert_eq!(ids(&h.service.records()), ["m1", "new-1"]);
	assert_eq!(ids(&h.service.subscribe_catalog().borrow().recent), ["new-1"]);

	let mut edited = machine("m1", "Lame", Status::Completed, Some("2025-03-03"));

	edited.tags = vec!["smb".to_string()];
	actions.update(edited).await.expect("update must succeed");

	let records = h.service.records();

	assert_eq!(ids(&records), ["m1", "new-1"]);
	assert_eq!(records[0].status, Status::Completed);
	assert_eq!(records[0].tags, vec!["smb"]);
}

#[tokio::test]
async fn confirmed_writes_survive_the_next_aggregation() {
	let h = harness(
		FakeRecords::serving(
			vec![
				machine("m1", "Lame", Status::Completed, None),
				machine("m2", "Legacy", Status::Completed, None),
			],
			Vec::new(),
		),
		Some(true),
	);

	h.service.load_catalog().await;
	h.service.gate.check().await;

	let actions = h.service.admin_actions().expect("gate must be open");

	assert_eq!(
		actions.delete("m1", &AutoConfirm).await.expect("delete must run"),
		DeleteOutcome::Deleted
	);
	assert_eq!(h.store.get(RECORDS_CACHE_KEY).expect("store must read"), None);

	*h.records.machines.lock().expect("lock") =
		Some(vec![machine("m2", "Legacy", Status::Completed, None)]);

	let aggregation = h.service.load_catalog().await;

	assert_eq!(ids(&aggregation.records), ["m2"]);
	assert_eq!(aggregation.primary, PrimarySource::Remote);

	actions
		.create(NewMachine {
			name: "Jerry".to_string(),
			os: Os::Windows,
			difficulty: Difficulty::Easy,
			status: Status::InProgress,
			date_completed: None,
			tags: Vec::new(),
			writeup: None,
		})
		.await
		.expect("create must succeed");
	*h.records.machines.lock().expect("lock") = Some(vec![
		machine("m2", "Legacy", Status::Completed, None),
		machine("new-1", "Jerry", Status::InProgress, None),
	]);

	let aggregation = h.service.load_catalog().await;

	assert_eq!(ids(&aggregation.records), ["m2", "new-1"]);
	assert_eq!(aggregation.primary, PrimarySource::Remote);
	assert_eq!(h.records.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unavailable_store_posts_an_advisory_and_keeps_state() {
	let h = harness(
		FakeRecords::serving(vec![machine("m1", "Lame", Status::InProgress, None)], Vec::new()),
		Some(true),
	);

	h.service.load_catalog().await;
	h.service.gate.check().await;
	h.records.reject_writes(503, "Database not available - D1 binding missing");

	let actions = h.service.admin_actions().expect("gate must be open");

	assert!(actions.update(machine("m1", "Renamed", Status::Completed, None)).await.is_err());
	assert_eq!(h.service.records()[0].name, "Lame");
	assert_eq!(h.service.notices.current().map(|notice| notice.kind), Some(NoticeKind::Advisory));

	h.records.reject_writes(500, "constraint failed");

	assert_eq!(
		actions.delete("m1", &AutoConfirm).await.expect("delete must run"),
		DeleteOutcome::Rejected
	);

	let notice = h.service.notices.current().expect("notice must be posted");

	assert_eq!(notice.kind, NoticeKind::Error);
	assert_eq!(notice.message, "Failed to delete machine: constraint failed");
	assert_eq!(ids(&h.service.records()), ["m1"]);
}

#[tokio::test(start_paused = true)]
async fn refresh_tasks_pick_up_overlay_edits_until_dropped() {
	let h = harness(
		FakeRecords::serving(vec![machine("m1", "Lame", Status::Completed, None)], Vec::new()),
		Some(false),
	);
	let service =
		Arc::new(CatalogService::new(test_config(), h.store.clone(), h.service.providers.clone()));
	let mut catalog = service.subscribe_catalog();
	let tasks = RefreshTasks::spawn(service.clone());

	tokio::time::timeout(
		Duration::from_secs(120),
		catalog.wait_for(|aggregation| ids(&aggregation.records) == ["m1"]),
	)
	.await
	.expect("first refresh must land")
	.expect("catalog channel must stay open");

	overlay::save(h.store.as_ref(), &[machine("m9", "Local", Status::InProgress, None)])
		.expect("overlay must save");
	tokio::time::timeout(
		Duration::from_secs(120),
		catalog.wait_for(|aggregation| ids(&aggregation.records) == ["m1", "m9"]),
	)
	.await
	.expect("overlay edit must be aggregated")
	.expect("catalog channel must stay open");

	drop(tasks);
	tokio::task::yield_now().await;
	overlay::save(h.store.as_ref(), &[machine("m10", "Late", Status::InProgress, None)])
		.expect("overlay must save");
	tokio::time::sleep(Duration::from_secs(120)).await;

	assert_eq!(ids(&service.records()), ["m1", "m9"]);
}

#[tokio::test]
async fn stats_refresh_adopts_loaded_snapshots() {
	let h = harness(FakeRecords::default(), Some(true));
	let mut loaded = HtbStats::default();

	loaded.machines_pwned = 150;

	let providers = Providers {
		htb_stats: Arc::new(FakeStats { stored: Mutex::new(Some(loaded)) }),
		..h.service.providers.clone()
	};
	let service = CatalogService::new(test_config(), h.store.clone(), providers);

	service.refresh_stats().await;

	assert_eq!(service.htb_stats().machines_pwned, 150);
	// THM load fails; the default snapshot stays.
	assert_eq!(service.thm_stats().rooms_completed, 5);
}

#[tokio::test]
async fn stats_fields_are_edited_through_admin_actions() {
	let h = harness(FakeRecords::default(), Some(true));

	h.service.gate.check().await;

	let actions = h.service.admin_actions().expect("gate must be open");
	let editor = actions.htb_stats();

	editor.edit_field("final_score".parse().expect("field must parse")).expect("edit must start");
	editor.set_draft("1200").expect("draft must parse");

	let saved = editor.save_field().await.expect("save must succeed");

	assert_eq!(saved.final_score, 1_200);
	assert_eq!(h.service.htb_stats().final_score, 1_200);
	assert_eq!(h.service.subscribe_htb_stats().borrow().final_score, 1_200);
}

fn tool(id: &str, name: &str, updated: &str, stars: u64) -> Tool {
	Tool {
		id: id.to_string(),
		name: name.to_string(),
		description: String::new(),
		link: None,
		tags: Vec::new(),
		stars: Some(stars),
		language: None,
		last_updated: Some(updated.to_string()),
		published_at: None,
	}
}

#[tokio::test]
async fn tools_feed_merges_dedupes_and_caches() {
	let h = harness(FakeRecords::default(), Some(false));

	*h.tools.tools.lock().expect("lock") = Some(vec![
		tool("t1", "nmap", "2025-01-01", 10),
		tool("t2", "ffuf", "2025-03-01", 5),
		tool("t3", "nmap", "2025-04-01", 99),
		tool("t4", "sqlmap", "2025-03-01", 50),
	]);
	*h.tools.payloads.lock().expect("lock") = Some(vec![
		serde_json::from_value(serde_json::json!({
			"id": "p1",
			"name": "revshell",
			"lastUpdated": "2024-12-01"
		}))
		.expect("payload must decode"),
	]);

	let latest = h.service.latest_tools().await;
	let names: Vec<_> = latest.iter().map(|tool| tool.name.as_str()).collect();

	assert_eq!(names, ["sqlmap", "ffuf", "nmap"]);
	assert!(h.store.get(TOOLS_CACHE_KEY).expect("get must succeed").is_some());

	*h.tools.tools.lock().expect("lock") = None;
	*h.tools.payloads.lock().expect("lock") = None;

	assert_eq!(h.service.latest_tools().await, latest);
	assert_eq!(h.tools.calls.load(Ordering::SeqCst), 1);

	// Forced refresh drops the cache; with both feeds down nothing is left to serve.
	assert!(h.service.refresh_tools().await.is_empty());
	assert_eq!(h.tools.calls.load(Ordering::SeqCst), 2);
}
