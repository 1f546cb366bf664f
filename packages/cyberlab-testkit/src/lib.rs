//! In-process stand-in for the site's database service, used by integration tests.

mod error;

pub use error::{Error, Result};

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use axum::{
	Json, Router,
	extract::{Query, Request, State},
	http::{HeaderMap, Method, StatusCode, header::COOKIE},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing,
};
use serde_json::Value;
use tokio::{
	net::TcpListener,
	sync::{oneshot, oneshot::Sender},
};

pub const AUTH_PATH: &str = "/api/admin/auth";
pub const MACHINES_PATH: &str = "/api/admin/htb-machines-d1";
pub const ROOMS_PATH: &str = "/api/admin/thm-rooms-d1";
pub const HTB_STATS_PATH: &str = "/api/admin/htb-stats-d1";
pub const THM_STATS_PATH: &str = "/api/admin/thm-stats-d1";
pub const HTB_PROFILE_PATH: &str = "/api/htb-profile";
pub const HTB_STATS_FALLBACK_PATH: &str = "/api/admin/htb-stats";
pub const TOOLS_PATH: &str = "/api/tools/latest";
pub const PAYLOADS_PATH: &str = "/api/tools/payloads";

/// How write routes answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WriteMode {
	#[default]
	Accept,
	/// 503 with the store's "no database bound" message.
	Unavailable,
	/// 500 with the given `error` message.
	Reject(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
	pub method: Method,
	pub path: String,
	pub query: Option<String>,
	pub cookie: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
	machines: Vec<Value>,
	rooms: Vec<Value>,
	htb_stats: Value,
	htb_profile: Value,
	htb_fallback: Value,
	thm_stats: Value,
	tools: Vec<Value>,
	payloads: Vec<Value>,
	authenticated: bool,
	write_mode: WriteMode,
	failing: HashMap<String, u16>,
	requests: Vec<RecordedRequest>,
	next_id: u64,
}

/// Shared state behind the stub routes. Items are raw JSON so tests can seed malformed data.
#[derive(Debug, Default)]
pub struct StubState {
	inner: Mutex<Inner>,
}
impl StubState {
	pub fn set_machines(&self, machines: Vec<Value>) {
		self.lock().machines = machines;
	}

	pub fn machines(&self) -> Vec<Value> {
		self.lock().machines.clone()
	}

	pub fn set_rooms(&self, rooms: Vec<Value>) {
		self.lock().rooms = rooms;
	}

	pub fn set_htb_stats(&self, stats: Value) {
		self.lock().htb_stats = stats;
	}

	pub fn htb_stats(&self) -> Value {
		self.lock().htb_stats.clone()
	}

	/// Body served by the older profile route.
	pub fn set_htb_profile(&self, stats: Value) {
		self.lock().htb_profile = stats;
	}

	/// Last body written to the fallback route; `null` until then.
	pub fn htb_fallback(&self) -> Value {
		self.lock().htb_fallback.clone()
	}

	pub fn set_thm_stats(&self, stats: Value) {
		self.lock().thm_stats = stats;
	}

	pub fn thm_stats(&self) -> Value {
		self.lock().thm_stats.clone()
	}

	pub fn set_tools(&self, tools: Vec<Value>) {
		self.lock().tools = tools;
	}

	pub fn set_payloads(&self, payloads: Vec<Value>) {
		self.lock().payloads = payloads;
	}

	pub fn set_authenticated(&self, authenticated: bool) {
		self.lock().authenticated = authenticated;
	}

	pub fn set_write_mode(&self, mode: WriteMode) {
		self.lock().write_mode = mode;
	}

	/// Makes every request to `path` answer with `status`.
	pub fn fail(&self, path: &str, status: u16) {
		self.lock().failing.insert(path.to_string(), status);
	}

	pub fn recover(&self, path: &str) {
		self.lock().failing.remove(path);
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.lock().requests.clone()
	}

	pub fn request_count(&self, method: Method, path: &str) -> usize {
		self.lock().requests.iter().filter(|req| req.method == method && req.path == path).count()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner())
	}
}

pub struct StubStore {
	base_url: String,
	state: Arc<StubState>,
	shutdown: Option<Sender<()>>,
}
impl StubStore {
	pub async fn start() -> Result<Self> {
		let state = Arc::new(StubState::default());
		let app = router(state.clone());
		let listener = TcpListener::bind("127.0.0.1:0").await?;
		let addr = listener.local_addr()?;
		let (tx, rx) = oneshot::channel();
		let server = axum::serve(listener, app).with_graceful_shutdown(async move {
			let _ = rx.await;
		});

		tokio::spawn(async move {
			let _ = server.into_future().await;
		});

		Ok(Self { base_url: format!("http://{addr}"), state, shutdown: Some(tx) })
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub fn state(&self) -> &StubState {
		&self.state
	}
}
impl Drop for StubStore {
	fn drop(&mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
	}
}

fn router(state: Arc<StubState>) -> Router {
	Router::new()
		.route(AUTH_PATH, routing::get(auth))
		.route(
			MACHINES_PATH,
			routing::get(list_machines)
				.post(create_machine)
				.put(update_machine)
				.delete(delete_machine),
		)
		.route(ROOMS_PATH, routing::get(list_rooms))
		.route(HTB_STATS_PATH, routing::get(get_htb_stats).post(save_htb_stats))
		.route(HTB_PROFILE_PATH, routing::get(get_htb_profile))
		.route(HTB_STATS_FALLBACK_PATH, routing::post(save_htb_fallback))
		.route(THM_STATS_PATH, routing::get(get_thm_stats).post(save_thm_stats))
		.route(TOOLS_PATH, routing::get(latest_tools))
		.route(PAYLOADS_PATH, routing::get(latest_payloads))
		.layer(middleware::from_fn_with_state(state.clone(), record_and_fault))
		.with_state(state)
}

async fn record_and_fault(
	State(state): State<Arc<StubState>>,
	req: Request,
	next: Next,
) -> Response {
	let path = req.uri().path().to_string();
	let failing = {
		let mut inner = state.lock();

		inner.requests.push(RecordedRequest {
			method: req.method().clone(),
			path: path.clone(),
			query: req.uri().query().map(str::to_string),
			cookie: cookie(req.headers()),
		});

		inner.failing.get(&path).copied()
	};

	if let Some(status) = failing {
		let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		return error_response(status, "stub failure");
	}

	next.run(req).await
}

async fn auth(State(state): State<Arc<StubState>>) -> Json<Value> {
	Json(serde_json::json!({ "authenticated": state.lock().authenticated }))
}

async fn list_machines(State(state): State<Arc<StubState>>) -> Json<Value> {
	Json(Value::Array(state.machines()))
}

async fn create_machine(
	State(state): State<Arc<StubState>>,
	Json(mut machine): Json<Value>,
) -> Response {
	if let Some(rejection) = write_rejection(&state) {
		return rejection;
	}

	let mut inner = state.lock();

	inner.next_id += 1;

	let id = format!("stub-{}", inner.next_id);

	if let Some(map) = machine.as_object_mut() {
		map.insert("id".to_string(), Value::String(id));
	}

	inner.machines.push(machine.clone());

	(StatusCode::CREATED, Json(serde_json::json!({ "machine": machine }))).into_response()
}

async fn update_machine(
	State(state): State<Arc<StubState>>,
	Json(machine): Json<Value>,
) -> Response {
	if let Some(rejection) = write_rejection(&state) {
		return rejection;
	}

	let Some(id) = machine.get("id").map(id_text) else {
		return error_response(StatusCode::BAD_REQUEST, "Missing id");
	};
	let mut inner = state.lock();
	let Some(slot) =
		inner.machines.iter_mut().find(|existing| existing.get("id").map(id_text) == Some(id.clone()))
	else {
		return error_response(StatusCode::NOT_FOUND, "Machine not found");
	};

	*slot = machine.clone();

	Json(serde_json::json!({ "machine": machine })).into_response()
}

async fn delete_machine(
	State(state): State<Arc<StubState>>,
	Query(query): Query<HashMap<String, String>>,
) -> Response {
	if let Some(rejection) = write_rejection(&state) {
		return rejection;
	}

	let Some(id) = query.get("id") else {
		return error_response(StatusCode::BAD_REQUEST, "Missing id");
	};
	let mut inner = state.lock();
	let before = inner.machines.len();

	inner.machines.retain(|existing| existing.get("id").map(id_text).as_ref() != Some(id));

	if inner.machines.len() == before {
		return error_response(StatusCode::NOT_FOUND, "Machine not found");
	}

	Json(serde_json::json!({ "success": true })).into_response()
}

async fn list_rooms(State(state): State<Arc<StubState>>) -> Json<Value> {
	Json(Value::Array(state.lock().rooms.clone()))
}

async fn get_htb_stats(State(state): State<Arc<StubState>>) -> Json<Value> {
	Json(state.htb_stats())
}

async fn save_htb_stats(State(state): State<Arc<StubState>>, Json(stats): Json<Value>) -> Response {
	if let Some(rejection) = write_rejection(&state) {
		return rejection;
	}

	state.set_htb_stats(stats);

	Json(serde_json::json!({ "success": true })).into_response()
}

async fn get_htb_profile(State(state): State<Arc<StubState>>) -> Json<Value> {
	Json(state.lock().htb_profile.clone())
}

// Backed by the older key-value storage, so the write mode of the database routes does not apply.
async fn save_htb_fallback(
	State(state): State<Arc<StubState>>,
	Json(stats): Json<Value>,
) -> Json<Value> {
	state.lock().htb_fallback = stats;

	Json(serde_json::json!({ "success": true }))
}

async fn get_thm_stats(State(state): State<Arc<StubState>>) -> Json<Value> {
	Json(state.thm_stats())
}

async fn save_thm_stats(State(state): State<Arc<StubState>>, Json(stats): Json<Value>) -> Response {
	if let Some(rejection) = write_rejection(&state) {
		return rejection;
	}

	state.set_thm_stats(stats);

	Json(serde_json::json!({ "success": true })).into_response()
}

async fn latest_tools(
	State(state): State<Arc<StubState>>,
	Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
	let tools = limited(state.lock().tools.clone(), &query);

	Json(serde_json::json!({ "tools": tools }))
}

async fn latest_payloads(
	State(state): State<Arc<StubState>>,
	Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
	let payloads = limited(state.lock().payloads.clone(), &query);

	Json(serde_json::json!({ "payloads": payloads }))
}

fn write_rejection(state: &StubState) -> Option<Response> {
	match state.lock().write_mode.clone() {
		WriteMode::Accept => None,
		WriteMode::Unavailable => Some(error_response(
			StatusCode::SERVICE_UNAVAILABLE,
			"Database not available - D1 binding missing",
		)),
		WriteMode::Reject(message) =>
			Some(error_response(StatusCode::INTERNAL_SERVER_ERROR, &message)),
	}
}

fn error_response(status: StatusCode, message: &str) -> Response {
	(status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn limited(mut items: Vec<Value>, query: &HashMap<String, String>) -> Vec<Value> {
	if let Some(limit) = query.get("limit").and_then(|raw| raw.parse::<usize>().ok()) {
		items.truncate(limit);
	}

	items
}

fn id_text(id: &Value) -> String {
	match id {
		Value::String(id) => id.clone(),
		other => other.to_string(),
	}
}

fn cookie(headers: &HeaderMap) -> Option<String> {
	headers.get(COOKIE).and_then(|value| value.to_str().ok()).map(str::to_string)
}
