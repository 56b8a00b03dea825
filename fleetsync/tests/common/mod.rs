//! Shared test utilities for fleetsync integration tests.
//!
//! `TestServer` runs an in-process mock of the MAAS REST API on an
//! ephemeral port. Objects live as JSON values per collection; machines in a
//! transitional state advance one step every time they are read.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router};
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use fleetsync::{ClientConfig, MaasClient};
use fleetsync_core::{Fleet, WaitTimings};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const API_KEY: &str = "ck:tk:secret";

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub op: Option<String>,
    pub form: Vec<(String, String)>,
    pub authorization: Option<String>,
}

impl Recorded {
    pub fn field(&self, key: &str) -> Vec<&str> {
        self.form
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Default)]
pub struct MockState {
    pub requests: Vec<Recorded>,
    pub collections: HashMap<String, Vec<Value>>,
    /// Statuses returned by successive reads of a machine.
    pub scripts: HashMap<String, VecDeque<String>>,
    /// `(method, path fragment)` pairs answered with the given status.
    pub failures: Vec<(String, String, u16)>,
    next_id: i64,
}

type Shared = Arc<Mutex<MockState>>;

/// Maps a path segment onto its collection and the field items are keyed by.
fn collection_for(segment: &str) -> (&str, &'static str) {
    match segment {
        "machines" => ("machines", "system_id"),
        "tags" => ("tags", "name"),
        "resourcepool" | "resourcepools" => ("resourcepools", "id"),
        other => (other, "id"),
    }
}

fn key_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn form_get<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, message.to_string()).into_response()
}

/// Next state of a machine once a transitional state has been observed.
fn advance(status: &str) -> Option<&'static str> {
    match status {
        "Commissioning" => Some("Ready"),
        "Deploying" => Some("Deployed"),
        "Disk erasing" => Some("Releasing"),
        "Releasing" => Some("Ready"),
        _ => None,
    }
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn items(&mut self, collection: &str) -> &mut Vec<Value> {
        self.collections.entry(collection.to_string()).or_default()
    }

    fn build(&mut self, collection: &str, form: &[(String, String)]) -> Value {
        let id = self.next_id();
        let get = |key: &str| form_get(form, key).map(str::to_string);
        match collection {
            "machines" => json!({
                "system_id": format!("m{id:04}"),
                "hostname": get("hostname").unwrap_or_else(|| format!("machine-{id}")),
                "status_name": "Commissioning",
                "power_type": get("power_type"),
                "boot_interface": {"mac_address": get("mac_addresses")},
                "pool": get("pool").map(|name| json!({"name": name})),
                "tag_names": [],
            }),
            "tags" => json!({
                "name": get("name"),
                "comment": get("comment"),
                "definition": get("definition"),
            }),
            "subnets" => json!({
                "id": id,
                "cidr": get("cidr"),
                "name": get("name").or_else(|| get("cidr")),
                "gateway_ip": get("gateway_ip"),
                "dns_servers": get("dns_servers")
                    .map(|s| s.split(' ').map(str::to_string).collect::<Vec<_>>())
                    .unwrap_or_default(),
            }),
            "ipranges" => json!({
                "id": id,
                "type": get("type"),
                "start_ip": get("start_ip"),
                "end_ip": get("end_ip"),
                "comment": get("comment"),
                "subnet": {"id": get("subnet").and_then(|s| s.parse::<i64>().ok())},
            }),
            "resourcepools" => json!({
                "id": id,
                "name": get("name"),
                "description": get("description"),
            }),
            _ => {
                let mut object: serde_json::Map<String, Value> = form
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                object.insert("id".to_string(), json!(id));
                Value::Object(object)
            }
        }
    }

    fn position(&mut self, collection: &str, key: &str, wanted: &str) -> Option<usize> {
        self.items(collection)
            .iter()
            .position(|item| item.get(key).is_some_and(|v| key_str(v) == wanted))
    }

    fn set_status(&mut self, system_id: &str, status: &str) -> Option<Value> {
        let index = self.position("machines", "system_id", system_id)?;
        let machine = &mut self.items("machines")[index];
        machine["status_name"] = json!(status);
        Some(machine.clone())
    }

    /// Reading a machine consumes its script, or advances it one step.
    fn read_machine(&mut self, system_id: &str) -> Option<Value> {
        let index = self.position("machines", "system_id", system_id)?;
        if let Some(next) = self.scripts.get_mut(system_id).and_then(VecDeque::pop_front) {
            self.items("machines")[index]["status_name"] = json!(next);
        }
        let machine = self.items("machines")[index].clone();
        let has_script = self
            .scripts
            .get(system_id)
            .is_some_and(|script| !script.is_empty());
        if !has_script {
            if let Some(next) = machine["status_name"].as_str().and_then(advance) {
                self.items("machines")[index]["status_name"] = json!(next);
            }
        }
        Some(machine)
    }

    fn allocate(&mut self, form: &[(String, String)]) -> Response {
        let wanted_id = form_get(form, "system_id");
        let wanted_name = form_get(form, "name");
        let candidate = self.items("machines").iter().find(|m| {
            let ready = m["status_name"] == "Ready";
            let by_id = wanted_id.is_none_or(|id| m["system_id"] == id);
            let by_name = wanted_name.is_none_or(|name| m["hostname"] == name);
            ready && by_id && by_name
        });
        let Some(system_id) = candidate.map(|m| key_str(&m["system_id"])) else {
            return error(StatusCode::CONFLICT, "No machine available");
        };
        let machine = self.set_status(&system_id, "Allocated");
        Json(machine).into_response()
    }

    fn machine_op(&mut self, system_id: &str, op: &str, form: &[(String, String)]) -> Response {
        let status = match op {
            "deploy" => "Deploying",
            "commission" => "Commissioning",
            "release" if form_get(form, "erase") == Some("true") => "Disk erasing",
            "release" => "Releasing",
            _ => return error(StatusCode::BAD_REQUEST, "unknown op"),
        };
        match self.set_status(system_id, status) {
            Some(machine) => Json(machine).into_response(),
            None => error(StatusCode::NOT_FOUND, "Not Found"),
        }
    }

    fn update_nodes(&mut self, tag: &str, form: &[(String, String)]) -> Response {
        let mut added = 0;
        let mut removed = 0;
        for machine in self.items("machines").iter_mut() {
            let system_id = key_str(&machine["system_id"]);
            let Some(tags) = machine["tag_names"].as_array_mut() else {
                continue;
            };
            if form.iter().any(|(k, v)| k == "add" && *v == system_id) {
                tags.push(json!(tag));
                added += 1;
            }
            if form.iter().any(|(k, v)| k == "remove" && *v == system_id) {
                tags.retain(|t| t != tag);
                removed += 1;
            }
        }
        Json(json!({"added": added, "removed": removed})).into_response()
    }

    fn update(&mut self, collection: &str, index: usize, form: &[(String, String)]) -> Value {
        let item = &mut self.items(collection)[index];
        for (key, value) in form {
            let value = match (collection, key.as_str()) {
                ("machines", "pool" | "zone" | "domain") => json!({"name": value}),
                ("machines", k) if k.starts_with("power_parameters_") => continue,
                ("subnets", "dns_servers") => json!(value.split(' ').collect::<Vec<_>>()),
                _ => json!(value),
            };
            item[key.as_str()] = value;
        }
        item.clone()
    }
}

async fn handle(
    State(state): State<Shared>,
    method: Method,
    headers: HeaderMap,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let form = form.map(|Form(pairs)| pairs).unwrap_or_default();
    let op = query.get("op").cloned();
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut state = state.lock().unwrap();
    state.requests.push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        op: op.clone(),
        form: if method == Method::GET { Vec::new() } else { form.clone() },
        authorization: authorization.clone(),
    });

    if !authorization.is_some_and(|a| a.starts_with("OAuth ") && a.contains("oauth_token=\"tk\"")) {
        return error(StatusCode::UNAUTHORIZED, "Authorization Error");
    }
    if let Some((_, _, status)) = state
        .failures
        .iter()
        .find(|(m, fragment, _)| *m == method.as_str() && path.contains(fragment.as_str()))
    {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return error(status, "injected failure");
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(first) = segments.first() else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };
    let (collection, key) = collection_for(first);
    let collection = collection.to_string();

    match (segments.len(), method, op.as_deref()) {
        (1, Method::GET, None) => Json(state.items(&collection).clone()).into_response(),
        (1, Method::POST, Some("allocate")) if collection == "machines" => state.allocate(&form),
        (1, Method::POST, None) => {
            let item = state.build(&collection, &form);
            state.items(&collection).push(item.clone());
            Json(item).into_response()
        }
        (2, method, op) => {
            let id = segments[1];
            let Some(index) = state.position(&collection, key, id) else {
                return error(StatusCode::NOT_FOUND, "Not Found");
            };
            match (method, op) {
                (Method::GET, None) if collection == "machines" => {
                    Json(state.read_machine(id)).into_response()
                }
                (Method::GET, None) => Json(state.items(&collection)[index].clone()).into_response(),
                (Method::PUT, None) => Json(state.update(&collection, index, &form)).into_response(),
                (Method::DELETE, None) => {
                    state.items(&collection).remove(index);
                    StatusCode::NO_CONTENT.into_response()
                }
                (Method::POST, Some("update_nodes")) if collection == "tags" => {
                    state.update_nodes(id, &form)
                }
                (Method::POST, Some(op)) if collection == "machines" => {
                    state.machine_op(id, op, &form)
                }
                _ => error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
            }
        }
        _ => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Test server wrapper around the mock MAAS API.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Shared,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn an empty mock on an OS-assigned port.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let router = Router::new()
            .route("/MAAS/api/2.0/{*path}", any(handle))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        // Small delay to ensure server is ready
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}/MAAS", self.addr)
    }

    pub fn client_with_key(&self, key: &str) -> MaasClient {
        let config = ClientConfig::new(&self.api_url(), key.parse().unwrap()).unwrap();
        MaasClient::new(config).unwrap()
    }

    pub fn client(&self) -> MaasClient {
        self.client_with_key(API_KEY)
    }

    /// A fleet handle with waits short enough for tests.
    pub fn fleet(&self) -> Fleet<MaasClient> {
        Fleet::new(self.client()).with_timings(WaitTimings {
            deploy: Duration::from_secs(5),
            commission: Duration::from_secs(5),
            release: Duration::from_secs(5),
            delay: Duration::ZERO,
            min_interval: Duration::from_millis(10),
        })
    }

    pub fn insert(&self, collection: &str, item: Value) {
        let mut state = self.state.lock().unwrap();
        state.items(collection).push(item);
    }

    pub fn items(&self, collection: &str) -> Vec<Value> {
        let mut state = self.state.lock().unwrap();
        state.items(collection).clone()
    }

    pub fn script(&self, system_id: &str, statuses: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.scripts.insert(
            system_id.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn fail_on(&self, method: &str, path_fragment: &str, status: u16) {
        let mut state = self.state.lock().unwrap();
        state
            .failures
            .push((method.to_string(), path_fragment.to_string(), status));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests with the given method and operation whose path contains
    /// `fragment`.
    pub fn matching(&self, method: &str, fragment: &str, op: Option<&str>) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.contains(fragment) && r.op.as_deref() == op)
            .collect()
    }

    pub fn count(&self, method: &str, fragment: &str, op: Option<&str>) -> usize {
        self.matching(method, fragment, op).len()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

pub fn machine_json(system_id: &str, hostname: &str, status: &str) -> Value {
    json!({
        "system_id": system_id,
        "hostname": hostname,
        "fqdn": format!("{hostname}.maas"),
        "status_name": status,
        "power_state": "off",
        "tag_names": [],
        "pool": {"id": 0, "name": "default"},
        "boot_interface": {"mac_address": "52:54:00:00:00:01"},
        "cpu_count": 4,
        "memory": 8192,
    })
}
