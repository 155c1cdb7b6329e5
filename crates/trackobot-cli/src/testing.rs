//! Test doubles for the transport seam.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::{Value, json};

use crate::credentials::Credentials;
use crate::error::Result;
use crate::history::GAMES_PER_PAGE;
use crate::transport::{ApiRequest, ApiResponse, Method, Payload, Transport};

/// Upload payload for a Shaman-vs-Warrior win in `mode`.
pub fn game(mode: &str) -> Value {
    json!({
        "result": {
            "hero": "Shaman",
            "opponent": "Warrior",
            "mode": mode,
            "coin": false,
            "win": true
        }
    })
}

/// Replays canned responses in order and records every request.
/// Panics if a request arrives after the script runs out.
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<ApiResponse>>,
    sent: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<ApiResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.sent.borrow_mut().push(request.clone());
        let resp = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {request:?}"));
        Ok(resp)
    }
}

#[derive(Default)]
struct Account {
    games: Vec<Value>,
    next_id: u64,
    deck_tracking: bool,
}

/// In-memory stand-in for the Track-o-Bot service, enough to exercise
/// upload, history, reset, stats and metadata edits end to end.
pub struct FakeTrackobot {
    authorization: String,
    account: RefCell<Account>,
    sent: RefCell<Vec<ApiRequest>>,
}

impl FakeTrackobot {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            authorization: credentials.authorization(),
            account: RefCell::new(Account {
                next_id: 1,
                deck_tracking: true,
                ..Account::default()
            }),
            sent: RefCell::new(Vec::new()),
        }
    }

    /// Number of requests sent to `path`.
    pub fn requests_to(&self, path: &str) -> usize {
        self.sent.borrow().iter().filter(|r| r.path == path).count()
    }

    pub fn deck_tracking(&self) -> bool {
        self.account.borrow().deck_tracking
    }

    pub fn game_count(&self) -> usize {
        self.account.borrow().games.len()
    }

    fn route(&self, req: &ApiRequest) -> ApiResponse {
        let mut account = self.account.borrow_mut();
        match (req.method, req.path.as_str()) {
            (Method::Post, "/users.json") => ok(json!({
                "username": "generated-user-1",
                "password": "0123456789"
            })),
            (Method::Post, "/one_time_auth.json") => ok(json!({
                "url": "https://trackobot.com/one_time_auth/2f4e9c"
            })),
            (Method::Get, "/profile/settings/decks.json") => ok(json!({
                "decks": {"shaman": [{"id": 1, "name": "Aggro"}]}
            })),
            (Method::Get, "/profile.json") => {
                let search = req.query_value("query").map(str::to_lowercase);
                let games: Vec<&Value> = account
                    .games
                    .iter()
                    .rev()
                    .filter(|g| search.as_deref().is_none_or(|q| matches_search(g, q)))
                    .collect();
                page(req, "history", &games)
            }
            (Method::Get, "/profile/arena.json") => {
                let games: Vec<&Value> = account
                    .games
                    .iter()
                    .rev()
                    .filter(|g| g["mode"] == "arena")
                    .collect();
                page(req, "arena", &games)
            }
            (Method::Post, "/profile/settings/account/reset") => {
                let modes = form_values(&req.payload, "reset_modes[]");
                account
                    .games
                    .retain(|g| !modes.iter().any(|m| g["mode"] == m.as_str()));
                ApiResponse::new(200, "")
            }
            (Method::Post, "/profile/settings/decks/toggle") => {
                if form_values(&req.payload, "_method") != ["put"] {
                    return not_found();
                }
                account.deck_tracking =
                    form_values(&req.payload, "user[deck_tracking]") == ["true"];
                ApiResponse::new(200, "")
            }
            (Method::Post, "/profile/results.json") => {
                let Payload::Json(body) = &req.payload else {
                    return ApiResponse::new(422, r#"{"error": "expected JSON"}"#);
                };
                let mut record = body["result"].clone();
                let Some(fields) = record.as_object_mut() else {
                    return ApiResponse::new(422, r#"{"error": "missing result"}"#);
                };
                fields.insert("id".into(), json!(account.next_id));
                fields.insert("added".into(), json!("2017-03-09T12:00:00.000Z"));
                account.next_id += 1;
                account.games.push(record.clone());
                ApiResponse::new(201, json!({ "result": record }).to_string())
            }
            (method, path) if path.starts_with("/profile/results/") => {
                let Ok(id) = path["/profile/results/".len()..].parse::<u64>() else {
                    return not_found();
                };
                let Some(index) = account.games.iter().position(|g| g["id"] == id) else {
                    return not_found();
                };
                match (method, &req.payload) {
                    (Method::Delete, _) => {
                        account.games.remove(index);
                        ApiResponse::new(204, "")
                    }
                    (Method::Put, Payload::Json(Value::Object(changes))) => {
                        if let Some(game) = account.games[index].as_object_mut() {
                            game.extend(changes.clone());
                        }
                        ApiResponse::new(204, "")
                    }
                    _ => not_found(),
                }
            }
            (Method::Get, path) if path.starts_with("/profile/stats/") => {
                let stats_type = path
                    .trim_start_matches("/profile/stats/")
                    .trim_end_matches(".json");
                let mode = req.query_value("mode").unwrap_or("all");
                let counted: Vec<&Value> = account
                    .games
                    .iter()
                    .filter(|g| match stats_type {
                        "arena" => g["mode"] == "arena",
                        _ => mode == "all" || g["mode"] == mode,
                    })
                    .collect();
                let wins = counted.iter().filter(|g| g["win"] == true).count();
                ok(json!({
                    "stats": {
                        "overall": {
                            "total": counted.len(),
                            "wins": wins,
                            "losses": counted.len() - wins
                        }
                    }
                }))
            }
            _ => not_found(),
        }
    }
}

impl Transport for FakeTrackobot {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.sent.borrow_mut().push(request.clone());
        let anonymous = request.method == Method::Post && request.path == "/users.json";
        if !anonymous && request.authorization.as_deref() != Some(self.authorization.as_str()) {
            return Ok(ApiResponse::new(401, r#"{"error": "Unauthorized"}"#));
        }
        Ok(self.route(request))
    }
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(200, body.to_string())
}

fn not_found() -> ApiResponse {
    ApiResponse::new(404, r#"{"error": "Not Found"}"#)
}

fn matches_search(game: &Value, query: &str) -> bool {
    ["hero", "opponent", "note"].iter().any(|k| {
        game[*k]
            .as_str()
            .is_some_and(|v| v.to_lowercase().contains(query))
    })
}

fn form_values(payload: &Payload, key: &str) -> Vec<String> {
    match payload {
        Payload::Form(fields) => fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect(),
        _ => Vec::new(),
    }
}

fn page(req: &ApiRequest, key: &str, games: &[&Value]) -> ApiResponse {
    let current: usize = req
        .query_value("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
        .max(1);
    let total_pages = games.len().div_ceil(GAMES_PER_PAGE);
    let slice: Vec<&Value> = games
        .iter()
        .skip((current - 1) * GAMES_PER_PAGE)
        .take(GAMES_PER_PAGE)
        .copied()
        .collect();
    ok(json!({
        key: slice,
        "meta": {
            "current_page": current,
            "total_pages": total_pages,
            "total_items": games.len()
        }
    }))
}
