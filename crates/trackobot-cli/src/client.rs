use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::history::HistoryPage;
use crate::params::{MetadataField, ResetMode, StatsQuery};
use crate::transport::{ApiRequest, Method, Transport, UreqTransport};

/// Account returned by `create_user`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Client for the Track-o-Bot profile API.
///
/// Holds no state besides the transport and the credentials attached to each
/// request as it is built.
#[derive(Debug)]
pub struct Trackobot<T = UreqTransport> {
    transport: T,
    credentials: Credentials,
}

impl Trackobot<UreqTransport> {
    /// Client talking to trackobot.com.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_transport(UreqTransport::default(), credentials)
    }
}

impl<T: Transport> Trackobot<T> {
    pub fn with_transport(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn authed(&self, method: Method, path: impl Into<String>) -> ApiRequest {
        ApiRequest::new(method, path).auth(&self.credentials)
    }

    fn fetch_json(&self, request: ApiRequest) -> Result<Value> {
        self.transport.send(&request)?.into_json()
    }

    fn execute(&self, request: ApiRequest) -> Result<()> {
        self.transport.send(&request)?.error_for_status()?;
        Ok(())
    }

    // -- Users --

    /// Register a fresh account. No credentials are sent.
    pub fn create_user(transport: &T) -> Result<NewUser> {
        let body = transport
            .send(&ApiRequest::new(Method::Post, "/users.json"))?
            .into_json()?;
        Ok(serde_json::from_value(body)?)
    }

    /// The service exposes no user id to its API clients, so renaming cannot
    /// be expressed. Always fails without sending anything.
    pub fn rename_user(&self, _new_name: &str) -> Result<()> {
        Err(Error::Unsupported("renaming a user"))
    }

    /// One-time link that opens the profile in a browser.
    ///
    /// The service reports some failures as a 200 response with an `error`
    /// field; in that case the error text is returned instead of a url.
    pub fn one_time_auth(&self) -> Result<String> {
        let body = self.fetch_json(self.authed(Method::Post, "/one_time_auth.json"))?;
        if let Some(error) = body.get("error") {
            tracing::warn!(%error, "one-time auth returned an error body");
            return Ok(error.as_str().map_or_else(|| error.to_string(), str::to_string));
        }
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(Error::MissingField("url"))
    }

    // -- Stats --

    pub fn stats(&self, query: &StatsQuery) -> Result<Value> {
        let pairs = query.query_pairs()?;
        let request = pairs
            .into_iter()
            .fold(self.authed(Method::Get, query.path()), |req, (k, v)| {
                req.query(k, v)
            });
        self.fetch_json(request)
    }

    /// Deck archetypes known to the service, grouped by class.
    pub fn decks(&self) -> Result<Value> {
        self.fetch_json(self.authed(Method::Get, "/profile/settings/decks.json"))
    }

    // -- Settings --

    /// Wipe recorded games for `modes`, or for every mode when `None`.
    pub fn reset(&self, modes: Option<&[ResetMode]>) -> Result<()> {
        let modes = ResetMode::selection(modes)?;
        tracing::info!(?modes, "resetting account data");
        let fields = modes
            .iter()
            .map(|m| ("reset_modes[]", m.as_api_str()));
        self.execute(
            self.authed(Method::Post, "/profile/settings/account/reset")
                .form(fields),
        )
    }

    pub fn toggle_tracking(&self, enabled: bool) -> Result<()> {
        let value = if enabled { "true" } else { "false" };
        self.execute(
            self.authed(Method::Post, "/profile/settings/decks/toggle")
                .form([("user[deck_tracking]", value), ("_method", "put")]),
        )
    }

    // -- History --

    /// One page (15 games) of history, arena games included.
    pub fn history(&self, page: u32) -> Result<HistoryPage> {
        self.history_page("/profile.json", "history", page, None)
    }

    /// One page of history matching a free-text search.
    pub fn search_history(&self, query: &str, page: u32) -> Result<HistoryPage> {
        self.history_page("/profile.json", "history", page, Some(query))
    }

    /// One page of arena-only history.
    pub fn arena_history(&self, page: u32) -> Result<HistoryPage> {
        self.history_page("/profile/arena.json", "arena", page, None)
    }

    fn history_page(
        &self,
        path: &str,
        key: &'static str,
        page: u32,
        search: Option<&str>,
    ) -> Result<HistoryPage> {
        let mut request = self
            .authed(Method::Get, path)
            .query("page", page.to_string());
        if let Some(search) = search {
            request = request.query("query", search);
        }
        HistoryPage::from_body(self.fetch_json(request)?, key)
    }

    // -- Results --

    /// Change one field of an uploaded game.
    ///
    /// Returns true only when the service answers 204 No Content.
    pub fn modify_metadata(
        &self,
        game_id: u64,
        field: MetadataField,
        value: impl Into<Value>,
    ) -> Result<bool> {
        let mut body = Map::new();
        body.insert(field.as_api_str().to_string(), value.into());
        let request = self
            .authed(Method::Put, format!("/profile/results/{game_id}"))
            .json(Value::Object(body));
        let resp = self.transport.send(&request)?.error_for_status()?;
        Ok(resp.status == 204)
    }

    pub fn delete_game(&self, game_id: u64) -> Result<()> {
        self.execute(self.authed(Method::Delete, format!("/profile/results/{game_id}")))
    }

    /// Upload a game record as-is and return the stored record.
    pub fn upload_game(&self, game: &Value) -> Result<Value> {
        self.fetch_json(
            self.authed(Method::Post, "/profile/results.json")
                .json(game.clone()),
        )
    }
}
