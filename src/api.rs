// API client module: a small blocking HTTP client for the Moltbook API.
// It owns the credential store and the current agent identity, attaches
// the bearer token to every authenticated call, and decodes each response
// into the typed records in `models`.

use crate::config::{Settings, REGISTER_TIMEOUT};
use crate::error::{ApiError, StoreError};
use crate::models::{
    ActionResponse, AgentIdentity, FeedResponse, Post, RegisterResponse, SearchResponse,
    SubmoltResponse, VoteDirection,
};
use crate::store::{
    CredentialStore, KEY_API_KEY, KEY_CLAIM_URL, KEY_ID, KEY_NAME, KEY_VERIFY_CODE,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Operations available once an agent is registered. The menu only talks
/// to this trait so it can be exercised without a network.
pub trait MoltbookApi {
    /// Latest posts. Any failure yields an empty feed.
    fn get_feed(&self) -> Vec<Post>;
    fn post(&self, content: &str) -> Result<ActionResponse, ApiError>;
    fn comment(&self, post_id: &str, content: &str) -> Result<ActionResponse, ApiError>;
    fn vote(&self, post_id: &str, direction: VoteDirection) -> Result<ActionResponse, ApiError>;
    fn create_submolt(&self, name: &str, description: &str)
        -> Result<SubmoltResponse, ApiError>;
    fn subscribe(&self, submolt_id: &str) -> Result<ActionResponse, ApiError>;
    /// Meaning-based search. Any failure yields no results.
    fn semantic_search(&self, query: &str) -> SearchResponse;
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub identity: AgentIdentity,
    pub claim_url: Option<String>,
    pub verification_code: Option<String>,
}

/// Blocking client bound to one API base URL and one credential file.
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: CredentialStore,
    identity: AgentIdentity,
    register_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl ApiClient {
    /// Create a client from `MOLTBOOK_BASE_URL`, `MOLTBOOK_ENV_FILE` and
    /// `MOLTBOOK_TIMEOUT_SECS`. See `config::Settings::from_env`.
    pub fn from_env() -> Result<Self, ApiError> {
        let settings = Settings::from_env();
        let store = CredentialStore::new(&settings.env_file);
        let client = Self::new(&settings.base_url, store)?;
        Ok(match settings.request_timeout {
            Some(timeout) => client.with_request_timeout(timeout),
            None => client,
        })
    }

    /// Create a client and load the identity currently held by `store`.
    pub fn new(base_url: &str, store: CredentialStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: base_url.to_string(),
                source,
            })?;
        let identity = store.load()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            identity,
            register_timeout: REGISTER_TIMEOUT,
            request_timeout: None,
        })
    }

    /// Bound every call other than registration. Without this the
    /// transport's default applies.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_register_timeout(mut self, timeout: Duration) -> Self {
        self.register_timeout = timeout;
        self
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Returns whether an API key is available for authenticated calls.
    pub fn has_credentials(&self) -> bool {
        self.identity.has_credentials()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Swap the in-memory identity for the one now on disk.
    pub fn refresh_identity(&mut self) -> Result<(), StoreError> {
        self.store.reload(&mut self.identity)
    }

    /// Register a new agent, persist what the server hands back and switch
    /// this client over to the new credentials. Nothing is written unless
    /// the response carries an `agent` record.
    pub fn register(&mut self, name: &str, description: &str) -> Result<Registration, ApiError> {
        let endpoint = "/agents/register";
        let req = self
            .client
            .post(self.url(endpoint))
            .timeout(self.register_timeout)
            .json(&json!({ "name": name, "description": description }));
        let resp: RegisterResponse = self.send(endpoint, req)?;
        let agent = resp.into_agent().ok_or(ApiError::MissingAgent)?;

        let mapping: Vec<(&str, String)> = [
            (KEY_ID, agent.id),
            (KEY_API_KEY, agent.api_key),
            (KEY_CLAIM_URL, agent.claim_url.clone()),
            (KEY_VERIFY_CODE, agent.verification_code.clone()),
            (KEY_NAME, agent.name),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect();

        self.store.save(mapping)?;
        self.refresh_identity()?;

        Ok(Registration {
            identity: self.identity.clone(),
            claim_url: agent.claim_url,
            verification_code: agent.verification_code,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Bearer and JSON headers, or nothing when no key is loaded.
    fn auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = self.identity.api_key.as_deref().filter(|k| !k.is_empty()) {
            let val = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| ApiError::InvalidApiKey)?;
            headers.insert(AUTHORIZATION, val);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }

    fn get(&self, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        self.authed(self.client.get(self.url(endpoint)))
    }

    fn post_to(&self, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        self.authed(self.client.post(self.url(endpoint)))
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let req = req.headers(self.auth_headers()?);
        Ok(match self.request_timeout {
            Some(timeout) => req.timeout(timeout),
            None => req,
        })
    }

    /// Send a request and decode its JSON body. Non-2xx statuses carry the
    /// response text in the error.
    fn send<T: DeserializeOwned>(&self, endpoint: &str, req: RequestBuilder) -> Result<T, ApiError> {
        debug!(endpoint, "sending request");
        let res = req.send().map_err(|source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }
        let text = res.text().map_err(|source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn send_action(&self, endpoint: &str, req: RequestBuilder) -> Result<ActionResponse, ApiError> {
        let resp: ActionResponse = self.send(endpoint, req)?;
        if let Some(reason) = resp.server_error() {
            warn!(endpoint, %reason, "server reported an error in a successful response");
        }
        Ok(resp)
    }
}

impl MoltbookApi for ApiClient {
    fn get_feed(&self) -> Vec<Post> {
        let endpoint = "/feed";
        let result = self
            .get(endpoint)
            .and_then(|req| self.send::<FeedResponse>(endpoint, req));
        match result {
            Ok(feed) => feed.posts,
            Err(e) => {
                warn!(error = %e, "feed unavailable");
                Vec::new()
            }
        }
    }

    fn post(&self, content: &str) -> Result<ActionResponse, ApiError> {
        let endpoint = "/posts";
        let req = self.post_to(endpoint)?.json(&json!({ "content": content }));
        self.send_action(endpoint, req)
    }

    fn comment(&self, post_id: &str, content: &str) -> Result<ActionResponse, ApiError> {
        let endpoint = format!("/posts/{}/comments", post_id);
        let req = self.post_to(&endpoint)?.json(&json!({ "content": content }));
        self.send_action(&endpoint, req)
    }

    fn vote(&self, post_id: &str, direction: VoteDirection) -> Result<ActionResponse, ApiError> {
        let endpoint = format!("/posts/{}/vote", post_id);
        let req = self.post_to(&endpoint)?.json(&json!({ "direction": direction }));
        self.send_action(&endpoint, req)
    }

    fn create_submolt(
        &self,
        name: &str,
        description: &str,
    ) -> Result<SubmoltResponse, ApiError> {
        let endpoint = "/submolts";
        let req = self
            .post_to(endpoint)?
            .json(&json!({ "name": name, "description": description }));
        let resp: SubmoltResponse = self.send(endpoint, req)?;
        if let Some(reason) = resp.action.server_error() {
            warn!(endpoint, %reason, "server reported an error in a successful response");
        }
        Ok(resp)
    }

    fn subscribe(&self, submolt_id: &str) -> Result<ActionResponse, ApiError> {
        let endpoint = format!("/submolts/{}/subscribe", submolt_id);
        let req = self.post_to(&endpoint)?;
        self.send_action(&endpoint, req)
    }

    fn semantic_search(&self, query: &str) -> SearchResponse {
        let endpoint = "/search";
        let result = self.get(endpoint).and_then(|req| {
            self.send::<SearchResponse>(endpoint, req.query(&[("q", query), ("type", "semantic")]))
        });
        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "search unavailable");
                SearchResponse::default()
            }
        }
    }
}
