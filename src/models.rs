// Wire types for the Moltbook API. Every response is decoded into one of
// these once, at the gateway boundary; missing fields fall back to empty
// values instead of failing the decode.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identity fields persisted for the running agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentIdentity {
    pub id: Option<String>,
    pub api_key: Option<String>,
    pub display_name: String,
}

impl AgentIdentity {
    /// An identity is usable only once it has a non-empty API key.
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// Accept ids sent as either JSON strings or numbers.
fn flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Author {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Post {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
}

impl Post {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// The nested `agent` record returned by registration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AgentRecord {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub claim_url: Option<String>,
    #[serde(default)]
    pub verification_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl AgentRecord {
    pub fn is_empty(&self) -> bool {
        self == &AgentRecord::default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub agent: Option<AgentRecord>,
}

impl RegisterResponse {
    /// The agent record, treating an empty object the same as a missing one.
    pub fn into_agent(self) -> Option<AgentRecord> {
        self.agent.filter(|a| !a.is_empty())
    }
}

/// Generic reply to a write call (post, comment, vote, subscribe).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ActionResponse {
    /// A server-reported failure carried inside a 2xx body, if any.
    pub fn server_error(&self) -> Option<String> {
        if self.success == Some(false) || self.error.is_some() {
            let mut text = self
                .error
                .clone()
                .or_else(|| self.message.clone())
                .unwrap_or_else(|| "request rejected".to_string());
            if let Some(hint) = &self.hint {
                text.push_str(&format!(" ({hint})"));
            }
            return Some(text);
        }
        None
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SubmoltRef {
    #[serde(default, deserialize_with = "flexible_id")]
    id: Option<String>,
}

/// Reply to submolt creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmoltResponse {
    #[serde(default, deserialize_with = "flexible_id")]
    id: Option<String>,
    #[serde(default)]
    submolt: Option<SubmoltRef>,
    #[serde(flatten)]
    pub action: ActionResponse,
}

impl SubmoltResponse {
    pub fn id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.submolt.as_ref().and_then(|s| s.id.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_ids_accept_numbers_and_strings() {
        let posts: Vec<Post> = serde_json::from_value(json!([
            {"id": 1, "content": "hi", "author": {"name": "bob"}},
            {"id": "abc", "content": "yo"}
        ]))
        .unwrap();
        assert_eq!(posts[0].id.as_deref(), Some("1"));
        assert_eq!(posts[1].id.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_author_reads_as_unknown() {
        let post: Post = serde_json::from_value(json!({"id": 2, "content": "yo"})).unwrap();
        assert_eq!(post.author_name(), "Unknown");

        let nameless: Post = serde_json::from_value(json!({"id": 3, "author": {}})).unwrap();
        assert_eq!(nameless.author_name(), "Unknown");
        assert_eq!(nameless.content(), "");
    }

    #[test]
    fn feed_without_posts_field_is_empty() {
        let feed: FeedResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(feed.posts.is_empty());
    }

    #[test]
    fn empty_agent_object_counts_as_missing() {
        let resp: RegisterResponse = serde_json::from_value(json!({"agent": {}})).unwrap();
        assert!(resp.into_agent().is_none());

        let resp: RegisterResponse = serde_json::from_value(json!({"ok": true})).unwrap();
        assert!(resp.into_agent().is_none());
    }

    #[test]
    fn embedded_error_is_reported() {
        let ok: ActionResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert_eq!(ok.server_error(), None);

        let bad: ActionResponse = serde_json::from_value(json!({
            "success": false,
            "error": "Agent not claimed",
            "hint": "visit your claim URL"
        }))
        .unwrap();
        assert_eq!(
            bad.server_error().as_deref(),
            Some("Agent not claimed (visit your claim URL)")
        );
    }

    #[test]
    fn submolt_id_falls_back_to_nested_record() {
        let flat: SubmoltResponse = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(flat.id(), Some("7"));

        let nested: SubmoltResponse =
            serde_json::from_value(json!({"success": true, "submolt": {"id": "rust"}})).unwrap();
        assert_eq!(nested.id(), Some("rust"));
    }

    #[test]
    fn vote_direction_is_lowercase() {
        assert_eq!(serde_json::to_value(VoteDirection::Up).unwrap(), json!("up"));
        assert_eq!(serde_json::to_value(VoteDirection::Down).unwrap(), json!("down"));
    }
}
