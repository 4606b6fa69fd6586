//! Records returned by the GitHub REST API
//!
//! A record keeps every field GitHub sent, `null`s included, in its `fields`
//! map and writes them back out unchanged. Only the keys that identify a
//! record are pulled out as struct fields; everything else is read through
//! accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn str_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

fn u64_field(fields: &Map<String, Value>, key: &str) -> Option<u64> {
    fields.get(key).and_then(Value::as_u64)
}

/// Member record as returned by the collaborators and contributors listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub login: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl MemberSummary {
    pub fn id(&self) -> Option<u64> {
        u64_field(&self.fields, "id")
    }

    pub fn avatar_url(&self) -> Option<&str> {
        str_field(&self.fields, "avatar_url")
    }

    /// Commit count, only present in contributor listings
    pub fn contributions(&self) -> Option<u64> {
        u64_field(&self.fields, "contributions")
    }
}

/// Full user profile from `GET /users/{login}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl UserProfile {
    pub fn id(&self) -> Option<u64> {
        u64_field(&self.fields, "id")
    }

    pub fn name(&self) -> Option<&str> {
        str_field(&self.fields, "name")
    }

    pub fn company(&self) -> Option<&str> {
        str_field(&self.fields, "company")
    }

    pub fn email(&self) -> Option<&str> {
        str_field(&self.fields, "email")
    }

    pub fn bio(&self) -> Option<&str> {
        str_field(&self.fields, "bio")
    }

    pub fn html_url(&self) -> Option<&str> {
        str_field(&self.fields, "html_url")
    }

    pub fn public_repos(&self) -> Option<u64> {
        u64_field(&self.fields, "public_repos")
    }

    pub fn followers(&self) -> Option<u64> {
        u64_field(&self.fields, "followers")
    }

    /// Get best available name for display
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(&self.login)
    }
}

/// Public activity record from `GET /users/{login}/events/public`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,

    /// Event type, e.g. `PushEvent`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Event {
    pub fn actor_login(&self) -> Option<&str> {
        self.fields.get("actor")?.get("login")?.as_str()
    }

    /// `owner/name` of the repository the event happened in
    pub fn repo_name(&self) -> Option<&str> {
        self.fields.get("repo")?.get("name")?.as_str()
    }

    pub fn created_at(&self) -> Option<&str> {
        str_field(&self.fields, "created_at")
    }
}
