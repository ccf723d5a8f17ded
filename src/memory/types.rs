//! Core memory type definitions.
//!
//! Defines [`Category`] (what kind of knowledge a memory holds), [`Status`]
//! (lifecycle state), [`Memory`] (a full record), and [`NewMemory`] (the input to
//! [`MemoryStore::create`](super::store::MemoryStore::create)).

use serde::{Deserialize, Serialize};

/// What kind of knowledge a memory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// How the user likes things done.
    Preference,
    /// Something true about the user or project.
    Fact,
    /// A fix to something previously believed.
    Correction,
    /// A recurring way of working.
    Pattern,
}

impl Category {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::Correction => "correction",
            Self::Pattern => "pattern",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preference" => Ok(Self::Preference),
            "fact" => Ok(Self::Fact),
            "correction" => Ok(Self::Correction),
            "pattern" => Ok(Self::Pattern),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// Lifecycle state of a memory.
///
/// `Superseded` is set exactly when `superseded_by_id` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Superseded,
    Archived,
    Forgotten,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Archived => "archived",
            Self::Forgotten => "forgotten",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "superseded" => Ok(Self::Superseded),
            "archived" => Ok(Self::Archived),
            "forgotten" => Ok(Self::Forgotten),
            _ => Err(format!("unknown status: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Agent this memory belongs to. `None` for memories shared by all agents.
    pub agent_handle: Option<String>,
    /// Project or path the memory applies to.
    pub path_scope: Option<String>,
    pub content: String,
    pub category: Category,
    /// Unit-length vector, or `None` if embedding failed or no embedder was configured.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub source_session_id: Option<String>,
    pub source_message_id: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-modification timestamp.
    pub updated_at: String,
    /// ISO 8601 timestamp of the last search hit, or `None` if never returned.
    pub last_accessed_at: Option<String>,
    /// Number of times this memory has been returned in search results.
    pub access_count: u32,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f64,
    /// The memory this one replaced.
    pub supersedes_id: Option<String>,
    /// The memory that replaced this one.
    pub superseded_by_id: Option<String>,
    pub supersede_reason: Option<String>,
    pub status: Status,
}

impl Memory {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// Input for creating a memory. Unset fields are filled in by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    /// Explicit id; a UUID v7 is generated when `None`.
    pub id: Option<String>,
    pub agent_handle: Option<String>,
    pub path_scope: Option<String>,
    pub content: String,
    pub category: Category,
    /// Precomputed vector. When `None` the store embeds `content` if it can.
    pub embedding: Option<Vec<f32>>,
    pub source_session_id: Option<String>,
    pub source_message_id: Option<String>,
    /// Defaults to 1.0.
    pub confidence: Option<f64>,
    pub supersedes_id: Option<String>,
    pub supersede_reason: Option<String>,
}

impl NewMemory {
    pub fn new(content: impl Into<String>, category: Category) -> Self {
        Self {
            id: None,
            agent_handle: None,
            path_scope: None,
            content: content.into(),
            category,
            embedding: None,
            source_session_id: None,
            source_message_id: None,
            confidence: None,
            supersedes_id: None,
            supersede_reason: None,
        }
    }

    pub fn agent(mut self, handle: impl Into<String>) -> Self {
        self.agent_handle = Some(handle.into());
        self
    }

    pub fn path(mut self, scope: impl Into<String>) -> Self {
        self.path_scope = Some(scope.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_source(
        mut self,
        session_id: Option<String>,
        message_id: Option<String>,
    ) -> Self {
        self.source_session_id = session_id;
        self.source_message_id = message_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip_strings() {
        for c in [
            Category::Preference,
            Category::Fact,
            Category::Correction,
            Category::Pattern,
        ] {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("opinion".parse::<Category>().is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("forgotten".parse::<Status>().unwrap(), Status::Forgotten);
        assert!("deleted".parse::<Status>().is_err());
    }

    #[test]
    fn test_new_memory_builder() {
        let m = NewMemory::new("User prefers tabs", Category::Preference)
            .agent("coder")
            .path("/repo")
            .with_confidence(0.7);
        assert_eq!(m.agent_handle.as_deref(), Some("coder"));
        assert_eq!(m.path_scope.as_deref(), Some("/repo"));
        assert_eq!(m.confidence, Some(0.7));
        assert!(m.id.is_none());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::Preference).unwrap();
        assert_eq!(json, "\"preference\"");
    }
}
