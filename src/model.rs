use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CATEGORY: &str = "Application";

/// How a record is started, resolved once at discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchSpec {
    /// Run `program` directly with `args`.
    Command { program: String, args: Vec<String> },
    /// Hand a bundle, executable or shortcut to the OS opener.
    Open(PathBuf),
}

impl LaunchSpec {
    /// Builds a command spec from already separated words. `None` when there is no program.
    pub fn from_words(words: Vec<String>) -> Option<Self> {
        let mut words = words.into_iter();
        let program = words.next().filter(|p| !p.is_empty())?;
        Some(LaunchSpec::Command {
            program,
            args: words.collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub id: String,               // e.g. "firefox.desktop", "Safari", "notepad"
    pub name: String,
    pub display_name: String,     // Drives sorting and ranking
    pub description: String,
    pub icon: String,             // Icon name, path or glyph
    pub launch_path: String,      // Human readable launch string
    pub category: String,
    pub keywords: Vec<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub launch: LaunchSpec,
}

impl AppRecord {
    pub fn new(id: String, name: String, launch_path: String, launch: LaunchSpec) -> Self {
        Self {
            id,
            display_name: name.clone(),
            name,
            description: String::new(),
            icon: String::new(),
            launch_path,
            category: DEFAULT_CATEGORY.to_string(),
            keywords: Vec::new(),
            last_used_at: None,
            launch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipEntry {
    pub content_hash: String,
    pub timestamp: i64,           // Milliseconds since the epoch
    pub content: String,
}

impl ClipEntry {
    pub fn new(content: String, timestamp: i64) -> Self {
        Self {
            content_hash: content_hash(&content),
            timestamp,
            content,
        }
    }
}

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}
