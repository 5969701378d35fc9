//! Canned response table
//!
//! An ordered list of `(keyword, candidates)` pairs plus a default candidate
//! set. Lookup is first-match-wins in table order: the message is lower-cased
//! and the first keyword it contains selects the candidate list.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::{Error, Result};

/// Table compiled into the binary
const BUILTIN_RESPONSES: &str = include_str!("../../data/responses.json");

/// One keyword and the answers it may produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Case-insensitive substring to look for
    pub keyword: String,
    /// Candidate answers, one is picked at random
    pub responses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    keywords: Vec<KeywordEntry>,
    defaults: Vec<String>,
}

/// Immutable keyword-to-answers table used when no completion is available
#[derive(Debug, Clone)]
pub struct CannedResponseTable {
    entries: Vec<KeywordEntry>,
    defaults: Vec<String>,
}

impl CannedResponseTable {
    /// Build a table, rejecting empty keywords, empty candidate lists and
    /// blank candidates
    pub fn new(entries: Vec<KeywordEntry>, defaults: Vec<String>) -> Result<Self> {
        if defaults.is_empty() {
            return Err(Error::config("response table needs at least one default response"));
        }
        if defaults.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::config("response table has a blank default response"));
        }

        let mut normalized = Vec::with_capacity(entries.len());
        for entry in entries {
            let keyword = entry.keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(Error::config("response table has an empty keyword"));
            }
            if entry.responses.is_empty() {
                return Err(Error::config(format!("keyword '{keyword}' has no responses")));
            }
            if entry.responses.iter().any(|r| r.trim().is_empty()) {
                return Err(Error::config(format!("keyword '{keyword}' has a blank response")));
            }
            normalized.push(KeywordEntry {
                keyword,
                responses: entry.responses,
            });
        }

        Ok(Self {
            entries: normalized,
            defaults,
        })
    }

    /// The table shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RESPONSES)
    }

    /// Parse a table from `{"keywords": [...], "defaults": [...]}` JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(json)?;
        Self::new(file.keywords, file.defaults)
    }

    /// Read a table from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The configured table, or the built-in one
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        match &config.responses_path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    /// Keyword matched by `message` and its candidates; `None` means the
    /// defaults apply
    pub fn candidates_for(&self, message: &str) -> (Option<&str>, &[String]) {
        let lowered = message.to_lowercase();
        self.entries
            .iter()
            .find(|entry| lowered.contains(entry.keyword.as_str()))
            .map_or((None, self.defaults.as_slice()), |entry| {
                (Some(entry.keyword.as_str()), entry.responses.as_slice())
            })
    }

    /// Pick a random answer for `message`
    pub fn pick(&self, message: &str) -> Result<&str> {
        self.pick_with(message, &mut rand::thread_rng())
    }

    /// Pick an answer for `message` using the given random source
    pub fn pick_with<R: Rng + ?Sized>(&self, message: &str, rng: &mut R) -> Result<&str> {
        let (keyword, candidates) = self.candidates_for(message);
        candidates.choose(rng).map(String::as_str).ok_or_else(|| {
            Error::internal(format!(
                "no fallback candidates for keyword {}",
                keyword.unwrap_or("<default>")
            ))
        })
    }

    /// Keywords in match order
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.keyword.as_str())
    }

    /// The default candidates
    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    /// Number of keywords
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no keywords (defaults still apply)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
