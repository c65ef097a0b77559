//! Saved feed definitions, read from the server's option set.
//!
//! The server stores feeds as numbered option groups:
//! `Feed1.URL`, `Feed1.Name`, `Feed1.Category`, `Feed1.Priority`, `Feed2.URL`, ...

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only option lookup.
pub trait FeedOptions {
    fn option(&self, name: &str) -> Option<&str>;
}

impl FeedOptions for HashMap<String, String> {
    fn option(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// One `{Name, Value}` pair as returned by the `config` RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl FeedOptions for [ConfigEntry] {
    /// Option names are case-insensitive on the server side.
    fn option(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.value.as_str())
    }
}

impl FeedOptions for Vec<ConfigEntry> {
    fn option(&self, name: &str) -> Option<&str> {
        self.as_slice().option(name)
    }
}

/// A feed configured on the server, addressed by its 1-based ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDefinition {
    pub id: u32,
    pub url: String,
    pub name: String,
    pub category: String,
    /// Raw priority option; parsed when a session captures its defaults.
    pub priority: String,
}

impl FeedDefinition {
    /// Reads definition `id`, or `None` when `Feed{id}.URL` is not set at all.
    ///
    /// A present-but-blank URL still yields a definition; callers decide
    /// whether blank feeds are shown.
    pub fn read(options: &(impl FeedOptions + ?Sized), id: u32) -> Option<Self> {
        let url = options.option(&format!("Feed{id}.URL"))?;
        let field = |key: &str| {
            options
                .option(&format!("Feed{id}.{key}"))
                .unwrap_or_default()
                .to_string()
        };

        Some(Self {
            id,
            url: url.to_string(),
            name: field("Name"),
            category: field("Category"),
            priority: field("Priority"),
        })
    }

    /// Label for menus and dialog titles: the name, or `Feed{id}` when unnamed.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("Feed{}", self.id)
        } else {
            self.name.clone()
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Enumerates definitions `Feed1`, `Feed2`, ... until the first ordinal with
/// no URL option. Blank URLs are skipped without ending the enumeration.
pub fn feed_definitions(options: &(impl FeedOptions + ?Sized)) -> Vec<FeedDefinition> {
    (1..)
        .map_while(|id| FeedDefinition::read(options, id))
        .filter(FeedDefinition::has_url)
        .collect()
}

/// `(id, label)` pairs for a feed menu.
pub fn menu_entries(options: &(impl FeedOptions + ?Sized)) -> Vec<(u32, String)> {
    feed_definitions(options)
        .into_iter()
        .map(|def| (def.id, def.label()))
        .collect()
}
