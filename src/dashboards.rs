use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use url::Url;

pub const NO_DASHBOARDS_MESSAGE: &str = "Dashboards not available.";

/// Named campaign dashboards, in the order the config file lists them.
pub struct Dashboards<'a> {
    entries: &'a IndexMap<String, Url>,
}

impl<'a> Dashboards<'a> {
    pub fn new(entries: &'a IndexMap<String, Url>) -> Self {
        Dashboards { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Exact name first, then a case-insensitive match.
    pub fn resolve(&self, name: &str) -> Result<&'a Url> {
        if let Some(url) = self.entries.get(name) {
            return Ok(url);
        }
        let wanted = name.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| key.to_lowercase() == wanted)
            .map(|(_, url)| url)
            .ok_or_else(|| {
                anyhow!(
                    "Unknown dashboard '{}'. Available: {}",
                    name,
                    self.names().join(", ")
                )
            })
    }

    pub fn listing(&self) -> String {
        if self.is_empty() {
            return NO_DASHBOARDS_MESSAGE.to_string();
        }
        self.entries
            .iter()
            .map(|(name, url)| format!("{}: {}", name, url))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
