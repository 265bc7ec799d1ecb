use serde::{Deserialize, Serialize};

/// Which tier of the fallback chain produced the icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconSource {
    /// Icon declared by a `<link>` element in the page markup.
    Html,
    /// Conventional `/favicon.ico` at the origin root.
    Root,
    /// Google favicon service keyed by hostname.
    Google,
    /// No icon could be derived at all.
    None,
}

impl IconSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconSource::Html => "html",
            IconSource::Root => "root",
            IconSource::Google => "google",
            IconSource::None => "none",
        }
    }
}

/// Outcome of one resolution attempt. `url` is only `None` when
/// `source` is [`IconSource::None`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconResult {
    pub url: Option<String>,
    pub source: IconSource,
}

impl IconResult {
    pub fn none() -> Self {
        IconResult {
            url: None,
            source: IconSource::None,
        }
    }
}
