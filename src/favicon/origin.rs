use url::Url;

#[derive(thiserror::Error, Debug)]
#[error("invalid url: {0:?}")]
pub struct InvalidUrl(pub String);

/// Scheme and host of a page URL, the only parts favicon resolution
/// cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin {
    pub scheme: String,
    pub host: String,
}

impl PageOrigin {
    /// Parses a user-supplied string. Fails when there is no scheme or
    /// no host; performs no network access.
    pub fn parse(raw: &str) -> Result<PageOrigin, InvalidUrl> {
        let parsed = Url::parse(raw).map_err(|_| InvalidUrl(raw.to_string()))?;

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| InvalidUrl(raw.to_string()))?;

        Ok(PageOrigin {
            scheme: parsed.scheme().to_string(),
            host: host.to_string(),
        })
    }

    /// Base origin, `scheme://host`.
    pub fn base(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Last-ditch hostname extraction for the orchestrator's error path.
pub fn salvage_host(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|parsed| parsed.host_str().filter(|host| !host.is_empty()).map(str::to_string))
}
