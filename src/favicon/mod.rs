//! Favicon resolution.
//!
//! Three tiers, tried strictly in sequence: an icon declared in the page
//! markup, the conventional `/favicon.ico` at the origin root, and the
//! Google favicon service keyed by hostname. The service tier is also
//! the deterministic, network-free placeholder written synchronously at
//! link-creation time.

pub mod extract;
pub mod origin;
pub mod probe;
pub mod types;

pub use origin::{InvalidUrl, PageOrigin};
pub use types::{IconResult, IconSource};

use crate::config::HttpConfig;

/// Icon-service URL for a hostname. Treated as always available and
/// never probed.
pub fn google_icon_url(host: &str, size: u32) -> String {
    format!("https://www.google.com/s2/favicons?domain={host}&sz={size}")
}

/// Deterministic placeholder favicon, pure string construction from the
/// hostname. `None` only when no hostname can be parsed out of the URL.
pub fn resolve_placeholder(http: &HttpConfig, page_url: &str) -> Option<String> {
    PageOrigin::parse(page_url)
        .ok()
        .map(|origin| google_icon_url(&origin.host, http.fallback_icon_size))
}

/// Full three-tier resolution. Every network step enforces its own
/// timeout, so the whole attempt is bounded; it always returns a result,
/// signalling total failure as `{url: None, source: none}`, never as an
/// error.
pub fn resolve(http: &HttpConfig, page_url: &str) -> IconResult {
    let origin = match PageOrigin::parse(page_url) {
        Ok(origin) => origin,
        Err(err) => {
            log::debug!("{err}");
            // salvage just the hostname and fall straight to the service tier
            return match origin::salvage_host(page_url) {
                Some(host) => IconResult {
                    url: Some(google_icon_url(&host, http.fallback_icon_size)),
                    source: IconSource::Google,
                },
                None => IconResult::none(),
            };
        }
    };

    let base = origin.base();

    // tier 1: icon declared in the page markup, confirmed by a probe
    if let Some(candidate) = extract::html_icon(http, page_url, &base) {
        if probe::icon_exists(http, &candidate) {
            return IconResult {
                url: Some(candidate),
                source: IconSource::Html,
            };
        }
        log::debug!("{page_url}: declared icon failed existence probe");
    }

    // tier 2: conventional root icon
    let root_candidate = format!("{base}/favicon.ico");
    if probe::icon_exists(http, &root_candidate) {
        return IconResult {
            url: Some(root_candidate),
            source: IconSource::Root,
        };
    }

    // tier 3: icon service, keyed by hostname
    IconResult {
        url: Some(google_icon_url(&origin.host, http.fallback_icon_size)),
        source: IconSource::Google,
    }
}
