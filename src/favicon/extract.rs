use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::{blocking::Client, header, redirect::Policy};
use scraper::{Html, Selector};

use crate::config::HttpConfig;

/// Icon-declaring `<link>` selectors, most specific first. The first
/// selector with a usable match wins, regardless of where its element
/// sits in the document.
static ICON_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"link[rel="icon"][type="image/svg+xml"]"#,
        r#"link[rel="icon"][sizes="32x32"]"#,
        r#"link[rel="icon"][sizes="64x64"]"#,
        r#"link[rel="icon"][sizes="128x128"]"#,
        r#"link[rel="apple-touch-icon"]"#,
        r#"link[rel="apple-touch-icon-precomposed"]"#,
        r#"link[rel="icon"]"#,
        r#"link[rel="shortcut icon"]"#,
    ]
    .iter()
    .map(|selector| Selector::parse(selector).unwrap())
    .collect()
});

/// Fetches the page and returns the absolute URL of its best declared
/// icon, or `None`. Fetch and parse failures never escape.
pub fn html_icon(http: &HttpConfig, page_url: &str, base: &str) -> Option<String> {
    let body = fetch_page(http, page_url)?;
    let href = scan_icon_links(&body)?;
    Some(resolve_href(&href, base))
}

fn fetch_page(http: &HttpConfig, page_url: &str) -> Option<String> {
    let client = match Client::builder()
        .user_agent(&http.user_agent)
        .redirect(Policy::limited(http.max_redirects))
        .timeout(Duration::from_secs(http.page_timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            log::error!("failed to build page client: {err}");
            return None;
        }
    };

    let resp = match client
        .get(page_url)
        .header(
            header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .send()
    {
        Ok(resp) => resp,
        Err(err) => {
            log::debug!("{page_url}: page fetch failed: {err}");
            return None;
        }
    };

    // anything below 400 may still carry useful markup
    if resp.status().as_u16() >= 400 {
        log::debug!("{page_url}: page fetch returned {}", resp.status());
        return None;
    }

    resp.text().ok()
}

/// Scans parsed markup against the priority list and returns the first
/// non-empty `href` in selector order, not document order.
pub fn scan_icon_links(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    for selector in ICON_SELECTORS.iter() {
        let href = document
            .select(selector)
            .next()
            .and_then(|element| element.attr("href"))
            .unwrap_or_default();

        if !href.is_empty() {
            return Some(href.to_string());
        }
    }

    None
}

/// Resolves an icon `href` to an absolute URL against the base origin.
///
/// Path-relative references resolve against the origin root, not the
/// page's own path.
pub fn resolve_href(href: &str, base: &str) -> String {
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{rest}");
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    if href.starts_with('/') {
        return format!("{base}{href}");
    }

    format!("{base}/{href}")
}
