use std::time::Duration;

use reqwest::{blocking::Client, header, redirect::Policy};

use crate::config::HttpConfig;

/// Header-only existence check against a candidate icon URL.
///
/// True only when the server answers below 400 with an image-ish content
/// type, or when the path carries the conventional `.ico` extension
/// (some servers omit the content type for it). Every failure mode --
/// timeout, DNS, refused connection, bad status -- collapses to `false`.
pub fn icon_exists(http: &HttpConfig, candidate: &str) -> bool {
    let client = match Client::builder()
        .user_agent(&http.user_agent)
        .redirect(Policy::limited(http.max_redirects))
        .timeout(Duration::from_secs(http.probe_timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            log::error!("failed to build probe client: {err}");
            return false;
        }
    };

    let resp = match client.head(candidate).send() {
        Ok(resp) => resp,
        Err(err) => {
            log::debug!("{candidate}: probe failed: {err}");
            return false;
        }
    };

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    is_usable_icon(resp.status().as_u16(), &content_type, candidate)
}

/// Pure classification half of the probe.
pub(crate) fn is_usable_icon(status: u16, content_type: &str, url: &str) -> bool {
    if status >= 400 {
        return false;
    }

    content_type.contains("image") || content_type.contains("icon") || has_ico_path(url)
}

fn has_ico_path(url: &str) -> bool {
    url.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .ends_with(".ico")
}
