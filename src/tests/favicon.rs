use crate::config::HttpConfig;
use crate::favicon::{self, extract, probe, IconSource, PageOrigin};

// --- normalization ---

#[test]
fn test_origin_parse() {
    let origin = PageOrigin::parse("https://sub.example.com/some/path?q=1").unwrap();
    assert_eq!(origin.scheme, "https");
    assert_eq!(origin.host, "sub.example.com");
    assert_eq!(origin.base(), "https://sub.example.com");
}

#[test]
fn test_origin_parse_rejects_garbage() {
    // no scheme
    assert!(PageOrigin::parse("not a url").is_err());
    assert!(PageOrigin::parse("example.com/page").is_err());

    // scheme but no host
    assert!(PageOrigin::parse("mailto:someone@example.com").is_err());
    assert!(PageOrigin::parse("file:///etc/hosts").is_err());
}

// --- placeholder (phase 1) ---

#[test]
fn test_placeholder_is_keyed_on_hostname() {
    let http = HttpConfig::default();

    // no network I/O happens here; pure string construction
    let placeholder = favicon::resolve_placeholder(&http, "https://sub.example.com/path").unwrap();
    assert_eq!(
        placeholder,
        "https://www.google.com/s2/favicons?domain=sub.example.com&sz=64"
    );

    assert!(favicon::resolve_placeholder(&http, "not a url").is_none());
}

#[test]
fn test_resolve_unsalvageable_input_yields_none() {
    let http = HttpConfig::default();

    let result = favicon::resolve(&http, "not a url");
    assert!(result.url.is_none());
    assert_eq!(result.source, IconSource::None);

    // parseable but hostless; there is no hostname to key the service
    // tier on, so this is a total failure too
    let result = favicon::resolve(&http, "file:///etc/hosts");
    assert!(result.url.is_none());
    assert_eq!(result.source, IconSource::None);
}

// --- href resolution ---

#[test]
fn test_resolve_href() {
    let base = "https://example.com";

    assert_eq!(
        extract::resolve_href("//cdn.example.com/i.png", base),
        "https://cdn.example.com/i.png"
    );
    assert_eq!(
        extract::resolve_href("https://other.com/i.png", base),
        "https://other.com/i.png"
    );
    assert_eq!(
        extract::resolve_href("http://other.com/i.png", base),
        "http://other.com/i.png"
    );
    assert_eq!(
        extract::resolve_href("/icons/i.png", base),
        "https://example.com/icons/i.png"
    );
    // path-relative references resolve against the origin root
    assert_eq!(
        extract::resolve_href("i.png", base),
        "https://example.com/i.png"
    );
}

// --- selector priority ---

#[test]
fn test_scan_prefers_svg_over_shortcut_regardless_of_document_order() {
    // legacy shortcut icon appears first in the markup, svg must still win
    let body = r#"<html><head>
        <link rel="shortcut icon" href="/legacy.ico">
        <link rel="icon" type="image/svg+xml" href="/icon.svg">
    </head><body></body></html>"#;

    assert_eq!(extract::scan_icon_links(body).as_deref(), Some("/icon.svg"));
}

#[test]
fn test_scan_sized_icon_beats_apple_touch() {
    let body = r#"<html><head>
        <link rel="apple-touch-icon" href="/apple.png">
        <link rel="icon" sizes="32x32" href="/icon-32.png">
    </head><body></body></html>"#;

    assert_eq!(
        extract::scan_icon_links(body).as_deref(),
        Some("/icon-32.png")
    );
}

#[test]
fn test_scan_falls_back_through_the_priority_list() {
    let body = r#"<html><head>
        <link rel="shortcut icon" href="/legacy.ico">
    </head><body></body></html>"#;
    assert_eq!(extract::scan_icon_links(body).as_deref(), Some("/legacy.ico"));

    let body = r#"<html><head>
        <link rel="apple-touch-icon-precomposed" href="/pre.png">
        <link rel="shortcut icon" href="/legacy.ico">
    </head><body></body></html>"#;
    assert_eq!(extract::scan_icon_links(body).as_deref(), Some("/pre.png"));
}

#[test]
fn test_scan_skips_selectors_with_empty_hrefs() {
    let body = r#"<html><head>
        <link rel="apple-touch-icon" href="">
        <link rel="shortcut icon" href="/legacy.ico">
    </head><body></body></html>"#;

    assert_eq!(extract::scan_icon_links(body).as_deref(), Some("/legacy.ico"));
}

#[test]
fn test_scan_without_icon_links() {
    let body = r#"<html><head>
        <title>no icons here</title>
        <link rel="stylesheet" href="/style.css">
    </head><body></body></html>"#;

    assert_eq!(extract::scan_icon_links(body), None);
}

#[test]
fn test_scan_tolerates_broken_markup() {
    assert_eq!(extract::scan_icon_links("<<<not html at all"), None);
    assert_eq!(extract::scan_icon_links(""), None);
}

// --- probe classification ---

#[test]
fn test_usable_icon_classification() {
    // success + image content type
    assert!(probe::is_usable_icon(
        200,
        "image/svg+xml",
        "https://example.com/icon.svg"
    ));
    assert!(probe::is_usable_icon(
        200,
        "image/x-icon",
        "https://example.com/favicon.ico"
    ));

    // servers that omit the content type for .ico still pass
    assert!(probe::is_usable_icon(
        200,
        "",
        "https://example.com/favicon.ico"
    ));
    assert!(probe::is_usable_icon(
        200,
        "application/octet-stream",
        "https://example.com/favicon.ico?v=2"
    ));

    // non-image content type on a non-ico path fails
    assert!(!probe::is_usable_icon(
        200,
        "text/html",
        "https://example.com/page"
    ));

    // error statuses always fail, even for convincing candidates
    assert!(!probe::is_usable_icon(
        404,
        "image/png",
        "https://example.com/favicon.ico"
    ));
    assert!(!probe::is_usable_icon(
        500,
        "image/png",
        "https://example.com/icon.png"
    ));
}

// --- service fallback ---

#[test]
fn test_google_icon_url_contains_hostname_and_size() {
    let url = favicon::google_icon_url("no-such-host.invalid", 64);
    assert_eq!(
        url,
        "https://www.google.com/s2/favicons?domain=no-such-host.invalid&sz=64"
    );
}
