//! Derivation of the streaming endpoint from the query endpoint.
//!
//! Servers expose the streaming route as a sibling of the query route, so
//! `https://host/api/query` streams from `https://host/api/stream`.

use url::Url;

/// Build the SSE endpoint URL for `query` from the configured `base_url`.
///
/// Never fails: an empty base yields a relative `/stream?q=...` and an
/// unparseable base degrades to plain string concatenation.
pub fn build_stream_url(base_url: &str, query: &str) -> String {
    let encoded = urlencoding::encode(query);
    let base = base_url.trim();

    if base.is_empty() {
        return format!("/stream?q={}", encoded);
    }

    match Url::parse(base) {
        Ok(url) if !url.cannot_be_a_base() => with_stream_path(url, &encoded),
        Ok(_) | Err(_) => {
            tracing::debug!("Stream base {:?} is not a hierarchical URL, concatenating", base);
            format!("{}/stream?q={}", base.trim_end_matches('/'), encoded)
        }
    }
}

fn with_stream_path(mut url: Url, encoded_query: &str) -> String {
    let mut segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    match segments.last_mut() {
        Some(last) => *last = "stream",
        None => segments.push("stream"),
    }
    let path = format!("/{}", segments.join("/"));

    let mut params: Vec<String> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("q"))
        .map(str::to_owned)
        .collect();
    params.push(format!("q={}", encoded_query));
    let query = params.join("&");

    url.set_path(&path);
    url.set_query(Some(&query));
    url.into()
}
