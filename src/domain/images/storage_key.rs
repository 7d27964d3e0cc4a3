use reqwest::Url;

/// Backend key of an asset, taken from the last path segment of its URL.
///
/// Well-formed absolute URLs go through the URL parser first. When that
/// yields no segment (opaque URLs such as `blob:`), or the reference does
/// not parse at all, the text after the last `/` is used, ignoring a query
/// string or fragment.
pub fn storage_key(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    match Url::parse(reference) {
        Ok(url) => {
            let segment = url
                .path_segments()
                .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
                .map(|s| s.to_string());
            segment.or_else(|| tail_segment(url.path()))
        }
        Err(_) => tail_segment(reference),
    }
}

fn tail_segment(text: &str) -> Option<String> {
    let without_suffix = text
        .split(['?', '#'])
        .next()
        .unwrap_or(text)
        .trim_end_matches('/');
    let tail = without_suffix.rsplit('/').next().unwrap_or(without_suffix);
    if tail.is_empty() {
        None
    } else {
        Some(tail.to_string())
    }
}
