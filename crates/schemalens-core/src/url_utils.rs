use url::Url;

/// Normalize a page URL for identity comparison.
///
/// Drops the fragment and trailing slashes. Falls back to trimming trailing
/// slashes if the input cannot be parsed.
pub fn normalize_page_url(input: &str) -> String {
    match Url::parse(input.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => input.trim().trim_end_matches('/').to_string(),
    }
}

/// Reduce a vocabulary IRI to its local name.
///
/// `https://schema.org/Product` becomes `Product`, `http://example.com#offers`
/// becomes `offers`. Plain names pass through untouched.
pub fn shorten_schema_iri(iri: &str) -> String {
    let trimmed = iri.trim();
    if Url::parse(trimmed).is_err() {
        return trimmed.to_string();
    }

    let local = match trimmed.rfind('#') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(trimmed),
    };

    if local.is_empty() {
        trimmed.to_string()
    } else {
        local.to_string()
    }
}
