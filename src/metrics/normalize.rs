use std::collections::HashMap;
use std::sync::OnceLock;

const KNOWN_SOURCES: [(&str, &str); 5] = [
    ("substack", "Substack"),
    ("freecodecamp", "freeCodeCamp"),
    ("github", "GitHub"),
    ("shopify", "Shopify"),
    ("stripe", "Stripe"),
];

static CANONICAL_BY_UPPER: OnceLock<HashMap<String, &'static str>> = OnceLock::new();

fn canonical_table() -> &'static HashMap<String, &'static str> {
    CANONICAL_BY_UPPER.get_or_init(|| {
        KNOWN_SOURCES
            .iter()
            .map(|(key, display)| (key.to_uppercase(), *display))
            .collect()
    })
}

/// Map a free-text source label onto its canonical display name.
///
/// Known sources match case-insensitively. Anything else comes back exactly
/// as given, casing included, so `medium` and `Medium` stay distinct groups.
pub fn normalize_source_name(name: &str) -> String {
    match canonical_table().get(&name.to_uppercase()) {
        Some(display) => (*display).to_string(),
        None => name.to_string(),
    }
}
