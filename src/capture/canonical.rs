//! Location label canonicalization
//!
//! Raw location identifiers arrive in several shapes depending on where they
//! were read from: tileset ids (`tt_castle`), scene names (`BASE_CASTLE`),
//! localization keys (`#CASTLE_SHORTNAME`), sometimes wrapped in inline
//! markup. [`canonicalize`] maps all of them to one human-readable label.
//!
//! Matching is case-insensitive. Rules are tried in table order and the
//! first match wins: exact rules, then substring rules. Unmapped values with
//! a known namespace prefix get the prefix stripped and underscores turned
//! into spaces; anything else comes back as-is.

use crate::types::UNKNOWN_LOCATION;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy)]
enum Match {
    Exact(&'static str),
    Contains(&'static str),
}

/// Ordered rule table. Keys are lower-case.
const RULES: &[(Match, &str)] = &[
    (Match::Exact("tt_foyer"), "Breach"),
    (Match::Exact("base_foyer"), "Breach"),
    (Match::Exact("foyer"), "Breach"),
    (Match::Exact("tt_castle"), "Keep of the Lead Lord"),
    (Match::Exact("base_castle"), "Keep of the Lead Lord"),
    (Match::Exact("tt_sewer"), "Oubliette"),
    (Match::Exact("base_sewer"), "Oubliette"),
    (Match::Exact("tt5"), "Gungeon Proper"),
    (Match::Exact("tt_gungeon"), "Gungeon Proper"),
    (Match::Exact("base_gungeon"), "Gungeon Proper"),
    (Match::Exact("tt_cathedral"), "Abbey of the True Gun"),
    (Match::Exact("base_cathedral"), "Abbey of the True Gun"),
    (Match::Exact("tt_mines"), "Black Powder Mine"),
    (Match::Exact("base_mines"), "Black Powder Mine"),
    (Match::Exact("ss_resourcefulrat"), "Resourceful Rat's Lair"),
    (Match::Exact("base_resourcefulrat"), "Resourceful Rat's Lair"),
    (Match::Exact("tt_catacombs"), "Hollow"),
    (Match::Exact("base_catacombs"), "Hollow"),
    (Match::Exact("tt_nakatomi"), "R&G Dept"),
    (Match::Exact("base_nakatomi"), "R&G Dept"),
    (Match::Exact("tt_forge"), "Forge"),
    (Match::Exact("base_forge"), "Forge"),
    (Match::Exact("tt_bullethell"), "Bullet Hell"),
    (Match::Exact("base_bullethell"), "Bullet Hell"),
    (Match::Exact("tt_tutorial"), "Halls of Knowledge"),
    (Match::Exact("base_tutorial"), "Halls of Knowledge"),
    // localization keys and decorated scene names
    (Match::Contains("castle"), "Keep of the Lead Lord"),
    (Match::Contains("sewer"), "Oubliette"),
    (Match::Contains("cathedral"), "Abbey of the True Gun"),
    (Match::Contains("abbey"), "Abbey of the True Gun"),
    (Match::Contains("resourcefulrat"), "Resourceful Rat's Lair"),
    (Match::Contains("ratgeon"), "Resourceful Rat's Lair"),
    (Match::Contains("mines"), "Black Powder Mine"),
    (Match::Contains("catacomb"), "Hollow"),
    (Match::Contains("nakatomi"), "R&G Dept"),
    (Match::Contains("bullethell"), "Bullet Hell"),
    (Match::Contains("forge"), "Forge"),
    (Match::Contains("gungeon_proper"), "Gungeon Proper"),
    (Match::Contains("tutorial"), "Halls of Knowledge"),
    (Match::Contains("foyer"), "Breach"),
];

/// Namespace prefixes stripped by the readability fallback (lower-case)
const NAMESPACE_PREFIXES: &[&str] = &["tt_", "base_", "ss_", "#"];

/// Map a raw location identifier to a canonical label
pub fn canonicalize(raw: &str) -> String {
    let stripped = strip_markup(raw.trim());
    let cleaned = stripped.trim();
    let key = cleaned.to_ascii_lowercase();

    for (rule, label) in RULES {
        let hit = match rule {
            Match::Exact(k) => key == *k,
            Match::Contains(k) => key.contains(k),
        };
        if hit {
            return (*label).to_string();
        }
    }

    for prefix in NAMESPACE_PREFIXES {
        if key.starts_with(prefix) && key.len() > prefix.len() {
            // prefixes are ASCII, so the byte offset is valid in `cleaned` too
            let rest = &cleaned[prefix.len()..];
            return rest.replace('_', " ").trim().to_string();
        }
    }

    cleaned.to_string()
}

/// True for labels that describe an in-progress transition
///
/// Empty labels, the unknown sentinel and anything mentioning "loading" are
/// transient and must not replace a stable location.
pub fn is_transient(label: &str) -> bool {
    let label = label.trim();
    label.is_empty()
        || label.eq_ignore_ascii_case(UNKNOWN_LOCATION)
        || label.to_ascii_lowercase().contains("loading")
}

/// Remove a leading `<tag>..</tag>` or `[tag]..[/tag]` span's tags
///
/// Only a span whose closing tag is present is unwrapped; the enclosed text
/// and anything after the span are kept.
fn strip_markup(s: &str) -> Cow<'_, str> {
    let (open, close) = match s.as_bytes().first() {
        Some(b'<') => ('<', '>'),
        Some(b'[') => ('[', ']'),
        _ => return Cow::Borrowed(s),
    };
    let Some(end) = s.find(close) else {
        return Cow::Borrowed(s);
    };
    let tag = &s[1..end];
    let name = tag
        .split(|c: char| c == '=' || c.is_whitespace())
        .next()
        .unwrap_or("");
    if name.is_empty() || name.starts_with('/') {
        return Cow::Borrowed(s);
    }
    let closing = format!("{open}/{name}{close}");
    let body = &s[end + 1..];
    match body.find(&closing) {
        Some(pos) => Cow::Owned(format!("{}{}", &body[..pos], &body[pos + closing.len()..])),
        None => Cow::Borrowed(s),
    }
}
