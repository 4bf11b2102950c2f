use sha2::{Digest, Sha256};
use url::Url;

/// Longest stem, in characters, a derived member name keeps.
const MAX_STEM_CHARS: usize = 80;

/// Device names Windows refuses as file stems.
const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Archive member name for the text derived from `url`: the basename of the
/// URL path with its extension swapped for `.txt`.
///
/// Falls back to `document--{hash}.txt` when the path has no usable basename.
pub fn derived_text_name(url: &Url) -> String {
    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(decode_segment)
        .unwrap_or_default();
    let stem = basename
        .rsplit_once('.')
        .map_or(basename.as_str(), |(stem, _)| stem);
    match portable_stem(stem) {
        Some(stem) => format!("{stem}.txt"),
        None => hashed_text_name("document", url),
    }
}

/// Same as [`derived_text_name`] but with a hash of the full URL appended,
/// for links whose basename collides with one already staged.
pub fn disambiguated_text_name(url: &Url) -> String {
    let plain = derived_text_name(url);
    let stem = plain.strip_suffix(".txt").unwrap_or(&plain);
    hashed_text_name(stem, url)
}

/// Percent-decodes a path segment; byte sequences that are not UTF-8 after
/// decoding become U+FFFD.
fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned(),
    }
}

fn hashed_text_name(stem: &str, url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let hash: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    format!("{stem}--{hash}.txt")
}

/// Turns a URL basename stem into one that unpacks on any platform: path and
/// shell-hostile characters become `_` (runs collapsed), edges are trimmed,
/// the length is capped and Windows device names get a trailing `_`.
fn portable_stem(raw: &str) -> Option<String> {
    let mut stem = String::with_capacity(raw.len());
    for c in raw.chars() {
        let hostile = c.is_control() || matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        let c = if hostile { '_' } else { c };
        if c == '_' && stem.ends_with('_') {
            continue;
        }
        stem.push(c);
    }

    let trimmed = stem.trim_matches(|c| matches!(c, '_' | ' ' | '.'));
    if trimmed.is_empty() {
        return None;
    }
    let mut stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(&stem))
    {
        stem.push('_');
    }
    Some(stem)
}
