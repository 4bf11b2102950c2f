use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// How many leading bytes are scanned for a `<meta charset>` declaration.
const META_PRESCAN_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    /// Some bytes did not fit the encoding and became U+FFFD.
    pub had_replacements: bool,
}

/// Decode an HTML member into UTF-8 using: BOM -> meta charset -> chardetng.
///
/// Archived pages carry no HTTP headers, so the in-document declaration stands
/// in for the Content-Type charset. Stray bytes are replaced rather than
/// failing the page.
pub fn decode_html(bytes: &[u8]) -> DecodedText {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => sniff_meta_charset(bytes).unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        }),
    };
    decode_lossy(bytes, encoding)
}

/// Decode text that has no declared encoding: BOM, then UTF-8, then `fallback`.
///
/// Never fails; the fallback decode replaces unmappable bytes.
pub fn decode_with_fallback(bytes: &[u8], fallback: &'static Encoding) -> DecodedText {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_lossy(bytes, encoding);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => DecodedText {
            text: text.to_string(),
            encoding_label: UTF_8.name().to_string(),
            had_replacements: false,
        },
        Err(_) => decode_lossy(bytes, fallback),
    }
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_PRESCAN_BYTES)];
    let lowered: Vec<u8> = head.iter().map(u8::to_ascii_lowercase).collect();
    let needle = b"charset=";
    let pos = lowered.windows(needle.len()).position(|w| w == needle)?;
    let rest = &head[pos + needle.len()..];
    let label: Vec<u8> = rest
        .iter()
        .copied()
        .skip_while(|b| *b == b'"' || *b == b'\'' || *b == b' ')
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
        .collect();
    if label.is_empty() {
        return None;
    }
    Encoding::for_label(&label)
}

fn decode_lossy(bytes: &[u8], enc: &'static Encoding) -> DecodedText {
    let (text, _, had_replacements) = enc.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
        had_replacements,
    }
}
