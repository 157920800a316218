//! Minimal XML plumbing for the USPS ShippingAPI.
//!
//! The API speaks a small, flat XML dialect; requests are built by
//! string assembly and responses are picked apart with tag extraction
//! rather than a full parser.

use std::sync::LazyLock;

use regex::Regex;

/// Regex for `<Address ID="n">...</Address>` response blocks.
static ADDRESS_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<Address\s+ID="(\d+)">(.*?)</Address>"#).expect("valid regex")
});

/// Regex for `<ZipCode ID="n">...</ZipCode>` response blocks.
static ZIPCODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<ZipCode\s+ID="(\d+)">(.*?)</ZipCode>"#).expect("valid regex")
});

/// Escapes a value for embedding in request XML.
#[must_use]
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Unescapes the entities USPS uses in response values.
#[must_use]
pub fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Extracts the text of the first `<tag>...</tag>` element, unescaped.
/// Returns an empty string when the tag is absent or empty.
#[must_use]
pub fn extract_tag(xml: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let Some(start) = xml.find(&open) else {
        return String::new();
    };
    let rest = &xml[start + open.len()..];
    let Some(end) = rest.find(&close) else {
        return String::new();
    };
    unescape(rest[..end].trim())
}

/// True when the fragment carries an `<Error>` element.
#[must_use]
pub fn has_error(xml: &str) -> bool {
    xml.contains("<Error>")
}

/// The `<Description>` of the first error in the fragment.
#[must_use]
pub fn error_description(xml: &str) -> String {
    let Some(start) = xml.find("<Error>") else {
        return String::new();
    };
    extract_tag(&xml[start..], "Description")
}

/// Splits a response into `(id, body)` pairs of its `<Address>`
/// blocks. Blocks with a malformed ID are skipped.
#[must_use]
pub fn address_blocks(xml: &str) -> Vec<(usize, String)> {
    ADDRESS_BLOCK_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let id = caps[1].parse::<usize>().ok()?;
            Some((id, caps[2].to_string()))
        })
        .collect()
}

/// Splits a response into `(id, body)` pairs of its `<ZipCode>`
/// blocks.
#[must_use]
pub fn zipcode_blocks(xml: &str) -> Vec<(usize, String)> {
    ZIPCODE_BLOCK_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let id = caps[1].parse::<usize>().ok()?;
            Some((id, caps[2].to_string()))
        })
        .collect()
}
