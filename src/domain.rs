//! Domain and text normalization helpers.

use regex::Regex;
use std::sync::LazyLock;

const PREFIXES: [&str; 3] = ["http://", "https://", "www."];

static SCRIPT_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap());

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br[^>]*>|</?(div|tr)\b[^>]*>").unwrap());

static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?(p|h[1-6])\b[^>]*>").unwrap());

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f\v]+").unwrap());

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n(\s*\n)+").unwrap());

/// Strips scheme and `www.` prefixes, case-insensitively, until none is left.
///
/// `clean_domain(clean_domain(x)) == clean_domain(x)` for every input.
pub fn clean_domain(input: &str) -> String {
    let mut domain = input.trim();
    loop {
        let stripped = PREFIXES.iter().find_map(|prefix| {
            domain
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &domain[prefix.len()..])
        });
        match stripped {
            Some(rest) => domain = rest.trim_start(),
            None => break,
        }
    }
    domain.trim_end().to_string()
}

/// Host plus path, the identity of an archived URL.
///
/// The host is lower-cased with `www.` removed; a root or empty path is
/// dropped, so `http://WWW.Example.com/` and `example.com` share a key.
/// Returns `None` for input that does not parse as a URL.
pub fn url_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parsed = match url::Url::parse(raw) {
        Ok(url) if url.host_str().is_some() => url,
        _ => url::Url::parse(&format!("http://{}", raw)).ok()?,
    };

    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = parsed.path();

    if path.is_empty() || path == "/" {
        Some(host.to_string())
    } else {
        Some(format!("{}{}", host, path))
    }
}

/// Reduces an HTML document to readable plain text.
pub fn strip_html(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, "");
    let text = PARAGRAPH.replace_all(&text, "\n\n");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = SPACES.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let text = lines.join("\n");
    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
