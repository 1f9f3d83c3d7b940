//! HTTP fetch tool.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use super::Tool;

const MAX_BODY_CHARS: usize = 1000;
/// Bytes read from the wire before the rest of the body is abandoned.
const MAX_FETCH_BYTES: usize = 256 * 1024;
const TRUNCATION_MARK: &str = "...(truncated)";

/// Fetch a URL with HTTP GET.
pub struct HttpGet;

#[async_trait]
impl Tool for HttpGet {
    fn name(&self) -> &str {
        "http_get"
    }

    fn description(&self) -> &str {
        "Send an HTTP GET request and return the response body (HTML is reduced to text, long bodies are truncated)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Target URL (http or https)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> anyhow::Result<String> {
        let url = args["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'url' must be a string"))?;
        let url = parse_http_url(url)?;

        tracing::info!("Fetching URL: {}", url);

        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; tool-agent/0.1)")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let mut response = client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(anyhow::anyhow!("HTTP {}", status));
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html"));

        if let Some(len) = response.content_length() {
            tracing::debug!(len, "Response body length");
        }

        let mut body = CappedBody::new(MAX_FETCH_BYTES);
        while let Some(chunk) = response.chunk().await? {
            if !body.push(&chunk) {
                tracing::debug!(cap = MAX_FETCH_BYTES, "Response body exceeds cap, stopped reading");
                break;
            }
        }

        let (body, cut_short) = body.into_text();
        let text = if is_html {
            extract_text_from_html(&body)
        } else {
            body
        };

        let mut out = truncate_chars(&text, MAX_BODY_CHARS);
        if cut_short && !out.ends_with(TRUNCATION_MARK) {
            out.push_str(TRUNCATION_MARK);
        }
        Ok(out)
    }
}

fn parse_http_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow::anyhow!("Unsupported URL scheme '{}'", other)),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARK),
        None => text.to_string(),
    }
}

/// Response body accumulated up to a byte cap.
struct CappedBody {
    bytes: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl CappedBody {
    fn new(cap: usize) -> Self {
        Self {
            bytes: Vec::new(),
            cap,
            truncated: false,
        }
    }

    /// Append a chunk. Returns `false` once the cap is hit and reading should stop.
    fn push(&mut self, chunk: &[u8]) -> bool {
        let room = self.cap - self.bytes.len();
        if chunk.len() > room {
            self.bytes.extend_from_slice(&chunk[..room]);
            self.truncated = true;
            return false;
        }
        self.bytes.extend_from_slice(chunk);
        true
    }

    /// Decode as UTF-8 (lossy), dropping a character split by the cap.
    fn into_text(self) -> (String, bool) {
        let mut bytes = self.bytes;
        if self.truncated {
            if let Err(e) = std::str::from_utf8(&bytes) {
                if e.error_len().is_none() {
                    bytes.truncate(e.valid_up_to());
                }
            }
        }
        (String::from_utf8_lossy(&bytes).into_owned(), self.truncated)
    }
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Strip scripts, styles and tags, collapsing whitespace.
fn extract_text_from_html(html: &str) -> String {
    let mut text = html.to_string();

    for (open, close) in [("<script", "</script>"), ("<style", "</style>")] {
        while let Some(start) = text.find(open) {
            match text[start..].find(close) {
                Some(end) => text.replace_range(start..start + end + close.len(), ""),
                None => break,
            }
        }
    }

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    html_decode(&result.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_schemes_are_accepted() {
        assert!(parse_http_url("https://example.com/a").is_ok());
        assert!(parse_http_url("http://localhost:8080").is_ok());
        assert!(parse_http_url("file:///etc/passwd").is_err());
        assert!(parse_http_url("not a url").is_err());
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundaries() {
        let body = "é".repeat(1500);
        let out = truncate_chars(&body, MAX_BODY_CHARS);
        assert!(out.ends_with("...(truncated)"));
        assert_eq!(out.trim_end_matches("...(truncated)").chars().count(), 1000);
        assert_eq!(truncate_chars("short", MAX_BODY_CHARS), "short");
    }

    #[test]
    fn body_reading_stops_at_the_byte_cap() {
        let mut body = CappedBody::new(8);
        assert!(body.push(b"abcd"));
        assert!(body.push(b"efgh"));
        assert!(!body.push(b"ijkl"));
        assert_eq!(body.into_text(), ("abcdefgh".to_string(), true));

        let mut exact = CappedBody::new(4);
        assert!(exact.push(b"abcd"));
        assert_eq!(exact.into_text(), ("abcd".to_string(), false));
    }

    #[test]
    fn capped_body_drops_a_split_character() {
        // "é" is two bytes; the cap lands between them.
        let mut body = CappedBody::new(2);
        assert!(!body.push("aé!".as_bytes()));
        assert_eq!(body.into_text(), ("a".to_string(), true));

        let mut invalid = CappedBody::new(16);
        assert!(invalid.push(&[b'o', b'k', 0xff]));
        assert_eq!(invalid.into_text(), ("ok\u{fffd}".to_string(), false));
    }

    #[test]
    fn html_is_reduced_to_text() {
        let html = "<html><head><style>p{}</style><script>var x = 1;</script></head>\
                    <body><p>Fish &amp; chips</p>\n<p>&lt;tasty&gt;</p></body></html>";
        assert_eq!(extract_text_from_html(html), "Fish & chips <tasty>");
    }

    #[tokio::test]
    async fn rejects_invalid_url_before_sending() {
        let err = HttpGet
            .execute(json!({"url": "ftp://example.com"}), Path::new("."))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported URL scheme 'ftp'");
    }
}
