//! Source loading: turn a URL, a file path or literal text into plain source text.

use crate::error::{PodscriptError, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("podscript/", env!("CARGO_PKG_VERSION"));

/// Inputs longer than this are never treated as paths.
const MAX_PATH_LEN: usize = 1024;

/// Where a piece of source text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Url(String),
    File(String),
    Text,
}

/// Loaded source text with its origin.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub text: String,
    pub kind: SourceKind,
}

/// Resolve `input` into source text.
///
/// `http(s)://` URLs are fetched and reduced to text. When `allow_files` is set,
/// a short single-line input naming an existing file is read from disk.
/// Anything else is used as the text itself.
pub async fn load_source(input: &str, allow_files: bool) -> Result<LoadedSource> {
    let trimmed = input.trim();

    let loaded = if is_url(trimmed) {
        info!("Fetching source from {}", trimmed);
        LoadedSource {
            text: fetch_url(trimmed).await?,
            kind: SourceKind::Url(trimmed.to_string()),
        }
    } else if allow_files && looks_like_path(trimmed) && Path::new(trimmed).is_file() {
        info!("Reading source from {}", trimmed);
        LoadedSource {
            text: read_file(Path::new(trimmed))?,
            kind: SourceKind::File(trimmed.to_string()),
        }
    } else {
        LoadedSource {
            text: input.to_string(),
            kind: SourceKind::Text,
        }
    };

    if loaded.text.trim().is_empty() {
        return Err(PodscriptError::SourceLoad(match &loaded.kind {
            SourceKind::Url(url) => format!("no text found at {}", url),
            SourceKind::File(path) => format!("{} is empty", path),
            SourceKind::Text => "source text is empty".to_string(),
        }));
    }

    debug!("Loaded {} characters of source", loaded.text.chars().count());
    Ok(loaded)
}

fn is_url(input: &str) -> bool {
    (input.starts_with("http://") || input.starts_with("https://"))
        && !input.contains(char::is_whitespace)
        && url::Url::parse(input).is_ok()
}

fn looks_like_path(input: &str) -> bool {
    !input.is_empty() && input.len() <= MAX_PATH_LEN && !input.contains('\n')
}

async fn fetch_url(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;

    let response = client.get(url).send().await.map_err(|e| {
        PodscriptError::SourceLoad(format!("failed to fetch {}: {}", url, e))
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PodscriptError::SourceLoad(format!(
            "failed to fetch {}: HTTP {}",
            url,
            status.as_u16()
        )));
    }

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("html"))
        .unwrap_or(true);

    let body = response.text().await.map_err(|e| {
        PodscriptError::SourceLoad(format!("failed to read {}: {}", url, e))
    })?;

    if is_html {
        html_to_text(&body)
    } else {
        Ok(body)
    }
}

/// Read a text file: UTF-8 with an optional BOM, falling back to Latin-1.
fn read_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        PodscriptError::SourceLoad(format!("failed to read {}: {}", path.display(), e))
    })?;
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

    Ok(match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    })
}

/// Rendering width for HTML; wide enough that paragraphs are not re-wrapped.
const HTML_WIDTH: usize = 500;

/// Reduce an HTML page to readable text.
pub fn html_to_text(html: &str) -> Result<String> {
    let rendered = html2text::from_read(html.as_bytes(), HTML_WIDTH)
        .map_err(|e| PodscriptError::SourceLoad(format!("failed to convert HTML: {}", e)))?;

    let mut text = String::with_capacity(rendered.len());
    let mut blank_run = 0;
    for line in rendered.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 || text.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        text.push_str(line);
        text.push('\n');
    }

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, routing::get, Router};

    #[tokio::test]
    async fn test_plain_text_passes_through() {
        let loaded = load_source("Coffee began in Ethiopia.", true).await.unwrap();
        assert_eq!(loaded.kind, SourceKind::Text);
        assert_eq!(loaded.text, "Coffee began in Ethiopia.");
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let err = load_source("   ", true).await.unwrap_err();
        assert!(matches!(err, PodscriptError::SourceLoad(_)));
    }

    #[tokio::test]
    async fn test_reads_file_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.txt");
        std::fs::write(&path, b"\xEF\xBB\xBFCaf\xC3\xA9 culture.").unwrap();

        let loaded = load_source(path.to_str().unwrap(), true).await.unwrap();
        assert!(matches!(loaded.kind, SourceKind::File(_)));
        assert_eq!(loaded.text, "Café culture.");
    }

    #[tokio::test]
    async fn test_latin1_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.txt");
        std::fs::write(&path, b"Caf\xE9").unwrap();

        let loaded = load_source(path.to_str().unwrap(), true).await.unwrap();
        assert_eq!(loaded.text, "Café");
    }

    #[tokio::test]
    async fn test_files_ignored_when_not_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.txt");
        std::fs::write(&path, "contents").unwrap();
        let input = path.to_str().unwrap();

        let loaded = load_source(input, false).await.unwrap();
        assert_eq!(loaded.kind, SourceKind::Text);
        assert_eq!(loaded.text, input);
    }

    #[tokio::test]
    async fn test_fetches_and_strips_html() {
        let app = Router::new().route(
            "/article",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "<html><head><style>p{}</style><script>var x = 1;</script></head>\
                     <body><h1>Coffee</h1><p>Beans &amp; brews.</p></body></html>",
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("http://{}/article", addr);
        let loaded = load_source(&url, false).await.unwrap();
        assert_eq!(loaded.kind, SourceKind::Url(url));
        assert!(loaded.text.contains("Coffee"));
        assert!(loaded.text.contains("Beans & brews."));
        assert!(!loaded.text.contains("var x"));
        assert!(!loaded.text.contains("<p>"));
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        let text = html_to_text("<p>caf&#233; &lt;3 Tea&mdash;then coffee&rsquo;s turn</p>").unwrap();
        assert_eq!(text, "caf\u{e9} <3 Tea\u{2014}then coffee\u{2019}s turn");
    }

    #[test]
    fn test_html_to_text_collapses_blank_lines() {
        let text = html_to_text("<p>One</p><br><br><br><p>Two</p>").unwrap();
        assert!(!text.contains("\n\n\n"));
        assert!(text.starts_with("One"));
        assert!(text.ends_with("Two"));
    }
}
