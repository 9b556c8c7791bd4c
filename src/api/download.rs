//! Attachment downloads: filename negotiation and disk writes.

use std::path::PathBuf;

use anyhow::Context;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

/// Extract a filename from a `Content-Disposition` header value.
///
/// Prefers the RFC 5987 `filename*=UTF-8''…` form (percent-decoded) over
/// the plain `filename="…"` form; returns `fallback` when neither parses.
#[must_use]
pub fn filename_from_content_disposition(header: Option<&str>, fallback: &str) -> String {
    let Some(header) = header else {
        return fallback.to_owned();
    };

    if let Some(name) = extended_filename(header) {
        return name;
    }
    if let Some(name) = plain_filename(header) {
        return name;
    }
    fallback.to_owned()
}

fn extended_filename(header: &str) -> Option<String> {
    let idx = header.find("filename*=")?;
    let rest = &header[idx + "filename*=".len()..];
    let value = rest.split(';').next()?.trim();
    // RFC 5987: charset'language'percent-encoded-value
    let encoded = value
        .strip_prefix("UTF-8''")
        .or_else(|| value.strip_prefix("utf-8''"))?;
    let decoded = urlencoding::decode(encoded).ok()?;
    let decoded = decoded.trim().trim_matches('"');
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.to_owned())
    }
}

fn plain_filename(header: &str) -> Option<String> {
    // Match filename= but not filename*=
    let mut search = header;
    loop {
        let idx = search.find("filename=")?;
        let preceded_by_star = idx > 0 && search.as_bytes()[idx - 1] == b'*';
        if preceded_by_star {
            search = &search[idx + "filename=".len()..];
            continue;
        }
        let rest = &search[idx + "filename=".len()..];
        let value = rest.split(';').next()?.trim().trim_matches('"').trim();
        return if value.is_empty() {
            None
        } else {
            Some(value.to_owned())
        };
    }
}

/// Strip path components so a server-supplied name cannot escape the
/// downloads directory.
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim()
        .trim_start_matches('.');
    if base.is_empty() {
        "download".to_owned()
    } else {
        base.to_owned()
    }
}

/// Stream a response body into the downloads directory.
///
/// The filename comes from `Content-Disposition` when present, else
/// `fallback`. Returns the path written.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the file cannot be
/// written, or the body stream fails mid-transfer.
pub async fn save_attachment(
    response: reqwest::Response,
    fallback: &str,
) -> anyhow::Result<PathBuf> {
    let dir = crate::utils::paths::downloads_dir();
    save_attachment_to(response, fallback, &dir).await
}

/// [`save_attachment`] with an explicit target directory.
///
/// # Errors
///
/// Same failure modes as [`save_attachment`].
pub async fn save_attachment_to(
    response: reqwest::Response,
    fallback: &str,
    dir: &std::path::Path,
) -> anyhow::Result<PathBuf> {
    let header = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);

    let filename = sanitize_filename(&filename_from_content_disposition(
        header.as_deref(),
        fallback,
    ));

    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create downloads directory {}", dir.display()))?;

    let path = dir.join(&filename);
    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("Download stream failed")?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::info!(path = %path.display(), "saved attachment");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_extended_filename() {
        let header = r#"attachment; filename="plain.log"; filename*=UTF-8''crawl%20log%20%231.txt"#;
        assert_eq!(
            filename_from_content_disposition(Some(header), "fallback.txt"),
            "crawl log #1.txt"
        );
    }

    #[test]
    fn falls_back_to_quoted_filename() {
        let header = r#"attachment; filename="job-J1.log""#;
        assert_eq!(
            filename_from_content_disposition(Some(header), "fallback.txt"),
            "job-J1.log"
        );
    }

    #[test]
    fn accepts_unquoted_filename_token() {
        let header = "attachment; filename=export.json";
        assert_eq!(
            filename_from_content_disposition(Some(header), "fallback.txt"),
            "export.json"
        );
    }

    #[test]
    fn uses_fallback_when_header_is_missing_or_empty() {
        assert_eq!(
            filename_from_content_disposition(None, "fallback.txt"),
            "fallback.txt"
        );
        assert_eq!(
            filename_from_content_disposition(Some("attachment"), "fallback.txt"),
            "fallback.txt"
        );
        assert_eq!(
            filename_from_content_disposition(Some(r#"attachment; filename="""#), "fallback.txt"),
            "fallback.txt"
        );
    }

    #[test]
    fn sanitizes_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\temp\\evil.exe"), "evil.exe");
        assert_eq!(sanitize_filename(""), "download");
        assert_eq!(sanitize_filename(".."), "download");
    }
}
