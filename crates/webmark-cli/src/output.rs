//! Output writer — deterministic filenames and atomic Markdown persistence.

use std::path::{Path, PathBuf};

use tracing::info;
use url::Url;

use webmark_core::{Result, WebmarkError};

/// Placeholder path segment for URLs without a path component.
const INDEX_SEGMENT: &str = "index";

/// Derive the output filename for a URL: `output_<domain>_<path>.md`.
///
/// Pure function of the URL; the same URL always maps to the same name.
/// Query and fragment are ignored.
pub fn output_filename(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| WebmarkError::Usage(format!("invalid URL {url}: {e}")))?;
    let domain = parsed
        .host_str()
        .ok_or_else(|| WebmarkError::Usage(format!("URL has no host: {url}")))?;

    let path = parsed.path().trim_matches('/');
    let segment = if path.is_empty() {
        INDEX_SEGMENT.to_string()
    } else {
        sanitize(path)
    };

    Ok(format!("output_{}_{}.md", sanitize(domain), segment))
}

/// Replace everything outside `[A-Za-z0-9._-]` with an underscore, so the
/// result can never contain a path separator or escape the output directory.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Echo the Markdown to stdout, then write it into `dir`.
///
/// The echo happens first so a failed write never loses the generated
/// content. The write is atomic (temp file + rename) and silently
/// overwrites an existing file of the same name.
pub async fn write_markdown(dir: &Path, url: &str, markdown: &str) -> Result<PathBuf> {
    println!("{markdown}");

    let path = dir.join(output_filename(url)?);
    let tmp_path = path.with_extension("md.tmp");

    if let Err(e) = tokio::fs::write(&tmp_path, markdown.as_bytes()).await {
        return Err(WebmarkError::FileWrite {
            path: path.clone(),
            source: e,
        });
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(WebmarkError::FileWrite {
            path: path.clone(),
            source: e,
        });
    }

    info!(path = %path.display(), bytes = markdown.len(), "Markdown saved");
    Ok(path)
}
