//! Bring source PDFs into a workspace's `input/` directory.
//!
//! Local files are copied; `http(s)://` sources are downloaded. Either way
//! the first four bytes must be `%PDF` so a mislabelled HTML error page
//! fails here with a clear message instead of deep inside a PDF parser.

use crate::error::{Result, WorkbenchError};
use crate::workspace::naming::sanitize_file_name;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Fail with `NotAPdf` unless `path` starts with the PDF magic bytes.
pub fn check_pdf_magic(path: &Path) -> Result<()> {
    let mut file = std::fs::File::open(path).map_err(|e| WorkbenchError::io(path, e))?;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != PDF_MAGIC {
        return Err(WorkbenchError::NotAPdf {
            name: path.display().to_string(),
        });
    }
    Ok(())
}

/// Copy a local PDF into `dir`, keeping its file name.
pub async fn copy_into(src: &Path, dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| WorkbenchError::InvalidName {
            name: src.display().to_string(),
            reason: "source has no file name",
        })?;
    let dest = dir.join(name);
    tokio::fs::copy(src, &dest)
        .await
        .map_err(|e| WorkbenchError::io(src, e))?;
    debug!(src = %src.display(), dest = %dest.display(), "Copied input");
    Ok(dest)
}

/// Download `url` into `dir`. The file is named after the last URL path
/// segment, with `.pdf` appended when missing.
pub async fn download_into(url: &str, dir: &Path, timeout_secs: u64) -> Result<PathBuf> {
    info!(url, "Downloading PDF");
    let fail = |reason: String| WorkbenchError::upstream("download", format!("{url}: {reason}"));

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            fail(format!("timed out after {timeout_secs}s"))
        } else {
            fail(e.to_string())
        }
    })?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;
    if bytes.len() < 4 || &bytes[..4] != PDF_MAGIC {
        return Err(WorkbenchError::NotAPdf {
            name: url.to_string(),
        });
    }

    let dest = dir.join(file_name_for(url));
    tokio::fs::write(&dest, &bytes)
        .await
        .map_err(|e| WorkbenchError::io(&dest, e))?;

    info!(dest = %dest.display(), bytes = bytes.len(), "Downloaded PDF");
    Ok(dest)
}

fn file_name_for(url: &str) -> String {
    let last = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .and_then(|s| sanitize_file_name(&s).ok())
        .unwrap_or_else(|| "downloaded.pdf".to_string());

    if last.to_ascii_lowercase().ends_with(".pdf") {
        last
    } else {
        format!("{last}.pdf")
    }
}
