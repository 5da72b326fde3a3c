//! `bookdl add <url>` – queue a new download.

use anyhow::Result;
use bookdl_core::record::DownloadRequest;
use bookdl_core::resume_db::ResumeDb;

pub async fn run_add(db: &ResumeDb, url: &str, headers: Vec<(String, String)>) -> Result<()> {
    let request = DownloadRequest {
        headers,
        ..DownloadRequest::get(url)
    };
    let id = db.add_download(&request).await?;
    println!("Added download {id} for URL: {url}");
    Ok(())
}

/// clap value parser for `--header "Name: value"`.
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(format!("invalid header name in {s:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
