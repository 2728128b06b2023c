// src/fetch/mod.rs
//! Raw text retrieval for one named source file.
//!
//! The data base is either an `http(s)` URL or a local directory;
//! loaders do not care which. HTTP fetches retry a few times on
//! transport failures before giving up.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use url::Url;

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fetch the raw text of `name` under `base`.
pub async fn fetch_text(client: &Client, base: &str, name: &str) -> Result<String> {
    if base.starts_with("http://") || base.starts_with("https://") {
        fetch_http(client, base, name).await
    } else {
        let path = Path::new(base).join(name);
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}

async fn fetch_http(client: &Client, base: &str, name: &str) -> Result<String> {
    // Url::join drops the last path segment unless the base ends in '/'.
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let url = Url::parse(&base)?.join(name)?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let resp = client.get(url.as_str()).send().await;
        match resp {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(text) => return Ok(text),
                Err(_) if attempt < MAX_RETRIES => {
                    sleep(RETRY_DELAY).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            },
            Err(_) if attempt < MAX_RETRIES => {
                sleep(RETRY_DELAY).await;
                continue;
            }
            Ok(resp) => return Err(anyhow!("HTTP error for {}: {}", url, resp.status())),
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn fetches_from_a_local_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut f = std::fs::File::create(dir.path().join("sites.csv"))?;
        writeln!(f, "header")?;
        writeln!(f, "data")?;

        let client = Client::new();
        let text = fetch_text(&client, dir.path().to_str().unwrap(), "sites.csv").await?;
        assert_eq!(text, "header\ndata\n");
        Ok(())
    }

    #[tokio::test]
    async fn missing_local_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = Client::new();
        let err = fetch_text(&client, dir.path().to_str().unwrap(), "nope.csv")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope.csv"));
    }
}
