use std::time::Duration;

use log::debug;
use reqwest::{blocking::Client, redirect::Policy};

use crate::error::{PipelineError, PipelineResult};

/// Blocking one-shot GET of `url`. No retry: any failure is a download error.
pub fn download_bytes(what: &'static str, url: &str) -> PipelineResult<Vec<u8>> {
    let client = Client::builder()
        .user_agent(concat!("frgeostat/", env!("CARGO_PKG_VERSION")))
        .redirect(Policy::limited(10))
        .timeout(Duration::from_secs(300))
        .build()
        .map_err(|e| PipelineError::download(what, url, e))?;

    debug!("[download] GET {url}");
    let resp = client.get(url).send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| PipelineError::download(what, url, e))?;

    let bytes = resp.bytes().map_err(|e| PipelineError::download(what, url, e))?;
    debug!("[download] {url} -> {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
