//! HTTP and HTTPS downloads through the reqwest blocking client.

use crate::FetchError;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::io::Write;
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;

/// Stream `url` into `sink`, following redirects. Any non-2xx final status
/// is an error.
pub fn download(
    url: &str,
    timeout: Option<Duration>,
    use_env_proxy: bool,
    sink: &mut dyn Write,
) -> Result<u64, FetchError> {
    let mut builder = Client::builder()
        .redirect(Policy::limited(MAX_REDIRECTS))
        .timeout(timeout);
    if !use_env_proxy {
        builder = builder.no_proxy();
    }
    let client = builder.build()?;

    let mut response = client.get(url).send()?.error_for_status()?;
    let written = response.copy_to(sink)?;
    sink.flush()?;
    Ok(written)
}
