//! libcurl-backed `Fetcher`.

use anyhow::{Context, Result};
use curl::easy::Easy;
use std::time::Duration;
use url::Url;

use super::decode::Utf8Accumulator;
use super::parse::{header_line, parse_location};
use super::{FetchedPage, Fetcher, RedirectProbe};
use crate::config::LinkCleanConfig;

/// Per-request settings shared by every fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub head_timeout: Duration,
    pub fetch_timeout: Duration,
    pub page_read_limit: usize,
}

impl FetchOptions {
    pub fn from_config(cfg: &LinkCleanConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            // libcurl reads a zero timeout as "never time out".
            head_timeout: Duration::from_secs(cfg.head_timeout_secs.max(1)),
            fetch_timeout: Duration::from_secs(cfg.fetch_timeout_secs.max(1)),
            page_read_limit: cfg.page_read_limit_bytes,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_config(&LinkCleanConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    options: FetchOptions,
}

impl CurlFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    pub fn from_config(cfg: &LinkCleanConfig) -> Self {
        Self::new(FetchOptions::from_config(cfg))
    }

    fn easy(&self, url: &str, timeout: Duration) -> Result<Easy> {
        ensure_http(url)?;
        let mut easy = Easy::new();
        easy.url(url).context("invalid URL")?;
        easy.useragent(&self.options.user_agent)?;
        easy.timeout(timeout)?;
        Ok(easy)
    }

    /// Request without following redirects and without reading the body.
    fn probe(&self, url: &str, head: bool) -> Result<RedirectProbe> {
        let method = if head { "HEAD" } else { "GET" };
        let timeout = if head {
            self.options.head_timeout
        } else {
            self.options.fetch_timeout
        };
        let mut headers: Vec<String> = Vec::new();

        let mut easy = self.easy(url, timeout)?;
        easy.follow_location(false)?;
        if head {
            easy.nobody(true)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                headers.push(header_line(data));
                true
            })?;
            // Headers are all we need; refusing the first body chunk ends the transfer.
            transfer.write_function(|_| Ok(0))?;
            if let Err(e) = transfer.perform() {
                if !e.is_write_error() {
                    return Err(e).with_context(|| format!("{} {} failed", method, url));
                }
            }
        }

        let status = easy.response_code().context("no response code")?;
        Ok(RedirectProbe {
            status,
            location: parse_location(&headers),
        })
    }
}

impl Fetcher for CurlFetcher {
    fn head(&self, url: &str) -> Result<RedirectProbe> {
        self.probe(url, true)
    }

    fn get_manual(&self, url: &str) -> Result<RedirectProbe> {
        self.probe(url, false)
    }

    fn get_page(&self, url: &str) -> Result<FetchedPage> {
        let limit = self.options.page_read_limit;
        let mut body = Utf8Accumulator::new();
        let mut received = 0usize;
        let mut truncated = false;

        let mut easy = self.easy(url, self.options.fetch_timeout)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;

        let outcome = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                let take = data.len().min(limit.saturating_sub(received));
                body.push(&data[..take]);
                received += take;
                if received >= limit {
                    truncated = true;
                    Ok(0) // stop reading
                } else {
                    Ok(data.len())
                }
            })?;
            transfer.perform()
        };
        match outcome {
            Ok(()) => {}
            Err(e) if e.is_write_error() && truncated => {}
            Err(e) if e.is_operation_timedout() && received > 0 => {
                tracing::debug!("page read timed out after {} bytes: {}", received, url);
                truncated = true;
            }
            Err(e) => return Err(e).with_context(|| format!("GET {} failed", url)),
        }

        let final_url = easy
            .effective_url()
            .ok()
            .flatten()
            .unwrap_or(url)
            .to_string();
        Ok(FetchedPage {
            final_url,
            body: body.finish(),
            truncated,
        })
    }
}

/// Only `http` and `https` URLs are handed to libcurl.
fn ensure_http(url: &str) -> Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("invalid URL {}", url))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("unsupported scheme {:?} in {}", other, url),
    }
}

/// Download a whole text document (follows redirects, requires HTTP 2xx).
pub fn download_text(url: &str, user_agent: &str, timeout: Duration) -> Result<String> {
    ensure_http(url)?;
    let mut data: Vec<u8> = Vec::new();

    let mut easy = Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.useragent(user_agent)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(timeout)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|chunk| {
            data.extend_from_slice(chunk);
            Ok(chunk.len())
        })?;
        transfer
            .perform()
            .with_context(|| format!("GET {} failed", url))?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    Ok(String::from_utf8_lossy(&data).into_owned())
}
