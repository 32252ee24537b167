use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::orchestrator::DocumentFetcher;
use crate::records::SourceConfig;

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Bodies at or below this size are error stubs, not pages.
const MIN_BODY_LEN: usize = 500;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client. The timeout of the first call sticks.
pub fn http_client(timeout: Duration) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")
    })
}

/// Static print renderings first, then the page itself.
pub fn candidate_urls(url: &str, print_variants: bool) -> Vec<String> {
    let base = url.trim().trim_end_matches('/');
    let mut out = Vec::new();
    if print_variants {
        out.push(format!("{base}?print=true"));
        out.push(format!("{base}/print"));
    }
    out.push(url.trim().to_string());
    out
}

pub struct HttpFetcher {
    client: &'static Client,
    request_delay: Duration,
    print_variants: bool,
    debug_dir: Option<PathBuf>,
    last_request: Option<Instant>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, request_delay: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            request_delay,
            print_variants: true,
            debug_dir: None,
            last_request: None,
        })
    }

    /// Stats pages are fetched as-is.
    pub fn without_print_variants(mut self) -> Self {
        self.print_variants = false;
        self
    }

    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.request_delay {
                thread::sleep(self.request_delay - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn get(&mut self, url: &str) -> Result<String> {
        self.pace();
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_AGENT)
            .send()
            .context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {status}"));
        }
        if body.len() <= MIN_BODY_LEN {
            return Err(anyhow!("body too short ({} bytes)", body.len()));
        }
        Ok(body)
    }

    fn save_debug_copy(&self, source_id: &str, body: &str) {
        let Some(dir) = self.debug_dir.as_ref() else {
            return;
        };
        let name: String = source_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let path = dir.join(format!("debug_{name}.html"));
        fs::create_dir_all(dir).ok();
        match fs::write(&path, body) {
            Ok(()) => info!(path = %path.display(), bytes = body.len(), "saved page"),
            Err(err) => warn!(path = %path.display(), error = %err, "could not save page"),
        }
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch(&mut self, source: &SourceConfig) -> Result<String, SourceError> {
        let url = source
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SourceError::MissingUrl(source.id.clone()))?;

        let mut last_error = String::from("no candidate url");
        for candidate in candidate_urls(url, self.print_variants) {
            match self.get(&candidate) {
                Ok(body) => {
                    debug!(source = %source.id, url = %candidate, bytes = body.len(), "fetched page");
                    self.save_debug_copy(&source.id, &body);
                    return Ok(body);
                }
                Err(err) => {
                    debug!(source = %source.id, url = %candidate, error = %err, "fetch attempt failed");
                    last_error = format!("{err:#}");
                }
            }
        }
        Err(SourceError::Fetch {
            url: url.to_string(),
            reason: last_error,
        })
    }
}
