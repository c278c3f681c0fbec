//! Blocking fetch client: connection, bounded manual redirects, decoding.
//!
//! # Design
//! `FetchClient` holds only a `TrustPolicy` and carries no mutable state
//! between calls. Every public operation opens its own connections, so
//! concurrent callers never interfere. Redirects are followed here rather
//! than by the transport so that the hop bound and the policy for failed
//! hops stay under our control.
//!
//! `fetch` and `fetch_object` return tagged results. `fetch_text` keeps the
//! crawler's single text channel, rendering errors with a reserved prefix
//! (see [`crate::error::is_error_text`]). `download_file` is the only
//! operation that hands I/O failures back to the caller unconverted.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::{RedirectErrorPolicy, RequestConfig, TrustPolicy};
use crate::connection::{charset_of, Connection};
use crate::decode::decode;
use crate::error::FetchError;
use crate::types::{Harvest, Page};

/// Maximum redirect hops followed before the last response is read as-is.
pub const MAX_REDIRECTS: usize = 3;

/// Chunk size used when streaming downloads to disk.
const DOWNLOAD_CHUNK: usize = 1024;

/// Synchronous, stateless HTTP fetcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchClient {
    trust: TrustPolicy,
}

impl FetchClient {
    /// Client with the default trust policy (certificates not verified).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trust(trust: TrustPolicy) -> Self {
        Self { trust }
    }

    pub fn trust(&self) -> TrustPolicy {
        self.trust
    }

    /// Open a single connection without following redirects.
    pub fn open(&self, url: &str, config: Option<&RequestConfig>) -> Result<Connection, FetchError> {
        Connection::open(url, config, self.trust)
    }

    /// Fetch `url` and decode the final response.
    pub fn fetch(&self, url: &str, config: Option<&RequestConfig>) -> Result<Page, FetchError> {
        let (connection, redirects) = self.open_following(url, config)?;
        read_page(connection, redirects, config)
    }

    /// Fetch `url` as text. Failures come back as tagged error text.
    pub fn fetch_text(&self, url: &str, config: Option<&RequestConfig>) -> String {
        match self.fetch(url, config) {
            Ok(page) => page.body,
            Err(err) => {
                tracing::debug!(url, error = %err, "fetch failed");
                err.to_text()
            }
        }
    }

    /// Fetch `url` and collect the `Set-Cookie` values of the final response.
    pub fn fetch_object(
        &self,
        url: &str,
        config: Option<&RequestConfig>,
    ) -> Result<Harvest, FetchError> {
        let (connection, redirects) = self.open_following(url, config)?;
        let cookies = connection.set_cookies();
        let page = read_page(connection, redirects, config)?;
        Ok(Harvest { page, cookies })
    }

    /// GET `url` with the Chrome preset in UTF-8.
    pub fn get(&self, url: &str) -> String {
        self.get_with_charset(url, "UTF-8")
    }

    /// GET `url` with the Chrome preset in `charset`.
    pub fn get_with_charset(&self, url: &str, charset: &str) -> String {
        self.fetch_text(url, Some(&RequestConfig::chrome(charset)))
    }

    /// Download `url` to `destination` if the server answers 200.
    ///
    /// Parent directories are created and an existing file is replaced.
    /// Redirects are not followed. Returns `Ok(None)` for any other status
    /// without touching the filesystem.
    pub fn download_file(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<Option<PathBuf>, FetchError> {
        let connection = self.open(url, None)?;
        if connection.status() != 200 {
            tracing::debug!(url, status = connection.status(), "download skipped");
            return Ok(None);
        }

        let destination = destination.as_ref();
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        if destination.exists() {
            fs::remove_file(destination)?;
        }

        let mut file = File::create(destination)?;
        let mut body = connection.into_reader();
        let mut buf = [0u8; DOWNLOAD_CHUNK];
        loop {
            let n = body.read(&mut buf)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
        }
        file.flush()?;

        Ok(Some(destination.to_path_buf()))
    }

    /// Open `url` and follow up to `MAX_REDIRECTS` 301/302 hops.
    fn open_following(
        &self,
        url: &str,
        config: Option<&RequestConfig>,
    ) -> Result<(Connection, usize), FetchError> {
        let mut connection = self.open(url, config)?;
        let mut hops = 0;

        while hops < MAX_REDIRECTS && connection.is_redirect() {
            let next = connection
                .location()
                .and_then(|target| Connection::open_url(target, config, self.trust));
            match next {
                Ok(next) => {
                    tracing::debug!(from = %connection.url(), to = %next.url(), "followed redirect");
                    connection = next;
                    hops += 1;
                }
                Err(err) => {
                    let policy = config.map_or(
                        RedirectErrorPolicy::default(),
                        RequestConfig::redirect_error_policy,
                    );
                    if policy == RedirectErrorPolicy::Abort {
                        return Err(err);
                    }
                    if config.is_none_or(RequestConfig::logs_errors) {
                        tracing::warn!(
                            url = %connection.url(),
                            error = %err.report(),
                            "redirect failed, reading last response"
                        );
                    }
                    break;
                }
            }
        }

        Ok((connection, hops))
    }
}

fn read_page(
    connection: Connection,
    redirects: usize,
    config: Option<&RequestConfig>,
) -> Result<Page, FetchError> {
    let url = connection.url().to_string();
    let status = connection.status();
    let (source, body) = decode(connection, charset_of(config))?;
    Ok(Page {
        url,
        status,
        source,
        redirects,
        body,
    })
}
