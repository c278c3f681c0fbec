//! Fetch results.
//!
//! # Design
//! A `Page` always says where its body came from. An empty body with
//! `BodySource::Unread` means the status was not one the client reads
//! (anything but 200 and a cloudflare 403); an empty body with
//! `BodySource::Response` means the resource itself was empty.

use serde::Serialize;

/// Which branch of response decoding produced a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySource {
    /// Status 200; the response body was read.
    Response,
    /// Status 403 from a cloudflare edge; the block page was read.
    BlockedPage,
    /// Any other status; the body was left unread and is empty.
    Unread,
}

/// A decoded response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// URL of the connection the body was read from.
    pub url: String,
    pub status: u16,
    pub source: BodySource,
    /// Redirect hops followed before reading.
    pub redirects: usize,
    pub body: String,
}

/// A decoded response plus the cookies its final connection set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Harvest {
    #[serde(flatten)]
    pub page: Page,
    /// Raw `Set-Cookie` values, in the order received.
    pub cookies: Vec<String>,
}
