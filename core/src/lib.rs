//! Single-shot blocking HTTP fetch primitive for crawlers.
//!
//! # Overview
//! Given a URL and a `RequestConfig`, `FetchClient` sends one request,
//! follows at most three 301/302 hops by hand, and decodes the final body
//! (gzip or plain, any charset `encoding_rs` knows) into newline-joined text.
//! A cookie-harvesting variant and a file download share the same
//! connection builder.
//!
//! # Design
//! - `FetchClient` is stateless; it holds only its `TrustPolicy`.
//! - Every connection gets its own transport agent: no pool, no global TLS
//!   state, no cross-call cache.
//! - Only status 200 and a cloudflare 403 are read. Every other status
//!   yields an empty body tagged `BodySource::Unread`, not an error.
//! - Transport failures are classified into four `ErrorKind`s. `fetch` and
//!   `fetch_object` return them as values and `fetch_text` renders them as
//!   prefixed text. `download_file` propagates them.

pub mod client;
pub mod config;
pub mod connection;
pub mod decode;
pub mod error;
pub mod http;
pub mod types;

pub use client::{FetchClient, MAX_REDIRECTS};
pub use config::{RedirectErrorPolicy, RequestConfig, TrustPolicy};
pub use connection::Connection;
pub use error::{is_error_text, ErrorKind, FetchError, ERROR_TEXT_PREFIX};
pub use http::{Headers, HttpMethod};
pub use types::{BodySource, Harvest, Page};
