//! Connection construction: one blocking request, response head received,
//! body not yet read.
//!
//! # Design
//! A fresh `ureq::Agent` is built for every connection so timeouts and TLS
//! trust come only from the arguments of this call. Nothing is pooled and
//! nothing global is touched. Automatic redirect following is off and HTTP
//! error statuses come back as data; redirect handling and status
//! interpretation belong to the caller.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use ureq::http::{header, Response};
use ureq::tls::TlsConfig;
use ureq::{Agent, Body};
use url::Url;

use crate::config::{RequestConfig, TrustPolicy, DEFAULT_CONNECT_TIMEOUT};
use crate::error::{ErrorKind, FetchError};
use crate::http::HttpMethod;

/// An opened request whose response body is still unread.
///
/// Dropping it closes the underlying socket.
pub struct Connection {
    url: Url,
    response: Response<Body>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url.as_str())
            .field("status", &self.status())
            .finish()
    }
}

impl Connection {
    /// Send a request to `url` and wait for the response head.
    ///
    /// Without a config this is a plain GET with the default connect timeout
    /// and no read timeout.
    pub fn open(
        url: &str,
        config: Option<&RequestConfig>,
        trust: TrustPolicy,
    ) -> Result<Self, FetchError> {
        let url = Url::parse(url)?;
        Self::open_url(url, config, trust)
    }

    pub(crate) fn open_url(
        url: Url,
        config: Option<&RequestConfig>,
        trust: TrustPolicy,
    ) -> Result<Self, FetchError> {
        let secure = match url.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(FetchError::new(
                    ErrorKind::Generic,
                    format!("unsupported scheme: {other}"),
                ))
            }
        };

        let agent = build_agent(config, if secure { Some(trust) } else { None });
        let method = config.map_or(HttpMethod::Get, RequestConfig::get_method);

        let mut builder = ureq::http::Request::builder()
            .method(method.as_str())
            .uri(url.as_str());
        if let Some(config) = config {
            for (name, value) in config.headers().iter() {
                builder = builder.header(name, value);
            }
        }

        tracing::debug!(%url, %method, "opening connection");
        let response = match config.and_then(RequestConfig::encoded_body) {
            Some(payload) => agent.run(builder.body(payload)?)?,
            None => agent.run(builder.body(())?)?,
        };

        Ok(Self { url, response })
    }

    /// The URL this connection was opened for.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.response.status().as_u16()
    }

    /// First value of a response header, if present and valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// 301 or 302.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status(), 301 | 302)
    }

    /// The `Location` target resolved against this connection's URL.
    pub fn location(&self) -> Result<Url, FetchError> {
        let location = self.header(header::LOCATION.as_str()).ok_or_else(|| {
            FetchError::new(ErrorKind::Io, format!("redirect from {} has no location", self.url))
        })?;
        Ok(self.url.join(location)?)
    }

    /// Whether the body is declared as gzip.
    pub fn is_gzip(&self) -> bool {
        self.header(header::CONTENT_ENCODING.as_str())
            .is_some_and(|encoding| encoding.trim().eq_ignore_ascii_case("gzip"))
    }

    /// Every `Set-Cookie` value in the order received.
    pub fn set_cookies(&self) -> Vec<String> {
        self.response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Consume the connection, yielding its body stream.
    pub fn into_reader(self) -> impl Read {
        self.response.into_body().into_reader()
    }
}

/// Agent for exactly one connection. `trust` is `Some` only for https.
fn build_agent(config: Option<&RequestConfig>, trust: Option<TrustPolicy>) -> Agent {
    let connect_timeout = config.map_or(Some(DEFAULT_CONNECT_TIMEOUT), |config| {
        limit(config.get_connect_timeout())
    });
    let read_timeout = config.and_then(|config| limit(config.get_read_timeout()));

    // the body limit is a deadline for the whole body, not per read
    let mut builder = Agent::config_builder()
        .http_status_as_error(false)
        .max_redirects(0)
        .max_redirects_will_error(false)
        .timeout_connect(connect_timeout)
        .timeout_recv_response(read_timeout)
        .timeout_recv_body(read_timeout);

    if trust == Some(TrustPolicy::AcceptInvalidCerts) {
        tracing::debug!("certificate verification disabled for this connection");
        builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
    }

    Agent::new_with_config(builder.build())
}

/// A zero timeout waits forever.
fn limit(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

/// Charset used to read responses when the caller gave no config.
pub(crate) fn charset_of(config: Option<&RequestConfig>) -> &'static Encoding {
    config.map_or(UTF_8, RequestConfig::get_charset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_url_is_io_error() {
        let err = Connection::open("::not a url::", None, TrustPolicy::Verify).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn non_http_scheme_is_rejected_before_connecting() {
        let err = Connection::open("ftp://example.com/file", None, TrustPolicy::Verify).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(err.message().contains("ftp"));
    }

    #[test]
    fn scheme_is_matched_case_insensitively() {
        // url normalizes the scheme; the failure must come from the closed
        // port, not from scheme validation
        let err = Connection::open("HTTP://127.0.0.1:1/", None, TrustPolicy::Verify).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::Generic);
    }

    #[test]
    fn default_charset_without_config_is_utf8() {
        assert_eq!(charset_of(None), UTF_8);
        let config = RequestConfig::new().charset("shift_jis");
        assert_eq!(charset_of(Some(&config)).name(), "Shift_JIS");
    }

    #[test]
    fn zero_timeout_means_no_limit() {
        assert_eq!(limit(Duration::ZERO), None);
        assert_eq!(limit(Duration::from_millis(1)), Some(Duration::from_millis(1)));
    }
}
