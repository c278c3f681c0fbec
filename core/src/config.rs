//! Per-request options and per-client TLS trust.
//!
//! # Design
//! `RequestConfig` is immutable once built: builder methods consume `self`,
//! and the fetch routines only ever borrow it. The same config is reused for
//! every redirect hop of one fetch.
//!
//! `from_json` accepts the crawler's option-map format. It never fails: a
//! malformed value is logged and replaced by its default, so one bad option
//! cannot abort a crawl.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use serde_json::{Map, Value};

use crate::http::{Headers, HttpMethod};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Desktop Chrome user agent used by [`RequestConfig::chrome`].
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.93 Safari/537.36";

/// What to do when following a redirect hop fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectErrorPolicy {
    /// Log the failure and read whatever connection is already held.
    #[default]
    UseLastConnection,
    /// Fail the whole fetch with the hop's error.
    Abort,
}

/// Certificate handling for https targets, scoped to one `FetchClient`.
///
/// **Security note:** the default, `AcceptInvalidCerts`, skips certificate
/// chain and hostname verification entirely. It matches what crawlers of
/// misconfigured sites need but offers no protection against interception.
/// Use `Verify` for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    #[default]
    AcceptInvalidCerts,
    Verify,
}

/// Options for a single fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    method: HttpMethod,
    charset: &'static Encoding,
    headers: Headers,
    body: Option<String>,
    read_timeout: Duration,
    connect_timeout: Duration,
    on_redirect_error: RedirectErrorPolicy,
    log_errors: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            charset: UTF_8,
            headers: Headers::new(),
            body: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            on_redirect_error: RedirectErrorPolicy::default(),
            log_errors: true,
        }
    }
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain GET with a desktop Chrome `User-Agent`.
    pub fn chrome(charset: &str) -> Self {
        Self::new()
            .charset(charset)
            .header("User-Agent", CHROME_USER_AGENT)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the charset by WHATWG label; unknown labels fall back to UTF-8.
    pub fn charset(mut self, label: &str) -> Self {
        self.charset = match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => encoding,
            None => {
                tracing::warn!(charset = label, "unknown charset, using UTF-8");
                UTF_8
            }
        };
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Limit on waiting for the response head, and separately on reading
    /// the whole body. The body limit is a total deadline, not a per-read
    /// inactivity timer: a body that trickles in steadily still fails once
    /// the deadline passes. Zero disables both limits.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Zero waits forever.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn on_redirect_error(mut self, policy: RedirectErrorPolicy) -> Self {
        self.on_redirect_error = policy;
        self
    }

    pub fn log_errors(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    pub fn get_method(&self) -> HttpMethod {
        self.method
    }

    pub fn get_charset(&self) -> &'static Encoding {
        self.charset
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn get_body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn get_read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn get_connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn redirect_error_policy(&self) -> RedirectErrorPolicy {
        self.on_redirect_error
    }

    pub fn logs_errors(&self) -> bool {
        self.log_errors
    }

    /// The request body encoded with the configured charset.
    pub fn encoded_body(&self) -> Option<Vec<u8>> {
        self.body
            .as_deref()
            .map(|body| self.charset.encode(body).0.into_owned())
    }

    /// Build a config from a JSON option map, substituting defaults for any
    /// malformed value.
    pub fn from_json(options: &Value) -> Self {
        let mut config = Self::new();
        let Some(map) = options.as_object() else {
            if !options.is_null() {
                tracing::warn!("request options are not an object, using defaults");
            }
            return config;
        };

        if let Some(value) = lookup(map, &["headers", "requestProperty"]) {
            match value.as_object() {
                Some(headers) => {
                    for (name, value) in headers {
                        match value.as_str() {
                            Some(text) => config.headers.insert(name.as_str(), text),
                            None => tracing::warn!(header = %name, "header value is not a string, skipped"),
                        }
                    }
                }
                None => tracing::warn!("headers option is not an object, ignored"),
            }
        }

        if let Some(value) = lookup(map, &["method", "requestMethod"]) {
            match value.as_str().map(str::parse::<HttpMethod>) {
                Some(Ok(method)) => config.method = method,
                _ => tracing::warn!(%value, "invalid request method, using GET"),
            }
        }

        if let Some(value) = lookup(map, &["readTimeoutMs", "readTimeout"]) {
            config.read_timeout = timeout_or_default(value, "readTimeout", DEFAULT_READ_TIMEOUT);
        }

        if let Some(value) = lookup(map, &["connectTimeoutMs", "connectTimeout"]) {
            config.connect_timeout =
                timeout_or_default(value, "connectTimeout", DEFAULT_CONNECT_TIMEOUT);
        }

        if let Some(value) = lookup(map, &["charset", "charSet"]) {
            match value.as_str() {
                Some(label) => config = config.charset(label),
                None => tracing::warn!(%value, "charset is not a string, using UTF-8"),
            }
        }

        if let Some(value) = lookup(map, &["body", "outputStreamValue"]) {
            match value {
                Value::String(text) => config.body = Some(text.clone()),
                other => config.body = Some(other.to_string()),
            }
        }

        if let Some(value) = lookup(map, &["onRedirectError"]) {
            match value.as_str() {
                Some("useLastConnection") => {
                    config.on_redirect_error = RedirectErrorPolicy::UseLastConnection
                }
                Some("abort") => config.on_redirect_error = RedirectErrorPolicy::Abort,
                _ => tracing::warn!(%value, "unknown redirect error policy, using useLastConnection"),
            }
        }

        if let Some(value) = lookup(map, &["logErrors"]) {
            match value.as_bool() {
                Some(enabled) => config.log_errors = enabled,
                None => tracing::warn!(%value, "logErrors is not a boolean, ignored"),
            }
        }

        config
    }
}

/// First non-null value among the accepted spellings of one option.
fn lookup<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| map.get(*name).filter(|value| !value.is_null()))
}

/// Millisecond timeout from a JSON number or numeric string. Zero is kept
/// and means no limit.
fn timeout_or_default(value: &Value, name: &str, default: Duration) -> Duration {
    let millis = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    match millis {
        Some(millis) => Duration::from_millis(millis),
        None => {
            tracing::warn!(option = name, %value, "invalid timeout, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_crawler_conventions() {
        let config = RequestConfig::default();
        assert_eq!(config.get_method(), HttpMethod::Get);
        assert_eq!(config.get_charset(), UTF_8);
        assert_eq!(config.get_read_timeout(), Duration::from_millis(30_000));
        assert_eq!(config.get_connect_timeout(), Duration::from_millis(30_000));
        assert_eq!(config.redirect_error_policy(), RedirectErrorPolicy::UseLastConnection);
        assert!(config.headers().is_empty());
        assert!(config.get_body().is_none());
        assert!(config.logs_errors());
    }

    #[test]
    fn chrome_preset_sets_user_agent() {
        let config = RequestConfig::chrome("euc-kr");
        assert_eq!(config.headers().get("user-agent"), Some(CHROME_USER_AGENT));
        assert_eq!(config.get_charset().name(), "EUC-KR");
        assert_eq!(config.get_method(), HttpMethod::Get);
    }

    #[test]
    fn unknown_charset_falls_back_to_utf8() {
        let config = RequestConfig::new().charset("klingon-8");
        assert_eq!(config.get_charset(), UTF_8);
    }

    #[test]
    fn body_is_encoded_with_charset() {
        let config = RequestConfig::new().charset("iso-8859-1").body("café");
        // windows-1252 is the WHATWG decoder for the latin-1 label
        assert_eq!(config.encoded_body().unwrap(), vec![b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn json_recognizes_current_and_legacy_keys() {
        let config = RequestConfig::from_json(&json!({
            "requestMethod": "post",
            "requestProperty": {"Cookie": "a=1"},
            "charSet": "utf-8",
            "outputStreamValue": "q=rust",
            "readTimeout": 1500,
            "connectTimeoutMs": "2500"
        }));
        assert_eq!(config.get_method(), HttpMethod::Post);
        assert_eq!(config.headers().get("cookie"), Some("a=1"));
        assert_eq!(config.get_body(), Some("q=rust"));
        assert_eq!(config.get_read_timeout(), Duration::from_millis(1500));
        assert_eq!(config.get_connect_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn json_bad_values_fall_back_to_defaults() {
        let config = RequestConfig::from_json(&json!({
            "method": "FETCH",
            "readTimeoutMs": "soon",
            "connectTimeoutMs": -5,
            "charset": 42,
            "onRedirectError": "panic"
        }));
        assert_eq!(config, RequestConfig::default());
    }

    #[test]
    fn json_zero_timeouts_are_kept() {
        let config = RequestConfig::from_json(&json!({"readTimeout": 0, "connectTimeout": "0"}));
        assert_eq!(config.get_read_timeout(), Duration::ZERO);
        assert_eq!(config.get_connect_timeout(), Duration::ZERO);
    }

    #[test]
    fn json_policy_and_logging_flags() {
        let config = RequestConfig::from_json(&json!({
            "onRedirectError": "abort",
            "logErrors": false
        }));
        assert_eq!(config.redirect_error_policy(), RedirectErrorPolicy::Abort);
        assert!(!config.logs_errors());
    }

    #[test]
    fn json_non_object_yields_defaults() {
        assert_eq!(RequestConfig::from_json(&json!(null)), RequestConfig::default());
        assert_eq!(RequestConfig::from_json(&json!([1, 2])), RequestConfig::default());
    }

    #[test]
    fn trust_policy_defaults_to_accepting_invalid_certs() {
        assert_eq!(TrustPolicy::default(), TrustPolicy::AcceptInvalidCerts);
    }
}
