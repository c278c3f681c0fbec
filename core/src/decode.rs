//! Response decoding: status triage, gzip-or-plain body, line normalization.

use std::io::Read;

use encoding_rs::Encoding;
use flate2::read::GzDecoder;

use crate::connection::Connection;
use crate::error::FetchError;
use crate::types::BodySource;

/// Decide whether a response body is worth reading.
pub fn body_source(status: u16, server: Option<&str>) -> BodySource {
    match status {
        200 => BodySource::Response,
        403 if server.is_some_and(|server| server.starts_with("cloudflare")) => {
            BodySource::BlockedPage
        }
        _ => BodySource::Unread,
    }
}

/// Read the body of `connection` as text in `charset`.
///
/// Unread statuses yield an empty string without touching the stream.
pub fn decode(
    connection: Connection,
    charset: &'static Encoding,
) -> Result<(BodySource, String), FetchError> {
    let source = body_source(connection.status(), connection.header("server"));
    if source == BodySource::Unread {
        return Ok((source, String::new()));
    }

    let gzip = connection.is_gzip();
    let mut raw = Vec::new();
    connection.into_reader().read_to_end(&mut raw)?;

    let bytes = if gzip { gunzip_or_raw(raw) } else { raw };
    let (text, _) = charset.decode_without_bom_handling(&bytes);
    Ok((source, join_lines(&text)))
}

/// Decompress a gzip body, keeping the raw bytes if they do not decode.
pub fn gunzip_or_raw(raw: Vec<u8>) -> Vec<u8> {
    let mut inflated = Vec::new();
    match GzDecoder::new(raw.as_slice()).read_to_end(&mut inflated) {
        Ok(_) => inflated,
        Err(err) => {
            tracing::debug!(error = %err, "body declared gzip but did not decode, reading raw");
            raw
        }
    }
}

/// Split on `\n`, `\r\n` or `\r` and re-join with `\n`, dropping the final
/// line terminator.
pub fn join_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            c => out.push(c),
        }
    }
    if out.ends_with('\n') {
        out.pop();
    }
    out
}
