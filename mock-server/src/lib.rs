use std::{collections::HashMap, io::Write, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use flate2::{write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const PLAIN_TEXT: &str = "first line\nsecond line\n\nlast line\n";
pub const CLOUDFLARE_PAGE: &str = "<html>\n<title>Attention Required! | Cloudflare</title>\n</html>\n";
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

/// Request counts per path, so tests can assert a hop was never taken.
pub type Hits = Arc<RwLock<HashMap<String, u64>>>;

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/text", get(text))
        .route("/crlf", get(crlf))
        .route("/empty", get(empty))
        .route("/gzip", get(gzip))
        .route("/fake-gzip", get(fake_gzip))
        .route("/latin1", get(latin1))
        .route("/redirect/{n}", get(redirect))
        .route("/moved", get(moved))
        .route("/relative-redirect", get(relative_redirect))
        .route("/redirect-without-location", get(redirect_without_location))
        .route("/redirect-to-nowhere", get(redirect_to_nowhere))
        .route("/cloudflare", get(cloudflare))
        .route("/cloudflare-gzip", get(cloudflare_gzip))
        .route("/forbidden", get(forbidden))
        .route("/missing", get(missing))
        .route("/server-error", get(server_error))
        .route("/slow", get(slow))
        .route("/cookies", get(cookies))
        .route("/echo", any(echo))
        .route("/file", get(file))
        .route("/hits", get(list_hits))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Deterministic binary payload served by `/file`, larger than one chunk.
pub fn file_bytes() -> Vec<u8> {
    (0..5000u32).map(|i| (i * 31 % 251) as u8).collect()
}

pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory gzip")
}

async fn count(hits: &Hits, uri: &Uri) {
    *hits.write().await.entry(uri.path().to_string()).or_insert(0) += 1;
}

async fn text(State(hits): State<Hits>, uri: Uri) -> &'static str {
    count(&hits, &uri).await;
    PLAIN_TEXT
}

async fn crlf() -> &'static str {
    "alpha\r\nbeta\r\n"
}

async fn empty() -> &'static str {
    ""
}

async fn gzip() -> impl IntoResponse {
    (
        [(header::CONTENT_ENCODING, "gzip")],
        gzip_bytes(PLAIN_TEXT.as_bytes()),
    )
}

async fn fake_gzip() -> impl IntoResponse {
    ([(header::CONTENT_ENCODING, "gzip")], "not really compressed\n")
}

/// "café crème" in ISO-8859-1.
async fn latin1() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
        b"caf\xe9 cr\xe8me\n".to_vec(),
    )
}

/// `/redirect/n` answers 302 to `/redirect/{n-1}`; `/redirect/0` is the page.
async fn redirect(State(hits): State<Hits>, uri: Uri, Path(n): Path<u32>) -> Response {
    count(&hits, &uri).await;
    if n == 0 {
        return "landed after redirects\n".into_response();
    }
    (
        StatusCode::FOUND,
        [(header::LOCATION, format!("/redirect/{}", n - 1))],
    )
        .into_response()
}

async fn moved() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/text")])
}

async fn relative_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "text")])
}

async fn redirect_without_location() -> StatusCode {
    StatusCode::FOUND
}

/// Points at a port nothing listens on.
async fn redirect_to_nowhere() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "http://127.0.0.1:1/gone")])
}

async fn cloudflare() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        [(header::SERVER, "cloudflare")],
        CLOUDFLARE_PAGE,
    )
}

async fn cloudflare_gzip() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        [(header::SERVER, "cloudflare"), (header::CONTENT_ENCODING, "gzip")],
        gzip_bytes(CLOUDFLARE_PAGE.as_bytes()),
    )
}

async fn forbidden() -> impl IntoResponse {
    (StatusCode::FORBIDDEN, [(header::SERVER, "nginx")], "go away")
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "no such thing")
}

async fn server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_DELAY).await;
    "finally"
}

async fn cookies() -> impl IntoResponse {
    (
        AppendHeaders([
            (header::SET_COOKIE, "session=abc123; Path=/; HttpOnly"),
            (header::SET_COOKIE, "theme=dark"),
        ]),
        "cookies set",
    )
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn file() -> Vec<u8> {
    file_bytes()
}

async fn list_hits(State(hits): State<Hits>) -> Json<HashMap<String, u64>> {
    Json(hits.read().await.clone())
}
