//! First-load HTTP server.
//!
//! A small HTTP/1.1 server on `std::net`: one thread per
//! connection, one request per connection, `Connection: close`. At most
//! [`MAX_CONNECTIONS`] are served at once; the excess gets `503`.
//!
//! ## Routes
//!
//! | Request | Response |
//! |---------|----------|
//! | `GET /` | shell with the default article pre-rendered |
//! | `GET /<segment>/<slug>` | shell with `<slug>` pre-rendered |
//! | `GET /<anything else>` | file from `public_dir`, or 404 |
//! | other methods | 405 |
//!
//! `HEAD` is answered like `GET` without the body. Unknown articles get a
//! 404 page and failures while rendering get a 500 page; the underlying
//! error is logged, never sent to the client.
//!
//! `200` responses carry a SHA-256 `ETag`; an `If-None-Match` of `*` or
//! listing that tag (weak `W/` forms included) yields `304 Not Modified`.
//!
//! Articles and the shell are read from disk on every request, so edits and
//! new articles show up without a restart and requests share no mutable
//! state. Only the requested article has to load; a broken sibling is
//! logged and left out of the index.

use crate::articles::{self, ArticleError};
use crate::config::{ConfigError, SiteConfig};
use crate::fs::FileSystem;
use crate::render::{ArticleRenderer, RenderError};
use crate::shell::{self, ShellError};
use crate::slug::Slug;
use maud::{DOCTYPE, html};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Largest request head accepted, in bytes.
const MAX_HEAD: usize = 8 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a rejected connection may take to send its head before the 503.
const REJECT_READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Connections served at once by default; further ones get an immediate 503.
pub const MAX_CONNECTIONS: usize = 64;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot listen on {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Articles(#[from] ArticleError),
    #[error(transparent)]
    Shell(#[from] ShellError),
}

// ============================================================================
// Requests and responses
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    /// Request target as sent, including any query string.
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Parse a request head (request line plus headers, CRLF separated).
    pub fn parse(head: &str) -> Result<Self, ServerError> {
        let mut lines = head.split("\r\n");
        let request_line = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ServerError::BadRequest("empty request".into()))?;

        let mut parts = request_line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ServerError::BadRequest(format!(
                "malformed request line '{request_line}'"
            )));
        };
        if !version.starts_with("HTTP/1.") {
            return Err(ServerError::BadRequest(format!("unsupported version {version}")));
        }
        if !target.starts_with('/') {
            return Err(ServerError::BadRequest(format!("unsupported target {target}")));
        }

        let headers = lines
            .take_while(|l| !l.is_empty())
            .map(|line| {
                line.split_once(':')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                    .ok_or_else(|| ServerError::BadRequest(format!("malformed header '{line}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            headers,
        })
    }

    /// Target without the query string.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotModified,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
    ServiceUnavailable,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotModified => 304,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable => 503,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotModified => "Not Modified",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::InternalServerError => "Internal Server Error",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub etag: Option<String>,
}

impl Response {
    pub fn new(status: Status, content_type: &'static str, body: Vec<u8>) -> Self {
        let etag = (status == Status::Ok).then(|| etag_for(&body));
        Self {
            status,
            content_type,
            body,
            etag,
        }
    }

    pub fn html(status: Status, body: String) -> Self {
        Self::new(status, "text/html; charset=utf-8", body.into_bytes())
    }

    fn not_modified(etag: String) -> Self {
        Self {
            status: Status::NotModified,
            content_type: "text/plain",
            body: Vec::new(),
            etag: Some(etag),
        }
    }

    /// Serialize status line, headers and (unless `head_only`) the body.
    pub fn write_to(&self, out: &mut impl Write, head_only: bool) -> io::Result<()> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.len()
        );
        if let Some(etag) = &self.etag {
            head.push_str(&format!("ETag: {etag}\r\n"));
        }
        if self.status == Status::MethodNotAllowed {
            head.push_str("Allow: GET, HEAD\r\n");
        }
        head.push_str("Connection: close\r\n\r\n");
        out.write_all(head.as_bytes())?;
        if !head_only && self.status != Status::NotModified {
            out.write_all(&self.body)?;
        }
        out.flush()
    }
}

/// Quoted strong ETag: the first 16 hex digits of the body's SHA-256.
pub fn etag_for(body: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(body));
    format!("\"{}\"", &digest[..16])
}

/// `If-None-Match` semantics: `*`, or any listed tag equal to `etag`
/// under weak comparison (a `W/` prefix is ignored).
fn etag_matches(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|tag| {
        tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag
    })
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "json" | "webmanifest" => "application/json",
        "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Rendered shell; `None` means the default article.
    Shell(Option<Slug>),
    /// File under the public directory, as a relative path.
    Static(PathBuf),
    NotFound,
}

/// Map a request path onto a route. `segment` is the articles URL segment.
pub fn route(path: &str, segment: &str) -> Route {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Route::Shell(None);
    }

    let mut parts = trimmed.split('/');
    if parts.next() == Some(segment) {
        return match (parts.next(), parts.next()) {
            (None, _) => Route::Shell(None),
            (Some(raw), None) => match Slug::parse(raw) {
                Ok(slug) => Route::Shell(Some(slug)),
                Err(_) => Route::NotFound,
            },
            _ => Route::NotFound,
        };
    }

    let rel = PathBuf::from(trimmed);
    if rel.components().all(|c| matches!(c, Component::Normal(_))) {
        Route::Static(rel)
    } else {
        Route::NotFound
    }
}

// ============================================================================
// Application
// ============================================================================

/// Request handling over a configuration and a file system.
pub struct App {
    config: SiteConfig,
    default_slug: Slug,
    fs: Box<dyn FileSystem>,
}

impl App {
    pub fn new(config: SiteConfig, fs: Box<dyn FileSystem>) -> Result<Self, ServerError> {
        let default_slug = config.default_slug()?;
        Ok(Self {
            config,
            default_slug,
            fs,
        })
    }

    /// The complete first-load document for `requested` (or the default).
    pub fn render_document(&self, requested: Option<&Slug>) -> Result<String, ServerError> {
        let fs = self.fs.as_ref();
        let focus = requested.unwrap_or(&self.default_slug);
        let articles =
            articles::load_articles_for(fs, &self.config.layout(), &self.config.site, focus)?;
        let renderer = ArticleRenderer::new(articles, self.config.site.clone());
        let template = shell::load_template(fs, self.config.server.shell.as_deref())?;
        Ok(shell::render_shell(
            &renderer,
            &template,
            requested,
            &self.default_slug,
        )?)
    }

    pub fn handle(&self, request: &Request) -> Response {
        if request.method != "GET" && request.method != "HEAD" {
            return error_page(Status::MethodNotAllowed, "Only GET and HEAD are supported.");
        }

        let response = match route(request.path(), self.config.site.segment()) {
            Route::Shell(slug) => self.shell_response(slug.as_ref()),
            Route::Static(rel) => self.static_response(&rel),
            Route::NotFound => not_found(),
        };

        match (&response.etag, request.header("If-None-Match")) {
            (Some(etag), Some(header)) if etag_matches(header, etag) => {
                Response::not_modified(etag.clone())
            }
            _ => response,
        }
    }

    fn shell_response(&self, slug: Option<&Slug>) -> Response {
        match self.render_document(slug) {
            Ok(html) => Response::html(Status::Ok, html),
            Err(ServerError::Shell(ShellError::Render(RenderError::UnknownArticle(slug)))) => {
                log::info!("no article {slug}");
                not_found()
            }
            Err(e) => {
                log::error!("rendering {:?} failed: {e}", slug.map(Slug::as_str));
                error_page(
                    Status::InternalServerError,
                    "Something went wrong while rendering this page.",
                )
            }
        }
    }

    fn static_response(&self, rel: &Path) -> Response {
        let path = self.config.server.public_dir.join(rel);
        if !self.fs.is_file(&path) {
            return not_found();
        }
        match self.fs.read(&path) {
            Ok(body) => Response::new(Status::Ok, content_type(&path), body),
            Err(e) => {
                log::error!("reading {} failed: {e}", path.display());
                error_page(Status::InternalServerError, "Could not read the file.")
            }
        }
    }
}

fn not_found() -> Response {
    error_page(Status::NotFound, "There is no dispatch at this address.")
}

fn error_page(status: Status, message: &str) -> Response {
    let title = format!("{} {}", status.code(), status.reason());
    let page = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
            }
            body {
                main.error-page {
                    h1 { (title) }
                    p { (message) }
                    a href="/" { "Back to the latest dispatch" }
                }
            }
        }
    };
    Response::html(status, page.into_string())
}

// ============================================================================
// Listener
// ============================================================================

pub struct Server {
    listener: TcpListener,
    app: Arc<App>,
    limit: ConnectionLimit,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug, app: App) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&addr).map_err(|source| ServerError::Bind {
            addr: format!("{addr:?}"),
            source,
        })?;
        Ok(Self {
            listener,
            app: Arc::new(app),
            limit: ConnectionLimit::new(MAX_CONNECTIONS),
        })
    }

    /// Serve at most `max` connections at once (at least one).
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.limit = ConnectionLimit::new(max.max(1));
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails. Each connection gets its
    /// own thread while fewer than the limit are open; the rest are answered
    /// with 503 on the accepting thread.
    pub fn run(self) -> Result<(), ServerError> {
        log::info!("listening on http://{}", self.local_addr()?);
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("accept failed: {e}");
                    continue;
                }
            };
            match self.limit.try_acquire() {
                Some(slot) => {
                    let app = Arc::clone(&self.app);
                    thread::spawn(move || {
                        let _slot = slot;
                        handle_connection(stream, &app);
                    });
                }
                None => reject_connection(stream, self.limit.max),
            }
        }
        Ok(())
    }
}

/// Counts open connections against a fixed maximum.
struct ConnectionLimit {
    active: Arc<AtomicUsize>,
    max: usize,
}

impl ConnectionLimit {
    fn new(max: usize) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            max,
        }
    }

    fn try_acquire(&self) -> Option<ConnectionSlot> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .ok()
            .map(|_| ConnectionSlot(Arc::clone(&self.active)))
    }
}

/// One open connection; released on drop.
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn reject_connection(mut stream: TcpStream, max: usize) {
    log::warn!("{max} connections open; answering 503");
    let result = stream
        .set_read_timeout(Some(REJECT_READ_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(READ_TIMEOUT)));
    if let Err(e) = result {
        log::debug!("rejected connection: {e}");
        return;
    }
    // Drain the head so closing does not reset the connection under the reply.
    let _ = read_head(&mut stream);
    let page = error_page(
        Status::ServiceUnavailable,
        "Too many requests at once. Try again shortly.",
    );
    if let Err(e) = page.write_to(&mut stream, false) {
        log::debug!("rejected connection: {e}");
    }
}

fn handle_connection(mut stream: TcpStream, app: &App) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());
    if let Err(e) = serve_one(&mut stream, app) {
        log::debug!("connection from {peer}: {e}");
    }
}

fn serve_one(stream: &mut TcpStream, app: &App) -> Result<(), ServerError> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let head = read_head(stream)?;

    let (request, response) = match Request::parse(&head) {
        Ok(request) => {
            let response = app.handle(&request);
            (Some(request), response)
        }
        Err(e) => {
            log::debug!("{e}");
            (None, error_page(Status::BadRequest, "Malformed request."))
        }
    };

    let head_only = request.as_ref().is_some_and(|r| r.method == "HEAD");
    response.write_to(stream, head_only)?;
    if let Some(request) = request {
        log::info!(
            "{} {} -> {}",
            request.method,
            request.target,
            response.status.code()
        );
    }
    Ok(())
}

/// Read up to the blank line that ends the request head.
fn read_head(stream: &mut impl Read) -> Result<String, ServerError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_head_end(&buf) {
            buf.truncate(end);
            break;
        }
        if buf.len() > MAX_HEAD {
            return Err(ServerError::BadRequest("request head too large".into()));
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::tests::MemoryFs;

    const SHELL: &str = "<html><script>a='$articleToShow'</script><body><!--$target--></body></html>";

    fn slug(s: &str) -> Slug {
        Slug::parse(s).unwrap()
    }

    fn get(target: &str) -> Request {
        Request::parse(&format!("GET {target} HTTP/1.1\r\nHost: localhost")).unwrap()
    }

    fn add_article(fs: &MemoryFs, name: &str, body: &str) {
        let dir = Path::new("/site/content").join(name);
        fs.add_dir(&dir);
        fs.add_file(&dir.join(format!("{name}.md")), body);
        fs.add_file(
            &dir.join(format!("{name}-metadata.toml")),
            &format!("publish_date = \"2021-03-01T08:00:00Z\"\nslug = \"{name}\"\n"),
        );
    }

    fn site_fs() -> MemoryFs {
        let fs = MemoryFs::with_root(Path::new("/site/content"));
        add_article(&fs, "001-the-brief", "# The Brief\n\nWhy this site exists.");
        add_article(&fs, "004-the-basics", "# The Basics\n\nMarkup first.");
        fs.add_dir(Path::new("/site/public"));
        fs.add_dir(Path::new("/site/public/build"));
        fs.add_file(Path::new("/site/public/tmp.html"), SHELL);
        fs.add_file(Path::new("/site/public/build/bundle.css"), "body{}");
        fs
    }

    fn app_over(fs: MemoryFs) -> App {
        let mut config = SiteConfig::default();
        config.content_root = PathBuf::from("/site/content");
        config.server.public_dir = PathBuf::from("/site/public");
        config.server.shell = Some(PathBuf::from("/site/public/tmp.html"));
        App::new(config, Box::new(fs)).unwrap()
    }

    fn app() -> App {
        app_over(site_fs())
    }

    fn body(response: &Response) -> String {
        String::from_utf8_lossy(&response.body).into_owned()
    }

    #[test]
    fn parse_request_line_and_headers() {
        let req = Request::parse("GET /dispatches/x?y=1 HTTP/1.1\r\nHost: a\r\nIf-None-Match: \"abc\"")
            .unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path(), "/dispatches/x");
        assert_eq!(req.header("if-none-match"), Some("\"abc\""));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Request::parse("").is_err());
        assert!(Request::parse("GET /").is_err());
        assert!(Request::parse("GET / SPDY/3").is_err());
        assert!(Request::parse("GET http://x/ HTTP/1.1").is_err());
        assert!(Request::parse("GET / HTTP/1.1\r\nno-colon").is_err());
    }

    #[test]
    fn routes() {
        assert_eq!(route("/", "dispatches"), Route::Shell(None));
        assert_eq!(route("/dispatches", "dispatches"), Route::Shell(None));
        assert_eq!(
            route("/dispatches/004-the-basics/", "dispatches"),
            Route::Shell(Some(slug("004-the-basics")))
        );
        assert_eq!(route("/dispatches/Bad Slug", "dispatches"), Route::NotFound);
        assert_eq!(route("/dispatches/a/b", "dispatches"), Route::NotFound);
        assert_eq!(
            route("/build/bundle.js", "dispatches"),
            Route::Static(PathBuf::from("build/bundle.js"))
        );
        assert_eq!(route("/../secret", "dispatches"), Route::NotFound);
        assert_eq!(route("/build/../x", "dispatches"), Route::NotFound);
        assert_eq!(route("/./x", "dispatches"), Route::NotFound);
    }

    #[test]
    fn root_renders_default_article() {
        let response = app().handle(&get("/"));
        assert_eq!(response.status, Status::Ok);
        let html = body(&response);
        assert!(html.contains("a='001-the-brief'"));
        assert!(html.contains("Why this site exists."));
        assert!(!html.contains(shell::TARGET_MARKER));
    }

    #[test]
    fn article_path_renders_that_article() {
        let response = app().handle(&get("/dispatches/004-the-basics"));
        assert_eq!(response.status, Status::Ok);
        let html = body(&response);
        assert!(html.contains("a='004-the-basics'"));
        assert!(html.contains("Markup first."));
    }

    #[test]
    fn unknown_article_is_structured_404() {
        let response = app().handle(&get("/dispatches/999-nope"));
        assert_eq!(response.status, Status::NotFound);
        assert!(body(&response).contains("<h1>404 Not Found</h1>"));
        assert!(response.etag.is_none());
    }

    #[test]
    fn broken_sibling_does_not_break_other_pages() {
        let fs = site_fs();
        fs.add_dir(Path::new("/site/content/images"));
        fs.add_file(
            Path::new("/site/content/004-the-basics/004-the-basics-metadata.toml"),
            "not toml at all [",
        );
        let app = app_over(fs);

        let response = app.handle(&get("/dispatches/001-the-brief"));
        assert_eq!(response.status, Status::Ok);
        let html = body(&response);
        assert!(html.contains("Why this site exists."));
        assert!(!html.contains("/dispatches/004-the-basics"));
    }

    #[test]
    fn broken_requested_article_is_structured_500() {
        let app = app();
        app.fs
            .write(
                Path::new("/site/content/004-the-basics/004-the-basics-metadata.toml"),
                "not toml at all [",
            )
            .unwrap();
        let response = app.handle(&get("/dispatches/004-the-basics"));
        assert_eq!(response.status, Status::InternalServerError);
        let html = body(&response);
        assert!(html.contains("500 Internal Server Error"));
        assert!(!html.contains("TOML"));
    }

    #[test]
    fn static_files_are_served_with_content_type() {
        let response = app().handle(&get("/build/bundle.css"));
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.content_type, "text/css");
        assert_eq!(body(&response), "body{}");
        assert_eq!(app().handle(&get("/build/missing.js")).status, Status::NotFound);
    }

    #[test]
    fn other_methods_are_rejected() {
        let req = Request::parse("POST / HTTP/1.1\r\nHost: a").unwrap();
        assert_eq!(app().handle(&req).status, Status::MethodNotAllowed);
    }

    #[test]
    fn matching_etag_yields_304() {
        let app = app();
        let first = app.handle(&get("/"));
        let etag = first.etag.clone().unwrap();
        let req = Request::parse(&format!("GET / HTTP/1.1\r\nIf-None-Match: {etag}")).unwrap();
        let second = app.handle(&req);
        assert_eq!(second.status, Status::NotModified);
        assert!(second.body.is_empty());

        let stale = Request::parse("GET / HTTP/1.1\r\nIf-None-Match: \"0000\"").unwrap();
        assert_eq!(app.handle(&stale).status, Status::Ok);
    }

    #[test]
    fn if_none_match_lists_and_weak_tags() {
        let etag = "\"abc\"";
        assert!(etag_matches("\"abc\"", etag));
        assert!(etag_matches("\"xyz\", \"abc\"", etag));
        assert!(etag_matches("W/\"abc\"", etag));
        assert!(etag_matches("*", etag));
        assert!(!etag_matches("\"abcd\"", etag));
        assert!(!etag_matches("abc", etag));
    }

    #[test]
    fn etag_list_in_request_gets_304() {
        let app = app();
        let etag = app.handle(&get("/")).etag.unwrap();
        let req = Request::parse(&format!(
            "GET / HTTP/1.1\r\nIf-None-Match: \"0000\", W/{etag}"
        ))
        .unwrap();
        assert_eq!(app.handle(&req).status, Status::NotModified);
    }

    #[test]
    fn connection_limit_releases_on_drop() {
        let limit = ConnectionLimit::new(2);
        let first = limit.try_acquire().unwrap();
        let _second = limit.try_acquire().unwrap();
        assert!(limit.try_acquire().is_none());
        drop(first);
        assert!(limit.try_acquire().is_some());
    }

    #[test]
    fn connections_over_the_limit_get_503() {
        let server = Server::bind("127.0.0.1:0", app())
            .unwrap()
            .with_max_connections(1);
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.run());

        // Holds the only slot: connected, never sends a request.
        let idle = TcpStream::connect(addr).unwrap();

        let mut second = TcpStream::connect(addr).unwrap();
        second.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        second
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        second.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        drop(idle);
    }

    #[test]
    fn etag_is_stable_and_quoted() {
        assert_eq!(etag_for(b"abc"), etag_for(b"abc"));
        assert_ne!(etag_for(b"abc"), etag_for(b"abd"));
        let tag = etag_for(b"abc");
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert_eq!(tag.len(), 18);
    }

    #[test]
    fn write_to_serializes_head_and_body() {
        let response = Response::new(Status::Ok, "text/plain", b"hi".to_vec());
        let mut out = Vec::new();
        response.write_to(&mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.contains("ETag: \""));
        assert!(text.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn head_requests_omit_body() {
        let response = Response::new(Status::Ok, "text/plain", b"hi".to_vec());
        let mut out = Vec::new();
        response.write_to(&mut out, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn read_head_stops_at_blank_line() {
        let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: a\r\n\r\nignored body";
        assert_eq!(read_head(&mut input).unwrap(), "GET / HTTP/1.1\r\nHost: a");
    }

    #[test]
    fn read_head_rejects_oversized() {
        let big = vec![b'a'; MAX_HEAD + 2048];
        let mut input: &[u8] = &big;
        assert!(matches!(
            read_head(&mut input),
            Err(ServerError::BadRequest(_))
        ));
    }
}
