//! Development server with rebuild-on-change.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │   Watch Worker   │     │  Rebuild Thread  │
//! │  (HTTP Server)  │     │    (debounce)    │────▶│  build_site()    │
//! └────────┬────────┘     └──────────────────┘     └────────┬─────────┘
//!          │                                                │
//!          ▼                                                ▼
//!    Serve files  ◀──────────  config.build.output  ◀── write output
//! ```
//!
//! Ctrl+C unblocks the server loop; the watcher is then closed, which ends
//! the event stream and lets the rebuild thread finish its current pass.

use crate::{
    build::{BuildReport, build_site},
    config::SiteConfig,
    debug, log,
    watch::{WatchEvent, Watcher},
};
use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::{Arc, mpsc::Receiver},
    thread::{self, JoinHandle},
};
use tiny_http::{Header, Request, Response, Server};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Build once, then serve the output directory until Ctrl+C.
///
/// With `serve.watch` enabled the site, partials and layouts roots are
/// watched and every debounced change triggers a full rebuild.
pub fn serve_site(config: &SiteConfig) -> Result<()> {
    // A broken site still gets served so it can be fixed while watching
    if let Err(err) = build_site(config) {
        log!("error"; "{err:#}");
    }

    let interface: IpAddr = config.serve.interface.parse()?;
    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    let rebuild = if config.serve.watch {
        let build = &config.build;
        let roots = [
            build.site.as_path(),
            build.partials.as_path(),
            build.layouts.as_path(),
        ];
        // Rebuilding rewrites the output; it must not count as a change
        let ignore = [build.output.as_path()];
        let (watcher, events) = Watcher::start(&roots, &ignore, config.serve.debounce())?;
        let worker = spawn_rebuild(config.clone(), events)?;
        Some((watcher, worker))
    } else {
        None
    };

    log!("serve"; "http://{}", addr);

    // Blocks until Ctrl+C
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &config.build.output) {
            log!("serve"; "request error: {e}");
        }
    }

    if let Some((watcher, worker)) = rebuild {
        watcher.close();
        if worker.join().is_err() {
            log!("watch"; "rebuild thread panicked");
        }
    }

    Ok(())
}

fn spawn_rebuild(config: SiteConfig, events: Receiver<WatchEvent>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rebuild".into())
        .spawn(move || {
            let stats = rebuild_loop(events, config.get_root(), || build_site(&config));
            debug!("watch"; "rebuild loop finished: {} builds, {} failed", stats.builds, stats.failures);
        })
        .context("Failed to spawn rebuild thread")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RebuildStats {
    builds: usize,
    failures: usize,
}

/// Rebuild once per change signal until the stream ends.
///
/// Builds run one at a time; signals arriving meanwhile coalesce in the
/// watcher's single-slot channel. A failed build is logged and the loop
/// keeps waiting for the next change.
fn rebuild_loop<F>(events: Receiver<WatchEvent>, root: &Path, mut rebuild: F) -> RebuildStats
where
    F: FnMut() -> Result<BuildReport>,
{
    let mut stats = RebuildStats::default();

    for event in events {
        let changed = event.path.strip_prefix(root).unwrap_or(&event.path);
        log!("watch"; "{} changed, rebuilding", changed.display());
        debug!("watch"; "settled {}ms ago", event.at.elapsed().as_millis());

        stats.builds += 1;
        if let Err(err) = rebuild() {
            stats.failures += 1;
            log!("error"; "{err:#}");
        }
    }

    stats
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

fn handle_request(request: Request, serve_root: &Path) -> Result<()> {
    match resolve_request(serve_root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

/// Map a request URL to a file under `serve_root`.
///
/// Resolution order:
/// 1. Exact file match
/// 2. Directory with index.html
///
/// Query strings are ignored and `..` segments are rejected.
fn resolve_request(serve_root: &Path, url: &str) -> Option<PathBuf> {
    // Decode URL-encoded characters (e.g., %20 → space)
    let url_path = urlencoding::decode(url).ok()?;
    let path_without_query = url_path.split('?').next().unwrap_or_default();
    let request_path = path_without_query.trim_matches('/');

    if request_path.split('/').any(|segment| segment == "..") {
        return None;
    }

    let local_path = serve_root.join(request_path);
    if local_path.is_file() {
        return Some(local_path);
    }

    let index_path = local_path.join("index.html");
    index_path.is_file().then_some(index_path)
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("invalid header value `{value}`"))
}

fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response =
        Response::from_data(content).with_header(content_type_header(guess_content_type(path))?);

    request.respond(response)?;
    Ok(())
}

fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::from_string("404 Not Found")
        .with_status_code(404)
        .with_header(content_type_header("text/plain; charset=utf-8")?);

    request.respond(response)?;
    Ok(())
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::mpsc::{self, RecvTimeoutError},
        time::{Duration, Instant},
    };
    use tempfile::TempDir;

    /// Project whose output directory sits inside the site root.
    fn nested_output_config(dir: &TempDir) -> SiteConfig {
        let root = dir.path().canonicalize().unwrap();
        let mut config = SiteConfig::default();
        config.set_root(&root);
        config.build.site = root.join("site");
        config.build.output = root.join("site/public");
        config.build.partials = root.join("partials");
        config.build.layouts = root.join("layouts");
        fs::create_dir_all(&config.build.site).unwrap();
        fs::create_dir_all(&config.build.layouts).unwrap();
        config
    }

    fn signal(path: &Path) -> WatchEvent {
        WatchEvent {
            path: path.to_path_buf(),
            at: Instant::now(),
        }
    }

    fn output_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog/first post")).unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();
        fs::write(dir.path().join("blog/first post/index.html"), "post").unwrap();
        dir
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a/index.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("logo.SVG")), "application/octet-stream");
        assert_eq!(guess_content_type(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(guess_content_type(Path::new("font.woff2")), "font/woff2");
        assert_eq!(guess_content_type(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn test_resolve_exact_file() {
        let dir = output_dir();
        assert_eq!(
            resolve_request(dir.path(), "/style.css?t=123"),
            Some(dir.path().join("style.css"))
        );
    }

    #[test]
    fn test_resolve_directory_index() {
        let dir = output_dir();
        assert_eq!(resolve_request(dir.path(), "/"), Some(dir.path().join("index.html")));
        assert_eq!(
            resolve_request(dir.path(), "/blog/first%20post/"),
            Some(dir.path().join("blog/first post/index.html"))
        );
    }

    #[test]
    fn test_resolve_missing() {
        let dir = output_dir();
        assert_eq!(resolve_request(dir.path(), "/nope.html"), None);
        // Directory without index.html
        assert_eq!(resolve_request(dir.path(), "/blog"), None);
    }

    #[test]
    fn test_resolve_rejects_parent_segments() {
        let dir = output_dir();
        let inner = dir.path().join("blog");
        assert_eq!(resolve_request(&inner, "/../index.html"), None);
        assert_eq!(resolve_request(&inner, "/%2E%2E/style.css"), None);
    }

    #[test]
    fn test_try_bind_port_skips_taken_port() {
        let held = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let taken = held.local_addr().unwrap().port();

        let (_server, addr) = try_bind_port("127.0.0.1".parse().unwrap(), taken, 5).unwrap();
        assert_ne!(addr.port(), taken);
    }

    #[test]
    fn test_rebuild_loop_builds_once_per_signal_and_survives_failure() {
        let (tx, rx) = mpsc::sync_channel(3);
        for name in ["a.html", "b.html", "c.html"] {
            tx.send(signal(Path::new(name))).unwrap();
        }
        drop(tx);

        let mut calls = 0;
        let stats = rebuild_loop(rx, Path::new("/"), || {
            calls += 1;
            if calls == 1 {
                Err(anyhow!("layout `article` not found"))
            } else {
                Ok(BuildReport::default())
            }
        });

        assert_eq!(calls, 3);
        assert_eq!(stats, RebuildStats { builds: 3, failures: 1 });
    }

    #[test]
    fn test_rebuild_loop_runs_site_build() {
        let dir = TempDir::new().unwrap();
        let config = nested_output_config(&dir);
        fs::write(
            config.build.site.join("index.html"),
            "---\nlayouts: [base]\n---\nHELLO",
        )
        .unwrap();

        let run = |config: &SiteConfig| {
            let (tx, rx) = mpsc::sync_channel(1);
            tx.send(signal(&config.build.site.join("index.html"))).unwrap();
            drop(tx);
            rebuild_loop(rx, config.get_root(), || build_site(config))
        };

        // Missing layout: logged, loop still finishes normally
        assert_eq!(run(&config), RebuildStats { builds: 1, failures: 1 });

        fs::write(
            config.build.layouts.join("base.tmpl"),
            "<main>{{> (lookup page \"template\")}}</main>",
        )
        .unwrap();
        assert_eq!(run(&config), RebuildStats { builds: 1, failures: 0 });
        assert_eq!(
            fs::read_to_string(config.build.output.join("index.html")).unwrap(),
            "<main>HELLO\n</main>"
        );
    }

    #[test]
    fn test_rebuild_thread_exits_when_watcher_closes() {
        let dir = TempDir::new().unwrap();
        let config = nested_output_config(&dir);

        let (watcher, events) = Watcher::start(&[], &[], Duration::from_millis(50)).unwrap();
        let worker = spawn_rebuild(config, events).unwrap();
        watcher.close();

        worker.join().unwrap();
    }

    #[test]
    fn test_output_inside_site_does_not_retrigger() {
        let dir = TempDir::new().unwrap();
        let config = nested_output_config(&dir);
        let site = config.build.site.clone();
        fs::write(site.join("index.html"), "<p>home</p>").unwrap();
        build_site(&config).unwrap();

        let window = Duration::from_millis(100);
        let (watcher, events) =
            Watcher::start(&[site.as_path()], &[config.build.output.as_path()], window).unwrap();

        // Clean rebuilds remove and rewrite the whole output tree
        build_site(&config).unwrap();
        build_site(&config).unwrap();
        assert!(matches!(
            events.recv_timeout(window * 5),
            Err(RecvTimeoutError::Timeout)
        ));

        fs::write(site.join("about.html"), "<p>about</p>").unwrap();
        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!event.path.starts_with(&config.build.output));

        watcher.close();
    }
}
