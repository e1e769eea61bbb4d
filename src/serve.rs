// src/serve.rs

//! Development server over the build directory.
//!
//! Static files are served straight from `build/`, HTML responses get a
//! small long-polling reload script injected before `</body>`, and a
//! notify watcher on the build tree bumps a [`tokio::sync::watch`] counter
//! that parked `/__livereload` requests wake up on. With the html_ext
//! flag off, `/about` falls back to `about.html` so extensionless links
//! work the same as on a rewriting production host.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::pipeline::Pipeline;

/// How long a reload poll parks before answering "idle".
const POLL_TIMEOUT: Duration = Duration::from_secs(25);

const RELOAD_SNIPPET: &str = "\
<script>\n\
(function () {\n\
\tfunction poll() {\n\
\t\tfetch('/__livereload')\n\
\t\t\t.then(function (res) { return res.text(); })\n\
\t\t\t.then(function (body) {\n\
\t\t\t\tif (body === 'reload') {\n\
\t\t\t\t\tlocation.reload();\n\
\t\t\t\t} else {\n\
\t\t\t\t\tpoll();\n\
\t\t\t\t}\n\
\t\t\t})\n\
\t\t\t.catch(function () { setTimeout(poll, 1000); });\n\
\t}\n\
\tpoll();\n\
})();\n\
</script>\n";

#[derive(Clone)]
struct ServeState {
    build: PathBuf,
    html_ext: bool,
    reload: watch::Receiver<u64>,
}

pub async fn run(pipeline: Arc<Pipeline>) -> Result<()> {
    let build = pipeline.paths.build.clone();
    std::fs::create_dir_all(&build).with_context(|| format!("creating {build:?}"))?;

    let (reload_tx, reload_rx) = watch::channel(0u64);
    // Keep the watcher alive for the lifetime of the server.
    let _watcher = spawn_build_watcher(&build, reload_tx)?;

    let state = ServeState {
        build,
        html_ext: pipeline.flags.html_ext,
        reload: reload_rx,
    };
    let app = Router::new()
        .route("/__livereload", get(livereload))
        .fallback(get(serve_file))
        .with_state(state);

    let addr = ("0.0.0.0", pipeline.flags.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding port {}", pipeline.flags.port))?;
    info!("dev server listening on http://localhost:{}", pipeline.flags.port);
    axum::serve(listener, app).await.context("dev server stopped")
}

/// Bump the reload counter whenever anything in the build tree changes.
fn spawn_build_watcher(build: &Path, tx: watch::Sender<u64>) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if !matches!(event.kind, notify::event::EventKind::Access(_)) {
                    tx.send_modify(|generation| *generation += 1);
                }
            }
        },
        Config::default(),
    )?;
    watcher.watch(build, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Long poll: answers "reload" when the build tree changes, "idle" when
/// the poll times out and the client should just ask again.
async fn livereload(State(state): State<ServeState>) -> &'static str {
    let mut rx = state.reload.clone();
    rx.borrow_and_update();
    match tokio::time::timeout(POLL_TIMEOUT, rx.changed()).await {
        Ok(Ok(())) => "reload",
        _ => "idle",
    }
}

async fn serve_file(State(state): State<ServeState>, uri: Uri) -> Response {
    let Some(path) = resolve(&state.build, uri.path(), state.html_ext) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };
    let Ok(body) = tokio::fs::read(&path).await else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };
    debug!(path = %path.display(), "serve");

    let content_type = content_type_for(&path);
    if content_type == "text/html; charset=utf-8" {
        let html = String::from_utf8_lossy(&body);
        return (
            [(header::CONTENT_TYPE, content_type)],
            inject_reload(&html),
        )
            .into_response();
    }
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Map a request path onto a file under the build directory.
///
/// Rejects anything trying to climb out of the tree, serves `index.html`
/// for directories, and with html_ext off retries `<path>.html` for
/// extensionless requests.
fn resolve(build: &Path, uri_path: &str, html_ext: bool) -> Option<PathBuf> {
    let trimmed = uri_path.trim_start_matches('/');
    let rel = Path::new(trimmed);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let mut path = build.join(rel);
    if trimmed.is_empty() || path.is_dir() {
        path = path.join("index.html");
    }
    if path.is_file() {
        return Some(path);
    }
    if !html_ext && path.extension().is_none() {
        let fallback = path.with_extension("html");
        if fallback.is_file() {
            return Some(fallback);
        }
    }
    None
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.to_str().unwrap_or_default() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Slot the reload script in just before `</body>`; pages without one get
/// it appended.
fn inject_reload(html: &str) -> String {
    match html.rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SNIPPET.len());
            out.push_str(&html[..at]);
            out.push_str(RELOAD_SNIPPET);
            out.push_str(&html[at..]);
            out
        }
        None => {
            let mut out = html.to_string();
            out.push_str(RELOAD_SNIPPET);
            out
        }
    }
}
