// src/http/routes.rs

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

use crate::state::SharedState;

/// Everything the handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub state: SharedState,
    pub registry: Registry,
}

pub fn create_router(state: SharedState, registry: Registry) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState { state, registry })
}

/// GET / — status page: command line, last output, last run time and
/// duration. Rendered from a single snapshot so the fields always belong
/// to the same run.
async fn index_handler(State(app): State<AppState>) -> Html<String> {
    let snap = app.state.snapshot();

    let body = match snap.last {
        Some(result) => format!(
            "<p>\"{command}\" output:</p>\n\
             <pre>{output}</pre>\n\
             <p>Run at {time} took {duration:?}</p>",
            command = escape_html(&snap.command),
            output = escape_html(&result.output_lossy()),
            time = format_system_time(result.started),
            duration = result.duration,
        ),
        None => format!(
            "<p>\"{command}\": no run completed yet</p>",
            command = escape_html(&snap.command),
        ),
    };

    Html(format!(
        "<html>\n\
         <head><title>Prometheus Command Runner</title></head>\n\
         <body>\n\
         <h2>Prometheus Command Runner</h2>\n\
         {body}\n\
         </body>\n\
         </html>"
    ))
}

/// GET /metrics — Prometheus text exposition of the crate registry.
async fn metrics_handler(State(app): State<AppState>) -> Result<String, StatusCode> {
    let families = app.registry.gather();
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buf)
        .map_err(|err| {
            error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    String::from_utf8(buf).map_err(|err| {
        error!(error = %err, "metrics exposition was not UTF-8");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Minimal HTML escaping for untrusted command output.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_system_time(t: std::time::SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(t)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html("<script>&'\"</script>"),
            "&lt;script&gt;&amp;&#39;&quot;&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
