use crate::api::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use pulse_common::Metric;
use std::fmt::Write;

/// Escapes the characters that are significant in HTML text and attribute
/// values. Metric ids are arbitrary client input.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render(metrics: &[Metric]) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Metrics</title></head>\n<body>\n\
         <table>\n<tr><th>Name</th><th>Type</th><th>Value</th></tr>\n",
    );
    for metric in metrics {
        let _ = writeln!(
            page,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&metric.id),
            metric.kind(),
            metric.value
        );
    }
    page.push_str("</table>\n</body>\n</html>\n");
    page
}

/// `GET /`: every stored metric as an HTML table, sorted by id.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let mut metrics: Vec<Metric> = state.repository.all().await?.into_values().collect();
    metrics.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(Html(render(&metrics)))
}

/// `GET /ping`: 200 when the database answers.
pub async fn ping(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.repository.ping().await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "OK"))
}
