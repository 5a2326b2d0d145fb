//! The browser chat page, compiled into the binary.

use axum::extract::State;
use axum::response::Html;

use crate::routes::AppState;

const INDEX_HTML: &str = include_str!("../assets/index.html");

fn caption(google_search: bool) -> &'static str {
    if google_search {
        "Session memory is ON; Google Search tool enabled."
    } else {
        "Session memory is ON; Google Search tool disabled."
    }
}

pub fn render_index(google_search: bool) -> String {
    INDEX_HTML.replace("{{CAPTION}}", caption(google_search))
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(state.google_search))
}
