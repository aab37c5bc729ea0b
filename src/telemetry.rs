//! Tracing subscriber setup.
//!
//! `LOG_LEVEL` takes EnvFilter directives (default below), `LOG_FORMAT=json`
//! switches to one JSON object per event. Services log under the `session`,
//! `scoring`, `leaderboard` and `linguaforge` targets; tower-http adds a span
//! per request.

use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,linguaforge=debug,session=debug,leaderboard=debug,tower_http=info,axum=info";

/// Filter from `LOG_LEVEL`, or the default when unset or unparsable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn json_requested() -> bool {
    std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}

pub fn init_tracing() {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json_requested() {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }
}
