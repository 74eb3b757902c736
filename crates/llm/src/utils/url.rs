use std::fmt::Display;

/// Joins a base URL and an API path with exactly one `/` between them.
pub fn create_model_url(base_url: impl Display, api_url: impl Display) -> String {
    let base = base_url.to_string();
    let api = api_url.to_string();
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        api.trim_start_matches('/')
    )
}
