use super::BridgeConfig;

/// Overlay environment variables on top of a loaded configuration.
///
/// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
/// Unparseable numeric values are ignored and the existing value kept.
pub fn apply_env_overrides<F>(config: &mut BridgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let trello = &mut config.trello;
    for (name, field) in [
        ("TRELLO_CONSUMER_KEY", &mut trello.consumer_key),
        ("TRELLO_CONSUMER_SECRET", &mut trello.consumer_secret),
        ("TRELLO_CALLBACK_URL", &mut trello.callback_url),
        ("TRELLO_REQUEST_TOKEN_URL", &mut trello.request_token_url),
        ("TRELLO_ACCESS_TOKEN_URL", &mut trello.access_token_url),
        ("TRELLO_AUTHORIZE_URL", &mut trello.authorize_url),
        ("TRELLO_API_BASE_URL", &mut trello.api_base_url),
        ("TRELLO_APP_NAME", &mut trello.app_name),
        ("TRELLO_SCOPE", &mut trello.scope),
        ("TRELLO_EXPIRATION", &mut trello.expiration),
        ("BRIDGE_CORS_ORIGIN", &mut config.server.cors_origin),
        ("TRELLO_APP_HOME_URL", &mut config.server.app_home_url),
    ] {
        if let Some(v) = lookup(name) {
            *field = v;
        }
    }

    if let Some(n) = lookup("BRIDGE_PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.server.port = n;
    }
    if let Some(n) = lookup("BRIDGE_UPSTREAM_TIMEOUT_SECONDS").and_then(|v| v.parse::<u64>().ok()) {
        config.upstream.timeout_seconds = n;
    }
    if let Some(n) = lookup("BRIDGE_TEMPORARY_TTL_SECONDS").and_then(|v| v.parse::<i64>().ok()) {
        config.credentials.temporary_ttl_seconds = n;
    }
    if let Some(n) = lookup("BRIDGE_SESSION_TTL_SECONDS").and_then(|v| v.parse::<i64>().ok()) {
        config.credentials.session_ttl_seconds = n;
    }
    if let Some(n) = lookup("BRIDGE_HANDOFF_TTL_SECONDS").and_then(|v| v.parse::<i64>().ok()) {
        config.credentials.handoff_ttl_seconds = n;
    }
    if let Some(n) = lookup("BRIDGE_SWEEP_INTERVAL_SECONDS").and_then(|v| v.parse::<u64>().ok()) {
        config.credentials.sweep_interval_seconds = n;
    }
}
