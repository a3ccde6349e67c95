//! Environment variable overlay.
//!
//! Recognised variables:
//! - `APP_ENV`: deployment environment (`production`, `development`, `test`)
//! - `SENTINEL_BIND_ADDRESS`, `SENTINEL_API_KEY`, `SENTINEL_ADMIN_API_KEY`
//! - `WEBHOOK_<NAME>_URL`, `WEBHOOK_<NAME>_SECRET`, and optionally
//!   `WEBHOOK_<NAME>_EVENTS` (comma separated) and `WEBHOOK_<NAME>_MIN_SEVERITY`
//!
//! Functions take the variables as an iterator so they can be driven from
//! `std::env::vars()` at process entry and from fixed lists in tests.

use std::collections::BTreeMap;

use crate::config::schema::{SentinelConfig, WebhookConfig, WebhookEntry};
use crate::events::{EventType, Severity};

const WEBHOOK_PREFIX: &str = "WEBHOOK_";

enum Field {
    Url,
    Secret,
    Events,
    MinSeverity,
}

#[derive(Default)]
struct PartialWebhook {
    url: Option<String>,
    secret: Option<String>,
    events: Option<String>,
    min_severity: Option<String>,
}

/// Discover webhooks declared through `WEBHOOK_<NAME>_*` variables.
///
/// Names with both URL and SECRET are returned (id = lowercase name), sorted by id.
/// A webhook whose EVENTS list names no known type is skipped rather than
/// widened to every type.
pub fn webhooks_from_env<I>(vars: I) -> Vec<WebhookEntry>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut partials: BTreeMap<String, PartialWebhook> = BTreeMap::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(WEBHOOK_PREFIX) else {
            continue;
        };

        // `_MIN_SEVERITY` is checked first so it isn't read as a name ending in `_MIN`.
        let (name, field) = if let Some(n) = rest.strip_suffix("_MIN_SEVERITY") {
            (n, Field::MinSeverity)
        } else if let Some(n) = rest.strip_suffix("_SECRET") {
            (n, Field::Secret)
        } else if let Some(n) = rest.strip_suffix("_EVENTS") {
            (n, Field::Events)
        } else if let Some(n) = rest.strip_suffix("_URL") {
            (n, Field::Url)
        } else {
            continue;
        };

        if name.is_empty() {
            continue;
        }

        let partial = partials.entry(name.to_ascii_lowercase()).or_default();
        match field {
            Field::Url => partial.url = Some(value),
            Field::Secret => partial.secret = Some(value),
            Field::Events => partial.events = Some(value),
            Field::MinSeverity => partial.min_severity = Some(value),
        }
    }

    partials
        .into_iter()
        .filter_map(|(name, partial)| {
            let (Some(url), Some(secret)) = (partial.url, partial.secret) else {
                tracing::debug!(webhook = %name, "Skipping webhook without both URL and SECRET");
                return None;
            };

            let mut config = WebhookConfig::new(url, secret);

            if let Some(events) = partial.events {
                let requested: Vec<&str> = events.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
                config.events = requested
                    .iter()
                    .filter_map(|s| match s.parse::<EventType>() {
                        Ok(t) => Some(t),
                        Err(e) => {
                            tracing::warn!(webhook = %name, error = %e, "Ignoring unknown event type");
                            None
                        }
                    })
                    .collect();

                if !requested.is_empty() && config.events.is_empty() {
                    tracing::error!(
                        webhook = %name,
                        events = %events,
                        "No known event types in allow-list, skipping webhook"
                    );
                    return None;
                }
            }

            if let Some(severity) = partial.min_severity {
                match severity.parse::<Severity>() {
                    Ok(s) => config.min_severity = Some(s),
                    Err(e) => tracing::warn!(webhook = %name, error = %e, "Ignoring invalid minimum severity"),
                }
            }

            Some(WebhookEntry { name, config })
        })
        .collect()
}

/// Overlay environment variables onto a loaded configuration.
pub fn apply_env<I>(config: &mut SentinelConfig, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: Vec<(String, String)> = vars.into_iter().collect();

    for (key, value) in &vars {
        match key.as_str() {
            "APP_ENV" => match value.parse() {
                Ok(env) => config.environment = env,
                Err(e) => tracing::warn!(error = %e, "Ignoring APP_ENV"),
            },
            "SENTINEL_BIND_ADDRESS" => config.listener.bind_address = value.clone(),
            "SENTINEL_API_KEY" => config.api.api_key = value.clone(),
            "SENTINEL_ADMIN_API_KEY" => {
                config.admin.api_key = value.clone();
                config.admin.enabled = true;
            }
            _ => {}
        }
    }

    // Environment-declared webhooks replace file entries with the same id.
    for entry in webhooks_from_env(vars) {
        config.webhooks.retain(|w| w.name != entry.name);
        config.webhooks.push(entry);
    }
}
