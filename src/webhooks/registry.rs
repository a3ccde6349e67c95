//! Webhook registry keyed by operator-chosen id.

use dashmap::DashMap;
use std::sync::Arc;

use crate::config::{WebhookConfig, WebhookEntry};
use crate::events::SecurityEvent;

/// Thread-safe registry of webhook configurations.
///
/// Registering an existing id replaces its configuration. URLs and secrets
/// are not validated here; bad values surface on the first delivery.
#[derive(Clone, Default)]
pub struct WebhookRegistry {
    inner: Arc<DashMap<String, WebhookConfig>>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from typed configuration entries.
    pub fn from_entries(entries: impl IntoIterator<Item = WebhookEntry>) -> Self {
        let registry = Self::new();
        for entry in entries {
            registry.add(entry.name, entry.config);
        }
        registry
    }

    /// Register or replace a webhook. Returns the previous configuration, if any.
    pub fn add(&self, id: impl Into<String>, config: WebhookConfig) -> Option<WebhookConfig> {
        let id = id.into();
        tracing::info!(webhook = %id, url = %config.url, enabled = config.enabled, "Webhook registered");
        let previous = self.inner.insert(id.clone(), config);
        if previous.is_some() {
            tracing::info!(webhook = %id, "Replaced existing webhook configuration");
        }
        previous
    }

    pub fn remove(&self, id: &str) -> Option<WebhookConfig> {
        let removed = self.inner.remove(id).map(|(_, config)| config);
        if removed.is_some() {
            tracing::info!(webhook = %id, "Webhook removed");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<WebhookConfig> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    /// Snapshot of every registration, sorted by id.
    pub fn list(&self) -> Vec<(String, WebhookConfig)> {
        let mut all: Vec<_> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Registrations whose filter accepts the event, evaluated now.
    pub fn matching(&self, event: &SecurityEvent) -> Vec<(String, WebhookConfig)> {
        self.list()
            .into_iter()
            .filter(|(_, config)| should_send(config, event))
            .collect()
    }
}

/// Filter rule: enabled, severity at or above the threshold, type in the allow-list.
pub fn should_send(config: &WebhookConfig, event: &SecurityEvent) -> bool {
    if !config.enabled {
        return false;
    }

    if let Some(min) = config.min_severity {
        if !event.severity.meets(min) {
            return false;
        }
    }

    config.events.is_empty() || config.events.contains(&event.event_type)
}
