use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{transport::Transport, Result};

/// Arbitrary key-value metadata attached to a conversion event.
pub type Metadata = HashMap<String, MetadataValue>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, From)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Json(serde_json::Value),
    Null,
}
impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// A conversion event, e.g. a purchase or a signup, optionally attributed to a flag and variant.
///
/// ```
/// # use setbit::ConversionEvent;
/// let event = ConversionEvent::new("purchase", "user-123")
///     .flag_name("pricing-test")
///     .variant("variant_a")
///     .metadata("amount", 99.99);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionEvent {
    pub event_name: String,
    pub identity: String,
    pub flag_name: Option<String>,
    pub variant: Option<String>,
    pub metadata: Option<Metadata>,
}

impl ConversionEvent {
    pub fn new(event_name: impl Into<String>, identity: impl Into<String>) -> Self {
        ConversionEvent {
            event_name: event_name.into(),
            identity: identity.into(),
            flag_name: None,
            variant: None,
            metadata: None,
        }
    }

    /// Attribute the event to a flag.
    pub fn flag_name(mut self, flag_name: impl Into<String>) -> Self {
        self.flag_name = Some(flag_name.into());
        self
    }

    /// Attribute the event to the variant the identity was assigned to.
    pub fn variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Add a single metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Build the wire payload, stamping it with the current time.
    pub(crate) fn to_payload(&self) -> TrackPayload {
        TrackPayload {
            user_id: self.identity.clone(),
            event_name: self.event_name.clone(),
            flag_name: self.flag_name.clone(),
            variant: self.variant.clone(),
            metadata: self.metadata.clone().filter(|m| !m.is_empty()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Body of a track request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackPayload {
    pub user_id: String,
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub timestamp: String,
}

/// Submits conversion events, one request per event.
pub(crate) struct EventReporter {
    transport: Arc<dyn Transport>,
    api_key: String,
}

impl EventReporter {
    pub fn new(transport: Arc<dyn Transport>, api_key: String) -> Self {
        EventReporter { transport, api_key }
    }

    /// Submit `event`. Failures are logged and swallowed.
    pub fn report(&self, event: &ConversionEvent) {
        if let Err(err) = self.try_report(event) {
            log::warn!(target: "setbit",
                       event_name:display = event.event_name,
                       identity:display = event.identity;
                       "failed to track event: {}", err);
        }
    }

    fn try_report(&self, event: &ConversionEvent) -> Result<()> {
        let payload = event.to_payload();
        self.transport.post_event(&self.api_key, &payload)?;
        log::debug!(target: "setbit",
                    event_name:display = payload.event_name,
                    identity:display = payload.user_id;
                    "tracked event");
        Ok(())
    }
}
