use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    bucketer::Sha256Bucketer,
    events::EventReporter,
    fetcher::FlagFetcher,
    flag_cache::FlagCache,
    poller::PollerThread,
    transport::{HttpTransport, Transport},
    AssignmentEvent, AssignmentLogger, CacheStats, ClientConfig, ConversionEvent, Error, Result,
    Tags,
};

/// A client for the SetBit API.
///
/// The full flag set is fetched when the client is created and all evaluations happen locally
/// against that in-memory copy. Call [`Client::refresh`] (or start a [`PollerThread`] with
/// [`Client::start_poller_thread`]) to pick up flag changes.
///
/// Evaluation and tracking never fail: on any error they log a warning and fall back to the
/// caller-supplied default.
///
/// # Examples
/// ```no_run
/// # use setbit::{Client, ClientConfig, ConversionEvent};
/// let client = Client::new(ClientConfig::from_api_key("api-key").tag("env", "production"))?;
///
/// if client.enabled("new-checkout", "user-123", false) {
///     // show new checkout
/// }
///
/// let variant = client.variant("pricing-test", "user-123", "control");
/// client.track(
///     ConversionEvent::new("purchase", "user-123")
///         .flag_name("pricing-test")
///         .variant(variant)
///         .metadata("amount", 99.99),
/// );
/// # Ok::<(), setbit::Error>(())
/// ```
pub struct Client<'a> {
    fetcher: Arc<FlagFetcher>,
    reporter: EventReporter,
    tags: Tags,
    assignment_logger: Box<dyn AssignmentLogger + Send + Sync + 'a>,
}

impl<'a> Client<'a> {
    /// Create a new `Client` using the specified configuration and load the initial flag set.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingApiKey`] if the API key is empty.
    /// - [`Error::InvalidBaseUrl`] if the base URL cannot be parsed.
    /// - [`Error::Unauthorized`] if the server rejects the API key.
    /// - Any transport error of the initial load: there is no previous flag set to fall back to.
    pub fn new(config: ClientConfig<'a>) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }

        let transport: Arc<dyn Transport> = match config.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.base_url, config.timeout)?),
        };

        let fetcher = Arc::new(FlagFetcher::new(
            transport.clone(),
            config.api_key.clone(),
            config.tags.clone(),
            Arc::new(FlagCache::new()),
        ));

        let flag_count = fetcher.load().inspect_err(|err| {
            log::warn!(target: "setbit", "failed to load initial flag set: {}", err);
        })?;
        log::debug!(target: "setbit", flag_count, tags:serde = &config.tags; "client initialized");

        Ok(Client {
            fetcher,
            reporter: EventReporter::new(transport, config.api_key),
            tags: config.tags,
            assignment_logger: config.assignment_logger,
        })
    }

    /// Check if a flag is enabled.
    ///
    /// Returns `default` if the flag is unknown or its definition could not be parsed. For
    /// experiments this reports whether the experiment is running; use [`Client::variant`] to get
    /// the assignment.
    pub fn enabled(&self, flag_name: &str, identity: &str, default: bool) -> bool {
        let Some(snapshot) = self.fetcher.cache().snapshot() else {
            log::warn!(target: "setbit", flag_name, identity; "evaluating a flag before flags have been loaded");
            return default;
        };

        match snapshot.eval_enabled(flag_name) {
            Ok(enabled) => {
                log::trace!(target: "setbit", flag_name, identity, enabled; "evaluated a flag");
                enabled
            }
            Err(err) => {
                log::warn!(target: "setbit",
                           flag_name,
                           identity,
                           default;
                           "error occurred while evaluating a flag, returning default: {}", err);
                default
            }
        }
    }

    /// Get the variant `identity` is assigned for an experiment.
    ///
    /// Assignment is deterministic: the same identity always gets the same variant as long as the
    /// experiment's weights don't change. Returns `default` if the flag is unknown, disabled, not
    /// an experiment, or could not be parsed.
    pub fn variant(&self, flag_name: &str, identity: &str, default: &str) -> String {
        let Some(snapshot) = self.fetcher.cache().snapshot() else {
            log::warn!(target: "setbit", flag_name, identity; "evaluating a flag before flags have been loaded");
            return default.to_owned();
        };

        match snapshot.eval_variant(flag_name, identity, &Sha256Bucketer) {
            Ok(Some(variant)) => {
                log::trace!(target: "setbit", flag_name, identity, variant; "assigned a variant");
                self.log_assignment(flag_name, identity, variant);
                variant.to_owned()
            }
            Ok(None) => {
                log::trace!(target: "setbit", flag_name, identity; "flag assigns no variant, returning default");
                default.to_owned()
            }
            Err(err) => {
                log::warn!(target: "setbit",
                           flag_name,
                           identity,
                           default;
                           "error occurred while evaluating a flag, returning default: {}", err);
                default.to_owned()
            }
        }
    }

    fn log_assignment(&self, flag_name: &str, identity: &str, variant: &str) {
        let event = AssignmentEvent {
            flag_name: flag_name.to_owned(),
            variant: variant.to_owned(),
            identity: identity.to_owned(),
            tags: self.tags.clone(),
            timestamp: Utc::now().to_rfc3339(),
            meta_data: HashMap::from([
                ("sdkLanguage".to_owned(), "rust".to_owned()),
                (
                    "sdkVersion".to_owned(),
                    env!("CARGO_PKG_VERSION").to_owned(),
                ),
            ]),
        };
        log::trace!(target: "setbit", event:serde; "logging assignment");
        self.assignment_logger.log_assignment(event);
    }

    /// Track a conversion event.
    ///
    /// Sends one request per call. Failures are logged and never returned.
    pub fn track(&self, event: ConversionEvent) {
        self.reporter.report(&event);
    }

    /// Re-fetch the flag set and replace the cached one.
    ///
    /// # Errors
    ///
    /// On any error the previously loaded flags are kept and evaluation keeps working.
    /// [`Error::Unauthorized`] signals that the API key has been revoked.
    pub fn refresh(&self) -> Result<()> {
        self.fetcher
            .load()
            .map(|flag_count| {
                log::debug!(target: "setbit", flag_count; "refreshed flags");
            })
            .inspect_err(|err| {
                log::warn!(target: "setbit", "failed to refresh flags, keeping previous flag set: {}", err);
            })
    }

    /// Start a poller thread that refreshes flags every `interval` (plus a small random jitter).
    ///
    /// Pass [`DEFAULT_POLL_INTERVAL`](crate::DEFAULT_POLL_INTERVAL) if unsure.
    ///
    /// The thread stops when [`PollerThread::stop`] is called, when the API key is rejected, or
    /// when the returned handle is dropped. Keep the handle alive for as long as you want flags
    /// refreshed.
    pub fn start_poller_thread(&self, interval: Duration) -> Result<PollerThread> {
        PollerThread::start(self.fetcher.clone(), interval)
    }

    /// Statistics about the currently loaded flag set.
    pub fn stats(&self) -> CacheStats {
        self.fetcher.cache().stats()
    }

    /// Number of flags currently loaded.
    pub fn cache_size(&self) -> usize {
        self.stats().flag_count
    }

    /// Targeting tags this client was configured with.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }
}
