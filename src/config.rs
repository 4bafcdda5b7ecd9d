use std::{sync::Arc, time::Duration};

use crate::{
    assignment_logger::NoopAssignmentLogger, transport::Transport, AssignmentLogger, Client,
    Result, Tags,
};

/// Configuration for [`Client`].
pub struct ClientConfig<'a> {
    pub(crate) api_key: String,
    pub(crate) tags: Tags,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    pub(crate) assignment_logger: Box<dyn AssignmentLogger + Send + Sync + 'a>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
}

impl<'a> ClientConfig<'a> {
    /// Default base URL for API calls.
    pub const DEFAULT_BASE_URL: &'static str = "https://flags.setbit.io";

    /// Default timeout applied to every request.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a default SetBit configuration using the specified API key.
    ///
    /// ```
    /// # use setbit::ClientConfig;
    /// ClientConfig::from_api_key("api-key");
    /// ```
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        ClientConfig {
            api_key: api_key.into(),
            tags: Tags::new(),
            base_url: ClientConfig::DEFAULT_BASE_URL.to_owned(),
            timeout: ClientConfig::DEFAULT_TIMEOUT,
            assignment_logger: Box::new(NoopAssignmentLogger),
            transport: None,
        }
    }

    /// Set targeting tags (env, app, team, region, etc.) sent with every flag fetch.
    ///
    /// ```
    /// # use setbit::ClientConfig;
    /// let config = ClientConfig::from_api_key("api-key")
    ///     .tag("env", "production")
    ///     .tag("app", "web");
    /// ```
    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Add a single targeting tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Override base URL for API calls. Clients should use the default setting in most cases.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Override the timeout applied to every request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set assignment logger to pass variant assignments to your data warehouse.
    ///
    /// ```
    /// # use setbit::{AssignmentEvent, ClientConfig};
    /// let config = ClientConfig::from_api_key("api-key").assignment_logger(|event: AssignmentEvent| {
    ///   println!("{:?}", event);
    /// });
    /// ```
    pub fn assignment_logger(
        mut self,
        assignment_logger: impl AssignmentLogger + Send + Sync + 'a,
    ) -> Self {
        self.assignment_logger = Box::new(assignment_logger);
        self
    }

    /// Replace the default [`HttpTransport`](crate::HttpTransport). `base_url` and `timeout` are
    /// not applied to custom transports.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Create a new [`Client`] using the specified configuration, loading the initial flag set.
    ///
    /// See [`Client::new`] for errors.
    pub fn to_client(self) -> Result<Client<'a>> {
        Client::new(self)
    }
}
