//! Loads flag sets through the transport into the flag cache.
use std::sync::Arc;

use chrono::Utc;

use crate::{
    flag_cache::{FlagCache, FlagSnapshot},
    flags::Tags,
    transport::Transport,
    Result,
};

/// Fetches the full flag set and swaps it into the [`FlagCache`].
///
/// Shared between the [`Client`](crate::Client) and its [`PollerThread`](crate::PollerThread).
pub(crate) struct FlagFetcher {
    transport: Arc<dyn Transport>,
    api_key: String,
    tags: Tags,
    cache: Arc<FlagCache>,
}

impl FlagFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_key: String,
        tags: Tags,
        cache: Arc<FlagCache>,
    ) -> Self {
        FlagFetcher {
            transport,
            api_key,
            tags,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<FlagCache> {
        &self.cache
    }

    /// Fetch the flag set and replace the cached snapshot, returning the number of flags loaded.
    ///
    /// On error the cache is left untouched.
    pub fn load(&self) -> Result<usize> {
        let flags = self.transport.fetch_flags(&self.api_key, &self.tags)?;
        let snapshot = FlagSnapshot::new(flags, Utc::now());
        let count = snapshot.len();
        self.cache.replace(snapshot);
        log::debug!(target: "setbit", flag_count = count; "flag cache replaced");
        Ok(count)
    }
}
