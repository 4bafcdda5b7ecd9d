//! The Rust SDK for SetBit, a simple feature flag and A/B testing service.
//!
//! # Overview
//!
//! The SDK revolves around a [`Client`] that loads all flag definitions for your API key and tags
//! when it is created and evaluates them locally:
//!
//! - [`Client::enabled`] checks whether a flag is on.
//! - [`Client::variant`] assigns an identity to a variant of an experiment. Assignment is
//!   deterministic: an identity is hashed into one of 100 buckets (see [`bucket`]) and the bucket
//!   picks a variant proportionally to the configured weights.
//! - [`Client::track`] reports a [`ConversionEvent`].
//!
//! An [`AssignmentLogger`] can be provided to receive an [`AssignmentEvent`] for every variant
//! assignment, facilitating exposure tracking in your own storage.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! Creating a client fails on configuration problems (e.g., empty API key), on an invalid API key,
//! and when the initial flag set cannot be loaded. After that, flag evaluation and event tracking
//! never fail: errors are logged and the caller-supplied default is returned, as feature flag
//! evaluation should never cause an outage of the calling application. [`Client::refresh`]
//! reports errors but always keeps the previously loaded flags.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages, with
//! target `setbit`. Consider integrating a `log`-compatible logger implementation for better
//! visibility into SDK operations.
//!
//! # Examples
//!
//! A runnable example can be found in the `demos/simple` directory of the crate repository.

#![warn(rustdoc::missing_crate_level_docs)]

mod assignment_logger;
mod bucketer;
mod client;
mod config;
mod error;
mod eval;
mod events;
mod fetcher;
mod flag_cache;
mod flags;
mod poller;
mod selector;
mod transport;

pub use assignment_logger::{AssignmentEvent, AssignmentLogger};
pub use bucketer::{bucket, Bucketer, Sha256Bucketer, TOTAL_BUCKETS};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use events::{ConversionEvent, Metadata, MetadataValue, TrackPayload};
pub use flag_cache::CacheStats;
pub use flags::{FlagDefinition, FlagSet, FlagType, Tags, TryParse, VariantConfig};
pub use poller::{PollerThread, DEFAULT_POLL_INTERVAL};
pub use selector::{select_variant, BucketDraw, DrawSource, RandomDraw, CONTROL};
pub use transport::{HttpTransport, Transport};
