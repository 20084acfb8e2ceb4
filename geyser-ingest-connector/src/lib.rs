//! A core Rust library for ingesting a Yellowstone Geyser subscription stream.
//!
//! This crate provides the building blocks of the ingestion pipeline: it keeps a
//! long-lived gRPC subscription alive, decodes the binary payloads of well-known
//! Solana programs, classifies transactions and persists the extracted records
//! through an idempotent storage trait.
//!
//! # Key Components
//!
//! *   [`subscription::SubscriptionManager`]: The connection lifecycle and reconnect
//!     state machine. It owns the stream and feeds every update to the dispatcher.
//! *   [`dispatcher::Dispatcher`]: Routes each [`update::UpdateEnvelope`] to its handler,
//!     runs the classifier and writes the derived records through [`storage::Store`].
//! *   [`registry::ProgramRegistry`] and [`decoder`]: Total decode functions for the
//!     System, Memo and SPL Token program layouts.
//! *   [`classifier`]: Pure predicates over a decoded transaction.
//! *   [`geyser::GeyserSource`]: The tonic-based transport for the Geyser `Subscribe` RPC.

/// Defines configuration structures for the connector.
pub mod config;
/// Predicates and extractors over transaction updates.
pub mod classifier;
/// Total decode functions for known program layouts.
pub mod decoder;
/// Routes update envelopes to their handlers.
pub mod dispatcher;
/// Typed errors for the streaming layer.
pub mod error;
/// Named filter groups sent to the upstream service and their presets.
pub mod filters;
/// The Yellowstone gRPC transport.
pub mod geyser;
/// Well-known program identifiers.
pub mod programs;
/// Persisted record shapes.
pub mod records;
/// Program id to decoder lookup.
pub mod registry;
/// A trait for the idempotent persistence gateway, plus an in-memory implementation.
pub mod storage;
/// The subscription lifecycle and reconnect state machine.
pub mod subscription;
/// Connector-side representation of upstream update messages.
pub mod update;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
