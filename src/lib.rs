//! # dynamic-routing
//!
//! `dynamic-routing` is a control-plane loop that watches a pub/sub
//! discovery stream, derives which `(topic, partition, direction)` routes
//! should exist between two domains, and commands a target routing service
//! over its admin interface until its configuration matches the observed
//! demand.
//!
//! The pipeline is: discovery events pass an ordered [`FilterChain`], the
//! [`PartitionObserver`] folds them into a session/route mapping and emits
//! create/delete transitions, and the [`PartitionCommander`] turns each
//! transition into an admin command that is retried until the target
//! acknowledges it or an inverse transition supersedes it.
//!
//! ```
//! use async_trait::async_trait;
//! use dynamic_routing::{
//!     AdminEndpoint, CommandRequest, CommandResponse, ControllerConfig, DiscoveredEndpoint,
//!     DomainRouteProvider, InstanceHandle, ParticipantDirectory, ParticipantInfo,
//!     ParticipantKey, PartitionCommander, PartitionObserver, VendorTopicFilter,
//! };
//! use std::sync::Arc;
//!
//! struct StaticDirectory;
//!
//! impl ParticipantDirectory for StaticDirectory {
//!     fn participant_info(&self, _key: &ParticipantKey) -> Option<ParticipantInfo> {
//!         None
//!     }
//! }
//!
//! struct AcceptingEndpoint;
//!
//! #[async_trait]
//! impl AdminEndpoint for AcceptingEndpoint {
//!     async fn send_request(&self, _request: CommandRequest) -> Option<CommandResponse> {
//!         Some(CommandResponse::ok())
//!     }
//! }
//!
//! let observer = PartitionObserver::new(Arc::new(StaticDirectory));
//! observer.add_filter(Arc::new(VendorTopicFilter::new()));
//!
//! let commander = Arc::new(
//!     PartitionCommander::new(
//!         Arc::new(AcceptingEndpoint),
//!         Arc::new(DomainRouteProvider::new("DomainRoute")),
//!         &ControllerConfig::new("downstream-forwarder"),
//!     )
//!     .unwrap(),
//! );
//! observer.add_listener(commander.clone());
//!
//! observer.publication_discovered(
//!     InstanceHandle::new(1),
//!     &DiscoveredEndpoint::new("Square", "ShapeType", &["A"], ParticipantKey::new(7)),
//! );
//! assert_eq!(observer.sessions().len(), 1);
//!
//! observer.close();
//! commander.close();
//! ```
//!
//! ## Internal architecture map
//!
//! - Discovery: inbound event schema and the participant metadata seam
//! - Filtering: ordered short-circuit suppression of discovery events
//! - Observer: session/route state tracking and ordered listener dispatch
//! - Commander: per-identity retry schedules over one admin send slot
//! - Admin: typed command schema and the request/reply transport seam
//! - Provider: naming and XML policy for sessions and routes
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events. Library code emits events and
//! does not initialize a global subscriber. Binaries and tests are
//! responsible for one-time `tracing_subscriber` initialization at process
//! boundaries.

pub mod admin;
mod commander;
pub mod config;
pub mod discovery;
pub mod filtering;
mod observer;
mod provider;
mod runtime;

pub use admin::{
    AdminEndpoint, Command, CommandKind, CommandRequest, CommandResponse, CommandResponseKind,
    EntityDescription, XmlUrl, XML_URL_MAX_LENGTH,
};
pub use commander::PartitionCommander;
pub use config::{ConfigError, ControllerConfig, FilterKind};
pub use discovery::{
    DiscoveredEndpoint, Direction, InstanceHandle, ParticipantDirectory, ParticipantInfo,
    ParticipantKey, ServiceKind,
};
pub use filtering::{
    build_filters, DiscoveryFilter, FilterChain, ForwarderEntitiesFilter, ForwarderGroupFilter,
    VendorTopicFilter, WildcardPartitionFilter, GROUP_NAME_PROPERTY,
};
pub use observer::{PartitionObserver, RouteLifecycleListener, Session, TopicRoute};
pub use provider::{ConfigurationProvider, DomainRouteProvider};
