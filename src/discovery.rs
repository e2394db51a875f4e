//! Inbound discovery data model consumed by the tracker and filters.

use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Forwarding direction of a route, seen from the target forwarder.
///
/// A discovered remote publication needs data routed *out* of the local
/// domain; a discovered remote subscription needs data routed *in*.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

/// Opaque identifier of a remote endpoint instance, unique per discovery
/// source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceHandle(u128);

impl InstanceHandle {
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }
}

impl From<u128> for InstanceHandle {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

/// Opaque key of the participant owning a discovered endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticipantKey(u128);

impl ParticipantKey {
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }
}

impl From<u128> for ParticipantKey {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

/// Service kind advertised by a participant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceKind {
    #[default]
    NoService,
    RoutingService,
    PersistenceService,
    RecordingService,
}

/// Participant metadata surfaced to filters.
#[derive(Clone, Debug, Default)]
pub struct ParticipantInfo {
    pub service_kind: ServiceKind,
    pub properties: HashMap<String, String>,
}

impl ParticipantInfo {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Lookup of participant metadata by key.
///
/// Returns `None` while the participant is not yet fully discovered; filters
/// treat that as "don't ignore" so events are processed conservatively.
pub trait ParticipantDirectory: Send + Sync {
    fn participant_info(&self, key: &ParticipantKey) -> Option<ParticipantInfo>;
}

/// Built-in topic fields of a discovered publication or subscription.
#[derive(Clone, Debug)]
pub struct DiscoveredEndpoint {
    pub topic_name: String,
    pub type_name: String,
    /// Advertised partitions; empty means "no partition advertised".
    pub partitions: Vec<String>,
    pub participant_key: ParticipantKey,
}

impl DiscoveredEndpoint {
    pub fn new(
        topic_name: &str,
        type_name: &str,
        partitions: &[&str],
        participant_key: ParticipantKey,
    ) -> Self {
        Self {
            topic_name: topic_name.to_string(),
            type_name: type_name.to_string(),
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
            participant_key,
        }
    }
}
