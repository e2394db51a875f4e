//! Session and topic-route identity types for the state tracker.

use crate::discovery::Direction;

/// A logical grouping of routes sharing a `(topic, partition)` pair,
/// realised as a named entity in the target forwarder.
///
/// The empty partition string is legal and denotes "no partition advertised".
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Session {
    pub topic: String,
    pub partition: String,
}

impl Session {
    pub fn new(topic: &str, partition: &str) -> Self {
        Self {
            topic: topic.to_string(),
            partition: partition.to_string(),
        }
    }
}

/// A unidirectional forwarding relation for `(direction, topic, type)`
/// within a session.
///
/// Two routes differing only in `type_name` are distinct; in practice the
/// type is constant per topic but the model does not assume it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicRoute {
    pub direction: Direction,
    pub topic: String,
    pub type_name: String,
}

impl TopicRoute {
    pub fn new(direction: Direction, topic: &str, type_name: &str) -> Self {
        Self {
            direction,
            topic: topic.to_string(),
            type_name: type_name.to_string(),
        }
    }
}
