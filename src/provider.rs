//! Naming and XML configuration provider for sessions and topic routes.

use crate::discovery::Direction;
use crate::observer::{Session, TopicRoute};

/// Translates logical session/route identities into the entity names and
/// XML snippets the target forwarder understands.
///
/// All queries are pure: the same inputs always yield the same outputs.
/// Swapping the provider changes the deployment shape without touching the
/// tracker or the commander.
pub trait ConfigurationProvider: Send + Sync {
    /// Name of the forwarder entity under which a session is created.
    fn session_parent(&self, session: &Session) -> String;

    /// Fully-qualified session entity name, used for deletion and as the
    /// parent of the session's routes.
    fn session_entity_name(&self, session: &Session) -> String;

    /// Fully-qualified route entity name, used for deletion.
    fn topic_route_entity_name(&self, session: &Session, topic_route: &TopicRoute) -> String;

    /// XML snippet creating the session.
    fn session_configuration(&self, session: &Session) -> String;

    /// XML snippet creating the route inside its session.
    fn topic_route_configuration(&self, session: &Session, topic_route: &TopicRoute) -> String;
}

/// Default provider mapping sessions onto a single XML domain route.
///
/// Sessions are named `topic(partition)` under the configured domain route;
/// entity hierarchy levels are joined with `::`. Topic routes wire the
/// domain route's two participants according to direction: `Out` forwards
/// from the first participant to the second, `In` the reverse.
pub struct DomainRouteProvider {
    domain_route: String,
}

impl DomainRouteProvider {
    pub fn new(domain_route: &str) -> Self {
        Self {
            domain_route: domain_route.to_string(),
        }
    }

    fn session_name(session: &Session) -> String {
        format!("{}({})", session.topic, session.partition)
    }

    fn route_name(topic_route: &TopicRoute) -> String {
        match topic_route.direction {
            Direction::Out => format!("{}-out", topic_route.topic),
            Direction::In => format!("{}-in", topic_route.topic),
        }
    }

    fn participants(direction: Direction) -> (u8, u8) {
        match direction {
            Direction::Out => (1, 2),
            Direction::In => (2, 1),
        }
    }
}

impl ConfigurationProvider for DomainRouteProvider {
    fn session_parent(&self, _session: &Session) -> String {
        self.domain_route.clone()
    }

    fn session_entity_name(&self, session: &Session) -> String {
        format!("{}::{}", self.domain_route, Self::session_name(session))
    }

    fn topic_route_entity_name(&self, session: &Session, topic_route: &TopicRoute) -> String {
        format!(
            "{}::{}",
            self.session_entity_name(session),
            Self::route_name(topic_route)
        )
    }

    fn session_configuration(&self, session: &Session) -> String {
        format!(
            "<session name=\"{name}\">\
             <publisher_qos><partition><name><element>{partition}</element></name></partition></publisher_qos>\
             <subscriber_qos><partition><name><element>{partition}</element></name></partition></subscriber_qos>\
             </session>",
            name = Self::session_name(session),
            partition = session.partition,
        )
    }

    fn topic_route_configuration(&self, session: &Session, topic_route: &TopicRoute) -> String {
        let (input_participant, output_participant) = Self::participants(topic_route.direction);
        format!(
            "<topic_route name=\"{name}\">\
             <input participant=\"{input}\">\
             <topic_name>{topic}</topic_name>\
             <registered_type_name>{type_name}</registered_type_name>\
             </input>\
             <output participant=\"{output}\">\
             <topic_name>{topic}</topic_name>\
             <registered_type_name>{type_name}</registered_type_name>\
             </output>\
             </topic_route>",
            name = Self::route_name(topic_route),
            input = input_participant,
            output = output_participant,
            topic = session.topic,
            type_name = topic_route.type_name,
        )
    }
}
