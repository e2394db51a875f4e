//! Listener seam for session/route lifecycle transitions.

use crate::observer::session::{Session, TopicRoute};

/// Receives the lifecycle transitions computed by the tracker.
///
/// Calls arrive on the tracker's dispatcher worker, one at a time, in the
/// exact order the state transitions occurred. For any session,
/// `create_session` precedes every route event and `delete_session` follows
/// the last route delete. Implementations must not block for long; a
/// panicking listener is contained and logged, and the dispatch loop
/// continues.
pub trait RouteLifecycleListener: Send + Sync {
    fn create_session(&self, session: &Session);

    fn delete_session(&self, session: &Session);

    fn create_topic_route(&self, session: &Session, topic_route: &TopicRoute);

    fn delete_topic_route(&self, session: &Session, topic_route: &TopicRoute);
}
