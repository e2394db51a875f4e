//! Partition/route state tracker driven by discovery events.

use crate::discovery::{DiscoveredEndpoint, Direction, InstanceHandle, ParticipantDirectory};
use crate::filtering::{DiscoveryFilter, FilterChain};
use crate::observer::dispatcher::{ListenerDispatcher, RouteEvent, DEFAULT_EVENT_QUEUE_SIZE};
use crate::observer::listener::RouteLifecycleListener;
use crate::observer::session::{Session, TopicRoute};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

const COMPONENT: &str = "partition_observer";

type RouteHandles = HashMap<TopicRoute, Vec<InstanceHandle>>;
type Mapping = HashMap<Session, RouteHandles>;

/// Derives the session/route mapping from discovered and lost endpoints and
/// notifies listeners of create/delete transitions.
///
/// The mapping is process-resident only; it is rebuilt by replaying current
/// discovery after a restart. Handle sets have multiset semantics so
/// duplicate discovered or lost deliveries never produce spurious
/// transitions.
pub struct PartitionObserver {
    directory: Arc<dyn ParticipantDirectory>,
    filters: FilterChain,
    mapping: Mutex<Mapping>,
    dispatcher: ListenerDispatcher,
}

impl PartitionObserver {
    pub fn new(directory: Arc<dyn ParticipantDirectory>) -> Self {
        Self::with_queue_size(directory, DEFAULT_EVENT_QUEUE_SIZE)
    }

    pub fn with_queue_size(directory: Arc<dyn ParticipantDirectory>, queue_size: usize) -> Self {
        Self {
            directory,
            filters: FilterChain::new(),
            mapping: Mutex::new(HashMap::new()),
            dispatcher: ListenerDispatcher::new(queue_size),
        }
    }

    pub fn add_filter(&self, filter: Arc<dyn DiscoveryFilter>) {
        self.filters.add(filter);
    }

    pub fn add_listener(&self, listener: Arc<dyn RouteLifecycleListener>) {
        self.dispatcher.add_listener(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn RouteLifecycleListener>) {
        self.dispatcher.remove_listener(listener);
    }

    /// Stops the dispatcher worker. Queued notifications are abandoned.
    pub fn close(&self) {
        self.dispatcher.close();
    }

    pub fn publication_discovered(&self, handle: InstanceHandle, data: &DiscoveredEndpoint) {
        if self
            .filters
            .ignore_publication(self.directory.as_ref(), handle, data)
        {
            return;
        }
        self.handle_discovered(handle, Direction::Out, data);
    }

    pub fn publication_lost(&self, handle: InstanceHandle, data: &DiscoveredEndpoint) {
        if self
            .filters
            .ignore_publication(self.directory.as_ref(), handle, data)
        {
            return;
        }
        self.handle_lost(handle, Direction::Out, data);
    }

    pub fn subscription_discovered(&self, handle: InstanceHandle, data: &DiscoveredEndpoint) {
        if self
            .filters
            .ignore_subscription(self.directory.as_ref(), handle, data)
        {
            return;
        }
        self.handle_discovered(handle, Direction::In, data);
    }

    pub fn subscription_lost(&self, handle: InstanceHandle, data: &DiscoveredEndpoint) {
        if self
            .filters
            .ignore_subscription(self.directory.as_ref(), handle, data)
        {
            return;
        }
        self.handle_lost(handle, Direction::In, data);
    }

    /// Sessions currently present in the mapping.
    pub fn sessions(&self) -> Vec<Session> {
        self.mapping
            .lock()
            .expect("mapping poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Routes currently present under a session.
    pub fn topic_routes(&self, session: &Session) -> Vec<TopicRoute> {
        self.mapping
            .lock()
            .expect("mapping poisoned")
            .get(session)
            .map(|routes| routes.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of handle occurrences backing a route.
    pub fn handle_count(&self, session: &Session, topic_route: &TopicRoute) -> usize {
        self.mapping
            .lock()
            .expect("mapping poisoned")
            .get(session)
            .and_then(|routes| routes.get(topic_route))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Lifecycle events dropped on dispatcher queue overflow.
    pub fn dropped_events(&self) -> u64 {
        self.dispatcher.dropped_events()
    }

    fn handle_discovered(&self, handle: InstanceHandle, direction: Direction, data: &DiscoveredEndpoint) {
        let mut mapping = self.mapping.lock().expect("mapping poisoned");

        if data.partitions.is_empty() {
            if self.filters.ignore_partition(&data.topic_name, "") {
                return;
            }
            self.insert_handle(
                &mut mapping,
                handle,
                Session::new(&data.topic_name, ""),
                TopicRoute::new(direction, &data.topic_name, &data.type_name),
            );
        } else {
            for partition in &data.partitions {
                if self.filters.ignore_partition(&data.topic_name, partition) {
                    continue;
                }
                self.insert_handle(
                    &mut mapping,
                    handle,
                    Session::new(&data.topic_name, partition),
                    TopicRoute::new(direction, &data.topic_name, &data.type_name),
                );
            }
        }
    }

    fn handle_lost(&self, handle: InstanceHandle, direction: Direction, data: &DiscoveredEndpoint) {
        let mut mapping = self.mapping.lock().expect("mapping poisoned");

        if data.partitions.is_empty() {
            if self.filters.ignore_partition(&data.topic_name, "") {
                return;
            }
            self.remove_handle(
                &mut mapping,
                handle,
                Session::new(&data.topic_name, ""),
                TopicRoute::new(direction, &data.topic_name, &data.type_name),
            );
        } else {
            for partition in &data.partitions {
                // A filtered partition is skipped, never used to abort the
                // remaining partitions of the same endpoint.
                if self.filters.ignore_partition(&data.topic_name, partition) {
                    continue;
                }
                self.remove_handle(
                    &mut mapping,
                    handle,
                    Session::new(&data.topic_name, partition),
                    TopicRoute::new(direction, &data.topic_name, &data.type_name),
                );
            }
        }
    }

    fn insert_handle(
        &self,
        mapping: &mut Mapping,
        handle: InstanceHandle,
        session: Session,
        topic_route: TopicRoute,
    ) {
        let routes = match mapping.entry(session.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                debug!(
                    component = COMPONENT,
                    topic = %session.topic,
                    partition = %session.partition,
                    "session created"
                );
                self.dispatcher
                    .enqueue(RouteEvent::CreateSession(session.clone()));
                vacant.insert(HashMap::new())
            }
        };

        let handles = match routes.entry(topic_route.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                debug!(
                    component = COMPONENT,
                    topic = %session.topic,
                    partition = %session.partition,
                    type_name = %topic_route.type_name,
                    direction = %topic_route.direction,
                    "topic route created"
                );
                self.dispatcher
                    .enqueue(RouteEvent::CreateTopicRoute(session.clone(), topic_route.clone()));
                vacant.insert(Vec::new())
            }
        };

        handles.push(handle);
    }

    fn remove_handle(
        &self,
        mapping: &mut Mapping,
        handle: InstanceHandle,
        session: Session,
        topic_route: TopicRoute,
    ) {
        // Lost events for unknown sessions, routes or handles absorb
        // duplicate-lost deliveries as no-ops.
        let route_removed = {
            let Some(routes) = mapping.get_mut(&session) else {
                return;
            };
            let Some(handles) = routes.get_mut(&topic_route) else {
                return;
            };
            let Some(position) = handles.iter().position(|known| *known == handle) else {
                return;
            };
            handles.swap_remove(position);

            if handles.is_empty() {
                routes.remove(&topic_route);
                true
            } else {
                false
            }
        };

        if !route_removed {
            return;
        }

        debug!(
            component = COMPONENT,
            topic = %session.topic,
            partition = %session.partition,
            type_name = %topic_route.type_name,
            direction = %topic_route.direction,
            "topic route deleted"
        );
        self.dispatcher
            .enqueue(RouteEvent::DeleteTopicRoute(session.clone(), topic_route));

        let session_empty = mapping
            .get(&session)
            .map(RouteHandles::is_empty)
            .unwrap_or(false);
        if session_empty {
            mapping.remove(&session);
            debug!(
                component = COMPONENT,
                topic = %session.topic,
                partition = %session.partition,
                "session deleted"
            );
            self.dispatcher.enqueue(RouteEvent::DeleteSession(session));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PartitionObserver;
    use crate::discovery::{
        DiscoveredEndpoint, Direction, InstanceHandle, ParticipantDirectory, ParticipantInfo,
        ParticipantKey,
    };
    use crate::filtering::{VendorTopicFilter, WildcardPartitionFilter};
    use crate::observer::listener::RouteLifecycleListener;
    use crate::observer::session::{Session, TopicRoute};
    use std::sync::mpsc as std_mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct EmptyDirectory;

    impl ParticipantDirectory for EmptyDirectory {
        fn participant_info(&self, _key: &ParticipantKey) -> Option<ParticipantInfo> {
            None
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Observed {
        CreateSession(Session),
        DeleteSession(Session),
        CreateRoute(Session, TopicRoute),
        DeleteRoute(Session, TopicRoute),
    }

    struct RecordingListener {
        sender: Mutex<std_mpsc::Sender<Observed>>,
    }

    impl RecordingListener {
        fn channel() -> (Arc<Self>, std_mpsc::Receiver<Observed>) {
            let (sender, receiver) = std_mpsc::channel();
            (
                Arc::new(Self {
                    sender: Mutex::new(sender),
                }),
                receiver,
            )
        }
    }

    impl RouteLifecycleListener for RecordingListener {
        fn create_session(&self, session: &Session) {
            let _ = self
                .sender
                .lock()
                .expect("lock sender")
                .send(Observed::CreateSession(session.clone()));
        }

        fn delete_session(&self, session: &Session) {
            let _ = self
                .sender
                .lock()
                .expect("lock sender")
                .send(Observed::DeleteSession(session.clone()));
        }

        fn create_topic_route(&self, session: &Session, topic_route: &TopicRoute) {
            let _ = self
                .sender
                .lock()
                .expect("lock sender")
                .send(Observed::CreateRoute(session.clone(), topic_route.clone()));
        }

        fn delete_topic_route(&self, session: &Session, topic_route: &TopicRoute) {
            let _ = self
                .sender
                .lock()
                .expect("lock sender")
                .send(Observed::DeleteRoute(session.clone(), topic_route.clone()));
        }
    }

    fn observer_with_listener() -> (PartitionObserver, std_mpsc::Receiver<Observed>) {
        let observer = PartitionObserver::new(Arc::new(EmptyDirectory));
        let (listener, receiver) = RecordingListener::channel();
        observer.add_listener(listener);
        (observer, receiver)
    }

    fn endpoint(topic: &str, type_name: &str, partitions: &[&str]) -> DiscoveredEndpoint {
        DiscoveredEndpoint::new(topic, type_name, partitions, ParticipantKey::new(1))
    }

    fn next(receiver: &std_mpsc::Receiver<Observed>) -> Observed {
        receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("listener event")
    }

    fn assert_no_more(receiver: &std_mpsc::Receiver<Observed>) {
        assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn single_publication_single_partition() {
        let (observer, receiver) = observer_with_listener();
        let session = Session::new("Square", "A");
        let route = TopicRoute::new(Direction::Out, "Square", "ShapeType");

        observer
            .publication_discovered(InstanceHandle::new(1), &endpoint("Square", "ShapeType", &["A"]));

        assert_eq!(next(&receiver), Observed::CreateSession(session.clone()));
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(session.clone(), route.clone())
        );
        assert_no_more(&receiver);

        assert_eq!(observer.sessions(), vec![session.clone()]);
        assert_eq!(observer.topic_routes(&session), vec![route.clone()]);
        assert_eq!(observer.handle_count(&session, &route), 1);

        observer.close();
    }

    #[test]
    fn publication_and_subscription_share_a_session() {
        let (observer, receiver) = observer_with_listener();
        let session = Session::new("Square", "A");

        observer
            .publication_discovered(InstanceHandle::new(1), &endpoint("Square", "ShapeType", &["A"]));
        observer
            .subscription_discovered(InstanceHandle::new(2), &endpoint("Square", "ShapeType", &["A"]));

        assert_eq!(next(&receiver), Observed::CreateSession(session.clone()));
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                session.clone(),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                session.clone(),
                TopicRoute::new(Direction::In, "Square", "ShapeType")
            )
        );
        assert_no_more(&receiver);

        observer.close();
    }

    #[test]
    fn empty_partition_list_synthesises_default_partition() {
        let (observer, receiver) = observer_with_listener();
        let session = Session::new("T", "");

        observer.subscription_discovered(InstanceHandle::new(1), &endpoint("T", "X", &[]));

        assert_eq!(next(&receiver), Observed::CreateSession(session.clone()));
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(session, TopicRoute::new(Direction::In, "T", "X"))
        );

        observer.close();
    }

    #[test]
    fn multi_partition_endpoint_creates_one_session_per_partition() {
        let (observer, receiver) = observer_with_listener();

        observer
            .publication_discovered(InstanceHandle::new(1), &endpoint("Square", "ShapeType", &["A", "B"]));

        assert_eq!(
            next(&receiver),
            Observed::CreateSession(Session::new("Square", "A"))
        );
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                Session::new("Square", "A"),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );
        assert_eq!(
            next(&receiver),
            Observed::CreateSession(Session::new("Square", "B"))
        );
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                Session::new("Square", "B"),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );

        observer.close();
    }

    #[test]
    fn filtered_topic_produces_no_state_or_events() {
        let (observer, receiver) = observer_with_listener();
        observer.add_filter(Arc::new(VendorTopicFilter::new()));

        observer
            .publication_discovered(InstanceHandle::new(1), &endpoint("rtiInternal", "X", &["A"]));

        assert_no_more(&receiver);
        assert!(observer.sessions().is_empty());

        observer.close();
    }

    #[test]
    fn duplicate_discovery_is_idempotent_for_events() {
        let (observer, receiver) = observer_with_listener();
        let session = Session::new("Square", "A");
        let route = TopicRoute::new(Direction::Out, "Square", "ShapeType");
        let data = endpoint("Square", "ShapeType", &["A"]);

        observer.publication_discovered(InstanceHandle::new(1), &data);
        observer.publication_discovered(InstanceHandle::new(1), &data);

        assert_eq!(next(&receiver), Observed::CreateSession(session.clone()));
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(session.clone(), route.clone())
        );
        assert_no_more(&receiver);
        // Multiset semantics: the duplicate is recorded, not collapsed.
        assert_eq!(observer.handle_count(&session, &route), 2);

        observer.close();
    }

    #[test]
    fn second_handle_keeps_route_alive_until_both_lost() {
        let (observer, receiver) = observer_with_listener();
        let session = Session::new("Square", "A");
        let route = TopicRoute::new(Direction::Out, "Square", "ShapeType");
        let data = endpoint("Square", "ShapeType", &["A"]);

        observer.publication_discovered(InstanceHandle::new(1), &data);
        observer.publication_discovered(InstanceHandle::new(2), &data);
        observer.publication_lost(InstanceHandle::new(1), &data);

        assert_eq!(next(&receiver), Observed::CreateSession(session.clone()));
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(session.clone(), route.clone())
        );
        assert_no_more(&receiver);
        assert_eq!(observer.handle_count(&session, &route), 1);

        observer.publication_lost(InstanceHandle::new(2), &data);

        assert_eq!(
            next(&receiver),
            Observed::DeleteRoute(session.clone(), route)
        );
        assert_eq!(next(&receiver), Observed::DeleteSession(session));

        observer.close();
    }

    #[test]
    fn round_trip_emits_matched_pairs_in_order() {
        let (observer, receiver) = observer_with_listener();
        let session = Session::new("Square", "A");
        let route = TopicRoute::new(Direction::Out, "Square", "ShapeType");
        let data = endpoint("Square", "ShapeType", &["A"]);

        observer.publication_discovered(InstanceHandle::new(1), &data);
        observer.publication_lost(InstanceHandle::new(1), &data);

        assert_eq!(next(&receiver), Observed::CreateSession(session.clone()));
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(session.clone(), route.clone())
        );
        assert_eq!(
            next(&receiver),
            Observed::DeleteRoute(session.clone(), route)
        );
        assert_eq!(next(&receiver), Observed::DeleteSession(session));
        assert_no_more(&receiver);
        assert!(observer.sessions().is_empty());

        observer.close();
    }

    #[test]
    fn duplicate_lost_is_a_silent_no_op() {
        let (observer, receiver) = observer_with_listener();
        let data = endpoint("Square", "ShapeType", &["A"]);

        observer.publication_discovered(InstanceHandle::new(1), &data);
        observer.publication_lost(InstanceHandle::new(1), &data);
        observer.publication_lost(InstanceHandle::new(1), &data);

        assert_eq!(
            next(&receiver),
            Observed::CreateSession(Session::new("Square", "A"))
        );
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                Session::new("Square", "A"),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );
        assert_eq!(
            next(&receiver),
            Observed::DeleteRoute(
                Session::new("Square", "A"),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );
        assert_eq!(
            next(&receiver),
            Observed::DeleteSession(Session::new("Square", "A"))
        );
        assert_no_more(&receiver);

        observer.close();
    }

    #[test]
    fn lost_for_unknown_session_is_tolerated() {
        let (observer, receiver) = observer_with_listener();

        observer.publication_lost(InstanceHandle::new(9), &endpoint("Square", "ShapeType", &["A"]));

        assert_no_more(&receiver);

        observer.close();
    }

    #[test]
    fn filtered_partition_is_skipped_not_short_circuited_on_lost() {
        let (observer, receiver) = observer_with_listener();
        observer.add_filter(Arc::new(WildcardPartitionFilter::new()));
        let data = endpoint("Square", "ShapeType", &["*", "B"]);

        // Discovery materialises only the concrete partition.
        observer.publication_discovered(InstanceHandle::new(1), &data);
        assert_eq!(
            next(&receiver),
            Observed::CreateSession(Session::new("Square", "B"))
        );
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                Session::new("Square", "B"),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );

        // The wildcard entry must not stop "B" from being cleaned up.
        observer.publication_lost(InstanceHandle::new(1), &data);
        assert_eq!(
            next(&receiver),
            Observed::DeleteRoute(
                Session::new("Square", "B"),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );
        assert_eq!(
            next(&receiver),
            Observed::DeleteSession(Session::new("Square", "B"))
        );
        assert!(observer.sessions().is_empty());

        observer.close();
    }

    #[test]
    fn routes_differing_in_type_are_tracked_separately() {
        let (observer, receiver) = observer_with_listener();
        let session = Session::new("Square", "A");

        observer
            .publication_discovered(InstanceHandle::new(1), &endpoint("Square", "ShapeType", &["A"]));
        observer.publication_discovered(
            InstanceHandle::new(2),
            &endpoint("Square", "ShapeTypeExtended", &["A"]),
        );

        assert_eq!(next(&receiver), Observed::CreateSession(session.clone()));
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                session.clone(),
                TopicRoute::new(Direction::Out, "Square", "ShapeType")
            )
        );
        assert_eq!(
            next(&receiver),
            Observed::CreateRoute(
                session.clone(),
                TopicRoute::new(Direction::Out, "Square", "ShapeTypeExtended")
            )
        );
        assert_eq!(observer.topic_routes(&session).len(), 2);

        observer.close();
    }
}
