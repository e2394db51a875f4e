//! Filters that keep the controller from routing forwarder traffic back
//! into itself.

use crate::discovery::{
    DiscoveredEndpoint, InstanceHandle, ParticipantDirectory, ParticipantKey, ServiceKind,
};
use crate::filtering::DiscoveryFilter;
use std::collections::HashMap;
use std::sync::Mutex;

/// Participant property carrying the forwarder group name.
pub const GROUP_NAME_PROPERTY: &str = "rti.routing_service.group_name";

/// Ignores endpoints owned by any routing-service participant.
///
/// Verdicts are cached per participant key; participants are low-cardinality
/// and long-lived, so the cache never evicts. A participant that is not yet
/// fully discovered is not ignored.
pub struct ForwarderEntitiesFilter {
    verdicts: Mutex<HashMap<ParticipantKey, bool>>,
}

impl ForwarderEntitiesFilter {
    pub fn new() -> Self {
        Self {
            verdicts: Mutex::new(HashMap::new()),
        }
    }

    fn is_forwarder_entity(
        &self,
        directory: &dyn ParticipantDirectory,
        key: &ParticipantKey,
    ) -> bool {
        if let Some(verdict) = self.verdicts.lock().expect("verdict cache poisoned").get(key) {
            return *verdict;
        }

        let Some(info) = directory.participant_info(key) else {
            // not yet fully discovered; leave uncached so a later lookup can settle it
            return false;
        };

        let verdict = info.service_kind == ServiceKind::RoutingService;
        self.verdicts
            .lock()
            .expect("verdict cache poisoned")
            .insert(*key, verdict);
        verdict
    }
}

impl Default for ForwarderEntitiesFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryFilter for ForwarderEntitiesFilter {
    fn ignore_publication(
        &self,
        directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        self.is_forwarder_entity(directory, &data.participant_key)
    }

    fn ignore_subscription(
        &self,
        directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        self.is_forwarder_entity(directory, &data.participant_key)
    }

    fn ignore_partition(&self, _partition: &str) -> bool {
        false
    }
}

/// Ignores endpoints of routing-service participants belonging to the
/// configured forwarder group.
///
/// Used instead of [`ForwarderEntitiesFilter`] when coexisting with peer
/// forwarders whose traffic should still be routed.
pub struct ForwarderGroupFilter {
    group_name: String,
}

impl ForwarderGroupFilter {
    pub fn new(group_name: &str) -> Self {
        Self {
            group_name: group_name.to_string(),
        }
    }

    fn is_group_member(&self, directory: &dyn ParticipantDirectory, key: &ParticipantKey) -> bool {
        match directory.participant_info(key) {
            Some(info) => info.property(GROUP_NAME_PROPERTY) == Some(self.group_name.as_str()),
            None => false,
        }
    }
}

impl DiscoveryFilter for ForwarderGroupFilter {
    fn ignore_publication(
        &self,
        directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        self.is_group_member(directory, &data.participant_key)
    }

    fn ignore_subscription(
        &self,
        directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        self.is_group_member(directory, &data.participant_key)
    }

    fn ignore_partition(&self, _partition: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{ForwarderEntitiesFilter, ForwarderGroupFilter, GROUP_NAME_PROPERTY};
    use crate::discovery::{
        DiscoveredEndpoint, InstanceHandle, ParticipantDirectory, ParticipantInfo, ParticipantKey,
        ServiceKind,
    };
    use crate::filtering::DiscoveryFilter;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingDirectory {
        participants: Mutex<HashMap<ParticipantKey, ParticipantInfo>>,
        lookups: AtomicUsize,
    }

    impl RecordingDirectory {
        fn new() -> Self {
            Self {
                participants: Mutex::new(HashMap::new()),
                lookups: AtomicUsize::new(0),
            }
        }

        fn insert(&self, key: ParticipantKey, info: ParticipantInfo) {
            self.participants
                .lock()
                .expect("lock participants")
                .insert(key, info);
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::Relaxed)
        }
    }

    impl ParticipantDirectory for RecordingDirectory {
        fn participant_info(&self, key: &ParticipantKey) -> Option<ParticipantInfo> {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            self.participants
                .lock()
                .expect("lock participants")
                .get(key)
                .cloned()
        }
    }

    fn forwarder_info() -> ParticipantInfo {
        ParticipantInfo {
            service_kind: ServiceKind::RoutingService,
            properties: HashMap::new(),
        }
    }

    fn group_info(group: &str) -> ParticipantInfo {
        ParticipantInfo {
            service_kind: ServiceKind::RoutingService,
            properties: HashMap::from([(GROUP_NAME_PROPERTY.to_string(), group.to_string())]),
        }
    }

    fn endpoint(key: ParticipantKey) -> DiscoveredEndpoint {
        DiscoveredEndpoint::new("Square", "ShapeType", &["A"], key)
    }

    #[test]
    fn forwarder_participants_are_ignored() {
        let directory = RecordingDirectory::new();
        let key = ParticipantKey::new(1);
        directory.insert(key, forwarder_info());
        let filter = ForwarderEntitiesFilter::new();

        assert!(filter.ignore_publication(&directory, InstanceHandle::new(1), &endpoint(key)));
        assert!(filter.ignore_subscription(&directory, InstanceHandle::new(1), &endpoint(key)));
    }

    #[test]
    fn ordinary_participants_are_processed() {
        let directory = RecordingDirectory::new();
        let key = ParticipantKey::new(2);
        directory.insert(key, ParticipantInfo::default());
        let filter = ForwarderEntitiesFilter::new();

        assert!(!filter.ignore_publication(&directory, InstanceHandle::new(1), &endpoint(key)));
    }

    #[test]
    fn unknown_participant_is_not_ignored() {
        let directory = RecordingDirectory::new();
        let filter = ForwarderEntitiesFilter::new();

        assert!(!filter.ignore_publication(
            &directory,
            InstanceHandle::new(1),
            &endpoint(ParticipantKey::new(3)),
        ));
    }

    #[test]
    fn verdicts_are_cached_per_participant() {
        let directory = RecordingDirectory::new();
        let key = ParticipantKey::new(4);
        directory.insert(key, forwarder_info());
        let filter = ForwarderEntitiesFilter::new();

        filter.ignore_publication(&directory, InstanceHandle::new(1), &endpoint(key));
        filter.ignore_subscription(&directory, InstanceHandle::new(2), &endpoint(key));

        assert_eq!(directory.lookups(), 1);
    }

    #[test]
    fn unresolved_participant_is_looked_up_again() {
        let directory = RecordingDirectory::new();
        let key = ParticipantKey::new(5);
        let filter = ForwarderEntitiesFilter::new();

        assert!(!filter.ignore_publication(&directory, InstanceHandle::new(1), &endpoint(key)));

        directory.insert(key, forwarder_info());
        assert!(filter.ignore_publication(&directory, InstanceHandle::new(1), &endpoint(key)));
    }

    #[test]
    fn group_filter_ignores_only_matching_group() {
        let directory = RecordingDirectory::new();
        let member = ParticipantKey::new(6);
        let peer = ParticipantKey::new(7);
        directory.insert(member, group_info("east"));
        directory.insert(peer, group_info("west"));
        let filter = ForwarderGroupFilter::new("east");

        assert!(filter.ignore_publication(&directory, InstanceHandle::new(1), &endpoint(member)));
        assert!(!filter.ignore_publication(&directory, InstanceHandle::new(2), &endpoint(peer)));
    }

    #[test]
    fn group_filter_processes_participants_without_property() {
        let directory = RecordingDirectory::new();
        let key = ParticipantKey::new(8);
        directory.insert(key, forwarder_info());
        let filter = ForwarderGroupFilter::new("east");

        assert!(!filter.ignore_subscription(&directory, InstanceHandle::new(1), &endpoint(key)));
    }

    #[test]
    fn partition_checks_never_ignore() {
        assert!(!ForwarderEntitiesFilter::new().ignore_partition("A"));
        assert!(!ForwarderGroupFilter::new("east").ignore_partition("A"));
    }
}
