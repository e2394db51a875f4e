//! Wildcard partition suppression.

use crate::discovery::{DiscoveredEndpoint, InstanceHandle, ParticipantDirectory};
use crate::filtering::DiscoveryFilter;

/// Ignores partitions containing pub/sub wildcard metacharacters.
///
/// A wildcard partition expression matches other partitions at runtime and
/// cannot be materialised as a concrete partition configuration in the
/// target forwarder.
pub struct WildcardPartitionFilter;

impl WildcardPartitionFilter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WildcardPartitionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryFilter for WildcardPartitionFilter {
    fn ignore_publication(
        &self,
        _directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        _data: &DiscoveredEndpoint,
    ) -> bool {
        false
    }

    fn ignore_subscription(
        &self,
        _directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        _data: &DiscoveredEndpoint,
    ) -> bool {
        false
    }

    fn ignore_partition(&self, partition: &str) -> bool {
        partition.contains('*') || partition.contains('?')
    }
}

#[cfg(test)]
mod tests {
    use super::WildcardPartitionFilter;
    use crate::filtering::DiscoveryFilter;

    #[test]
    fn wildcard_partitions_are_ignored() {
        let filter = WildcardPartitionFilter::new();

        assert!(filter.ignore_partition("*"));
        assert!(filter.ignore_partition("sensors/*"));
        assert!(filter.ignore_partition("room-?"));
    }

    #[test]
    fn concrete_partitions_pass() {
        let filter = WildcardPartitionFilter::new();

        assert!(!filter.ignore_partition("A"));
        assert!(!filter.ignore_partition(""));
        assert!(!filter.ignore_partition("sensors/floor-1"));
    }
}
