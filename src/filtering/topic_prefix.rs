//! Vendor-internal topic suppression.

use crate::discovery::{DiscoveredEndpoint, InstanceHandle, ParticipantDirectory};
use crate::filtering::DiscoveryFilter;

const VENDOR_TOPIC_PREFIX: &str = "rti";

/// Ignores topics whose name carries the vendor-internal prefix.
pub struct VendorTopicFilter;

impl VendorTopicFilter {
    pub fn new() -> Self {
        Self
    }

    fn ignore(&self, topic_name: &str) -> bool {
        topic_name.starts_with(VENDOR_TOPIC_PREFIX)
    }
}

impl Default for VendorTopicFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryFilter for VendorTopicFilter {
    fn ignore_publication(
        &self,
        _directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        self.ignore(&data.topic_name)
    }

    fn ignore_subscription(
        &self,
        _directory: &dyn ParticipantDirectory,
        _handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        self.ignore(&data.topic_name)
    }

    fn ignore_partition(&self, _partition: &str) -> bool {
        false
    }
}
