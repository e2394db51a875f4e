//! Discovery filter seam and ordered short-circuit filter chain.

mod forwarder_entities;
mod topic_prefix;
mod wildcard_partition;

pub use forwarder_entities::{ForwarderEntitiesFilter, ForwarderGroupFilter, GROUP_NAME_PROPERTY};
pub use topic_prefix::VendorTopicFilter;
pub use wildcard_partition::WildcardPartitionFilter;

use crate::config::{ConfigError, FilterKind};
use crate::discovery::{DiscoveredEndpoint, InstanceHandle, ParticipantDirectory};
use std::sync::{Arc, Mutex};
use tracing::debug;

const COMPONENT: &str = "filter_chain";

/// Predicate set consulted before a discovery event reaches the tracker.
///
/// Any `true` suppresses the event (or the single partition, for
/// [`DiscoveryFilter::ignore_partition`]).
pub trait DiscoveryFilter: Send + Sync {
    fn ignore_publication(
        &self,
        directory: &dyn ParticipantDirectory,
        handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool;

    fn ignore_subscription(
        &self,
        directory: &dyn ParticipantDirectory,
        handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool;

    fn ignore_partition(&self, partition: &str) -> bool;
}

/// Ordered list of filters, OR-combined with short-circuit evaluation.
///
/// Evaluation runs over a snapshot so filters may be registered while
/// discovery callbacks are in flight.
pub struct FilterChain {
    filters: Mutex<Vec<Arc<dyn DiscoveryFilter>>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, filter: Arc<dyn DiscoveryFilter>) {
        let mut filters = self.filters.lock().expect("filter list poisoned");
        if !filters.iter().any(|known| Arc::ptr_eq(known, &filter)) {
            filters.push(filter);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn DiscoveryFilter>> {
        self.filters.lock().expect("filter list poisoned").clone()
    }

    pub fn ignore_publication(
        &self,
        directory: &dyn ParticipantDirectory,
        handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        for filter in self.snapshot() {
            if filter.ignore_publication(directory, handle, data) {
                debug!(
                    component = COMPONENT,
                    topic = %data.topic_name,
                    type_name = %data.type_name,
                    handle = ?handle,
                    "publication ignored"
                );
                return true;
            }
        }
        false
    }

    pub fn ignore_subscription(
        &self,
        directory: &dyn ParticipantDirectory,
        handle: InstanceHandle,
        data: &DiscoveredEndpoint,
    ) -> bool {
        for filter in self.snapshot() {
            if filter.ignore_subscription(directory, handle, data) {
                debug!(
                    component = COMPONENT,
                    topic = %data.topic_name,
                    type_name = %data.type_name,
                    handle = ?handle,
                    "subscription ignored"
                );
                return true;
            }
        }
        false
    }

    pub fn ignore_partition(&self, topic_name: &str, partition: &str) -> bool {
        for filter in self.snapshot() {
            if filter.ignore_partition(partition) {
                debug!(
                    component = COMPONENT,
                    topic = %topic_name,
                    partition = %partition,
                    "partition ignored"
                );
                return true;
            }
        }
        false
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the ordered filter set named by a controller configuration.
pub fn build_filters(
    kinds: &[FilterKind],
    group_name: Option<&str>,
) -> Result<Vec<Arc<dyn DiscoveryFilter>>, ConfigError> {
    let mut filters: Vec<Arc<dyn DiscoveryFilter>> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        match kind {
            FilterKind::VendorTopics => filters.push(Arc::new(VendorTopicFilter::new())),
            FilterKind::ForwarderEntities => filters.push(Arc::new(ForwarderEntitiesFilter::new())),
            FilterKind::ForwarderGroup => {
                let group_name = group_name.ok_or_else(|| {
                    ConfigError::Invalid(
                        "filter 'forwarder-group' requires group_name".to_string(),
                    )
                })?;
                filters.push(Arc::new(ForwarderGroupFilter::new(group_name)));
            }
            FilterKind::WildcardPartitions => {
                filters.push(Arc::new(WildcardPartitionFilter::new()))
            }
        }
    }
    Ok(filters)
}
