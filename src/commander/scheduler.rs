//! Command scheduler driving the target forwarder to the tracked state.

use crate::admin::{AdminEndpoint, CommandRequest, CommandResponse, CommandResponseKind};
use crate::commander::pending::{CommandKey, CommandOp, PendingCommands};
use crate::config::{ConfigError, ControllerConfig};
use crate::observer::{RouteLifecycleListener, Session, TopicRoute};
use crate::provider::ConfigurationProvider;
use crate::runtime::{run_until_shutdown, spawn_worker, Worker};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info};

const COMMANDER_THREAD_NAME: &str = "route-command";

enum SendOutcome {
    Success,
    Retry,
    Invalid,
}

/// Converts tracker lifecycle events into admin commands, retried at a fixed
/// delay until the target acknowledges them or an inverse request supersedes
/// them.
///
/// One single-threaded worker runs all retry schedules; a single in-flight
/// send slot serialises requests to the target. Per identity, the last
/// requested operation is the one that eventually reaches the target.
pub struct PartitionCommander {
    inner: Arc<CommanderInner>,
    worker: Worker,
}

struct CommanderInner {
    endpoint: Arc<dyn AdminEndpoint>,
    provider: Arc<dyn ConfigurationProvider>,
    target_routing_service: String,
    retry_delay: Duration,
    request_timeout: Duration,
    pending: PendingCommands,
    send_slot: tokio::sync::Mutex<()>,
}

impl PartitionCommander {
    pub fn new(
        endpoint: Arc<dyn AdminEndpoint>,
        provider: Arc<dyn ConfigurationProvider>,
        config: &ControllerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(CommanderInner {
                endpoint,
                provider,
                target_routing_service: config.target_routing_service.clone(),
                retry_delay: config.retry_delay(),
                request_timeout: config.request_timeout(),
                pending: PendingCommands::new(),
                send_slot: tokio::sync::Mutex::new(()),
            }),
            worker: spawn_worker(COMMANDER_THREAD_NAME, run_until_shutdown),
        })
    }

    /// Stops the scheduler worker. In-flight sends are abandoned.
    pub fn close(&self) {
        self.worker.stop();
    }

    /// Commands not yet acknowledged by the target.
    pub fn pending_commands(&self) -> usize {
        self.inner.pending.len()
    }

    fn submit(&self, key: CommandKey, op: CommandOp) {
        let epoch = self.inner.pending.begin(key.clone(), op);
        let inner = self.inner.clone();
        let _ = self
            .worker
            .handle()
            .spawn(retry_schedule(inner, key, op, epoch));
    }
}

impl RouteLifecycleListener for PartitionCommander {
    fn create_session(&self, session: &Session) {
        info!(
            "Create session: topic='{}', partition='{}'",
            session.topic, session.partition
        );
        self.submit(
            CommandKey::Session(session.clone()),
            CommandOp::CreateSession,
        );
    }

    fn delete_session(&self, session: &Session) {
        info!(
            "Delete session: topic='{}', partition='{}'",
            session.topic, session.partition
        );
        self.submit(
            CommandKey::Session(session.clone()),
            CommandOp::DeleteSession,
        );
    }

    fn create_topic_route(&self, session: &Session, topic_route: &TopicRoute) {
        info!(
            "Create route: topic='{}', type='{}', partition='{}', direction='{}'",
            session.topic, topic_route.type_name, session.partition, topic_route.direction
        );
        self.submit(
            CommandKey::Route(session.clone(), topic_route.clone()),
            CommandOp::CreateTopicRoute,
        );
    }

    fn delete_topic_route(&self, session: &Session, topic_route: &TopicRoute) {
        info!(
            "Delete route: topic='{}', type='{}', partition='{}', direction='{}'",
            session.topic, topic_route.type_name, session.partition, topic_route.direction
        );
        self.submit(
            CommandKey::Route(session.clone(), topic_route.clone()),
            CommandOp::DeleteTopicRoute,
        );
    }
}

/// Fires immediately, then after every failed attempt sleeps `retry_delay`
/// and tries again, for as long as the owning epoch is still current.
async fn retry_schedule(inner: Arc<CommanderInner>, key: CommandKey, op: CommandOp, epoch: u64) {
    loop {
        if !inner.pending.is_current(&key, epoch) {
            return;
        }

        let outcome = {
            let _slot = inner.send_slot.lock().await;
            // Re-check after waiting for the slot: an inverse request may
            // have superseded this schedule while another send was running.
            if !inner.pending.is_current(&key, epoch) {
                return;
            }
            inner.send_command(&key, op).await
        };

        match outcome {
            SendOutcome::Success => {
                inner.pending.complete_if_current(&key, epoch);
                return;
            }
            SendOutcome::Invalid => {
                // Configuration error: retrying cannot fix it. The table
                // entry stays so a later request for this identity still
                // supersedes it.
                return;
            }
            SendOutcome::Retry => {
                tokio::time::sleep(inner.retry_delay).await;
            }
        }
    }
}

impl CommanderInner {
    async fn send_command(&self, key: &CommandKey, op: CommandOp) -> SendOutcome {
        let context = describe(key, op);

        let request = match self.build_request(key, op) {
            Ok(request) => request,
            Err(err) => {
                error!("Invalid request {}, error='{}'", context, err);
                return SendOutcome::Invalid;
            }
        };

        let response = timeout(self.request_timeout, self.endpoint.send_request(request.clone()))
            .await
            .ok()
            .flatten();

        self.check_response(&request, response, &context)
    }

    fn build_request(&self, key: &CommandKey, op: CommandOp) -> Result<CommandRequest, ConfigError> {
        match key {
            CommandKey::Session(session) => {
                if op.is_create() {
                    CommandRequest::create(
                        &self.target_routing_service,
                        &self.provider.session_parent(session),
                        self.provider.session_configuration(session),
                    )
                } else {
                    Ok(CommandRequest::delete(
                        &self.target_routing_service,
                        &self.provider.session_entity_name(session),
                    ))
                }
            }
            CommandKey::Route(session, topic_route) => {
                if op.is_create() {
                    CommandRequest::create(
                        &self.target_routing_service,
                        &self.provider.session_entity_name(session),
                        self.provider.topic_route_configuration(session, topic_route),
                    )
                } else {
                    Ok(CommandRequest::delete(
                        &self.target_routing_service,
                        &self.provider.topic_route_entity_name(session, topic_route),
                    ))
                }
            }
        }
    }

    fn check_response(
        &self,
        request: &CommandRequest,
        response: Option<CommandResponse>,
        context: &str,
    ) -> SendOutcome {
        let Some(response) = response else {
            error!("No response received request='{:?}', {}", request.kind(), context);
            return SendOutcome::Retry;
        };

        if response.kind == CommandResponseKind::Ok {
            debug!("Success request='{:?}', {}", request.kind(), context);
            return SendOutcome::Success;
        }

        error!(
            "Failed request='{:?}', {}, reason='{:?}', message='{}'",
            request.kind(),
            context,
            response.kind,
            response.message
        );
        SendOutcome::Retry
    }
}

fn describe(key: &CommandKey, _op: CommandOp) -> String {
    match key {
        CommandKey::Session(session) => format!(
            "entity='Session', topic='{}', partition='{}'",
            session.topic, session.partition
        ),
        CommandKey::Route(session, topic_route) => format!(
            "entity='TopicRoute', topic='{}', type='{}', partition='{}', direction='{}'",
            session.topic, topic_route.type_name, session.partition, topic_route.direction
        ),
    }
}
