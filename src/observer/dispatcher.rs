//! Single-threaded ordered dispatcher for lifecycle listener events.

use crate::observer::listener::RouteLifecycleListener;
use crate::observer::session::{Session, TopicRoute};
use crate::runtime::{spawn_worker, Worker};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::{error, warn};

const COMPONENT: &str = "listener_dispatcher";
const DISPATCHER_THREAD_NAME: &str = "route-dispatch";

pub(crate) const DEFAULT_EVENT_QUEUE_SIZE: usize = 256;

#[derive(Clone, Debug)]
pub(crate) enum RouteEvent {
    CreateSession(Session),
    DeleteSession(Session),
    CreateTopicRoute(Session, TopicRoute),
    DeleteTopicRoute(Session, TopicRoute),
}

type ListenerList = Arc<Mutex<Vec<Arc<dyn RouteLifecycleListener>>>>;

/// Bounded FIFO queue with one consumer worker.
///
/// Listeners observe events in enqueue order. Overflow means the queue was
/// sized wrong for the deployment; the event is dropped, counted and logged
/// rather than blocking a discovery callback.
pub(crate) struct ListenerDispatcher {
    sender: mpsc::Sender<RouteEvent>,
    listeners: ListenerList,
    dropped: Arc<AtomicU64>,
    worker: Worker,
}

impl ListenerDispatcher {
    pub(crate) fn new(queue_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let listeners: ListenerList = Arc::new(Mutex::new(Vec::new()));
        let dropped = Arc::new(AtomicU64::new(0));

        let loop_listeners = listeners.clone();
        let worker = spawn_worker(DISPATCHER_THREAD_NAME, move |shutdown| {
            dispatch_loop(receiver, shutdown, loop_listeners)
        });

        Self {
            sender,
            listeners,
            dropped,
            worker,
        }
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn RouteLifecycleListener>) {
        let mut listeners = self.listeners.lock().expect("listener list poisoned");
        if !listeners.iter().any(|known| Arc::ptr_eq(known, &listener)) {
            listeners.push(listener);
        }
    }

    pub(crate) fn remove_listener(&self, listener: &Arc<dyn RouteLifecycleListener>) {
        self.listeners
            .lock()
            .expect("listener list poisoned")
            .retain(|known| !Arc::ptr_eq(known, listener));
    }

    pub(crate) fn enqueue(&self, event: RouteEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                error!(
                    component = COMPONENT,
                    event = ?event,
                    "event queue full; dropping lifecycle event"
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    component = COMPONENT,
                    event = ?event,
                    "dispatcher stopped; discarding lifecycle event"
                );
            }
        }
    }

    pub(crate) fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn close(&self) {
        self.listeners
            .lock()
            .expect("listener list poisoned")
            .clear();
        self.worker.stop();
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<RouteEvent>,
    mut shutdown: watch::Receiver<bool>,
    listeners: ListenerList,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    break;
                }
            }
            event = receiver.recv() => {
                let Some(event) = event else { break };
                dispatch_event(&listeners, &event);
            }
        }
    }
}

fn dispatch_event(listeners: &ListenerList, event: &RouteEvent) {
    let snapshot = listeners.lock().expect("listener list poisoned").clone();

    for listener in snapshot {
        let outcome = catch_unwind(AssertUnwindSafe(|| match event {
            RouteEvent::CreateSession(session) => listener.create_session(session),
            RouteEvent::DeleteSession(session) => listener.delete_session(session),
            RouteEvent::CreateTopicRoute(session, topic_route) => {
                listener.create_topic_route(session, topic_route)
            }
            RouteEvent::DeleteTopicRoute(session, topic_route) => {
                listener.delete_topic_route(session, topic_route)
            }
        }));

        if outcome.is_err() {
            error!(
                component = COMPONENT,
                event = ?event,
                "listener panicked; continuing dispatch"
            );
        }
    }
}
