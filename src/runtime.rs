//! Worker-runtime helper: dedicated threads driving current-thread runtimes.

use std::future::Future;
use std::sync::Mutex;
use std::thread;
use tokio::runtime::{Builder, Handle};
use tokio::sync::watch;

const LINUX_THREAD_NAME_MAX_LEN: usize = 15;
pub(crate) const DEFAULT_WORKER_THREAD_NAME: &str = "dyn-routing-wkr";

fn sanitize_worker_thread_name(thread_name: &str) -> String {
    if thread_name.is_empty() || thread_name.len() > LINUX_THREAD_NAME_MAX_LEN {
        DEFAULT_WORKER_THREAD_NAME.to_string()
    } else {
        thread_name.to_string()
    }
}

/// One worker: an OS thread owning a current-thread tokio runtime.
///
/// Tasks spawned through [`Worker::handle`] execute on that single thread
/// while it is parked in the worker loop. Stopping is forceful: the watch
/// channel flips, the loop returns, and dropping the runtime abandons any
/// tasks still in flight.
pub(crate) struct Worker {
    handle: Handle,
    shutdown: watch::Sender<bool>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Worker {
    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    pub(crate) fn stop(&self) {
        let _ = self.shutdown.send(true);
        let joinable = self
            .thread
            .lock()
            .expect("worker thread slot poisoned")
            .take();
        if let Some(join_handle) = joinable {
            let _ = join_handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns a worker whose loop is built from the shutdown receiver.
///
/// The loop future is constructed and driven entirely on the worker thread.
pub(crate) fn spawn_worker<F, Fut>(thread_name: &str, make_loop: F) -> Worker
where
    F: FnOnce(watch::Receiver<bool>) -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    let runtime = Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to create worker runtime");
    let handle = runtime.handle().clone();
    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    let thread = thread::Builder::new()
        .name(sanitize_worker_thread_name(thread_name))
        .spawn(move || {
            runtime.block_on(make_loop(shutdown_receiver));
        })
        .expect("Failed to spawn worker thread");

    Worker {
        handle,
        shutdown: shutdown_sender,
        thread: Mutex::new(Some(thread)),
    }
}

/// Parks a worker until shutdown is requested, leaving the thread free to
/// drive spawned tasks.
pub(crate) async fn run_until_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            break;
        }
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}
