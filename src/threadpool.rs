use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tracing::{debug, error};

/// Fixed set of worker threads pulling jobs off a shared queue, joined on drop.
///
/// Follows the design of the pool in the Rust book:
/// https://doc.rust-lang.org/book/ch20-02-multithreaded.html
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<Job>>,
}

/// Type of jobs to be executed by the threadpool.
type Job = Box<dyn FnOnce() + Send + 'static>;

impl ThreadPool {
    /// Create a new ThreadPool with `size` threads. A size of 0 is raised to 1.
    pub fn new(size: usize) -> ThreadPool {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .filter_map(|id| Worker::spawn(id, Arc::clone(&receiver)))
            .collect();

        ThreadPool {
            workers,
            sender: Some(sender),
        }
    }

    /// Number of workers that could actually be started
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a task to run on the threadpool when a worker is available.
    ///
    /// The job is dropped if every worker has died.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let sent = self
            .sender
            .as_ref()
            .map(|sender| sender.send(Box::new(f)).is_ok())
            .unwrap_or(false);
        if !sent {
            error!("No worker left to run the job");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in &mut self.workers {
            if let Some(thread) = worker.handle.take() {
                if thread.join().is_err() {
                    error!(worker = worker.id, "Worker panicked");
                }
            }
        }
    }
}

struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Start a worker executing jobs from `receiver` until the sending side is closed.
    fn spawn(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) -> Option<Worker> {
        let handle = thread::Builder::new()
            .name(format!("storefront-worker-{}", id))
            .spawn(move || loop {
                // The guard must be released before running the job
                let message = match receiver.lock() {
                    Ok(receiver) => receiver.recv(),
                    Err(_) => break,
                };
                match message {
                    Ok(job) => job(),
                    Err(_) => {
                        debug!(worker = id, "Queue closed, worker exiting");
                        break;
                    }
                }
            });

        match handle {
            Ok(handle) => Some(Worker {
                id,
                handle: Some(handle),
            }),
            Err(err) => {
                error!(worker = id, error = %err, "Failed to spawn worker");
                None
            }
        }
    }
}
