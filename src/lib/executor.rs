//! Task submission backed by either inline execution or a bounded pool.
//!
//! The engine submits [`AnalysisTask`]s through one [`TaskRunner`] interface
//! and receives completed tasks from a completion channel, so the calling
//! code never branches on the execution mode. At a concurrency of 1 the
//! runner executes each task inline in the submitting thread, with no pool
//! and no scheduling overhead; otherwise a fixed set of worker threads pulls
//! tasks from a shared channel.
//!
//! Cancellation is cooperative: once [`TaskRunner::cancel`] is called,
//! workers stop running queued tasks but still forward them (unexecuted) to
//! the completion channel, so every submitted task is eventually received.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::task::AnalysisTask;

enum Mode {
    Inline,
    Pooled { task_tx: Option<Sender<AnalysisTask>>, workers: Vec<JoinHandle<()>> },
}

/// Mode-agnostic task submission with a completion channel.
pub struct TaskRunner {
    mode: Mode,
    cancelled: Arc<AtomicBool>,
    done_tx: Sender<AnalysisTask>,
    done_rx: Receiver<AnalysisTask>,
    submitted: usize,
}

impl TaskRunner {
    /// Creates a runner with the given concurrency. A concurrency of 1 runs
    /// tasks inline in the submitting thread.
    pub fn new(threads: usize) -> Self {
        assert!(threads >= 1, "concurrency must be >= 1");
        let (done_tx, done_rx) = unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));
        let mode = if threads == 1 {
            Mode::Inline
        } else {
            let (task_tx, task_rx) = unbounded::<AnalysisTask>();
            let workers = (0..threads)
                .map(|i| {
                    let task_rx = task_rx.clone();
                    let done_tx = done_tx.clone();
                    let cancelled = Arc::clone(&cancelled);
                    std::thread::Builder::new()
                        .name(format!("unit-worker-{i}"))
                        .spawn(move || {
                            for mut task in task_rx {
                                if !cancelled.load(Ordering::Relaxed) {
                                    task.run();
                                }
                                // The receiver may be gone after an abandon;
                                // nothing left to report then.
                                let _ = done_tx.send(task);
                            }
                        })
                        .expect("failed to spawn worker thread")
                })
                .collect();
            Mode::Pooled { task_tx: Some(task_tx), workers }
        };
        TaskRunner { mode, cancelled, done_tx, done_rx, submitted: 0 }
    }

    /// Number of tasks submitted so far.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Stops execution of not-yet-started tasks. Tasks already running are
    /// not interrupted; they finish and reach the completion channel.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Submits a task. Inline mode executes it before returning; pooled mode
    /// queues it for the next free worker. Either way the task surfaces on
    /// the completion channel exactly once.
    pub fn submit(&mut self, mut task: AnalysisTask) {
        self.submitted += 1;
        match &self.mode {
            Mode::Inline => {
                if !self.is_cancelled() {
                    task.run();
                }
                let _ = self.done_tx.send(task);
            }
            Mode::Pooled { task_tx, .. } => {
                let tx = task_tx.as_ref().expect("submit after shutdown");
                tx.send(task).expect("worker pool hung up");
            }
        }
    }

    /// Next completed task, without blocking.
    pub fn try_recv(&self) -> Option<AnalysisTask> {
        self.done_rx.try_recv().ok()
    }

    /// Next completed task, blocking until one arrives. Returns `None` only
    /// if every worker is gone, which cannot happen while the runner is
    /// alive.
    pub fn recv(&self) -> Option<AnalysisTask> {
        self.done_rx.recv().ok()
    }

    /// Next completed task, blocking no longer than `deadline`.
    pub fn recv_deadline(&self, deadline: Instant) -> Option<AnalysisTask> {
        self.done_rx.recv_deadline(deadline).ok()
    }

    /// Waits for all workers to exit. Call after every submitted task has
    /// been received; workers are then idle and exit as soon as the task
    /// channel closes.
    pub fn join(mut self) {
        if let Mode::Pooled { task_tx, workers } = &mut self.mode {
            task_tx.take();
            for worker in workers.drain(..) {
                let _ = worker.join();
            }
        }
    }

    /// Abandons the pool without joining. Used after the cancellation grace
    /// period expires with a task still running; the worker thread is left
    /// behind and exits when its task finishes.
    pub fn abandon(mut self) {
        if let Mode::Pooled { task_tx, workers } = &mut self.mode {
            task_tx.take();
            let abandoned = workers.drain(..).count();
            if abandoned > 0 {
                debug!("Abandoning pool with {abandoned} worker(s) still attached");
            }
        }
    }

    /// Drains completed tasks until `pending` have been received or
    /// `timeout` expires, discarding them. Used on the failure path, where
    /// results arriving after the first failure are never merged.
    pub fn drain(&self, mut pending: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while pending > 0 {
            match self.recv_deadline(deadline) {
                Some(task) => {
                    debug!("Discarding result of {} after abort", task.unit());
                    pending -= 1;
                }
                None => break,
            }
        }
        pending
    }
}
