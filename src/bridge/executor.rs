//! Worker-thread execution of a foreign graph.
//!
//! One worker per dispatched run; the foreign runtime sits behind a mutex so
//! at most one execution per bridge is in flight. The caller waits on a
//! channel of progress events instead of a busy polling loop; idle ticks let
//! a host UI pump its own event loop and request cancellation.

use crate::error::BridgeError;
use crate::scene::WorkingDirGuard;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::error;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::runtime::ForeignRuntime;

/// Events emitted by the worker during a foreign-graph run. `Finished` is
/// always the last event and is sent before any output value is read back.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started,
    /// Completion fraction in `0.0..=1.0`.
    Progress(f32),
    Message(String),
    Finished(Result<(), String>),
}

/// Verdict of the host's progress sink after each event or idle tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitControl {
    Continue,
    Cancel,
}

/// Handed to the runtime's `execute`; carries the cancellation flag and the
/// progress channel.
pub struct ExecutionContext {
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) progress: Sender<ProgressEvent>,
}

impl ExecutionContext {
    /// Runtimes should poll this between work items and return
    /// [`BridgeError::Cancelled`] promptly when set.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn report_progress(&self, fraction: f32) {
        let _ = self.progress.send(ProgressEvent::Progress(fraction));
    }

    pub fn report_message(&self, message: &str) {
        let _ = self
            .progress
            .send(ProgressEvent::Message(message.to_string()));
    }
}

/// A dispatched run: the event stream, the cancellation flag, and the worker
/// join handle.
pub struct ExecutionHandle {
    events: Receiver<ProgressEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ExecutionHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Cooperatively waits for completion. The sink is called with `Some`
    /// for every worker event and with `None` on idle ticks (~25ms), so a
    /// UI can process its own events while waiting; returning
    /// [`WaitControl::Cancel`] requests termination.
    ///
    /// A cancelled run reports [`BridgeError::Cancelled`] even if the worker
    /// happened to finish cleanly: partially-computed foreign state is
    /// treated as indeterminate.
    pub fn wait_with<F>(mut self, mut sink: F) -> Result<(), BridgeError>
    where
        F: FnMut(Option<&ProgressEvent>) -> WaitControl,
    {
        let mut outcome: Option<Result<(), String>> = None;
        loop {
            match self.events.recv_timeout(Duration::from_millis(25)) {
                Ok(event) => {
                    if sink(Some(&event)) == WaitControl::Cancel {
                        self.cancel.store(true, Ordering::SeqCst);
                    }
                    if let ProgressEvent::Finished(result) = event {
                        outcome = Some(result);
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if sink(None) == WaitControl::Cancel {
                        self.cancel.store(true, Ordering::SeqCst);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        if self.cancel.load(Ordering::SeqCst) {
            return Err(BridgeError::Cancelled);
        }
        match outcome {
            Some(Ok(())) => Ok(()),
            Some(Err(message)) => Err(BridgeError::Execution { message }),
            None => Err(BridgeError::Execution {
                message: "worker terminated without reporting a result".to_string(),
            }),
        }
    }
}

/// Starts a worker thread that runs the foreign graph inside the scene's
/// working directory. Errors and panics are caught at the thread boundary
/// and reported through the event stream, never left to kill the thread
/// silently.
pub(crate) fn dispatch(
    runtime: Arc<Mutex<Box<dyn ForeignRuntime>>>,
    working_dir: PathBuf,
) -> ExecutionHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = unbounded();
    let worker_cancel = cancel.clone();
    let thread = thread::spawn(move || {
        let _ = tx.send(ProgressEvent::Started);
        let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<(), BridgeError> {
            let _guard = WorkingDirGuard::enter(&working_dir).map_err(|err| {
                BridgeError::Execution {
                    message: format!(
                        "cannot enter working directory '{}': {}",
                        working_dir.display(),
                        err
                    ),
                }
            })?;
            let mut runtime = runtime.lock().map_err(|_| BridgeError::Execution {
                message: "foreign runtime mutex poisoned".to_string(),
            })?;
            let ctx = ExecutionContext {
                cancel: worker_cancel.clone(),
                progress: tx.clone(),
            };
            runtime.execute(&ctx)
        }));
        let result = match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(BridgeError::Execution { message })) => Err(message),
            Ok(Err(err)) => Err(err.to_string()),
            Err(panic) => Err(panic_message(panic)),
        };
        if let Err(message) = &result {
            error!("foreign graph worker failed: {}", message);
        }
        let _ = tx.send(ProgressEvent::Finished(result));
    });
    ExecutionHandle {
        events: rx,
        cancel,
        thread: Some(thread),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("foreign graph execution panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("foreign graph execution panicked: {}", message)
    } else {
        "foreign graph execution panicked".to_string()
    }
}
