//! Per-subject worker thread with serialized input.
//!
//! Each worker owns a [`SubjectTracker`] outright, so fix processing for
//! the subject is strictly serialized and nothing is shared between
//! subjects.  Input arrives over a bounded `embassy-sync` channel; the
//! periodic tick is an `async-io-mini` reactor timer.
//!
//! ```text
//!  ┌─────────────────────────────────────────────────────────────┐
//!  │  Worker thread "pawtrack-<subject>"                         │
//!  │  ┌───────────────────────────────────────────────────────┐  │
//!  │  │  futures_lite::future::block_on                       │  │
//!  │  │  ┌─────────────────────────────────────────────────┐  │  │
//!  │  │  │  edge_executor::LocalExecutor                   │  │  │
//!  │  │  │                                                 │  │  │
//!  │  │  │   stop.wait()  ─┐                               │  │  │
//!  │  │  │   commands.rx  ─┼─▶ first ready ─▶ tracker      │  │  │
//!  │  │  │   Timer(tick)  ─┘                               │  │  │
//!  │  │  └─────────────────────────────────────────────────┘  │  │
//!  │  └───────────────────────────────────────────────────────┘  │
//!  └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`WorkerHandle::shutdown`] is synchronous: it signals the worker,
//! joins the thread, and returns the open walk that was discarded.
//! Commands already queued when the stop signal arrives are still
//! applied; no tick runs after it.

use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, info, warn};

use crate::SubjectId;
use crate::app::commands::TrackerCommand;
use crate::app::ports::{Clock, EventSink};
use crate::app::service::SubjectTracker;
use crate::error::{Result, WorkerError};
use crate::session::WalkSession;

/// Channel depth for inbound commands.
pub const COMMAND_DEPTH: usize = 32;

/// State shared between a handle and its worker thread.
struct WorkerShared {
    commands: Channel<CriticalSectionRawMutex, TrackerCommand, COMMAND_DEPTH>,
    stop: Signal<CriticalSectionRawMutex, ()>,
}

/// What woke the worker loop.
enum Wake {
    Stop,
    Command(TrackerCommand),
    Tick,
}

// ── Worker loop ──────────────────────────────────────────────

async fn run_worker<S, C>(
    mut tracker: SubjectTracker,
    mut sink: S,
    clock: C,
    shared: Arc<WorkerShared>,
) -> SubjectTracker
where
    S: EventSink,
    C: Clock,
{
    let mut next_tick = Instant::now() + tick_interval(&tracker);

    loop {
        let until_tick = next_tick.saturating_duration_since(Instant::now());
        // `or` polls left to right, so stop wins over a ready command.
        let wake = future::or(
            async {
                shared.stop.wait().await;
                Wake::Stop
            },
            future::or(
                async { Wake::Command(shared.commands.receive().await) },
                async {
                    async_io_mini::Timer::after(until_tick).await;
                    Wake::Tick
                },
            ),
        )
        .await;

        match wake {
            Wake::Command(cmd) => {
                let reschedule = matches!(cmd, TrackerCommand::UpdateConfig(_));
                apply(&mut tracker, cmd, &mut sink);
                if reschedule {
                    next_tick = Instant::now() + tick_interval(&tracker);
                }
            }
            Wake::Tick => {
                if let Err(e) = tracker.tick(clock.now_ms(), &mut sink) {
                    warn!("Worker[{}]: tick failed: {}", tracker.subject_id(), e);
                }
                next_tick = Instant::now() + tick_interval(&tracker);
            }
            Wake::Stop => {
                while let Ok(cmd) = shared.commands.try_receive() {
                    apply(&mut tracker, cmd, &mut sink);
                }
                info!("Worker[{}]: stopped", tracker.subject_id());
                return tracker;
            }
        }
    }
}

fn apply(tracker: &mut SubjectTracker, cmd: TrackerCommand, sink: &mut impl EventSink) {
    if let Err(e) = tracker.handle_command(cmd, sink) {
        debug!("Worker[{}]: command failed: {}", tracker.subject_id(), e);
    }
}

fn tick_interval(tracker: &SubjectTracker) -> Duration {
    Duration::from_millis(tracker.config().tick_interval_ms())
}

// ── Thread spawn ─────────────────────────────────────────────

/// Handle to a running worker.  Dropping it stops the worker.
pub struct WorkerHandle {
    subject_id: SubjectId,
    shared: Arc<WorkerShared>,
    thread: Option<JoinHandle<SubjectTracker>>,
}

/// Move `tracker` onto its own worker thread.
///
/// The sink receives every event the tracker emits; the clock stamps
/// periodic ticks.
pub fn spawn_worker<S, C>(tracker: SubjectTracker, sink: S, clock: C) -> Result<WorkerHandle>
where
    S: EventSink + Send + 'static,
    C: Clock + Send + 'static,
{
    let subject_id = tracker.subject_id().clone();
    let shared = Arc::new(WorkerShared {
        commands: Channel::new(),
        stop: Signal::new(),
    });

    let worker_shared = shared.clone();
    let thread = std::thread::Builder::new()
        .name(format!("pawtrack-{}", subject_id))
        .spawn(move || {
            let executor: edge_executor::LocalExecutor<'_, 2> = edge_executor::LocalExecutor::new();
            let task = executor.spawn(run_worker(tracker, sink, clock, worker_shared));
            future::block_on(executor.run(task))
        })
        .map_err(|e| {
            warn!("Worker[{}]: thread spawn failed: {}", subject_id, e);
            WorkerError::Stopped
        })?;

    info!("Worker[{}]: started", subject_id);
    Ok(WorkerHandle {
        subject_id,
        shared,
        thread: Some(thread),
    })
}

impl WorkerHandle {
    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    /// Queue a command without blocking.
    pub fn send(&self, cmd: TrackerCommand) -> Result<()> {
        if self.thread.as_ref().is_none_or(JoinHandle::is_finished) {
            return Err(WorkerError::Stopped.into());
        }
        self.shared.commands.try_send(cmd).map_err(|_| {
            warn!("Worker[{}]: command channel full, dropping command", self.subject_id);
            WorkerError::ChannelFull.into()
        })
    }

    /// Stop the worker and wait for it.  Returns the open walk, if any,
    /// which is discarded with the tracker.
    pub fn shutdown(mut self) -> Result<Option<WalkSession>> {
        let tracker = self.stop_and_join()?;
        let abandoned = tracker.active_session().cloned();
        if let Some(s) = &abandoned {
            warn!("Worker[{}]: discarding open walk {}", self.subject_id, s.id);
        }
        Ok(abandoned)
    }

    /// Stop the worker and take its tracker back (e.g. to checkpoint it
    /// or to move it to a registry).
    pub fn into_tracker(mut self) -> Result<SubjectTracker> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<SubjectTracker> {
        let thread = self.thread.take().ok_or(WorkerError::Stopped)?;
        self.shared.stop.signal(());
        thread.join().map_err(|_| {
            warn!("Worker[{}]: worker thread panicked", self.subject_id);
            WorkerError::Stopped.into()
        })
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.stop_and_join();
        }
    }
}
