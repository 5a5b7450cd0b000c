//! Delayed, cancellable task execution.
//!
//! The debounce path of the dispatcher needs "run this after N ms unless it is
//! cancelled first". `TimerThread` does that on a dedicated background thread;
//! `ManualScheduler` does it deterministically when the caller advances time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::clock::ManualClock;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled task.
///
/// Cancelling a task that already fired is a no-op; fired work cannot be recalled.
#[derive(Debug, Clone, Default)]
pub struct ScheduledTask {
    cancelled: Arc<AtomicBool>,
    fired: Arc<AtomicBool>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::SeqCst)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(AtomicOrdering::SeqCst)
    }

    /// Neither fired nor cancelled yet.
    pub fn is_pending(&self) -> bool {
        !self.is_cancelled() && !self.has_fired()
    }

    /// Marks the task as fired unless it was cancelled. Returns whether it may run.
    fn claim(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.fired.store(true, AtomicOrdering::SeqCst);
        true
    }
}

/// Schedules tasks to run after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask;
}

impl<S> Scheduler for Arc<S>
where
    S: Scheduler + ?Sized,
{
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        (**self).schedule(delay, task)
    }
}

struct Entry {
    deadline: Instant,
    seq: u64,
    handle: ScheduledTask,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the max-heap yields the earliest deadline first (FIFO on ties).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn run_task(handle: &ScheduledTask, task: Task) {
    if !handle.claim() {
        return;
    }
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        error!("scheduled task panicked");
    }
}

#[derive(Default)]
struct TimerQueue {
    entries: BinaryHeap<Entry>,
    next_seq: u64,
    shutdown: bool,
}

impl TimerQueue {
    fn push(&mut self, deadline: Instant, task: Task) -> ScheduledTask {
        let handle = ScheduledTask::new();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            deadline,
            seq,
            handle: handle.clone(),
            task,
        });
        handle
    }
}

struct TimerShared {
    queue: Mutex<TimerQueue>,
    wakeup: Condvar,
}

/// Background timer thread.
///
/// One thread serves every scheduled task in deadline order. Dropping the
/// `TimerThread` stops the thread; tasks still queued at that point never run.
pub struct TimerThread {
    shared: Arc<TimerShared>,
    join: Option<thread::JoinHandle<()>>,
}

impl TimerThread {
    /// Thread name used for the debounce timer.
    pub const DEFAULT_NAME: &'static str = "notification-debouncer";

    pub fn start() -> std::io::Result<Self> {
        Self::start_named(Self::DEFAULT_NAME)
    }

    pub fn start_named(name: impl Into<String>) -> std::io::Result<Self> {
        let shared = Arc::new(TimerShared {
            queue: Mutex::new(TimerQueue::default()),
            wakeup: Condvar::new(),
        });

        let name = name.into();
        let worker = shared.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || timer_loop(&worker))?;

        debug!(timer = %name, "timer thread started");

        Ok(Self {
            shared,
            join: Some(join),
        })
    }

    /// Number of queued entries, including cancelled ones not yet reaped.
    pub fn queued(&self) -> usize {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

impl Scheduler for TimerThread {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        let deadline = Instant::now() + delay;
        let handle = self
            .shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(deadline, task);
        self.shared.wakeup.notify_one();
        handle
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown = true;
        self.shared.wakeup.notify_all();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl core::fmt::Debug for TimerThread {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimerThread")
            .field("queued", &self.queued())
            .finish()
    }
}

fn timer_loop(shared: &TimerShared) {
    let mut queue = shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        if queue.shutdown {
            break;
        }

        let now = Instant::now();
        let next_deadline = queue.entries.peek().map(|e| e.deadline);

        match next_deadline {
            None => {
                queue = shared
                    .wakeup
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            Some(deadline) if deadline <= now => {
                if let Some(entry) = queue.entries.pop() {
                    // Run without holding the lock: tasks may schedule more work.
                    drop(queue);
                    run_task(&entry.handle, entry.task);
                    queue = shared.queue.lock().unwrap_or_else(PoisonError::into_inner);
                }
            }
            Some(deadline) => {
                queue = shared
                    .wakeup
                    .wait_timeout(queue, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
        }
    }
    debug!("timer thread stopped");
}

/// Deterministic scheduler for tests/dev.
///
/// Nothing runs until [`ManualScheduler::advance`] moves time forward; due
/// tasks then run on the calling thread, earliest deadline first.
#[derive(Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    state: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    elapsed: Duration,
    queue: BinaryHeap<ManualEntry>,
    next_seq: u64,
}

struct ManualEntry {
    due: Duration,
    seq: u64,
    handle: ScheduledTask,
    task: Task,
}

impl PartialEq for ManualEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ManualEntry {}

impl PartialOrd for ManualEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ManualEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::with_clock(ManualClock::new())
    }

    /// Advancing this scheduler also advances `clock`.
    pub fn with_clock(clock: ManualClock) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(ManualState::default())),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Move time forward by `by`, running every task that becomes due.
    ///
    /// Returns the number of tasks that actually ran (cancelled ones excluded).
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().elapsed + by;
        let mut ran = 0;

        loop {
            let next = {
                let mut state = self.lock();
                match state.queue.peek() {
                    Some(entry) if entry.due <= target => {
                        let entry = state.queue.pop();
                        if let Some(e) = &entry {
                            let step = e.due.saturating_sub(state.elapsed);
                            state.elapsed = state.elapsed.max(e.due);
                            self.clock.advance(step);
                        }
                        entry
                    }
                    _ => None,
                }
            };

            let Some(entry) = next else { break };
            if entry.handle.is_pending() {
                run_task(&entry.handle, entry.task);
                ran += 1;
            }
        }

        let mut state = self.lock();
        let step = target.saturating_sub(state.elapsed);
        state.elapsed = target;
        self.clock.advance(step);
        ran
    }

    /// Scheduled tasks that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.lock()
            .queue
            .iter()
            .filter(|e| e.handle.is_pending())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
        let mut state = self.lock();
        let handle = ScheduledTask::new();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.elapsed + delay;
        state.queue.push(ManualEntry {
            due,
            seq,
            handle: handle.clone(),
            task,
        });
        handle
    }
}

impl core::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use std::sync::mpsc;

    #[test]
    fn manual_scheduler_runs_due_tasks_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (name, delay) in [("late", 300), ("early", 100), ("mid", 200)] {
            let log = log.clone();
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || log.lock().unwrap().push(name)),
            );
        }

        assert_eq!(scheduler.advance(Duration::from_millis(250)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["early", "mid"]);
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.advance(Duration::from_millis(50)), 1);
        assert_eq!(*log.lock().unwrap(), vec!["early", "mid", "late"]);
    }

    #[test]
    fn cancelled_tasks_never_run() {
        let scheduler = ManualScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));

        let flag = ran.clone();
        let handle = scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move || flag.store(true, AtomicOrdering::SeqCst)),
        );
        handle.cancel();

        assert_eq!(scheduler.advance(Duration::from_secs(1)), 0);
        assert!(!ran.load(AtomicOrdering::SeqCst));
        assert!(!handle.has_fired());
    }

    #[test]
    fn cancelling_after_fire_does_not_recall() {
        let scheduler = ManualScheduler::new();
        let handle = scheduler.schedule(Duration::from_millis(10), Box::new(|| {}));

        scheduler.advance(Duration::from_millis(10));
        handle.cancel();

        assert!(handle.has_fired());
        assert!(!handle.is_pending());
    }

    #[test]
    fn manual_scheduler_advances_shared_clock() {
        let clock = ManualClock::new();
        let scheduler = ManualScheduler::with_clock(clock.clone());
        let start = clock.now();

        scheduler.advance(Duration::from_millis(700));

        assert_eq!(clock.now() - start, Duration::from_millis(700));
    }

    #[test]
    fn timer_thread_fires_after_delay() {
        let timer = TimerThread::start_named("test-timer").unwrap();
        let (tx, rx) = mpsc::channel();

        let started = Instant::now();
        timer.schedule(
            Duration::from_millis(30),
            Box::new(move || {
                let _ = tx.send(Instant::now());
            }),
        );

        let fired_at = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(fired_at - started >= Duration::from_millis(30));
    }

    #[test]
    fn timer_thread_skips_cancelled_and_survives_panics() {
        let timer = TimerThread::start_named("test-timer-cancel").unwrap();
        let (tx, rx) = mpsc::channel();

        let cancelled_tx = tx.clone();
        let handle = timer.schedule(
            Duration::from_millis(20),
            Box::new(move || {
                let _ = cancelled_tx.send("cancelled");
            }),
        );
        handle.cancel();

        timer.schedule(Duration::from_millis(10), Box::new(|| panic!("boom")));
        timer.schedule(
            Duration::from_millis(40),
            Box::new(move || {
                let _ = tx.send("kept");
            }),
        );

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "kept");
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
