//! Single-threaded cooperative event loop.
//!
//! Every lifecycle notification, pointer dispatch, and window mutation runs on
//! one logical thread. The loop offers two scheduling primitives: [`RuntimeHandle::post`]
//! enqueues a task for the next drain, and [`RuntimeHandle::post_at`] /
//! [`RuntimeHandle::post_delayed`] schedule a task at a millisecond deadline.
//! Both return a cancellable [`TaskRegistration`]; there are no blocking waits.
//!
//! Time never comes from a wall clock. The embedder drives the loop with
//! [`Runtime::advance_to`], which runs due timers and then drains the tick
//! queue. This keeps every schedule deterministic under test.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Hint interface for embedders that want a wakeup when work is queued.
///
/// A polling embedder (or a test) can ignore the hint entirely and just call
/// [`Runtime::advance_to`] on its own cadence.
pub trait WakeupScheduler {
    fn schedule_wakeup(&self);
}

#[derive(Default)]
struct PollingScheduler;

impl WakeupScheduler for PollingScheduler {
    fn schedule_wakeup(&self) {}
}

type Task = Box<dyn FnOnce() + 'static>;

struct TickEntry {
    id: u64,
    task: Task,
}

struct TimerEntry {
    id: u64,
    deadline_ms: i64,
    task: Task,
}

struct LoopInner {
    scheduler: Rc<dyn WakeupScheduler>,
    ticks: RefCell<VecDeque<TickEntry>>,
    timers: RefCell<Vec<TimerEntry>>,
    next_task_id: Cell<u64>,
    now_ms: Cell<i64>,
    draining: Cell<bool>,
}

impl LoopInner {
    fn alloc_id(&self) -> u64 {
        let id = self.next_task_id.get();
        self.next_task_id.set(id + 1);
        id
    }

    fn post(&self, task: Task) -> u64 {
        let id = self.alloc_id();
        self.ticks.borrow_mut().push_back(TickEntry { id, task });
        self.scheduler.schedule_wakeup();
        id
    }

    fn post_at(&self, deadline_ms: i64, task: Task) -> u64 {
        let id = self.alloc_id();
        self.timers.borrow_mut().push(TimerEntry {
            id,
            deadline_ms,
            task,
        });
        self.scheduler.schedule_wakeup();
        id
    }

    fn cancel(&self, id: u64) {
        let mut ticks = self.ticks.borrow_mut();
        if let Some(index) = ticks.iter().position(|entry| entry.id == id) {
            ticks.remove(index);
            return;
        }
        drop(ticks);
        self.timers.borrow_mut().retain(|entry| entry.id != id);
    }

    /// Runs all timers due at `now_ms`, then drains the tick queue. Tasks may
    /// schedule further work; the drain keeps going until the loop is idle at
    /// this instant.
    fn advance_to(&self, now_ms: i64) {
        if self.draining.replace(true) {
            // Reentrant advance from inside a task would interleave drains.
            log::warn!("advance_to called re-entrantly; ignoring");
            return;
        }
        if now_ms > self.now_ms.get() {
            self.now_ms.set(now_ms);
        }
        let now = self.now_ms.get();
        loop {
            let next_due = {
                let mut timers = self.timers.borrow_mut();
                let mut due_index: Option<usize> = None;
                for (index, entry) in timers.iter().enumerate() {
                    if entry.deadline_ms > now {
                        continue;
                    }
                    due_index = match due_index {
                        Some(best)
                            if (timers[best].deadline_ms, timers[best].id)
                                <= (entry.deadline_ms, entry.id) =>
                        {
                            Some(best)
                        }
                        _ => Some(index),
                    };
                }
                due_index.map(|index| timers.remove(index))
            };
            match next_due {
                Some(entry) => (entry.task)(),
                None => break,
            }
        }
        loop {
            let next = self.ticks.borrow_mut().pop_front();
            match next {
                Some(entry) => (entry.task)(),
                None => break,
            }
        }
        self.draining.set(false);
    }

    fn has_pending(&self) -> bool {
        !self.ticks.borrow().is_empty() || !self.timers.borrow().is_empty()
    }
}

/// Owner of the event loop. Embedders keep the `Runtime` alive and hand
/// [`RuntimeHandle`]s to everything that needs to schedule work.
pub struct Runtime {
    inner: Rc<LoopInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_scheduler(Rc::new(PollingScheduler))
    }

    pub fn with_scheduler(scheduler: Rc<dyn WakeupScheduler>) -> Self {
        Self {
            inner: Rc::new(LoopInner {
                scheduler,
                ticks: RefCell::new(VecDeque::new()),
                timers: RefCell::new(Vec::new()),
                next_task_id: Cell::new(1),
                now_ms: Cell::new(0),
                draining: Cell::new(false),
            }),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Moves loop time forward (monotonically) and runs everything due.
    pub fn advance_to(&self, now_ms: i64) {
        self.inner.advance_to(now_ms);
    }

    /// Drains next-tick tasks without moving time.
    pub fn drain(&self) {
        self.inner.advance_to(self.inner.now_ms.get());
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.now_ms.get()
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak, cloneable handle onto the loop. Scheduling through a handle whose
/// runtime is gone is a silent no-op.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<LoopInner>,
}

impl RuntimeHandle {
    /// Enqueues `task` for the next drain of the loop.
    pub fn post(&self, task: impl FnOnce() + 'static) -> Option<TaskRegistration> {
        self.inner.upgrade().map(|inner| TaskRegistration {
            id: inner.post(Box::new(task)),
            inner: self.inner.clone(),
        })
    }

    /// Schedules `task` to run once loop time reaches `deadline_ms`.
    pub fn post_at(&self, deadline_ms: i64, task: impl FnOnce() + 'static) -> Option<TaskRegistration> {
        self.inner.upgrade().map(|inner| TaskRegistration {
            id: inner.post_at(deadline_ms, Box::new(task)),
            inner: self.inner.clone(),
        })
    }

    /// Schedules `task` `delay_ms` after the loop's current time.
    pub fn post_delayed(&self, delay_ms: i64, task: impl FnOnce() + 'static) -> Option<TaskRegistration> {
        let deadline = self
            .inner
            .upgrade()
            .map(|inner| inner.now_ms.get() + delay_ms)?;
        self.post_at(deadline, task)
    }

    pub fn now_ms(&self) -> i64 {
        self.inner
            .upgrade()
            .map(|inner| inner.now_ms.get())
            .unwrap_or(0)
    }
}

/// Cancellation handle for a scheduled task. Dropping the registration cancels
/// the task if it has not run yet.
pub struct TaskRegistration {
    id: u64,
    inner: Weak<LoopInner>,
}

impl TaskRegistration {
    pub fn cancel(self) {
        // Drop does the work.
    }

    /// Forgets the registration without cancelling: the task stays scheduled.
    pub fn detach(mut self) {
        self.inner = Weak::new();
    }
}

impl Drop for TaskRegistration {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel(self.id);
        }
    }
}
