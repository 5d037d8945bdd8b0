use std::collections::HashSet;

/// Whether a periodic task stays scheduled after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Continue,
    Stop,
}

/// Cancellation handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

enum TaskKind {
    Once(Box<dyn FnOnce()>),
    Periodic {
        period: u64,
        run: Box<dyn FnMut(u64) -> TaskOutcome>,
    },
}

/// A task removed from the queue for execution. Periodic tasks hand back a
/// follow-up entry that the driver requeues.
pub struct DueTask {
    handle: TaskHandle,
    due: u64,
    kind: TaskKind,
}

impl DueTask {
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    /// Runs the task body. Returns the follow-up entry for periodic tasks
    /// that want to keep running.
    pub fn run(self, now: u64) -> Option<DueTask> {
        match self.kind {
            TaskKind::Once(body) => {
                body();
                None
            }
            TaskKind::Periodic { period, mut run } => match run(now) {
                TaskOutcome::Continue => Some(DueTask {
                    handle: self.handle,
                    due: now + period,
                    kind: TaskKind::Periodic { period, run },
                }),
                TaskOutcome::Stop => None,
            },
        }
    }
}

/// Explicit model of the host's designated execution context.
///
/// All rendered-state mutation funnels through this queue: one-shot tasks
/// (opens) run on the next tick, periodic tasks (animations) fire every
/// `period` ticks, first after one full period. The driver pumps the queue
/// with `begin_tick` / `pop_due` / `requeue` so task bodies are free to
/// schedule or cancel further work while they run.
#[derive(Default)]
pub struct TickScheduler {
    now: u64,
    next_handle: u64,
    entries: Vec<DueTask>,
    cancelled: HashSet<u64>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Queues a one-shot task for the next tick.
    pub fn run_on_tick(&mut self, body: impl FnOnce() + 'static) -> TaskHandle {
        let handle = self.allocate_handle();
        self.entries.push(DueTask {
            handle,
            due: self.now + 1,
            kind: TaskKind::Once(Box::new(body)),
        });
        handle
    }

    /// Registers a periodic task firing every `period` ticks (minimum 1),
    /// first after one full period.
    pub fn schedule_periodic(
        &mut self,
        period: u64,
        run: impl FnMut(u64) -> TaskOutcome + 'static,
    ) -> TaskHandle {
        let period = period.max(1);
        let handle = self.allocate_handle();
        self.entries.push(DueTask {
            handle,
            due: self.now + period,
            kind: TaskKind::Periodic {
                period,
                run: Box::new(run),
            },
        });
        handle
    }

    /// Idempotent: cancelling an unknown or already-finished handle is a
    /// no-op.
    pub fn cancel(&mut self, handle: TaskHandle) {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        if self.entries.len() == before {
            // The task may be mid-run; block its requeue.
            self.cancelled.insert(handle.0);
        }
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    /// Advances time by one tick and returns the new tick count.
    pub fn begin_tick(&mut self) -> u64 {
        self.now += 1;
        self.now
    }

    /// Removes the next due task, oldest first.
    pub fn pop_due(&mut self) -> Option<DueTask> {
        let index = self.entries.iter().position(|entry| entry.due <= self.now)?;
        Some(self.entries.remove(index))
    }

    /// Puts a periodic follow-up back on the queue unless the task was
    /// cancelled while running.
    pub fn requeue(&mut self, task: DueTask) {
        if self.cancelled.remove(&task.handle.0) {
            return;
        }
        self.entries.push(task);
    }

    fn allocate_handle(&mut self) -> TaskHandle {
        self.next_handle += 1;
        TaskHandle(self.next_handle)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{TaskOutcome, TickScheduler};

    fn pump(scheduler: &mut TickScheduler) {
        let now = scheduler.begin_tick();
        while let Some(task) = scheduler.pop_due() {
            if let Some(followup) = task.run(now) {
                scheduler.requeue(followup);
            }
        }
    }

    #[test]
    fn one_shot_runs_on_next_tick_only() {
        let mut scheduler = TickScheduler::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        scheduler.run_on_tick(move || *counter.borrow_mut() += 1);

        assert_eq!(*hits.borrow(), 0);
        pump(&mut scheduler);
        assert_eq!(*hits.borrow(), 1);
        pump(&mut scheduler);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn periodic_fires_every_period() {
        let mut scheduler = TickScheduler::new();
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let log = ticks.clone();
        scheduler.schedule_periodic(2, move |now| {
            log.borrow_mut().push(now);
            TaskOutcome::Continue
        });

        for _ in 0..6 {
            pump(&mut scheduler);
        }
        assert_eq!(*ticks.borrow(), vec![2, 4, 6]);
    }

    #[test]
    fn stop_outcome_removes_the_task() {
        let mut scheduler = TickScheduler::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        scheduler.schedule_periodic(1, move |_| {
            *counter.borrow_mut() += 1;
            TaskOutcome::Stop
        });

        pump(&mut scheduler);
        pump(&mut scheduler);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut scheduler = TickScheduler::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        let handle = scheduler.schedule_periodic(1, move |_| {
            *counter.borrow_mut() += 1;
            TaskOutcome::Continue
        });

        pump(&mut scheduler);
        scheduler.cancel(handle);
        scheduler.cancel(handle);
        pump(&mut scheduler);
        assert_eq!(*hits.borrow(), 1);
        assert!(!scheduler.is_scheduled(handle));
    }

    #[test]
    fn tasks_scheduled_during_a_tick_wait_for_the_next() {
        let scheduler = Rc::new(RefCell::new(TickScheduler::new()));
        let hits = Rc::new(RefCell::new(Vec::new()));

        let outer_sched = scheduler.clone();
        let outer_hits = hits.clone();
        scheduler.borrow_mut().run_on_tick(move || {
            outer_hits.borrow_mut().push("outer");
            let inner_hits = outer_hits.clone();
            outer_sched
                .borrow_mut()
                .run_on_tick(move || inner_hits.borrow_mut().push("inner"));
        });

        for _ in 0..2 {
            let now = scheduler.borrow_mut().begin_tick();
            loop {
                let task = scheduler.borrow_mut().pop_due();
                let Some(task) = task else { break };
                if let Some(followup) = task.run(now) {
                    scheduler.borrow_mut().requeue(followup);
                }
            }
        }
        assert_eq!(*hits.borrow(), vec!["outer", "inner"]);
    }
}
