use std::fmt;

/// Opaque handle of a scheduled one-shot task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(i64);

impl TimerHandle {
    pub fn id(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask<T> {
    pub(crate) handle: TimerHandle,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) payload: T,
}

/// Virtual clock plus one-shot task queue. Tasks run in `(due_at, order)`
/// order; time only moves when the owner moves it.
#[derive(Debug)]
pub(crate) struct Scheduler<T> {
    task_queue: Vec<ScheduledTask<T>>,
    now_ms: i64,
    pub(crate) step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
}

impl<T> Scheduler<T> {
    pub(crate) fn new(step_limit: usize) -> Self {
        Self {
            task_queue: Vec::new(),
            now_ms: 0,
            step_limit,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn set_now_ms(&mut self, now_ms: i64) {
        self.now_ms = now_ms;
    }

    fn allocate_timer_id(&mut self) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    fn allocate_task_order(&mut self) -> i64 {
        let order = self.next_task_order;
        self.next_task_order += 1;
        order
    }

    pub(crate) fn schedule(&mut self, delay_ms: i64, payload: T) -> (TimerHandle, i64) {
        let delay_ms = delay_ms.max(0);
        let due_at = self.now_ms.saturating_add(delay_ms);
        let handle = TimerHandle(self.allocate_timer_id());
        let order = self.allocate_task_order();
        self.task_queue.push(ScheduledTask {
            handle,
            due_at,
            order,
            payload,
        });
        (handle, due_at)
    }

    pub(crate) fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let pos = self
            .task_queue
            .iter()
            .position(|task| task.handle == handle)?;
        Some(self.task_queue.remove(pos).payload)
    }

    pub(crate) fn is_pending(&self, handle: TimerHandle) -> bool {
        self.task_queue.iter().any(|task| task.handle == handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.task_queue.len()
    }

    pub(crate) fn clear(&mut self) -> Vec<ScheduledTask<T>> {
        std::mem::take(&mut self.task_queue)
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.handle.id(),
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    pub(crate) fn peek_next(&self, due_limit: Option<i64>) -> Option<&ScheduledTask<T>> {
        self.next_task_index(due_limit)
            .and_then(|idx| self.task_queue.get(idx))
    }

    /// Removes the earliest task due at or before `due_limit` (any task
    /// when `None`).
    pub(crate) fn pop_next(&mut self, due_limit: Option<i64>) -> Option<ScheduledTask<T>> {
        let idx = self.next_task_index(due_limit)?;
        Some(self.task_queue.remove(idx))
    }
}
