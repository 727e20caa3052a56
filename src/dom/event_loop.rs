//! Virtual-clock event loop backing timers, microtasks and animation frames.
//!
//! Time only moves when the host asks it to (`advance`, `run_animation_frame`),
//! which keeps settle waits and debounces deterministic.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use crate::dom::document::Document;

/// Duration of one animation frame.
pub const FRAME: Duration = Duration::from_millis(16);

pub type Task = Box<dyn FnOnce(&mut Document)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Default)]
pub(crate) struct EventLoop {
    now: Duration,
    next_seq: u64,
    timers: BTreeMap<(Duration, u64), Task>,
    due_by_seq: HashMap<u64, Duration>,
    microtasks: VecDeque<Task>,
    frames: Vec<Task>,
}

impl EventLoop {
    fn pop_due(&mut self, deadline: Duration) -> Option<(Duration, Task)> {
        let key = *self.timers.keys().next()?;
        if key.0 > deadline {
            return None;
        }
        let task = self.timers.remove(&key)?;
        self.due_by_seq.remove(&key.1);
        Some((key.0, task))
    }
}

impl Document {
    /// Current virtual time since the document was created.
    pub fn now(&self) -> Duration {
        self.event_loop.now
    }

    pub fn set_timeout(
        &mut self,
        delay: Duration,
        task: impl FnOnce(&mut Document) + 'static,
    ) -> TimerId {
        let lp = &mut self.event_loop;
        let seq = lp.next_seq;
        lp.next_seq += 1;
        let due = lp.now + delay;
        lp.timers.insert((due, seq), Box::new(task));
        lp.due_by_seq.insert(seq, due);
        TimerId(seq)
    }

    /// Cancel a pending timer. Returns false when it already fired or was cleared.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        let lp = &mut self.event_loop;
        match lp.due_by_seq.remove(&id.0) {
            Some(due) => lp.timers.remove(&(due, id.0)).is_some(),
            None => false,
        }
    }

    pub fn queue_microtask(&mut self, task: impl FnOnce(&mut Document) + 'static) {
        self.event_loop.microtasks.push_back(Box::new(task));
    }

    pub fn request_animation_frame(&mut self, task: impl FnOnce(&mut Document) + 'static) {
        self.event_loop.frames.push(Box::new(task));
    }

    pub fn pending_timers(&self) -> usize {
        self.event_loop.timers.len()
    }

    pub fn next_timer_due(&self) -> Option<Duration> {
        self.event_loop.timers.keys().next().map(|(due, _)| *due)
    }

    /// Drain the microtask queue, including microtasks queued while draining.
    pub fn run_microtasks(&mut self) {
        while let Some(task) = self.event_loop.microtasks.pop_front() {
            task(self);
        }
    }

    /// Move the clock to the next frame boundary and run frame callbacks.
    pub fn run_animation_frame(&mut self) {
        let frame = FRAME.as_nanos();
        let now = self.event_loop.now.as_nanos();
        let next = (now / frame + 1) * frame;
        self.advance_to(Duration::from_nanos(next as u64));

        let callbacks = std::mem::take(&mut self.event_loop.frames);
        for callback in callbacks {
            callback(self);
        }
        self.run_microtasks();
    }

    pub fn advance(&mut self, duration: Duration) {
        let target = self.event_loop.now + duration;
        self.advance_to(target);
    }

    /// Run every timer due at or before `target` in due order, then park the
    /// clock at `target`. Timers scheduled while running are honored if they
    /// fall inside the window.
    pub fn advance_to(&mut self, target: Duration) {
        self.run_microtasks();
        while let Some((due, task)) = self.event_loop.pop_due(target) {
            if due > self.event_loop.now {
                self.event_loop.now = due;
            }
            task(self);
            self.run_microtasks();
        }
        if target > self.event_loop.now {
            self.event_loop.now = target;
        }
    }
}
