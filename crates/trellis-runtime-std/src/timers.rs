use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use ahash::RandomState;
use hashbrown::HashMap;
use trellis_core::ResumeFn;

pub type TimerId = u64;

struct Timer {
    deadline: Instant,
    callback: ResumeFn,
}

struct Table<T> {
    next_id: TimerId,
    entries: HashMap<TimerId, T, RandomState>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: HashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<T> Table<T> {
    fn insert(&mut self, entry: T) -> TimerId {
        self.next_id += 1;
        self.entries.insert(self.next_id, entry);
        self.next_id
    }
}

/// Deadline callbacks, fired by [`Timers::fire_due`].
#[derive(Clone, Default)]
pub struct Timers {
    table: Rc<RefCell<Table<Timer>>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, deadline: Instant, callback: ResumeFn) -> TimerId {
        self.table
            .borrow_mut()
            .insert(Timer { deadline, callback })
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.table.borrow_mut().entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.table
            .borrow()
            .entries
            .values()
            .map(|timer| timer.deadline)
            .min()
    }

    /// Fires every timer whose deadline is at or before `now`, earliest
    /// first. Timers scheduled by the callbacks wait for the next call.
    pub fn fire_due(&self, now: Instant) -> usize {
        let mut due: Vec<(Instant, TimerId)> = self
            .table
            .borrow()
            .entries
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(id, timer)| (timer.deadline, *id))
            .collect();
        due.sort_unstable();

        let mut fired = 0;
        for (_, id) in due {
            // A callback fired earlier in this loop may have cancelled it.
            let timer = self.table.borrow_mut().entries.remove(&id);
            if let Some(timer) = timer {
                (timer.callback)();
                fired += 1;
            }
        }
        fired
    }
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers")
            .field("pending", &self.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

/// Callbacks waiting for the next display refresh.
#[derive(Clone, Default)]
pub struct AnimationFrames {
    table: Rc<RefCell<Table<ResumeFn>>>,
}

impl AnimationFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, callback: ResumeFn) -> TimerId {
        self.table.borrow_mut().insert(callback)
    }

    pub fn cancel(&self, id: TimerId) -> bool {
        self.table.borrow_mut().entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the callbacks requested before this call, in request order.
    pub fn fire(&self) -> usize {
        let mut ids: Vec<TimerId> = self.table.borrow().entries.keys().copied().collect();
        ids.sort_unstable();

        let mut fired = 0;
        for id in ids {
            let callback = self.table.borrow_mut().entries.remove(&id);
            if let Some(callback) = callback {
                callback();
                fired += 1;
            }
        }
        fired
    }
}

impl fmt::Debug for AnimationFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationFrames")
            .field("pending", &self.len())
            .finish()
    }
}
