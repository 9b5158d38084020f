use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// Work deferred to the next frame. Errors go to whoever drives frames.
pub type FrameCallback = Box<dyn FnOnce() -> Result<()>>;

/// Defers a rebuild pass to the host's next frame.
pub trait FrameScheduler {
    fn schedule_frame(&self, callback: FrameCallback);
}

impl<F: Fn(FrameCallback)> FrameScheduler for F {
    fn schedule_frame(&self, callback: FrameCallback) {
        self(callback)
    }
}

/// FIFO of pending frame callbacks, drained by the host once per refresh.
#[derive(Clone, Default)]
pub struct FrameQueue {
    pending: Rc<RefCell<VecDeque<FrameCallback>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }

    /// Runs the callbacks queued before this call. Callbacks they schedule wait
    /// for the next drain. Stops at the first error, leaving the rest queued.
    pub fn run_pending(&self) -> Result<usize> {
        let count = self.len();
        for ran in 0..count {
            let callback = self.pending.borrow_mut().pop_front();
            match callback {
                Some(callback) => callback()?,
                None => return Ok(ran),
            }
        }
        Ok(count)
    }
}

impl FrameScheduler for FrameQueue {
    fn schedule_frame(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push_back(callback);
    }
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.len())
            .finish()
    }
}
