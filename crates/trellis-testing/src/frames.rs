use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use trellis_core::{FrameCallback, FrameScheduler};

use crate::HarnessError;

/// Frame scheduler that holds the pending pass until the test asks for it.
///
/// The root never queues more than one pass, so a single slot is enough.
#[derive(Clone, Default)]
pub struct ManualFrames {
    pending: Rc<RefCell<Option<FrameCallback>>>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Runs the pending pass.
    pub fn next_frame(&self) -> Result<(), HarnessError> {
        let callback = self
            .pending
            .borrow_mut()
            .take()
            .ok_or(HarnessError::NoScheduledFrame)?;
        callback()?;
        Ok(())
    }
}

impl FrameScheduler for ManualFrames {
    fn schedule_frame(&self, callback: FrameCallback) {
        let replaced = self.pending.borrow_mut().replace(callback);
        debug_assert!(replaced.is_none(), "a second pass was scheduled before the first ran");
    }
}

impl fmt::Debug for ManualFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualFrames")
            .field("pending", &self.has_pending())
            .finish()
    }
}
