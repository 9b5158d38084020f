use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::build::build;
use crate::commit::{commit, Committer, CommitterCell};
use crate::error::{Error, Result};
use crate::frame::{FrameQueue, FrameScheduler};
use crate::instrumentation;
use crate::node::AppNode;
use crate::owned::Owned;
use crate::ui::{Descriptor, Ui};

type CommitPass = Box<dyn Fn(&AppNode) -> Result<()>>;

/// Scheduling state carried by the root node only.
pub(crate) struct RootState {
    scheduled: Cell<bool>,
    frames: RefCell<Rc<dyn FrameScheduler>>,
    commit_pass: CommitPass,
}

impl fmt::Debug for RootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootState")
            .field("scheduled", &self.scheduled.get())
            .finish_non_exhaustive()
    }
}

/// Runtime options for [`run_with`].
pub struct RunConfig {
    frames: Rc<dyn FrameScheduler>,
    report_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: Rc::new(FrameQueue::new()),
            report_interval: instrumentation::DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl RunConfig {
    /// Where scheduled passes are deferred to. Defaults to a private
    /// [`FrameQueue`], leaving [`AppNode::immediate_rebuild`] as the only way
    /// to run a pass.
    pub fn frames(mut self, frames: impl FrameScheduler + 'static) -> Self {
        self.frames = Rc::new(frames);
        self
    }

    /// Build and commit samples between two skip-rate log lines.
    pub fn report_interval(mut self, samples: u64) -> Self {
        self.report_interval = samples;
        self
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("report_interval", &self.report_interval)
            .finish_non_exhaustive()
    }
}

/// What the root renders: a closure deriving the app, or a fixed [`Ui`].
///
/// Every root render yields fresh descriptors, so `root.rebuild()` renders
/// the top-level components again. A fixed `Ui` keeps its arguments; only a
/// closure re-evaluates them.
pub trait App: 'static {
    fn render(&self) -> Ui;
}

impl<F> App for F
where
    F: Fn() -> Ui + 'static,
{
    fn render(&self) -> Ui {
        self()
    }
}

impl App for Ui {
    fn render(&self) -> Ui {
        self.reissue()
    }
}

/// Mounts `app` under `root_committer` and runs the first pass.
pub fn run<C: Committer>(app: impl App, root_committer: C) -> Result<AppNode> {
    run_with(app, root_committer, RunConfig::default())
}

pub fn run_with<C: Committer>(
    app: impl App,
    root_committer: C,
    config: RunConfig,
) -> Result<AppNode> {
    instrumentation::set_report_interval(config.report_interval);

    let root = AppNode::new_root(Descriptor::untyped(move |_cx| Ok(app.render())));
    root.attach_committer(CommitterCell::new(Owned::new(root_committer)));
    root.attach_root_state(RootState {
        scheduled: Cell::new(false),
        frames: RefCell::new(config.frames),
        commit_pass: Box::new(|root: &AppNode| commit::<C::Commit>(root).map(drop)),
    });
    run_pass(&root)?;
    Ok(root)
}

fn run_pass(root: &AppNode) -> Result<()> {
    let state = root.root_state().ok_or(Error::NotRoot)?;
    state.scheduled.set(false);
    log::trace!("build pass");
    build(root)?;
    log::trace!("commit pass");
    (state.commit_pass)(root)
}

impl AppNode {
    fn scheduling_state(&self) -> Result<&RootState> {
        if !self.is_root() {
            return Err(Error::NotRoot);
        }
        self.root_state().ok_or(Error::NotRoot)
    }

    /// Queues one build and commit pass on the frame scheduler. Further calls
    /// before that pass runs are absorbed.
    pub fn schedule_rebuild(&self) -> Result<()> {
        let state = self.scheduling_state()?;
        if state.scheduled.replace(true) {
            log::trace!("pass already scheduled");
            return Ok(());
        }
        let root = self.downgrade();
        let frames = Rc::clone(&state.frames.borrow());
        frames.schedule_frame(Box::new(move || match root.upgrade() {
            Some(root) => run_pass(&root),
            None => Ok(()),
        }));
        Ok(())
    }

    /// Runs a build and commit pass right away.
    pub fn immediate_rebuild(&self) -> Result<()> {
        self.scheduling_state()?;
        run_pass(self)
    }

    /// True while a pass is queued and has not started yet.
    pub fn is_rebuild_scheduled(&self) -> bool {
        self.root_state()
            .is_some_and(|state| state.scheduled.get())
    }

    pub fn set_frame_scheduler(&self, frames: impl FrameScheduler + 'static) -> Result<()> {
        let state = self.scheduling_state()?;
        *state.frames.borrow_mut() = Rc::new(frames);
        Ok(())
    }
}
