//! Suspension: components that produce output over time.
//!
//! A generator-driven component keeps a [`Generator`] in its node state. The
//! generator yields UI until it hands out a [`Suspender`]; the node then waits
//! for the suspender to resume it, pumps the generator again and rebuilds.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::component::Component;
use crate::error::{Error, Result};
use crate::node::{AppNode, WeakNode};
use crate::owned::Owned;
use crate::ui::Ui;

/// Called by a suspender's provider when the awaited event happened.
pub type ResumeFn = Box<dyn FnOnce()>;

type Schedule = Box<dyn FnOnce(ResumeFn) -> Box<dyn FnOnce()>>;

/// A not yet started wait on some external event.
///
/// `schedule` receives the resume callback and returns a token of the
/// provider's choosing. `unschedule` receives that token back if the wait is
/// cancelled before it resumed.
pub struct Suspender {
    schedule: Schedule,
}

impl Suspender {
    pub fn new<T: 'static>(
        schedule: impl FnOnce(ResumeFn) -> T + 'static,
        unschedule: impl FnOnce(T) + 'static,
    ) -> Self {
        Self {
            schedule: Box::new(move |resume: ResumeFn| {
                let token = schedule(resume);
                let cancel: Box<dyn FnOnce()> = Box::new(move || unschedule(token));
                cancel
            }),
        }
    }

    /// Starts waiting. `on_resume` runs at most once, and never after the
    /// returned [`Suspension`] was cancelled or dropped.
    pub fn suspend(self, on_resume: impl FnOnce() + 'static) -> Suspension {
        let resumed = Rc::new(Cell::new(false));
        let cancelled = Rc::new(Cell::new(false));
        let resume: ResumeFn = {
            let resumed = Rc::clone(&resumed);
            let cancelled = Rc::clone(&cancelled);
            Box::new(move || {
                if cancelled.get() || resumed.replace(true) {
                    return;
                }
                on_resume();
            })
        };
        let cancel = (self.schedule)(resume);
        Suspension {
            cancel: Some(cancel),
            resumed,
            cancelled,
        }
    }
}

impl fmt::Debug for Suspender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspender").finish_non_exhaustive()
    }
}

/// An active wait. Cancels itself when dropped.
pub struct Suspension {
    cancel: Option<Box<dyn FnOnce()>>,
    resumed: Rc<Cell<bool>>,
    cancelled: Rc<Cell<bool>>,
}

impl Suspension {
    pub fn is_resumed(&self) -> bool {
        self.resumed.get()
    }

    /// Unschedules the wait unless it already resumed.
    pub fn cancel(mut self) {
        self.cancel_now();
    }

    /// Forgets the wait without unscheduling it.
    pub(crate) fn disarm(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            if !self.resumed.get() {
                self.cancelled.set(true);
                cancel();
            }
        }
    }
}

impl Drop for Suspension {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("resumed", &self.resumed.get())
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}

/// What a generator produced on one resume.
pub enum Step {
    /// New output; the generator is resumed again right away.
    Yield(Ui),
    /// Wait for the suspender before resuming.
    Suspend(Suspender),
    /// Finished. `None` keeps the last yielded output.
    Complete(Option<Ui>),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Yield(ui) => f.debug_tuple("Yield").field(ui).finish(),
            Step::Suspend(_) => f.write_str("Suspend"),
            Step::Complete(ui) => f.debug_tuple("Complete").field(ui).finish(),
        }
    }
}

pub trait Generator {
    fn resume(&mut self) -> Step;
}

impl<F: FnMut() -> Step> Generator for F {
    fn resume(&mut self) -> Step {
        self()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorPhase {
    Running,
    Suspended,
    Done,
}

struct ActiveSuspension {
    id: u64,
    suspension: Suspension,
}

pub(crate) struct GeneratorState {
    generator: Box<dyn Generator>,
    latest: Ui,
    phase: GeneratorPhase,
    started: bool,
    active: Option<ActiveSuspension>,
    last_id: u64,
}

impl GeneratorState {
    fn new(generator: Box<dyn Generator>) -> Self {
        Self {
            generator,
            latest: Ui::Empty,
            phase: GeneratorPhase::Running,
            started: false,
            active: None,
            last_id: 0,
        }
    }
}

impl fmt::Debug for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.phase, self.latest)
    }
}

impl<A: 'static> Component<A> {
    /// Defines a component driven by a generator. `make` creates the
    /// generator from the arguments of the node's first render; later
    /// arguments are ignored.
    pub fn generator<G: Generator + 'static>(
        name: &'static str,
        make: impl Fn(&A) -> G + 'static,
    ) -> Self {
        Component::stateful(name, move |cx, args| {
            let node = cx.node().clone();
            let state = cx.state(|| GeneratorState::new(Box::new(make(args))))?;
            let first = state.update(|state| !std::mem::replace(&mut state.started, true));
            if first {
                if let Some(owned) = node.owned_state::<GeneratorState>() {
                    pump(&node, &owned);
                }
            }
            Ok(state.with(|state| state.latest.clone()))
        })
    }
}

fn pump(node: &AppNode, state: &Owned<GeneratorState>) {
    loop {
        let step = state.update(|state| state.generator.resume());
        match step {
            Step::Yield(ui) => state.update(|state| state.latest = ui),
            Step::Complete(ui) => {
                let previous = state.update(|state| {
                    if let Some(ui) = ui {
                        state.latest = ui;
                    }
                    state.phase = GeneratorPhase::Done;
                    state.active.take()
                });
                drop(previous);
                return;
            }
            Step::Suspend(suspender) => {
                let (id, previous) = state.update(|state| {
                    state.last_id += 1;
                    state.phase = GeneratorPhase::Suspended;
                    (state.last_id, state.active.take())
                });
                drop(previous);

                let early = Rc::new(Cell::new(false));
                let suspension = {
                    let node = node.downgrade();
                    let early = Rc::clone(&early);
                    suspender.suspend(move || resume(&node, id, &early))
                };
                if early.get() {
                    // Resumed before `suspend` returned.
                    suspension.disarm();
                    state.update(|state| state.phase = GeneratorPhase::Running);
                    continue;
                }
                state.update(|state| state.active = Some(ActiveSuspension { id, suspension }));
                return;
            }
        }
    }
}

enum Resumed {
    Stale,
    Early,
    Pump(ActiveSuspension),
}

fn resume(node: &WeakNode, id: u64, early: &Cell<bool>) {
    let Some(node) = node.upgrade() else {
        return;
    };
    if node.is_detached() {
        return;
    }
    let Some(state) = node.owned_state::<GeneratorState>() else {
        return;
    };
    let resumed = state.try_update(|state| {
        if state.last_id != id || state.phase != GeneratorPhase::Suspended {
            return Resumed::Stale;
        }
        match state.active.take() {
            Some(active) => {
                state.phase = GeneratorPhase::Running;
                Resumed::Pump(active)
            }
            None => Resumed::Early,
        }
    });
    match resumed {
        Some(Resumed::Pump(active)) => {
            active.suspension.disarm();
            pump(&node, &state);
            if let Err(err) = node.rebuild() {
                log::error!("rebuild of `{}` after resume failed: {err}", node.name());
            }
        }
        Some(Resumed::Early) => early.set(true),
        Some(Resumed::Stale) => {
            log::trace!("ignoring stale resume of `{}`", node.name());
        }
        None => log::warn!("`{}` resumed while its generator was running", node.name()),
    }
}

/// Cancels `node`'s active wait, resumes its generator right away and
/// rebuilds it.
pub fn pump_generator(node: &AppNode) -> Result<()> {
    let state = node
        .owned_state::<GeneratorState>()
        .ok_or(Error::StateTypeMismatch {
            component: node.name(),
            expected: std::any::type_name::<GeneratorState>(),
        })?;
    let (done, previous) = state.update(|state| {
        let previous = state.active.take();
        if state.phase != GeneratorPhase::Done {
            state.phase = GeneratorPhase::Running;
        }
        (state.phase == GeneratorPhase::Done, previous)
    });
    if let Some(previous) = previous {
        previous.suspension.cancel();
    }
    if done {
        return Ok(());
    }
    pump(node, &state);
    node.rebuild()
}

pub fn generator_phase(node: &AppNode) -> Option<GeneratorPhase> {
    node.with_state(|state: &GeneratorState| state.phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn manual() -> (Suspender, Rc<RefCell<Option<ResumeFn>>>, Rc<Cell<u32>>) {
        let slot: Rc<RefCell<Option<ResumeFn>>> = Rc::new(RefCell::new(None));
        let cancelled = Rc::new(Cell::new(0));
        let store = Rc::clone(&slot);
        let count = Rc::clone(&cancelled);
        let suspender = Suspender::new(
            move |resume| {
                *store.borrow_mut() = Some(resume);
            },
            move |()| count.set(count.get() + 1),
        );
        (suspender, slot, cancelled)
    }

    #[test]
    fn resume_runs_once() {
        let (suspender, slot, _) = manual();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let suspension = suspender.suspend(move || counter.set(counter.get() + 1));
        let resume = slot.borrow_mut().take();
        if let Some(resume) = resume {
            resume();
        }
        assert_eq!(hits.get(), 1);
        assert!(suspension.is_resumed());
    }

    #[test]
    fn drop_cancels_unresumed_suspension() {
        let (suspender, slot, cancelled) = manual();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        drop(suspender.suspend(move || counter.set(counter.get() + 1)));
        assert_eq!(cancelled.get(), 1);

        // A provider that fires anyway reaches nobody.
        let resume = slot.borrow_mut().take();
        if let Some(resume) = resume {
            resume();
        }
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn cancel_after_resume_is_a_no_op() {
        let (suspender, slot, cancelled) = manual();
        let suspension = suspender.suspend(|| {});
        let resume = slot.borrow_mut().take();
        if let Some(resume) = resume {
            resume();
        }
        suspension.cancel();
        assert_eq!(cancelled.get(), 0);
    }
}
