//! Standard runtime services backed by Rust's `std` library.
//!
//! [`StdRuntime`] bundles the frame queue a tree schedules its passes on with
//! the timers and animation frames that suspending components wait for. A
//! host loop calls [`StdRuntime::tick`] once per display refresh.

mod timers;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use trellis_core::{
    Component, FrameQueue, ResumeFn, Result, RunConfig, Step, Suspender, Ui,
};

pub use timers::{AnimationFrames, TimerId, Timers};

/// Clock implementation backed by [`std::time`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdClock;

impl StdClock {
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    pub fn elapsed(&self, since: Instant) -> Duration {
        since.elapsed()
    }
}

/// Frame queue, timers and animation frames sharing one notion of "now".
///
/// Time only advances through [`StdRuntime::tick`], so everything scheduled
/// between two ticks is measured from the same instant.
#[derive(Clone)]
pub struct StdRuntime {
    frames: FrameQueue,
    timers: Timers,
    animation_frames: AnimationFrames,
    clock: StdClock,
    now: Rc<Cell<Instant>>,
}

impl StdRuntime {
    pub fn new() -> Self {
        let clock = StdClock;
        Self {
            frames: FrameQueue::new(),
            timers: Timers::new(),
            animation_frames: AnimationFrames::new(),
            now: Rc::new(Cell::new(clock.now())),
            clock,
        }
    }

    /// Run configuration that schedules passes on this runtime's queue.
    pub fn run_config(&self) -> RunConfig {
        RunConfig::default().frames(self.frames.clone())
    }

    pub fn frames(&self) -> &FrameQueue {
        &self.frames
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn animation_frames(&self) -> &AnimationFrames {
        &self.animation_frames
    }

    pub fn clock(&self) -> StdClock {
        self.clock
    }

    /// Time of the last tick.
    pub fn now(&self) -> Instant {
        self.now.get()
    }

    /// Suspends until `duration` after the tick the wait starts in.
    pub fn sleep(&self, duration: Duration) -> Suspender {
        let schedule = self.clone();
        let timers = self.timers.clone();
        Suspender::new(
            move |resume: ResumeFn| schedule.timers.schedule(schedule.now() + duration, resume),
            move |id| {
                timers.cancel(id);
            },
        )
    }

    /// Suspends until the next tick.
    pub fn animation_frame(&self) -> Suspender {
        let request = self.animation_frames.clone();
        let cancel = self.animation_frames.clone();
        Suspender::new(
            move |resume: ResumeFn| request.request(resume),
            move |id| {
                cancel.cancel(id);
            },
        )
    }

    /// Advances time to `now`, fires due timers, then animation frames, then
    /// the passes they scheduled.
    pub fn tick(&self, now: Instant) -> Result<()> {
        if now > self.now.get() {
            self.now.set(now);
        }
        let timers = self.timers.fire_due(self.now.get());
        let animation_frames = self.animation_frames.fire();
        let passes = self.frames.run_pending()?;
        log::trace!("tick: {timers} timers, {animation_frames} animation frames, {passes} passes");
        Ok(())
    }

    /// Ticks at the wall clock's current time.
    pub fn tick_now(&self) -> Result<()> {
        self.tick(self.clock.now())
    }

    /// True when a tick would have something to do.
    pub fn has_pending_work(&self) -> bool {
        self.frames.has_pending() || !self.animation_frames.is_empty() || !self.timers.is_empty()
    }

    /// Earliest instant a tick is needed at. `None` while idle.
    pub fn next_wakeup(&self) -> Option<Instant> {
        if self.frames.has_pending() || !self.animation_frames.is_empty() {
            return Some(self.now());
        }
        self.timers.next_deadline()
    }

    /// Defines a component that renders `render(args, elapsed)` once per
    /// tick, forever. `elapsed` counts from the component's first render.
    pub fn animating<A: Clone + 'static>(
        &self,
        name: &'static str,
        render: impl Fn(&A, Duration) -> Ui + 'static,
    ) -> Component<A> {
        let runtime = self.clone();
        let render = Rc::new(render);
        Component::generator(name, move |args: &A| {
            let runtime = runtime.clone();
            let render = Rc::clone(&render);
            let args = args.clone();
            let start = runtime.now();
            let mut yielded = false;
            move || {
                yielded = !yielded;
                if yielded {
                    let elapsed = runtime.now().saturating_duration_since(start);
                    Step::Yield(render(&args, elapsed))
                } else {
                    Step::Suspend(runtime.animation_frame())
                }
            }
        })
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("frames", &self.frames)
            .field("timers", &self.timers)
            .field("animation_frames", &self.animation_frames)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
