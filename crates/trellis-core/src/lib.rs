#![doc = r"Reconciliation engine: a persistent build tree of components and the commit tree derived from it."]

mod build;
pub mod commit;
pub mod component;
pub mod context;
pub mod error;
pub mod finders;
pub mod frame;
pub mod instrumentation;
mod node;
pub mod owned;
pub mod run;
pub mod suspense;
pub mod ui;

pub use commit::{ChildOp, ChildrenDiff, Committer, NoopCommitter};
pub use component::{Component, ComponentType, ComponentTypeCell};
pub use context::{CommitterHandle, RenderCx, StateHandle};
pub use error::{Error, Result};
pub use finders::{
    find_ancestor, find_descendant, find_descendant_by_name, find_descendant_of_type,
    find_descendants_of_type,
};
pub use frame::{FrameCallback, FrameQueue, FrameScheduler};
pub use node::{AppNode, DirtyState, WeakNode};
pub use owned::Owned;
pub use run::{run, run_with, App, RunConfig};
pub use suspense::{
    generator_phase, pump_generator, Generator, GeneratorPhase, ResumeFn, Step, Suspender,
    Suspension,
};
pub use ui::{Descriptor, StateRequirement, Ui};

#[cfg(test)]
#[path = "tests/support.rs"]
mod support;

#[cfg(test)]
#[path = "tests/build_tests.rs"]
mod build_tests;

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod commit_tests;

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod protocol_tests;

#[cfg(test)]
#[path = "tests/suspense_tests.rs"]
mod suspense_tests;

#[cfg(test)]
#[path = "tests/scheduling_tests.rs"]
mod scheduling_tests;
