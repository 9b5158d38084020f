//! Components and committers shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{ChildOp, ChildrenDiff, Committer, Component, Result, Ui};

pub(crate) type Log = Rc<RefCell<Vec<String>>>;

pub(crate) fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

/// Commits `"{label}#{generation}"`; every amend bumps the generation, so
/// each amend yields a value that differs from the last one.
pub(crate) struct LabelCommitter {
    pub(crate) label: String,
    /// Ops of the last children diff.
    pub(crate) last_ops: Vec<ChildOp<String>>,
    generation: u32,
    log: Log,
}

impl LabelCommitter {
    pub(crate) fn new(label: impl Into<String>, log: &Log) -> Self {
        Self {
            label: label.into(),
            last_ops: Vec::new(),
            generation: 0,
            log: Rc::clone(log),
        }
    }

    fn value(&self) -> String {
        format!("{}#{}", self.label, self.generation)
    }
}

impl Committer for LabelCommitter {
    type Commit = String;

    fn initial(&mut self) -> Result<String> {
        self.log.borrow_mut().push(format!("initial {}", self.label));
        Ok(self.value())
    }

    fn amend(&mut self, _last: String) -> Result<String> {
        self.generation += 1;
        self.log.borrow_mut().push(format!("amend {}", self.label));
        Ok(self.value())
    }

    fn amend_children(&mut self, commit: String, diff: &ChildrenDiff<String>) -> Result<String> {
        self.log
            .borrow_mut()
            .push(format!("children {} {:?}", self.label, diff.children()));
        self.last_ops = diff.ops().to_vec();
        Ok(commit)
    }
}

/// A committer component that renders `children` below itself.
pub(crate) fn labeled(log: &Log) -> Component<(&'static str, Ui)> {
    let log = Rc::clone(log);
    Component::stateful("labeled", move |cx, (label, children): &(&'static str, Ui)| {
        let committer = cx.committer(|| LabelCommitter::new(*label, &log))?;
        if committer.with(|committer| committer.label != *label) {
            committer.update(|committer| committer.label = label.to_string());
        }
        Ok(children.clone())
    })
}

/// Stateless pass-through that counts its renders.
pub(crate) fn passthrough(name: &'static str) -> (Component<Ui>, Rc<Cell<u32>>) {
    let renders = Rc::new(Cell::new(0));
    let count = Rc::clone(&renders);
    let component = Component::stateless(name, move |_cx, children: &Ui| {
        count.set(count.get() + 1);
        Ok(children.clone())
    });
    (component, renders)
}

/// Stateful counter: its state is the number of times it rendered.
pub(crate) fn counter(name: &'static str) -> Component<Ui> {
    Component::stateful(name, |cx, children: &Ui| {
        let count = cx.state(|| 0u32)?;
        count.update(|count| *count += 1);
        Ok(children.clone())
    })
}
