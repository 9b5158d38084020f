use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::support::counter;
use crate::*;

fn counted_pair() -> (Component<Ui>, Component<Ui>, Component<()>) {
    let left = counter("left");
    let right = counter("right");
    let app = {
        let (left, right) = (left.clone(), right.clone());
        Component::stateless("app", move |_cx, _: &()| {
            Ok(Ui::multi([left.call(Ui::Empty), right.call(Ui::Empty)]))
        })
    };
    (left, right, app)
}

#[test]
fn many_rebuilds_share_one_frame() {
    let (left, right, app) = counted_pair();
    let frames = FrameQueue::new();
    let root = run_with(app.call(()), NoopCommitter, RunConfig::default().frames(frames.clone()))
        .expect("first pass");
    let left_node = find_descendant_of_type(&root, left.component_type()).expect("left");
    let right_node = find_descendant_of_type(&root, right.component_type()).expect("right");

    left_node.rebuild().expect("rebuild left");
    right_node.rebuild().expect("rebuild right");
    left_node.rebuild().expect("rebuild left again");
    assert_eq!(frames.len(), 1);
    assert!(root.is_rebuild_scheduled());

    assert_eq!(frames.run_pending(), Ok(1));
    assert!(!root.is_rebuild_scheduled());
    assert_eq!(left_node.state::<u32>(), Some(2));
    assert_eq!(right_node.state::<u32>(), Some(2));

    right_node.rebuild().expect("rebuild right");
    assert_eq!(frames.len(), 1);
    frames.run_pending().expect("frame");
    assert_eq!(left_node.state::<u32>(), Some(2));
    assert_eq!(right_node.state::<u32>(), Some(3));
}

#[test]
fn immediate_rebuild_runs_without_a_frame() {
    let (left, _, app) = counted_pair();
    let frames = FrameQueue::new();
    let root = run_with(app.call(()), NoopCommitter, RunConfig::default().frames(frames.clone()))
        .expect("first pass");
    let left_node = find_descendant_of_type(&root, left.component_type()).expect("left");

    left_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("pass");
    assert_eq!(left_node.state::<u32>(), Some(2));
    assert!(!root.is_rebuild_scheduled());

    // The queued frame finds nothing left to do.
    frames.run_pending().expect("stale frame");
    assert_eq!(left_node.state::<u32>(), Some(2));

    // A new request queues a new frame.
    left_node.rebuild().expect("rebuild");
    assert_eq!(frames.len(), 1);
}

#[test]
fn frame_scheduler_can_be_swapped() {
    let (left, _, app) = counted_pair();
    let root = run(app.call(()), NoopCommitter).expect("first pass");
    let left_node = find_descendant_of_type(&root, left.component_type()).expect("left");

    let parked: Rc<RefCell<Vec<FrameCallback>>> = Rc::default();
    let sink = Rc::clone(&parked);
    root.set_frame_scheduler(move |callback: FrameCallback| sink.borrow_mut().push(callback))
        .expect("root");

    left_node.rebuild().expect("rebuild");
    let callbacks = std::mem::take(&mut *parked.borrow_mut());
    assert_eq!(callbacks.len(), 1);
    for callback in callbacks {
        callback().expect("pass");
    }
    assert_eq!(left_node.state::<u32>(), Some(2));
}

#[test]
fn frames_for_a_dropped_tree_do_nothing() {
    let (left, _, app) = counted_pair();
    let frames = FrameQueue::new();
    let root = run_with(app.call(()), NoopCommitter, RunConfig::default().frames(frames.clone()))
        .expect("first pass");
    let left_node = find_descendant_of_type(&root, left.component_type()).expect("left");
    left_node.rebuild().expect("rebuild");
    drop(left_node);
    drop(root);

    assert_eq!(frames.run_pending(), Ok(1));
}

#[test]
fn pass_errors_reach_the_frame_driver() {
    let fail = Rc::new(Cell::new(false));
    let flaky = {
        let fail = Rc::clone(&fail);
        Component::stateless("flaky", move |_cx, _: &()| {
            if fail.get() {
                Err(Error::backend("flaky render"))
            } else {
                Ok(Ui::Empty)
            }
        })
    };
    let frames = FrameQueue::new();
    let root = run_with(flaky.call(()), NoopCommitter, RunConfig::default().frames(frames.clone()))
        .expect("first pass");

    fail.set(true);
    root.child(0).expect("flaky").rebuild().expect("rebuild");
    assert_eq!(
        frames.run_pending(),
        Err(Error::Backend("flaky render".into()))
    );
}

#[test]
fn passes_are_counted() {
    let (left, _, app) = counted_pair();
    let root = run_with(app.call(()), NoopCommitter, RunConfig::default().report_interval(0))
        .expect("first pass");
    let left_node = find_descendant_of_type(&root, left.component_type()).expect("left");
    instrumentation::reset_stats();

    left_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("pass");

    // root and app are walked through, right is skipped, left renders.
    let build = instrumentation::build_stats();
    assert_eq!(build, instrumentation::SkipStats { hits: 1, skips: 3 });
    let commit = instrumentation::commit_stats();
    assert_eq!(commit.total(), 1);
}
