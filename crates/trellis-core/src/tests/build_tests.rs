use std::cell::Cell;
use std::rc::Rc;

use crate::support::{counter, passthrough};
use crate::*;

fn leaf(name: &'static str) -> Component<()> {
    Component::stateless(name, |_cx, _: &()| Ok(Ui::Empty))
}

#[test]
fn nested_sequences_flatten_into_one_child_list() {
    let a = leaf("a");
    let b = leaf("b");
    let c = leaf("c");

    let flat = run(Ui::multi([a.call(()), b.call(()), c.call(())]), NoopCommitter)
        .expect("flat tree");
    let nested = run(
        Ui::multi([a.call(()), Ui::multi([b.call(()), c.call(())])]),
        NoopCommitter,
    )
    .expect("nested tree");

    assert_eq!(flat.dump_tree(), nested.dump_tree());
    assert_eq!(nested.child_count(), 3);
    assert_eq!(nested.child(2).map(|node| node.name()), Some("c"));
}

#[test]
fn empty_items_keep_their_position() {
    let a = leaf("a");
    let b = leaf("b");
    let c = leaf("c");

    let root = run(
        Ui::multi([
            a.call(()),
            Ui::multi(Vec::<Ui>::new()),
            Ui::multi([b.call(()), Ui::Empty]),
            Ui::multi([Ui::multi([c.call(())])]),
        ]),
        NoopCommitter,
    )
    .expect("tree");

    let names: Vec<Option<&str>> = root
        .children()
        .iter()
        .map(|child| child.as_ref().map(AppNode::name))
        .collect();
    assert_eq!(names, vec![Some("a"), Some("b"), None, Some("c")]);
}

#[test]
fn single_output_produces_one_position() {
    let a = leaf("a");
    let empty = run(Ui::Empty, NoopCommitter).expect("empty tree");
    assert_eq!(empty.child_count(), 1);
    assert!(empty.child(0).is_none());

    let single = run(a.call(()), NoopCommitter).expect("single tree");
    assert_eq!(single.child_count(), 1);
    let a_node = single.child(0).expect("a");
    assert_eq!(a_node.child_count(), 1);
    assert!(a_node.child(0).is_none());
    assert_eq!(single.dump_tree(), "anonymous [committer]\n  a\n    -\n");
}

#[test]
fn shrinking_output_truncates_and_detaches() {
    let item = leaf("item");
    let wide = Rc::new(Cell::new(true));
    let list = {
        let item = item.clone();
        let wide = Rc::clone(&wide);
        Component::stateless("list", move |_cx, _: &()| {
            let count = if wide.get() { 3 } else { 1 };
            Ok(Ui::multi((0..count).map(|_| item.call(()))))
        })
    };

    let root = run(list.call(()), NoopCommitter).expect("first pass");
    let list_node = root.child(0).expect("list node");
    assert_eq!(list_node.child_count(), 3);
    let removed = list_node.child(2).expect("third item");

    wide.set(false);
    list_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("second pass");

    assert_eq!(list_node.child_count(), 1);
    assert!(removed.is_detached());
    assert!(!list_node.child(0).expect("first item").is_detached());
}

#[test]
fn changing_type_replaces_the_node() {
    let first = counter("first");
    let second = counter("second");
    let use_second = Rc::new(Cell::new(false));
    let switch = {
        let (first, second) = (first.clone(), second.clone());
        let use_second = Rc::clone(&use_second);
        Component::stateless("switch", move |_cx, _: &()| {
            Ok(if use_second.get() {
                second.call(Ui::Empty)
            } else {
                first.call(Ui::Empty)
            })
        })
    };

    let root = run(switch.call(()), NoopCommitter).expect("first pass");
    let switch_node = root.child(0).expect("switch node");
    let old = switch_node.child(0).expect("first counter");
    assert_eq!(old.state::<u32>(), Some(1));

    use_second.set(true);
    switch_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("second pass");

    let new = switch_node.child(0).expect("second counter");
    assert!(!new.ptr_eq(&old));
    assert_eq!(new.name(), "second");
    assert_eq!(new.state::<u32>(), Some(1));
    assert!(old.is_detached());
    assert!(!old.has_state());

    // Stale handles can still be poked without effect.
    old.rebuild().expect("detached rebuild");
    assert!(!root.is_rebuild_scheduled());
}

#[test]
fn same_type_with_new_arguments_reuses_the_node() {
    let count = counter("count");
    let label = Rc::new(Cell::new(0u32));
    let holder = {
        let count = count.clone();
        let label = Rc::clone(&label);
        Component::stateless("holder", move |_cx, _: &()| {
            let inner = if label.get() == 0 {
                Ui::Empty
            } else {
                Ui::multi([Ui::Empty])
            };
            Ok(count.call(inner))
        })
    };

    let root = run(holder.call(()), NoopCommitter).expect("first pass");
    let holder_node = root.child(0).expect("holder");
    let count_node = holder_node.child(0).expect("count");

    label.set(1);
    holder_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("second pass");

    let after = holder_node.child(0).expect("count after");
    assert!(after.ptr_eq(&count_node));
    assert_eq!(after.state::<u32>(), Some(2));
}

#[test]
fn state_survives_rebuilds_from_any_ancestor() {
    let outer = counter("outer");
    let inner = counter("inner");
    let app = {
        let (outer, inner) = (outer.clone(), inner.clone());
        Component::stateful("app", move |cx, _: &()| {
            cx.state(|| ())?;
            Ok(outer.call(inner.call(Ui::Empty)))
        })
    };

    let root = run(app.call(()), NoopCommitter).expect("first pass");
    let app_node = find_descendant_by_name(&root, "app").expect("app");
    let outer_node = find_descendant_of_type(&root, outer.component_type()).expect("outer");
    let inner_node = find_descendant_of_type(&root, inner.component_type()).expect("inner");
    assert_eq!(outer_node.state::<u32>(), Some(1));
    assert_eq!(inner_node.state::<u32>(), Some(1));

    app_node.rebuild().expect("rebuild app");
    root.immediate_rebuild().expect("pass");
    assert!(find_descendant_of_type(&root, outer.component_type())
        .is_some_and(|node| node.ptr_eq(&outer_node)));
    assert_eq!(outer_node.state::<u32>(), Some(2));
    assert_eq!(inner_node.state::<u32>(), Some(2));

    outer_node.rebuild().expect("rebuild outer");
    root.immediate_rebuild().expect("pass");
    assert_eq!(outer_node.state::<u32>(), Some(3));
    // The inner descriptor was created by `app` and passed through unchanged.
    assert_eq!(inner_node.state::<u32>(), Some(2));

    inner_node.rebuild().expect("rebuild inner");
    root.immediate_rebuild().expect("pass");
    assert_eq!(outer_node.state::<u32>(), Some(3));
    assert_eq!(inner_node.state::<u32>(), Some(3));
}

#[test]
fn root_rebuild_renders_a_derived_app_again() {
    let double = Component::stateful("double_counter", |cx, _: &()| {
        let count = cx.state(|| 0u32)?;
        count.update(|count| *count += 2);
        Ok(Ui::Empty)
    });
    let counter = {
        let double = double.clone();
        Component::stateful("counter", move |cx, _: &()| {
            let count = cx.state(|| 0u32)?;
            count.update(|count| *count += 1);
            Ok(double.call(()))
        })
    };
    let app = {
        let counter = counter.clone();
        Component::stateful("app", move |cx, _: &()| {
            cx.state(|| ())?;
            Ok(counter.call(()))
        })
    };

    let frames = FrameQueue::new();
    let root = run_with(
        move || app.call(()),
        NoopCommitter,
        RunConfig::default().frames(frames.clone()),
    )
    .expect("first pass");
    let counter_node = find_descendant_of_type(&root, counter.component_type()).expect("counter");
    let double_node = find_descendant_of_type(&root, double.component_type()).expect("double");
    assert_eq!(counter_node.state::<u32>(), Some(1));
    assert_eq!(double_node.state::<u32>(), Some(2));

    root.rebuild().expect("rebuild root");
    assert_eq!(frames.run_pending(), Ok(1));
    assert!(find_descendant_of_type(&root, counter.component_type())
        .is_some_and(|node| node.ptr_eq(&counter_node)));
    assert!(find_descendant_of_type(&root, double.component_type())
        .is_some_and(|node| node.ptr_eq(&double_node)));
    assert_eq!(counter_node.state::<u32>(), Some(2));
    assert_eq!(double_node.state::<u32>(), Some(4));

    counter_node.rebuild().expect("rebuild counter");
    assert_eq!(frames.run_pending(), Ok(1));
    assert_eq!(counter_node.state::<u32>(), Some(3));
    assert_eq!(double_node.state::<u32>(), Some(6));

    double_node.rebuild().expect("rebuild double");
    assert_eq!(frames.run_pending(), Ok(1));
    assert_eq!(counter_node.state::<u32>(), Some(3));
    assert_eq!(double_node.state::<u32>(), Some(8));
}

#[test]
fn root_rebuild_renders_a_fixed_app_again() {
    let count = counter("count");
    let root = run(count.call(Ui::Empty), NoopCommitter).expect("first pass");
    let node = root.child(0).expect("count");

    for _ in 0..2 {
        root.rebuild().expect("rebuild root");
        root.immediate_rebuild().expect("pass");
    }

    assert!(root.child(0).is_some_and(|current| current.ptr_eq(&node)));
    assert_eq!(node.state::<u32>(), Some(3));
}

#[test]
fn siblings_of_the_rebuilt_path_do_not_render() {
    let (left, left_renders) = passthrough("left");
    let (right, right_renders) = passthrough("right");
    let target = counter("target");
    let app = {
        let (left, right, target) = (left.clone(), right.clone(), target.clone());
        Component::stateless("app", move |_cx, _: &()| {
            Ok(Ui::multi([
                left.call(target.call(Ui::Empty)),
                right.call(Ui::Empty),
            ]))
        })
    };

    let root = run(app.call(()), NoopCommitter).expect("first pass");
    let target_node = find_descendant_of_type(&root, target.component_type()).expect("target");
    assert_eq!((left_renders.get(), right_renders.get()), (1, 1));

    target_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("pass");

    assert_eq!(target_node.state::<u32>(), Some(2));
    assert_eq!((left_renders.get(), right_renders.get()), (1, 1));
    assert_eq!(target_node.dirty(), DirtyState::Clean);
}

#[test]
fn rebuilding_a_parent_leaves_passed_in_children_alone() {
    let owned = counter("owned");
    let passed = counter("passed");
    let parent = {
        let owned = owned.clone();
        Component::stateful("parent", move |cx, child: &Ui| {
            cx.state(|| ())?;
            Ok(Ui::multi([owned.call(Ui::Empty), child.clone()]))
        })
    };

    let root = run(parent.call(passed.call(Ui::Empty)), NoopCommitter).expect("first pass");
    let parent_node = find_descendant_by_name(&root, "parent").expect("parent");
    let owned_node = find_descendant_of_type(&root, owned.component_type()).expect("owned");
    let passed_node = find_descendant_of_type(&root, passed.component_type()).expect("passed");

    parent_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("pass");

    assert_eq!(owned_node.state::<u32>(), Some(2));
    assert_eq!(passed_node.state::<u32>(), Some(1));
}

#[test]
fn untyped_descriptors_are_always_fresh() {
    let make = Rc::new(Cell::new(0u32));
    let app = {
        let make = Rc::clone(&make);
        Component::stateless("app", move |_cx, _: &()| {
            let make = Rc::clone(&make);
            Ok(Descriptor::untyped(move |_cx| {
                make.set(make.get() + 1);
                Ok(Ui::Empty)
            })
            .into())
        })
    };

    let root = run(app.call(()), NoopCommitter).expect("first pass");
    let app_node = root.child(0).expect("app");
    let first = app_node.child(0).expect("inline");

    app_node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("pass");

    let second = app_node.child(0).expect("inline again");
    assert!(!first.ptr_eq(&second));
    assert!(first.is_detached());
    assert_eq!(make.get(), 2);
}

#[test]
fn rebuild_inside_render_is_kept_for_the_next_pass() {
    let renders = Rc::new(Cell::new(0u32));
    let eager = {
        let renders = Rc::clone(&renders);
        Component::stateless("eager", move |cx, _: &()| {
            renders.set(renders.get() + 1);
            if renders.get() == 1 {
                cx.node().rebuild()?;
            }
            Ok(Ui::Empty)
        })
    };

    let frames = FrameQueue::new();
    let root = run_with(eager.call(()), NoopCommitter, RunConfig::default().frames(frames.clone()))
        .expect("first pass");
    let node = root.child(0).expect("eager");
    assert_eq!(node.dirty(), DirtyState::SelfAndChildren);
    assert_eq!(frames.len(), 1);

    assert_eq!(frames.run_pending(), Ok(1));
    assert_eq!(renders.get(), 2);
    assert_eq!(node.dirty(), DirtyState::Clean);
    assert!(!frames.has_pending());
}

#[test]
fn finders_walk_the_tree() {
    let a = leaf("a");
    let (wrap, _) = passthrough("wrap");
    let root = run(
        Ui::multi([wrap.call(a.call(())), a.call(()), wrap.call(Ui::Empty)]),
        NoopCommitter,
    )
    .expect("tree");

    let found = find_descendants_of_type(&root, a.component_type());
    assert_eq!(found.len(), 2);

    let nested = &found[0];
    let ancestor = find_ancestor(nested, |node| node.name() == "wrap").expect("wrap ancestor");
    assert!(ancestor.ptr_eq(&root.child(0).expect("first wrap")));
    assert!(find_ancestor(nested, AppNode::is_root).is_some_and(|node| node.ptr_eq(&root)));
    assert!(find_descendant_by_name(&root, "missing").is_none());
}
