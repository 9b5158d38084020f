use trellis_core::{run, Error, NoopCommitter, RenderCx, Result, StateRequirement, Ui};
use trellis_macros::component;

#[component]
fn label(_cx: &mut RenderCx<'_>, text: String) -> Result<Ui> {
    let _ = text;
    Ok(Ui::Empty)
}

#[component(stateful)]
fn counter(cx: &mut RenderCx<'_>, step: u32) -> Result<Ui> {
    let count = cx.state(|| 0u32)?;
    count.update(|count| *count += step);
    Ok(Ui::Empty)
}

#[component(stateful)]
fn forgetful(_cx: &mut RenderCx<'_>) -> Result<Ui> {
    Ok(Ui::Empty)
}

fn descriptor(ui: Ui) -> trellis_core::Descriptor {
    match ui {
        Ui::Single(descriptor) => descriptor,
        other => panic!("expected a single descriptor, got {other:?}"),
    }
}

#[test]
fn calls_share_one_component_type() {
    let first = descriptor(label("a".into()));
    let second = descriptor(label("b".into()));
    assert!(first.is_same_type(&second));
    assert_eq!(first.name(), "label");
    assert_eq!(first.requirement(), StateRequirement::Stateless);
}

#[test]
fn different_functions_never_match() {
    let a = descriptor(label("a".into()));
    let b = descriptor(counter(1));
    assert!(!a.is_same_type(&b));
    assert_eq!(b.requirement(), StateRequirement::Stateful);
}

#[test]
fn stateful_component_keeps_its_state() {
    let root = run(counter(2), NoopCommitter).expect("first pass");
    let node = root.child(0).expect("counter node");
    assert_eq!(node.state::<u32>(), Some(2));

    node.rebuild().expect("rebuild");
    root.immediate_rebuild().expect("second pass");
    assert_eq!(node.state::<u32>(), Some(4));
}

#[test]
fn stateful_component_must_request_state() {
    let err = run(forgetful(), NoopCommitter).expect_err("missing state request");
    assert_eq!(
        err,
        Error::StateNotRequested {
            component: "forgetful"
        }
    );
}
