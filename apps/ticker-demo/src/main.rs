use std::error::Error;
use std::time::Duration;

use trellis_core::{instrumentation, run_with, Component, Step, Ui};
use trellis_dom::{attributes, div, root, text, DocumentHandle};
use trellis_runtime_std::StdRuntime;

const FRAME: Duration = Duration::from_millis(16);
const DEFAULT_FRAMES: u32 = 180;
const PRINT_EVERY: u32 = 60;

fn frame_count() -> u32 {
    match std::env::var("TICKER_FRAMES") {
        Ok(value) => value.parse().unwrap_or_else(|err| {
            log::warn!("ignoring TICKER_FRAMES={value:?}: {err}");
            DEFAULT_FRAMES
        }),
        Err(_) => DEFAULT_FRAMES,
    }
}

/// Counts whole seconds, sleeping in between.
fn seconds(runtime: &StdRuntime, doc: &DocumentHandle) -> Component<()> {
    let (runtime, doc) = (runtime.clone(), doc.clone());
    Component::generator("seconds", move |_: &()| {
        let (runtime, doc) = (runtime.clone(), doc.clone());
        let mut elapsed = 0u32;
        let mut show = false;
        move || {
            show = !show;
            if show {
                Step::Yield(text(doc.clone(), format!("{elapsed}s")))
            } else {
                elapsed += 1;
                Step::Suspend(runtime.sleep(Duration::from_secs(1)))
            }
        }
    })
}

/// A bar that fills up every three seconds.
fn progress(runtime: &StdRuntime, doc: &DocumentHandle) -> Component<()> {
    let doc = doc.clone();
    runtime.animating("progress", move |_: &(), elapsed| {
        let percent = elapsed.as_millis() / 30 % 101;
        div(
            &doc,
            attributes([("class", "bar".to_owned()), ("style", format!("width: {percent}%"))]),
            Ui::Empty,
        )
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let frames = frame_count();
    let runtime = StdRuntime::new();
    let doc = DocumentHandle::new();
    let body = doc.create_element("body");

    let seconds = seconds(&runtime, &doc);
    let progress = progress(&runtime, &doc);
    let app = div(
        &doc,
        attributes([("class", "ticker")]),
        Ui::multi([seconds.call(()), progress.call(())]),
    );
    // Dropping the root tears the tree down.
    let _root = run_with(app, root(&doc, body), runtime.run_config())?;
    log::info!("running {frames} frames of {FRAME:?}");

    let start = runtime.now();
    for frame in 1..=frames {
        if let Err(err) = runtime.tick(start + FRAME * frame) {
            log::error!("frame {frame} failed: {err}");
        }
        let freed = doc.borrow_mut().sweep(&[body]);
        if freed > 0 {
            log::debug!("frame {frame}: freed {freed} detached nodes");
        }
        if frame % PRINT_EVERY == 0 {
            println!("{:>5} {}", frame, doc.to_html(body)?);
        }
    }

    log::info!(
        "build {:?}, commit {:?}",
        instrumentation::build_stats(),
        instrumentation::commit_stats()
    );
    Ok(())
}
