//! In-memory document backend.
//!
//! [`element`] and [`text`] components commit into a [`Document`] arena;
//! [`root`] mounts a tree under an element the host created. Markup comes
//! out through [`Document::to_html`].

mod committers;
mod document;

use trellis_core::{RenderCx, Result, Ui};
use trellis_macros::component;

pub use committers::{ElementCommitter, RootCommitter, TextCommitter};
pub use document::{Attributes, DomError, DomId, DomNode, Document, DocumentHandle};

/// Builds an attribute map from name/value pairs.
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

/// Root committer for `run`, mounting the app as `element`'s children.
pub fn root(doc: &DocumentHandle, element: DomId) -> RootCommitter {
    RootCommitter::new(doc.clone(), element)
}

#[component(stateful)]
pub fn element(
    cx: &mut RenderCx<'_>,
    doc: DocumentHandle,
    tag: &'static str,
    attributes: Attributes,
    children: Ui,
) -> Result<Ui> {
    let committer = cx.committer(|| ElementCommitter::new(doc.clone(), tag, attributes.clone()))?;
    committer.update(|committer| committer.update(tag, attributes));
    Ok(children)
}

#[component(stateful)]
pub fn text(cx: &mut RenderCx<'_>, doc: DocumentHandle, content: String) -> Result<Ui> {
    let committer = cx.committer(|| TextCommitter::new(doc.clone(), content.as_str()))?;
    committer.update(|committer| committer.update(&content));
    Ok(Ui::Empty)
}

/// Shorthand for a `div` element.
pub fn div(doc: &DocumentHandle, attributes: Attributes, children: impl Into<Ui>) -> Ui {
    element(doc.clone(), "div", attributes, children.into())
}
