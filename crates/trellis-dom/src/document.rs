use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

pub type DomId = usize;

/// Attribute name to value, kept in insertion order so markup is stable.
pub type Attributes = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("document node {id} missing")]
    Missing { id: DomId },
    #[error("document node {id} is not an element")]
    NotAnElement { id: DomId },
    #[error("element {parent} has no child at {index}")]
    NoChildAt { parent: DomId, index: usize },
}

impl From<DomError> for trellis_core::Error {
    fn from(err: DomError) -> Self {
        trellis_core::Error::backend(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Element {
        tag: String,
        attributes: Attributes,
        children: Vec<DomId>,
    },
    Text {
        content: String,
    },
}

/// Arena of document nodes. Ids are never reused, so a stale id reports
/// [`DomError::Missing`] instead of reaching an unrelated node.
///
/// Linking a child never unlinks it elsewhere: a node may be listed under
/// several parents, e.g. under an element that a tag change replaced. Only
/// the lists reachable from the mounted root count; [`Document::sweep`]
/// frees the rest.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Option<DomNode>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: DomNode) -> DomId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> DomId {
        self.insert(DomNode::Element {
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> DomId {
        self.insert(DomNode::Text {
            content: content.into(),
        })
    }

    pub fn get(&self, id: DomId) -> Result<&DomNode, DomError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(DomError::Missing { id })
    }

    fn get_mut(&mut self, id: DomId) -> Result<&mut DomNode, DomError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(DomError::Missing { id })
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tag(&self, id: DomId) -> Result<&str, DomError> {
        match self.get(id)? {
            DomNode::Element { tag, .. } => Ok(tag),
            DomNode::Text { .. } => Err(DomError::NotAnElement { id }),
        }
    }

    pub fn text(&self, id: DomId) -> Result<Option<&str>, DomError> {
        match self.get(id)? {
            DomNode::Text { content } => Ok(Some(content)),
            DomNode::Element { .. } => Ok(None),
        }
    }

    pub fn attribute(&self, id: DomId, name: &str) -> Result<Option<&str>, DomError> {
        Ok(self.element(id)?.0.get(name).map(String::as_str))
    }

    pub fn children(&self, id: DomId) -> Result<&[DomId], DomError> {
        Ok(self.element(id)?.1)
    }

    fn element(&self, id: DomId) -> Result<(&Attributes, &[DomId]), DomError> {
        match self.get(id)? {
            DomNode::Element {
                attributes,
                children,
                ..
            } => Ok((attributes, children)),
            DomNode::Text { .. } => Err(DomError::NotAnElement { id }),
        }
    }

    fn element_mut(&mut self, id: DomId) -> Result<(&mut Attributes, &mut Vec<DomId>), DomError> {
        match self.get_mut(id)? {
            DomNode::Element {
                attributes,
                children,
                ..
            } => Ok((attributes, children)),
            DomNode::Text { .. } => Err(DomError::NotAnElement { id }),
        }
    }

    pub fn set_attribute(
        &mut self,
        id: DomId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        self.element_mut(id)?.0.insert(name.into(), value.into());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: DomId, name: &str) -> Result<(), DomError> {
        self.element_mut(id)?.0.shift_remove(name);
        Ok(())
    }

    /// Links `child` as the last child of `parent`, keeping any other
    /// parent's link to it.
    pub fn append_child(&mut self, parent: DomId, child: DomId) -> Result<(), DomError> {
        self.get(child)?;
        self.element_mut(parent)?.1.push(child);
        Ok(())
    }

    pub fn replace_child_at(&mut self, parent: DomId, index: usize, child: DomId) -> Result<(), DomError> {
        self.get(child)?;
        let slot = self
            .element_mut(parent)?
            .1
            .get_mut(index)
            .ok_or(DomError::NoChildAt { parent, index })?;
        *slot = child;
        Ok(())
    }

    /// Unlinks every child from `len` onwards.
    pub fn truncate_children(&mut self, parent: DomId, len: usize) -> Result<(), DomError> {
        self.element_mut(parent)?.1.truncate(len);
        Ok(())
    }

    /// Frees every node that cannot be reached from `roots`. Returns how many
    /// were freed.
    pub fn sweep(&mut self, roots: &[DomId]) -> usize {
        let mut reachable = vec![false; self.nodes.len()];
        let mut pending: Vec<DomId> = roots.to_vec();
        while let Some(id) = pending.pop() {
            let Some(seen) = reachable.get_mut(id) else {
                continue;
            };
            if std::mem::replace(seen, true) {
                continue;
            }
            if let Ok(children) = self.children(id) {
                pending.extend_from_slice(children);
            }
        }

        let mut freed = 0;
        for (slot, reachable) in self.nodes.iter_mut().zip(reachable) {
            if !reachable && slot.take().is_some() {
                freed += 1;
            }
        }
        freed
    }

    /// Serializes the subtree at `id` as HTML.
    pub fn to_html(&self, id: DomId) -> Result<String, DomError> {
        let mut output = String::new();
        self.write_html(id, &mut output)?;
        Ok(output)
    }

    fn write_html(&self, id: DomId, output: &mut String) -> Result<(), DomError> {
        match self.get(id)? {
            DomNode::Text { content } => escape_into(content, false, output),
            DomNode::Element {
                tag,
                attributes,
                children,
            } => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in attributes {
                    output.push(' ');
                    output.push_str(name);
                    output.push_str("=\"");
                    escape_into(value, true, output);
                    output.push('"');
                }
                output.push('>');
                for child in children {
                    self.write_html(*child, output)?;
                }
                output.push_str("</");
                output.push_str(tag);
                output.push('>');
            }
        }
        Ok(())
    }
}

fn escape_into(text: &str, attribute: bool, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            other => output.push(other),
        }
    }
}

/// Shared handle to a [`Document`]. Committers and the host hold clones.
#[derive(Clone, Default)]
pub struct DocumentHandle {
    inner: Rc<RefCell<Document>>,
}

impl DocumentHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, Document> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.inner.borrow_mut()
    }

    pub fn create_element(&self, tag: impl Into<String>) -> DomId {
        self.borrow_mut().create_element(tag)
    }

    pub fn to_html(&self, id: DomId) -> Result<String, DomError> {
        self.borrow().to_html(id)
    }

    pub fn ptr_eq(&self, other: &DocumentHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("nodes", &self.borrow().len())
            .finish()
    }
}
