use trellis_core::{ChildOp, ChildrenDiff, Committer, Error, Result};

use crate::document::{Attributes, DocumentHandle, DomId};

fn apply_children(doc: &DocumentHandle, parent: DomId, diff: &ChildrenDiff<DomId>) -> Result<()> {
    let mut doc = doc.borrow_mut();
    for op in diff.ops() {
        match op {
            ChildOp::Replace { index, child } => doc.replace_child_at(parent, *index, *child)?,
            ChildOp::Append(child) => doc.append_child(parent, *child)?,
            ChildOp::Truncate { len } => doc.truncate_children(parent, *len)?,
        }
    }
    Ok(())
}

/// Commits one element. A tag change produces a replacement element;
/// anything else patches the committed one.
#[derive(Debug)]
pub struct ElementCommitter {
    doc: DocumentHandle,
    tag: String,
    attributes: Attributes,
    committed_tag: String,
    committed_attributes: Attributes,
}

impl ElementCommitter {
    pub fn new(doc: DocumentHandle, tag: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            doc,
            tag: tag.into(),
            attributes,
            committed_tag: String::new(),
            committed_attributes: Attributes::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn update(&mut self, tag: &str, attributes: Attributes) {
        if self.tag != tag {
            self.tag = tag.to_owned();
        }
        self.attributes = attributes;
    }

    fn create(&mut self) -> Result<DomId> {
        let mut doc = self.doc.borrow_mut();
        let id = doc.create_element(self.tag.as_str());
        for (name, value) in &self.attributes {
            doc.set_attribute(id, name.as_str(), value.as_str())?;
        }
        self.committed_tag.clone_from(&self.tag);
        self.committed_attributes.clone_from(&self.attributes);
        Ok(id)
    }

    fn patch(&mut self, id: DomId) -> Result<()> {
        let mut doc = self.doc.borrow_mut();
        let mut touched = 0;
        for name in self.committed_attributes.keys() {
            if !self.attributes.contains_key(name) {
                doc.remove_attribute(id, name)?;
                touched += 1;
            }
        }
        for (name, value) in &self.attributes {
            if self.committed_attributes.get(name) != Some(value) {
                doc.set_attribute(id, name.as_str(), value.as_str())?;
                touched += 1;
            }
        }
        log::trace!(
            "<{}> patched {touched} of {} attributes",
            self.tag,
            self.attributes.len()
        );
        self.committed_attributes.clone_from(&self.attributes);
        Ok(())
    }
}

impl Committer for ElementCommitter {
    type Commit = DomId;

    fn initial(&mut self) -> Result<DomId> {
        self.create()
    }

    fn amend(&mut self, last: DomId) -> Result<DomId> {
        if self.tag != self.committed_tag {
            return self.create();
        }
        self.patch(last)?;
        Ok(last)
    }

    fn amend_children(&mut self, commit: DomId, diff: &ChildrenDiff<DomId>) -> Result<DomId> {
        apply_children(&self.doc, commit, diff)?;
        Ok(commit)
    }
}

/// Commits one text node. Equal content keeps the node.
#[derive(Debug)]
pub struct TextCommitter {
    doc: DocumentHandle,
    content: String,
}

impl TextCommitter {
    pub fn new(doc: DocumentHandle, content: impl Into<String>) -> Self {
        Self {
            doc,
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn update(&mut self, content: &str) {
        if self.content != content {
            self.content = content.to_owned();
        }
    }
}

impl Committer for TextCommitter {
    type Commit = DomId;

    fn initial(&mut self) -> Result<DomId> {
        Ok(self.doc.borrow_mut().create_text(self.content.as_str()))
    }

    fn amend(&mut self, last: DomId) -> Result<DomId> {
        if self.doc.borrow().text(last)? == Some(self.content.as_str()) {
            return Ok(last);
        }
        self.initial()
    }

    fn amend_children(&mut self, commit: DomId, diff: &ChildrenDiff<DomId>) -> Result<DomId> {
        if !diff.is_unchanged() {
            return Err(Error::backend("text nodes cannot have children"));
        }
        Ok(commit)
    }
}

/// Root committer over an element the host already owns. The first commit
/// clears whatever the element contained.
#[derive(Debug)]
pub struct RootCommitter {
    doc: DocumentHandle,
    element: DomId,
}

impl RootCommitter {
    pub fn new(doc: DocumentHandle, element: DomId) -> Self {
        Self { doc, element }
    }

    pub fn element(&self) -> DomId {
        self.element
    }
}

impl Committer for RootCommitter {
    type Commit = DomId;

    fn initial(&mut self) -> Result<DomId> {
        self.doc.borrow_mut().truncate_children(self.element, 0)?;
        Ok(self.element)
    }

    fn amend(&mut self, last: DomId) -> Result<DomId> {
        Ok(last)
    }

    fn amend_children(&mut self, commit: DomId, diff: &ChildrenDiff<DomId>) -> Result<DomId> {
        apply_children(&self.doc, commit, diff)?;
        Ok(commit)
    }
}
