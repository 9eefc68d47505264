//! Schema-modeled data tree nodes
//!
//! Every generated model class implements [`Entity`]. Nodes are shared as
//! [`EntityRef`] (`Rc<RefCell<dyn Entity>>`): a parent owns its children
//! strongly, a child refers back to its parent through a `Weak`, so a child
//! that outlives its parent can never reach freed memory. Path walking over a
//! dropped parent fails with [`YdkError::DetachedEntity`].
//!
//! Trees are single-threaded. Path computation takes shared borrows of every
//! ancestor, so no ancestor may be mutably borrowed while it runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{Result, YdkError};
use crate::filter::YFilter;
use crate::leaf::LeafData;

/// Shared handle to a node of an entity tree
pub type EntityRef = Rc<RefCell<dyn Entity>>;

/// Non-owning handle from a child to its parent
pub type WeakEntityRef = Weak<RefCell<dyn Entity>>;

/// Address of a node plus the leaf values stored directly on it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityPath {
    /// Absolute path, or path relative to the requested ancestor
    pub path: String,
    /// `(relative leaf path, leaf data)` for each set leaf of the node
    pub value_paths: Vec<(String, LeafData)>,
}

impl EntityPath {
    pub fn new(path: impl Into<String>, value_paths: Vec<(String, LeafData)>) -> Self {
        Self {
            path: path.into(),
            value_paths,
        }
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        for (name, data) in &self.value_paths {
            write!(f, "\n  {}: {}", name, data)?;
        }
        Ok(())
    }
}

/// Attributes shared by every entity.
///
/// Cloning drops the parent link: a copy is not attached anywhere until
/// [`attach_child`] or [`link_children`] is called on it.
#[derive(Debug, Default)]
pub struct EntityData {
    pub yang_name: String,
    pub yang_parent_name: String,
    pub filter: YFilter,
    pub is_presence_container: bool,
    parent: Option<WeakEntityRef>,
}

impl EntityData {
    pub fn new(yang_name: impl Into<String>, yang_parent_name: impl Into<String>) -> Self {
        Self {
            yang_name: yang_name.into(),
            yang_parent_name: yang_parent_name.into(),
            ..Self::default()
        }
    }

    /// Mark the node as a presence container
    pub fn presence(mut self) -> Self {
        self.is_presence_container = true;
        self
    }

    /// The live parent, `Ok(None)` for a root.
    ///
    /// Fails when a parent was linked but has since been dropped.
    pub fn parent_ref(&self) -> Result<Option<EntityRef>> {
        match &self.parent {
            None => Ok(None),
            Some(weak) => weak
                .upgrade()
                .map(Some)
                .ok_or_else(|| YdkError::DetachedEntity(self.yang_name.clone())),
        }
    }

    pub fn set_parent(&mut self, parent: Option<&EntityRef>) {
        self.parent = parent.map(Rc::downgrade);
    }
}

impl Clone for EntityData {
    fn clone(&self) -> Self {
        Self {
            yang_name: self.yang_name.clone(),
            yang_parent_name: self.yang_parent_name.clone(),
            filter: self.filter,
            is_presence_container: self.is_presence_container,
            parent: None,
        }
    }
}

/// Capability set of a schema-modeled node.
///
/// Implementors supply storage access, their own segment, their leaves and
/// children; path computation, presence and operation queries are provided.
pub trait Entity: fmt::Debug {
    fn entity_data(&self) -> &EntityData;

    fn entity_data_mut(&mut self) -> &mut EntityData;

    /// Path segment of this node below its parent, e.g. `ldata[number='1']`
    fn segment_path(&self) -> String;

    /// `(name, LeafData)` of every leaf and leaf-list element of this node,
    /// set or not
    fn name_leaf_data(&self) -> Vec<(String, LeafData)>;

    /// Assign a leaf of this node from its text encoding
    fn set_value(&mut self, value_path: &str, value: &str) -> Result<()>;

    /// Look up (creating on demand) the child named `yang_name`.
    ///
    /// List children are disambiguated by `segment_path`; an empty segment
    /// creates a new list entry.
    fn child_by_name(&mut self, yang_name: &str, segment_path: &str) -> Option<EntityRef>;

    /// Existing children keyed by their segment path
    fn children(&self) -> BTreeMap<String, EntityRef>;

    /// Deep copy of this node and its subtree
    fn clone_entity(&self) -> EntityRef;

    fn yang_name(&self) -> &str {
        &self.entity_data().yang_name
    }

    fn yang_parent_name(&self) -> &str {
        &self.entity_data().yang_parent_name
    }

    fn filter(&self) -> YFilter {
        self.entity_data().filter
    }

    fn set_filter(&mut self, filter: YFilter) {
        self.entity_data_mut().filter = filter;
    }

    fn is_presence_container(&self) -> bool {
        self.entity_data().is_presence_container
    }

    /// The parent, if linked and still alive
    fn parent(&self) -> Option<EntityRef> {
        self.entity_data().parent_ref().ok().flatten()
    }

    fn set_parent(&mut self, parent: Option<&EntityRef>) {
        self.entity_data_mut().set_parent(parent);
    }

    /// Whether this node or any descendant holds a value
    fn has_data(&self) -> bool {
        self.is_presence_container()
            || self.name_leaf_data().iter().any(|(_, data)| data.is_set)
            || self
                .children()
                .values()
                .any(|child| child.borrow().has_data())
    }

    /// Whether this node, one of its leaves, or any descendant carries an
    /// explicit operation
    fn has_operation(&self) -> bool {
        self.filter().is_set()
            || self
                .name_leaf_data()
                .iter()
                .any(|(_, data)| data.operation.is_set())
            || self
                .children()
                .values()
                .any(|child| child.borrow().has_operation())
    }

    /// Path of this node and its own leaf values.
    ///
    /// With `None` the path is absolute; with a true ancestor it is relative
    /// to that ancestor. Any other node fails with
    /// [`YdkError::InvalidArgument`].
    fn get_entity_path(&self, ancestor: Option<&EntityRef>) -> Result<EntityPath> {
        let mut segments = vec![self.segment_path()];
        let mut next = self.entity_data().parent_ref()?;
        let mut reached_ancestor = false;

        while let Some(node) = next {
            if let Some(ancestor) = ancestor
                && same_entity(&node, ancestor)
            {
                reached_ancestor = true;
                break;
            }
            let node = node.borrow();
            segments.push(node.segment_path());
            next = node.entity_data().parent_ref()?;
        }

        if let Some(ancestor) = ancestor
            && !reached_ancestor
        {
            return Err(YdkError::InvalidArgument(format!(
                "'{}' is not an ancestor of '{}'",
                ancestor.borrow().yang_name(),
                self.yang_name()
            )));
        }

        segments.reverse();
        let value_paths = self
            .name_leaf_data()
            .into_iter()
            .filter(|(_, data)| data.is_relevant())
            .collect();

        Ok(EntityPath::new(segments.join("/"), value_paths))
    }
}

/// Whether two handles refer to the same node
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Link `child` to `parent` so paths can be computed relative to it
pub fn attach_child(parent: &EntityRef, child: &EntityRef) {
    child.borrow_mut().set_parent(Some(parent));
}

/// Child lookup that also links the returned child to `parent`
pub fn child_of(parent: &EntityRef, yang_name: &str, segment_path: &str) -> Option<EntityRef> {
    let child = parent.borrow_mut().child_by_name(yang_name, segment_path)?;
    attach_child(parent, &child);
    Some(child)
}

/// Recursively link every descendant of `root` to its parent
pub fn link_children(root: &EntityRef) {
    let children = root.borrow().children();
    for child in children.values() {
        attach_child(root, child);
        link_children(child);
    }
}

/// Deep copy of a subtree; the copy's root has no parent
pub fn clone_tree(root: &EntityRef) -> EntityRef {
    let copy = root.borrow().clone_entity();
    copy.borrow_mut().set_parent(None);
    link_children(&copy);
    copy
}

/// One node visited by [`walk`]
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub entity: EntityRef,
    /// Distance from the walked root
    pub depth: usize,
    /// Absolute for the root, relative to the direct parent below it
    pub path: EntityPath,
}

/// Depth-first walk over the nodes of `root` that hold data or an operation.
///
/// The root is always visited. Children are visited in segment-path order.
pub fn walk(root: &EntityRef) -> Result<Vec<WalkEntry>> {
    let path = root.borrow().get_entity_path(None)?;
    let mut entries = vec![WalkEntry {
        entity: root.clone(),
        depth: 0,
        path,
    }];
    walk_children(root, 1, &mut entries)?;
    Ok(entries)
}

fn walk_children(parent: &EntityRef, depth: usize, entries: &mut Vec<WalkEntry>) -> Result<()> {
    let children = parent.borrow().children();
    for child in children.values() {
        let relevant = {
            let node = child.borrow();
            node.has_data() || node.has_operation()
        };
        if !relevant {
            continue;
        }
        let path = child.borrow().get_entity_path(Some(parent))?;
        entries.push(WalkEntry {
            entity: child.clone(),
            depth,
            path,
        });
        walk_children(child, depth + 1, entries)?;
    }
    Ok(())
}

/// Structural equality: same absolute paths, leaf values and children
pub fn entity_eq(a: &EntityRef, b: &EntityRef) -> Result<bool> {
    if a.borrow().get_entity_path(None)? != b.borrow().get_entity_path(None)? {
        return Ok(false);
    }
    if a.borrow().filter() != b.borrow().filter() {
        return Ok(false);
    }
    let left = a.borrow().children();
    let right = b.borrow().children();
    if left.len() != right.len() {
        return Ok(false);
    }
    for ((lkey, lchild), (rkey, rchild)) in left.iter().zip(right.iter()) {
        if lkey != rkey || !entity_eq(lchild, rchild)? {
            return Ok(false);
        }
    }
    Ok(true)
}
