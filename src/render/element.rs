use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use crate::core::Bounds;

/// Simple selector grammar understood by [`Element::select`]: `#id`,
/// `.class` or a bare tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Tag(String),
}

impl Selector {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix('#') {
            return (!id.is_empty()).then(|| Self::Id(id.to_owned()));
        }
        if let Some(class) = raw.strip_prefix('.') {
            return (!class.is_empty()).then(|| Self::Class(class.to_owned()));
        }
        (!raw.is_empty()).then(|| Self::Tag(raw.to_owned()))
    }

    #[must_use]
    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Id(id) => element.id().as_deref() == Some(id.as_str()),
            Self::Class(class) => element.has_class(class),
            Self::Tag(tag) => element.tag() == tag,
        }
    }
}

struct Node {
    tag: String,
    id: RefCell<Option<String>>,
    classes: RefCell<IndexSet<String>>,
    attrs: RefCell<IndexMap<String, String>>,
    styles: RefCell<IndexMap<String, String>>,
    text: RefCell<String>,
    bounds: Cell<Bounds>,
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<Element>>,
}

/// Headless retained node standing in for a host surface element.
///
/// Charts anchor to one, measure it for sizing, append their rendering
/// surface under it and toggle styles on control elements inside it.
/// Handles are cheap clones of the same node; equality is identity.
#[derive(Clone)]
pub struct Element {
    node: Rc<Node>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.node.tag)
            .field("id", &self.node.id.borrow())
            .field("classes", &self.node.classes.borrow())
            .field("children", &self.node.children.borrow().len())
            .finish()
    }
}

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Rc::new(Node {
                tag: tag.into(),
                id: RefCell::new(None),
                classes: RefCell::new(IndexSet::new()),
                attrs: RefCell::new(IndexMap::new()),
                styles: RefCell::new(IndexMap::new()),
                text: RefCell::new(String::new()),
                bounds: Cell::new(Bounds::default()),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.set_id(id);
        self
    }

    #[must_use]
    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    #[must_use]
    pub fn with_bounds(self, width: f64, height: f64) -> Self {
        self.set_bounds(Bounds::new(width, height));
        self
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.node.tag
    }

    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.node.id.borrow().clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        *self.node.id.borrow_mut() = Some(id.into());
    }

    pub fn add_class(&self, class: impl Into<String>) {
        self.node.classes.borrow_mut().insert(class.into());
    }

    pub fn remove_class(&self, class: &str) -> bool {
        self.node.classes.borrow_mut().shift_remove(class)
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.node.classes.borrow().contains(class)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.node.attrs.borrow().get(name).cloned()
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.node.attrs.borrow_mut().insert(name.into(), value.into());
    }

    pub fn remove_attr(&self, name: &str) -> Option<String> {
        self.node.attrs.borrow_mut().shift_remove(name)
    }

    #[must_use]
    pub fn style(&self, name: &str) -> Option<String> {
        self.node.styles.borrow().get(name).cloned()
    }

    /// Sets a style property; `None` clears it back to the inherited value.
    pub fn set_style(&self, name: &str, value: Option<&str>) {
        let mut styles = self.node.styles.borrow_mut();
        match value {
            Some(value) => {
                styles.insert(name.to_owned(), value.to_owned());
            }
            None => {
                styles.shift_remove(name);
            }
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.node.text.borrow().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.node.text.borrow_mut() = text.into();
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.node.bounds.get()
    }

    pub fn set_bounds(&self, bounds: Bounds) {
        self.node.bounds.set(bounds);
    }

    #[must_use]
    pub fn parent(&self) -> Option<Element> {
        self.node
            .parent
            .borrow()
            .upgrade()
            .map(|node| Element { node })
    }

    #[must_use]
    pub fn children(&self) -> Vec<Element> {
        self.node.children.borrow().clone()
    }

    /// Appends `child`, detaching it from any previous parent first.
    pub fn append(&self, child: Element) -> Element {
        child.remove();
        *child.node.parent.borrow_mut() = Rc::downgrade(&self.node);
        self.node.children.borrow_mut().push(child.clone());
        child
    }

    /// Detaches this element from its parent. Returns `false` when it had none.
    pub fn remove(&self) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        parent
            .node
            .children
            .borrow_mut()
            .retain(|sibling| sibling != self);
        *self.node.parent.borrow_mut() = Weak::new();
        true
    }

    /// First descendant matching `selector`, depth-first in document order.
    #[must_use]
    pub fn select(&self, selector: &str) -> Option<Element> {
        let selector = Selector::parse(selector)?;
        let mut found = None;
        self.walk_descendants(&mut |element| {
            if found.is_none() && selector.matches(element) {
                found = Some(element.clone());
            }
        });
        found
    }

    #[must_use]
    pub fn select_all(&self, selector: &str) -> Vec<Element> {
        let Some(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        let mut matched = Vec::new();
        self.walk_descendants(&mut |element| {
            if selector.matches(element) {
                matched.push(element.clone());
            }
        });
        matched
    }

    fn walk_descendants(&self, visit: &mut dyn FnMut(&Element)) {
        for child in self.children() {
            visit(&child);
            child.walk_descendants(visit);
        }
    }
}
