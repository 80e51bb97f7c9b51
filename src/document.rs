//! Host document abstraction.
//!
//! The detector never touches a real DOM. It asks a [`Document`] for the page
//! location and for the nearest enclosing link of an event target, which is
//! what `event.target.closest('a')` gives a script. [`StaticDocument`] is an
//! in-memory tree used by the trace replayer and by tests.

use std::collections::HashMap;

use url::Url;

/// Opaque handle to a node of the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Snapshot of an anchor element as seen by the eligibility filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The anchor node itself (not the event target).
    pub node: NodeId,
    /// Fully resolved `href`, `None` when the attribute is missing or unparseable.
    pub href: Option<Url>,
    /// `data-instant` is present.
    pub instant: bool,
    /// `data-no-instant` is present.
    pub no_instant: bool,
}

impl Link {
    /// Builds a link the way an anchor exposes `href`: the raw attribute is
    /// resolved against the document base URL.
    pub fn resolve(
        node: NodeId,
        base: &Url,
        href_attr: Option<&str>,
        instant: bool,
        no_instant: bool,
    ) -> Self {
        let href = href_attr.and_then(|raw| base.join(raw.trim()).ok());
        Self {
            node,
            href,
            instant,
            no_instant,
        }
    }
}

/// What the detector needs from the host page.
pub trait Document {
    /// URL of the page currently displayed (`location`).
    fn location(&self) -> &Url;

    /// Nearest anchor at or above `node`, or `None`.
    fn closest_link(&self, node: NodeId) -> Option<Link>;
}

/// Runtime capabilities checked once at install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    /// `link.relList.supports('prefetch')`.
    pub supports_prefetch: bool,
    /// `navigator.connection.saveData`.
    pub save_data: bool,
}

impl Environment {
    /// A runtime with prefetch support and data-saver off.
    pub fn capable() -> Self {
        Self {
            supports_prefetch: true,
            save_data: false,
        }
    }

    /// `true` when prefetching is allowed at all.
    pub fn allows_prefetch(&self) -> bool {
        self.supports_prefetch && !self.save_data
    }
}

#[derive(Debug, Clone)]
struct StaticNode {
    parent: Option<NodeId>,
    anchor: Option<AnchorAttrs>,
}

#[derive(Debug, Clone)]
struct AnchorAttrs {
    href: Option<String>,
    instant: bool,
    no_instant: bool,
}

/// In-memory document tree with parent pointers.
#[derive(Debug, Clone)]
pub struct StaticDocument {
    location: Url,
    nodes: HashMap<NodeId, StaticNode>,
}

impl StaticDocument {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            nodes: HashMap::new(),
        }
    }

    /// Adds a plain (non-anchor) element.
    pub fn add_element(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes.insert(
            id,
            StaticNode {
                parent,
                anchor: None,
            },
        );
    }

    /// Adds an `<a>` element. `href` is the raw attribute value.
    pub fn add_anchor(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        href: Option<&str>,
        instant: bool,
        no_instant: bool,
    ) {
        self.nodes.insert(
            id,
            StaticNode {
                parent,
                anchor: Some(AnchorAttrs {
                    href: href.map(str::to_owned),
                    instant,
                    no_instant,
                }),
            },
        );
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

impl Document for StaticDocument {
    fn location(&self) -> &Url {
        &self.location
    }

    fn closest_link(&self, node: NodeId) -> Option<Link> {
        let mut current = Some(node);
        // Bounded walk: a malformed parent cycle must not hang the event loop.
        let mut remaining = self.nodes.len();
        while let Some(id) = current {
            let entry = self.nodes.get(&id)?;
            if let Some(ref anchor) = entry.anchor {
                return Some(Link::resolve(
                    id,
                    &self.location,
                    anchor.href.as_deref(),
                    anchor.instant,
                    anchor.no_instant,
                ));
            }
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            current = entry.parent;
        }
        None
    }
}
