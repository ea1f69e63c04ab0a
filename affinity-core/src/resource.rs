//! Resources: URI-identified objects with a declared capability set and an optional parent.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::permission::{Permission, PermissionMap};
use crate::MAX_PARENT_DEPTH;

/// A URI-named object with a declared capability set and optional parent. A resource's
/// URI is its identity: two resources with the same URI are equivalent for grant purposes.
#[derive(Clone, Debug)]
pub struct Resource {
    uri: String,
    capabilities: PermissionMap,
    parent: Option<Arc<Resource>>,
}

impl Resource {
    /// Define a root resource (no parent) with the given capabilities.
    pub fn new(uri: impl Into<String>, capabilities: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            uri: uri.into(),
            capabilities: PermissionMap::new(capabilities),
            parent: None,
        }
    }

    /// Define a resource contained by `parent`.
    pub fn with_parent(
        uri: impl Into<String>,
        capabilities: impl IntoIterator<Item = Permission>,
        parent: Resource,
    ) -> Self {
        Self {
            uri: uri.into(),
            capabilities: PermissionMap::new(capabilities),
            parent: Some(Arc::new(parent)),
        }
    }

    /// The uniform identifier for this resource.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// All the possible permissions that are defined for this type of resource.
    pub fn capabilities(&self) -> &PermissionMap {
        &self.capabilities
    }

    /// The resource which contains this one, if any.
    pub fn parent(&self) -> Option<&Resource> {
        self.parent.as_deref()
    }

    /// Iterate this resource and every ancestor, in order, bounded to
    /// [`MAX_PARENT_DEPTH`] levels and guarded against cycles by URI.
    pub fn chain(&self) -> ParentChain<'_> {
        ParentChain {
            next: Some(self),
            visited: BTreeSet::new(),
            remaining: MAX_PARENT_DEPTH,
        }
    }
}

/// Iterator produced by [`Resource::chain`]; walks a resource and its ancestors.
pub struct ParentChain<'a> {
    next: Option<&'a Resource>,
    visited: BTreeSet<&'a str>,
    remaining: usize,
}

impl<'a> Iterator for ParentChain<'a> {
    type Item = &'a Resource;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if self.remaining == 0 || !self.visited.insert(current.uri()) {
            self.next = None;
            return None;
        }
        self.remaining -= 1;
        self.next = current.parent();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_walks_to_root() {
        let building = Resource::new("building:1", [Permission::new("use-thing")]);
        let vending = Resource::with_parent(
            "vending-machine:1",
            [Permission::new("use-thing")],
            building.clone(),
        );
        let uris: Vec<_> = vending.chain().map(Resource::uri).collect();
        assert_eq!(uris, vec!["vending-machine:1", "building:1"]);
    }

    #[test]
    fn chain_is_cycle_safe() {
        // A resource cannot literally self-reference through an owned Arc parent without
        // unsafe tricks, but the bounded walk must still terminate promptly even for a
        // deep legitimate chain.
        let mut current = Resource::new("root:", []);
        for i in 0..(crate::MAX_PARENT_DEPTH * 2) {
            current = Resource::with_parent(format!("r:{i}"), [], current);
        }
        let count = current.chain().count();
        assert!(count <= crate::MAX_PARENT_DEPTH);
    }
}
