//! Permissions and the maps roles and resources keep them in.

use std::collections::BTreeMap;
use std::fmt;

/// A granular capability that can be performed on a resource, identified by a stable name.
/// Two permissions are equal iff their names match.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Permission(String);

impl Permission {
    /// Define a permission identified by a well-known, unique name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The stable name identifying this permission.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A set of permissions keyed by name, as carried by a [`crate::Role`] or a
/// [`crate::Resource`]'s declared capabilities.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PermissionMap(BTreeMap<String, Permission>);

impl PermissionMap {
    /// Build a permission map from a list of permissions.
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self(permissions.into_iter().map(|p| (p.name().to_string(), p)).collect())
    }

    /// Reports whether `permission` is present in this map, by name.
    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains_key(permission.name())
    }

    /// Reports whether a permission of the given name is present in this map.
    pub fn contains_name(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over the permissions in this map.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.values()
    }
}

impl FromIterator<Permission> for PermissionMap {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self::new(iter)
    }
}
