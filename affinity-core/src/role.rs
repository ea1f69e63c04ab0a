//! Roles: a name plus the set of permissions it bundles.

use std::collections::BTreeMap;

use crate::permission::{Permission, PermissionMap};

/// A named set of permissions (capabilities, actions) to operate on a resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Role {
    name: String,
    permissions: PermissionMap,
}

impl Role {
    /// Define a role identified by a well-known, unique name with access to the given
    /// permissions.
    pub fn new(name: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            name: name.into(),
            permissions: PermissionMap::new(permissions),
        }
    }

    /// The locally distinguished name for this role; also the predicate of its grant facts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The permissions relegated to this role.
    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    /// Tests if the role allows the given permission.
    pub fn can(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }
}

/// A name-keyed collection of roles, known to an [`crate::rbac::Engine`] at construction.
#[derive(Clone, Debug, Default)]
pub struct RoleMap(BTreeMap<String, Role>);

impl RoleMap {
    /// Build a role map from a list of roles.
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().map(|r| (r.name().to_string(), r)).collect())
    }

    /// Look up a role by the name stored in a grant fact's predicate. Returns `None` for
    /// unknown role names, which callers must treat as "skip", not an error.
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.0.get(name)
    }
}

impl FromIterator<Role> for RoleMap {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_can() {
        let role = Role::new("janitor", [Permission::new("empty-bucket")]);
        assert!(role.can(&Permission::new("empty-bucket")));
        assert!(!role.can(&Permission::new("board-ship")));
    }

    #[test]
    fn unknown_role_name_is_none_not_error() {
        let roles = RoleMap::new([Role::new("janitor", [Permission::new("empty-bucket")])]);
        assert!(roles.get("captain").is_none());
    }
}
