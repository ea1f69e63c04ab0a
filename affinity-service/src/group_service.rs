//! A self-governed application of [`Engine`]: the act of administering groups and grants
//! is itself gated by the RBAC engine it wraps (meta-bootstrap).

use std::sync::Arc;

use affinity_core::{AffinityError, Engine, GroupFacts, Permission, Principal, Resource, Result, Role, RoleMap};
use tracing::instrument;

/// URI of the top-level service resource: adding/removing groups and service-wide grants
/// are gated here.
pub const SERVICE_URI: &str = "affinity-group-service:";

fn service_resource() -> Resource {
    Resource::new(
        SERVICE_URI,
        [
            Permission::new("add-group"),
            Permission::new("grant-on-service"),
            Permission::new("revoke-on-service"),
        ],
    )
}

fn group_resource(group: &str) -> Resource {
    Resource::with_parent(
        group,
        [
            Permission::new("add-member"),
            Permission::new("remove-member"),
            Permission::new("check-member"),
            Permission::new("grant-on-group"),
            Permission::new("revoke-on-group"),
            Permission::new("remove-group"),
        ],
        service_resource(),
    )
}

/// The roles the group service pre-registers with its [`Engine`].
pub fn group_roles() -> RoleMap {
    RoleMap::new([
        Role::new(
            "service",
            [
                Permission::new("grant-on-service"),
                Permission::new("revoke-on-service"),
                Permission::new("add-group"),
            ],
        ),
        Role::new("creator", [Permission::new("add-group")]),
        Role::new(
            "owner",
            [
                Permission::new("grant-on-group"),
                Permission::new("revoke-on-group"),
                Permission::new("remove-group"),
                Permission::new("add-member"),
                Permission::new("remove-member"),
                Permission::new("check-member"),
            ],
        ),
        Role::new(
            "admin",
            [
                Permission::new("add-member"),
                Permission::new("remove-member"),
                Permission::new("check-member"),
            ],
        ),
        Role::new("observer", [Permission::new("check-member")]),
    ])
}

/// Read-only description of a group, derived from its `member-of` facts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupDescriptor {
    /// The group's canonical principal form (its resource URI).
    pub uri: String,
    /// The group's immediate (one-hop) members.
    pub members: Vec<String>,
}

/// Self-governed group management: groups and grants are administered through this
/// façade, and the façade's own operations are gated by the [`Engine`] it wraps.
pub struct GroupService {
    engine: Engine,
}

impl GroupService {
    /// Build a group service over an existing engine (which must have been constructed
    /// with at least [`group_roles`] registered).
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Convenience constructor: builds an [`Engine`] over `facts` with the pre-registered
    /// group-service roles.
    pub fn with_facts(facts: GroupFacts) -> Self {
        Self::new(Engine::new(facts, group_roles()))
    }

    /// The underlying RBAC engine, for bootstrapping an initial grant before any group
    /// exists (see the self-governed-service scenario in the specification).
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn gate_group(&self, as_user: &Principal, permission: &str, group: &str) -> Result<()> {
        let resource = group_resource(group);
        let perm = Permission::new(permission);
        if self.engine.can(as_user, &perm, &resource)? {
            Ok(())
        } else {
            Err(AffinityError::PermissionDenied {
                principal: as_user.to_string(),
                permission: permission.to_string(),
                resource: group.to_string(),
            })
        }
    }

    fn gate_service(&self, as_user: &Principal, permission: &str) -> Result<()> {
        let resource = service_resource();
        let perm = Permission::new(permission);
        if self.engine.can(as_user, &perm, &resource)? {
            Ok(())
        } else {
            Err(AffinityError::PermissionDenied {
                principal: as_user.to_string(),
                permission: permission.to_string(),
                resource: SERVICE_URI.to_string(),
            })
        }
    }

    /// Reports whether `member` is a (transitive) member of `group`. Gated by
    /// `check-member` on the group resource.
    #[instrument(skip(self))]
    pub fn check_member(&self, as_user: &Principal, group: &str, member: &Principal) -> Result<bool> {
        self.gate_group(as_user, "check-member", group)?;
        self.engine.facts().is_member(group, &member.to_string())
    }

    /// Creates `group` and grants `owner` on it to `as_user`. Gated by `add-group` on the
    /// service resource.
    #[instrument(skip(self))]
    pub fn add_group(&self, as_user: &Principal, group: &str) -> Result<()> {
        self.gate_service(as_user, "add-group")?;
        self.engine.facts().add_group(group)?;
        let owner = self.engine_role("owner")?;
        // A fresh group never already has an owner grant, so AlreadyGranted cannot occur
        // here unless the caller is re-creating a group that was never fully removed.
        self.engine.grant(as_user, &owner, &group_resource(group))
    }

    /// Removes `group`: denies every grant fact referencing it, then denies its
    /// membership facts. Gated by `remove-group` on the group resource.
    #[instrument(skip(self))]
    pub fn remove_group(&self, as_user: &Principal, group: &str) -> Result<()> {
        self.gate_group(as_user, "remove-group", group)?;
        self.engine.remove_all(&group_resource(group))?;
        self.engine.facts().remove_group(group)
    }

    /// Adds `member` to `group`. Gated by `add-member` on the group resource.
    #[instrument(skip(self))]
    pub fn add_member(&self, as_user: &Principal, group: &str, member: &Principal) -> Result<()> {
        self.gate_group(as_user, "add-member", group)?;
        self.engine.facts().add_member(group, &member.to_string())
    }

    /// Removes `member` from `group`. Gated by `remove-member` on the group resource.
    /// Fails with [`AffinityError::NotFound`] if `group` does not exist.
    #[instrument(skip(self))]
    pub fn remove_member(&self, as_user: &Principal, group: &str, member: &Principal) -> Result<()> {
        self.gate_group(as_user, "remove-member", group)?;
        self.engine.facts().remove_member(group, &member.to_string())
    }

    /// Grants `role` to `principal` on `group`. Gated by `grant-on-group`.
    #[instrument(skip(self))]
    pub fn grant_on_group(&self, as_user: &Principal, principal: &Principal, role: &str, group: &str) -> Result<()> {
        self.gate_group(as_user, "grant-on-group", group)?;
        let role = self.engine_role(role)?;
        self.engine.grant(principal, &role, &group_resource(group))
    }

    /// Revokes `role` from `principal` on `group`. Gated by `revoke-on-group`.
    #[instrument(skip(self))]
    pub fn revoke_on_group(&self, as_user: &Principal, principal: &Principal, role: &str, group: &str) -> Result<()> {
        self.gate_group(as_user, "revoke-on-group", group)?;
        let role = self.engine_role(role)?;
        self.engine.revoke(principal, &role, &group_resource(group))
    }

    /// Grants `role` to `principal` on the service resource. Gated by `grant-on-service`.
    #[instrument(skip(self))]
    pub fn grant_on_service(&self, as_user: &Principal, principal: &Principal, role: &str) -> Result<()> {
        self.gate_service(as_user, "grant-on-service")?;
        let role = self.engine_role(role)?;
        self.engine.grant(principal, &role, &service_resource())
    }

    /// Revokes `role` from `principal` on the service resource. Gated by
    /// `revoke-on-service`.
    #[instrument(skip(self))]
    pub fn revoke_on_service(&self, as_user: &Principal, principal: &Principal, role: &str) -> Result<()> {
        self.gate_service(as_user, "revoke-on-service")?;
        let role = self.engine_role(role)?;
        self.engine.revoke(principal, &role, &service_resource())
    }

    /// Describes `group`: its URI and current immediate members. Gated by `check-member`,
    /// the least-privileged read permission defined on a group resource.
    #[instrument(skip(self))]
    pub fn describe_group(&self, as_user: &Principal, group: &str) -> Result<GroupDescriptor> {
        self.gate_group(as_user, "check-member", group)?;
        let members = self
            .engine
            .facts()
            .store()
            .match_fact(&affinity_core::Fact::new("affinity:groups", "", "member-of", group))?
            .into_iter()
            .map(|f| f.subject)
            .collect();
        Ok(GroupDescriptor {
            uri: group.to_string(),
            members,
        })
    }

    fn engine_role(&self, name: &str) -> Result<Role> {
        group_roles()
            .get(name)
            .cloned()
            .ok_or_else(|| AffinityError::ParseError(format!("unknown role {name:?}")))
    }
}

/// Convenience: construct a [`GroupService`] over an in-memory fact store.
pub fn in_memory() -> GroupService {
    GroupService::with_facts(GroupFacts::new(Arc::new(affinity_core::MemoryFactStore::new())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap_admin(service: &GroupService, admin: &Principal) {
        let role = group_roles().get("service").unwrap().clone();
        service.engine().grant(admin, &role, &service_resource()).unwrap();
    }

    #[test]
    fn self_governed_bootstrap() {
        let service = in_memory();
        let admin = Principal::parse("admin:root").unwrap();
        bootstrap_admin(&service, &admin);

        service.add_group(&admin, "affinity-group:foo").unwrap();
        let guest = Principal::parse("test:guest").unwrap();
        assert!(service.check_member(&admin, "affinity-group:foo", &guest).is_ok());

        let err = service
            .add_member(&guest, "affinity-group:foo", &guest)
            .unwrap_err();
        assert!(matches!(err, AffinityError::PermissionDenied { .. }));

        // The auto-granted owner role lets admin manage the group directly.
        service.add_member(&admin, "affinity-group:foo", &guest).unwrap();
        assert!(service.check_member(&admin, "affinity-group:foo", &guest).unwrap());
    }

    #[test]
    fn describe_group_lists_members() {
        let service = in_memory();
        let admin = Principal::parse("admin:root").unwrap();
        bootstrap_admin(&service, &admin);
        service.add_group(&admin, "affinity-group:foo").unwrap();

        let empty = service.describe_group(&admin, "affinity-group:foo").unwrap();
        assert!(empty.members.is_empty());

        let alice = Principal::parse("test:alice").unwrap();
        service.add_member(&admin, "affinity-group:foo", &alice).unwrap();
        let described = service.describe_group(&admin, "affinity-group:foo").unwrap();
        assert_eq!(described.members, vec!["test:alice".to_string()]);
    }

    #[test]
    fn remove_member_of_nonexistent_group_is_not_found() {
        let service = in_memory();
        let admin = Principal::parse("admin:root").unwrap();
        bootstrap_admin(&service, &admin);
        let alice = Principal::parse("test:alice").unwrap();

        let err = service
            .remove_member(&admin, "affinity-group:never-created", &alice)
            .unwrap_err();
        assert!(matches!(err, AffinityError::NotFound(_)));
    }

    #[test]
    fn check_member_is_transitive_across_nested_groups() {
        let service = in_memory();
        let admin = Principal::parse("admin:root").unwrap();
        bootstrap_admin(&service, &admin);
        service.add_group(&admin, "affinity-group:outer").unwrap();
        service.add_group(&admin, "affinity-group:inner").unwrap();

        let inner_group = Principal::parse("affinity-group:inner").unwrap();
        service
            .add_member(&admin, "affinity-group:outer", &inner_group)
            .unwrap();
        let alice = Principal::parse("test:alice").unwrap();
        service.add_member(&admin, "affinity-group:inner", &alice).unwrap();

        assert!(service.check_member(&admin, "affinity-group:inner", &alice).unwrap());
        assert!(service.check_member(&admin, "affinity-group:outer", &alice).unwrap());
        let bob = Principal::parse("test:bob").unwrap();
        assert!(!service.check_member(&admin, "affinity-group:outer", &bob).unwrap());
    }

    #[test]
    fn remove_group_revokes_grants_and_membership() {
        let service = in_memory();
        let admin = Principal::parse("admin:root").unwrap();
        bootstrap_admin(&service, &admin);
        service.add_group(&admin, "affinity-group:foo").unwrap();
        let alice = Principal::parse("test:alice").unwrap();
        service.add_member(&admin, "affinity-group:foo", &alice).unwrap();

        service.remove_group(&admin, "affinity-group:foo").unwrap();
        assert!(!service.engine().facts().is_group("affinity-group:foo").unwrap());
    }
}
