//! The RBAC evaluation engine: `has_grant`, `can`, `grant`, `revoke`, `revoke_all`,
//! `remove_all`, composing transitive group membership with resource-parent walking.

use tracing::instrument;

use crate::error::{AffinityError, Result};
use crate::fact::Fact;
use crate::group_facts::GroupFacts;
use crate::permission::Permission;
use crate::principal::Principal;
use crate::resource::Resource;
use crate::role::{Role, RoleMap};
use crate::RBAC_TOPIC;

/// Role-based access control engine, parameterized by a fact store (through its
/// [`GroupFacts`] layer) and a role map known at construction.
#[derive(Clone)]
pub struct Engine {
    facts: GroupFacts,
    roles: RoleMap,
}

impl Engine {
    /// Build an engine over `facts` with the given (immutable, after this call) role map.
    pub fn new(facts: GroupFacts, roles: RoleMap) -> Self {
        Self { facts, roles }
    }

    /// The group-facts layer this engine queries.
    pub fn facts(&self) -> &GroupFacts {
        &self.facts
    }

    /// Tests if `principal` has been granted `role` on `resource` or one of its ancestors,
    /// directly or via transitive group membership.
    #[instrument(skip(self), fields(principal = %principal, role = role.name(), resource = resource.uri()))]
    pub fn has_grant(&self, principal: &Principal, role: &Role, resource: &Resource) -> Result<bool> {
        for r in resource.chain() {
            let pattern = Fact::new(RBAC_TOPIC, principal.to_string(), role.name(), r.uri());
            if !self.facts.match_all(&pattern)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Tests if `principal`'s granted roles provide `permission` on `resource` or one of
    /// its ancestors. Returns `false` immediately (not an error) if `permission` is not
    /// among `resource`'s declared capabilities.
    #[instrument(skip(self), fields(principal = %principal, permission = permission.name(), resource = resource.uri()))]
    pub fn can(&self, principal: &Principal, permission: &Permission, resource: &Resource) -> Result<bool> {
        if !resource.capabilities().contains(permission) {
            return Ok(false);
        }

        for r in resource.chain() {
            if self.matches_permission(principal, permission, r)? {
                return Ok(true);
            }
            if !principal.is_wildcard() {
                let wildcard = principal.scheme_wildcard();
                if self.matches_permission(&wildcard, permission, r)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn matches_permission(&self, principal: &Principal, permission: &Permission, resource: &Resource) -> Result<bool> {
        let pattern = Fact::new(RBAC_TOPIC, principal.to_string(), "", resource.uri());
        for fact in self.facts.match_all(&pattern)? {
            if let Some(role) = self.roles.get(&fact.predicate) {
                if role.can(permission) {
                    return Ok(true);
                }
            }
            // Unknown role names are tolerated for schema evolution; skip silently.
        }
        Ok(false)
    }

    /// Grants `role` to `principal` on `resource`. Fails with [`AffinityError::AlreadyGranted`]
    /// if the role is already effectively granted, directly or via inheritance.
    #[instrument(skip(self), fields(principal = %principal, role = role.name(), resource = resource.uri()))]
    pub fn grant(&self, principal: &Principal, role: &Role, resource: &Resource) -> Result<()> {
        if self.has_grant(principal, role, resource)? {
            return Err(AffinityError::AlreadyGranted {
                principal: principal.to_string(),
                role: role.name().to_string(),
                resource: resource.uri().to_string(),
            });
        }
        self.facts
            .store()
            .assert(&[Fact::new(RBAC_TOPIC, principal.to_string(), role.name(), resource.uri())])
    }

    /// Revokes the exact grant of `role` to `principal` on `resource`. Idempotent; does
    /// not remove grants inherited from parent resources or containing groups.
    #[instrument(skip(self), fields(principal = %principal, role = role.name(), resource = resource.uri()))]
    pub fn revoke(&self, principal: &Principal, role: &Role, resource: &Resource) -> Result<()> {
        self.facts
            .store()
            .deny(&[Fact::new(RBAC_TOPIC, principal.to_string(), role.name(), resource.uri())])
    }

    /// Denies every grant fact whose subject is `principal`.
    pub fn revoke_all(&self, principal: &Principal) -> Result<()> {
        let matches = self
            .facts
            .store()
            .match_fact(&Fact::new(RBAC_TOPIC, principal.to_string(), "", ""))?;
        self.facts.store().deny(&matches)
    }

    /// Denies every grant fact whose object is `resource`'s URI.
    pub fn remove_all(&self, resource: &Resource) -> Result<()> {
        let matches = self
            .facts
            .store()
            .match_fact(&Fact::new(RBAC_TOPIC, "", "", resource.uri()))?;
        self.facts.store().deny(&matches)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryFactStore;

    fn engine() -> Engine {
        let facts = GroupFacts::new(Arc::new(MemoryFactStore::new()));
        let roles = RoleMap::new([
            Role::new("janitor", [Permission::new("empty-bucket"), Permission::new("fill-bucket")]),
            Role::new("pickup-delivery", [Permission::new("pickup")]),
            Role::new("user", [Permission::new("use-thing")]),
            Role::new("lurker", [Permission::new("read-msg")]),
        ]);
        Engine::new(facts, roles)
    }

    #[test]
    fn basic_grant() {
        let e = engine();
        let scruffy = Principal::parse("test:scruffy").unwrap();
        let janitor = e.roles.get("janitor").unwrap().clone();
        let bucket = Resource::new(
            "facilities:bucket",
            [Permission::new("empty-bucket"), Permission::new("fill-bucket")],
        );
        let ship = Resource::new("spacecraft:ship", [Permission::new("board-ship")]);

        e.grant(&scruffy, &janitor, &bucket).unwrap();
        assert!(e.can(&scruffy, &Permission::new("empty-bucket"), &bucket).unwrap());
        assert!(!e.can(&scruffy, &Permission::new("board-ship"), &ship).unwrap());
    }

    #[test]
    fn capability_gate_blocks_unsupported_permission() {
        let e = engine();
        let scruffy = Principal::parse("test:scruffy").unwrap();
        let janitor = e.roles.get("janitor").unwrap().clone();
        let bucket = Resource::new(
            "facilities:bucket",
            [Permission::new("empty-bucket"), Permission::new("fill-bucket")],
        );
        e.grant(&scruffy, &janitor, &bucket).unwrap();
        assert!(!e.can(&scruffy, &Permission::new("board-ship"), &bucket).unwrap());
    }

    #[test]
    fn transitive_group_grant() {
        let e = engine();
        e.facts.add_member("affinity-group:delivery-team", "test:fry").unwrap();
        e.facts.add_member("affinity-group:delivery-team", "test:leela").unwrap();

        let team = Principal::parse("affinity-group:delivery-team").unwrap();
        let role = e.roles.get("pickup-delivery").unwrap().clone();
        let postbox = Resource::new("planet-express:postbox", [Permission::new("pickup")]);
        e.grant(&team, &role, &postbox).unwrap();

        let fry = Principal::parse("test:fry").unwrap();
        assert!(e.can(&fry, &Permission::new("pickup"), &postbox).unwrap());
        // has_grant is transitive too (it queries match_all), so fry does carry the
        // team's grant. What's absent is a *direct* grant fact naming fry.
        assert!(e.has_grant(&fry, &role, &postbox).unwrap());
        let direct = e
            .facts
            .store()
            .match_fact(&Fact::new(RBAC_TOPIC, fry.to_string(), role.name(), postbox.uri()))
            .unwrap();
        assert!(direct.is_empty());
    }

    #[test]
    fn resource_parent_inheritance() {
        let e = engine();
        let building = Resource::new("building:1", [Permission::new("use-thing")]);
        let vending = Resource::with_parent("vending-machine:1", [Permission::new("use-thing")], building.clone());
        let bender = Principal::parse("test:bender").unwrap();
        let user = e.roles.get("user").unwrap().clone();
        e.grant(&bender, &user, &building).unwrap();
        assert!(e.can(&bender, &Permission::new("use-thing"), &vending).unwrap());
    }

    #[test]
    fn scheme_wildcard_grant() {
        let e = engine();
        let anon_wildcard = Principal::parse("anon:*").unwrap();
        let lurker = e.roles.get("lurker").unwrap().clone();
        let board = Resource::new("message-board:", [Permission::new("read-msg")]);
        e.grant(&anon_wildcard, &lurker, &board).unwrap();

        let visitor = Principal::parse("anon:10.0.0.1").unwrap();
        assert!(e.can(&visitor, &Permission::new("read-msg"), &board).unwrap());
        assert!(!e.has_grant(&visitor, &lurker, &board).unwrap());
    }

    #[test]
    fn grant_is_rejected_when_already_effective() {
        let e = engine();
        let scruffy = Principal::parse("test:scruffy").unwrap();
        let janitor = e.roles.get("janitor").unwrap().clone();
        let bucket = Resource::new("facilities:bucket", [Permission::new("empty-bucket")]);
        e.grant(&scruffy, &janitor, &bucket).unwrap();
        let err = e.grant(&scruffy, &janitor, &bucket).unwrap_err();
        assert!(matches!(err, AffinityError::AlreadyGranted { .. }));
    }

    #[test]
    fn revoke_is_idempotent_and_point_local() {
        let e = engine();
        let building = Resource::new("building:1", [Permission::new("use-thing")]);
        let vending = Resource::with_parent("vending-machine:1", [Permission::new("use-thing")], building.clone());
        let bender = Principal::parse("test:bender").unwrap();
        let user = e.roles.get("user").unwrap().clone();
        e.grant(&bender, &user, &building).unwrap();

        // revoking on the child (where nothing was directly granted) is a no-op
        e.revoke(&bender, &user, &vending).unwrap();
        assert!(e.can(&bender, &Permission::new("use-thing"), &vending).unwrap());

        e.revoke(&bender, &user, &building).unwrap();
        assert!(!e.can(&bender, &Permission::new("use-thing"), &vending).unwrap());
        // revoking again is still fine
        e.revoke(&bender, &user, &building).unwrap();
    }

    #[test]
    fn revoke_all_and_remove_all() {
        let e = engine();
        let scruffy = Principal::parse("test:scruffy").unwrap();
        let janitor = e.roles.get("janitor").unwrap().clone();
        let bucket = Resource::new("facilities:bucket", [Permission::new("empty-bucket")]);
        e.grant(&scruffy, &janitor, &bucket).unwrap();
        e.revoke_all(&scruffy).unwrap();
        assert!(!e.can(&scruffy, &Permission::new("empty-bucket"), &bucket).unwrap());

        e.grant(&scruffy, &janitor, &bucket).unwrap();
        e.remove_all(&bucket).unwrap();
        assert!(!e.can(&scruffy, &Permission::new("empty-bucket"), &bucket).unwrap());
    }
}
