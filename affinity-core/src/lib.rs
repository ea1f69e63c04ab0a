//! # affinity-core
//!
//! The fact knowledge base, group membership layer and RBAC evaluation engine
//! described for the `affinity` group management system.
//!
//! ## Fact store
//! A [`FactStore`] is a small triple store: facts are `(topic, subject, predicate, object)`
//! tuples, matched with empty-string wildcards. [`GroupFacts`] layers transitive
//! subject-grouping over any `FactStore`, and [`rbac::Engine`] answers `can`/`has_grant`
//! queries by walking resource parent chains over a `GroupFacts`.
//!
//! ## Case study: granting through a group
//! Granting a role to a group principal and adding members to that group is enough for
//! `can` to return true for every (possibly transitive) member, without asserting a fact
//! per member. `GroupFacts::match_all` is what makes this work: it substitutes every group
//! that (transitively) contains a subject into the query pattern before delegating to
//! `FactStore::match_fact`.

pub mod error;
pub mod fact;
pub mod group_facts;
pub mod memory;
pub mod permission;
pub mod principal;
pub mod rbac;
pub mod resource;
pub mod role;
pub mod token;

pub use error::{AffinityError, Result};
pub use fact::{Fact, FactStore};
pub use group_facts::GroupFacts;
pub use memory::MemoryFactStore;
pub use permission::{Permission, PermissionMap};
pub use principal::Principal;
pub use rbac::Engine;
pub use resource::Resource;
pub use role::{Role, RoleMap};
pub use token::Token;

/// Reserved topic for subject-grouping facts.
pub const GROUPS_TOPIC: &str = "affinity:groups";
/// Reserved topic for RBAC grant facts.
pub const RBAC_TOPIC: &str = "affinity:rbac";
/// Predicate asserting that a subject is a group.
pub const IS_A: &str = "is-a";
/// Object value paired with [`IS_A`] to mark a group.
pub const GROUP_OBJECT: &str = "group";
/// Predicate asserting that a subject is a member of the object group.
pub const MEMBER_OF: &str = "member-of";
/// Id reserved for scheme-level wildcard principals.
pub const WILDCARD_ID: &str = "*";
/// Maximum depth a resource parent chain is walked before giving up on a cycle.
pub const MAX_PARENT_DEPTH: usize = 64;
