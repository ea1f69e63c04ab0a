//! Subject-grouping over a bare [`FactStore`]: transitive group membership and the
//! [`GroupFacts::match_all`] query the RBAC engine relies on.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{AffinityError, Result};
use crate::fact::{Fact, FactStore};
use crate::{GROUPS_TOPIC, GROUP_OBJECT, IS_A, MEMBER_OF};

/// Adds subject grouping to a [`FactStore`]. A fact made on a group subject is fully
/// transitive to all its descendant members, via [`GroupFacts::match_all`].
#[derive(Clone)]
pub struct GroupFacts {
    store: Arc<dyn FactStore>,
}

impl GroupFacts {
    /// Wrap a backing fact store with the group-membership layer.
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }

    /// The backing fact store, for passthrough operations (grants, revokes) that don't
    /// need group semantics.
    pub fn store(&self) -> &Arc<dyn FactStore> {
        &self.store
    }

    fn is_a_group_fact(group: &str) -> Fact {
        Fact::new(GROUPS_TOPIC, group, IS_A, GROUP_OBJECT)
    }

    fn member_of_fact(group: &str, member: &str) -> Fact {
        Fact::new(GROUPS_TOPIC, member, MEMBER_OF, group)
    }

    /// Reports whether `subject` has been declared a group.
    pub fn is_group(&self, subject: &str) -> Result<bool> {
        let matches = self.store.match_fact(&Self::is_a_group_fact(subject))?;
        Ok(!matches.is_empty())
    }

    /// Defines a new, empty subject group. Idempotent.
    pub fn add_group(&self, group: &str) -> Result<()> {
        self.store.assert(&[Self::is_a_group_fact(group)])
    }

    /// Adds a subject to a group. The group is created first if it did not already exist.
    pub fn add_member(&self, group: &str, member: &str) -> Result<()> {
        self.add_group(group)?;
        self.store.assert(&[Self::member_of_fact(group, member)])
    }

    /// Removes a subject from a group. A no-op if the subject was not a member, but an
    /// error if `group` itself was never declared a group.
    pub fn remove_member(&self, group: &str, member: &str) -> Result<()> {
        if !self.is_group(group)? {
            return Err(AffinityError::NotFound(format!("group {group:?}")));
        }
        self.store.deny(&[Self::member_of_fact(group, member)])
    }

    /// Removes a group entirely: denies every `member-of` fact naming it plus its `is-a`
    /// fact, in one batch.
    pub fn remove_group(&self, group: &str) -> Result<()> {
        let mut deny = self
            .store
            .match_fact(&Fact::new(GROUPS_TOPIC, "", MEMBER_OF, group))?;
        deny.extend(self.store.match_fact(&Self::is_a_group_fact(group))?);
        self.store.deny(&deny)
    }

    /// The immediate (one-hop) groups that `member` belongs to.
    pub fn groups(&self, member: &str) -> Result<Vec<String>> {
        let stmts = self
            .store
            .match_fact(&Fact::new(GROUPS_TOPIC, member, MEMBER_OF, ""))?;
        Ok(stmts.into_iter().map(|f| f.object).collect())
    }

    /// Reports whether `member` belongs to `group`, directly or via any chain of
    /// containing groups. Cycle-safe via a visited-set, the same traversal shape as
    /// [`GroupFacts::match_all`].
    pub fn is_member(&self, group: &str, member: &str) -> Result<bool> {
        let mut visited = BTreeSet::new();
        let mut pending = vec![member.to_string()];

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let direct = self.groups(&current)?;
            if direct.iter().any(|g| g == group) {
                return Ok(true);
            }
            for g in direct {
                if !visited.contains(&g) {
                    pending.push(g);
                }
            }
        }
        Ok(false)
    }

    /// The transitive closure match: runs `match_fact(pattern)` for the pattern's subject
    /// and every group that (transitively) contains it, accumulating all hits. Cycle-safe
    /// via a visited-set keyed on subject, so legacy cyclic membership data degrades to
    /// "no additional groups" rather than looping or erroring.
    pub fn match_all(&self, pattern: &Fact) -> Result<Vec<Fact>> {
        let mut result = Vec::new();
        let mut visited = BTreeSet::new();
        let mut pending = vec![pattern.clone()];

        while let Some(current) = pending.pop() {
            if !visited.insert(current.subject.clone()) {
                continue;
            }

            result.extend(self.store.match_fact(&current)?);

            for group in self.groups(&current.subject)? {
                if !visited.contains(&group) {
                    pending.push(pattern.with_subject(group));
                }
            }
        }

        Ok(result)
    }
}
