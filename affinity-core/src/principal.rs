//! Authenticated identities: `scheme:id` pairs, with a reserved wildcard id.

use std::fmt;
use std::str::FromStr;

use crate::error::AffinityError;
use crate::WILDCARD_ID;

/// An authenticated identity, user or group, named `scheme:id`.
///
/// `id = "*"` is a scheme wildcard: it is admissible as a grant subject and matches any
/// id under that scheme during containment checks, but it must never be the identity of
/// an authenticated caller.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Principal {
    scheme: String,
    id: String,
}

impl Principal {
    /// Build a principal directly from its parts. Panics if either part is empty; callers
    /// parsing untrusted input should use [`Principal::parse`] instead.
    pub fn new(scheme: impl Into<String>, id: impl Into<String>) -> Self {
        let scheme = scheme.into();
        let id = id.into();
        assert!(!scheme.is_empty(), "principal scheme must not be empty");
        assert!(!id.is_empty(), "principal id must not be empty");
        Self { scheme, id }
    }

    /// Parse a `scheme:id` string. The first `:` is the separator; any further `:` belong
    /// to `id`. Fails if either side is empty or no `:` is present.
    pub fn parse(s: &str) -> Result<Self, AffinityError> {
        let (scheme, id) = s
            .split_once(':')
            .ok_or_else(|| AffinityError::ParseError(format!("missing ':' in principal {s:?}")))?;
        if scheme.is_empty() || id.is_empty() {
            return Err(AffinityError::ParseError(format!(
                "principal scheme and id must be non-empty: {s:?}"
            )));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            id: id.to_string(),
        })
    }

    /// The scheme (authentication namespace) component.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The id component.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reports whether this principal is a scheme-level wildcard (`id == "*"`).
    pub fn is_wildcard(&self) -> bool {
        self.id == WILDCARD_ID
    }

    /// The scheme wildcard principal for this principal's scheme, e.g. `anon:10.0.0.1`
    /// yields `anon:*`.
    pub fn scheme_wildcard(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            id: WILDCARD_ID.to_string(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.id)
    }
}

impl FromStr for Principal {
    type Err = AffinityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}


#[cfg(test)]
mod proptest_round_trip {
    use super::*;
    use proptest::prelude::*;

    fn arb_principal() -> impl Strategy<Value = Principal> {
        ("[a-zA-Z][a-zA-Z0-9_-]{0,7}", "[a-zA-Z0-9:_-]{1,12}")
            .prop_map(|(scheme, id)| Principal::new(scheme, id))
    }

    proptest! {
        #[test]
        fn parse_of_to_string_is_identity(p in arb_principal()) {
            prop_assert_eq!(Principal::parse(&p.to_string()).unwrap(), p);
        }
    }
}
