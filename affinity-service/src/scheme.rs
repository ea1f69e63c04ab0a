//! Pluggable authentication scheme dispatch. Concrete identity-provider protocols are
//! out of the core's scope; this module specifies the interface they are expected to
//! implement, plus one dependency-free scheme for bootstrapping and tests.

use std::collections::HashMap;
use std::sync::Arc;

use affinity_core::{AffinityError, Principal, Result, Token};

/// A pluggable authentication namespace. At minimum, authenticates an inbound request.
pub trait Scheme: Send + Sync {
    /// The scheme's registered name, matched against a token's scheme field.
    fn name(&self) -> &str;

    /// Authenticates a presented token, yielding the principal it asserts or an
    /// [`AffinityError::Unauthorized`].
    fn authenticate(&self, token: &Token) -> Result<Principal>;
}

/// A scheme that additionally issues and validates bearer credentials.
pub trait TokenScheme: Scheme {
    /// Obtain credentials for `principal`.
    fn authorize(&self, principal: &Principal) -> Result<Token>;

    /// Verify credentials and recover the principal that holds them.
    fn validate(&self, token: &Token) -> Result<Principal> {
        self.authenticate(token)
    }
}

/// A scheme that additionally supports a browser-mediated sign-in handshake (e.g.
/// OpenID-style redirect and callback). Specified only at the interface: no
/// implementation ships with this crate.
pub trait HandshakeScheme: Scheme {
    /// Build the URL a browser should be redirected to in order to begin sign-in.
    fn redirect_url(&self, return_to: &str) -> Result<String>;

    /// Handle the provider's callback, recovering the authenticated principal.
    fn handle_callback(&self, query: &HashMap<String, String>) -> Result<Principal>;
}

/// A name→scheme map with idempotent-registration-is-an-error semantics and typed
/// lookup (`token`/`handshake`, alongside plain `authenticate`). Instance state, never a
/// module-scoped global: a hosting application owns one registry and passes it
/// explicitly, so nonce stores or discovery caches a concrete scheme needs live on that
/// scheme's own instance, not in process-wide statics.
///
/// A scheme registered via [`SchemeRegistry::register_token_scheme`] or
/// [`SchemeRegistry::register_handshake_scheme`] is reachable both by its base
/// [`Scheme::authenticate`] behavior and by its richer interface, since the same
/// underlying instance backs both maps (an `Arc` shared between them, not a copy).
#[derive(Default)]
pub struct SchemeRegistry {
    schemes: HashMap<String, Arc<dyn Scheme>>,
    token_schemes: HashMap<String, Arc<dyn TokenScheme>>,
    handshake_schemes: HashMap<String, Arc<dyn HandshakeScheme>>,
}

impl SchemeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unregistered(&self, name: &str) -> Result<()> {
        if self.schemes.contains_key(name) {
            return Err(AffinityError::ParseError(format!("scheme {name:?} already registered")));
        }
        Ok(())
    }

    /// Register a scheme that only authenticates inbound requests. Fails if that name is
    /// already registered.
    pub fn register(&mut self, scheme: Box<dyn Scheme>) -> Result<()> {
        self.check_unregistered(scheme.name())?;
        self.schemes.insert(scheme.name().to_string(), Arc::from(scheme));
        Ok(())
    }

    /// Register a scheme that additionally issues/validates bearer credentials. Reachable
    /// afterwards through `authenticate` as well as [`SchemeRegistry::token`].
    pub fn register_token_scheme<S>(&mut self, scheme: S) -> Result<()>
    where
        S: TokenScheme + 'static,
    {
        self.check_unregistered(scheme.name())?;
        let name = scheme.name().to_string();
        let scheme = Arc::new(scheme);
        self.schemes.insert(name.clone(), scheme.clone() as Arc<dyn Scheme>);
        self.token_schemes.insert(name, scheme as Arc<dyn TokenScheme>);
        Ok(())
    }

    /// Register a scheme that additionally supports a browser-mediated sign-in handshake.
    /// Reachable afterwards through `authenticate` as well as
    /// [`SchemeRegistry::handshake`].
    pub fn register_handshake_scheme<S>(&mut self, scheme: S) -> Result<()>
    where
        S: HandshakeScheme + 'static,
    {
        self.check_unregistered(scheme.name())?;
        let name = scheme.name().to_string();
        let scheme = Arc::new(scheme);
        self.schemes.insert(name.clone(), scheme.clone() as Arc<dyn Scheme>);
        self.handshake_schemes.insert(name, scheme as Arc<dyn HandshakeScheme>);
        Ok(())
    }

    /// Authenticate a request's token against its named scheme.
    pub fn authenticate(&self, token: &Token) -> Result<Principal> {
        let scheme = self.schemes.get(token.scheme()).ok_or_else(|| {
            AffinityError::Unauthorized(format!("unsupported scheme {:?}", token.scheme()))
        })?;
        scheme.authenticate(token)
    }

    /// Look up a registered scheme by its richer [`TokenScheme`] interface, if it was
    /// registered through [`SchemeRegistry::register_token_scheme`].
    pub fn token(&self, name: &str) -> Option<&dyn TokenScheme> {
        self.token_schemes.get(name).map(|s| s.as_ref())
    }

    /// Look up a registered scheme by its richer [`HandshakeScheme`] interface, if it was
    /// registered through [`SchemeRegistry::register_handshake_scheme`].
    pub fn handshake(&self, name: &str) -> Option<&dyn HandshakeScheme> {
        self.handshake_schemes.get(name).map(|s| s.as_ref())
    }
}

/// A dependency-free token scheme for bootstrapping and tests: the token's `id`
/// parameter is trusted directly as the principal id, with no external identity-provider
/// call. Not a model for how a production scheme should authenticate.
pub struct SharedSecretScheme {
    name: String,
    principal_scheme: String,
}

impl SharedSecretScheme {
    /// Create a scheme registered as `name` that mints principals under
    /// `principal_scheme`.
    pub fn new(name: impl Into<String>, principal_scheme: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            principal_scheme: principal_scheme.into(),
        }
    }
}

impl Scheme for SharedSecretScheme {
    fn name(&self) -> &str {
        &self.name
    }

    fn authenticate(&self, token: &Token) -> Result<Principal> {
        let id = token
            .get("id")
            .ok_or_else(|| AffinityError::Unauthorized("token missing 'id' parameter".into()))?;
        Ok(Principal::new(self.principal_scheme.clone(), id))
    }
}

impl TokenScheme for SharedSecretScheme {
    fn authorize(&self, principal: &Principal) -> Result<Token> {
        Ok(Token::new(self.name.clone(), [("id".to_string(), principal.id().to_string())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent_error() {
        let mut registry = SchemeRegistry::new();
        registry
            .register(Box::new(SharedSecretScheme::new("shared", "test")))
            .unwrap();
        let err = registry
            .register(Box::new(SharedSecretScheme::new("shared", "test")))
            .unwrap_err();
        assert!(matches!(err, AffinityError::ParseError(_)));
    }

    #[test]
    fn shared_secret_round_trip() {
        let scheme = SharedSecretScheme::new("shared", "test");
        let principal = Principal::parse("test:alice").unwrap();
        let token = scheme.authorize(&principal).unwrap();
        assert_eq!(scheme.validate(&token).unwrap(), principal);
    }

    #[test]
    fn unsupported_scheme_is_unauthorized() {
        let registry = SchemeRegistry::new();
        let token = Token::new("unknown", Vec::new());
        let err = registry.authenticate(&token).unwrap_err();
        assert!(matches!(err, AffinityError::Unauthorized(_)));
    }

    #[test]
    fn token_scheme_is_reachable_by_typed_lookup_and_by_authenticate() {
        let mut registry = SchemeRegistry::new();
        registry
            .register_token_scheme(SharedSecretScheme::new("shared", "test"))
            .unwrap();

        assert!(registry.handshake("shared").is_none());
        let scheme = registry.token("shared").expect("registered token scheme");
        let principal = Principal::parse("test:alice").unwrap();
        let issued = scheme.authorize(&principal).unwrap();
        assert_eq!(scheme.validate(&issued).unwrap(), principal);

        assert_eq!(registry.authenticate(&issued).unwrap(), principal);
    }

    #[test]
    fn registering_a_token_scheme_name_twice_is_idempotent_error() {
        let mut registry = SchemeRegistry::new();
        registry
            .register_token_scheme(SharedSecretScheme::new("shared", "test"))
            .unwrap();
        let err = registry
            .register_token_scheme(SharedSecretScheme::new("shared", "other"))
            .unwrap_err();
        assert!(matches!(err, AffinityError::ParseError(_)));
    }
}
