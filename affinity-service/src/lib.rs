//! # affinity-service
//!
//! The self-governed group management application: a [`group_service::GroupService`]
//! whose own administration is gated by the [`affinity_core::Engine`] it wraps, plus a
//! [`scheme::SchemeRegistry`] for pluggable authentication schemes.

pub mod group_service;
pub mod scheme;

pub use group_service::{GroupDescriptor, GroupService};
pub use scheme::{HandshakeScheme, Scheme, SchemeRegistry, SharedSecretScheme, TokenScheme};
