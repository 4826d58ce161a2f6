//! Effect system: structured definitions, the generic resolver, and the
//! legacy shims.
//!
//! ## Design
//!
//! All three card types express what they do in one vocabulary
//! ([`EffectDef`]) interpreted by one resolver ([`resolver::resolve`]).
//! Older free-text card data reaches the same vocabulary through the
//! keyword/per-id shims in [`shim`], which exist for compatibility and are
//! not a pattern to extend.

pub mod effect;
pub mod resolver;
pub mod shim;

pub use effect::{EffectDef, EffectKind, StatusKind, TargetRef, TargetRequirement};
pub use resolver::{resolve, validate_target, ResolveResult, ResolverCtx};
