//! UCAN capability tokens, policies, and proof-chain validation.
//!
//! Principals named by DIDs delegate narrow, auditable permissions to each
//! other with signed [`Delegation`] tokens. A service validates that an
//! [`Invocation`] is backed by an unbroken, policy-satisfying chain of
//! delegations rooted at the resource's subject.
//!
//! The authorization flow:
//!
//! 1. A client submits an invocation along with the CIDs of its proof
//!    delegations, resolvable through a [`DelegationStore`].
//! 2. [`access::check`] verifies the invocation signature and expiry, checks
//!    the audience against the validating [`Authority`], and walks the proof
//!    set from the invocation's issuer back to the subject, enforcing time
//!    bounds, principal continuity, and per-link policies.
//! 3. A [`Capability`] binds the validated arguments to a declared shape and
//!    hands the resulting [`Task`] to the caller.
//!
//! [`DelegationStore`]: delegation::store::DelegationStore

pub mod access;
pub mod capability;
pub mod cid;
pub mod codec;
pub mod command;
pub mod crypto;
pub mod delegation;
pub mod envelope;
pub mod invocation;
pub mod issuer;
pub mod policy;
pub mod subject;
pub mod time;

pub use access::{AccessError, AccessOptions, Authority, Authorization};
pub use capability::{Capability, Task};
pub use command::Command;
pub use delegation::Delegation;
pub use invocation::Invocation;
pub use policy::{Predicate, selector::Selector};
pub use subject::Subject;
