//! Capability handlers with typed arguments.

use crate::{
    access::{self, AccessError, AccessOptions, Authority, Authorization},
    command::Command,
    delegation::{Delegation, store::DelegationStore},
    invocation::Invocation,
    policy::{self, Predicate},
};
use ipld_core::ipld::Ipld;
use serde::de::DeserializeOwned;
use std::{borrow::Borrow, marker::PhantomData};
use tether_varsig::{Signature, resolver::Resolver};

/// A handler's declaration: the command it serves, an own policy applied
/// to every invocation regardless of the proof chain, and the shape `A`
/// its arguments decode into.
#[derive(Debug, Clone)]
pub struct Capability<A> {
    command: Command,
    policy: Vec<Predicate>,
    arguments: PhantomData<fn() -> A>,
}

impl<A: DeserializeOwned> Capability<A> {
    /// A capability for `command` with no policy of its own.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Capability {
            command,
            policy: Vec::new(),
            arguments: PhantomData,
        }
    }

    /// A capability for `command` constrained by `policy`.
    #[must_use]
    pub fn with_policy(command: Command, policy: Vec<Predicate>) -> Self {
        Capability {
            command,
            policy,
            arguments: PhantomData,
        }
    }

    /// The command this capability serves.
    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// The capability's own policy.
    #[must_use]
    pub fn policy(&self) -> &[Predicate] {
        &self.policy
    }

    /// Validate `invocation` for this capability and bind its arguments.
    ///
    /// The invocation must name exactly this capability's command and
    /// satisfy the capability's own policy; the full proof chain is then
    /// validated through [`access::check`], and finally the generic
    /// argument map is decoded into `A`.
    ///
    /// # Errors
    ///
    /// Any [`AccessError`] from validation, or
    /// [`AccessError::MalformedArguments`] when the arguments do not
    /// decode to `A`.
    pub async fn invoke<S, T, St, R>(
        &self,
        authority: &Authority<R>,
        invocation: &Invocation<S>,
        proof_store: &St,
        options: AccessOptions,
    ) -> Result<Task<A, S, T>, AccessError>
    where
        S: Signature,
        T: Borrow<Delegation<S>>,
        St: DelegationStore<S, T>,
        R: Resolver<S>,
    {
        if invocation.command() != &self.command {
            return Err(AccessError::CommandEscalation {
                cid: invocation.to_cid(),
                delegated: self.command.clone(),
                invoked: invocation.command().clone(),
            });
        }

        let arguments = Ipld::Map(invocation.arguments().clone());
        policy::match_args(&self.policy, &arguments)?;

        let authorization = access::check(authority, invocation, proof_store, options).await?;

        let arguments: A = ipld_core::serde::from_ipld(arguments).map_err(|error| {
            AccessError::MalformedArguments {
                reason: error.to_string(),
            }
        })?;

        Ok(Task {
            arguments,
            authorization,
        })
    }
}

/// A validated, ready-to-run request: typed arguments plus the authority
/// backing them.
#[derive(Debug)]
pub struct Task<A, S: Signature, T: Borrow<Delegation<S>>> {
    arguments: A,
    authorization: Authorization<S, T>,
}

impl<A, S: Signature, T: Borrow<Delegation<S>>> Task<A, S, T> {
    /// The decoded arguments.
    #[must_use]
    pub fn arguments(&self) -> &A {
        &self.arguments
    }

    /// The validated chain behind this task.
    #[must_use]
    pub fn authorization(&self) -> &Authorization<S, T> {
        &self.authorization
    }

    /// Consume the task, keeping only the arguments.
    #[must_use]
    pub fn into_arguments(self) -> A {
        self.arguments
    }
}
