//! Proof-chain validation.
//!
//! [`check`] is the authorization entry point: given an invocation and a
//! store holding its proof delegations, it verifies the invocation itself
//! and then walks the proof set from the invocation's issuer back to the
//! subject, one delegation per hop. Every hop must be issued to the
//! principal the walk currently needs, speak for the invocation's subject
//! (or be a powerline delegation), be temporally valid, carry a good
//! signature, cover the invoked command, and accept the invocation's
//! arguments under its policy. The walk ends at a root delegation issued
//! by the subject itself, or immediately when the invocation is
//! self-issued.

use crate::{
    command::Command,
    delegation::{
        Delegation, SignatureVerificationError,
        store::DelegationStore,
    },
    invocation::Invocation,
    policy::{self, MatchError},
    subject::Subject,
    time::{TimeRange, Timestamp},
};
use ipld_core::{cid::Cid, ipld::Ipld};
use std::{
    borrow::Borrow,
    collections::{HashMap, HashSet},
    marker::PhantomData,
};
use tether_varsig::{Signature, did::Did, resolver::Resolver};
use thiserror::Error;
use tracing::{debug, trace};

/// The validating service: the DID invocations must be addressed to,
/// plus the resolver used to turn token issuers into verifiers.
#[derive(Debug, Clone)]
pub struct Authority<R> {
    did: Did,
    resolver: R,
}

impl<R> Authority<R> {
    /// An authority with the given DID and resolver.
    pub fn new(did: Did, resolver: R) -> Self {
        Authority { did, resolver }
    }

    /// The authority's own DID.
    #[must_use]
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The DID resolver.
    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

/// Decides whether `issuer` may act for `subject` without any proof.
///
/// The arguments are `(subject, issuer)`.
pub type CanIssue = fn(&Did, &Did) -> bool;

/// The default [`CanIssue`]: only the subject itself.
#[must_use]
pub fn self_issued(subject: &Did, issuer: &Did) -> bool {
    subject == issuer
}

/// Knobs for a [`check`] call.
#[derive(Debug, Clone, Copy)]
pub struct AccessOptions {
    /// The instant to validate against. Defaults to the current time.
    pub now: Option<Timestamp>,

    /// Whether the invocation's audience must equal the authority's DID.
    pub check_audience: bool,

    /// Proof-free issuing rule. Defaults to [`self_issued`].
    pub can_issue: CanIssue,
}

impl Default for AccessOptions {
    fn default() -> Self {
        AccessOptions {
            now: None,
            check_audience: true,
            can_issue: self_issued,
        }
    }
}

/// A validated invocation's authority: the delegation chain actually
/// used, ordered root to leaf, and the validity window common to the
/// whole chain.
#[derive(Debug)]
pub struct Authorization<S: Signature, T: Borrow<Delegation<S>>> {
    chain: Vec<T>,
    time_range: TimeRange,
    signature: PhantomData<S>,
}

impl<S: Signature, T: Borrow<Delegation<S>>> Authorization<S, T> {
    /// The delegations used, root first. Empty for a self-issued
    /// invocation.
    #[must_use]
    pub fn proofs(&self) -> &[T] {
        &self.chain
    }

    /// The intersection of the invocation's and every proof's validity
    /// window.
    #[must_use]
    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }
}

/// Authorization failure.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A token's expiration lies in the past.
    #[error("token {cid} expired at {expiration}")]
    Expired {
        /// The expired token.
        cid: Cid,
        /// Its expiration.
        expiration: Timestamp,
    },

    /// A delegation's validity has not begun yet.
    #[error("delegation {cid} is not valid before {not_before}")]
    TooEarly {
        /// The inactive delegation.
        cid: Cid,
        /// When it becomes valid.
        not_before: Timestamp,
    },

    /// A token's signature did not verify against its issuer's key.
    #[error("signature on token {cid} is invalid")]
    InvalidSignature {
        /// The offending token.
        cid: Cid,
        /// The verification failure.
        #[source]
        source: signature::Error,
    },

    /// No key could be resolved to verify a token's signature.
    #[error("cannot resolve a key to verify token {cid}: {reason}")]
    UnverifiableSignature {
        /// The unverifiable token.
        cid: Cid,
        /// Why resolution failed.
        reason: String,
    },

    /// The invocation is addressed to someone else.
    #[error("invocation is addressed to {audience}, not to this authority ({expected})")]
    InvalidAudience {
        /// The invocation's effective audience.
        audience: Did,
        /// The validating authority's DID.
        expected: Did,
    },

    /// A policy along the chain rejected the invocation's arguments.
    #[error(transparent)]
    Policy(#[from] MatchError),

    /// The invoked command is not covered by a delegation in the chain.
    #[error("delegation {cid} delegates {delegated}, which does not cover {invoked}")]
    CommandEscalation {
        /// The too-narrow delegation.
        cid: Cid,
        /// The command it delegates.
        delegated: Command,
        /// The command being invoked.
        invoked: Command,
    },

    /// A proof is issued to the wrong principal for its place in the
    /// chain.
    #[error("delegation {cid} is issued to {audience}, but the chain needs a delegation to {required}")]
    PrincipalAlignment {
        /// The misaligned delegation.
        cid: Cid,
        /// Who it is issued to.
        audience: Did,
        /// Who the chain needs it issued to.
        required: Did,
    },

    /// A proof speaks for the wrong subject.
    #[error("delegation {cid} speaks for {subject}, but the invocation targets {required}")]
    SubjectAlignment {
        /// The misaligned delegation.
        cid: Cid,
        /// The subject it speaks for.
        subject: Subject,
        /// The invocation's subject.
        required: Did,
    },

    /// The chain is structurally invalid.
    #[error(transparent)]
    InvalidClaim(#[from] InvalidClaim),

    /// A required proof could not be produced.
    #[error(transparent)]
    UnavailableProof(#[from] ProofGap),

    /// The invocation's arguments do not decode to the declared shape.
    #[error("invocation arguments do not have the expected shape: {reason}")]
    MalformedArguments {
        /// The decode failure.
        reason: String,
    },
}

/// Structural chain violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidClaim {
    /// A powerline delegation was offered as the chain root. A powerline
    /// delegation never commits to the real subject, so it cannot anchor
    /// a chain.
    #[error("powerline delegation {cid} cannot be the root of a chain")]
    PowerlineRoot {
        /// The powerline delegation.
        cid: Cid,
    },

    /// The walk came back to a delegation it already used.
    #[error("delegation {cid} appears twice in the chain")]
    CircularChain {
        /// The revisited delegation.
        cid: Cid,
    },
}

/// A hole in the proof set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofGap {
    /// The proof store failed to produce a referenced delegation.
    #[error("a referenced proof could not be resolved: {0}")]
    Store(String),

    /// No delegation in the proof set continues the chain.
    #[error("no delegation issued to {issuer} over subject {subject} is present in the proof set")]
    NoCandidate {
        /// The principal the walk needs a delegation issued to.
        issuer: Did,
        /// The invocation's subject.
        subject: Did,
    },
}

fn signature_failure<E: std::error::Error>(
    cid: Cid,
    error: SignatureVerificationError<E>,
) -> AccessError {
    match error {
        SignatureVerificationError::VerificationError(source) => {
            AccessError::InvalidSignature { cid, source }
        }
        SignatureVerificationError::ResolutionError(error) => AccessError::UnverifiableSignature {
            cid,
            reason: error.to_string(),
        },
        SignatureVerificationError::EncodingError(error) => AccessError::UnverifiableSignature {
            cid,
            reason: error.to_string(),
        },
    }
}

/// Validate `invocation` against `authority`, resolving its proof links
/// through `proof_store`.
///
/// The invocation's signature, expiry and audience are checked first.
/// The proof walk then starts at the invocation's issuer and follows
/// delegations backwards until the subject itself has issued one (the
/// root), or until `can_issue` accepts the current principal outright.
/// Each hop's policy is matched against the invocation's arguments; the
/// policies constrain the eventual invocation, not the delegations
/// themselves.
///
/// # Errors
///
/// Any failed check aborts the whole validation with the corresponding
/// [`AccessError`]. Partial authorization is never returned.
pub async fn check<S, T, St, R>(
    authority: &Authority<R>,
    invocation: &Invocation<S>,
    proof_store: &St,
    options: AccessOptions,
) -> Result<Authorization<S, T>, AccessError>
where
    S: Signature,
    T: Borrow<Delegation<S>>,
    St: DelegationStore<S, T>,
    R: Resolver<S>,
{
    let now = options.now.unwrap_or_else(Timestamp::now);
    let invocation_cid = invocation.to_cid();

    invocation
        .verify_signature(authority.resolver())
        .await
        .map_err(|error| signature_failure(invocation_cid, error))?;

    if let Some(expiration) = invocation.expiration()
        && now > expiration
    {
        return Err(AccessError::Expired {
            cid: invocation_cid,
            expiration,
        });
    }

    if options.check_audience && invocation.audience() != authority.did() {
        return Err(AccessError::InvalidAudience {
            audience: invocation.audience().clone(),
            expected: authority.did().clone(),
        });
    }

    let proofs: Vec<T> = proof_store
        .get_all(invocation.proofs())
        .await
        .map_err(|error| ProofGap::Store(error.to_string()))?;
    let cids: Vec<Cid> = proofs
        .iter()
        .map(|proof| proof.borrow().to_cid())
        .collect();

    let subject = invocation.subject();
    let arguments = Ipld::Map(invocation.arguments().clone());
    let mut time_range = TimeRange::from(invocation);

    let mut need = invocation.issuer().clone();
    let mut visited: HashSet<Cid> = HashSet::new();
    let mut walk: Vec<Cid> = Vec::new();

    debug!(%subject, issuer = %need, proofs = proofs.len(), "validating proof chain");

    loop {
        if (options.can_issue)(subject, &need) {
            trace!(issuer = %need, "chain terminates, principal can issue for the subject");
            break;
        }

        let Some(selected) = select_candidate(&proofs, &need, subject) else {
            return Err(diagnose_gap(&proofs, &cids, &need, subject));
        };
        let cid = cids[selected];
        let delegation = proofs[selected].borrow();
        trace!(%cid, issuer = %delegation.issuer(), "following delegation");

        if !visited.insert(cid) {
            return Err(InvalidClaim::CircularChain { cid }.into());
        }

        if let Some(expiration) = delegation.expiration()
            && now > expiration
        {
            return Err(AccessError::Expired { cid, expiration });
        }
        if let Some(not_before) = delegation.not_before()
            && now < not_before
        {
            return Err(AccessError::TooEarly { cid, not_before });
        }

        delegation
            .verify_signature(authority.resolver())
            .await
            .map_err(|error| signature_failure(cid, error))?;

        policy::match_args(delegation.policy(), &arguments)?;

        if !invocation.command().starts_with(delegation.command()) {
            return Err(AccessError::CommandEscalation {
                cid,
                delegated: delegation.command().clone(),
                invoked: invocation.command().clone(),
            });
        }

        time_range = time_range.intersect(TimeRange::from(delegation));
        walk.push(cid);

        if delegation.issuer() == subject {
            if matches!(delegation.subject(), Subject::Any) {
                return Err(InvalidClaim::PowerlineRoot { cid }.into());
            }
            trace!(%cid, "reached the root delegation");
            break;
        }

        need = delegation.issuer().clone();
    }

    debug!(links = walk.len(), %time_range, "proof chain validated");

    let mut by_cid: HashMap<Cid, T> = cids.into_iter().zip(proofs).collect();
    let chain = walk
        .into_iter()
        .rev()
        .filter_map(|cid| by_cid.remove(&cid))
        .collect();

    Ok(Authorization {
        chain,
        time_range,
        signature: PhantomData,
    })
}

fn select_candidate<S, T>(proofs: &[T], need: &Did, subject: &Did) -> Option<usize>
where
    S: Signature,
    T: Borrow<Delegation<S>>,
{
    // Prefer a root delegation committed to the subject, then any
    // committed delegation, then powerlines. Ties go to the first
    // occurrence, keeping the search deterministic for a given proof
    // order. Exactly one candidate is followed per hop, with no
    // backtracking: if two same-rank delegations serve the same
    // principal and only the later one chains to the root, validation
    // fails rather than retrying the other branch.
    let mut best: Option<(usize, u8)> = None;
    for (index, proof) in proofs.iter().enumerate() {
        let delegation = proof.borrow();
        if delegation.audience() != need || !delegation.subject().allows(subject) {
            continue;
        }
        let committed = matches!(delegation.subject(), Subject::Specific(_));
        let rank = match (delegation.issuer() == subject, committed) {
            (true, true) => 0,
            (_, true) => 1,
            _ => 2,
        };
        if best.is_none_or(|(_, best_rank)| rank < best_rank) {
            best = Some((index, rank));
        }
    }
    best.map(|(index, _)| index)
}

fn diagnose_gap<S, T>(proofs: &[T], cids: &[Cid], need: &Did, subject: &Did) -> AccessError
where
    S: Signature,
    T: Borrow<Delegation<S>>,
{
    // Distinguish "no proof exists at all" from "a proof is present but
    // misaligned": a delegation to the right audience with the wrong
    // subject, or over the right subject but to the wrong audience.
    for (index, proof) in proofs.iter().enumerate() {
        let delegation = proof.borrow();
        if delegation.audience() == need {
            return AccessError::SubjectAlignment {
                cid: cids[index],
                subject: delegation.subject().clone(),
                required: subject.clone(),
            };
        }
    }
    for (index, proof) in proofs.iter().enumerate() {
        let delegation = proof.borrow();
        if delegation.subject().allows(subject) {
            return AccessError::PrincipalAlignment {
                cid: cids[index],
                audience: delegation.audience().clone(),
                required: need.clone(),
            };
        }
    }
    ProofGap::NoCandidate {
        issuer: need.clone(),
        subject: subject.clone(),
    }
    .into()
}
