//! Delegation stores.

use std::{
    borrow::Borrow,
    cell::RefCell,
    collections::HashMap,
    convert::Infallible,
    error::Error,
    future::Future,
    hash::BuildHasher,
    rc::Rc,
    sync::{Arc, Mutex},
};

use ipld_core::cid::Cid;
use tether_varsig::signature::Signature;
use thiserror::Error;

use super::Delegation;

/// CID-keyed storage for delegations, used to resolve an invocation's
/// proof links.
///
/// `T` is how stored delegations are handed out, typically `Rc` or `Arc`.
pub trait DelegationStore<S: Signature, T: Borrow<Delegation<S>>> {
    /// Error type for insertion operations.
    type InsertError: Error;

    /// Error type for retrieval operations.
    type GetError: Error;

    /// Look up every CID, failing if any is absent.
    fn get_all<'a>(
        &'a self,
        cids: &'a [Cid],
    ) -> impl Future<Output = Result<Vec<T>, Self::GetError>> + 'a;

    /// Store a delegation under the given CID.
    fn insert_by_cid(
        &self,
        cid: Cid,
        delegation: T,
    ) -> impl Future<Output = Result<(), Self::InsertError>> + '_;
}

/// Insert a delegation keyed by its own CID, returning the CID.
///
/// # Errors
///
/// Propagates the store's insertion error.
pub async fn insert<S, T, St>(store: &St, delegation: T) -> Result<Cid, St::InsertError>
where
    S: Signature,
    T: Borrow<Delegation<S>>,
    St: DelegationStore<S, T>,
{
    let cid = delegation.borrow().to_cid();
    store.insert_by_cid(cid, delegation).await?;
    Ok(cid)
}

impl<S: Signature, H: BuildHasher> DelegationStore<S, Rc<Delegation<S>>>
    for Rc<RefCell<HashMap<Cid, Rc<Delegation<S>>, H>>>
{
    type InsertError = Infallible;
    type GetError = Missing;

    async fn insert_by_cid(
        &self,
        cid: Cid,
        delegation: Rc<Delegation<S>>,
    ) -> Result<(), Self::InsertError> {
        self.borrow_mut().insert(cid, delegation);
        Ok(())
    }

    async fn get_all<'a>(
        &'a self,
        cids: &'a [Cid],
    ) -> Result<Vec<Rc<Delegation<S>>>, Self::GetError> {
        let store = RefCell::borrow(self);
        cids.iter()
            .map(|cid| store.get(cid).cloned().ok_or(Missing(*cid)))
            .collect()
    }
}

impl<S: Signature, H: BuildHasher> DelegationStore<S, Arc<Delegation<S>>>
    for Arc<Mutex<HashMap<Cid, Arc<Delegation<S>>, H>>>
{
    type InsertError = StorePoisoned;
    type GetError = LockedStoreGetError;

    async fn insert_by_cid(
        &self,
        cid: Cid,
        delegation: Arc<Delegation<S>>,
    ) -> Result<(), Self::InsertError> {
        let mut locked = self.lock().map_err(|_| StorePoisoned)?;
        locked.insert(cid, delegation);
        Ok(())
    }

    async fn get_all<'a>(
        &'a self,
        cids: &'a [Cid],
    ) -> Result<Vec<Arc<Delegation<S>>>, Self::GetError> {
        let locked = self.lock().map_err(|_| StorePoisoned)?;
        cids.iter()
            .map(|cid| {
                locked
                    .get(cid)
                    .cloned()
                    .ok_or(LockedStoreGetError::Missing(Missing(*cid)))
            })
            .collect()
    }
}

/// The delegation store's [`Mutex`] is poisoned.
#[derive(Debug, Clone, Copy, Error)]
#[error("delegation store poisoned")]
pub struct StorePoisoned;

/// A requested delegation is not in the store.
#[derive(Debug, Clone, Copy, Error)]
#[error("delegation with cid {0} is missing")]
pub struct Missing(pub Cid);

/// Retrieval failure against a mutex-guarded store.
#[derive(Debug, Clone, Copy, Error)]
pub enum LockedStoreGetError {
    /// Delegation is missing.
    #[error(transparent)]
    Missing(#[from] Missing),

    /// Mutex was poisoned.
    #[error(transparent)]
    StorePoisoned(#[from] StorePoisoned),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::Command, subject::Subject};
    use testresult::TestResult;
    use tether_credentials::ed25519::Ed25519Signer;
    use tether_varsig::{eddsa::Ed25519Signature, principal::Principal};

    async fn sample_delegation(seed: u8) -> Delegation<Ed25519Signature> {
        let issuer = Ed25519Signer::import(&[seed; 32]).await.unwrap();
        Delegation::builder()
            .audience(issuer.did())
            .subject(Subject::Specific(issuer.did()))
            .command(Command::top())
            .try_sign(&issuer)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_and_get_through_shared_map() -> TestResult {
        let store: Arc<Mutex<HashMap<Cid, Arc<Delegation<Ed25519Signature>>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let delegation = Arc::new(sample_delegation(3).await);
        let cid = insert(&store, delegation.clone()).await?;
        assert_eq!(cid, delegation.to_cid());

        let found = store.get_all(&[cid]).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_cid(), cid);
        Ok(())
    }

    #[tokio::test]
    async fn missing_cid_is_an_error() -> TestResult {
        let store: Rc<RefCell<HashMap<Cid, Rc<Delegation<Ed25519Signature>>>>> =
            Rc::new(RefCell::new(HashMap::new()));

        let delegation = Rc::new(sample_delegation(4).await);
        let absent = sample_delegation(5).await.to_cid();
        let cid = insert(&store, delegation).await?;

        let err = store.get_all(&[cid, absent]).await.unwrap_err();
        assert_eq!(err.0, absent);
        Ok(())
    }
}
