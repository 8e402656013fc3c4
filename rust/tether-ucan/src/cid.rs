//! Content addressing for tokens.

use ipld_core::cid::{Cid, multihash::Multihash};
use serde::Serialize;
use sha2::{Digest, Sha256};

const DAG_CBOR_CODE: u64 = 0x71;
const SHA2_256_CODE: u64 = 0x12;

/// Compute the CIDv1 (dag-cbor, sha2-256) of a serializable value.
///
/// Tokens are identified by the hash of their canonical DAG-CBOR encoding.
#[must_use]
#[allow(clippy::expect_used)]
pub fn to_dagcbor_cid<T: Serialize>(value: &T) -> Cid {
    let encoded = serde_ipld_dagcbor::to_vec(value)
        .expect("an in-memory token always has a DAG-CBOR encoding");
    let digest = Sha256::digest(&encoded);
    let multihash = Multihash::<64>::wrap(SHA2_256_CODE, &digest)
        .expect("a sha2-256 digest fits in a 64-byte multihash");
    Cid::new_v1(DAG_CBOR_CODE, multihash)
}
