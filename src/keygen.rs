// -*- mode: rust; -*-
//
// This file is part of ice-tdh2.
// Copyright (c) 2021-2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Pedersen-style distributed key generation for the threshold cryptosystem.
//!
//! # Details
//!
//! Key generation runs between `n` peer servers, each holding one
//! [`DistributedKeyGeneration`] actor, and tolerates up to `t` faulty peers.
//! The controller that owns the actor drives the [`Stage`] progression; the
//! actor itself only performs the local algebra, validates inbound payloads
//! and accumulates qualified material.
//!
//! ## Share distribution
//!
//! * Step #1: Every peer \\(P\_i\\) samples two random polynomials
//!            \\(f\_i(z) = \sum\_{k=0}^{t} a\_{ik} z^k\\) and
//!            \\(f'\_i(z) = \sum\_{k=0}^{t} b\_{ik} z^k\\) of degree \\(t\\)
//!            over \\(\mathbb{Z}\_q\\).
//!
//! * Step #2: Every peer \\(P\_i\\) computes the Pedersen commitment vector
//!            \\(C\_i = \[g^{a\_{i0}} h^{b\_{i0}}, \dots, g^{a\_{it}} h^{b\_{it}}\]\\)
//!            and sends \\((f\_i(j), f'\_i(j), C\_i)\\) to every peer
//!            \\(P\_j\\), keeping \\((f\_i(i), f'\_i(i))\\) for itself.
//!
//! * Step #3: Upon receiving \\((s\_1, s\_2, C\_j)\\) from peer \\(P\_j\\),
//!            peer \\(P\_i\\) verifies the commitment opening:
//!            \\(g^{s\_1} h^{s\_2} \stackrel{?}{=} \prod\_{k=0}^{t} C\_{jk}^{i^k}\\),
//!            admitting \\(P\_j\\) into its stage-1 qualified set on success.
//!
//! * Step #4: Every peer \\(P\_i\\) reveals the plain commitment vector
//!            \\(P\_i = \[g^{a\_{i0}}, \dots, g^{a\_{it}}\]\\) together with
//!            the same share, and each receiver checks
//!            \\(g^{s} \stackrel{?}{=} \prod\_{k=0}^{t} P\_{jk}^{i^k}\\),
//!            binding the public polynomial to the share admitted in stage 1.
//!
//! * Step #5: Once `t + 1` peers qualified, each peer derives its additive
//!            share of the committee secret key,
//!            \\(x\_i = \sum\_{j} f\_j(i) \bmod q\\), and the committee
//!            public key \\(y = \prod\_{j} g^{a\_{j0}} \bmod p\\) via
//!            [`DistributedKeyGeneration::finish`].
//!
//! The subsequent encryption, decryption and combination stages live in
//! [`encryption`][crate::encryption]. A complete committee walkthrough is
//! shown in the [crate documentation][crate].

use crate::encryption::{Ciphertext, DecryptionShare};
use crate::math::{
    combine_commitments, commit_to_coefficients, evaluate_commitment, evaluate_polynomial,
    random_coefficient,
};
use crate::parameters::{GroupParameters, Parameters};

use core::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use num_bigint::BigUint;
use num_traits::{One, Zero};

use parking_lot::{Condvar, Mutex};

use rand::CryptoRng;
use rand::RngCore;

use serde::{Deserialize, Serialize};

use tracing::{debug, warn};

/// Errors that may happen during key generation, encryption or threshold
/// decryption.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A payload carried a commitment vector whose length is not `t + 1`
    MalformedPayload,
    /// The plaintext does not fit in the 256-bit one-time pad
    MessageTooLarge,
    /// Stage-1 or stage-2 share verification failure
    ShareVerificationError,
    /// Ciphertext well-formedness proof failure
    CiphertextVerificationError,
    /// Decryption share proof failure
    DecryptionShareVerificationError,
    /// Fewer than `t + 1` qualified entries or decryption shares
    MissingShares,
    /// The keys have not been derived yet
    MissingKeys,
    /// No ciphertext has been installed for the current decryption session
    MissingCiphertext,
    /// The same peer appears twice in a combination subset
    DuplicateShares,
    /// Group or threshold parameters are inconsistent
    InvalidParameters,
    /// Serialisation error
    SerialisationError,
    /// A bounded wait was cancelled before the condition was established
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedPayload => {
                write!(f, "The commitment vector length is not equal to t + 1.")
            }
            Error::MessageTooLarge => {
                write!(f, "The message does not fit in 256 bits.")
            }
            Error::ShareVerificationError => {
                write!(f, "The secret share is not correct.")
            }
            Error::CiphertextVerificationError => {
                write!(f, "The ciphertext is not correct.")
            }
            Error::DecryptionShareVerificationError => {
                write!(f, "The decryption share is not correct.")
            }
            Error::MissingShares => {
                write!(f, "Fewer than t + 1 shares are available.")
            }
            Error::MissingKeys => {
                write!(f, "The committee keys have not been derived.")
            }
            Error::MissingCiphertext => {
                write!(f, "No ciphertext is installed for this session.")
            }
            Error::DuplicateShares => {
                write!(f, "Duplicate shares provided.")
            }
            Error::InvalidParameters => {
                write!(f, "The protocol parameters are inconsistent.")
            }
            Error::SerialisationError => {
                write!(f, "An error happened while deserialising.")
            }
            Error::Cancelled => {
                write!(f, "The wait was cancelled.")
            }
        }
    }
}

impl std::error::Error for Error {}

/// The stages of one protocol epoch.
///
/// Progression is owned by the controller; the actor performs no implicit
/// transitions:
///
/// ```text
/// Initial -> SendShare1 -> SendShare2 -> Encryption
/// Encryption <-> Decryption -> CombineShare -> Encryption ...
/// ```
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    /// The actor has been constructed but nothing has been exchanged.
    Initial,
    /// Pedersen openings and combined commitments are in flight.
    SendShare1,
    /// Plain commitments are in flight, binding stage-1 shares.
    SendShare2,
    /// Keys are assembled; the committee accepts plaintexts.
    Encryption,
    /// A ciphertext is installed; peers exchange decryption shares.
    Decryption,
    /// Enough decryption shares arrived to recover the plaintext.
    CombineShare,
}

/// The outbound transport seam.
///
/// The actor issues one `send` per peer, excluding itself, for every
/// broadcast. Sends are fire-and-forget: no acknowledgement, no retry, and
/// any concurrency is the implementation's own business.
pub trait Transport {
    /// Deliver `payload` to the peer endpoint at `url`, best-effort.
    fn send<P: Serialize>(&self, payload: &P, url: &str);
}

/// A peer's secret share of another peer's polynomial, admitted into the
/// qualified set after stage-1 verification.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerShare {
    /// The index of the peer the share originates from.
    pub id: u32,
    /// The polynomial evaluation \\( f\_j(i) \\) addressed to us.
    pub share: BigUint,
}

/// A qualified peer's public value \\( g^{a\_{j0}} \\), the constant-term
/// commitment contributing to the committee public key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerPublicVal {
    /// The index of the peer the value originates from.
    pub id: u32,
    /// The constant-term commitment \\( g^{a\_{j0}} \bmod p \\).
    pub public_val: BigUint,
}

/// The stage-1 payload: a Pedersen commitment vector along with the
/// receiver's opening of it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareStage1Payload {
    /// The index of the sending peer.
    pub id: u32,
    /// The receiver's evaluation \\( f\_j(i) \bmod q \\) of the sender's
    /// first polynomial.
    pub share1: BigUint,
    /// The receiver's evaluation \\( f'\_j(i) \bmod q \\) of the sender's
    /// second polynomial.
    pub share2: BigUint,
    /// The sender's Pedersen commitments
    /// \\( \[g^{a\_k} h^{b\_k} \bmod p\] \\), one per coefficient.
    pub combined_public_vals: Vec<BigUint>,
}

/// The stage-2 payload: the plain commitment vector to the sender's first
/// polynomial, binding the share admitted in stage 1.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareStage2Payload {
    /// The index of the sending peer.
    pub id: u32,
    /// The receiver's evaluation \\( f\_j(i) \bmod q \\), as in stage 1.
    pub share: BigUint,
    /// The sender's plain commitments \\( \[g^{a\_k} \bmod p\] \\).
    pub public_vals: Vec<BigUint>,
}

/// A secret key: this peer's additive share of the committee's private
/// decryption key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretKey {
    /// The peer index this key share belongs to.
    pub(crate) index: u32,
    /// The additive share \\( x\_i = \sum\_j f\_j(i) \bmod q \\).
    pub(crate) key: BigUint,
}

impl SecretKey {
    /// The peer index this key share belongs to.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Derive the corresponding public verification key
    /// \\( h\_i = g^{x\_i} \bmod p \\).
    pub fn to_public(&self, group: &GroupParameters) -> BigUint {
        group.g.modpow(&self.key, &group.p)
    }
}

/// The committee public key \\( y = g^{\sum\_j a\_{j0}} \bmod p \\), used to
/// encrypt messages towards the committee.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupKey(pub(crate) BigUint);

impl GroupKey {
    /// Serialise this group public key to its big-endian magnitude.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    /// Deserialise a group public key from a big-endian magnitude.
    pub fn from_bytes(bytes: &[u8]) -> GroupKey {
        GroupKey(BigUint::from_bytes_be(bytes))
    }
}

/// A peer's actor for one epoch of distributed key generation followed by
/// any number of threshold encryption and decryption sessions.
///
/// The actor is driven from the outside: inbound payloads are verified with
/// [`verify_stage1`][Self::verify_stage1] /
/// [`verify_stage2`][Self::verify_stage2] and accumulated through the
/// `append_*` operations, possibly from several controller threads at once.
/// Every piece of state generated at construction is immutable afterwards;
/// the three aggregators grow monotonically, each behind its own lock, and
/// the derived keys settle exactly once.
pub struct DistributedKeyGeneration {
    /// The threshold parameters for this committee.
    pub(crate) parameters: Parameters,
    /// The Schnorr group everything is computed in.
    pub(crate) group: GroupParameters,
    /// This peer's index, in `[1..n]`.
    pub(crate) index: u32,
    /// Base URLs of all peers; `servers[j]` belongs to peer `j + 1`.
    pub(crate) servers: Vec<String>,
    /// Evaluations of our first polynomial, `shares1[j] = f(j + 1)`.
    pub(crate) shares1: Vec<BigUint>,
    /// Evaluations of our second polynomial, `shares2[j] = f'(j + 1)`.
    pub(crate) shares2: Vec<BigUint>,
    /// Plain commitments to our first polynomial's coefficients.
    pub(crate) public_vals: Vec<BigUint>,
    /// Pedersen commitments to both polynomials' coefficient pairs.
    pub(crate) combined_public_vals: Vec<BigUint>,
    /// Stage-1-qualified shares addressed to us, seeded with our own.
    pub(crate) qualified_peer_shares: Mutex<Vec<PeerShare>>,
    /// Stage-2-qualified public values, seeded with our own.
    pub(crate) qualified_peer_public_vals: Mutex<Vec<PeerPublicVal>>,
    /// Decryption shares for the currently installed ciphertext.
    pub(crate) decryption_shares: Mutex<Vec<DecryptionShare>>,
    /// The ciphertext of the active decryption session, if any.
    pub(crate) ciphertext: Mutex<Option<Ciphertext>>,
    /// Signalled whenever a ciphertext is installed.
    pub(crate) ciphertext_installed: Condvar,
    /// Our additive share of the committee secret key, set by `finish`.
    pub(crate) secret_key: OnceLock<BigUint>,
    /// The committee public key, set by `finish`.
    pub(crate) group_key: OnceLock<BigUint>,
}

impl DistributedKeyGeneration {
    /// Construct a new actor for one peer of the committee.
    ///
    /// # Inputs
    ///
    /// * The [`GroupParameters`] produced by the trusted setup,
    /// * The threshold [`Parameters`],
    /// * This peer's `index` in `[1..n]`,
    /// * The base URLs of all `n` peers (`servers[j]` belongs to peer
    ///   `j + 1`), and
    /// * A cryptographically secure random number generator.
    ///
    /// Samples both secret polynomials, evaluates them at every peer index,
    /// commits to their coefficients, and seeds this peer's own entries into
    /// the qualified sets.
    pub fn new(
        group: GroupParameters,
        parameters: Parameters,
        index: u32,
        servers: Vec<String>,
        mut csprng: impl RngCore + CryptoRng,
    ) -> Result<Self, Error> {
        parameters.validate()?;

        if index < 1 || index > parameters.n {
            return Err(Error::InvalidParameters);
        }

        if servers.len() != parameters.n as usize {
            return Err(Error::InvalidParameters);
        }

        let t = parameters.t as usize;

        // Step 1: sample two random degree-t polynomials over Z_q.
        let coefficients1: Vec<BigUint> = (0..=t)
            .map(|_| random_coefficient(&mut csprng, &group.q))
            .collect();
        let coefficients2: Vec<BigUint> = (0..=t)
            .map(|_| random_coefficient(&mut csprng, &group.q))
            .collect();

        // Step 2: evaluate both polynomials at every peer index.
        let shares1: Vec<BigUint> = (1..=parameters.n)
            .map(|j| evaluate_polynomial(&coefficients1, j, &group.q))
            .collect();
        let shares2: Vec<BigUint> = (1..=parameters.n)
            .map(|j| evaluate_polynomial(&coefficients2, j, &group.q))
            .collect();

        // Step 3: commit to the first polynomial plainly, and to the pair
        //         of polynomials with Pedersen commitments.
        let public_vals = commit_to_coefficients(&coefficients1, &group.g, &group.p);
        let combined_public_vals = combine_commitments(
            &public_vals,
            &commit_to_coefficients(&coefficients2, &group.h, &group.p),
            &group.p,
        );

        // Step 4: a peer qualifies itself.
        let own_share = PeerShare {
            id: index,
            share: shares1[index as usize - 1].clone(),
        };
        let own_public_val = PeerPublicVal {
            id: index,
            public_val: public_vals[0].clone(),
        };

        Ok(DistributedKeyGeneration {
            parameters,
            group,
            index,
            servers,
            shares1,
            shares2,
            public_vals,
            combined_public_vals,
            qualified_peer_shares: Mutex::new(vec![own_share]),
            qualified_peer_public_vals: Mutex::new(vec![own_public_val]),
            decryption_shares: Mutex::new(Vec::new()),
            ciphertext: Mutex::new(None),
            ciphertext_installed: Condvar::new(),
            secret_key: OnceLock::new(),
            group_key: OnceLock::new(),
        })
    }

    /// This peer's index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The threshold parameters of this committee.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The Schnorr group of this committee.
    pub fn group(&self) -> &GroupParameters {
        &self.group
    }

    /// Our plain commitment vector, as revealed in stage 2.
    pub fn public_vals(&self) -> &[BigUint] {
        &self.public_vals
    }

    /// Our Pedersen commitment vector, as broadcast in stage 1.
    pub fn combined_public_vals(&self) -> &[BigUint] {
        &self.combined_public_vals
    }

    /// The stage-1 payload addressed to `recipient`.
    pub fn stage1_payload_for(&self, recipient: u32) -> Result<ShareStage1Payload, Error> {
        if recipient < 1 || recipient > self.parameters.n {
            return Err(Error::InvalidParameters);
        }
        let k = recipient as usize - 1;

        Ok(ShareStage1Payload {
            id: self.index,
            share1: self.shares1[k].clone(),
            share2: self.shares2[k].clone(),
            combined_public_vals: self.combined_public_vals.clone(),
        })
    }

    /// The stage-2 payload addressed to `recipient`.
    pub fn stage2_payload_for(&self, recipient: u32) -> Result<ShareStage2Payload, Error> {
        if recipient < 1 || recipient > self.parameters.n {
            return Err(Error::InvalidParameters);
        }
        let k = recipient as usize - 1;

        Ok(ShareStage2Payload {
            id: self.index,
            share: self.shares1[k].clone(),
            public_vals: self.public_vals.clone(),
        })
    }

    /// Send every other peer its stage-1 payload through `transport`,
    /// addressed to its base URL joined with `route`.
    pub fn broadcast_stage1<T: Transport>(&self, transport: &T, route: &str) {
        for (k, server) in self.servers.iter().enumerate() {
            if k as u32 + 1 == self.index {
                continue;
            }
            let payload = ShareStage1Payload {
                id: self.index,
                share1: self.shares1[k].clone(),
                share2: self.shares2[k].clone(),
                combined_public_vals: self.combined_public_vals.clone(),
            };
            transport.send(&payload, &format!("{server}{route}"));
        }
    }

    /// Send every other peer its stage-2 payload through `transport`.
    pub fn broadcast_stage2<T: Transport>(&self, transport: &T, route: &str) {
        for (k, server) in self.servers.iter().enumerate() {
            if k as u32 + 1 == self.index {
                continue;
            }
            let payload = ShareStage2Payload {
                id: self.index,
                share: self.shares1[k].clone(),
                public_vals: self.public_vals.clone(),
            };
            transport.send(&payload, &format!("{server}{route}"));
        }
    }

    /// Verify an inbound stage-1 payload: the pair `(share1, share2)` must
    /// open the sender's Pedersen commitment vector at our own index.
    pub fn verify_stage1(&self, payload: &ShareStage1Payload) -> Result<(), Error> {
        if payload.combined_public_vals.len() != self.parameters.t as usize + 1 {
            warn!(
                id = payload.id,
                "stage-1 commitment vector length is not equal to t + 1"
            );
            return Err(Error::MalformedPayload);
        }

        let p = &self.group.p;
        let opening = (self.group.g.modpow(&payload.share1, p)
            * self.group.h.modpow(&payload.share2, p))
            % p;
        let expected = evaluate_commitment(&payload.combined_public_vals, self.index, p);

        if opening == expected {
            return Ok(());
        }

        debug!(id = payload.id, "stage-1 commitment opening failed");
        Err(Error::ShareVerificationError)
    }

    /// Verify an inbound stage-2 payload: the share must match the sender's
    /// plain commitment vector evaluated at our own index, binding the
    /// public polynomial to the share admitted in stage 1.
    pub fn verify_stage2(&self, payload: &ShareStage2Payload) -> Result<(), Error> {
        if payload.public_vals.len() != self.parameters.t as usize + 1 {
            warn!(
                id = payload.id,
                "stage-2 commitment vector length is not equal to t + 1"
            );
            return Err(Error::MalformedPayload);
        }

        let p = &self.group.p;
        let opening = self.group.g.modpow(&payload.share, p);
        let expected = evaluate_commitment(&payload.public_vals, self.index, p);

        if opening == expected {
            return Ok(());
        }

        debug!(id = payload.id, "stage-2 commitment opening failed");
        Err(Error::ShareVerificationError)
    }

    /// Append a stage-1-qualified peer share, returning the new number of
    /// qualified shares.
    ///
    /// The aggregator performs no deduplication; at-most-once per peer and
    /// per stage is the controller's contract.
    pub fn append_qualified_peer_share(&self, share: PeerShare) -> usize {
        let mut shares = self.qualified_peer_shares.lock();
        shares.push(share);
        shares.len()
    }

    /// Append a stage-2-qualified peer public value, returning the new
    /// number of qualified public values.
    pub fn append_qualified_peer_public_val(&self, public_val: PeerPublicVal) -> usize {
        let mut public_vals = self.qualified_peer_public_vals.lock();
        public_vals.push(public_val);
        public_vals.len()
    }

    /// Append a validated decryption share for the current session,
    /// returning the new number of collected shares.
    pub fn append_decryption_share(&self, share: DecryptionShare) -> usize {
        let mut shares = self.decryption_shares.lock();
        shares.push(share);
        shares.len()
    }

    /// Derive this peer's secret key share and the committee public key from
    /// the qualified sets.
    ///
    /// Both keys settle on first use: repeated calls return the values
    /// derived by the first successful one.
    ///
    /// # Returns
    ///
    /// The committee [`GroupKey`] and this peer's [`SecretKey`], or
    /// [`Error::MissingShares`] if fewer than `t + 1` peers qualified or the
    /// two qualified sets disagree on their peers.
    pub fn finish(&self) -> Result<(GroupKey, SecretKey), Error> {
        let shares = self.qualified_peer_shares.lock();
        let public_vals = self.qualified_peer_public_vals.lock();

        if shares.len() < self.parameters.t as usize + 1 {
            return Err(Error::MissingShares);
        }

        let mut share_ids: Vec<u32> = shares.iter().map(|share| share.id).collect();
        let mut public_val_ids: Vec<u32> = public_vals.iter().map(|val| val.id).collect();
        share_ids.sort_unstable();
        public_val_ids.sort_unstable();
        if share_ids != public_val_ids {
            return Err(Error::MissingShares);
        }

        let mut secret = BigUint::zero();
        for share in shares.iter() {
            secret = (secret + &share.share) % &self.group.q;
        }

        let mut public = BigUint::one();
        for val in public_vals.iter() {
            public = (public * &val.public_val) % &self.group.p;
        }

        let secret = self.secret_key.get_or_init(|| secret).clone();
        let public = self.group_key.get_or_init(|| public).clone();

        Ok((
            GroupKey(public),
            SecretKey {
                index: self.index,
                key: secret,
            },
        ))
    }

    /// Install the ciphertext of a new decryption session and wake every
    /// waiter blocked in
    /// [`verify_decryption_share`][Self::verify_decryption_share].
    pub fn install_ciphertext(&self, ciphertext: Ciphertext) {
        let mut slot = self.ciphertext.lock();
        *slot = Some(ciphertext);
        self.ciphertext_installed.notify_all();
    }

    /// The ciphertext of the active decryption session, if one is installed.
    pub fn installed_ciphertext(&self) -> Option<Ciphertext> {
        self.ciphertext.lock().clone()
    }

    /// Clear the installed ciphertext and the collected decryption shares,
    /// readying the actor for the next session. When to reset is the
    /// controller's choice.
    pub fn reset_decryption_session(&self) {
        *self.ciphertext.lock() = None;
        self.decryption_shares.lock().clear();
    }

    /// Wait until a ciphertext is installed, up to `timeout`.
    ///
    /// Returns [`Error::Cancelled`] if the wait expires first; nothing is
    /// mutated in that case.
    pub(crate) fn wait_for_ciphertext(&self, timeout: Duration) -> Result<Ciphertext, Error> {
        let mut slot = self.ciphertext.lock();

        if slot.is_none() {
            let _ = self.ciphertext_installed.wait_while_for(
                &mut slot,
                |ciphertext| ciphertext.is_none(),
                timeout,
            );
        }

        slot.clone().ok_or(Error::Cancelled)
    }

    /// Our share of the committee secret key, once derived.
    pub(crate) fn secret_key_value(&self) -> Result<&BigUint, Error> {
        self.secret_key.get().ok_or(Error::MissingKeys)
    }

    /// The committee public key, once derived.
    pub(crate) fn group_key_value(&self) -> Result<&BigUint, Error> {
        self.group_key.get().ok_or(Error::MissingKeys)
    }
}
