// -*- mode: rust; -*-
//
// This file is part of ice-tdh2.
// Copyright (c) 2021-2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Threshold encryption, per-peer decryption shares and share combination.
//!
//! Once a committee has [finished][crate::keygen::DistributedKeyGeneration::finish]
//! key generation, anyone holding the [`GroupKey`][crate::keygen::GroupKey]
//! can encrypt a message towards it. A ciphertext carries a hashed
//! Diffie-Hellman mask over the plaintext together with a
//! [`NizkOfCiphertext`] making it publicly verifiable.
//!
//! To decrypt, the controller installs the ciphertext on each participating
//! peer, collects one [`DecryptionShare`] per peer, validates each share
//! against its embedded [`NizkOfDecryptionShare`], and finally combines any
//! `t + 1` valid shares by Lagrange interpolation in the exponent. No peer
//! ever reconstructs the committee secret key.

use crate::keygen::{DistributedKeyGeneration, Error, Transport};
use crate::math::{calculate_lagrange_coefficients, hash_to_int, random_nonzero_scalar};
use crate::nizk::{NizkOfCiphertext, NizkOfDecryptionShare};

use std::time::Duration;

use num_bigint::BigUint;
use num_traits::One;

use rand::CryptoRng;
use rand::RngCore;

use serde::{Deserialize, Serialize};

/// A ciphertext encrypted towards the committee public key.
///
/// `c` is the plaintext masked with a hashed Diffie-Hellman pad,
/// \\( c = \mathcal{H}(y^r) \oplus m \\), while \\( u = g^r \\) and
/// \\( u' = g'^r \\) carry the encryption randomness. The embedded proof
/// shows \\( \log\_g u = \log\_{g'} u' \\), which makes validity publicly
/// checkable before any decryption share is produced.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ciphertext {
    /// The masked plaintext.
    pub c: BigUint,
    /// The randomness carrier \\( u = g^r \bmod p \\).
    pub u: BigUint,
    /// The second carrier \\( u' = g'^r \bmod p \\).
    pub u_: BigUint,
    /// The well-formedness proof `(e, f)`.
    #[serde(flatten)]
    pub proof: NizkOfCiphertext,
}

/// One peer's contribution \\( u\_i = u^{x\_i} \\) to decrypting a
/// ciphertext, together with the peer's verification key
/// \\( h\_i = g^{x\_i} \\) and a proof of consistency between the two.
///
/// Carrying `h` inside the share lets verifiers check it without a key
/// registry lookup.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DecryptionShare {
    /// The index of the contributing peer.
    pub id: u32,
    /// The partial decryption \\( u\_i = u^{x\_i} \bmod p \\).
    pub u: BigUint,
    /// The peer's public verification key \\( h\_i = g^{x\_i} \bmod p \\).
    pub h: BigUint,
    /// The consistency proof `(e, f)`.
    #[serde(flatten)]
    pub proof: NizkOfDecryptionShare,
}

impl DistributedKeyGeneration {
    /// Encrypt a message of at most 256 bits towards the committee.
    ///
    /// # Errors
    ///
    /// * [`Error::MessageTooLarge`] if the plaintext exceeds the 256-bit
    ///   one-time pad.
    /// * [`Error::MissingKeys`] if [`finish`][Self::finish] has not derived
    ///   the committee key yet.
    pub fn encrypt(
        &self,
        message: &BigUint,
        mut csprng: impl RngCore + CryptoRng,
    ) -> Result<Ciphertext, Error> {
        if message.bits() > 256 {
            return Err(Error::MessageTooLarge);
        }

        let y = self.group_key_value()?;
        let group = &self.group;

        let r = random_nonzero_scalar(&mut csprng, &group.q);

        let c = hash_to_int(&[&y.modpow(&r, &group.p)]) ^ message;
        let u = group.g.modpow(&r, &group.p);
        let u_ = group.g_.modpow(&r, &group.p);

        let proof = NizkOfCiphertext::prove(group, &r, &c, &u, &u_, &mut csprng);

        Ok(Ciphertext { c, u, u_, proof })
    }

    /// Check a ciphertext's well-formedness proof.
    pub fn verify_ciphertext(&self, ciphertext: &Ciphertext) -> Result<(), Error> {
        ciphertext
            .proof
            .verify(&self.group, &ciphertext.c, &ciphertext.u, &ciphertext.u_)
    }

    /// Produce this peer's decryption share for `ciphertext`, proving its
    /// consistency with our verification key.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingKeys`] if [`finish`][Self::finish] has not derived
    ///   our secret key share yet.
    pub fn decryption_share(
        &self,
        ciphertext: &Ciphertext,
        mut csprng: impl RngCore + CryptoRng,
    ) -> Result<DecryptionShare, Error> {
        let x_i = self.secret_key_value()?;
        let group = &self.group;

        let u_i = ciphertext.u.modpow(x_i, &group.p);
        let h_i = group.g.modpow(x_i, &group.p);

        let proof = NizkOfDecryptionShare::prove(group, x_i, &ciphertext.u, &u_i, &mut csprng);

        Ok(DecryptionShare {
            id: self.index,
            u: u_i,
            h: h_i,
            proof,
        })
    }

    /// Check an inbound decryption share against the ciphertext of the
    /// current session.
    ///
    /// If no ciphertext is installed yet, the call suspends until the
    /// controller [installs][Self::install_ciphertext] one, bounded by
    /// `timeout`. Expiry reports [`Error::Cancelled`] and leaves no state
    /// behind.
    pub fn verify_decryption_share(
        &self,
        share: &DecryptionShare,
        timeout: Duration,
    ) -> Result<(), Error> {
        let ciphertext = self.wait_for_ciphertext(timeout)?;

        share
            .proof
            .verify(&self.group, &ciphertext.u, &share.u, &share.h)
    }

    /// Combine the first `t + 1` collected decryption shares into the
    /// plaintext of the installed ciphertext.
    ///
    /// The combination subset is the arrival-order prefix, which keeps
    /// repeated runs reproducible. All shares are expected to have passed
    /// [`verify_decryption_share`][Self::verify_decryption_share].
    ///
    /// # Errors
    ///
    /// * [`Error::MissingCiphertext`] if no ciphertext is installed.
    /// * [`Error::MissingShares`] if fewer than `t + 1` shares arrived.
    /// * [`Error::DuplicateShares`] if a peer appears twice in the subset.
    pub fn combine_shares(&self) -> Result<BigUint, Error> {
        let ciphertext = self
            .installed_ciphertext()
            .ok_or(Error::MissingCiphertext)?;
        let shares = self.decryption_shares.lock();

        let subset_size = self.parameters.t as usize + 1;
        if shares.len() < subset_size {
            return Err(Error::MissingShares);
        }

        let subset = &shares[..subset_size];
        let indices: Vec<u32> = subset.iter().map(|share| share.id).collect();

        let mut deduplicated = indices.clone();
        deduplicated.sort_unstable();
        deduplicated.dedup();
        if deduplicated.len() != indices.len() {
            return Err(Error::DuplicateShares);
        }

        let mut product = BigUint::one();
        for share in subset.iter() {
            let coefficient =
                calculate_lagrange_coefficients(share.id, &indices, &self.group.q)?;
            product = (product * share.u.modpow(&coefficient, &self.group.p)) % &self.group.p;
        }

        Ok(hash_to_int(&[&product]) ^ &ciphertext.c)
    }

    /// Send a ciphertext to every other peer through `transport`.
    pub fn broadcast_ciphertext<T: Transport>(
        &self,
        ciphertext: &Ciphertext,
        transport: &T,
        route: &str,
    ) {
        for (k, server) in self.servers.iter().enumerate() {
            if k as u32 + 1 == self.index {
                continue;
            }
            transport.send(ciphertext, &format!("{server}{route}"));
        }
    }

    /// Send our decryption share to every other peer through `transport`.
    pub fn broadcast_decryption_share<T: Transport>(
        &self,
        share: &DecryptionShare,
        transport: &T,
        route: &str,
    ) {
        for (k, server) in self.servers.iter().enumerate() {
            if k as u32 + 1 == self.index {
                continue;
            }
            transport.send(share, &format!("{server}{route}"));
        }
    }
}
