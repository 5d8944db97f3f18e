// -*- mode: rust; -*-
//
// This file is part of ice-tdh2.
// Copyright (c) 2021-2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Zero-knowledge proofs.

use crate::keygen::Error;
use crate::math::{hash_to_int, random_nonzero_scalar};
use crate::parameters::GroupParameters;

use num_bigint::BigUint;

use rand::CryptoRng;
use rand::RngCore;

use serde::{Deserialize, Serialize};

/// A proof that a ciphertext is well formed, created by making a
/// Chaum-Pedersen proof of equality of discrete logarithms non-interactive
/// with the Fiat-Shamir heuristic.
///
/// For a ciphertext carrying \\( u = g^r \\) and \\( u' = g'^r \\), the
/// encryptor samples \\( s \stackrel{\\$}{\leftarrow} \[1, q) \\) and
/// computes \\( w = g^s \\), \\( w' = g'^s \\),
/// \\( e = \mathcal{H}(c, u, w, u', w') \\) and
/// \\( f = s + r \cdot e \mod q \\).
///
/// Verification recomputes \\( w = g^f \cdot u^{-e} \\) and
/// \\( w' = g'^f \cdot u'^{-e} \\) and checks
/// \\( e \stackrel{?}{=} \mathcal{H}(c, u, w, u', w') \\). Binding the
/// masked plaintext `c` into the challenge is what makes the scheme secure
/// against chosen-ciphertext attacks.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NizkOfCiphertext {
    /// The challenge, tying together the ciphertext and both commitments.
    pub e: BigUint,
    /// The response encoding the encryption randomness.
    pub f: BigUint,
}

impl NizkOfCiphertext {
    /// Prove that `u` and `u_` share the discrete logarithm `r` with respect
    /// to the bases `g` and `g_`, binding the masked plaintext `c`.
    pub fn prove(
        group: &GroupParameters,
        r: &BigUint,
        c: &BigUint,
        u: &BigUint,
        u_: &BigUint,
        mut csprng: impl RngCore + CryptoRng,
    ) -> Self {
        let s = random_nonzero_scalar(&mut csprng, &group.q);

        let w = group.g.modpow(&s, &group.p);
        let w_ = group.g_.modpow(&s, &group.p);

        let e = hash_to_int(&[c, u, &w, u_, &w_]);
        let f = (s + r * &e) % &group.q;

        NizkOfCiphertext { e, f }
    }

    /// Verify that the encryptor knew the randomness tying `u` to `u_`.
    pub fn verify(
        &self,
        group: &GroupParameters,
        c: &BigUint,
        u: &BigUint,
        u_: &BigUint,
    ) -> Result<(), Error> {
        let p = &group.p;

        let u_pow_e_inverse = u
            .modpow(&self.e, p)
            .modinv(p)
            .ok_or(Error::CiphertextVerificationError)?;
        let w = (group.g.modpow(&self.f, p) * u_pow_e_inverse) % p;

        let u__pow_e_inverse = u_
            .modpow(&self.e, p)
            .modinv(p)
            .ok_or(Error::CiphertextVerificationError)?;
        let w_ = (group.g_.modpow(&self.f, p) * u__pow_e_inverse) % p;

        if hash_to_int(&[c, u, &w, u_, &w_]) == self.e {
            return Ok(());
        }

        Err(Error::CiphertextVerificationError)
    }
}

/// A proof that a decryption share was derived from the same secret share
/// as the participant's public verification key.
///
/// For a share \\( u\_i = u^{x\_i} \\) with verification key
/// \\( h\_i = g^{x\_i} \\), the participant samples
/// \\( s\_i \stackrel{\\$}{\leftarrow} \[1, q) \\) and computes
/// \\( u\_i' = u^{s\_i} \\), \\( h\_i' = g^{s\_i} \\),
/// \\( e\_i = \mathcal{H}(u\_i, u\_i', h\_i') \\) and
/// \\( f\_i = s\_i + x\_i \cdot e\_i \mod q \\).
///
/// Verification recomputes \\( u\_i' = u^{f\_i} \cdot u\_i^{-e\_i} \\) and
/// \\( h\_i' = g^{f\_i} \cdot h\_i^{-e\_i} \\), then checks
/// \\( e\_i \stackrel{?}{=} \mathcal{H}(u\_i, u\_i', h\_i') \\).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NizkOfDecryptionShare {
    /// The challenge.
    pub e: BigUint,
    /// The response encoding the participant's secret share.
    pub f: BigUint,
}

impl NizkOfDecryptionShare {
    /// Prove that `u_i` raises the ciphertext component `u` to the same
    /// secret the prover's verification key raises `g` to.
    pub fn prove(
        group: &GroupParameters,
        secret_share: &BigUint,
        u: &BigUint,
        u_i: &BigUint,
        mut csprng: impl RngCore + CryptoRng,
    ) -> Self {
        let s = random_nonzero_scalar(&mut csprng, &group.q);

        let u_i_ = u.modpow(&s, &group.p);
        let h_i_ = group.g.modpow(&s, &group.p);

        let e = hash_to_int(&[u_i, &u_i_, &h_i_]);
        let f = (s + secret_share * &e) % &group.q;

        NizkOfDecryptionShare { e, f }
    }

    /// Verify this proof against the share `u_i` and the prover's
    /// verification key `h_i`.
    pub fn verify(
        &self,
        group: &GroupParameters,
        u: &BigUint,
        u_i: &BigUint,
        h_i: &BigUint,
    ) -> Result<(), Error> {
        let p = &group.p;

        let u_i_pow_e_inverse = u_i
            .modpow(&self.e, p)
            .modinv(p)
            .ok_or(Error::DecryptionShareVerificationError)?;
        let u_i_ = (u.modpow(&self.f, p) * u_i_pow_e_inverse) % p;

        let h_i_pow_e_inverse = h_i
            .modpow(&self.e, p)
            .modinv(p)
            .ok_or(Error::DecryptionShareVerificationError)?;
        let h_i_ = (group.g.modpow(&self.f, p) * h_i_pow_e_inverse) % p;

        if hash_to_int(&[u_i, &u_i_, &h_i_]) == self.e {
            return Ok(());
        }

        Err(Error::DecryptionShareVerificationError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num_traits::One;
    use rand::rngs::OsRng;

    fn toy_group() -> GroupParameters {
        GroupParameters::new(
            BigUint::from(4u32),
            BigUint::from(6u32),
            BigUint::from(9u32),
            BigUint::from(23u32),
            BigUint::from(11u32),
        )
        .unwrap()
    }

    #[test]
    fn nizk_of_ciphertext() {
        let group = toy_group();
        let mut rng = OsRng;

        for _ in 0..50 {
            let r = random_nonzero_scalar(&mut rng, &group.q);
            let c = random_nonzero_scalar(&mut rng, &group.q);
            let u = group.g.modpow(&r, &group.p);
            let u_ = group.g_.modpow(&r, &group.p);

            let proof = NizkOfCiphertext::prove(&group, &r, &c, &u, &u_, &mut rng);

            assert!(proof.verify(&group, &c, &u, &u_).is_ok());
        }
    }

    #[test]
    fn nizk_of_ciphertext_rejects_tampered_response() {
        let group = toy_group();
        let mut rng = OsRng;

        let r = random_nonzero_scalar(&mut rng, &group.q);
        let c = BigUint::from(7u32);
        let u = group.g.modpow(&r, &group.p);
        let u_ = group.g_.modpow(&r, &group.p);

        let proof = NizkOfCiphertext::prove(&group, &r, &c, &u, &u_, &mut rng);
        let tampered = NizkOfCiphertext {
            e: proof.e.clone(),
            f: (proof.f + BigUint::one()) % &group.q,
        };

        assert!(tampered.verify(&group, &c, &u, &u_).is_err());
    }

    #[test]
    fn nizk_of_ciphertext_rejects_substituted_component() {
        let group = toy_group();
        let mut rng = OsRng;

        let r = BigUint::from(3u32);
        let c = BigUint::from(7u32);
        let u = group.g.modpow(&r, &group.p);
        let u_ = group.g_.modpow(&r, &group.p);

        let proof = NizkOfCiphertext::prove(&group, &r, &c, &u, &u_, &mut rng);

        // The proof no longer speaks about a ciphertext whose second
        // component has been replaced.
        let substituted = group.g_.modpow(&BigUint::from(5u32), &group.p);
        assert!(proof.verify(&group, &c, &u, &substituted).is_err());

        // Nor about one with a different masked plaintext.
        let other_c = BigUint::from(8u32);
        assert!(proof.verify(&group, &other_c, &u, &u_).is_err());
    }

    #[test]
    fn nizk_of_decryption_share() {
        let group = toy_group();
        let mut rng = OsRng;

        for _ in 0..50 {
            let x = random_nonzero_scalar(&mut rng, &group.q);
            let r = random_nonzero_scalar(&mut rng, &group.q);
            let u = group.g.modpow(&r, &group.p);
            let u_i = u.modpow(&x, &group.p);
            let h_i = group.g.modpow(&x, &group.p);

            let proof = NizkOfDecryptionShare::prove(&group, &x, &u, &u_i, &mut rng);

            assert!(proof.verify(&group, &u, &u_i, &h_i).is_ok());
        }
    }

    #[test]
    fn nizk_of_decryption_share_rejects_tampered_challenge() {
        let group = toy_group();
        let mut rng = OsRng;

        let x = BigUint::from(4u32);
        let r = BigUint::from(6u32);
        let u = group.g.modpow(&r, &group.p);
        let u_i = u.modpow(&x, &group.p);
        let h_i = group.g.modpow(&x, &group.p);

        let proof = NizkOfDecryptionShare::prove(&group, &x, &u, &u_i, &mut rng);
        let tampered = NizkOfDecryptionShare {
            e: proof.e.clone() + BigUint::one(),
            f: proof.f.clone(),
        };

        assert!(tampered.verify(&group, &u, &u_i, &h_i).is_err());
    }

    #[test]
    fn nizk_of_decryption_share_rejects_substituted_share() {
        let group = toy_group();
        let mut rng = OsRng;

        let x = BigUint::from(4u32);
        let r = BigUint::from(6u32);
        let u = group.g.modpow(&r, &group.p);
        let u_i = u.modpow(&x, &group.p);

        let proof = NizkOfDecryptionShare::prove(&group, &x, &u, &u_i, &mut rng);

        // A share for a different exponent enters the challenge hash, so the
        // recorded challenge cannot match.
        let substituted = u.modpow(&BigUint::from(5u32), &group.p);
        let h_i = group.g.modpow(&x, &group.p);
        assert!(proof.verify(&group, &u, &substituted, &h_i).is_err());
    }

    #[test]
    fn serde_round_trip() {
        let group = toy_group();
        let mut rng = OsRng;

        let r = random_nonzero_scalar(&mut rng, &group.q);
        let c = BigUint::from(7u32);
        let u = group.g.modpow(&r, &group.p);
        let u_ = group.g_.modpow(&r, &group.p);

        let proof = NizkOfCiphertext::prove(&group, &r, &c, &u, &u_, &mut rng);
        let encoded = serde_json::to_string(&proof).unwrap();
        let decoded: NizkOfCiphertext = serde_json::from_str(&encoded).unwrap();

        assert_eq!(proof, decoded);
        assert!(decoded.verify(&group, &c, &u, &u_).is_ok());
    }
}
