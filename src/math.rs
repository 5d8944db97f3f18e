// -*- mode: rust; -*-
//
// This file is part of ice-tdh2.
// Copyright (c) 2021-2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Modular arithmetic over the supplied Schnorr group: polynomial
//! evaluation, coefficient commitments, Lagrange coefficients and hashing
//! of group elements to integers.

use crate::keygen::Error;

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};

use rand::CryptoRng;
use rand::RngCore;

use sha2::Digest;
use sha2::Sha256;

/// The unsigned big-endian magnitude of `value`. The magnitude of zero has
/// no bytes.
fn be_bytes(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }

    value.to_bytes_be()
}

/// Hash the big-endian magnitudes of `parts` with SHA-256 and interpret the
/// digest as a big-endian integer.
pub(crate) fn hash_to_int(parts: &[&BigUint]) -> BigUint {
    let mut hasher = Sha256::new();

    for part in parts {
        hasher.update(be_bytes(part));
    }

    BigUint::from_bytes_be(&hasher.finalize())
}

/// Sample a polynomial coefficient uniformly in `[0, q)`.
pub(crate) fn random_coefficient<R>(rng: &mut R, q: &BigUint) -> BigUint
where
    R: RngCore + CryptoRng,
{
    rng.gen_biguint_below(q)
}

/// Sample an encryption or proof nonce uniformly in `[1, q)`.
pub(crate) fn random_nonzero_scalar<R>(rng: &mut R, q: &BigUint) -> BigUint
where
    R: RngCore + CryptoRng,
{
    rng.gen_biguint_range(&BigUint::one(), q)
}

/// Evaluate the polynomial with the given `coefficients` (constant term
/// first) at `x`, mod `q`.
pub(crate) fn evaluate_polynomial(coefficients: &[BigUint], x: u32, q: &BigUint) -> BigUint {
    let term = BigUint::from(x);
    let mut sum = BigUint::zero();

    // Evaluate using Horner's method.
    for (k, coefficient) in coefficients.iter().rev().enumerate() {
        // The secret is the constant term in the polynomial
        sum = (sum + coefficient) % q;

        if k != (coefficients.len() - 1) {
            sum = (sum * &term) % q;
        }
    }

    sum
}

/// Commit to every polynomial coefficient as `base^{a_k} mod p`.
pub(crate) fn commit_to_coefficients(
    coefficients: &[BigUint],
    base: &BigUint,
    p: &BigUint,
) -> Vec<BigUint> {
    coefficients
        .iter()
        .map(|coefficient| base.modpow(coefficient, p))
        .collect()
}

/// Combine two commitment vectors element-wise, mod `p`.
pub(crate) fn combine_commitments(a: &[BigUint], b: &[BigUint], p: &BigUint) -> Vec<BigUint> {
    a.iter().zip(b.iter()).map(|(x, y)| (x * y) % p).collect()
}

/// Evaluate a commitment vector at a participant `index` without knowing the
/// committed coefficients:
///
/// \\[ \Phi(C, i) = \prod\_{k} C\_k^{i^k} \mod p \\]
pub(crate) fn evaluate_commitment(points: &[BigUint], index: u32, p: &BigUint) -> BigUint {
    let term = BigUint::from(index);
    let mut product = BigUint::one();

    // Horner's method, in the exponent.
    for (k, point) in points.iter().rev().enumerate() {
        product = (product * point) % p;

        if k != (points.len() - 1) {
            product = product.modpow(&term, p);
        }
    }

    product
}

/// Compute the Lagrange coefficient at zero for `participant_index` with
/// respect to the interpolation set `all_participant_indices`, mod `q`.
pub(crate) fn calculate_lagrange_coefficients(
    participant_index: u32,
    all_participant_indices: &[u32],
    q: &BigUint,
) -> Result<BigUint, Error> {
    let mut num = BigUint::one();
    let mut den = BigUint::one();

    let mine = BigUint::from(participant_index);

    for j in all_participant_indices.iter() {
        if *j == participant_index {
            continue;
        }
        let s = BigUint::from(*j);

        num = (num * &s) % q;
        den = (den * mod_sub(&s, &mine, q)) % q;
    }

    if den.is_zero() {
        return Err(Error::DuplicateShares);
    }

    let den_inverse = den.modinv(q).ok_or(Error::DuplicateShares)?;

    Ok((num * den_inverse) % q)
}

/// `(a - b) mod q`.
pub(crate) fn mod_sub(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    let a = a % q;
    let b = b % q;

    if a >= b {
        a - b
    } else {
        q - b + a
    }
}
