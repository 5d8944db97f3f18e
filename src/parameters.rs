// -*- mode: rust; -*-
//
// This file is part of ice-tdh2.
// Copyright (c) 2021-2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Configurable parameters for an instance of the threshold cryptosystem.

use crate::keygen::Error;

use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};

/// The configuration parameters for conducting the process of creating a
/// threshold decryption committee.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Parameters {
    /// The number of participants in the scheme.
    pub n: u32,
    /// The number of participants the scheme tolerates being faulty.
    ///
    /// Any `t + 1` participants can jointly decrypt; `t` or fewer learn
    /// nothing about the plaintext.
    pub t: u32,
}

impl Parameters {
    /// Check the parameter invariant `1 <= t < n`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.t >= 1 && self.t < self.n {
            return Ok(());
        }

        Err(Error::InvalidParameters)
    }

    /// Serialise these parameters as an array of bytes
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut res = [0u8; 8];
        res[0..4].copy_from_slice(&self.n.to_le_bytes());
        res[4..8].copy_from_slice(&self.t.to_le_bytes());

        res
    }

    /// Deserialise this slice of bytes to `Parameters`
    pub fn from_bytes(bytes: &[u8; 8]) -> Result<Parameters, Error> {
        let n = u32::from_le_bytes(
            bytes[..4]
                .try_into()
                .map_err(|_| Error::SerialisationError)?,
        );
        let t = u32::from_le_bytes(
            bytes[4..8]
                .try_into()
                .map_err(|_| Error::SerialisationError)?,
        );

        Ok(Parameters { n, t })
    }
}

/// The description of the Schnorr group all protocol arithmetic takes place
/// in, supplied by a trusted setup routine.
///
/// `p` is a large prime and `q` a prime divisor of `p - 1`; `g`, `g_` and `h`
/// generate the order-`q` subgroup of \\( \mathbb{Z}\_p^\* \\). The discrete
/// logarithm \\( \log\_g h \\) must be unknown to every participant, as it is
/// what makes the Pedersen commitments binding.
///
/// Arithmetic on secret exponents is performed mod `q`; arithmetic on group
/// elements is performed mod `p`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupParameters {
    /// The first generator of the order-`q` subgroup.
    pub g: BigUint,
    /// The second, independent generator used by the encryption proofs.
    pub g_: BigUint,
    /// The generator hiding the second polynomial in Pedersen commitments.
    pub h: BigUint,
    /// The modulus of the ambient group \\( \mathbb{Z}\_p^\* \\).
    pub p: BigUint,
    /// The order of the subgroup generated by `g`, `g_` and `h`.
    pub q: BigUint,
}

impl GroupParameters {
    /// Construct group parameters from the trusted setup's output, checking
    /// that `q` divides `p - 1` and that every generator lies in the
    /// order-`q` subgroup.
    ///
    /// These checks do not replace the trusted setup: primality of `p` and
    /// `q` and the independence of the generators are taken on faith.
    pub fn new(
        g: BigUint,
        g_: BigUint,
        h: BigUint,
        p: BigUint,
        q: BigUint,
    ) -> Result<GroupParameters, Error> {
        let one = BigUint::one();

        if p <= BigUint::from(3u32) || q <= one {
            return Err(Error::InvalidParameters);
        }

        if (&p - &one) % &q != BigUint::from(0u32) {
            return Err(Error::InvalidParameters);
        }

        for base in [&g, &g_, &h] {
            if *base <= one || *base >= p || base.modpow(&q, &p) != one {
                return Err(Error::InvalidParameters);
            }
        }

        Ok(GroupParameters { g, g_, h, p, q })
    }
}
