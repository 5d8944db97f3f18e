// -*- mode: rust; -*-
//
// This file is part of ice-tdh2.
// Copyright (c) 2021-2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Distributed key generation and threshold encryption over Schnorr groups.
//!
//! `ice-tdh2` implements a committee of `n` peer servers that jointly
//! generate an encryption key pair such that any `t + 1` peers can decrypt
//! ciphertexts addressed to the committee, while `t` or fewer peers learn
//! nothing. Key generation uses Pedersen-style verifiable secret sharing;
//! encryption and decryption follow the Shoup-Gennaro construction, with
//! Chaum-Pedersen proofs making both ciphertexts and decryption shares
//! publicly verifiable.
//!
//! The crate is transport-agnostic: every peer embeds one
//! [`DistributedKeyGeneration`] actor, and a controller (an HTTP server, a
//! test harness, a simulator) moves payloads between actors and drives the
//! [`Stage`] progression. Outbound fan-outs go through the [`Transport`]
//! seam, one fire-and-forget send per peer.
//!
//! A protocol epoch looks like this:
//!
//! 1. Every peer constructs its actor, sampling two secret polynomials and
//!    committing to them ([`DistributedKeyGeneration::new`]).
//! 2. Stage 1: peers exchange [`ShareStage1Payload`]s carrying Pedersen
//!    commitment openings; receivers verify and accumulate qualified
//!    shares.
//! 3. Stage 2: peers reveal their plain commitment vectors in
//!    [`ShareStage2Payload`]s, binding the stage-1 shares to public
//!    polynomials.
//! 4. Each peer derives its additive secret key share and the committee
//!    public key ([`DistributedKeyGeneration::finish`]).
//! 5. Any number of encryption/decryption sessions follow: encrypt towards
//!    the committee, install the ciphertext, collect `t + 1` verified
//!    [`DecryptionShare`]s, and combine them back into the plaintext.
//!
//! # Example
//!
//! ```rust
//! use ice_tdh2::{
//!     DistributedKeyGeneration, GroupParameters, Parameters, PeerPublicVal, PeerShare,
//! };
//! use num_bigint::BigUint;
//! use rand::rngs::OsRng;
//! use std::time::Duration;
//!
//! # fn do_test() -> Result<(), ice_tdh2::Error> {
//! // A toy Schnorr group; a real deployment receives its parameters from a
//! // trusted setup routine.
//! let group = GroupParameters::new(
//!     BigUint::from(4u32),
//!     BigUint::from(6u32),
//!     BigUint::from(9u32),
//!     BigUint::from(23u32),
//!     BigUint::from(11u32),
//! )?;
//! let params = Parameters { n: 4, t: 1 };
//! let servers: Vec<String> = (1..=4)
//!     .map(|i| format!("http://127.0.0.1:808{i}"))
//!     .collect();
//!
//! let peers: Vec<DistributedKeyGeneration> = (1..=4)
//!     .map(|i| DistributedKeyGeneration::new(group.clone(), params, i, servers.clone(), OsRng))
//!     .collect::<Result<_, _>>()?;
//!
//! // Stages 1 and 2: each peer sends every other peer its payloads (the
//! // transport carrying them is out of scope here), and each receiver
//! // verifies them before accumulating the qualified material.
//! for sender in peers.iter() {
//!     for receiver in peers.iter() {
//!         if sender.index() == receiver.index() {
//!             continue;
//!         }
//!
//!         let stage1 = sender.stage1_payload_for(receiver.index())?;
//!         receiver.verify_stage1(&stage1)?;
//!         receiver.append_qualified_peer_share(PeerShare {
//!             id: stage1.id,
//!             share: stage1.share1.clone(),
//!         });
//!
//!         let stage2 = sender.stage2_payload_for(receiver.index())?;
//!         receiver.verify_stage2(&stage2)?;
//!         receiver.append_qualified_peer_public_val(PeerPublicVal {
//!             id: stage2.id,
//!             public_val: stage2.public_vals[0].clone(),
//!         });
//!     }
//! }
//!
//! // Every peer derives the same committee public key.
//! let (group_key, _secret_key) = peers[0].finish()?;
//! for peer in peers.iter().skip(1) {
//!     assert_eq!(peer.finish()?.0, group_key);
//! }
//!
//! // Anyone holding the committee key can encrypt towards it.
//! let message = BigUint::from(7u32);
//! let ciphertext = peers[0].encrypt(&message, OsRng)?;
//! assert!(peers[1].verify_ciphertext(&ciphertext).is_ok());
//!
//! // Two peers (t + 1 = 2) decrypt: the combiner installs the session
//! // ciphertext, validates both shares, and interpolates.
//! let combiner = &peers[3];
//! combiner.install_ciphertext(ciphertext.clone());
//! for peer in [&peers[0], &peers[1]] {
//!     let share = peer.decryption_share(&ciphertext, OsRng)?;
//!     combiner.verify_decryption_share(&share, Duration::from_secs(1))?;
//!     combiner.append_decryption_share(share);
//! }
//! assert_eq!(combiner.combine_shares()?, message);
//! # Ok(()) }
//! # fn main() { assert!(do_test().is_ok()); }
//! ```

/// Threshold encryption, decryption shares and share combination.
pub mod encryption;
/// The distributed key generation engine.
pub mod keygen;
pub(crate) mod math;
/// Zero-knowledge proofs of correct encryption and decryption.
pub mod nizk;
/// Protocol and group parameters.
pub mod parameters;

pub use crate::encryption::Ciphertext;
pub use crate::encryption::DecryptionShare;
pub use crate::keygen::DistributedKeyGeneration;
pub use crate::keygen::Error;
pub use crate::keygen::GroupKey;
pub use crate::keygen::PeerPublicVal;
pub use crate::keygen::PeerShare;
pub use crate::keygen::SecretKey;
pub use crate::keygen::ShareStage1Payload;
pub use crate::keygen::ShareStage2Payload;
pub use crate::keygen::Stage;
pub use crate::keygen::Transport;
pub use crate::nizk::NizkOfCiphertext;
pub use crate::nizk::NizkOfDecryptionShare;
pub use crate::parameters::GroupParameters;
pub use crate::parameters::Parameters;
