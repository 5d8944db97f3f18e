// -*- mode: rust; -*-
//
// This file is part of ice-tdh2.
// Copyright (c) 2021-2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Benchmarks for the threshold cryptosystem.

#[macro_use]
extern crate criterion;

use criterion::Criterion;

use ice_tdh2::{
    Ciphertext, DistributedKeyGeneration, GroupParameters, Parameters, PeerPublicVal, PeerShare,
};
use num_bigint::BigUint;
use rand::rngs::OsRng;
use std::time::Duration;

/// A fixed 1024-bit Schnorr group with a 256-bit subgroup, precomputed so
/// benchmark runs are comparable.
const P: &[u8] = b"92762792513138245305730157741078749626994389514215605369069640486493907296942479461752229432608370573387963363074815178343752968232635906620410433738701070905743436536686277438709444168360145566247810463127689664734830146206456700304534667516893127400143965265206855180565887769912573209099235163068293432341";
const Q: &[u8] = b"74987929488863950113597388191376532876561155616923478868368313523242301671763";
const G: &[u8] = b"7863271213294122181738236142263734714705913936349264393923711255694185586383479412410260751988079285459054317950514975988380862257308436189532183395647645242852449375954344407116210409525160972195823030857123717301907198274910203108750780477811438449122174761969542482300441368460606152024992836689592431640";
const G_: &[u8] = b"59440380377992045534195627088038502501649156534867219936029420851483032008819257914452644762498881789463766576992137828910981001159537489077633486705376754530484977583105199509744712600764564565332803237756471899127692364564536881009618141420020526902450830645755517874192659332029152968572223871009900174816";
const H: &[u8] = b"67297098092451338127199261315321482838300567616897025438175012118028227780675433705154110858989940456064073563527240846784823936868301580681023057655001379050887829511479582068991110235745903796630553724050575554135553590062909045343884230144742959820075321750811383414338015882927581366010396929405219136362";

fn number(digits: &[u8]) -> BigUint {
    BigUint::parse_bytes(digits, 10).unwrap()
}

fn bench_group() -> GroupParameters {
    GroupParameters::new(number(G), number(G_), number(H), number(P), number(Q)).unwrap()
}

fn servers(n: u32) -> Vec<String> {
    (1..=n).map(|i| format!("http://peer{i}.local")).collect()
}

fn build_committee(n: u32, t: u32) -> Vec<DistributedKeyGeneration> {
    let params = Parameters { n, t };

    let peers: Vec<DistributedKeyGeneration> = (1..=n)
        .map(|i| {
            DistributedKeyGeneration::new(bench_group(), params, i, servers(n), OsRng).unwrap()
        })
        .collect();

    for sender in peers.iter() {
        for receiver in peers.iter() {
            if sender.index() == receiver.index() {
                continue;
            }

            let stage1 = sender.stage1_payload_for(receiver.index()).unwrap();
            receiver.verify_stage1(&stage1).unwrap();
            receiver.append_qualified_peer_share(PeerShare {
                id: stage1.id,
                share: stage1.share1.clone(),
            });

            let stage2 = sender.stage2_payload_for(receiver.index()).unwrap();
            receiver.verify_stage2(&stage2).unwrap();
            receiver.append_qualified_peer_public_val(PeerPublicVal {
                id: stage2.id,
                public_val: stage2.public_vals[0].clone(),
            });
        }
    }

    for peer in peers.iter() {
        peer.finish().unwrap();
    }

    peers
}

fn decrypt_with_first_peers(
    peers: &[DistributedKeyGeneration],
    ciphertext: &Ciphertext,
    t: u32,
) {
    let combiner = &peers[0];
    combiner.reset_decryption_session();
    combiner.install_ciphertext(ciphertext.clone());

    for peer in peers.iter().take(t as usize + 1) {
        let share = peer.decryption_share(ciphertext, OsRng).unwrap();
        combiner
            .verify_decryption_share(&share, Duration::from_secs(1))
            .unwrap();
        combiner.append_decryption_share(share);
    }
}

mod dkg_benches {
    use super::*;

    fn actor_creation(name: &str, n: u32, t: u32, c: &mut Criterion) {
        let params = Parameters { n, t };
        let bench_name = name.to_string() + "Actor creation";
        c.bench_function(&bench_name, move |b| {
            b.iter(|| {
                DistributedKeyGeneration::new(bench_group(), params, 1, servers(n), OsRng)
                    .unwrap()
            })
        });
    }

    fn stage_one_verification(name: &str, n: u32, t: u32, c: &mut Criterion) {
        let params = Parameters { n, t };
        let sender =
            DistributedKeyGeneration::new(bench_group(), params, 1, servers(n), OsRng).unwrap();
        let receiver =
            DistributedKeyGeneration::new(bench_group(), params, 2, servers(n), OsRng).unwrap();
        let payload = sender.stage1_payload_for(2).unwrap();

        let bench_name = name.to_string() + "Stage-1 verification";
        c.bench_function(&bench_name, move |b| {
            b.iter(|| receiver.verify_stage1(&payload).unwrap())
        });
    }

    fn stage_two_verification(name: &str, n: u32, t: u32, c: &mut Criterion) {
        let params = Parameters { n, t };
        let sender =
            DistributedKeyGeneration::new(bench_group(), params, 1, servers(n), OsRng).unwrap();
        let receiver =
            DistributedKeyGeneration::new(bench_group(), params, 2, servers(n), OsRng).unwrap();
        let payload = sender.stage2_payload_for(2).unwrap();

        let bench_name = name.to_string() + "Stage-2 verification";
        c.bench_function(&bench_name, move |b| {
            b.iter(|| receiver.verify_stage2(&payload).unwrap())
        });
    }

    fn dkg_bench_with_t_out_of_n(n: u32, t: u32, c: &mut Criterion) {
        let name = (t + 1).to_string() + "-out-of-" + &n.to_string() + ": ";
        actor_creation(&name, n, t, c);
        stage_one_verification(&name, n, t, c);
        stage_two_verification(&name, n, t, c);
    }

    fn dkg_bench(c: &mut Criterion) {
        dkg_bench_with_t_out_of_n(4, 1, c);
        dkg_bench_with_t_out_of_n(10, 3, c);
        dkg_bench_with_t_out_of_n(20, 6, c);
    }

    criterion_group! {
        name = dkg_benches;
        config = Criterion::default().sample_size(10);
        targets = dkg_bench,
    }
}

mod encryption_benches {
    use super::*;

    fn encryption_bench(c: &mut Criterion) {
        for (n, t) in [(4u32, 1u32), (10, 3)] {
            let name = (t + 1).to_string() + "-out-of-" + &n.to_string() + ": ";
            let peers = build_committee(n, t);
            let message = BigUint::from(0x5eed5eedu32);
            let ciphertext = peers[0].encrypt(&message, OsRng).unwrap();

            {
                let bench_name = name.clone() + "Encryption";
                let encryptor = &peers[0];
                c.bench_function(&bench_name, |b| {
                    b.iter(|| encryptor.encrypt(&message, OsRng).unwrap())
                });
            }

            {
                let bench_name = name.clone() + "Ciphertext verification";
                let verifier = &peers[1];
                let ciphertext = ciphertext.clone();
                c.bench_function(&bench_name, |b| {
                    b.iter(|| verifier.verify_ciphertext(&ciphertext).unwrap())
                });
            }

            {
                let bench_name = name.clone() + "Decryption share";
                let decryptor = &peers[1];
                let ciphertext = ciphertext.clone();
                c.bench_function(&bench_name, |b| {
                    b.iter(|| decryptor.decryption_share(&ciphertext, OsRng).unwrap())
                });
            }

            {
                let bench_name = name.clone() + "Share verification";
                let verifier = &peers[1];
                verifier.install_ciphertext(ciphertext.clone());
                let share = peers[2].decryption_share(&ciphertext, OsRng).unwrap();
                c.bench_function(&bench_name, |b| {
                    b.iter(|| {
                        verifier
                            .verify_decryption_share(&share, Duration::from_secs(1))
                            .unwrap()
                    })
                });
            }

            {
                let bench_name = name.clone() + "Share combination";
                decrypt_with_first_peers(&peers, &ciphertext, t);
                let combiner = &peers[0];
                c.bench_function(&bench_name, |b| {
                    b.iter(|| combiner.combine_shares().unwrap())
                });
            }
        }
    }

    criterion_group! {
        name = encryption_benches;
        config = Criterion::default().sample_size(10);
        targets = encryption_bench,
    }
}

criterion_main!(dkg_benches::dkg_benches, encryption_benches::encryption_benches);
