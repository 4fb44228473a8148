//! Setup, proving and verification benchmarks

use ark_bls12_381::Fr;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use zkp_core::zkp_r1cs::circuits::PreimageCircuit;
use zkp_core::zkp_r1cs::CircuitDescriptor;
use zkp_core::{assign, generate_setup, Cancellation, Prover, SetupRandomness, Verifier};

const MESSAGE_LENGTHS: [usize; 3] = [31, 124, 248];

fn bench_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("setup");
    group.sample_size(10);

    for len in MESSAGE_LENGTHS {
        let circuit = Arc::new(CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(len)).unwrap());
        group.bench_with_input(BenchmarkId::new("preimage", len), &circuit, |b, circuit| {
            b.iter(|| {
                generate_setup(
                    circuit.clone(),
                    SetupRandomness::UntrustedSeed([1u8; 32]),
                    &Cancellation::new(),
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_prove_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("prove");
    group.sample_size(10);

    for len in MESSAGE_LENGTHS {
        let message = vec![0x5au8; len];
        let circuit = Arc::new(CircuitDescriptor::<Fr>::compile(&PreimageCircuit::shape(len)).unwrap());
        let (pk, vk) = generate_setup(
            circuit.clone(),
            SetupRandomness::UntrustedSeed([2u8; 32]),
            &Cancellation::new(),
        )
        .unwrap();
        let (witness, public) = assign(&circuit, &PreimageCircuit::new(message)).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(len as u64);

        group.bench_function(BenchmarkId::new("preimage", len), |b| {
            b.iter(|| Prover::prove(&pk, &witness, &public, &mut rng).unwrap())
        });

        let proof = Prover::prove(&pk, &witness, &public, &mut rng).unwrap();
        group.bench_function(BenchmarkId::new("verify", len), |b| {
            b.iter(|| Verifier::verify(&vk, &proof, &public).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_setup, bench_prove_verify);
criterion_main!(benches);
