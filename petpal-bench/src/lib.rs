//! Fixtures shared by the PetPal benchmarks.

use chrono::{DateTime, Utc};
use petpal_core::progression::{evolution_stage, xp_needed};
use petpal_core::{OwnerId, PetRecord, Species};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `count` pets with varied levels and stats, reproducible from `seed`.
#[must_use]
pub fn population(count: usize, seed: u64, now: DateTime<Utc>) -> Vec<(OwnerId, PetRecord)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count as u64)
        .map(|i| {
            let species = Species::ALL[rng.gen_range(0..Species::ALL.len())];
            let mut pet = PetRecord::new(species, now);
            pet.level = rng.gen_range(1..=30);
            pet.xp = rng.gen_range(0..xp_needed(pet.level));
            pet.evolution_stage = evolution_stage(pet.level);
            pet.current_form = species.form(pet.evolution_stage).to_string();
            pet.hunger = rng.gen_range(0..=100);
            pet.happiness = rng.gen_range(0..=100);
            pet.energy = rng.gen_range(0..=100);
            (OwnerId::from(100_000_000_000_000_000 + i), pet)
        })
        .collect()
}
