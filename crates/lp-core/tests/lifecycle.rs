//! Integration tests walking a pet through its whole lifecycle:
//! claim → questionnaire heating → hatch → behavior loop → encounters.

use lp_core::{
    Behavior, EggPhase, HATCH_TARGET_SECS, HEAT_REWARD_SECS, MAX_QUESTIONS, MIN_DWELL_SECS, Pet,
    PetStatus, TickOutcome, add_heat, advance_progress, begin_travel, choose_partner,
    encounter_probability, rank_memories, resolve_personality, tick,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use uuid::Uuid;

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(42)
}

/// Heat an egg through the full questionnaire and let it hatch.
fn hatch(pet: &mut Pet, start: u64) -> u64 {
    for question in 0..MAX_QUESTIONS as u64 {
        add_heat(pet, start + question).unwrap();
        pet.hatch_answers.push(0);
    }
    // Six rewards exceed the target; wait them out.
    let done = start + MAX_QUESTIONS as u64 * HEAT_REWARD_SECS + 60;
    advance_progress(pet, done);
    assert_eq!(pet.status, PetStatus::Egg(EggPhase::Hatched));
    done
}

#[test]
fn egg_to_hatched_walkthrough() {
    let mut pet = Pet::new_egg(Uuid::new_v4());
    assert_eq!(pet.status, PetStatus::Egg(EggPhase::Claimed));

    // First heat starts the clock and the hatching phase.
    add_heat(&mut pet, 1_000).unwrap();
    assert_eq!(pet.status, PetStatus::Egg(EggPhase::Hatching));

    // Half the reward elapses: progress accrues, buffer drains.
    advance_progress(&mut pet, 1_015);
    assert_eq!(pet.hatch_progress_seconds, 15);
    assert_eq!(pet.heat_buffer_seconds, HEAT_REWARD_SECS - 15);

    // The rest drains and the egg freezes where the fuel ran out.
    advance_progress(&mut pet, 1_100);
    assert_eq!(pet.status, PetStatus::Egg(EggPhase::Frozen));
    assert_eq!(pet.hatch_progress_seconds, HEAT_REWARD_SECS);

    // More questions revive it and eventually hatch it.
    let mut now = 1_100;
    while pet.status != PetStatus::Egg(EggPhase::Hatched) {
        now += 60;
        if add_heat(&mut pet, now).is_err() {
            panic!("egg died during an active questionnaire");
        }
        pet.hatch_answers.push(1);
    }
    assert!(pet.hatch_progress_seconds >= HATCH_TARGET_SECS);
}

#[test]
fn hatched_pet_resolves_personality_and_travels() {
    let mut pet = Pet::new_egg(Uuid::new_v4());
    hatch(&mut pet, 5_000);

    let (archetype, prompt) = resolve_personality(&pet.hatch_answers);
    pet.template_id = archetype.id.to_string();
    pet.personality_prompt = prompt;
    pet.traits = archetype.traits;
    assert_eq!(archetype.id, "hedgehog");

    // Naming sends the pet straight out on its first trip.
    let mut rng = rng();
    pet.name = "Pokey".to_string();
    let destination = begin_travel(&mut pet, &mut rng);
    pet.status = PetStatus::Living(Behavior::Traveling);
    pet.last_status_update = 10_000;
    assert_eq!(pet.current_destination.as_deref(), Some(destination));

    // Run the behavior loop until the first trip completes.
    let mut now = 10_000;
    loop {
        now += MIN_DWELL_SECS;
        if let TickOutcome::Changed { completed_trip: Some(dest), .. } = tick(&mut pet, now, &mut rng)
        {
            assert!(!dest.is_empty());
            assert_eq!(pet.current_destination, None);
            break;
        }
    }
}

#[test]
fn encounter_between_two_travelers() {
    let mut rng = rng();

    let mut a = Pet::new_egg(Uuid::new_v4());
    hatch(&mut a, 1_000);
    let (arch_a, _) = resolve_personality(&[0; 6]);
    a.traits = arch_a.traits;
    a.status = PetStatus::Living(Behavior::Traveling);
    a.current_destination = Some("Park".to_string());

    let mut b = a.clone();
    b.id = Uuid::new_v4();

    // Identical traits sit in the similarity-bonus region.
    let p = encounter_probability(&a.traits, &b.traits);
    assert!(p > 0.6 && p <= 0.9);

    // Over repeated resolutions the twins must meet at least once.
    let met = (0..50).any(|_| choose_partner(&a, std::slice::from_ref(&b), &mut rng).is_some());
    assert!(met);
}

#[test]
fn trip_memories_feed_retrieval() {
    use lp_core::{MemoryKind, MemoryRecord};

    let pet_id = Uuid::new_v4();
    let make = |content: &str, embedding: Option<Vec<f32>>, at: u64| MemoryRecord {
        id: Uuid::new_v4(),
        pet_id,
        content: content.to_string(),
        embedding,
        kind: MemoryKind::TripLog,
        created_at: at,
    };

    let records = vec![
        make("Ducks at the Park!", Some(vec![1.0, 0.0, 0.0]), 100),
        make("Quiet day in the Library.", Some(vec![0.0, 1.0, 0.0]), 200),
        make("Lost diary page.", None, 300),
    ];

    let ranked = rank_memories(&records, &[0.9, 0.1, 0.0], 1).unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].record.content, "Ducks at the Park!");

    // All-unscored windows signal the recency fallback.
    let unscored = vec![make("a", None, 1), make("b", None, 2)];
    assert!(rank_memories(&unscored, &[1.0], 3).is_none());
}
