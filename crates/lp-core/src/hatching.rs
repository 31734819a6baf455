//! Egg hatching state machine.
//!
//! An egg makes progress only while heat remains in its buffer. Heating is
//! granted per answered questionnaire question; the answers also steer which
//! archetype the egg hatches into. An egg left frozen too long dies.

use std::fmt;

use crate::pet::{EggPhase, Pet, PetStatus};
use crate::traits::{Archetype, TraitVector, nearest_archetype};

/// Accumulated progress needed to hatch.
pub const HATCH_TARGET_SECS: u64 = 3 * 60;

/// Heat granted per answered question.
pub const HEAT_REWARD_SECS: u64 = 30;

/// Questionnaire length; extra answers are ignored.
pub const MAX_QUESTIONS: usize = 6;

/// Continuous frozen time after which an egg dies.
pub const DEATH_THRESHOLD_SECS: u64 = 24 * 3600;

#[derive(Debug, PartialEq, Eq)]
pub enum HatchError {
    /// Dead eggs reject heating; only a reset revives them.
    EggDead,
}

impl fmt::Display for HatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HatchError::EggDead => write!(f, "cannot heat a dead egg"),
        }
    }
}

impl std::error::Error for HatchError {}

/// Integrate elapsed time into hatch progress.
///
/// No-op for pets that are not in an advanceable egg phase. The first call
/// ever only anchors the bookkeeping timestamp. Calling twice with the same
/// `now` is idempotent. Returns the resulting status.
pub fn advance_progress(pet: &mut Pet, now: u64) -> PetStatus {
    let phase = match pet.status {
        PetStatus::Egg(p @ (EggPhase::Claimed | EggPhase::Hatching | EggPhase::Frozen)) => p,
        _ => return pet.status,
    };

    if pet.last_hatch_update == 0 {
        pet.last_hatch_update = now;
        return pet.status;
    }
    if now <= pet.last_hatch_update {
        return pet.status;
    }
    let delta = now - pet.last_hatch_update;

    if pet.heat_buffer_seconds > 0 {
        let consumed = delta.min(pet.heat_buffer_seconds);
        pet.hatch_progress_seconds += consumed;
        pet.heat_buffer_seconds -= consumed;

        if phase == EggPhase::Frozen {
            pet.status = PetStatus::Egg(EggPhase::Hatching);
            pet.frozen_since = None;
        }
        pet.last_hatch_update = now;

        // Ran dry during this interval: freeze as of now.
        if pet.heat_buffer_seconds == 0 {
            pet.status = PetStatus::Egg(EggPhase::Frozen);
            pet.frozen_since = Some(now);
        }
    } else {
        if pet.status != PetStatus::Egg(EggPhase::Frozen) {
            pet.status = PetStatus::Egg(EggPhase::Frozen);
            pet.frozen_since = Some(now);
        }
        // No progress, but the check time still advances.
        pet.last_hatch_update = now;
    }

    if pet.status == PetStatus::Egg(EggPhase::Frozen)
        && let Some(since) = pet.frozen_since
        && now - since > DEATH_THRESHOLD_SECS
    {
        pet.status = PetStatus::Egg(EggPhase::Dead);
    }

    if pet.hatch_progress_seconds >= HATCH_TARGET_SECS {
        pet.status = PetStatus::Egg(EggPhase::Hatched);
    }

    pet.status
}

/// Add one heating reward to the buffer.
///
/// Settles elapsed time first so the reward cannot be backdated. A dead egg
/// is rejected without any mutation beyond that settling.
pub fn add_heat(pet: &mut Pet, now: u64) -> Result<PetStatus, HatchError> {
    advance_progress(pet, now);

    if pet.status == PetStatus::Egg(EggPhase::Dead) {
        return Err(HatchError::EggDead);
    }

    pet.heat_buffer_seconds += HEAT_REWARD_SECS;

    if matches!(
        pet.status,
        PetStatus::Egg(EggPhase::Claimed | EggPhase::Frozen)
    ) {
        pet.status = PetStatus::Egg(EggPhase::Hatching);
        pet.frozen_since = None;
        pet.last_hatch_update = now;
    }

    Ok(pet.status)
}

/// Reset an egg back to freshly-claimed. The only way out of Dead.
pub fn reset(pet: &mut Pet) {
    pet.status = PetStatus::Egg(EggPhase::Claimed);
    pet.hatch_progress_seconds = 0;
    pet.heat_buffer_seconds = 0;
    pet.last_hatch_update = 0;
    pet.frozen_since = None;
    pet.hatch_answers.clear();
}

// --- Personality questionnaire ---

#[derive(Clone, Copy)]
enum Axis {
    Rebellion,
    Extroversion,
    Exploration,
    Affinity,
}

use Axis::{Affinity, Exploration, Extroversion, Rebellion};

type Deltas = &'static [(Axis, f64)];

/// Per question, per option index, the trait perturbations that answer
/// applies. Option indices past a question's slice are ignored.
const QUESTION_DELTAS: [&[Deltas]; MAX_QUESTIONS] = [
    // Q1: where the egg rests (bedside / window / terrace)
    &[
        &[(Extroversion, -0.2), (Exploration, -0.2), (Affinity, 0.1)],
        &[(Extroversion, 0.3), (Affinity, 0.1)],
        &[(Exploration, 0.3), (Rebellion, 0.1), (Extroversion, 0.1)],
    ],
    // Q2: prenatal interaction (story / music / scenery)
    &[
        &[(Affinity, 0.3), (Rebellion, -0.2)],
        &[(Rebellion, 0.3), (Affinity, -0.1), (Extroversion, 0.1)],
        &[(Exploration, 0.2), (Extroversion, 0.1)],
    ],
    // Q3: gift placed in the nest (cotton / kitchenware / mechanical / nuts)
    &[
        &[(Affinity, 0.2), (Rebellion, -0.1)],
        &[(Affinity, 0.1), (Extroversion, 0.1)],
        &[(Rebellion, 0.2), (Affinity, -0.2), (Exploration, 0.1)],
        &[(Extroversion, 0.2), (Exploration, 0.1)],
    ],
    // Q4: ambient sound (forest rain / street noise / white noise)
    &[
        &[(Extroversion, -0.2), (Affinity, 0.2), (Rebellion, -0.1)],
        &[(Extroversion, 0.3)],
        &[(Rebellion, 0.3), (Affinity, -0.2), (Exploration, 0.1)],
    ],
    // Q5: hoped-for specialty (fast / smart / lucky)
    &[
        &[(Exploration, 0.2), (Rebellion, 0.1), (Extroversion, 0.1)],
        &[(Exploration, 0.2), (Extroversion, -0.1)],
        &[(Affinity, 0.3), (Rebellion, -0.1)],
    ],
    // Q6: favorite outing (amusement park / library / forest)
    &[
        &[(Extroversion, 0.3), (Rebellion, 0.1)],
        &[(Extroversion, -0.2), (Rebellion, -0.1), (Exploration, 0.1)],
        &[(Exploration, 0.2), (Affinity, 0.1)],
    ],
];

/// Resolve questionnaire answers into the archetype this egg hatches as.
///
/// Tolerates an answered prefix shorter than the full questionnaire.
/// Accumulates raw deltas and clamps once at the end, so opposing answers
/// cancel before range limiting. Returns the archetype and the full
/// personality prompt.
pub fn resolve_personality(answers: &[u8]) -> (&'static Archetype, String) {
    let mut rebellion = 0.5;
    let mut extroversion = 0.5;
    let mut exploration = 0.5;
    let mut affinity = 0.5;

    for (question, &answer) in answers.iter().take(MAX_QUESTIONS).enumerate() {
        let Some(deltas) = QUESTION_DELTAS[question].get(answer as usize) else {
            continue;
        };
        for (axis, delta) in *deltas {
            match axis {
                Rebellion => rebellion += delta,
                Extroversion => extroversion += delta,
                Exploration => exploration += delta,
                Affinity => affinity += delta,
            }
        }
    }

    let traits = TraitVector::new(rebellion, extroversion, exploration, affinity);
    let archetype = nearest_archetype(&traits);

    let prompt = format!(
        "{} Your personality traits are: Rebellion: {}, Extroversion: {}, Exploration: {}, Affinity: {}.",
        archetype.base_prompt,
        archetype.traits.rebellion,
        archetype.traits.extroversion,
        archetype.traits.exploration,
        archetype.traits.affinity,
    );

    (archetype, prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::Pet;
    use uuid::Uuid;

    fn egg() -> Pet {
        Pet::new_egg(Uuid::new_v4())
    }

    #[test]
    fn test_first_advance_only_anchors() {
        let mut pet = egg();
        advance_progress(&mut pet, 1000);
        assert_eq!(pet.last_hatch_update, 1000);
        assert_eq!(pet.hatch_progress_seconds, 0);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Claimed));
    }

    #[test]
    fn test_advance_is_idempotent_at_same_instant() {
        let mut pet = egg();
        add_heat(&mut pet, 1000).unwrap();
        advance_progress(&mut pet, 1020);
        let progress = pet.hatch_progress_seconds;
        advance_progress(&mut pet, 1020);
        assert_eq!(pet.hatch_progress_seconds, progress);
    }

    #[test]
    fn test_partial_buffer_consumption() {
        // 30s of heat, 50s elapse: 30 consumed, then frozen at now.
        let mut pet = egg();
        add_heat(&mut pet, 1000).unwrap();
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Hatching));

        advance_progress(&mut pet, 1050);
        assert_eq!(pet.hatch_progress_seconds, 30);
        assert_eq!(pet.heat_buffer_seconds, 0);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Frozen));
        assert_eq!(pet.frozen_since, Some(1050));
    }

    #[test]
    fn test_progress_monotone_and_buffer_limited() {
        let mut pet = egg();
        add_heat(&mut pet, 1000).unwrap();
        advance_progress(&mut pet, 1010);
        assert_eq!(pet.hatch_progress_seconds, 10);
        assert_eq!(pet.heat_buffer_seconds, 20);
        advance_progress(&mut pet, 1100);
        // Only the remaining 20s of buffer converted.
        assert_eq!(pet.hatch_progress_seconds, 30);
        assert_eq!(pet.heat_buffer_seconds, 0);
    }

    #[test]
    fn test_heat_unfreezes() {
        let mut pet = egg();
        add_heat(&mut pet, 1000).unwrap();
        advance_progress(&mut pet, 1050);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Frozen));

        add_heat(&mut pet, 1060).unwrap();
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Hatching));
        assert_eq!(pet.frozen_since, None);
        assert_eq!(pet.heat_buffer_seconds, 30);
    }

    #[test]
    fn test_death_after_threshold() {
        let mut pet = egg();
        add_heat(&mut pet, 1000).unwrap();
        advance_progress(&mut pet, 1030); // buffer exhausted, frozen at 1030
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Frozen));

        // Exactly at the threshold: still frozen (strictly greater kills).
        advance_progress(&mut pet, 1030 + DEATH_THRESHOLD_SECS);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Frozen));

        advance_progress(&mut pet, 1031 + DEATH_THRESHOLD_SECS);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Dead));
    }

    #[test]
    fn test_dead_egg_rejects_heat() {
        let mut pet = egg();
        add_heat(&mut pet, 1000).unwrap();
        advance_progress(&mut pet, 1030);
        advance_progress(&mut pet, 2000 + DEATH_THRESHOLD_SECS);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Dead));

        assert_eq!(add_heat(&mut pet, 3000 + DEATH_THRESHOLD_SECS), Err(HatchError::EggDead));
        assert_eq!(pet.heat_buffer_seconds, 0);
    }

    #[test]
    fn test_hatches_at_target() {
        let mut pet = egg();
        // Six answers worth of heat covers the whole target.
        for _ in 0..MAX_QUESTIONS {
            add_heat(&mut pet, 1000).unwrap();
        }
        assert_eq!(pet.heat_buffer_seconds, 6 * HEAT_REWARD_SECS);

        advance_progress(&mut pet, 1000 + HATCH_TARGET_SECS + 10);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Hatched));
        assert!(pet.hatch_progress_seconds >= HATCH_TARGET_SECS);
    }

    #[test]
    fn test_advance_noop_after_hatched() {
        let mut pet = egg();
        pet.status = PetStatus::Egg(EggPhase::Hatched);
        let before = pet.clone();
        advance_progress(&mut pet, 99999);
        assert_eq!(pet.hatch_progress_seconds, before.hatch_progress_seconds);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Hatched));
    }

    #[test]
    fn test_reset_revives_dead_egg() {
        let mut pet = egg();
        pet.status = PetStatus::Egg(EggPhase::Dead);
        pet.hatch_progress_seconds = 100;
        pet.heat_buffer_seconds = 5;
        pet.frozen_since = Some(42);
        pet.hatch_answers = vec![1, 2];

        reset(&mut pet);
        assert_eq!(pet.status, PetStatus::Egg(EggPhase::Claimed));
        assert_eq!(pet.hatch_progress_seconds, 0);
        assert_eq!(pet.heat_buffer_seconds, 0);
        assert_eq!(pet.last_hatch_update, 0);
        assert_eq!(pet.frozen_since, None);
        assert!(pet.hatch_answers.is_empty());
    }

    #[test]
    fn test_personality_all_first_options_is_hedgehog() {
        // Deterministic worked example: all-zero answers accumulate to
        // (0.3, 0.5, 0.5, 1.3) -> clamped (0.3, 0.5, 0.5, 1.0), whose
        // nearest archetype is the hedgehog.
        let (archetype, prompt) = resolve_personality(&[0, 0, 0, 0, 0, 0]);
        assert_eq!(archetype.id, "hedgehog");
        assert!(prompt.starts_with(archetype.base_prompt));
        assert!(prompt.contains("Rebellion: 0.3"));
        assert!(prompt.ends_with("Affinity: 0.9."));
    }

    #[test]
    fn test_personality_empty_answers_neutral() {
        let (archetype, _) = resolve_personality(&[]);
        // Neutral vector resolves through the same distance rule.
        assert_eq!(archetype.id, nearest_archetype(&TraitVector::neutral()).id);
    }

    #[test]
    fn test_personality_prefix_tolerant() {
        // Solitary, rebellious, low-affinity answers: accumulates to
        // (1.2, 0.1, 0.8, 0.1) -> clamped (1.0, 0.1, 0.8, 0.1), black cat.
        let full = resolve_personality(&[0, 1, 2, 2, 1, 1]).0.id;
        assert_eq!(full, "black_cat");
        // A prefix is accepted without panicking.
        let _ = resolve_personality(&[0, 1]);
    }

    #[test]
    fn test_personality_ignores_out_of_range_options() {
        let (a, _) = resolve_personality(&[9, 9, 9, 9, 9, 9]);
        let (b, _) = resolve_personality(&[]);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_extra_answers_ignored() {
        let (a, _) = resolve_personality(&[0, 0, 0, 0, 0, 0]);
        let (b, _) = resolve_personality(&[0, 0, 0, 0, 0, 0, 2, 2, 2]);
        assert_eq!(a.id, b.id);
    }
}
