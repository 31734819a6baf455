//! Behavior state machine and encounter resolution.
//!
//! Hatched pets wander between sleeping, eating, and traveling on a
//! dwell-time clock. Personality only shapes the odds of leaving sleep;
//! the eating and traveling exits use fixed weights. Two pets traveling
//! to the same destination may meet, with odds favoring both very similar
//! and very different personalities.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::pet::{Behavior, Pet, PetStatus};
use crate::traits::TraitVector;

/// Minimum time in a state before a transition roll is allowed.
pub const MIN_DWELL_SECS: u64 = 60 * 180;

/// Ordinary destinations, always available.
pub const SCENES: [&str; 4] = ["Park", "Bar", "Library", "Concert"];

/// Once-in-a-lifetime destinations, preferred until visited.
pub const LANDMARKS: [&str; 2] = ["Volcano Eruption", "Statue"];

/// Chance of picking an unvisited landmark when one exists.
pub const LANDMARK_PREFERENCE: f64 = 0.8;

/// Result of one behavior tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Unchanged,
    Changed {
        from: Behavior,
        to: Behavior,
        /// Destination of a trip that just ended, when `from` was
        /// Traveling. The caller commits the transition first and then
        /// resolves encounters and the diary for this destination.
        completed_trip: Option<String>,
    },
}

/// Pure transition rule: next state for a uniform roll in [0, 1).
///
/// From Sleeping the weights are personality-driven and normalized:
/// sleep 0.5, eat 0.2 + extroversion * 0.2, travel 0.1 + exploration * 0.4.
/// Eating and Traveling exit on fixed cumulative thresholds.
pub fn next_state(current: Behavior, traits: &TraitVector, roll: f64) -> Behavior {
    match current {
        Behavior::Sleeping => {
            let travel = 0.1 + traits.exploration * 0.4;
            let eat = 0.2 + traits.extroversion * 0.2;
            let total = 0.5 + eat + travel;
            let p_eat = eat / total;
            let p_travel = travel / total;
            if roll < p_eat {
                Behavior::Eating
            } else if roll < p_eat + p_travel {
                Behavior::Traveling
            } else {
                Behavior::Sleeping
            }
        }
        Behavior::Eating => {
            if roll < 0.7 {
                Behavior::Sleeping
            } else if roll < 0.9 {
                Behavior::Traveling
            } else {
                Behavior::Eating
            }
        }
        Behavior::Traveling => {
            if roll < 0.6 {
                Behavior::Sleeping
            } else if roll < 0.8 {
                Behavior::Eating
            } else {
                Behavior::Traveling
            }
        }
    }
}

/// Pick a destination, preferring unvisited landmarks.
pub fn select_destination(visited: &[String], rng: &mut impl Rng) -> &'static str {
    let unvisited: Vec<&'static str> = LANDMARKS
        .iter()
        .copied()
        .filter(|l| !visited.iter().any(|v| v == l))
        .collect();

    if !unvisited.is_empty() && rng.random::<f64>() < LANDMARK_PREFERENCE {
        return unvisited[rng.random_range(0..unvisited.len())];
    }

    let all: Vec<&'static str> = SCENES.iter().chain(LANDMARKS.iter()).copied().collect();
    all[rng.random_range(0..all.len())]
}

/// Select a destination for `pet`, record it, and mark a landmark visited.
/// Returns the chosen destination.
pub fn begin_travel(pet: &mut Pet, rng: &mut impl Rng) -> &'static str {
    let destination = select_destination(&pet.visited_landmarks, rng);
    pet.current_destination = Some(destination.to_string());
    if LANDMARKS.contains(&destination) && !pet.visited_landmarks.iter().any(|v| v == destination) {
        pet.visited_landmarks.push(destination.to_string());
    }
    destination
}

/// One behavior tick for a living pet.
///
/// No-op for eggs and inside the dwell window. A roll landing on the
/// current state also leaves the pet untouched, so `last_status_update`
/// only moves on real transitions.
pub fn tick(pet: &mut Pet, now: u64, rng: &mut impl Rng) -> TickOutcome {
    let PetStatus::Living(current) = pet.status else {
        return TickOutcome::Unchanged;
    };
    if now.saturating_sub(pet.last_status_update) < MIN_DWELL_SECS {
        return TickOutcome::Unchanged;
    }

    let roll = rng.random::<f64>();
    let next = next_state(current, &pet.traits, roll);
    if next == current {
        return TickOutcome::Unchanged;
    }

    let completed_trip = if current == Behavior::Traveling {
        // A traveler with no recorded destination still completes a trip.
        Some(
            pet.current_destination
                .take()
                .unwrap_or_else(|| "Unknown Place".to_string()),
        )
    } else {
        None
    };

    if next == Behavior::Traveling {
        begin_travel(pet, rng);
    }

    pet.status = PetStatus::Living(next);
    pet.last_status_update = now;

    TickOutcome::Changed {
        from: current,
        to: next,
        completed_trip,
    }
}

// --- Encounters ---

/// Probability that two pets at the same destination meet.
///
/// Distance is measured on the exploration/extroversion plane. Base 0.3,
/// a similarity bonus below distance 0.3, a contrast bonus above 0.8,
/// capped at 0.9. The mid-range has neither bonus.
pub fn encounter_probability(a: &TraitVector, b: &TraitVector) -> f64 {
    let distance = a.social_distance(b);
    let similarity_bonus = ((0.3 - distance) * 1.33).max(0.0);
    let contrast_bonus = ((distance - 0.8) * 0.65).max(0.0);
    (0.3 + similarity_bonus + contrast_bonus).min(0.9)
}

/// Pick at most one encounter partner from `candidates`.
///
/// Candidates are tried in shuffled order with one roll each; the first
/// success wins. Returns an index into the original slice.
pub fn choose_partner(me: &Pet, candidates: &[Pet], rng: &mut impl Rng) -> Option<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.shuffle(rng);
    for idx in order {
        let prob = encounter_probability(&me.traits, &candidates[idx].traits);
        if rng.random::<f64>() < prob {
            return Some(idx);
        }
    }
    None
}

// --- Static artwork fallbacks ---

/// Bundled scene illustration for a destination. Unknown destinations
/// fall back to the park.
pub fn scene_image_path(destination: &str) -> &'static str {
    match destination {
        "Park" => "/images/scenes/park.png",
        "Bar" => "/images/scenes/bar.png",
        "Library" => "/images/scenes/library.png",
        "Concert" => "/images/scenes/concert.png",
        "Volcano Eruption" => "/images/scenes/volcano_eruption.png",
        "Statue" => "/images/scenes/statue.png",
        _ => "/images/scenes/park.png",
    }
}

/// Bundled portrait for an archetype. Unknown templates fall back to the
/// hamster.
pub fn pet_image_path(template_id: &str) -> &'static str {
    match template_id {
        "quokka" => "/images/pets/quokka.png",
        "red_panda" => "/images/pets/red_panda.png",
        "squirrel" => "/images/pets/squirrel.png",
        "white_rabbit" => "/images/pets/white_rabbit.png",
        "hedgehog" => "/images/pets/hedgehog.png",
        "hamster" => "/images/pets/hamster.png",
        "black_cat" => "/images/pets/black_cat.png",
        _ => "/images/pets/hamster.png",
    }
}
