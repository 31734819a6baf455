//! Pet lifecycle simulation engine.
//!
//! Models a pet's life from claimed egg to autonomous companion: a
//! heat-driven hatching state machine, a personality questionnaire that
//! resolves the egg into one of seven archetypes, a dwell-gated behavior
//! loop over sleeping/eating/traveling, trait-based cross-pet encounters,
//! and semantic ranking over diary memories.
//!
//! Zero I/O — pure rules with injected clocks and RNGs, no opinions about
//! transport or persistence.

pub mod behavior;
pub mod hatching;
pub mod memory;
pub mod narrate;
pub mod pet;
pub mod time;
pub mod traits;

pub use behavior::{
    LANDMARKS, MIN_DWELL_SECS, SCENES, TickOutcome, begin_travel, choose_partner,
    encounter_probability, next_state, pet_image_path, scene_image_path, select_destination, tick,
};
pub use hatching::{
    DEATH_THRESHOLD_SECS, HATCH_TARGET_SECS, HEAT_REWARD_SECS, HatchError, MAX_QUESTIONS,
    add_heat, advance_progress, reset, resolve_personality,
};
pub use memory::{ScoredMemory, cosine_similarity, rank_memories};
pub use narrate::{
    CHAT_FALLBACK, DIARY_FALLBACK, DiaryContext, PartnerContext, PromptPair, compose_chat_prompt,
    compose_diary_prompt,
};
pub use pet::{
    Behavior, DiaryEntry, EggPhase, MemoryKind, MemoryRecord, Pet, PetStatus, StatusParseError,
};
pub use time::{now_unix_secs, unix_to_iso8601};
pub use traits::{
    ARCHETYPES, Archetype, TraitVector, adjectives, archetype_by_id, describe_traits,
    nearest_archetype,
};
