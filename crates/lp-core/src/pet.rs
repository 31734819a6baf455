use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::now_unix_secs;
use crate::traits::TraitVector;

/// Pre-hatch lifecycle phases. Dead is terminal except through `reset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EggPhase {
    Claimed,
    Hatching,
    Frozen,
    Dead,
    Hatched,
}

/// Post-hatch behavior states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    Sleeping,
    Eating,
    Traveling,
}

/// The persisted lifecycle status of a pet. A pet is either still an egg
/// or alive in exactly one behavior state; there is no overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PetStatus {
    Egg(EggPhase),
    Living(Behavior),
}

impl PetStatus {
    /// Stable string encoding used in the database and the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            PetStatus::Egg(EggPhase::Claimed) => "egg_claimed",
            PetStatus::Egg(EggPhase::Hatching) => "egg_hatching",
            PetStatus::Egg(EggPhase::Frozen) => "egg_frozen",
            PetStatus::Egg(EggPhase::Dead) => "egg_dead",
            PetStatus::Egg(EggPhase::Hatched) => "egg_hatched",
            PetStatus::Living(Behavior::Sleeping) => "sleeping",
            PetStatus::Living(Behavior::Eating) => "eating",
            PetStatus::Living(Behavior::Traveling) => "traveling",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "egg_claimed" => Ok(PetStatus::Egg(EggPhase::Claimed)),
            "egg_hatching" => Ok(PetStatus::Egg(EggPhase::Hatching)),
            "egg_frozen" => Ok(PetStatus::Egg(EggPhase::Frozen)),
            "egg_dead" => Ok(PetStatus::Egg(EggPhase::Dead)),
            "egg_hatched" => Ok(PetStatus::Egg(EggPhase::Hatched)),
            "sleeping" => Ok(PetStatus::Living(Behavior::Sleeping)),
            "eating" => Ok(PetStatus::Living(Behavior::Eating)),
            "traveling" => Ok(PetStatus::Living(Behavior::Traveling)),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for PetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct StatusParseError(pub String);

impl fmt::Display for StatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pet status: '{}'", self.0)
    }
}

impl std::error::Error for StatusParseError {}

/// One simulated pet and all of its lifecycle bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Archetype id once hatched; "unknown" before.
    pub template_id: String,
    pub personality_prompt: String,
    pub traits: TraitVector,
    pub status: PetStatus,
    /// Unix seconds of the last behavior transition (dwell-time anchor).
    pub last_status_update: u64,
    pub current_destination: Option<String>,
    pub visited_landmarks: Vec<String>,
    pub hatch_progress_seconds: u64,
    pub heat_buffer_seconds: u64,
    /// 0 means "never advanced" and triggers initialization on first advance.
    pub last_hatch_update: u64,
    pub frozen_since: Option<u64>,
    /// Questionnaire answers recorded so far, one option index per question.
    pub hatch_answers: Vec<u8>,
    pub created_at: u64,
}

impl Pet {
    /// A freshly claimed egg.
    pub fn new_egg(owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: "Pet Egg".to_string(),
            template_id: "unknown".to_string(),
            personality_prompt: "An unhatched egg.".to_string(),
            traits: TraitVector::neutral(),
            status: PetStatus::Egg(EggPhase::Claimed),
            last_status_update: 0,
            current_destination: None,
            visited_landmarks: Vec::new(),
            hatch_progress_seconds: 0,
            heat_buffer_seconds: 0,
            last_hatch_update: 0,
            frozen_since: None,
            hatch_answers: Vec::new(),
            created_at: now_unix_secs(),
        }
    }

    pub fn is_egg(&self) -> bool {
        matches!(self.status, PetStatus::Egg(_))
    }
}

/// Where a memory came from. Chat turns keep user and pet sides apart so
/// prompts can be reconstructed faithfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryKind {
    UserChat,
    PetChat,
    TripLog,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::UserChat => "user_chat",
            MemoryKind::PetChat => "pet_chat",
            MemoryKind::TripLog => "trip_log",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "user_chat" => Ok(MemoryKind::UserChat),
            "pet_chat" => Ok(MemoryKind::PetChat),
            "trip_log" => Ok(MemoryKind::TripLog),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// An append-only memory row. `embedding: None` marks a record the
/// embedding service failed on; it still counts for recency fallback.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub kind: MemoryKind,
    pub created_at: u64,
}

/// An append-only diary row, one per completed trip (plus reciprocals).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub title: String,
    pub body: String,
    pub image_ref: Option<String>,
    pub created_at: u64,
}
