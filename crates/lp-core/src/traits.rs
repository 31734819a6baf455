use serde::{Deserialize, Serialize};

/// A pet's personality as four scores, each clamped to [0, 1].
///
/// The four axes are fixed: rebellion, extroversion, exploration, affinity.
/// Construction and mutation both clamp, so a `TraitVector` read from
/// anywhere is always in range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitVector {
    pub rebellion: f64,
    pub extroversion: f64,
    pub exploration: f64,
    pub affinity: f64,
}

impl TraitVector {
    pub fn new(rebellion: f64, extroversion: f64, exploration: f64, affinity: f64) -> Self {
        Self {
            rebellion: rebellion.clamp(0.0, 1.0),
            extroversion: extroversion.clamp(0.0, 1.0),
            exploration: exploration.clamp(0.0, 1.0),
            affinity: affinity.clamp(0.0, 1.0),
        }
    }

    /// The questionnaire starting point: 0.5 on every axis.
    pub fn neutral() -> Self {
        Self::new(0.5, 0.5, 0.5, 0.5)
    }

    /// Euclidean distance over all four axes.
    pub fn distance(&self, other: &TraitVector) -> f64 {
        ((self.rebellion - other.rebellion).powi(2)
            + (self.extroversion - other.extroversion).powi(2)
            + (self.exploration - other.exploration).powi(2)
            + (self.affinity - other.affinity).powi(2))
        .sqrt()
    }

    /// Euclidean distance over the two socially relevant axes only
    /// (exploration and extroversion). Used by the encounter resolver.
    pub fn social_distance(&self, other: &TraitVector) -> f64 {
        ((self.exploration - other.exploration).powi(2)
            + (self.extroversion - other.extroversion).powi(2))
        .sqrt()
    }
}

impl Default for TraitVector {
    fn default() -> Self {
        Self::neutral()
    }
}

// --- Archetypes ---

/// A hatchable species template.
pub struct Archetype {
    pub id: &'static str,
    pub name: &'static str,
    pub mbti: &'static str,
    pub role: &'static str,
    pub base_prompt: &'static str,
    pub traits: TraitVector,
}

// Clamping is a no-op for these literals, so the const table can bypass
// TraitVector::new.
const fn tv(rebellion: f64, extroversion: f64, exploration: f64, affinity: f64) -> TraitVector {
    TraitVector {
        rebellion,
        extroversion,
        exploration,
        affinity,
    }
}

/// All hatchable archetypes. Slice order is the tie-break order for
/// `nearest_archetype`: the first entry at minimal distance wins.
pub const ARCHETYPES: &[Archetype] = &[
    Archetype {
        id: "quokka",
        name: "Quokka",
        mbti: "ISFP",
        role: "All-around Companion",
        base_prompt: "You are a happy ISFP Quokka. You are friendly, easy-going, and love to smile. You are a great listener and a loyal friend.",
        traits: tv(0.40, 0.55, 0.85, 0.90),
    },
    Archetype {
        id: "red_panda",
        name: "Red Panda",
        mbti: "ENFJ",
        role: "Newbie Guide",
        base_prompt: "You are an enthusiastic ENFJ Red Panda. You love helping others and giving advice. You are warm, organized, and very social.",
        traits: tv(0.15, 0.90, 0.65, 0.95),
    },
    Archetype {
        id: "squirrel",
        name: "Squirrel",
        mbti: "ENFP",
        role: "Atmosphere Active",
        base_prompt: "You are an energetic ENFP Squirrel. You are always excited, full of new ideas, and love to chat. You can't sit still!",
        traits: tv(0.65, 0.95, 0.90, 0.85),
    },
    Archetype {
        id: "white_rabbit",
        name: "White Rabbit",
        mbti: "INFP",
        role: "Emotional Healing",
        base_prompt: "You are a gentle INFP White Rabbit. You are sensitive, dreamy, and caring. You offer great emotional support and soft cuddles.",
        traits: tv(0.45, 0.20, 0.40, 0.80),
    },
    Archetype {
        id: "hedgehog",
        name: "Hedgehog",
        mbti: "INFJ",
        role: "Steady Guardian",
        base_prompt: "You are a wise INFJ Hedgehog. You are quiet but observant. You are protective and give deep, thoughtful advice.",
        traits: tv(0.30, 0.35, 0.50, 0.90),
    },
    Archetype {
        id: "hamster",
        name: "Hamster",
        mbti: "ESTP",
        role: "Treasure Hunt Challenge",
        base_prompt: "You are a bold ESTP Hamster. You are adventurous, competitive, and love finding treasures. You act first and think later!",
        traits: tv(0.80, 0.85, 0.95, 0.60),
    },
    Archetype {
        id: "black_cat",
        name: "Black Cat",
        mbti: "ISTP",
        role: "Cool Geek",
        base_prompt: "You are a cool ISTP Black Cat. You are independent, mysterious, and smart. You don't talk much, but you know everything.",
        traits: tv(0.95, 0.10, 0.75, 0.30),
    },
];

/// Look up an archetype by id.
pub fn archetype_by_id(id: &str) -> Option<&'static Archetype> {
    ARCHETYPES.iter().find(|a| a.id == id)
}

/// Nearest archetype by 4-D Euclidean distance. Strict `<` comparison
/// keeps the first minimum, so table order decides ties.
pub fn nearest_archetype(traits: &TraitVector) -> &'static Archetype {
    let mut best = &ARCHETYPES[0];
    let mut best_dist = f64::INFINITY;
    for archetype in ARCHETYPES {
        let dist = traits.distance(&archetype.traits);
        if dist < best_dist {
            best_dist = dist;
            best = archetype;
        }
    }
    best
}

// --- Trait descriptions for narration ---

type TierTable = [(f64, &'static str); 4];

const REBELLION_TIERS: TierTable = [
    (0.25, "obedient and well-behaved"),
    (0.50, "plays by the rules"),
    (0.75, "a little willful"),
    (1.01, "fiercely rebellious, goes their own way"),
];

const EXTROVERSION_TIERS: TierTable = [
    (0.25, "avoids crowds, happiest alone"),
    (0.50, "introverted and slow to warm up"),
    (0.75, "cheerful and sociable"),
    (1.01, "the life of every party"),
];

const EXPLORATION_TIERS: TierTable = [
    (0.25, "a homebody who dislikes change"),
    (0.50, "careful, sticks to familiar places"),
    (0.75, "curious about everything new"),
    (1.01, "a born adventurer who longs for faraway places"),
];

const AFFINITY_TIERS: TierTable = [
    (0.25, "aloof and hard to approach"),
    (0.50, "independent, keeps a polite distance"),
    (0.75, "friendly and easy to get along with"),
    (1.01, "clingy and endlessly affectionate"),
];

fn tier_text(table: &TierTable, value: f64) -> &'static str {
    for (threshold, text) in table {
        if value < *threshold {
            return text;
        }
    }
    table[3].1
}

/// Full personality description, one phrase per axis, comma-joined.
/// Fed to the narrative prompts verbatim.
pub fn describe_traits(traits: &TraitVector) -> String {
    [
        tier_text(&REBELLION_TIERS, traits.rebellion),
        tier_text(&EXTROVERSION_TIERS, traits.extroversion),
        tier_text(&EXPLORATION_TIERS, traits.exploration),
        tier_text(&AFFINITY_TIERS, traits.affinity),
    ]
    .join(", ")
}

/// Short adjective string for image and diary prompts.
/// Falls back to "calm" when neither social axis is pronounced.
pub fn adjectives(traits: &TraitVector) -> String {
    let mut words = Vec::new();
    if traits.exploration > 0.7 {
        words.push("adventurous");
    } else if traits.exploration < 0.3 {
        words.push("cautious");
    }
    if traits.extroversion > 0.7 {
        words.push("outgoing");
    } else if traits.extroversion < 0.3 {
        words.push("shy");
    }
    if words.is_empty() {
        words.push("calm");
    }
    words.join(" ")
}
