//! Prompt composition for diary and chat narration.
//!
//! Builds the text handed to the narrative service. Pure string assembly;
//! the caller supplies everything already resolved (trait descriptions,
//! retrieved memories, encounter details).

use std::fmt::Write;

/// Canned diary body used when the narrative service fails.
pub const DIARY_FALLBACK: &str = "I went on a trip, but I forgot what happened...";

/// Canned chat reply used when the narrative service fails.
pub const CHAT_FALLBACK: &str = "Meow... (I'm having trouble thinking right now)";

/// A system/user prompt pair for one generation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// The pet met at the destination, described for the diary prompt.
#[derive(Clone, Debug)]
pub struct PartnerContext {
    pub name: String,
    pub template_id: String,
    pub adjectives: String,
    pub trait_description: String,
    /// No prior memory mentions this partner by name.
    pub first_meeting: bool,
}

/// Everything the diary prompt needs about one completed trip.
#[derive(Clone, Debug)]
pub struct DiaryContext {
    pub name: String,
    pub template_id: String,
    pub personality_prompt: String,
    pub trait_description: String,
    pub destination: String,
    /// No prior diary is titled for this destination.
    pub first_visit: bool,
    pub partner: Option<PartnerContext>,
    /// Retrieved trip memories as (similarity, content), chronological.
    pub memories: Vec<(f32, String)>,
}

/// Render the diary generation prompt for a completed trip.
pub fn compose_diary_prompt(ctx: &DiaryContext) -> PromptPair {
    let mut system = format!(
        "You are a {} named {}. Your personality traits are: {}. {} You just returned from a trip to the {}. ",
        ctx.template_id, ctx.name, ctx.trait_description, ctx.personality_prompt, ctx.destination,
    );

    if ctx.first_visit {
        system.push_str("This was your first time there. ");
    }

    if let Some(partner) = &ctx.partner {
        let _ = write!(
            system,
            "There you ran into your good friend {} (a {} {}, personality: {}). ",
            partner.name, partner.adjectives, partner.template_id, partner.trait_description,
        );
        if partner.first_meeting {
            system.push_str("It was the first time you two had ever met. ");
        }
    }

    if !ctx.memories.is_empty() {
        system.push_str("\n\nRelevant past memories (for style and context reference):\n");
        for (i, (score, content)) in ctx.memories.iter().enumerate() {
            let _ = writeln!(system, "{}. {} (Similarity: {:.2})", i + 1, content, score);
        }
        system.push('\n');
    }

    system.push_str(
        "Write a short, cute diary entry (1-2 sentences) about what you saw and did there, \
         in the first person. If you met a friend, describe the interaction so it fits both \
         personalities (a shy friend might be bashful, an outgoing one full of energy). \
         You may echo the tone of past memories, but never copy them.",
    );

    PromptPair {
        system,
        user: format!("Describe your trip to the {}.", ctx.destination),
    }
}

/// Render the chat prompt for a conversational turn.
///
/// `memories` are prior chat lines in chronological order, already
/// prefixed with their speaker.
pub fn compose_chat_prompt(
    name: &str,
    template_id: &str,
    personality_prompt: &str,
    trait_description: &str,
    memories: &[String],
    message: &str,
) -> PromptPair {
    let mut context = String::new();
    for line in memories {
        let _ = writeln!(context, "- {line}");
    }

    let system = format!(
        "You are {name}, a {template_id}.\n\
         {personality_prompt}\n\n\
         Your core traits:\n{trait_description}\n\n\
         Recent memories:\n{context}\n\
         Instruction:\n\
         Reply to the user's message based on your personality and memories.\n\
         Keep your response short (under 50 words), engaging, and in character.\n\
         Do not start with \"User:\" or \"Pet:\". Just say what you would say.",
    );

    PromptPair {
        system,
        user: message.to_string(),
    }
}
