//! Lifecycle orchestration over the store and the external services.
//!
//! All state transitions commit to the store before any generative service
//! is called, so a narration or embedding failure can never wedge a pet.

use std::fmt;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use uuid::Uuid;

use lp_core::{
    Behavior, DIARY_FALLBACK, CHAT_FALLBACK, DiaryContext, DiaryEntry, EggPhase, HatchError,
    MAX_QUESTIONS, MemoryKind, MemoryRecord, PartnerContext, Pet, PetStatus, TickOutcome,
    add_heat, adjectives, advance_progress, begin_travel, choose_partner, compose_chat_prompt,
    compose_diary_prompt, describe_traits, pet_image_path, rank_memories, reset,
    resolve_personality, scene_image_path, tick,
};
use lp_store::Store;

use crate::services::{Embedder, Illustrator, Narrator, SceneImageRequest};

/// How many recent rows retrieval considers before ranking.
pub const RECENT_WINDOW: usize = 100;

/// Memories fed into a diary or chat prompt.
const PROMPT_MEMORY_LIMIT: usize = 5;

#[derive(Debug)]
pub enum EngineError {
    PetNotFound(Uuid),
    /// Dead eggs reject operations until the owner claims again.
    EggDead,
    NotAnEgg,
    StillAnEgg,
    Store(lp_store::StoreError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::PetNotFound(id) => write!(f, "pet not found: {id}"),
            EngineError::EggDead => write!(f, "the egg has died; claim it again to start over"),
            EngineError::NotAnEgg => write!(f, "pet has already hatched"),
            EngineError::StillAnEgg => write!(f, "pet has not hatched yet"),
            EngineError::Store(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<lp_store::StoreError> for EngineError {
    fn from(e: lp_store::StoreError) -> Self {
        EngineError::Store(e)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What one full sweep over the population did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub pets: usize,
    pub transitions: usize,
    pub trips_resolved: usize,
    pub errors: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct EngineStats {
    pub pets: i64,
    pub memories: i64,
    pub diaries: i64,
}

pub struct LifecycleEngine {
    store: Store,
    narrator: Box<dyn Narrator>,
    embedder: Box<dyn Embedder>,
    illustrator: Box<dyn Illustrator>,
    rng: SmallRng,
}

impl LifecycleEngine {
    pub fn new(
        store: Store,
        narrator: Box<dyn Narrator>,
        embedder: Box<dyn Embedder>,
        illustrator: Box<dyn Illustrator>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            store,
            narrator,
            embedder,
            illustrator,
            rng,
        }
    }

    fn require_pet(&self, pet_id: Uuid) -> Result<Pet> {
        self.store
            .get_pet(pet_id)?
            .ok_or(EngineError::PetNotFound(pet_id))
    }

    // --- Egg operations ---

    /// The owner's pet, creating a fresh egg when they have none. A dead
    /// egg is reset in place so the owner keeps the same pet id.
    pub fn claim_egg(&self, owner_id: Uuid) -> Result<Pet> {
        if let Some(mut pet) = self.store.pet_by_owner(owner_id)? {
            if pet.status == PetStatus::Egg(EggPhase::Dead) {
                reset(&mut pet);
                self.store.update_pet(&pet)?;
                tracing::info!("reset dead egg {} for owner {owner_id}", pet.id);
            }
            return Ok(pet);
        }

        let pet = Pet::new_egg(owner_id);
        self.store.insert_pet(&pet)?;
        tracing::info!("claimed new egg {} for owner {owner_id}", pet.id);
        Ok(pet)
    }

    /// Settle hatching progress against the clock. Living pets pass
    /// through untouched so reads can call this unconditionally.
    pub fn advance_egg(&self, pet_id: Uuid, now: u64) -> Result<Pet> {
        let mut pet = self.require_pet(pet_id)?;
        if !pet.is_egg() {
            return Ok(pet);
        }
        advance_progress(&mut pet, now);
        finalize_if_hatched(&mut pet);
        self.store.update_pet(&pet)?;
        Ok(pet)
    }

    /// Apply one heating reward, optionally recording a questionnaire
    /// answer alongside it. Extra answers past the questionnaire are
    /// dropped.
    pub fn heat_egg(&self, pet_id: Uuid, answer: Option<u8>, now: u64) -> Result<Pet> {
        let mut pet = self.require_pet(pet_id)?;
        if !pet.is_egg() {
            return Err(EngineError::NotAnEgg);
        }

        match add_heat(&mut pet, now) {
            Ok(_) => {
                if let Some(answer) = answer
                    && pet.hatch_answers.len() < MAX_QUESTIONS
                {
                    pet.hatch_answers.push(answer);
                }
                finalize_if_hatched(&mut pet);
                self.store.update_pet(&pet)?;
                Ok(pet)
            }
            Err(HatchError::EggDead) => {
                // The settling step may just have crossed the death
                // threshold; that transition still persists.
                self.store.update_pet(&pet)?;
                Err(EngineError::EggDead)
            }
        }
    }

    /// Name the pet. A freshly hatched pet enters the behavior loop on
    /// naming, leaving immediately for its first trip.
    pub fn name_pet(&mut self, pet_id: Uuid, name: &str, now: u64) -> Result<Pet> {
        let mut pet = self.require_pet(pet_id)?;
        match pet.status {
            PetStatus::Egg(EggPhase::Hatched) => {
                pet.name = name.to_string();
                begin_travel(&mut pet, &mut self.rng);
                pet.status = PetStatus::Living(Behavior::Traveling);
                pet.last_status_update = now;
            }
            PetStatus::Living(_) => {
                pet.name = name.to_string();
            }
            PetStatus::Egg(_) => return Err(EngineError::StillAnEgg),
        }
        self.store.update_pet(&pet)?;
        Ok(pet)
    }

    // --- Behavior operations ---

    /// One behavior tick. The transition is committed before trip-end
    /// narration runs, so generation failures cannot roll it back.
    pub async fn tick_behavior(&mut self, pet_id: Uuid, now: u64) -> Result<TickOutcome> {
        let mut pet = self.require_pet(pet_id)?;
        let outcome = tick(&mut pet, now, &mut self.rng);

        if let TickOutcome::Changed {
            from,
            to,
            completed_trip,
        } = &outcome
        {
            self.store.update_pet(&pet)?;
            tracing::debug!("pet {} moved {from:?} -> {to:?}", pet.id);
            if let Some(destination) = completed_trip {
                self.resolve_trip_end(&pet, destination, now).await?;
            }
        }

        Ok(outcome)
    }

    /// Sweep the whole population once. Per-pet failures are logged and
    /// skipped; the sweep itself never aborts.
    pub async fn sweep_all(&mut self, now: u64) -> Result<SweepSummary> {
        let ids: Vec<Uuid> = self.store.all_pets()?.iter().map(|p| p.id).collect();
        let mut summary = SweepSummary::default();

        for id in ids {
            summary.pets += 1;
            // Re-fetch: an earlier pet's encounter may already have moved
            // this one to Sleeping.
            let is_egg = match self.store.get_pet(id) {
                Ok(Some(pet)) => pet.is_egg(),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("sweep skipped pet {id}: {e}");
                    summary.errors += 1;
                    continue;
                }
            };

            let result = if is_egg {
                self.advance_egg(id, now).map(|_| ())
            } else {
                match self.tick_behavior(id, now).await {
                    Ok(TickOutcome::Changed { completed_trip, .. }) => {
                        summary.transitions += 1;
                        if completed_trip.is_some() {
                            summary.trips_resolved += 1;
                        }
                        Ok(())
                    }
                    Ok(TickOutcome::Unchanged) => Ok(()),
                    Err(e) => Err(e),
                }
            };

            if let Err(e) = result {
                tracing::warn!("sweep skipped pet {id}: {e}");
                summary.errors += 1;
            }
        }

        Ok(summary)
    }

    async fn resolve_trip_end(&mut self, pet: &Pet, destination: &str, now: u64) -> Result<()> {
        let candidates = self.store.travelers_at(destination, pet.id)?;
        let partner =
            choose_partner(pet, &candidates, &mut self.rng).map(|idx| candidates[idx].clone());

        self.write_trip_diary(pet, destination, partner.as_ref(), now)
            .await?;

        if let Some(mut partner) = partner {
            tracing::info!(
                "pets {} and {} met at the {destination}",
                pet.id,
                partner.id
            );
            self.write_trip_diary(&partner, destination, Some(pet), now)
                .await?;
            // The encounter ends the partner's trip too.
            partner.status = PetStatus::Living(Behavior::Sleeping);
            partner.current_destination = None;
            partner.last_status_update = now;
            self.store.update_pet(&partner)?;
        }

        Ok(())
    }

    async fn write_trip_diary(
        &self,
        pet: &Pet,
        destination: &str,
        partner: Option<&Pet>,
        now: u64,
    ) -> Result<DiaryEntry> {
        let title = format!("Trip to {destination}");
        let first_visit = self.store.count_diaries_titled(pet.id, &title)? == 0;

        let partner_ctx = match partner {
            Some(p) => Some(PartnerContext {
                name: p.name.clone(),
                template_id: p.template_id.clone(),
                adjectives: adjectives(&p.traits),
                trait_description: describe_traits(&p.traits),
                first_meeting: self.store.count_memories_mentioning(pet.id, &p.name)? == 0,
            }),
            None => None,
        };

        let query = match partner {
            Some(p) => format!("A trip to the {destination} with {}.", p.name),
            None => format!("A trip to the {destination}."),
        };
        let memories: Vec<(f32, String)> = match self.embedder.embed(&query).await {
            Some(query_embedding) => {
                let window = self.store.recent_trip_memories(pet.id, RECENT_WINDOW)?;
                rank_memories(&window, &query_embedding, PROMPT_MEMORY_LIMIT)
                    .map(|ranked| {
                        ranked
                            .into_iter()
                            .map(|m| (m.score, m.record.content))
                            .collect()
                    })
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };

        let ctx = DiaryContext {
            name: pet.name.clone(),
            template_id: pet.template_id.clone(),
            personality_prompt: pet.personality_prompt.clone(),
            trait_description: describe_traits(&pet.traits),
            destination: destination.to_string(),
            first_visit,
            partner: partner_ctx,
            memories,
        };
        let prompt = compose_diary_prompt(&ctx);
        let body = match self.narrator.generate(&prompt.system, &prompt.user).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("diary narration failed for pet {}: {e}", pet.id);
                DIARY_FALLBACK.to_string()
            }
        };

        let pet_description = format!("a {} named {}", pet.template_id, pet.name);
        let partner_description = partner.map(|p| format!("a {} named {}", p.template_id, p.name));
        let request = SceneImageRequest {
            pet_image: pet_image_path(&pet.template_id),
            scene_image: scene_image_path(destination),
            pet_description: &pet_description,
            scene_name: destination,
            partner_image: partner.map(|p| pet_image_path(&p.template_id)),
            partner_description: partner_description.as_deref(),
            diary_text: &body,
        };
        let image_ref = match self.illustrator.compose_scene_image(&request).await {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("scene illustration unavailable for pet {}: {e}", pet.id);
                scene_image_path(destination).to_string()
            }
        };

        let diary = DiaryEntry {
            id: Uuid::new_v4(),
            pet_id: pet.id,
            title: title.clone(),
            body: body.clone(),
            image_ref: Some(image_ref),
            created_at: now,
        };
        self.store.append_diary(&diary)?;

        // The stored memory names the partner so later encounters know
        // this was not a first meeting.
        let memory_content = match partner {
            Some(p) => format!("{title} with {}. {body}", p.name),
            None => format!("{title}. {body}"),
        };
        self.save_memory(pet.id, &memory_content, MemoryKind::TripLog, now)
            .await?;

        Ok(diary)
    }

    // --- Memory and chat ---

    async fn save_memory(
        &self,
        pet_id: Uuid,
        content: &str,
        kind: MemoryKind,
        now: u64,
    ) -> Result<MemoryRecord> {
        let embedding = self.embedder.embed(content).await;
        let record = MemoryRecord {
            id: Uuid::new_v4(),
            pet_id,
            content: content.to_string(),
            embedding,
            kind,
            created_at: now,
        };
        self.store.append_memory(&record)?;
        Ok(record)
    }

    /// Semantic retrieval over the recent window, falling back to plain
    /// recency when nothing can be scored. Output is in chronological
    /// order either way.
    pub async fn retrieve_memories(
        &self,
        pet_id: Uuid,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        self.require_pet(pet_id)?;
        let window = self.store.recent_memories(pet_id, RECENT_WINDOW)?;

        if let Some(query_embedding) = self.embedder.embed(query).await
            && let Some(ranked) = rank_memories(&window, &query_embedding, limit)
        {
            return Ok(ranked.into_iter().map(|m| m.record).collect());
        }

        let mut recent: Vec<MemoryRecord> = window.into_iter().take(limit).collect();
        recent.reverse();
        Ok(recent)
    }

    /// One conversational turn. Both sides are remembered so future
    /// retrieval sees the exchange.
    pub async fn chat(&self, pet_id: Uuid, message: &str, now: u64) -> Result<String> {
        let pet = self.require_pet(pet_id)?;
        if pet.is_egg() {
            return Err(EngineError::StillAnEgg);
        }

        let retrieved = self
            .retrieve_memories(pet_id, message, PROMPT_MEMORY_LIMIT)
            .await?;
        let lines: Vec<String> = retrieved.into_iter().map(|m| m.content).collect();

        let prompt = compose_chat_prompt(
            &pet.name,
            &pet.template_id,
            &pet.personality_prompt,
            &describe_traits(&pet.traits),
            &lines,
            message,
        );
        let reply = match self.narrator.generate(&prompt.system, &prompt.user).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("chat narration failed for pet {}: {e}", pet.id);
                CHAT_FALLBACK.to_string()
            }
        };

        self.save_memory(pet.id, &format!("User: {message}"), MemoryKind::UserChat, now)
            .await?;
        self.save_memory(pet.id, &format!("Me: {reply}"), MemoryKind::PetChat, now)
            .await?;

        Ok(reply)
    }

    // --- Introspection ---

    pub fn get_pet(&self, pet_id: Uuid) -> Result<Pet> {
        self.require_pet(pet_id)
    }

    pub fn diaries(&self, pet_id: Uuid) -> Result<Vec<DiaryEntry>> {
        self.require_pet(pet_id)?;
        Ok(self.store.diaries_for(pet_id)?)
    }

    pub fn stats(&self) -> Result<EngineStats> {
        Ok(EngineStats {
            pets: self.store.pet_count()?,
            memories: self.store.memory_count()?,
            diaries: self.store.diary_count()?,
        })
    }
}

/// A hatched egg with an unresolved template gets its personality,
/// prompt, canonical traits, and a provisional species name.
fn finalize_if_hatched(pet: &mut Pet) {
    if pet.status == PetStatus::Egg(EggPhase::Hatched) && pet.template_id == "unknown" {
        let (archetype, prompt) = resolve_personality(&pet.hatch_answers);
        pet.template_id = archetype.id.to_string();
        pet.personality_prompt = prompt;
        pet.traits = archetype.traits;
        pet.name = archetype.name.to_string();
        tracing::info!("pet {} hatched as {}", pet.id, archetype.id);
    }
}
