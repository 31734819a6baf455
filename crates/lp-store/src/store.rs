use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use lp_core::{DiaryEntry, MemoryKind, MemoryRecord, Pet, PetStatus, TraitVector};

use crate::error::{Result, StoreError};
use crate::schema;

const PET_COLUMNS: &str = "id, owner_id, name, template_id, personality_prompt, traits, status, \
     last_status_update, current_destination, visited_landmarks, hatch_progress_seconds, \
     heat_buffer_seconds, last_hatch_update, frozen_since, hatch_answers, created_at";

pub struct Store {
    // Behind a mutex so `Store` is `Sync`; rusqlite's `Connection` is not.
    conn: std::sync::Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("store connection mutex poisoned")
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Pets ---

    pub fn insert_pet(&self, pet: &Pet) -> Result<()> {
        let traits = serde_json::to_string(&pet.traits)?;
        let landmarks = serde_json::to_string(&pet.visited_landmarks)?;
        let answers = serde_json::to_string(&pet.hatch_answers)?;
        self.conn().execute(
            &format!(
                "INSERT INTO pets ({PET_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                pet.id.to_string(),
                pet.owner_id.to_string(),
                pet.name,
                pet.template_id,
                pet.personality_prompt,
                traits,
                pet.status.as_str(),
                pet.last_status_update as i64,
                pet.current_destination,
                landmarks,
                pet.hatch_progress_seconds as i64,
                pet.heat_buffer_seconds as i64,
                pet.last_hatch_update as i64,
                pet.frozen_since.map(|v| v as i64),
                answers,
                pet.created_at as i64,
            ],
        )?;
        Ok(())
    }

    /// Persist every mutable field of a pet. Errors if the pet was never
    /// inserted.
    pub fn update_pet(&self, pet: &Pet) -> Result<()> {
        let traits = serde_json::to_string(&pet.traits)?;
        let landmarks = serde_json::to_string(&pet.visited_landmarks)?;
        let answers = serde_json::to_string(&pet.hatch_answers)?;
        let rows = self.conn().execute(
            "UPDATE pets SET owner_id = ?2, name = ?3, template_id = ?4, personality_prompt = ?5, \
             traits = ?6, status = ?7, last_status_update = ?8, current_destination = ?9, \
             visited_landmarks = ?10, hatch_progress_seconds = ?11, heat_buffer_seconds = ?12, \
             last_hatch_update = ?13, frozen_since = ?14, hatch_answers = ?15, created_at = ?16 \
             WHERE id = ?1",
            params![
                pet.id.to_string(),
                pet.owner_id.to_string(),
                pet.name,
                pet.template_id,
                pet.personality_prompt,
                traits,
                pet.status.as_str(),
                pet.last_status_update as i64,
                pet.current_destination,
                landmarks,
                pet.hatch_progress_seconds as i64,
                pet.heat_buffer_seconds as i64,
                pet.last_hatch_update as i64,
                pet.frozen_since.map(|v| v as i64),
                answers,
                pet.created_at as i64,
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::InvalidData(format!("pet not found: {}", pet.id)));
        }
        Ok(())
    }

    pub fn get_pet(&self, id: Uuid) -> Result<Option<Pet>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {PET_COLUMNS} FROM pets WHERE id = ?1"))?;
        let row = stmt
            .query_row([id.to_string()], map_pet_row)
            .optional()?
            .transpose()?;
        Ok(row)
    }

    /// The owner's pet, if any. One pet per owner; ties broken by rowid.
    pub fn pet_by_owner(&self, owner_id: Uuid) -> Result<Option<Pet>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PET_COLUMNS} FROM pets WHERE owner_id = ?1 ORDER BY rowid LIMIT 1"
        ))?;
        let row = stmt
            .query_row([owner_id.to_string()], map_pet_row)
            .optional()?
            .transpose()?;
        Ok(row)
    }

    pub fn all_pets(&self) -> Result<Vec<Pet>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {PET_COLUMNS} FROM pets ORDER BY rowid"))?;
        let rows: Vec<Result<Pet>> = stmt
            .query_map([], map_pet_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().collect()
    }

    /// Pets currently traveling at `destination`, excluding one pet
    /// (normally the asker).
    pub fn travelers_at(&self, destination: &str, exclude: Uuid) -> Result<Vec<Pet>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PET_COLUMNS} FROM pets \
             WHERE status = 'traveling' AND current_destination = ?1 AND id != ?2 \
             ORDER BY rowid"
        ))?;
        let rows: Vec<Result<Pet>> = stmt
            .query_map(params![destination, exclude.to_string()], map_pet_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().collect()
    }

    // --- Memories ---

    pub fn append_memory(&self, memory: &MemoryRecord) -> Result<()> {
        let embedding_json = memory
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn().execute(
            "INSERT INTO memories (id, pet_id, content, embedding, kind, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                memory.id.to_string(),
                memory.pet_id.to_string(),
                memory.content,
                embedding_json,
                memory.kind.as_str(),
                memory.created_at as i64,
            ],
        )?;
        Ok(())
    }

    /// The `window` newest memories for a pet, newest first.
    pub fn recent_memories(&self, pet_id: Uuid, window: usize) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, pet_id, content, embedding, kind, created_at FROM memories \
             WHERE pet_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows: Vec<Result<MemoryRecord>> = stmt
            .query_map(params![pet_id.to_string(), window as i64], map_memory_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().collect()
    }

    /// Trip-log memories only, newest first, for diary retrieval.
    pub fn recent_trip_memories(&self, pet_id: Uuid, window: usize) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, pet_id, content, embedding, kind, created_at FROM memories \
             WHERE pet_id = ?1 AND kind = 'trip_log' ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let rows: Vec<Result<MemoryRecord>> = stmt
            .query_map(params![pet_id.to_string(), window as i64], map_memory_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().collect()
    }

    /// Memories of a pet whose content mentions `text`.
    pub fn count_memories_mentioning(&self, pet_id: Uuid, text: &str) -> Result<i64> {
        let pattern = format!("%{}%", text.replace('%', "\\%").replace('_', "\\_"));
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM memories WHERE pet_id = ?1 AND content LIKE ?2 ESCAPE '\\'",
            params![pet_id.to_string(), pattern],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // --- Diaries ---

    pub fn append_diary(&self, diary: &DiaryEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO diaries (id, pet_id, title, body, image_ref, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                diary.id.to_string(),
                diary.pet_id.to_string(),
                diary.title,
                diary.body,
                diary.image_ref,
                diary.created_at as i64,
            ],
        )?;
        Ok(())
    }

    /// All diaries for a pet, newest first.
    pub fn diaries_for(&self, pet_id: Uuid) -> Result<Vec<DiaryEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, pet_id, title, body, image_ref, created_at FROM diaries \
             WHERE pet_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows: Vec<Result<DiaryEntry>> = stmt
            .query_map([pet_id.to_string()], map_diary_row)?
            .collect::<std::result::Result<_, _>>()?;
        rows.into_iter().collect()
    }

    pub fn count_diaries_titled(&self, pet_id: Uuid, title: &str) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM diaries WHERE pet_id = ?1 AND title = ?2",
            params![pet_id.to_string(), title],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn pet_count(&self) -> Result<i64> {
        let count = self.conn().query_row("SELECT COUNT(*) FROM pets", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn memory_count(&self) -> Result<i64> {
        let count = self.conn().query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn diary_count(&self) -> Result<i64> {
        let count = self.conn().query_row("SELECT COUNT(*) FROM diaries", [], |row| row.get(0))?;
        Ok(count)
    }
}

// --- Row mapping ---

// Two-stage mapping: rusqlite extracts raw column values, then the JSON and
// enum columns are decoded outside the rusqlite error type.

fn map_pet_row(row: &Row<'_>) -> rusqlite::Result<Result<Pet>> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(1)?;
    let name: String = row.get(2)?;
    let template_id: String = row.get(3)?;
    let personality_prompt: String = row.get(4)?;
    let traits_json: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let last_status_update: i64 = row.get(7)?;
    let current_destination: Option<String> = row.get(8)?;
    let landmarks_json: String = row.get(9)?;
    let hatch_progress_seconds: i64 = row.get(10)?;
    let heat_buffer_seconds: i64 = row.get(11)?;
    let last_hatch_update: i64 = row.get(12)?;
    let frozen_since: Option<i64> = row.get(13)?;
    let answers_json: String = row.get(14)?;
    let created_at: i64 = row.get(15)?;

    Ok((|| -> Result<Pet> {
        let traits: TraitVector = serde_json::from_str(&traits_json)?;
        let visited_landmarks: Vec<String> = serde_json::from_str(&landmarks_json)?;
        let hatch_answers: Vec<u8> = serde_json::from_str(&answers_json)?;
        let status = PetStatus::parse(&status_str)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(Pet {
            id: parse_uuid(&id)?,
            owner_id: parse_uuid(&owner_id)?,
            name,
            template_id,
            personality_prompt,
            traits,
            status,
            last_status_update: last_status_update as u64,
            current_destination,
            visited_landmarks,
            hatch_progress_seconds: hatch_progress_seconds as u64,
            heat_buffer_seconds: heat_buffer_seconds as u64,
            last_hatch_update: last_hatch_update as u64,
            frozen_since: frozen_since.map(|v| v as u64),
            hatch_answers,
            created_at: created_at as u64,
        })
    })())
}

fn map_memory_row(row: &Row<'_>) -> rusqlite::Result<Result<MemoryRecord>> {
    let id: String = row.get(0)?;
    let pet_id: String = row.get(1)?;
    let content: String = row.get(2)?;
    let embedding_json: Option<String> = row.get(3)?;
    let kind_str: String = row.get(4)?;
    let created_at: i64 = row.get(5)?;

    Ok((|| -> Result<MemoryRecord> {
        let embedding: Option<Vec<f32>> = embedding_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let kind = MemoryKind::parse(&kind_str)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(MemoryRecord {
            id: parse_uuid(&id)?,
            pet_id: parse_uuid(&pet_id)?,
            content,
            embedding,
            kind,
            created_at: created_at as u64,
        })
    })())
}

fn map_diary_row(row: &Row<'_>) -> rusqlite::Result<Result<DiaryEntry>> {
    let id: String = row.get(0)?;
    let pet_id: String = row.get(1)?;
    let title: String = row.get(2)?;
    let body: String = row.get(3)?;
    let image_ref: Option<String> = row.get(4)?;
    let created_at: i64 = row.get(5)?;

    Ok((|| -> Result<DiaryEntry> {
        Ok(DiaryEntry {
            id: parse_uuid(&id)?,
            pet_id: parse_uuid(&pet_id)?,
            title,
            body,
            image_ref,
            created_at: created_at as u64,
        })
    })())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}
