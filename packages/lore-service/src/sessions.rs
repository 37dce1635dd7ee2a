//! In-memory session registry.
//!
//! The outer `RwLock` guards the id map; the per-entry `Mutex` serializes
//! handlers working on the same session. History is display context only and
//! never feeds retrieval.

use std::{collections::HashMap, sync::Arc};

use time::{Duration, OffsetDateTime};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{Error, Result};
use lore_domain::confidence::{AnswerMode, Confidence};

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Clone, Debug)]
pub struct Turn {
	pub role: String,
	pub content: String,
	pub ts: OffsetDateTime,
	pub mode: Option<AnswerMode>,
	pub confidence: Option<Confidence>,
}

#[derive(Clone, Debug)]
pub struct Session {
	pub session_id: Uuid,
	pub history: Vec<Turn>,
	pub created_at: OffsetDateTime,
	pub last_active_at: OffsetDateTime,
}

pub struct SessionManager {
	idle_timeout: Duration,
	max_messages: usize,
	sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}
impl SessionManager {
	pub fn new(cfg: &lore_config::Session) -> Self {
		Self {
			idle_timeout: Duration::seconds(cfg.idle_timeout_secs as i64),
			max_messages: cfg.max_messages as usize,
			sessions: RwLock::new(HashMap::new()),
		}
	}

	pub async fn create(&self) -> Uuid {
		let now = OffsetDateTime::now_utc();
		let session_id = Uuid::new_v4();
		let session = Session { session_id, history: Vec::new(), created_at: now, last_active_at: now };

		self.sessions.write().await.insert(session_id, Arc::new(Mutex::new(session)));

		session_id
	}

	/// Append turns, refreshing the idle clock. An unknown or idle-expired id
	/// fails with `SessionNotFound`; expired entries are removed on
	/// observation, never revived.
	pub async fn append(&self, session_id: Uuid, turns: Vec<Turn>) -> Result<()> {
		let entry = self.live_entry(session_id).await?;
		let mut session = entry.lock().await;

		session.history.extend(turns);

		let len = session.history.len();

		if len > self.max_messages {
			session.history.drain(..len - self.max_messages);
		}

		session.last_active_at = OffsetDateTime::now_utc();

		Ok(())
	}

	pub async fn history(&self, session_id: Uuid) -> Result<Vec<Turn>> {
		let entry = self.live_entry(session_id).await?;
		let session = entry.lock().await;

		Ok(session.history.clone())
	}

	/// Idempotent delete; returns whether the session existed.
	pub async fn reset(&self, session_id: Uuid) -> bool {
		self.sessions.write().await.remove(&session_id).is_some()
	}

	pub async fn contains(&self, session_id: Uuid) -> bool {
		self.live_entry(session_id).await.is_ok()
	}

	pub async fn active_count(&self) -> usize {
		self.sessions.read().await.len()
	}

	/// Drop every session idle longer than the timeout; returns how many.
	pub async fn sweep(&self, now: OffsetDateTime) -> usize {
		let expired = {
			let sessions = self.sessions.read().await;
			let mut expired = Vec::new();

			for (id, entry) in sessions.iter() {
				let session = entry.lock().await;

				if self.is_expired(&session, now) {
					expired.push(*id);
				}
			}

			expired
		};

		if expired.is_empty() {
			return 0;
		}

		let mut sessions = self.sessions.write().await;
		let mut removed = 0;

		for id in expired {
			if sessions.remove(&id).is_some() {
				removed += 1;
			}
		}

		removed
	}

	async fn live_entry(&self, session_id: Uuid) -> Result<Arc<Mutex<Session>>> {
		let entry = {
			let sessions = self.sessions.read().await;

			sessions.get(&session_id).cloned()
		}
		.ok_or(Error::SessionNotFound { session_id })?;
		let now = OffsetDateTime::now_utc();
		let expired = {
			let session = entry.lock().await;

			self.is_expired(&session, now)
		};

		if expired {
			self.sessions.write().await.remove(&session_id);

			return Err(Error::SessionNotFound { session_id });
		}

		Ok(entry)
	}

	fn is_expired(&self, session: &Session, now: OffsetDateTime) -> bool {
		now - session.last_active_at > self.idle_timeout
	}
}
