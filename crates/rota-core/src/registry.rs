use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::{domain::ChatId, errors::Error, Result};

/// A registration token binds only strictly before issue time plus this window.
pub const TOKEN_TTL_MINUTES: i64 = 10;

/// Persistent store of username↔chat links and their token lifecycle.
///
/// One row per username, and that row is the single source of truth for
/// both identity resolution and token state. The connection sits behind a
/// mutex, so `validate_and_bind` runs as one isolated read-modify-write;
/// the guarded UPDATE additionally protects against a concurrent bind
/// racing on the same token through another handle to the database.
#[derive(Clone)]
pub struct ChatRegistry {
    db: Arc<Mutex<Connection>>,
}

impl ChatRegistry {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chat_links (
                username TEXT PRIMARY KEY,
                chat_id INTEGER,
                registration_token TEXT NOT NULL,
                token_expiration TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_chat_links_token
             ON chat_links (registration_token)",
            [],
        )?;

        tracing::info!(db = %path.as_ref().display(), "chat registry opened");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| Error::Persistence(format!("registry mutex poisoned: {e}")))
    }

    /// Create the link row for `username` if absent, otherwise rotate its
    /// token unconditionally (a bound chat id is preserved). Returns the
    /// fresh token; any previously issued token stops validating.
    pub fn issue_token(&self, username: &str) -> Result<String> {
        let token = new_token();
        let expiration = Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES);

        let db = self.lock()?;
        db.execute(
            "INSERT INTO chat_links (username, chat_id, registration_token, token_expiration)
             VALUES (?1, NULL, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET
                registration_token = excluded.registration_token,
                token_expiration = excluded.token_expiration",
            params![username, token, expiration.to_rfc3339()],
        )?;

        Ok(token)
    }

    /// Chat id bound to `username`, or `NotFound` if the user has no link
    /// row or the row was never bound.
    pub fn lookup_by_username(&self, username: &str) -> Result<ChatId> {
        let db = self.lock()?;
        let chat_id: Option<Option<i64>> = db
            .query_row(
                "SELECT chat_id FROM chat_links WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;

        match chat_id.flatten() {
            Some(id) => Ok(ChatId(id)),
            None => Err(Error::NotFound),
        }
    }

    /// Username whose link row is bound to `chat`, or `NotFound`.
    pub fn lookup_by_chat(&self, chat: ChatId) -> Result<String> {
        let db = self.lock()?;
        db.query_row(
            "SELECT username FROM chat_links WHERE chat_id = ?1",
            params![chat.0],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(Error::NotFound)
    }

    /// Bind `chat` to whichever link currently holds `token`.
    ///
    /// `InvalidToken` when no link holds the token (including a token that
    /// was already consumed), `TokenExpired` at or after the expiration
    /// timestamp (with no mutation). A successful bind sets the chat id and
    /// rotates the token, so the presented token can never bind twice. The
    /// UPDATE is guarded on the old token: if a concurrent bind got there
    /// first, this one reports `InvalidToken` instead of overwriting it.
    pub fn validate_and_bind(&self, token: &str, chat: ChatId) -> Result<()> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;

        let row: Option<(String, String)> = tx
            .query_row(
                "SELECT username, token_expiration FROM chat_links
                 WHERE registration_token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((username, expiration)) = row else {
            return Err(Error::InvalidToken);
        };

        if parse_timestamp(&expiration)? <= Utc::now() {
            // Dropping the transaction rolls back; the expired row is left
            // untouched until the next issue request rotates it.
            return Err(Error::TokenExpired);
        }

        let rotated = new_token();
        let changed = tx.execute(
            "UPDATE chat_links
             SET chat_id = ?1, registration_token = ?2
             WHERE username = ?3 AND registration_token = ?4",
            params![chat.0, rotated, username, token],
        )?;
        if changed == 0 {
            return Err(Error::InvalidToken);
        }

        tx.commit()?;
        tracing::info!(%username, chat = chat.0, "chat linked");
        Ok(())
    }
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Persistence(format!("bad timestamp in chat_links: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatLink;

    fn scratch_registry() -> (tempfile::TempDir, ChatRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = ChatRegistry::open(dir.path().join("links.db")).unwrap();
        (dir, registry)
    }

    fn raw_link(registry: &ChatRegistry, username: &str) -> ChatLink {
        let db = registry.db.lock().unwrap();
        db.query_row(
            "SELECT username, chat_id, registration_token, token_expiration
             FROM chat_links WHERE username = ?1",
            params![username],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .map(|(username, chat_id, registration_token, token_expiration)| ChatLink {
            username,
            chat_id: chat_id.map(ChatId),
            registration_token,
            token_expiration: parse_timestamp(&token_expiration).unwrap(),
        })
        .unwrap()
    }

    fn force_expire(registry: &ChatRegistry, username: &str) {
        let past = (Utc::now() - Duration::minutes(11)).to_rfc3339();
        let db = registry.db.lock().unwrap();
        db.execute(
            "UPDATE chat_links SET token_expiration = ?1 WHERE username = ?2",
            params![past, username],
        )
        .unwrap();
    }

    #[test]
    fn reissue_rotates_token_and_only_latest_validates() {
        let (_dir, registry) = scratch_registry();

        let first = registry.issue_token("alice").unwrap();
        let second = registry.issue_token("alice").unwrap();
        assert_ne!(first, second);

        assert!(matches!(
            registry.validate_and_bind(&first, ChatId(555)),
            Err(Error::InvalidToken)
        ));
        registry.validate_and_bind(&second, ChatId(555)).unwrap();
    }

    #[test]
    fn bind_sets_chat_and_consumes_the_token() {
        let (_dir, registry) = scratch_registry();

        let token = registry.issue_token("alice").unwrap();
        registry.validate_and_bind(&token, ChatId(555)).unwrap();

        assert_eq!(registry.lookup_by_username("alice").unwrap(), ChatId(555));
        assert_eq!(registry.lookup_by_chat(ChatId(555)).unwrap(), "alice");

        let link = raw_link(&registry, "alice");
        assert_ne!(link.registration_token, token);

        // A consumed token can never bind twice.
        assert!(matches!(
            registry.validate_and_bind(&token, ChatId(555)),
            Err(Error::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected_without_mutation() {
        let (_dir, registry) = scratch_registry();

        let token = registry.issue_token("bob").unwrap();
        force_expire(&registry, "bob");

        assert!(matches!(
            registry.validate_and_bind(&token, ChatId(777)),
            Err(Error::TokenExpired)
        ));

        let link = raw_link(&registry, "bob");
        assert_eq!(link.chat_id, None);
        assert_eq!(link.registration_token, token);
        assert!(matches!(
            registry.lookup_by_username("bob"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn token_validity_is_strict_on_expiration() {
        let now = Utc::now();
        let link = ChatLink {
            username: "alice".to_string(),
            chat_id: None,
            registration_token: "t".to_string(),
            token_expiration: now,
        };
        assert!(!link.token_valid_at(now));
        assert!(link.token_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn reissue_after_bind_keeps_chat_but_invalidates_old_token() {
        let (_dir, registry) = scratch_registry();

        let token = registry.issue_token("alice").unwrap();
        registry.validate_and_bind(&token, ChatId(555)).unwrap();

        let reissued = registry.issue_token("alice").unwrap();
        // Previous chat id stays in place until a new bind overwrites it.
        assert_eq!(registry.lookup_by_username("alice").unwrap(), ChatId(555));

        registry.validate_and_bind(&reissued, ChatId(556)).unwrap();
        assert_eq!(registry.lookup_by_username("alice").unwrap(), ChatId(556));
    }

    #[test]
    fn lookups_miss_cleanly() {
        let (_dir, registry) = scratch_registry();

        assert!(matches!(
            registry.lookup_by_username("nobody"),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            registry.lookup_by_chat(ChatId(1)),
            Err(Error::NotFound)
        ));

        // A row that exists but was never bound does not resolve either way.
        registry.issue_token("carol").unwrap();
        assert!(matches!(
            registry.lookup_by_username("carol"),
            Err(Error::NotFound)
        ));
    }
}
