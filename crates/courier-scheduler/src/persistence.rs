//! SQLite-backed message store.
//! One connection behind a mutex; every trait call is a single statement or
//! a short read, so the lock is never held across an await.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::error::{CourierError, Result};
use courier_core::traits::MessageStore;
use courier_core::types::{Message, MessageId, NewMessage};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const MESSAGE_COLUMNS: &str =
    "id, recipient, content, sent, sent_at, delivery_id, created_at, updated_at";

/// SQLite persistence for outbound messages.
pub struct SqliteMessageStore {
    conn: Mutex<Connection>,
}

impl SqliteMessageStore {
    /// Open or create the message database. `:memory:` is accepted.
    pub fn open(path: &Path) -> Result<Self> {
        if path != Path::new(":memory:") {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(db_err("DB open"))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Fresh in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    fn migrate(&self) -> Result<()> {
        self.lock()?
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient TEXT NOT NULL,
                content TEXT NOT NULL,
                sent INTEGER NOT NULL DEFAULT 0,
                sent_at TEXT,
                delivery_id TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_unsent ON messages (sent);
         ",
            )
            .map_err(db_err("Migration"))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CourierError::Database("connection lock poisoned".into()))
    }

    fn get(&self, conn: &Connection, id: MessageId) -> Result<Option<Message>> {
        conn.query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            params![id],
            row_to_message,
        )
        .optional()
        .map_err(db_err("Get message"))
    }

    fn query_messages(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Message>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map(params, row_to_message)
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read row"))
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn fetch_unsent(&self, limit: usize) -> Result<Vec<Message>> {
        self.query_messages(
            &format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE sent = 0
                 ORDER BY id ASC LIMIT ?1"
            ),
            params![limit as i64],
        )
    }

    async fn mark_sent(&self, id: MessageId, delivery_id: &str) -> Result<()> {
        if delivery_id.is_empty() {
            return Err(CourierError::Validation(
                "delivery id must not be empty".into(),
            ));
        }
        let now = Utc::now().to_rfc3339();
        let changed = self
            .lock()?
            .execute(
                "UPDATE messages SET sent = 1, delivery_id = ?2, sent_at = ?3, updated_at = ?3
                 WHERE id = ?1 AND sent = 0",
                params![id, delivery_id, now],
            )
            .map_err(db_err("Mark sent"))?;
        if changed == 0 {
            return Err(CourierError::NotFound(format!("unsent message {id}")));
        }
        Ok(())
    }

    async fn list_sent(&self) -> Result<Vec<Message>> {
        self.query_messages(
            &format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE sent = 1
                 ORDER BY sent_at DESC, id DESC"
            ),
            [],
        )
    }

    async fn create(&self, message: NewMessage) -> Result<Message> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (recipient, content, sent, delivery_id, created_at, updated_at)
             VALUES (?1, ?2, 0, '', ?3, ?3)",
            params![message.to, message.content, now],
        )
        .map_err(db_err("Create message"))?;
        let id = conn.last_insert_rowid();
        self.get(&conn, id)?
            .ok_or_else(|| CourierError::Database(format!("message {id} vanished after insert")))
    }

    async fn count_unsent(&self) -> Result<usize> {
        let sql = "SELECT COUNT(*) FROM messages WHERE sent = 0";
        let count: i64 = self
            .lock()?
            .query_row(sql, [], |r| r.get(0))
            .map_err(db_err("Count unsent"))?;
        Ok(count as usize)
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let sent_at: Option<String> = row.get(4)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Message {
        id: row.get(0)?,
        to: row.get(1)?,
        content: row.get(2)?,
        sent: row.get::<_, i64>(3)? != 0,
        sent_at: sent_at.as_deref().map(parse_ts).transpose()?,
        delivery_id: row.get(5)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn db_err(context: &'static str) -> impl Fn(rusqlite::Error) -> CourierError {
    move |e| CourierError::Database(format!("{context}: {e}"))
}
