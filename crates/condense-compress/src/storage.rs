use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use condense_core::{
    ContextSummary, ConversationContext, Message, Role, StoreSnapshot, TimeRange,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::store::ContextStore;

const MESSAGE_COLUMNS: &str =
    "id, user_id, thread_id, session_id, role, content, created_at, compressed";
const SUMMARY_COLUMNS: &str = "id, user_id, thread_id, range_start, range_end, summary, \
     key_topics, important_decisions, relevance_score, message_count, compressed_tokens, \
     source_tokens, created_at";
const CONTEXT_COLUMNS: &str = "id, user_id, session_id, context_type, payload, \
     relevance_score, priority, created_at, expires_at";

/// SQLite-backed [`ContextStore`]
///
/// Trait reads and writes run on the blocking pool so concurrent callers
/// never stall the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::InvalidData(format!("{}: {e}", parent.display())))?;
        }
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                session_id TEXT,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                archived INTEGER NOT NULL DEFAULT 0,
                compressed INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_messages_thread
                ON messages(user_id, thread_id, created_at);

            CREATE TABLE IF NOT EXISTS context_summaries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                range_start TEXT NOT NULL,
                range_end TEXT NOT NULL,
                summary TEXT NOT NULL,
                key_topics TEXT NOT NULL,
                important_decisions TEXT NOT NULL,
                relevance_score REAL NOT NULL,
                message_count INTEGER NOT NULL,
                compressed_tokens INTEGER NOT NULL,
                source_tokens INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_summaries_thread
                ON context_summaries(user_id, thread_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_summaries_created
                ON context_summaries(created_at);

            CREATE TABLE IF NOT EXISTS conversation_contexts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                session_id TEXT,
                context_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                relevance_score REAL NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                expires_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_contexts_user
                ON conversation_contexts(user_id, relevance_score);

            CREATE TABLE IF NOT EXISTS store_snapshots (
                user_id TEXT PRIMARY KEY,
                store_name TEXT NOT NULL,
                domain TEXT,
                metrics TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    /// Run `f` against the connection on tokio's blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&*lock(&conn)?)).await?
    }

    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO messages ({MESSAGE_COLUMNS}, archived) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)"
            ),
            params![
                message.id,
                message.user_id,
                message.thread_id,
                message.session_id,
                message.role.as_str(),
                message.content,
                timestamp(message.timestamp),
                message.compressed,
            ],
        )?;
        Ok(())
    }

    /// Hide a message from every read
    pub fn archive_message(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("UPDATE messages SET archived = 1 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn insert_context(&self, context: &ConversationContext) -> Result<()> {
        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO conversation_contexts ({CONTEXT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                context.id,
                context.user_id,
                context.session_id,
                context.context_type,
                serde_json::to_string(&context.payload)?,
                context.relevance_score,
                context.priority,
                timestamp(context.created_at),
                context.expires_at.map(timestamp),
            ],
        )?;
        Ok(())
    }

    pub fn upsert_snapshot(&self, snapshot: &StoreSnapshot) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO store_snapshots (user_id, store_name, domain, metrics) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.user_id,
                snapshot.store_name,
                snapshot.domain,
                serde_json::to_string(&snapshot.metrics)?,
            ],
        )?;
        Ok(())
    }

    pub fn count_summaries(&self, user_id: &str, thread_id: &str) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM context_summaries WHERE user_id = ?1 AND thread_id = ?2",
            params![user_id, thread_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
        let role: String = row.get(4)?;
        Ok(Message {
            id: row.get(0)?,
            user_id: row.get(1)?,
            thread_id: row.get(2)?,
            session_id: row.get(3)?,
            role: role
                .parse::<Role>()
                .map_err(|e| conversion_error(4, std::io::Error::other(e)))?,
            content: row.get(5)?,
            timestamp: parse_timestamp(row, 6)?,
            relevance_score: None,
            compressed: row.get(7)?,
        })
    }

    fn row_to_summary(row: &Row) -> rusqlite::Result<ContextSummary> {
        Ok(ContextSummary {
            id: row.get(0)?,
            user_id: row.get(1)?,
            thread_id: row.get(2)?,
            range: TimeRange::new(parse_timestamp(row, 3)?, parse_timestamp(row, 4)?),
            summary: row.get(5)?,
            key_topics: parse_json(row, 6)?,
            important_decisions: parse_json(row, 7)?,
            relevance_score: row.get(8)?,
            message_count: row.get::<_, i64>(9)?.max(0) as usize,
            compressed_tokens: row.get::<_, i64>(10)?.max(0) as usize,
            source_tokens: row.get::<_, i64>(11)?.max(0) as usize,
            created_at: parse_timestamp(row, 12)?,
        })
    }

    fn row_to_context(row: &Row) -> rusqlite::Result<ConversationContext> {
        let expires_at: Option<String> = row.get(8)?;
        Ok(ConversationContext {
            id: row.get(0)?,
            user_id: row.get(1)?,
            session_id: row.get(2)?,
            context_type: row.get(3)?,
            payload: parse_json(row, 4)?,
            relevance_score: row.get(5)?,
            priority: row.get(6)?,
            created_at: parse_timestamp(row, 7)?,
            expires_at: expires_at
                .map(|s| parse_rfc3339(&s).map_err(|e| conversion_error(8, e)))
                .transpose()?,
        })
    }
}

#[async_trait]
impl ContextStore for SqliteStore {
    async fn recent_messages(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let (user_id, thread_id) = (user_id.to_string(), thread_id.to_string());
        let session_id = session_id.map(str::to_string);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE user_id = ?1 AND thread_id = ?2 AND archived = 0
                   AND (?3 IS NULL OR session_id = ?3)
                 ORDER BY created_at DESC
                 LIMIT ?4"
            ))?;
            let rows = stmt.query_map(
                params![user_id, thread_id, session_id, sql_limit(limit)],
                Self::row_to_message,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn messages_between(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<Message>> {
        let (user_id, thread_id) = (user_id.to_string(), thread_id.to_string());
        let session_id = session_id.map(str::to_string);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE user_id = ?1 AND thread_id = ?2 AND archived = 0
                   AND (?3 IS NULL OR session_id = ?3)
                   AND created_at >= ?4 AND created_at < ?5
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(
                params![
                    user_id,
                    thread_id,
                    session_id,
                    timestamp(range.start),
                    timestamp(range.end)
                ],
                Self::row_to_message,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn summaries(
        &self,
        user_id: &str,
        thread_id: &str,
        min_score: f64,
        limit: usize,
    ) -> Result<Vec<ContextSummary>> {
        let (user_id, thread_id) = (user_id.to_string(), thread_id.to_string());
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM context_summaries
                 WHERE user_id = ?1 AND thread_id = ?2 AND relevance_score >= ?3
                 ORDER BY created_at DESC
                 LIMIT ?4"
            ))?;
            let rows = stmt.query_map(
                params![user_id, thread_id, min_score, sql_limit(limit)],
                Self::row_to_summary,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn summary_ranges(
        &self,
        user_id: &str,
        thread_id: &str,
        window: TimeRange,
    ) -> Result<Vec<TimeRange>> {
        let (user_id, thread_id) = (user_id.to_string(), thread_id.to_string());
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT range_start, range_end FROM context_summaries
                 WHERE user_id = ?1 AND thread_id = ?2
                   AND range_start < ?4 AND range_end > ?3
                 ORDER BY range_start ASC",
            )?;
            let rows = stmt.query_map(
                params![
                    user_id,
                    thread_id,
                    timestamp(window.start),
                    timestamp(window.end)
                ],
                |row| {
                    Ok(TimeRange::new(
                        parse_timestamp(row, 0)?,
                        parse_timestamp(row, 1)?,
                    ))
                },
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn relevant_contexts(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        min_score: f64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ConversationContext>> {
        let user_id = user_id.to_string();
        let session_id = session_id.map(str::to_string);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTEXT_COLUMNS} FROM conversation_contexts
                 WHERE user_id = ?1
                   AND (?2 IS NULL OR session_id IS NULL OR session_id = ?2)
                   AND relevance_score >= ?3
                   AND (expires_at IS NULL OR expires_at > ?4)
                 ORDER BY relevance_score DESC, priority DESC, created_at DESC
                 LIMIT ?5"
            ))?;
            let rows = stmt.query_map(
                params![
                    user_id,
                    session_id,
                    min_score,
                    timestamp(now),
                    sql_limit(limit)
                ],
                Self::row_to_context,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn store_snapshot(&self, user_id: &str) -> Result<Option<StoreSnapshot>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let snapshot = conn
                .query_row(
                    "SELECT user_id, store_name, domain, metrics FROM store_snapshots WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok(StoreSnapshot {
                            user_id: row.get(0)?,
                            store_name: row.get(1)?,
                            domain: row.get(2)?,
                            metrics: parse_json(row, 3)?,
                        })
                    },
                )
                .optional()?;
            Ok(snapshot.map(StoreSnapshot::retain_critical))
        })
        .await
    }

    async fn insert_summary(&self, summary: &ContextSummary) -> Result<()> {
        let summary = summary.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO context_summaries ({SUMMARY_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    summary.id,
                    summary.user_id,
                    summary.thread_id,
                    timestamp(summary.range.start),
                    timestamp(summary.range.end),
                    summary.summary,
                    serde_json::to_string(&summary.key_topics)?,
                    serde_json::to_string(&summary.important_decisions)?,
                    summary.relevance_score,
                    summary.message_count as i64,
                    summary.compressed_tokens as i64,
                    summary.source_tokens as i64,
                    timestamp(summary.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn summaries_since(&self, since: DateTime<Utc>) -> Result<Vec<ContextSummary>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM context_summaries
                 WHERE created_at >= ?1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![timestamp(since)], Self::row_to_summary)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| Error::InvalidData("connection lock poisoned".to_string()))
}

/// Fixed-width UTC text so lexical order matches time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_rfc3339(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|at| at.with_timezone(&Utc))
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_rfc3339(&raw).map_err(|e| conversion_error(idx, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
