//! SQLite-based history store

use crate::core::state::PlanStatus;
use crate::persistence::{ExecutionSummary, PersistenceSink, PlanRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::warn;
use uuid::Uuid;

/// SQLite execution history
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path))
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store under the platform data directory
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("stepflow");
        std::fs::create_dir_all(&db_dir)?;

        let db_path = db_dir.join("history.db");
        let db_path = db_path
            .to_str()
            .context("history database path is not valid UTF-8")?;
        Self::new(db_path).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS plans (
                id TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                mode TEXT NOT NULL,
                total_steps INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                plan_id TEXT NOT NULL,
                query TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                total_steps INTEGER NOT NULL DEFAULT 0,
                completed_steps INTEGER NOT NULL DEFAULT 0,
                failed_steps INTEGER NOT NULL DEFAULT 0,
                skipped_steps INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_executions_plan ON executions(plan_id);
            CREATE INDEX IF NOT EXISTS idx_executions_started ON executions(started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn status_from_str(status: &str) -> PlanStatus {
        match status {
            "Created" => PlanStatus::Created,
            "Running" => PlanStatus::Running,
            "Completed" => PlanStatus::Completed,
            "Failed" => PlanStatus::Failed,
            "Cancelled" => PlanStatus::Cancelled,
            _ => PlanStatus::Created,
        }
    }

    fn summary_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExecutionSummary> {
        Ok(ExecutionSummary {
            execution_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            plan_id: Uuid::parse_str(&row.get::<String, _>("plan_id"))?,
            query: row.get("query"),
            status: Self::status_from_str(&row.get::<String, _>("status")),
            started_at: Self::from_naive(row.get("started_at")),
            completed_at: row
                .get::<Option<NaiveDateTime>, _>("completed_at")
                .map(Self::from_naive),
            total_steps: row.get::<i64, _>("total_steps") as usize,
            completed_steps: row.get::<i64, _>("completed_steps") as usize,
            failed_steps: row.get::<i64, _>("failed_steps") as usize,
            skipped_steps: row.get::<i64, _>("skipped_steps") as usize,
        })
    }

    /// Save a plan record
    pub async fn save_plan(&self, plan: &PlanRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO plans (id, query, mode, total_steps, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(plan.plan_id.to_string())
        .bind(&plan.query)
        .bind(format!("{:?}", plan.mode))
        .bind(plan.total_steps as i64)
        .bind(Self::to_naive(plan.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save plan")?;

        Ok(())
    }

    /// Save an execution summary
    pub async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO executions
            (id, plan_id, query, status, started_at, completed_at,
             total_steps, completed_steps, failed_steps, skipped_steps)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(execution.execution_id.to_string())
        .bind(execution.plan_id.to_string())
        .bind(&execution.query)
        .bind(format!("{:?}", execution.status))
        .bind(Self::to_naive(execution.started_at))
        .bind(execution.completed_at.map(Self::to_naive))
        .bind(execution.total_steps as i64)
        .bind(execution.completed_steps as i64)
        .bind(execution.failed_steps as i64)
        .bind(execution.skipped_steps as i64)
        .execute(&self.pool)
        .await
        .context("Failed to save execution")?;

        Ok(())
    }

    /// Load an execution by ID
    pub async fn load_execution(&self, execution_id: Uuid) -> Result<Option<ExecutionSummary>> {
        let row = sqlx::query(
            r#"
            SELECT id, plan_id, query, status, started_at, completed_at,
                   total_steps, completed_steps, failed_steps, skipped_steps
            FROM executions
            WHERE id = ?1
            "#,
        )
        .bind(execution_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load execution")?;

        row.as_ref().map(Self::summary_from_row).transpose()
    }

    /// List the most recent executions, newest first
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<ExecutionSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, plan_id, query, status, started_at, completed_at,
                   total_steps, completed_steps, failed_steps, skipped_steps
            FROM executions
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list executions")?;

        rows.iter().map(Self::summary_from_row).collect()
    }
}

#[async_trait::async_trait]
impl PersistenceSink for SqliteHistoryStore {
    async fn on_plan_saved(&self, plan: PlanRecord) {
        if let Err(e) = self.save_plan(&plan).await {
            warn!("failed to persist plan {}: {}", plan.plan_id, e);
        }
    }

    async fn on_execution_saved(&self, summary: ExecutionSummary) {
        if let Err(e) = self.save_execution(&summary).await {
            warn!("failed to persist execution {}: {}", summary.execution_id, e);
        }
    }
}
