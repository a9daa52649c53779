use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Shared SQLite connection pool, WAL journal mode for read/write concurrency. Schema is
/// created on startup; there are no external migration files.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to connect to sqlite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                initial_cash TEXT NOT NULL,
                current_cash TEXT NOT NULL,
                template_id TEXT NOT NULL,
                provider_id TEXT NOT NULL,
                model_name TEXT NOT NULL,
                status TEXT NOT NULL,
                schedule_type TEXT NOT NULL,
                created_at DATETIME NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create agents table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                agent_id TEXT NOT NULL,
                stock_code TEXT NOT NULL,
                shares INTEGER NOT NULL,
                avg_cost TEXT NOT NULL,
                buy_date DATE NOT NULL,
                PRIMARY KEY (agent_id, stock_code)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create positions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                order_id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                stock_code TEXT,
                side TEXT NOT NULL,
                quantity INTEGER,
                price TEXT,
                status TEXT NOT NULL,
                reject_reason TEXT,
                reason TEXT NOT NULL,
                llm_request_log_id INTEGER,
                created_at DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_agent ON orders (agent_id, created_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create orders table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                tx_id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                stock_code TEXT,
                side TEXT NOT NULL,
                quantity INTEGER,
                price TEXT,
                commission TEXT NOT NULL,
                stamp_tax TEXT NOT NULL,
                transfer_fee TEXT NOT NULL,
                executed_at DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_agent ON transactions (agent_id, executed_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create transactions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS llm_providers (
                provider_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                protocol TEXT NOT NULL,
                api_url TEXT NOT NULL,
                api_key TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create llm_providers table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prompt_templates (
                template_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                strict BOOLEAN NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create prompt_templates table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_quotes (
                stock_code TEXT NOT NULL,
                trade_date DATE NOT NULL,
                open TEXT NOT NULL,
                high TEXT NOT NULL,
                low TEXT NOT NULL,
                close TEXT NOT NULL,
                prev_close TEXT NOT NULL,
                volume INTEGER NOT NULL,
                amount TEXT NOT NULL,
                stock_name TEXT,
                PRIMARY KEY (stock_code, trade_date)
            );
            CREATE INDEX IF NOT EXISTS idx_quotes_code_date ON stock_quotes (stock_code, trade_date DESC);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create stock_quotes table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_data_snapshots (
                data_type TEXT NOT NULL,
                data_date DATE NOT NULL,
                data_content TEXT NOT NULL,
                PRIMARY KEY (data_type, data_date)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create market_data_snapshots table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS llm_request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_id TEXT NOT NULL,
                model_name TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                request_content TEXT NOT NULL,
                response_content TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT,
                tokens_in INTEGER NOT NULL,
                tokens_out INTEGER NOT NULL,
                created_at DATETIME NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create llm_request_logs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decision_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id TEXT NOT NULL,
                status TEXT NOT NULL,
                parsed_decision TEXT,
                error_message TEXT,
                created_at DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_decision_logs_agent ON decision_logs (agent_id, created_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create decision_logs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_tasks (
                task_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                task_type TEXT NOT NULL,
                agent_ids TEXT NOT NULL,
                config TEXT NOT NULL,
                schedule TEXT NOT NULL,
                status TEXT NOT NULL,
                trading_day_only BOOLEAN NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create system_tasks table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id TEXT NOT NULL,
                started_at DATETIME NOT NULL,
                completed_at DATETIME,
                status TEXT NOT NULL,
                skip_reason TEXT,
                error_message TEXT,
                agent_results TEXT NOT NULL DEFAULT '[]'
            );
            CREATE INDEX IF NOT EXISTS idx_task_logs_task ON task_logs (task_id, started_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create task_logs table")?;

        info!("Database schema initialized.");
        Ok(())
    }
}
