//! Intent persistence
//!
//! An intent row is written before the first leg and updated at each step,
//! so a crash or a partial failure leaves a record an operator can act on.

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::error;

pub mod memory;
pub mod models;

pub use memory::MemoryIntentStore;
pub use models::*;

use crate::types::IntentStatus;

/// Storage for bridge intents
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Insert a new intent in `validated` status, returning its id
    async fn create_intent(&self, intent: &NewIntent) -> Result<i64>;

    async fn update_status(&self, id: i64, status: IntentStatus) -> Result<()>;

    /// Record the confirmed source leg and move to `source_confirmed`
    async fn record_source_receipt(&self, id: i64, tx_id: &str) -> Result<()>;

    /// Record the confirmed destination leg and move to `completed`
    async fn record_dest_receipt(&self, id: i64, tx_id: &str) -> Result<()>;

    /// Record a source transaction that was submitted but not confirmed
    async fn record_source_submitted(&self, id: i64, tx_id: &str) -> Result<()>;

    /// Record a destination transaction that was submitted but not confirmed
    async fn record_dest_submitted(&self, id: i64, tx_id: &str) -> Result<()>;

    /// Record the full balance of the coin a Sui burn consumed
    async fn record_burned_amount(&self, id: i64, amount: u64) -> Result<()>;

    /// Move to a terminal failure status with the error kind and diagnostic
    async fn record_failure(
        &self,
        id: i64,
        status: IntentStatus,
        error_kind: &str,
        error_detail: &str,
    ) -> Result<()>;

    async fn get_intent(&self, id: i64) -> Result<Option<BridgeIntent>>;

    /// Intents in any of `statuses`, newest first
    async fn list_by_status(
        &self,
        statuses: &[IntentStatus],
        limit: i64,
    ) -> Result<Vec<BridgeIntent>>;
}

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .wrap_err("Failed to connect to database")
}

/// Run pending migrations (uses the migration files in migrations/)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .wrap_err("Failed to run database migrations")?;
    Ok(())
}

const INTENT_COLUMNS: &str = "id, direction, amount::TEXT as amount, \
     converted_amount::TEXT as converted_amount, eth_account, sui_account, status, \
     source_tx, dest_tx, burned_amount::TEXT as burned_amount, error_kind, error_detail, \
     created_at, updated_at";

/// Postgres-backed intent store
#[derive(Clone)]
pub struct PgIntentStore {
    pool: PgPool,
}

impl PgIntentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntentStore for PgIntentStore {
    async fn create_intent(&self, intent: &NewIntent) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO bridge_intents (direction, amount, converted_amount, eth_account, sui_account, status)
            VALUES ($1, $2::NUMERIC, $3::NUMERIC, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&intent.direction)
        .bind(&intent.amount)
        .bind(&intent.converted_amount)
        .bind(&intent.eth_account)
        .bind(&intent.sui_account)
        .bind(IntentStatus::Validated)
        .fetch_one(&self.pool)
        .await
        .wrap_err("Failed to insert bridge intent")?;

        Ok(row.get("id"))
    }

    async fn update_status(&self, id: i64, status: IntentStatus) -> Result<()> {
        sqlx::query("UPDATE bridge_intents SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .wrap_err("Failed to update intent status")?;
        Ok(())
    }

    async fn record_source_receipt(&self, id: i64, tx_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE bridge_intents SET source_tx = $2, status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(tx_id)
        .bind(IntentStatus::SourceConfirmed)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to record source receipt")?;
        Ok(())
    }

    async fn record_dest_receipt(&self, id: i64, tx_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE bridge_intents SET dest_tx = $2, status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(tx_id)
        .bind(IntentStatus::Completed)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to record destination receipt")?;
        Ok(())
    }

    async fn record_source_submitted(&self, id: i64, tx_id: &str) -> Result<()> {
        sqlx::query("UPDATE bridge_intents SET source_tx = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(tx_id)
            .execute(&self.pool)
            .await
            .wrap_err("Failed to record submitted source tx")?;
        Ok(())
    }

    async fn record_dest_submitted(&self, id: i64, tx_id: &str) -> Result<()> {
        sqlx::query("UPDATE bridge_intents SET dest_tx = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(tx_id)
            .execute(&self.pool)
            .await
            .wrap_err("Failed to record submitted destination tx")?;
        Ok(())
    }

    async fn record_burned_amount(&self, id: i64, amount: u64) -> Result<()> {
        sqlx::query(
            "UPDATE bridge_intents SET burned_amount = $2::NUMERIC, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(amount.to_string())
        .execute(&self.pool)
        .await
        .wrap_err("Failed to record burned amount")?;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: i64,
        status: IntentStatus,
        error_kind: &str,
        error_detail: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bridge_intents
            SET status = $2, error_kind = $3, error_detail = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_kind)
        .bind(error_detail)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to record intent failure")?;
        Ok(())
    }

    async fn get_intent(&self, id: i64) -> Result<Option<BridgeIntent>> {
        let query = format!("SELECT {} FROM bridge_intents WHERE id = $1", INTENT_COLUMNS);
        let row = sqlx::query_as::<_, BridgeIntent>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .wrap_err("Failed to get bridge intent")?;
        Ok(row)
    }

    async fn list_by_status(
        &self,
        statuses: &[IntentStatus],
        limit: i64,
    ) -> Result<Vec<BridgeIntent>> {
        let query = format!(
            "SELECT {} FROM bridge_intents WHERE status = ANY($1) ORDER BY created_at DESC, id DESC LIMIT $2",
            INTENT_COLUMNS
        );
        let names: Vec<&str> = statuses.iter().map(IntentStatus::as_str).collect();
        let rows = sqlx::query_as::<_, BridgeIntent>(&query)
            .bind(&names[..])
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("SQL error listing {:?} intents: {:?}", names, e);
                e
            })
            .wrap_err("Failed to list bridge intents")?;
        Ok(rows)
    }
}
