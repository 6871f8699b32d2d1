//! PostgreSQL implementation of [`DurableEventStore`].
//!
//! # Schema
//! Created on connect if missing:
//! - `cross_chain_events`: one row per `event_id`, `value` as `NUMERIC(78,0)`
//!   so `min_value` compares numerically, `seq` for insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{normalize_lookup_address, EventType, NormalizedEvent, Token};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::{EventFilter, SortOrder, StoreError};
use crate::ports::{DurableEventStore, DurableInsert};

const SELECT_COLUMNS: &str = "SELECT event_id, chain, network, tx_hash, block_number, slot, \
     event_timestamp, from_address, to_address, value::text AS value, token_address, \
     token_symbol, token_decimals, event_type, raw_payload FROM cross_chain_events";

/// Pool options for the durable store.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    /// Maximum pooled connections (default: 10)
    pub max_connections: u32,
    /// Idle connections kept open (default: 1)
    pub min_connections: u32,
    /// Connection acquire timeout (default: 5s)
    pub acquire_timeout: Duration,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Durable event table on PostgreSQL. Cheap to clone.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Connect with default pool options and create the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Self::connect_with_options(database_url, PostgresOptions::default()).await
    }

    pub async fn connect_with_options(
        database_url: &str,
        opts: PostgresOptions,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(opts.max_connections)
            .min_connections(opts.min_connections)
            .acquire_timeout(opts.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Durable(format!("postgres connect: {e}")))?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("Durable event store connected and schema initialized");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cross_chain_events (
                event_id        TEXT          PRIMARY KEY,
                seq             BIGSERIAL,
                chain           TEXT          NOT NULL,
                network         TEXT          NOT NULL DEFAULT '',
                tx_hash         TEXT          NOT NULL,
                block_number    BIGINT,
                slot            BIGINT,
                event_timestamp TEXT          NOT NULL DEFAULT '',
                event_time      TIMESTAMPTZ,
                from_address    TEXT          NOT NULL,
                to_address      TEXT          NOT NULL,
                value           NUMERIC(78,0) NOT NULL,
                token_address   TEXT,
                token_symbol    TEXT,
                token_decimals  SMALLINT,
                event_type      TEXT          NOT NULL,
                raw_payload     JSONB,
                inserted_at     TIMESTAMPTZ   NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        for stmt in [
            "CREATE INDEX IF NOT EXISTS idx_cross_chain_events_from
             ON cross_chain_events(from_address, seq DESC)",
            "CREATE INDEX IF NOT EXISTS idx_cross_chain_events_to
             ON cross_chain_events(to_address, seq DESC)",
            "CREATE INDEX IF NOT EXISTS idx_cross_chain_events_seq
             ON cross_chain_events(seq DESC)",
        ] {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        debug!("cross_chain_events schema initialized");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Build the page query for `filter`, optionally restricted to `address`.
pub fn build_select<'a>(
    address: Option<&'a str>,
    filter: &'a EventFilter,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_COLUMNS);
    qb.push(" WHERE TRUE");

    if let Some(address) = address {
        qb.push(" AND (from_address = ")
            .push_bind(address)
            .push(" OR to_address = ")
            .push_bind(address)
            .push(")");
    }
    if let Some(chain) = &filter.chain {
        qb.push(" AND chain = ").push_bind(chain.as_str());
    }
    if let Some(symbol) = &filter.token_symbol {
        qb.push(" AND token_symbol = ").push_bind(symbol.as_str());
    }
    if let Some(from) = &filter.from {
        qb.push(" AND from_address = ")
            .push_bind(normalize_lookup_address(filter.chain.as_ref(), from));
    }
    if let Some(to) = &filter.to {
        qb.push(" AND to_address = ")
            .push_bind(normalize_lookup_address(filter.chain.as_ref(), to));
    }
    if let Some(threshold) = &filter.min_value {
        qb.push(" AND value >= CAST(")
            .push_bind(threshold.to_string())
            .push(" AS NUMERIC)");
    }
    if let Some(start) = filter.start_time {
        qb.push(" AND event_time >= ").push_bind(start);
    }
    if let Some(end) = filter.end_time {
        qb.push(" AND event_time <= ").push_bind(end);
    }

    qb.push(match filter.order {
        SortOrder::Descending => " ORDER BY seq DESC",
        SortOrder::Ascending => " ORDER BY seq ASC",
    });
    qb.push(" LIMIT ")
        .push_bind(to_i64(filter.effective_limit()))
        .push(" OFFSET ")
        .push_bind(to_i64(filter.offset));
    qb
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn optional_i64(n: Option<u64>) -> Option<i64> {
    n.and_then(|v| i64::try_from(v).ok())
}

fn decode_row(row: &PgRow) -> Result<NormalizedEvent, sqlx::Error> {
    let token_symbol: Option<String> = row.try_get("token_symbol")?;
    let token = match token_symbol {
        Some(symbol) => Some(Token {
            address: row
                .try_get::<Option<String>, _>("token_address")?
                .unwrap_or_default(),
            symbol,
            decimals: row
                .try_get::<Option<i16>, _>("token_decimals")?
                .and_then(|d| u8::try_from(d).ok())
                .unwrap_or_default(),
        }),
        None => None,
    };

    let event_type: String = row.try_get("event_type")?;
    Ok(NormalizedEvent {
        event_id: row.try_get("event_id")?,
        chain: row.try_get("chain")?,
        network: row.try_get("network")?,
        tx_hash: row.try_get("tx_hash")?,
        block_number: row
            .try_get::<Option<i64>, _>("block_number")?
            .and_then(|n| u64::try_from(n).ok()),
        slot: row
            .try_get::<Option<i64>, _>("slot")?
            .and_then(|n| u64::try_from(n).ok()),
        timestamp: row.try_get("event_timestamp")?,
        from: row.try_get("from_address")?,
        to: row.try_get("to_address")?,
        value: row.try_get("value")?,
        token,
        event_type: EventType::from(event_type),
        raw_payload: row.try_get("raw_payload")?,
    })
}

#[async_trait]
impl DurableEventStore for PostgresEventStore {
    async fn insert(&self, event: &NormalizedEvent) -> Result<DurableInsert, StoreError> {
        let event_time: Option<DateTime<Utc>> = event.parsed_timestamp();
        let result = sqlx::query(
            "INSERT INTO cross_chain_events
                (event_id, chain, network, tx_hash, block_number, slot, event_timestamp,
                 event_time, from_address, to_address, value, token_address, token_symbol,
                 token_decimals, event_type, raw_payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, CAST($11 AS NUMERIC), $12, $13,
                     $14, $15, $16)
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(&event.event_id)
        .bind(&event.chain)
        .bind(&event.network)
        .bind(&event.tx_hash)
        .bind(optional_i64(event.block_number))
        .bind(optional_i64(event.slot))
        .bind(&event.timestamp)
        .bind(event_time)
        .bind(&event.from)
        .bind(&event.to)
        .bind(&event.value)
        .bind(event.token.as_ref().map(|t| t.address.clone()))
        .bind(event.token.as_ref().map(|t| t.symbol.clone()))
        .bind(event.token.as_ref().map(|t| i16::from(t.decimals)))
        .bind(event.event_type.as_str())
        .bind(event.raw_payload.clone())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(DurableInsert::AlreadyPresent)
        } else {
            Ok(DurableInsert::Inserted)
        }
    }

    async fn query(
        &self,
        address: Option<&str>,
        filter: &EventFilter,
    ) -> Result<Vec<NormalizedEvent>, StoreError> {
        let mut qb = build_select(address, filter);
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
