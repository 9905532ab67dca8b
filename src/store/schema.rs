//! PostgreSQL schema
//!
//! Idempotent DDL applied at startup. Status columns store the SMALLINT
//! ids defined on the status enums; the CHECK on `balance` is the last
//! line of defense behind the conditional debit.

use sqlx::PgPool;

use crate::error::ServiceError;

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users_tb (
    id              BIGSERIAL PRIMARY KEY,
    username        TEXT NOT NULL UNIQUE,
    balance         BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
    balance_version BIGINT NOT NULL DEFAULT 0,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS devices_tb (
    id              BIGSERIAL PRIMARY KEY,
    devid           TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL DEFAULT '',
    status          SMALLINT NOT NULL DEFAULT 0,
    location        TEXT,
    merchant_id     BIGINT NOT NULL DEFAULT 0,
    store_id        BIGINT NOT NULL DEFAULT 0,
    last_online_at  TIMESTAMPTZ,
    last_offline_at TIMESTAMPTZ,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS device_logs_tb (
    id             BIGSERIAL PRIMARY KEY,
    device_id      BIGINT NOT NULL,
    devid          TEXT NOT NULL,
    event_type     TEXT NOT NULL,
    payload        JSONB NOT NULL DEFAULT '{}'::jsonb,
    order_no       TEXT,
    process_status SMALLINT NOT NULL DEFAULT 0,
    error_message  TEXT,
    event_time     TIMESTAMPTZ NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_device_logs_device
    ON device_logs_tb (device_id, created_at DESC);

CREATE TABLE IF NOT EXISTS orders_tb (
    id               BIGSERIAL PRIMARY KEY,
    order_no         TEXT NOT NULL UNIQUE,
    user_id          BIGINT NOT NULL,
    device_id        BIGINT NOT NULL,
    merchant_id      BIGINT NOT NULL DEFAULT 0,
    store_id         BIGINT NOT NULL DEFAULT 0,
    wash_type        TEXT NOT NULL,
    duration_minutes INT NOT NULL,
    amount           BIGINT NOT NULL CHECK (amount >= 0),
    status           SMALLINT NOT NULL DEFAULT 10,
    payment_method   TEXT,
    payment_ref      TEXT,
    paid_at          TIMESTAMPTZ,
    start_time       TIMESTAMPTZ,
    end_time         TIMESTAMPTZ,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_orders_user
    ON orders_tb (user_id, created_at DESC);
"#;

/// Apply the schema (idempotent)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), ServiceError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
