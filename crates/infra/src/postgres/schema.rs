use anyhow::Context;
use sqlx::PgPool;

/// Tables used by the Postgres adapters. Idempotent.
///
/// Product-level SKUs store the nil UUID as `variation_id` so the SKU can be
/// part of the primary key.
const SCHEMA: &[(&str, &str)] = &[
    (
        "fulfillment_orders",
        r#"
        CREATE TABLE IF NOT EXISTS fulfillment_orders (
            order_id           UUID PRIMARY KEY,
            status             TEXT NOT NULL,
            assigned_seller_id UUID NULL,
            assignment_expiry  TIMESTAMPTZ NULL,
            placed_at          TIMESTAMPTZ NULL,
            version            BIGINT NOT NULL,
            state              JSONB NOT NULL,
            updated_at         TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ),
    (
        "fulfillment_orders_expiry_idx",
        r#"
        CREATE INDEX IF NOT EXISTS fulfillment_orders_expiry_idx
            ON fulfillment_orders (assignment_expiry)
            WHERE status = 'assigned'
        "#,
    ),
    (
        "fulfillment_orders_stranded_idx",
        r#"
        CREATE INDEX IF NOT EXISTS fulfillment_orders_stranded_idx
            ON fulfillment_orders (updated_at)
            WHERE status IN ('rejected', 'timeout')
        "#,
    ),
    (
        "fulfillment_orders_seller_idx",
        r#"
        CREATE INDEX IF NOT EXISTS fulfillment_orders_seller_idx
            ON fulfillment_orders (assigned_seller_id, status)
        "#,
    ),
    (
        "sellers",
        r#"
        CREATE TABLE IF NOT EXISTS sellers (
            seller_id     UUID PRIMARY KEY,
            business_name TEXT NOT NULL,
            active        BOOLEAN NOT NULL,
            auto_accept   BOOLEAN NOT NULL DEFAULT FALSE,
            latitude      DOUBLE PRECISION NULL,
            longitude     DOUBLE PRECISION NULL
        )
        "#,
    ),
    (
        "seller_inventory",
        r#"
        CREATE TABLE IF NOT EXISTS seller_inventory (
            seller_id    UUID NOT NULL,
            product_id   UUID NOT NULL,
            variation_id UUID NOT NULL,
            on_hand      BIGINT NOT NULL,
            reserved     BIGINT NOT NULL DEFAULT 0,
            PRIMARY KEY (seller_id, product_id, variation_id),
            CHECK (reserved >= 0 AND reserved <= on_hand)
        )
        "#,
    ),
    (
        "central_stock",
        r#"
        CREATE TABLE IF NOT EXISTS central_stock (
            product_id   UUID NOT NULL,
            variation_id UUID NOT NULL,
            quantity     BIGINT NOT NULL CHECK (quantity >= 0),
            manage_stock BOOLEAN NOT NULL,
            status       TEXT NOT NULL,
            PRIMARY KEY (product_id, variation_id)
        )
        "#,
    ),
];

/// Create the routing tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    for (name, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("failed to create {name}"))?;
    }
    Ok(())
}
