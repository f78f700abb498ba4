use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::runtime::Handle;
use tracing::{info, instrument};
use uuid::Uuid;

use forgeroute_core::{ProductId, SellerId, VariationId};
use forgeroute_inventory::{
    CentralStockRecord, InventoryLedger, InventoryRecord, LedgerError, NoopStockAlertSink, OutOfStock, SkuKey,
    StockAlertSink, StockLine, StockStatus, required_by_sku,
};

use super::{describe_sqlx_error, to_u32};

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    LedgerError::storage(describe_sqlx_error(operation, &err))
}

/// Product-level SKUs are keyed by the nil UUID.
fn variation_key(variation: Option<VariationId>) -> Uuid {
    variation.map(|v| *v.as_uuid()).unwrap_or_else(Uuid::nil)
}

fn sku_from_columns(product: Uuid, variation: Uuid) -> SkuKey {
    let variation = (!variation.is_nil()).then(|| VariationId::from_uuid(variation));
    SkuKey::new(ProductId::from_uuid(product), variation)
}

fn status_str(status: StockStatus) -> &'static str {
    match status {
        StockStatus::InStock => "in_stock",
        StockStatus::OutOfStock => "out_of_stock",
    }
}

fn parse_status(raw: &str) -> StockStatus {
    match raw {
        "out_of_stock" => StockStatus::OutOfStock,
        _ => StockStatus::InStock,
    }
}

/// Seller and central stock in `seller_inventory` / `central_stock`.
///
/// `reserve` locks every requested row with `SELECT ... FOR UPDATE` in SKU
/// order inside one transaction, so concurrent reservations against the same
/// seller serialize and never push `reserved` above `on_hand`. The table's
/// CHECK constraint backs the same invariant.
#[derive(Clone)]
pub struct PostgresInventoryLedger {
    pool: PgPool,
    runtime: Handle,
    alerts: Arc<dyn StockAlertSink>,
}

impl core::fmt::Debug for PostgresInventoryLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresInventoryLedger").finish_non_exhaustive()
    }
}

impl PostgresInventoryLedger {
    pub fn new(pool: PgPool, runtime: Handle) -> Self {
        Self {
            pool,
            runtime,
            alerts: Arc::new(NoopStockAlertSink),
        }
    }

    pub fn with_alert_sink(mut self, alerts: Arc<dyn StockAlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    #[instrument(skip(self), fields(seller_id = %seller), err)]
    pub async fn available_for(
        &self,
        seller: SellerId,
        product: ProductId,
        variation: Option<VariationId>,
    ) -> Result<u32, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT on_hand, reserved
            FROM seller_inventory
            WHERE seller_id = $1 AND product_id = $2 AND variation_id = $3
            "#,
        )
        .bind(seller.as_uuid())
        .bind(product.as_uuid())
        .bind(variation_key(variation))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("available", e))?;

        match row {
            Some(row) => {
                let on_hand: i64 = row.try_get("on_hand").map_err(|e| map_sqlx_error("available", e))?;
                let reserved: i64 = row.try_get("reserved").map_err(|e| map_sqlx_error("available", e))?;
                Ok(to_u32(on_hand - reserved))
            }
            None => Ok(0),
        }
    }

    /// Check then reserve every SKU under row locks; nothing is written if
    /// any SKU falls short.
    #[instrument(skip(self, lines), fields(seller_id = %seller, lines = lines.len()), err)]
    pub async fn reserve_lines(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        let required = required_by_sku(lines);
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("reserve", e))?;

        for (sku, quantity) in &required {
            let available = lock_available(&mut tx, seller, *sku).await?;
            if available < *quantity {
                tx.rollback().await.map_err(|e| map_sqlx_error("reserve", e))?;
                return Err(LedgerError::InsufficientStock {
                    sku: *sku,
                    requested: *quantity,
                    available,
                });
            }
        }

        for (sku, quantity) in &required {
            sqlx::query(
                r#"
                UPDATE seller_inventory
                SET reserved = reserved + $4
                WHERE seller_id = $1 AND product_id = $2 AND variation_id = $3
                "#,
            )
            .bind(seller.as_uuid())
            .bind(sku.product_id.as_uuid())
            .bind(variation_key(sku.variation_id))
            .bind(i64::from(*quantity))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reserve", e))?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("reserve", e))
    }

    #[instrument(skip(self, lines), fields(seller_id = %seller, lines = lines.len()), err)]
    pub async fn release_lines(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("release", e))?;
        for (sku, quantity) in required_by_sku(lines) {
            sqlx::query(
                r#"
                UPDATE seller_inventory
                SET reserved = GREATEST(reserved - $4, 0)
                WHERE seller_id = $1 AND product_id = $2 AND variation_id = $3
                "#,
            )
            .bind(seller.as_uuid())
            .bind(sku.product_id.as_uuid())
            .bind(variation_key(sku.variation_id))
            .bind(i64::from(quantity))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("release", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("release", e))
    }

    /// Deduct central stock line by line; variation lines also draw down the
    /// product-level row. Alerts go to the sink after the commit.
    #[instrument(skip(self, lines), fields(lines = lines.len()), err)]
    pub async fn deduct_central(
        &self,
        lines: &[StockLine],
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<OutOfStock>, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error("commit_deduction", e))?;
        let mut alerts = Vec::new();

        for line in lines {
            let mut exhausted = deduct_central_row(&mut tx, line.sku, line.quantity).await?;
            if line.sku.variation_id.is_some() {
                exhausted |= deduct_central_row(&mut tx, line.sku.product_level(), line.quantity).await?;
            }
            if exhausted {
                alerts.push(OutOfStock {
                    sku: line.sku,
                    requested: line.quantity,
                    occurred_at,
                });
            }
        }

        tx.commit().await.map_err(|e| map_sqlx_error("commit_deduction", e))?;

        for alert in &alerts {
            info!(sku = %alert.sku, "central stock exhausted");
            self.alerts.out_of_stock(alert);
        }
        Ok(alerts)
    }

    /// Upsert `on_hand`; refused when the row already reserves more.
    #[instrument(skip(self), fields(seller_id = %seller, sku = %sku), err)]
    pub async fn put_on_hand(&self, seller: SellerId, sku: SkuKey, on_hand: u32) -> Result<InventoryRecord, LedgerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO seller_inventory (seller_id, product_id, variation_id, on_hand, reserved)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT (seller_id, product_id, variation_id) DO UPDATE
            SET on_hand = EXCLUDED.on_hand
            WHERE seller_inventory.reserved <= EXCLUDED.on_hand
            RETURNING on_hand, reserved
            "#,
        )
        .bind(seller.as_uuid())
        .bind(sku.product_id.as_uuid())
        .bind(variation_key(sku.variation_id))
        .bind(i64::from(on_hand))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_on_hand", e))?;

        if let Some(row) = row {
            let on_hand: i64 = row.try_get("on_hand").map_err(|e| map_sqlx_error("set_on_hand", e))?;
            let reserved: i64 = row.try_get("reserved").map_err(|e| map_sqlx_error("set_on_hand", e))?;
            return Ok(InventoryRecord::from_parts(to_u32(on_hand), to_u32(reserved)));
        }

        let reserved: i64 = sqlx::query_scalar(
            r#"
            SELECT reserved FROM seller_inventory
            WHERE seller_id = $1 AND product_id = $2 AND variation_id = $3
            "#,
        )
        .bind(seller.as_uuid())
        .bind(sku.product_id.as_uuid())
        .bind(variation_key(sku.variation_id))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_on_hand", e))?;

        Err(LedgerError::BelowReserved {
            sku,
            on_hand,
            reserved: to_u32(reserved),
        })
    }

    #[instrument(skip(self), fields(seller_id = %seller), err)]
    pub async fn seller_snapshot(&self, seller: SellerId) -> Result<Vec<(SkuKey, InventoryRecord)>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, variation_id, on_hand, reserved
            FROM seller_inventory
            WHERE seller_id = $1
            ORDER BY product_id ASC, variation_id ASC
            "#,
        )
        .bind(seller.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("snapshot", e))?;

        rows.iter()
            .map(|row| {
                let product: Uuid = row.try_get("product_id")?;
                let variation: Uuid = row.try_get("variation_id")?;
                let on_hand: i64 = row.try_get("on_hand")?;
                let reserved: i64 = row.try_get("reserved")?;
                Ok((
                    sku_from_columns(product, variation),
                    InventoryRecord::from_parts(to_u32(on_hand), to_u32(reserved)),
                ))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("snapshot", e))
    }

    #[instrument(skip(self, record), fields(sku = %sku), err)]
    pub async fn put_central(&self, sku: SkuKey, record: CentralStockRecord) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO central_stock (product_id, variation_id, quantity, manage_stock, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (product_id, variation_id) DO UPDATE
            SET quantity = EXCLUDED.quantity,
                manage_stock = EXCLUDED.manage_stock,
                status = EXCLUDED.status
            "#,
        )
        .bind(sku.product_id.as_uuid())
        .bind(variation_key(sku.variation_id))
        .bind(i64::from(record.quantity))
        .bind(record.manage_stock)
        .bind(status_str(record.status))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_central_stock", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(sku = %sku), err)]
    pub async fn find_central(&self, sku: SkuKey) -> Result<Option<CentralStockRecord>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT quantity, manage_stock, status
            FROM central_stock
            WHERE product_id = $1 AND variation_id = $2
            "#,
        )
        .bind(sku.product_id.as_uuid())
        .bind(variation_key(sku.variation_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("central_stock", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let decode = |e| map_sqlx_error("central_stock", e);
        let quantity: i64 = row.try_get("quantity").map_err(decode)?;
        let manage_stock: bool = row.try_get("manage_stock").map_err(decode)?;
        let status: String = row.try_get("status").map_err(decode)?;
        Ok(Some(CentralStockRecord {
            quantity: to_u32(quantity),
            manage_stock,
            status: parse_status(&status),
        }))
    }
}

/// Lock one seller SKU row and return what is still available (0 if missing).
async fn lock_available(
    tx: &mut Transaction<'_, Postgres>,
    seller: SellerId,
    sku: SkuKey,
) -> Result<u32, LedgerError> {
    let row = sqlx::query(
        r#"
        SELECT on_hand, reserved
        FROM seller_inventory
        WHERE seller_id = $1 AND product_id = $2 AND variation_id = $3
        FOR UPDATE
        "#,
    )
    .bind(seller.as_uuid())
    .bind(sku.product_id.as_uuid())
    .bind(variation_key(sku.variation_id))
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("reserve", e))?;

    match row {
        Some(row) => {
            let on_hand: i64 = row.try_get("on_hand").map_err(|e| map_sqlx_error("reserve", e))?;
            let reserved: i64 = row.try_get("reserved").map_err(|e| map_sqlx_error("reserve", e))?;
            Ok(to_u32(on_hand - reserved))
        }
        None => Ok(0),
    }
}

/// Deduct one tracked central row. Returns `true` when it is exhausted
/// afterwards; untracked or missing rows are left alone.
async fn deduct_central_row(
    tx: &mut Transaction<'_, Postgres>,
    sku: SkuKey,
    quantity: u32,
) -> Result<bool, LedgerError> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE central_stock
        SET quantity = GREATEST(quantity - $3, 0),
            status = CASE WHEN quantity - $3 <= 0 THEN 'out_of_stock' ELSE status END
        WHERE product_id = $1 AND variation_id = $2 AND manage_stock
        RETURNING quantity
        "#,
    )
    .bind(sku.product_id.as_uuid())
    .bind(variation_key(sku.variation_id))
    .bind(i64::from(quantity))
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("commit_deduction", e))?;

    Ok(remaining == Some(0))
}

impl InventoryLedger for PostgresInventoryLedger {
    fn available(
        &self,
        seller: SellerId,
        product: ProductId,
        variation: Option<VariationId>,
    ) -> Result<u32, LedgerError> {
        self.runtime.block_on(self.available_for(seller, product, variation))
    }

    fn reserve(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        self.runtime.block_on(self.reserve_lines(seller, lines))
    }

    fn release(&self, seller: SellerId, lines: &[StockLine]) -> Result<(), LedgerError> {
        self.runtime.block_on(self.release_lines(seller, lines))
    }

    fn commit_deduction(
        &self,
        lines: &[StockLine],
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<OutOfStock>, LedgerError> {
        self.runtime.block_on(self.deduct_central(lines, occurred_at))
    }

    fn set_on_hand(&self, seller: SellerId, sku: SkuKey, on_hand: u32) -> Result<InventoryRecord, LedgerError> {
        self.runtime.block_on(self.put_on_hand(seller, sku, on_hand))
    }

    fn snapshot(&self, seller: SellerId) -> Result<Vec<(SkuKey, InventoryRecord)>, LedgerError> {
        self.runtime.block_on(self.seller_snapshot(seller))
    }

    fn set_central_stock(&self, sku: SkuKey, record: CentralStockRecord) -> Result<(), LedgerError> {
        self.runtime.block_on(self.put_central(sku, record))
    }

    fn central_stock(&self, sku: SkuKey) -> Result<Option<CentralStockRecord>, LedgerError> {
        self.runtime.block_on(self.find_central(sku))
    }
}
