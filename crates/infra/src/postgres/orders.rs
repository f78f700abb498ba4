use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;
use uuid::Uuid;

use forgeroute_core::{AggregateRoot, ExpectedVersion, OrderId, SellerId};
use forgeroute_orders::{AssignmentStatus, Order};
use forgeroute_routing::{OrderStore, StoreError};

use super::{describe_sqlx_error, is_unique_violation};

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::backend(describe_sqlx_error(operation, &err))
}

/// Order routing state in `fulfillment_orders`.
///
/// The full aggregate is kept as JSONB; status, seller, expiry and version
/// are mirrored into columns for the sweeper and dashboard queries and for
/// the compare-and-set in `save`.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    runtime: Handle,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool, runtime: Handle) -> Self {
        Self { pool, runtime }
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    pub async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let id = order.id_typed();
        sqlx::query(
            r#"
            INSERT INTO fulfillment_orders
                (order_id, status, assigned_seller_id, assignment_expiry, placed_at, version, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(order.status().as_str())
        .bind(order.assigned_seller().map(|s| *s.as_uuid()))
        .bind(order.assignment_expiry())
        .bind(order.placed_at())
        .bind(order.version() as i64)
        .bind(Json(order))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(id)
            } else {
                map_sqlx_error("insert_order", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn load_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT state FROM fulfillment_orders WHERE order_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_order", e))?;

        match row {
            Some(row) => {
                let Json(order): Json<Order> = row
                    .try_get("state")
                    .map_err(|e| StoreError::backend(format!("failed to decode order {id}: {e}")))?;
                Ok(Some(order))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the stored order only if its version still matches.
    #[instrument(
        skip(self, order),
        fields(order_id = %order.id_typed(), version = order.version(), expected = ?expected),
        err
    )]
    pub async fn save_order(&self, order: &Order, expected: ExpectedVersion) -> Result<(), StoreError> {
        let id = order.id_typed();
        let expected_version: Option<i64> = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };

        let updated = sqlx::query(
            r#"
            UPDATE fulfillment_orders
            SET status = $2,
                assigned_seller_id = $3,
                assignment_expiry = $4,
                version = $5,
                state = $6,
                updated_at = now()
            WHERE order_id = $1
              AND ($7::BIGINT IS NULL OR version = $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(order.status().as_str())
        .bind(order.assigned_seller().map(|s| *s.as_uuid()))
        .bind(order.assignment_expiry())
        .bind(order.version() as i64)
        .bind(Json(order))
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_order", e))?;

        if updated.rows_affected() == 1 {
            return Ok(());
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM fulfillment_orders WHERE order_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_order", e))?;

        match actual {
            None => Err(StoreError::NotFound(id)),
            Some(actual) => Err(StoreError::Conflict {
                order_id: id,
                expected,
                actual: actual.max(0) as u64,
            }),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn list_expired(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT order_id
            FROM fulfillment_orders
            WHERE status = 'assigned' AND assignment_expiry < $1
            ORDER BY assignment_expiry ASC, order_id ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_expired", e))?;

        Ok(ids.into_iter().map(OrderId::from_uuid).collect())
    }

    /// Released orders whose re-route never landed, least recently touched first.
    #[instrument(skip(self), err)]
    pub async fn list_stranded(&self, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT order_id
            FROM fulfillment_orders
            WHERE status IN ('rejected', 'timeout')
            ORDER BY updated_at ASC, order_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_stranded", e))?;

        Ok(ids.into_iter().map(OrderId::from_uuid).collect())
    }

    #[instrument(skip(self), fields(seller_id = %seller, status = %status), err)]
    pub async fn list_assigned_to(
        &self,
        seller: SellerId,
        status: AssignmentStatus,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT state
            FROM fulfillment_orders
            WHERE assigned_seller_id = $1 AND status = $2
            ORDER BY placed_at ASC, order_id ASC
            "#,
        )
        .bind(seller.as_uuid())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_assigned_to", e))?;

        rows.into_iter()
            .map(|row| {
                row.try_get::<Json<Order>, _>("state")
                    .map(|Json(order)| order)
                    .map_err(|e| StoreError::backend(format!("failed to decode order row: {e}")))
            })
            .collect()
    }

    #[instrument(skip(self), fields(status = %status), err)]
    pub async fn count_status(&self, status: AssignmentStatus) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fulfillment_orders WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_status", e))?;
        Ok(count.max(0) as u64)
    }
}

impl OrderStore for PostgresOrderStore {
    fn insert(&self, order: &Order) -> Result<(), StoreError> {
        self.runtime.block_on(self.insert_order(order))
    }

    fn load(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.runtime.block_on(self.load_order(id))
    }

    fn save(&self, order: &Order, expected: ExpectedVersion) -> Result<(), StoreError> {
        self.runtime.block_on(self.save_order(order, expected))
    }

    fn expired_assignments(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        self.runtime.block_on(self.list_expired(now, limit))
    }

    fn stranded_orders(&self, limit: usize) -> Result<Vec<OrderId>, StoreError> {
        self.runtime.block_on(self.list_stranded(limit))
    }

    fn assigned_to(&self, seller: SellerId, status: AssignmentStatus) -> Result<Vec<Order>, StoreError> {
        self.runtime.block_on(self.list_assigned_to(seller, status))
    }

    fn count_by_status(&self, status: AssignmentStatus) -> Result<u64, StoreError> {
        self.runtime.block_on(self.count_status(status))
    }
}
