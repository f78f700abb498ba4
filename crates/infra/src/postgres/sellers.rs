use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;
use uuid::Uuid;

use forgeroute_core::{Coordinates, SellerId};
use forgeroute_routing::{Seller, SellerDirectory, StoreError};

use super::describe_sqlx_error;

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::backend(describe_sqlx_error(operation, &err))
}

fn seller_from_row(row: &PgRow) -> Result<Seller, sqlx::Error> {
    let id: Uuid = row.try_get("seller_id")?;
    let lat: Option<f64> = row.try_get("latitude")?;
    let lon: Option<f64> = row.try_get("longitude")?;
    Ok(Seller {
        id: SellerId::from_uuid(id),
        business_name: row.try_get("business_name")?,
        active: row.try_get("active")?,
        auto_accept: row.try_get("auto_accept")?,
        coordinates: lat.zip(lon).map(|(lat, lon)| Coordinates { lat, lon }),
    })
}

/// Seller profiles in the `sellers` table.
#[derive(Debug, Clone)]
pub struct PostgresSellerDirectory {
    pool: PgPool,
    runtime: Handle,
}

impl PostgresSellerDirectory {
    pub fn new(pool: PgPool, runtime: Handle) -> Self {
        Self { pool, runtime }
    }

    #[instrument(skip(self), err)]
    pub async fn list_active(&self) -> Result<Vec<Seller>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT seller_id, business_name, active, auto_accept, latitude, longitude
            FROM sellers
            WHERE active
            ORDER BY seller_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_active", e))?;

        rows.iter()
            .map(|row| seller_from_row(row).map_err(|e| map_sqlx_error("list_active", e)))
            .collect()
    }

    #[instrument(skip(self), fields(seller_id = %id), err)]
    pub async fn find(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT seller_id, business_name, active, auto_accept, latitude, longitude
            FROM sellers
            WHERE seller_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_seller", e))?;

        row.as_ref()
            .map(seller_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_seller", e))
    }

    #[instrument(skip(self, seller), fields(seller_id = %seller.id), err)]
    pub async fn upsert_seller(&self, seller: &Seller) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sellers (seller_id, business_name, active, auto_accept, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (seller_id) DO UPDATE
            SET business_name = EXCLUDED.business_name,
                active = EXCLUDED.active,
                auto_accept = EXCLUDED.auto_accept,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude
            "#,
        )
        .bind(seller.id.as_uuid())
        .bind(&seller.business_name)
        .bind(seller.active)
        .bind(seller.auto_accept)
        .bind(seller.coordinates.map(|c| c.lat))
        .bind(seller.coordinates.map(|c| c.lon))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_seller", e))?;
        Ok(())
    }
}

impl SellerDirectory for PostgresSellerDirectory {
    fn active_sellers(&self) -> Result<Vec<Seller>, StoreError> {
        self.runtime.block_on(self.list_active())
    }

    fn get(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        self.runtime.block_on(self.find(id))
    }

    fn upsert(&self, seller: Seller) -> Result<(), StoreError> {
        self.runtime.block_on(self.upsert_seller(&seller))
    }
}
