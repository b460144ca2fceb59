use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::database::connection::PgDatabase;
use crate::database::queries::LocationQueries;
use crate::error::MarketplaceResult;
use crate::identity::EntityId;
use crate::models::{Location, LocationInput};

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: String,
    user_id: String,
    city: String,
    district: String,
    neighborhood: String,
    address: Option<String>,
    is_default: bool,
    is_active: bool,
    latitude: f64,
    longitude: f64,
    created_at: DateTime<Utc>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            id: row.id.into(),
            user_id: row.user_id.into(),
            city: row.city,
            district: row.district,
            neighborhood: row.neighborhood,
            address: row.address,
            is_default: row.is_default,
            is_active: row.is_active,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
        }
    }
}

const LOCATION_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, city, district, \
     neighborhood, address, is_default, is_active, latitude, longitude, created_at";

async fn clear_default(conn: &mut PgConnection, user_id: &EntityId) -> MarketplaceResult<()> {
    sqlx::query("UPDATE locations SET is_default = FALSE WHERE user_id = $1::uuid AND is_default")
        .bind(user_id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl LocationQueries for PgDatabase {
    async fn locations_for(&self, user_id: &EntityId) -> MarketplaceResult<Vec<Location>> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM locations \
             WHERE user_id = $1::uuid AND is_active ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Location::from).collect())
    }

    async fn insert_location(
        &self,
        user_id: &EntityId,
        input: &LocationInput,
    ) -> MarketplaceResult<Location> {
        let mut tx = self.pool().begin().await?;
        if input.is_default {
            clear_default(&mut *tx, user_id).await?;
        }

        let (latitude, longitude) = input.coordinates();
        let sql = format!(
            "INSERT INTO locations (user_id, city, district, neighborhood, address, is_default, latitude, longitude) \
             VALUES ($1::uuid, $2, $3, $4, $5, $6, $7, $8) RETURNING {LOCATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(user_id.as_str())
            .bind(&input.city)
            .bind(&input.district)
            .bind(input.neighborhood_or_empty())
            .bind(input.details.as_deref())
            .bind(input.is_default)
            .bind(latitude)
            .bind(longitude)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn update_location(
        &self,
        user_id: &EntityId,
        location_id: &EntityId,
        input: &LocationInput,
    ) -> MarketplaceResult<Option<Location>> {
        let mut tx = self.pool().begin().await?;
        if input.is_default {
            clear_default(&mut *tx, user_id).await?;
        }

        let sql = format!(
            r#"
            UPDATE locations
            SET city = $3,
                district = $4,
                neighborhood = $5,
                address = $6,
                is_default = $7,
                latitude = COALESCE($8, latitude),
                longitude = COALESCE($9, longitude)
            WHERE id = $1::uuid AND user_id = $2::uuid AND is_active
            RETURNING {LOCATION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(location_id.as_str())
            .bind(user_id.as_str())
            .bind(&input.city)
            .bind(&input.district)
            .bind(input.neighborhood_or_empty())
            .bind(input.details.as_deref())
            .bind(input.is_default)
            .bind(input.latitude)
            .bind(input.longitude)
            .fetch_optional(&mut *tx)
            .await?;

        // nothing matched: keep the previous default in place
        let Some(row) = row else {
            return Ok(None);
        };
        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn deactivate_location(
        &self,
        user_id: &EntityId,
        location_id: &EntityId,
    ) -> MarketplaceResult<u64> {
        let result = sqlx::query(
            "UPDATE locations SET is_active = FALSE, is_default = FALSE \
             WHERE id = $1::uuid AND user_id = $2::uuid AND is_active",
        )
        .bind(location_id.as_str())
        .bind(user_id.as_str())
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
