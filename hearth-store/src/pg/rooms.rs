use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::repository::{RoomFilter, RoomRepository};
use hearth_core::{CoreError, CoreResult};
use hearth_property::{DailyRevenue, Room};
use rust_decimal::Decimal;
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

use super::bookings::has_active_booking;
use super::{from_db_count, map_db_error, parse_column, to_db_count, PgStore};

const ROOM_COLUMNS: &str = "id, hotel_id, room_number, room_type, floor, bed_configuration, capacity, amenities, \
     price_per_night, status, last_cleaned, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    hotel_id: Uuid,
    room_number: String,
    room_type: String,
    floor: i32,
    bed_configuration: String,
    capacity: i32,
    amenities: Json<Vec<String>>,
    price_per_night: Decimal,
    status: String,
    last_cleaned: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub(super) struct RevenueRow {
    pub room_id: Uuid,
    pub revenue_date: NaiveDate,
    pub room_revenue: Decimal,
    pub additional_revenue: Decimal,
    pub occupied_nights: i32,
    pub average_daily_rate: Decimal,
}

impl RevenueRow {
    pub(super) fn into_entry(self) -> CoreResult<DailyRevenue> {
        Ok(DailyRevenue {
            date: self.revenue_date,
            room_revenue: self.room_revenue,
            additional_revenue: self.additional_revenue,
            occupied_nights: from_db_count("occupied_nights", self.occupied_nights)?,
            average_daily_rate: self.average_daily_rate,
        })
    }
}

impl RoomRow {
    fn into_room(self, revenue_history: Vec<DailyRevenue>) -> CoreResult<Room> {
        Ok(Room {
            id: self.id,
            hotel_id: self.hotel_id,
            room_number: self.room_number,
            room_type: parse_column("room_type", &self.room_type)?,
            floor: self.floor,
            bed_configuration: self.bed_configuration,
            capacity: from_db_count("capacity", self.capacity)?,
            amenities: self.amenities.0,
            price_per_night: self.price_per_night,
            status: parse_column("room status", &self.status)?,
            last_cleaned: self.last_cleaned,
            revenue_history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    async fn revenue_for(&self, room_ids: &[Uuid]) -> CoreResult<HashMap<Uuid, Vec<DailyRevenue>>> {
        let rows: Vec<RevenueRow> = sqlx::query_as(
            "SELECT room_id, revenue_date, room_revenue, additional_revenue, occupied_nights, average_daily_rate \
             FROM room_daily_revenue WHERE room_id = ANY($1) ORDER BY revenue_date",
        )
        .bind(room_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut by_room: HashMap<Uuid, Vec<DailyRevenue>> = HashMap::new();
        for row in rows {
            let room_id = row.room_id;
            by_room.entry(room_id).or_default().push(row.into_entry()?);
        }
        Ok(by_room)
    }

    async fn hydrate(&self, rows: Vec<RoomRow>) -> CoreResult<Vec<Room>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut revenue = self.revenue_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let history = revenue.remove(&row.id).unwrap_or_default();
                row.into_room(history)
            })
            .collect()
    }
}

#[async_trait]
impl RoomRepository for PgStore {
    async fn insert_room(&self, room: &Room) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO rooms (id, hotel_id, room_number, room_type, floor, bed_configuration, capacity, \
             amenities, price_per_night, status, last_cleaned, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(room.id)
        .bind(room.hotel_id)
        .bind(&room.room_number)
        .bind(room.room_type.as_str())
        .bind(room.floor)
        .bind(&room.bed_configuration)
        .bind(to_db_count(room.capacity)?)
        .bind(Json(&room.amenities))
        .bind(room.price_per_night)
        .bind(room.status.as_str())
        .bind(room.last_cleaned)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn get_room(&self, id: Uuid) -> CoreResult<Option<Room>> {
        let row: Option<RoomRow> = sqlx::query_as(&format!("SELECT {} FROM rooms WHERE id = $1", ROOM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_rooms(&self, hotel_id: Uuid, filter: &RoomFilter) -> CoreResult<Vec<Room>> {
        let rows: Vec<RoomRow> = sqlx::query_as(&format!(
            "SELECT {} FROM rooms WHERE hotel_id = $1 \
             AND ($2::text IS NULL OR status = $2) \
             AND ($3::text IS NULL OR room_type = $3) \
             AND ($4::int IS NULL OR floor = $4) \
             ORDER BY room_number",
            ROOM_COLUMNS
        ))
        .bind(hotel_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.room_type.map(|t| t.as_str()))
        .bind(filter.floor)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.hydrate(rows).await
    }

    async fn save_room(&self, room: &Room) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE rooms SET room_number = $2, room_type = $3, floor = $4, bed_configuration = $5, \
             capacity = $6, amenities = $7, price_per_night = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(room.id)
        .bind(&room.room_number)
        .bind(room.room_type.as_str())
        .bind(room.floor)
        .bind(&room.bed_configuration)
        .bind(to_db_count(room.capacity)?)
        .bind(Json(&room.amenities))
        .bind(room.price_per_night)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Room", room.id));
        }
        Ok(())
    }

    async fn save_room_status(&self, room: &Room) -> CoreResult<()> {
        let result = sqlx::query("UPDATE rooms SET status = $2, last_cleaned = $3, updated_at = $4 WHERE id = $1")
            .bind(room.id)
            .bind(room.status.as_str())
            .bind(room.last_cleaned)
            .bind(room.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Room", room.id));
        }
        Ok(())
    }

    async fn delete_room(&self, id: Uuid) -> CoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Booking writes take the same row lock.
        let locked = sqlx::query("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if locked.is_none() {
            return Ok(false);
        }
        if has_active_booking(&mut tx, "room_id", id).await? {
            return Err(CoreError::Conflict("Room has active bookings".to_string()));
        }

        sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }
}
