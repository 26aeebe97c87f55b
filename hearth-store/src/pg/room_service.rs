use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::repository::RoomServiceRepository;
use hearth_core::{CoreError, CoreResult};
use hearth_folio::{BookingStatus, RoomServiceCharge};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{map_db_error, parse_column, PgStore};

const CHARGE_COLUMNS: &str = "id, hotel_id, booking_id, room_id, order_id, description, amount, status, \
     added_to_invoice, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ChargeRow {
    id: Uuid,
    hotel_id: Uuid,
    booking_id: Uuid,
    room_id: Uuid,
    order_id: Uuid,
    description: Option<String>,
    amount: Decimal,
    status: String,
    added_to_invoice: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChargeRow {
    fn into_charge(self) -> CoreResult<RoomServiceCharge> {
        Ok(RoomServiceCharge {
            id: self.id,
            hotel_id: self.hotel_id,
            booking_id: self.booking_id,
            room_id: self.room_id,
            order_id: self.order_id,
            description: self.description,
            amount: self.amount,
            status: parse_column("charge status", &self.status)?,
            added_to_invoice: self.added_to_invoice,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl RoomServiceRepository for PgStore {
    async fn insert_charge(&self, charge: &RoomServiceCharge) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Checkout's booking update waits on this share lock.
        let status: String = sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1 FOR SHARE")
            .bind(charge.booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| CoreError::not_found("Booking", charge.booking_id))?;
        let status: BookingStatus = parse_column("booking status", &status)?;
        if !status.is_active() {
            return Err(CoreError::Conflict(format!(
                "Booking {} is {} and cannot take room-service charges",
                charge.booking_id, status
            )));
        }

        sqlx::query(&format!(
            "INSERT INTO room_service_charges ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            CHARGE_COLUMNS
        ))
        .bind(charge.id)
        .bind(charge.hotel_id)
        .bind(charge.booking_id)
        .bind(charge.room_id)
        .bind(charge.order_id)
        .bind(&charge.description)
        .bind(charge.amount)
        .bind(charge.status.as_str())
        .bind(charge.added_to_invoice)
        .bind(charge.created_at)
        .bind(charge.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn get_charge(&self, id: Uuid) -> CoreResult<Option<RoomServiceCharge>> {
        let row: Option<ChargeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM room_service_charges WHERE id = $1",
            CHARGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        row.map(ChargeRow::into_charge).transpose()
    }

    async fn list_charges_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<RoomServiceCharge>> {
        let rows: Vec<ChargeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM room_service_charges WHERE booking_id = $1 ORDER BY created_at",
            CHARGE_COLUMNS
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(ChargeRow::into_charge).collect()
    }

    async fn save_charge(&self, charge: &RoomServiceCharge) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE room_service_charges SET status = $2, added_to_invoice = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(charge.id)
        .bind(charge.status.as_str())
        .bind(charge.added_to_invoice)
        .bind(charge.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Room-service charge", charge.id));
        }
        Ok(())
    }
}
