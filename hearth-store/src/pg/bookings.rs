use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::repository::{BookingFilter, BookingRepository};
use hearth_core::{CoreError, CoreResult};
use hearth_folio::{AddOn, Booking, BookingStatus, Invoice, PaymentInfo, RoomEffect};
use hearth_property::RoomStatus;
use sqlx::types::Json;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use super::invoices::insert_invoice;
use super::{conflict_on_stale, from_db_count, map_db_error, parse_column, to_db_count, PgStore};

const BOOKING_COLUMNS: &str = "id, hotel_id, guest_id, room_id, check_in, expected_check_out, actual_check_out, \
     adults, children, add_ons, payment, status, source, special_requests, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    hotel_id: Uuid,
    guest_id: Uuid,
    room_id: Uuid,
    check_in: DateTime<Utc>,
    expected_check_out: DateTime<Utc>,
    actual_check_out: Option<DateTime<Utc>>,
    adults: i32,
    children: i32,
    add_ons: Json<Vec<AddOn>>,
    payment: Json<PaymentInfo>,
    status: String,
    source: String,
    special_requests: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> CoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            hotel_id: self.hotel_id,
            guest_id: self.guest_id,
            room_id: self.room_id,
            check_in: self.check_in,
            expected_check_out: self.expected_check_out,
            actual_check_out: self.actual_check_out,
            adults: from_db_count("adults", self.adults)?,
            children: from_db_count("children", self.children)?,
            add_ons: self.add_ons.0,
            payment: self.payment.0,
            status: parse_column("booking status", &self.status)?,
            source: parse_column("booking source", &self.source)?,
            special_requests: self.special_requests,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Takes the room row lock for the rest of the transaction and returns its status.
pub(super) async fn lock_room(conn: &mut PgConnection, room_id: Uuid) -> CoreResult<RoomStatus> {
    let row = sqlx::query("SELECT status FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| CoreError::not_found("Room", room_id))?;
    let status: String = row.try_get("status").map_err(map_db_error)?;
    parse_column("room status", &status)
}

async fn has_overlap(conn: &mut PgConnection, booking: &Booking) -> CoreResult<bool> {
    let row = sqlx::query(
        "SELECT EXISTS ( \
             SELECT 1 FROM bookings WHERE room_id = $1 AND id <> $2 \
             AND status IN ('booked', 'checked_in') \
             AND check_in < $4 AND expected_check_out > $3 \
         ) AS taken",
    )
    .bind(booking.room_id)
    .bind(booking.id)
    .bind(booking.check_in)
    .bind(booking.expected_check_out)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)?;
    row.try_get("taken").map_err(map_db_error)
}

/// Whether a booked or checked-in booking has `column = id`.
pub(super) async fn has_active_booking(conn: &mut PgConnection, column: &str, id: Uuid) -> CoreResult<bool> {
    let row = sqlx::query(&format!(
        "SELECT EXISTS ( \
             SELECT 1 FROM bookings WHERE {} = $1 AND status IN ('booked', 'checked_in') \
         ) AS active",
        column
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)?;
    row.try_get("active").map_err(map_db_error)
}

async fn set_room_status(
    conn: &mut PgConnection,
    room_id: Uuid,
    status: RoomStatus,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    sqlx::query("UPDATE rooms SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(room_id)
        .bind(status.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

/// Frees the room unless another checked-in booking still holds it.
pub(super) async fn release_room(
    conn: &mut PgConnection,
    room_id: Uuid,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    sqlx::query(
        "UPDATE rooms SET status = 'available', updated_at = $3 \
         WHERE id = $1 AND status = 'occupied' \
         AND NOT EXISTS ( \
             SELECT 1 FROM bookings WHERE room_id = $1 AND id <> $2 AND status = 'checked_in' \
         )",
    )
    .bind(room_id)
    .bind(booking_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE \
                 ($1::uuid IS NULL OR hotel_id = $1) \
             AND ($2::text IS NULL OR status = $2) \
             AND (NOT $3 OR status IN ('booked', 'checked_in')) \
             AND ($4::uuid IS NULL OR guest_id = $4) \
             AND ($5::uuid IS NULL OR room_id = $5) \
             AND ($6::timestamptz IS NULL OR expected_check_out > $6) \
             AND ($7::timestamptz IS NULL OR check_in < $7) \
             ORDER BY check_in",
            BOOKING_COLUMNS
        ))
        .bind(filter.hotel_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.active_only)
        .bind(filter.guest_id)
        .bind(filter.room_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn insert_booking(&self, booking: &Booking, invoice: Option<&Invoice>) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let room_status = lock_room(&mut tx, booking.room_id).await?;
        if booking.is_active() && has_overlap(&mut tx, booking).await? {
            return Err(CoreError::Conflict(
                "Room is already booked for the selected dates".to_string(),
            ));
        }
        if booking.status == BookingStatus::CheckedIn {
            if !room_status.accepts_check_in() {
                return Err(CoreError::RoomUnavailable);
            }
            set_room_status(&mut tx, booking.room_id, RoomStatus::Occupied, booking.created_at).await?;
        }

        sqlx::query(&format!(
            "INSERT INTO bookings ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            BOOKING_COLUMNS
        ))
        .bind(booking.id)
        .bind(booking.hotel_id)
        .bind(booking.guest_id)
        .bind(booking.room_id)
        .bind(booking.check_in)
        .bind(booking.expected_check_out)
        .bind(booking.actual_check_out)
        .bind(to_db_count(booking.adults)?)
        .bind(to_db_count(booking.children)?)
        .bind(Json(&booking.add_ons))
        .bind(Json(&booking.payment))
        .bind(booking.status.as_str())
        .bind(booking.source.as_str())
        .bind(&booking.special_requests)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if let Some(invoice) = invoice {
            insert_invoice(&mut tx, invoice).await?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn update_booking(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        effect: RoomEffect,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let room_status = lock_room(&mut tx, booking.room_id).await?;
        if booking.is_active() && has_overlap(&mut tx, booking).await? {
            return Err(CoreError::Conflict(
                "Room is already booked for the selected dates".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE bookings SET check_in = $3, expected_check_out = $4, actual_check_out = $5, \
             adults = $6, children = $7, add_ons = $8, payment = $9, status = $10, \
             special_requests = $11, updated_at = $12 \
             WHERE id = $1 AND status = $2",
        )
        .bind(booking.id)
        .bind(expected.as_str())
        .bind(booking.check_in)
        .bind(booking.expected_check_out)
        .bind(booking.actual_check_out)
        .bind(to_db_count(booking.adults)?)
        .bind(to_db_count(booking.children)?)
        .bind(Json(&booking.add_ons))
        .bind(Json(&booking.payment))
        .bind(booking.status.as_str())
        .bind(&booking.special_requests)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(conflict_on_stale(booking.id));
        }

        match effect {
            RoomEffect::Occupy => {
                if !room_status.accepts_check_in() {
                    return Err(CoreError::RoomUnavailable);
                }
                set_room_status(&mut tx, booking.room_id, RoomStatus::Occupied, booking.updated_at).await?;
            }
            RoomEffect::Release => release_room(&mut tx, booking.room_id, booking.id, booking.updated_at).await?,
            RoomEffect::None => {}
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        lock_room(&mut tx, booking.room_id).await?;
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND status <> 'checked_in'")
            .bind(booking.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::Conflict(
                "Booking is checked in or no longer exists".to_string(),
            ));
        }
        release_room(&mut tx, booking.room_id, booking.id, Utc::now()).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }
}
