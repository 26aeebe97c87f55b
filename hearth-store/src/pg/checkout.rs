use async_trait::async_trait;
use hearth_core::repository::{CheckoutCommit, CheckoutRepository};
use hearth_core::{CoreError, CoreResult};
use hearth_folio::BookingStatus;
use hearth_property::DailyRevenue;
use sqlx::types::Json;
use sqlx::PgConnection;

use super::bookings::lock_room;
use super::invoices::insert_invoice;
use super::rooms::RevenueRow;
use super::{map_db_error, to_db_count, PgStore};

/// A pending charge on the booking that the invoice does not include.
async fn has_unbilled_charge(conn: &mut PgConnection, commit: &CheckoutCommit) -> CoreResult<bool> {
    sqlx::query_scalar(
        "SELECT EXISTS ( \
             SELECT 1 FROM room_service_charges WHERE booking_id = $1 AND status = 'pending' \
             AND NOT added_to_invoice AND NOT (id = ANY($2)) \
         )",
    )
    .bind(commit.booking.id)
    .bind(&commit.charge_ids)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

#[async_trait]
impl CheckoutRepository for PgStore {
    async fn commit_checkout(&self, commit: &CheckoutCommit) -> CoreResult<()> {
        let booking = &commit.booking;
        let now = commit.revenue.at;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        lock_room(&mut tx, booking.room_id).await?;

        let closed = sqlx::query(
            "UPDATE bookings SET actual_check_out = $3, payment = $4, status = $5, updated_at = $6 \
             WHERE id = $1 AND status = $2",
        )
        .bind(booking.id)
        .bind(BookingStatus::CheckedIn.as_str())
        .bind(booking.actual_check_out)
        .bind(Json(&booking.payment))
        .bind(booking.status.as_str())
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if closed.rows_affected() == 0 {
            return Err(CoreError::Conflict("Booking is no longer checked in".to_string()));
        }

        if !commit.charge_ids.is_empty() {
            let invoiced = sqlx::query(
                "UPDATE room_service_charges SET status = 'charged', added_to_invoice = TRUE, updated_at = $3 \
                 WHERE booking_id = $1 AND id = ANY($2) AND status = 'pending' AND NOT added_to_invoice",
            )
            .bind(booking.id)
            .bind(&commit.charge_ids)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
            if invoiced.rows_affected() != commit.charge_ids.len() as u64 {
                return Err(CoreError::Conflict(
                    "Room-service charges changed during checkout".to_string(),
                ));
            }
        }

        if commit.bills_all_pending && has_unbilled_charge(&mut tx, commit).await? {
            return Err(CoreError::Conflict(
                "Room-service charges changed during checkout".to_string(),
            ));
        }

        insert_invoice(&mut tx, &commit.invoice).await?;

        sqlx::query("UPDATE rooms SET status = 'cleaning', last_cleaned = NULL, updated_at = $2 WHERE id = $1")
            .bind(booking.room_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        // Accumulate into today's revenue row; the room lock serializes writers.
        let date = now.date_naive();
        let existing: Option<RevenueRow> = sqlx::query_as(
            "SELECT room_id, revenue_date, room_revenue, additional_revenue, occupied_nights, average_daily_rate \
             FROM room_daily_revenue WHERE room_id = $1 AND revenue_date = $2",
        )
        .bind(booking.room_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let posting = &commit.revenue;
        let entry = match existing {
            Some(row) => {
                let mut entry = row.into_entry()?;
                entry.accumulate(posting.room_revenue, posting.additional_revenue, posting.occupied_nights);
                entry
            }
            None => DailyRevenue::new(
                date,
                posting.room_revenue,
                posting.additional_revenue,
                posting.occupied_nights,
            ),
        };

        sqlx::query(
            "INSERT INTO room_daily_revenue \
             (room_id, revenue_date, room_revenue, additional_revenue, occupied_nights, average_daily_rate) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (room_id, revenue_date) DO UPDATE SET \
             room_revenue = EXCLUDED.room_revenue, additional_revenue = EXCLUDED.additional_revenue, \
             occupied_nights = EXCLUDED.occupied_nights, average_daily_rate = EXCLUDED.average_daily_rate",
        )
        .bind(booking.room_id)
        .bind(entry.date)
        .bind(entry.room_revenue)
        .bind(entry.additional_revenue)
        .bind(to_db_count(entry.occupied_nights)?)
        .bind(entry.average_daily_rate)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let guest = sqlx::query(
            "UPDATE guests SET past_stays = past_stays || $2, billing_history = billing_history || $3, \
             updated_at = $4 WHERE id = $1",
        )
        .bind(booking.guest_id)
        .bind(Json(vec![&commit.stay]))
        .bind(Json(vec![&commit.billing]))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if guest.rows_affected() == 0 {
            return Err(CoreError::not_found("Guest", booking.guest_id));
        }

        tx.commit().await.map_err(map_db_error)?;
        tracing::debug!(
            "Checkout of booking {} committed with {} charge(s)",
            booking.id,
            commit.charge_ids.len()
        );
        Ok(())
    }
}
