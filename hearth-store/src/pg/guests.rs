use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::repository::GuestRepository;
use hearth_core::{CoreError, CoreResult};
use hearth_property::guest::{BillingRecord, GuestNote, StaySummary};
use hearth_property::{Guest, GuestIdentity, PersonalInfo};
use sqlx::types::Json;
use uuid::Uuid;

use super::bookings::has_active_booking;
use super::{map_db_error, PgStore};

const GUEST_COLUMNS: &str = "id, hotel_id, personal_info, is_corporate, company_name, past_stays, \
     billing_history, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct GuestRow {
    id: Uuid,
    hotel_id: Uuid,
    personal_info: Json<PersonalInfo>,
    is_corporate: bool,
    company_name: Option<String>,
    past_stays: Json<Vec<StaySummary>>,
    billing_history: Json<Vec<BillingRecord>>,
    notes: Json<Vec<GuestNote>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GuestRow> for Guest {
    fn from(row: GuestRow) -> Self {
        Guest {
            id: row.id,
            hotel_id: row.hotel_id,
            personal_info: row.personal_info.0,
            is_corporate: row.is_corporate,
            company_name: row.company_name,
            past_stays: row.past_stays.0,
            billing_history: row.billing_history.0,
            notes: row.notes.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl GuestRepository for PgStore {
    async fn insert_guest(&self, guest: &Guest) -> CoreResult<()> {
        let identity = GuestIdentity::of(&guest.personal_info);
        sqlx::query(
            "INSERT INTO guests (id, hotel_id, personal_info, email, phone, id_number, is_corporate, \
             company_name, past_stays, billing_history, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(guest.id)
        .bind(guest.hotel_id)
        .bind(Json(&guest.personal_info))
        .bind(identity.email)
        .bind(identity.phone)
        .bind(identity.id_number)
        .bind(guest.is_corporate)
        .bind(&guest.company_name)
        .bind(Json(&guest.past_stays))
        .bind(Json(&guest.billing_history))
        .bind(Json(&guest.notes))
        .bind(guest.created_at)
        .bind(guest.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn get_guest(&self, id: Uuid) -> CoreResult<Option<Guest>> {
        let row: Option<GuestRow> = sqlx::query_as(&format!("SELECT {} FROM guests WHERE id = $1", GUEST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Guest::from))
    }

    async fn find_guest_by_identity(
        &self,
        hotel_id: Uuid,
        identity: &GuestIdentity,
    ) -> CoreResult<Option<Guest>> {
        if identity.is_empty() {
            return Ok(None);
        }
        let row: Option<GuestRow> = sqlx::query_as(&format!(
            "SELECT {} FROM guests WHERE hotel_id = $1 \
             AND (email = $2 OR phone = $3 OR id_number = $4) \
             ORDER BY created_at LIMIT 1",
            GUEST_COLUMNS
        ))
        .bind(hotel_id)
        .bind(&identity.email)
        .bind(&identity.phone)
        .bind(&identity.id_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row.map(Guest::from))
    }

    async fn list_guests(&self, hotel_id: Uuid) -> CoreResult<Vec<Guest>> {
        let rows: Vec<GuestRow> = sqlx::query_as(&format!(
            "SELECT {} FROM guests WHERE hotel_id = $1 ORDER BY created_at",
            GUEST_COLUMNS
        ))
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Guest::from).collect())
    }

    async fn search_guests(&self, hotel_id: Uuid, query: &str) -> CoreResult<Vec<Guest>> {
        let rows: Vec<GuestRow> = sqlx::query_as(&format!(
            "SELECT {} FROM guests WHERE hotel_id = $1 AND ( \
                 personal_info->>'firstName' ILIKE $2 \
                 OR personal_info->>'lastName' ILIKE $2 \
                 OR (personal_info->>'firstName') || ' ' || (personal_info->>'lastName') ILIKE $2 \
                 OR email ILIKE $2 OR phone ILIKE $2 OR id_number ILIKE $2) \
             ORDER BY created_at",
            GUEST_COLUMNS
        ))
        .bind(hotel_id)
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Guest::from).collect())
    }

    async fn save_guest(&self, guest: &Guest) -> CoreResult<()> {
        let identity = GuestIdentity::of(&guest.personal_info);
        let result = sqlx::query(
            "UPDATE guests SET personal_info = $2, email = $3, phone = $4, id_number = $5, \
             is_corporate = $6, company_name = $7, notes = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(guest.id)
        .bind(Json(&guest.personal_info))
        .bind(identity.email)
        .bind(identity.phone)
        .bind(identity.id_number)
        .bind(guest.is_corporate)
        .bind(&guest.company_name)
        .bind(Json(&guest.notes))
        .bind(guest.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Guest", guest.id));
        }
        Ok(())
    }

    async fn delete_guest(&self, id: Uuid) -> CoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Conflicts with the key-share lock new bookings take on the guest row.
        let locked = sqlx::query("SELECT id FROM guests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if locked.is_none() {
            return Ok(false);
        }
        if has_active_booking(&mut tx, "guest_id", id).await? {
            return Err(CoreError::Conflict("Guest has active bookings".to_string()));
        }

        sqlx::query("DELETE FROM guests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" ada "), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
