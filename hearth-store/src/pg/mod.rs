mod bookings;
mod checkout;
mod guests;
mod invoices;
mod room_service;
mod rooms;

use async_trait::async_trait;
use hearth_core::repository::HotelStore;
use hearth_core::{CoreError, CoreResult};
use sqlx::PgPool;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Postgres-backed store. Every multi-row write runs in one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HotelStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> CoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(map_db_error)?;
        Ok(())
    }
}

/// Translates constraint violations into domain conflicts; everything else is
/// logged and reported as an internal error.
pub(crate) fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => {
                return match db.constraint() {
                    Some("rooms_hotel_room_number_key") => {
                        CoreError::Conflict("Room number already exists in this hotel".to_string())
                    }
                    _ => CoreError::Conflict("Record already exists".to_string()),
                };
            }
            Some("23P01") => {
                return CoreError::Conflict("Room is already booked for the selected dates".to_string());
            }
            Some("23503") => {
                return CoreError::Conflict("Record is still referenced by other records".to_string());
            }
            _ => {}
        }
    }
    tracing::error!("Database error: {}", err);
    CoreError::Internal("database error".to_string())
}

/// Parses a TEXT column holding an enum value.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> CoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e: T::Err| {
        tracing::error!("Unreadable {} value '{}': {}", column, value, e);
        CoreError::Internal(format!("corrupt {} column", column))
    })
}

pub(crate) fn to_db_count(value: u32) -> CoreResult<i32> {
    i32::try_from(value).map_err(|_| CoreError::Validation(format!("{} is out of range", value)))
}

pub(crate) fn from_db_count(column: &str, value: i32) -> CoreResult<u32> {
    u32::try_from(value).map_err(|_| CoreError::Internal(format!("negative {} column", column)))
}

pub(crate) fn conflict_on_stale(id: Uuid) -> CoreError {
    CoreError::Conflict(format!("Booking {} was changed by another request", id))
}
