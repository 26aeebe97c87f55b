use chrono::{DateTime, Utc};
use hearth_shared::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::booking::Booking;
use crate::FolioError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Charged,
    Cancelled,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Charged => "charged",
            ChargeStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ChargeStatus {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChargeStatus::Pending),
            "charged" => Ok(ChargeStatus::Charged),
            "cancelled" => Ok(ChargeStatus::Cancelled),
            other => Err(FolioError::InvalidCharge(format!("unknown charge status '{}'", other))),
        }
    }
}

/// A POS order billed to a guest's room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomServiceCharge {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub booking_id: Uuid,
    pub room_id: Uuid,
    pub order_id: Uuid,
    pub description: Option<String>,
    pub amount: Decimal,
    pub status: ChargeStatus,
    pub added_to_invoice: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCharge {
    pub booking_id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePatch {
    pub status: Option<ChargeStatus>,
    pub added_to_invoice: Option<bool>,
}

impl RoomServiceCharge {
    /// Opens a pending charge against an active booking.
    pub fn new(booking: &Booking, input: NewCharge) -> Result<Self, FolioError> {
        if !booking.is_active() {
            return Err(FolioError::Closed(format!(
                "booking {} is {} and cannot take room-service charges",
                booking.id, booking.status
            )));
        }
        if input.amount <= Decimal::ZERO {
            return Err(FolioError::InvalidCharge("amount must be positive".to_string()));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            hotel_id: booking.hotel_id,
            booking_id: booking.id,
            room_id: booking.room_id,
            order_id: input.order_id,
            description: input.description,
            amount: round_money(input.amount),
            status: ChargeStatus::Pending,
            added_to_invoice: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Still owed and not folded into any invoice.
    pub fn is_pending(&self) -> bool {
        self.status == ChargeStatus::Pending && !self.added_to_invoice
    }

    pub fn mark_invoiced(&mut self, now: DateTime<Utc>) {
        self.status = ChargeStatus::Charged;
        self.added_to_invoice = true;
        self.updated_at = now;
    }

    pub fn apply_patch(&mut self, patch: ChargePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(added) = patch.added_to_invoice {
            self.added_to_invoice = added;
        }
        self.updated_at = Utc::now();
    }
}

/// Sum of the charges that are still pending.
pub fn pending_total<'a, I>(charges: I) -> Decimal
where
    I: IntoIterator<Item = &'a RoomServiceCharge>,
{
    charges
        .into_iter()
        .filter(|c| c.is_pending())
        .map(|c| c.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingStatus, NewBooking, PaymentInfo, BookingSource};
    use chrono::Duration;

    fn booking(status: BookingStatus) -> Booking {
        let check_in = Utc::now();
        let mut b = Booking::new(NewBooking {
            hotel_id: Uuid::new_v4(),
            guest_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            check_in,
            expected_check_out: check_in + Duration::days(1),
            adults: 1,
            children: 0,
            add_ons: vec![],
            payment: PaymentInfo::default(),
            status: Some(BookingStatus::CheckedIn),
            source: BookingSource::WalkIn,
            special_requests: None,
        })
        .unwrap();
        b.status = status;
        b
    }

    fn charge(b: &Booking, cents: i64) -> RoomServiceCharge {
        RoomServiceCharge::new(
            b,
            NewCharge { booking_id: b.id, order_id: Uuid::new_v4(), amount: Decimal::new(cents, 2), description: None },
        )
        .unwrap()
    }

    #[test]
    fn test_charge_requires_active_booking() {
        let closed = booking(BookingStatus::CheckedOut);
        let result = RoomServiceCharge::new(
            &closed,
            NewCharge { booking_id: closed.id, order_id: Uuid::new_v4(), amount: Decimal::from(10), description: None },
        );
        assert!(matches!(result, Err(FolioError::Closed(_))));
    }

    #[test]
    fn test_charge_rejects_non_positive_amount() {
        let b = booking(BookingStatus::CheckedIn);
        let result = RoomServiceCharge::new(
            &b,
            NewCharge { booking_id: b.id, order_id: Uuid::new_v4(), amount: Decimal::ZERO, description: None },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pending_total_skips_settled_charges() {
        let b = booking(BookingStatus::CheckedIn);
        let open = charge(&b, 2000);
        let mut invoiced = charge(&b, 1500);
        invoiced.mark_invoiced(Utc::now());
        let mut cancelled = charge(&b, 700);
        cancelled.apply_patch(ChargePatch { status: Some(ChargeStatus::Cancelled), added_to_invoice: None });

        let all = vec![open, invoiced, cancelled];
        assert_eq!(pending_total(&all), Decimal::from(20));
    }

    #[test]
    fn test_charge_takes_room_from_booking() {
        let b = booking(BookingStatus::Booked);
        let c = charge(&b, 999);
        assert_eq!(c.room_id, b.room_id);
        assert_eq!(c.hotel_id, b.hotel_id);
        assert!(c.is_pending());
    }
}
