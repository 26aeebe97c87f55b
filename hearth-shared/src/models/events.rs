use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Domain events broadcast to dashboard subscribers.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HotelEvent {
    BookingCreated {
        hotel_id: Uuid,
        booking_id: Uuid,
        room_id: Uuid,
        status: String,
        timestamp: DateTime<Utc>,
    },
    GuestCheckedIn {
        hotel_id: Uuid,
        booking_id: Uuid,
        room_id: Uuid,
        guest_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    BookingStatusChanged {
        hotel_id: Uuid,
        booking_id: Uuid,
        from: String,
        to: String,
        timestamp: DateTime<Utc>,
    },
    GuestCheckedOut {
        hotel_id: Uuid,
        booking_id: Uuid,
        room_id: Uuid,
        invoice_id: Uuid,
        total_amount: Decimal,
        timestamp: DateTime<Utc>,
    },
    RoomStatusChanged {
        hotel_id: Uuid,
        room_id: Uuid,
        status: String,
        timestamp: DateTime<Utc>,
    },
    RoomServiceCharged {
        hotel_id: Uuid,
        booking_id: Uuid,
        charge_id: Uuid,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    },
}

impl HotelEvent {
    pub fn hotel_id(&self) -> Uuid {
        match self {
            HotelEvent::BookingCreated { hotel_id, .. }
            | HotelEvent::GuestCheckedIn { hotel_id, .. }
            | HotelEvent::BookingStatusChanged { hotel_id, .. }
            | HotelEvent::GuestCheckedOut { hotel_id, .. }
            | HotelEvent::RoomStatusChanged { hotel_id, .. }
            | HotelEvent::RoomServiceCharged { hotel_id, .. } => *hotel_id,
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            HotelEvent::BookingCreated { .. } => "booking_created",
            HotelEvent::GuestCheckedIn { .. } => "guest_checked_in",
            HotelEvent::BookingStatusChanged { .. } => "booking_status_changed",
            HotelEvent::GuestCheckedOut { .. } => "guest_checked_out",
            HotelEvent::RoomStatusChanged { .. } => "room_status_changed",
            HotelEvent::RoomServiceCharged { .. } => "room_service_charged",
        }
    }
}
