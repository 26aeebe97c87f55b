use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_folio::{Booking, BookingStatus, Invoice, RoomEffect, RoomServiceCharge};
use hearth_property::guest::{BillingRecord, StaySummary};
use hearth_property::{Guest, GuestIdentity, Room, RoomStatus, RoomType};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::CoreResult;

#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub status: Option<RoomStatus>,
    pub room_type: Option<RoomType>,
    pub floor: Option<i32>,
}

impl RoomFilter {
    pub fn matches(&self, room: &Room) -> bool {
        self.status.map_or(true, |s| room.status == s)
            && self.room_type.map_or(true, |t| room.room_type == t)
            && self.floor.map_or(true, |f| room.floor == f)
    }
}

/// Booking query. `from`/`to` select bookings whose planned stay touches the range.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub hotel_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub active_only: bool,
    pub guest_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.hotel_id.map_or(true, |h| booking.hotel_id == h)
            && self.status.map_or(true, |s| booking.status == s)
            && (!self.active_only || booking.is_active())
            && self.guest_id.map_or(true, |g| booking.guest_id == g)
            && self.room_id.map_or(true, |r| booking.room_id == r)
            && self.from.map_or(true, |f| booking.expected_check_out > f)
            && self.to.map_or(true, |t| booking.check_in < t)
    }
}

/// Revenue posted to a room when a stay closes.
#[derive(Debug, Clone)]
pub struct RevenuePosting {
    pub at: DateTime<Utc>,
    pub room_revenue: Decimal,
    pub additional_revenue: Decimal,
    pub occupied_nights: u32,
}

/// Everything a checkout writes. Applied all-or-nothing.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    /// Booking already moved to `checked_out` with its payment snapshot updated.
    pub booking: Booking,
    pub charge_ids: Vec<Uuid>,
    /// Set when the invoice folds every pending charge. A charge posted after
    /// `charge_ids` was read then fails the commit.
    pub bills_all_pending: bool,
    pub invoice: Invoice,
    pub revenue: RevenuePosting,
    pub stay: StaySummary,
    pub billing: BillingRecord,
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Fails with `Conflict` when the room number is taken in the hotel.
    async fn insert_room(&self, room: &Room) -> CoreResult<()>;

    async fn get_room(&self, id: Uuid) -> CoreResult<Option<Room>>;

    async fn list_rooms(&self, hotel_id: Uuid, filter: &RoomFilter) -> CoreResult<Vec<Room>>;

    /// Writes descriptive room fields. Status and `last_cleaned` are written
    /// only by [`save_room_status`](Self::save_room_status) and the booking
    /// writes. Revenue history is owned by checkout and left untouched.
    async fn save_room(&self, room: &Room) -> CoreResult<()>;

    /// Writes `status`, `last_cleaned` and `updated_at` only.
    async fn save_room_status(&self, room: &Room) -> CoreResult<()>;

    /// Fails with `Conflict` while an active booking holds the room. Closed
    /// bookings of the room go with it, along with their charges and invoices.
    async fn delete_room(&self, id: Uuid) -> CoreResult<bool>;
}

#[async_trait]
pub trait GuestRepository: Send + Sync {
    async fn insert_guest(&self, guest: &Guest) -> CoreResult<()>;

    async fn get_guest(&self, id: Uuid) -> CoreResult<Option<Guest>>;

    /// First guest of the hotel sharing an email, phone or ID number.
    async fn find_guest_by_identity(
        &self,
        hotel_id: Uuid,
        identity: &GuestIdentity,
    ) -> CoreResult<Option<Guest>>;

    async fn list_guests(&self, hotel_id: Uuid) -> CoreResult<Vec<Guest>>;

    async fn search_guests(&self, hotel_id: Uuid, query: &str) -> CoreResult<Vec<Guest>>;

    /// Writes profile fields and notes. Stay and billing history are appended by checkout only.
    async fn save_guest(&self, guest: &Guest) -> CoreResult<()>;

    /// Fails with `Conflict` while the guest has an active booking. Closed
    /// bookings of the guest go with it, along with their charges and invoices.
    async fn delete_guest(&self, id: Uuid) -> CoreResult<bool>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>>;

    /// Atomically: locks the room, rejects an overlapping active booking with
    /// `Conflict`, occupies the room when the booking starts `checked_in`
    /// (`RoomUnavailable` if it cannot), then inserts the booking and the
    /// optional companion invoice.
    async fn insert_booking(&self, booking: &Booking, invoice: Option<&Invoice>) -> CoreResult<()>;

    /// Atomically writes `booking` if it is still in `expected` status, re-runs
    /// the overlap check for active bookings and applies `effect` to the room.
    async fn update_booking(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        effect: RoomEffect,
    ) -> CoreResult<()>;

    /// Removes a booking that is not checked in, together with its charges and
    /// invoices, and releases its room.
    async fn delete_booking(&self, booking: &Booking) -> CoreResult<()>;
}

#[async_trait]
pub trait RoomServiceRepository: Send + Sync {
    /// Inserts the charge if its booking is still active, checked in the same
    /// write. `NotFound` for a missing booking, `Conflict` for a closed one.
    async fn insert_charge(&self, charge: &RoomServiceCharge) -> CoreResult<()>;

    async fn get_charge(&self, id: Uuid) -> CoreResult<Option<RoomServiceCharge>>;

    async fn list_charges_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<RoomServiceCharge>>;

    async fn save_charge(&self, charge: &RoomServiceCharge) -> CoreResult<()>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn get_invoice(&self, id: Uuid) -> CoreResult<Option<Invoice>>;

    async fn list_invoices_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Invoice>>;

    async fn list_invoices_issued_between(
        &self,
        hotel_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Invoice>>;
}

#[async_trait]
pub trait CheckoutRepository: Send + Sync {
    /// Applies a checkout in one transaction. The booking must still be
    /// `checked_in` and every named charge still pending, otherwise `Conflict`.
    /// With `bills_all_pending`, any other pending charge is a `Conflict` too.
    async fn commit_checkout(&self, commit: &CheckoutCommit) -> CoreResult<()>;
}

#[async_trait]
pub trait HotelStore:
    RoomRepository
    + GuestRepository
    + BookingRepository
    + RoomServiceRepository
    + InvoiceRepository
    + CheckoutRepository
{
    /// Backend name for health output.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> CoreResult<()>;
}
