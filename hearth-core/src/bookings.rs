use chrono::Utc;
use hearth_folio::totals::{checkout_line_items, quote_stay};
use hearth_folio::{
    Billing, BillingStatus, Booking, BookingPatch, BookingStatus, Invoice, InvoiceKind, LineItem, NewBooking,
    RoomEffect,
};
use hearth_property::{Guest, Room, RoomStatus, RoomType};
use hearth_shared::{HotelEvent, Masked};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::{BookingFilter, HotelStore};
use crate::{CoreError, CoreResult, EventBus, HotelSettings};

/// Walk-in check-in. `total_amount`/`line_items` are accepted from older
/// front-desk clients but the invoice is always priced server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[serde(flatten)]
    pub booking: NewBooking,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub line_items: Option<Vec<LineItem>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    pub floor: i32,
    pub price_per_night: Decimal,
    pub status: RoomStatus,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            room_number: room.room_number.clone(),
            room_type: room.room_type,
            floor: room.floor,
            price_per_night: room.price_per_night,
            status: room.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<Masked<String>>,
    pub phone: Option<Masked<String>>,
}

impl From<&Guest> for GuestSummary {
    fn from(guest: &Guest) -> Self {
        Self {
            id: guest.id,
            full_name: guest.personal_info.full_name(),
            email: guest.personal_info.email.clone(),
            phone: guest.personal_info.phone.clone(),
        }
    }
}

/// Booking with the room and guest it references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub room: Option<RoomSummary>,
    pub guest: Option<GuestSummary>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn HotelStore>,
    settings: Arc<HotelSettings>,
    events: EventBus,
}

impl BookingService {
    pub fn new(store: Arc<dyn HotelStore>, settings: Arc<HotelSettings>, events: EventBus) -> Self {
        Self { store, settings, events }
    }

    async fn load_room(&self, id: Uuid) -> CoreResult<Room> {
        self.store
            .get_room(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room", id))
    }

    async fn load_guest(&self, id: Uuid) -> CoreResult<Guest> {
        self.store
            .get_guest(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Guest", id))
    }

    /// Resolves the referenced guest and room and checks they can host `booking`.
    async fn check_references(&self, booking: &Booking) -> CoreResult<Room> {
        let guest = self.load_guest(booking.guest_id).await?;
        let room = self.load_room(booking.room_id).await?;
        if guest.hotel_id != booking.hotel_id || room.hotel_id != booking.hotel_id {
            return Err(CoreError::Validation(
                "guest and room must belong to the booking's hotel".to_string(),
            ));
        }
        check_capacity(booking, &room)?;
        if booking.status == BookingStatus::CheckedIn && !room.status.accepts_check_in() {
            return Err(CoreError::RoomUnavailable);
        }
        Ok(room)
    }

    pub async fn create_booking(&self, input: NewBooking) -> CoreResult<Booking> {
        let booking = Booking::new(input)?;
        self.check_references(&booking).await?;
        self.store.insert_booking(&booking, None).await?;

        tracing::info!("Created booking {} for room {} ({})", booking.id, booking.room_id, booking.status);
        self.publish_created(&booking);
        Ok(booking)
    }

    /// Creates a `checked_in` booking, occupies the room and issues the stay
    /// invoice in one store operation.
    pub async fn check_in_guest(&self, request: CheckInRequest) -> CoreResult<(Booking, Invoice)> {
        let mut input = request.booking;
        input.status = Some(BookingStatus::CheckedIn);
        let mut booking = Booking::new(input)?;
        let room = self.check_references(&booking).await?;

        let now = Utc::now();
        let quote = quote_stay(&booking, &room, self.settings.tax_rate_for(booking.hotel_id));
        if let Some(claimed) = request.total_amount {
            if claimed != quote.grand_total {
                tracing::warn!(
                    "Check-in for room {} claimed total {} but stay prices at {}; using server total",
                    room.room_number,
                    claimed,
                    quote.grand_total
                );
            }
        }
        if request.line_items.is_some() {
            tracing::debug!("Ignoring client line items for booking {}", booking.id);
        }

        if booking.payment.total_amount.is_zero() {
            booking.payment.total_amount = quote.grand_total;
        }
        let paid = booking.payment.paid_amount;
        let billing = Billing {
            method: booking.payment.method,
            paid_amount: paid,
            status: BillingStatus::for_amounts(paid, quote.grand_total),
            transaction_id: booking.payment.transaction_id.clone(),
            paid_at: (paid > Decimal::ZERO).then_some(now),
        };
        let invoice = Invoice::issue(
            InvoiceKind::CheckIn,
            &booking,
            checkout_line_items(&quote, &booking, &[]),
            quote.subtotal,
            quote.tax_amount,
            billing,
            now,
        );

        self.store.insert_booking(&booking, Some(&invoice)).await?;

        tracing::info!(
            "Checked in guest {} to room {} (booking {}, invoice {})",
            booking.guest_id,
            room.room_number,
            booking.id,
            invoice.invoice_number
        );
        self.publish_created(&booking);
        Ok((booking, invoice))
    }

    pub async fn get_booking(&self, id: Uuid) -> CoreResult<BookingView> {
        let booking = self.find(id).await?;
        let mut views = self.project(vec![booking]).await?;
        views.pop().ok_or_else(|| CoreError::not_found("Booking", id))
    }

    pub async fn list_bookings(&self, filter: BookingFilter) -> CoreResult<Vec<BookingView>> {
        let bookings = self.store.list_bookings(&filter).await?;
        self.project(bookings).await
    }

    pub async fn guest_bookings(&self, guest_id: Uuid) -> CoreResult<Vec<BookingView>> {
        self.load_guest(guest_id).await?;
        self.list_bookings(BookingFilter {
            guest_id: Some(guest_id),
            ..Default::default()
        })
        .await
    }

    pub async fn update_booking(&self, id: Uuid, patch: BookingPatch) -> CoreResult<Booking> {
        let mut booking = self.find(id).await?;
        let previous = booking.status;
        let effect = booking.apply_patch(patch, Utc::now())?;

        let room = self.load_room(booking.room_id).await?;
        check_capacity(&booking, &room)?;
        if effect == RoomEffect::Occupy && !room.status.accepts_check_in() {
            return Err(CoreError::RoomUnavailable);
        }

        self.store.update_booking(&booking, previous, effect).await?;

        if booking.status != previous {
            tracing::info!("Booking {} moved {} -> {}", booking.id, previous, booking.status);
            self.events.publish(HotelEvent::BookingStatusChanged {
                hotel_id: booking.hotel_id,
                booking_id: booking.id,
                from: previous.to_string(),
                to: booking.status.to_string(),
                timestamp: booking.updated_at,
            });
            if booking.status == BookingStatus::CheckedIn {
                self.publish_checked_in(&booking);
            }
        }
        Ok(booking)
    }

    pub async fn cancel_booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.update_booking(
            id,
            BookingPatch {
                status: Some(BookingStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete_booking(&self, id: Uuid) -> CoreResult<()> {
        let booking = self.find(id).await?;
        if booking.status == BookingStatus::CheckedIn {
            return Err(CoreError::Conflict(
                "Cannot delete a booking while the guest is checked in".to_string(),
            ));
        }
        self.store.delete_booking(&booking).await?;
        tracing::info!("Deleted booking {}", id);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> CoreResult<Booking> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", id))
    }

    async fn project(&self, bookings: Vec<Booking>) -> CoreResult<Vec<BookingView>> {
        let mut rooms: HashMap<Uuid, Option<RoomSummary>> = HashMap::new();
        let mut guests: HashMap<Uuid, Option<GuestSummary>> = HashMap::new();
        let mut views = Vec::with_capacity(bookings.len());

        for booking in bookings {
            if !rooms.contains_key(&booking.room_id) {
                let room = self.store.get_room(booking.room_id).await?;
                rooms.insert(booking.room_id, room.as_ref().map(RoomSummary::from));
            }
            if !guests.contains_key(&booking.guest_id) {
                let guest = self.store.get_guest(booking.guest_id).await?;
                guests.insert(booking.guest_id, guest.as_ref().map(GuestSummary::from));
            }
            views.push(BookingView {
                room: rooms.get(&booking.room_id).cloned().flatten(),
                guest: guests.get(&booking.guest_id).cloned().flatten(),
                booking,
            });
        }
        Ok(views)
    }

    fn publish_created(&self, booking: &Booking) {
        self.events.publish(HotelEvent::BookingCreated {
            hotel_id: booking.hotel_id,
            booking_id: booking.id,
            room_id: booking.room_id,
            status: booking.status.to_string(),
            timestamp: booking.created_at,
        });
        if booking.status == BookingStatus::CheckedIn {
            self.publish_checked_in(booking);
        }
    }

    fn publish_checked_in(&self, booking: &Booking) {
        self.events.publish(HotelEvent::GuestCheckedIn {
            hotel_id: booking.hotel_id,
            booking_id: booking.id,
            room_id: booking.room_id,
            guest_id: booking.guest_id,
            timestamp: booking.updated_at,
        });
    }
}

fn check_capacity(booking: &Booking, room: &Room) -> CoreResult<()> {
    if booking.guests() > room.capacity {
        return Err(CoreError::Validation(format!(
            "room {} holds {} guest(s), booking has {}",
            room.room_number,
            room.capacity,
            booking.guests()
        )));
    }
    Ok(())
}
