use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_core::repository::{
    BookingFilter, BookingRepository, CheckoutCommit, CheckoutRepository, GuestRepository, HotelStore,
    InvoiceRepository, RoomFilter, RoomRepository, RoomServiceRepository,
};
use hearth_core::{CoreError, CoreResult};
use hearth_folio::{Booking, BookingStatus, Invoice, RoomEffect, RoomServiceCharge};
use hearth_property::{Guest, GuestIdentity, Room, RoomStatus};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    rooms: HashMap<Uuid, Room>,
    guests: HashMap<Uuid, Guest>,
    bookings: HashMap<Uuid, Booking>,
    charges: HashMap<Uuid, RoomServiceCharge>,
    invoices: HashMap<Uuid, Invoice>,
}

impl State {
    fn room_mut(&mut self, id: Uuid) -> CoreResult<&mut Room> {
        self.rooms
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Room", id))
    }

    fn number_taken(&self, room: &Room) -> bool {
        self.rooms
            .values()
            .any(|r| r.id != room.id && r.hotel_id == room.hotel_id && r.room_number == room.room_number)
    }

    fn overlaps_active(&self, booking: &Booking) -> bool {
        let window = booking.window();
        self.bookings.values().any(|b| {
            b.id != booking.id && b.room_id == booking.room_id && b.is_active() && window.overlaps(&b.window())
        })
    }

    fn occupy(&mut self, room_id: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
        let room = self.room_mut(room_id)?;
        if !room.status.accepts_check_in() {
            return Err(CoreError::RoomUnavailable);
        }
        room.set_status(RoomStatus::Occupied, now);
        Ok(())
    }

    /// Drops matching bookings with their charges and invoices.
    fn remove_bookings_where(&mut self, doomed: impl Fn(&Booking) -> bool) {
        let ids: Vec<Uuid> = self.bookings.values().filter(|b| doomed(b)).map(|b| b.id).collect();
        for id in &ids {
            self.bookings.remove(id);
        }
        self.charges.retain(|_, c| !ids.contains(&c.booking_id));
        self.invoices.retain(|_, i| !ids.contains(&i.booking_id));
    }

    /// Frees the room unless another checked-in booking still holds it.
    fn release(&mut self, room_id: Uuid, booking_id: Uuid, now: DateTime<Utc>) {
        let still_held = self
            .bookings
            .values()
            .any(|b| b.id != booking_id && b.room_id == room_id && b.status == BookingStatus::CheckedIn);
        if let Some(room) = self.rooms.get_mut(&room_id) {
            if room.status == RoomStatus::Occupied && !still_held {
                room.set_status(RoomStatus::Available, now);
            }
        }
    }
}

/// Store kept in process memory. Used by tests and when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn overlap_conflict() -> CoreError {
    CoreError::Conflict("Room is already booked for the selected dates".to_string())
}

fn closed_booking(booking: &Booking) -> CoreError {
    CoreError::Conflict(format!(
        "Booking {} is {} and cannot take room-service charges",
        booking.id, booking.status
    ))
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn insert_room(&self, room: &Room) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if state.number_taken(room) {
            return Err(CoreError::Conflict(format!("Room number {} already exists", room.room_number)));
        }
        state.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn get_room(&self, id: Uuid) -> CoreResult<Option<Room>> {
        Ok(self.state.read().await.rooms.get(&id).cloned())
    }

    async fn list_rooms(&self, hotel_id: Uuid, filter: &RoomFilter) -> CoreResult<Vec<Room>> {
        let state = self.state.read().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|r| r.hotel_id == hotel_id && filter.matches(r))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.room_number.cmp(&b.room_number));
        Ok(rooms)
    }

    async fn save_room(&self, room: &Room) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if state.number_taken(room) {
            return Err(CoreError::Conflict(format!("Room number {} already exists", room.room_number)));
        }
        let stored = state.room_mut(room.id)?;
        let mut updated = room.clone();
        updated.status = stored.status;
        updated.last_cleaned = stored.last_cleaned;
        updated.revenue_history = std::mem::take(&mut stored.revenue_history);
        *stored = updated;
        Ok(())
    }

    async fn save_room_status(&self, room: &Room) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let stored = state.room_mut(room.id)?;
        stored.status = room.status;
        stored.last_cleaned = room.last_cleaned;
        stored.updated_at = room.updated_at;
        Ok(())
    }

    async fn delete_room(&self, id: Uuid) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        if state.bookings.values().any(|b| b.room_id == id && b.is_active()) {
            return Err(CoreError::Conflict("Room has active bookings".to_string()));
        }
        state.remove_bookings_where(|b| b.room_id == id);
        Ok(state.rooms.remove(&id).is_some())
    }
}

#[async_trait]
impl GuestRepository for MemoryStore {
    async fn insert_guest(&self, guest: &Guest) -> CoreResult<()> {
        self.state.write().await.guests.insert(guest.id, guest.clone());
        Ok(())
    }

    async fn get_guest(&self, id: Uuid) -> CoreResult<Option<Guest>> {
        Ok(self.state.read().await.guests.get(&id).cloned())
    }

    async fn find_guest_by_identity(
        &self,
        hotel_id: Uuid,
        identity: &GuestIdentity,
    ) -> CoreResult<Option<Guest>> {
        let state = self.state.read().await;
        Ok(state
            .guests
            .values()
            .filter(|g| g.hotel_id == hotel_id && g.matches_identity(identity))
            .min_by_key(|g| g.created_at)
            .cloned())
    }

    async fn list_guests(&self, hotel_id: Uuid) -> CoreResult<Vec<Guest>> {
        let state = self.state.read().await;
        let mut guests: Vec<Guest> = state.guests.values().filter(|g| g.hotel_id == hotel_id).cloned().collect();
        guests.sort_by_key(|g| g.created_at);
        Ok(guests)
    }

    async fn search_guests(&self, hotel_id: Uuid, query: &str) -> CoreResult<Vec<Guest>> {
        let mut guests = self.list_guests(hotel_id).await?;
        guests.retain(|g| g.matches_query(query));
        Ok(guests)
    }

    async fn save_guest(&self, guest: &Guest) -> CoreResult<()> {
        let mut state = self.state.write().await;
        match state.guests.get_mut(&guest.id) {
            Some(stored) => {
                let past_stays = std::mem::take(&mut stored.past_stays);
                let billing_history = std::mem::take(&mut stored.billing_history);
                *stored = guest.clone();
                stored.past_stays = past_stays;
                stored.billing_history = billing_history;
                Ok(())
            }
            None => Err(CoreError::not_found("Guest", guest.id)),
        }
    }

    async fn delete_guest(&self, id: Uuid) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        if state.bookings.values().any(|b| b.guest_id == id && b.is_active()) {
            return Err(CoreError::Conflict("Guest has active bookings".to_string()));
        }
        state.remove_bookings_where(|b| b.guest_id == id);
        Ok(state.guests.remove(&id).is_some())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state.bookings.values().filter(|b| filter.matches(b)).cloned().collect();
        bookings.sort_by_key(|b| b.check_in);
        Ok(bookings)
    }

    async fn insert_booking(&self, booking: &Booking, invoice: Option<&Invoice>) -> CoreResult<()> {
        let mut state = self.state.write().await;
        state.room_mut(booking.room_id)?;
        if booking.is_active() && state.overlaps_active(booking) {
            return Err(overlap_conflict());
        }
        if booking.status == BookingStatus::CheckedIn {
            state.occupy(booking.room_id, booking.created_at)?;
        }
        state.bookings.insert(booking.id, booking.clone());
        if let Some(invoice) = invoice {
            state.invoices.insert(invoice.id, invoice.clone());
        }
        Ok(())
    }

    async fn update_booking(
        &self,
        booking: &Booking,
        expected: BookingStatus,
        effect: RoomEffect,
    ) -> CoreResult<()> {
        let mut state = self.state.write().await;
        match state.bookings.get(&booking.id) {
            Some(current) if current.status == expected => {}
            Some(_) => {
                return Err(CoreError::Conflict(format!(
                    "Booking {} was changed by another request",
                    booking.id
                )))
            }
            None => return Err(CoreError::not_found("Booking", booking.id)),
        }
        if booking.is_active() && state.overlaps_active(booking) {
            return Err(overlap_conflict());
        }

        match effect {
            RoomEffect::Occupy => state.occupy(booking.room_id, booking.updated_at)?,
            RoomEffect::Release | RoomEffect::None => {}
        }
        state.bookings.insert(booking.id, booking.clone());
        if effect == RoomEffect::Release {
            state.release(booking.room_id, booking.id, booking.updated_at);
        }
        Ok(())
    }

    async fn delete_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut state = self.state.write().await;
        match state.bookings.get(&booking.id) {
            Some(current) if current.status == BookingStatus::CheckedIn => {
                return Err(CoreError::Conflict(
                    "Cannot delete a booking while the guest is checked in".to_string(),
                ))
            }
            Some(_) => {}
            None => return Err(CoreError::not_found("Booking", booking.id)),
        }

        state.remove_bookings_where(|b| b.id == booking.id);
        state.release(booking.room_id, booking.id, Utc::now());
        Ok(())
    }
}

#[async_trait]
impl RoomServiceRepository for MemoryStore {
    async fn insert_charge(&self, charge: &RoomServiceCharge) -> CoreResult<()> {
        let mut state = self.state.write().await;
        match state.bookings.get(&charge.booking_id) {
            Some(booking) if booking.is_active() => {}
            Some(booking) => return Err(closed_booking(booking)),
            None => return Err(CoreError::not_found("Booking", charge.booking_id)),
        }
        state.charges.insert(charge.id, charge.clone());
        Ok(())
    }

    async fn get_charge(&self, id: Uuid) -> CoreResult<Option<RoomServiceCharge>> {
        Ok(self.state.read().await.charges.get(&id).cloned())
    }

    async fn list_charges_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<RoomServiceCharge>> {
        let state = self.state.read().await;
        let mut charges: Vec<RoomServiceCharge> = state
            .charges
            .values()
            .filter(|c| c.booking_id == booking_id)
            .cloned()
            .collect();
        charges.sort_by_key(|c| c.created_at);
        Ok(charges)
    }

    async fn save_charge(&self, charge: &RoomServiceCharge) -> CoreResult<()> {
        let mut state = self.state.write().await;
        match state.charges.get_mut(&charge.id) {
            Some(stored) => {
                *stored = charge.clone();
                Ok(())
            }
            None => Err(CoreError::not_found("Room-service charge", charge.id)),
        }
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn get_invoice(&self, id: Uuid) -> CoreResult<Option<Invoice>> {
        Ok(self.state.read().await.invoices.get(&id).cloned())
    }

    async fn list_invoices_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Invoice>> {
        let state = self.state.read().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.booking_id == booking_id)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.issued_at);
        Ok(invoices)
    }

    async fn list_invoices_issued_between(
        &self,
        hotel_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Invoice>> {
        let state = self.state.read().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|i| i.hotel_id == hotel_id && i.issued_at >= from && i.issued_at < to)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.issued_at);
        Ok(invoices)
    }
}

#[async_trait]
impl CheckoutRepository for MemoryStore {
    async fn commit_checkout(&self, commit: &CheckoutCommit) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let booking = &commit.booking;
        let now = commit.revenue.at;

        // Validate every guard before touching anything.
        match state.bookings.get(&booking.id) {
            Some(current) if current.status == BookingStatus::CheckedIn => {}
            Some(_) => return Err(CoreError::Conflict("Booking is no longer checked in".to_string())),
            None => return Err(CoreError::not_found("Booking", booking.id)),
        }
        let all_pending = commit.charge_ids.iter().all(|id| {
            state
                .charges
                .get(id)
                .is_some_and(|c| c.booking_id == booking.id && c.is_pending())
        });
        let unbilled = commit.bills_all_pending
            && state
                .charges
                .values()
                .any(|c| c.booking_id == booking.id && c.is_pending() && !commit.charge_ids.contains(&c.id));
        if !all_pending || unbilled {
            return Err(CoreError::Conflict(
                "Room-service charges changed during checkout".to_string(),
            ));
        }
        state.room_mut(booking.room_id)?;
        if !state.guests.contains_key(&booking.guest_id) {
            return Err(CoreError::not_found("Guest", booking.guest_id));
        }

        state.bookings.insert(booking.id, booking.clone());
        for id in &commit.charge_ids {
            if let Some(charge) = state.charges.get_mut(id) {
                charge.mark_invoiced(now);
            }
        }
        state.invoices.insert(commit.invoice.id, commit.invoice.clone());

        let room = state.room_mut(booking.room_id)?;
        room.set_status(RoomStatus::Cleaning, now);
        room.add_daily_revenue(
            now,
            commit.revenue.room_revenue,
            commit.revenue.additional_revenue,
            commit.revenue.occupied_nights,
        );

        if let Some(guest) = state.guests.get_mut(&booking.guest_id) {
            guest.record_stay(commit.stay.clone(), commit.billing.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl HotelStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hearth_folio::{BookingSource, NewBooking, NewCharge, PaymentInfo};
    use hearth_property::{NewRoom, RoomType};
    use rust_decimal::Decimal;

    fn room(hotel_id: Uuid, number: &str) -> Room {
        Room::new(NewRoom {
            hotel_id,
            room_number: number.to_string(),
            room_type: RoomType::Deluxe,
            floor: 3,
            bed_configuration: "king".to_string(),
            capacity: 2,
            amenities: vec![],
            price_per_night: Decimal::from(150),
        })
        .unwrap()
    }

    fn booking(room: &Room, days_from_now: i64, nights: i64, status: BookingStatus) -> Booking {
        let check_in = Utc::now() + Duration::days(days_from_now);
        Booking::new(NewBooking {
            hotel_id: room.hotel_id,
            guest_id: Uuid::new_v4(),
            room_id: room.id,
            check_in,
            expected_check_out: check_in + Duration::days(nights),
            adults: 1,
            children: 0,
            add_ons: vec![],
            payment: PaymentInfo::default(),
            status: Some(status),
            source: BookingSource::Website,
            special_requests: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_room_number_conflicts() {
        let store = MemoryStore::new();
        let hotel = Uuid::new_v4();
        store.insert_room(&room(hotel, "101")).await.unwrap();

        let result = store.insert_room(&room(hotel, "101")).await;
        assert!(matches!(result, Err(CoreError::Conflict(_))));
        // Same number in another hotel is fine
        store.insert_room(&room(Uuid::new_v4(), "101")).await.unwrap();
    }

    #[tokio::test]
    async fn test_overlapping_active_booking_rejected() {
        let store = MemoryStore::new();
        let r = room(Uuid::new_v4(), "201");
        store.insert_room(&r).await.unwrap();

        store.insert_booking(&booking(&r, 1, 3, BookingStatus::Booked), None).await.unwrap();
        let clash = store.insert_booking(&booking(&r, 2, 3, BookingStatus::Booked), None).await;
        assert!(matches!(clash, Err(CoreError::Conflict(_))));

        // Back-to-back stays do not overlap
        store.insert_booking(&booking(&r, 4, 2, BookingStatus::Booked), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_checked_in_insert_occupies_room_once() {
        let store = MemoryStore::new();
        let r = room(Uuid::new_v4(), "301");
        store.insert_room(&r).await.unwrap();

        store
            .insert_booking(&booking(&r, 0, 2, BookingStatus::CheckedIn), None)
            .await
            .unwrap();
        assert_eq!(store.get_room(r.id).await.unwrap().unwrap().status, RoomStatus::Occupied);

        let second = store
            .insert_booking(&booking(&r, 10, 2, BookingStatus::CheckedIn), None)
            .await;
        assert!(matches!(second, Err(CoreError::RoomUnavailable)));
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let store = MemoryStore::new();
        let r = room(Uuid::new_v4(), "401");
        store.insert_room(&r).await.unwrap();
        let mut b = booking(&r, 1, 2, BookingStatus::Booked);
        store.insert_booking(&b, None).await.unwrap();

        b.transition(BookingStatus::Cancelled, Utc::now()).unwrap();
        store
            .update_booking(&b, BookingStatus::Booked, RoomEffect::Release)
            .await
            .unwrap();
        let again = store.update_booking(&b, BookingStatus::Booked, RoomEffect::Release).await;
        assert!(matches!(again, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_room_edit_keeps_status_written_since_read() {
        let store = MemoryStore::new();
        let r = room(Uuid::new_v4(), "501");
        store.insert_room(&r).await.unwrap();
        let mut stale = store.get_room(r.id).await.unwrap().unwrap();

        store
            .insert_booking(&booking(&r, 0, 2, BookingStatus::CheckedIn), None)
            .await
            .unwrap();

        stale.price_per_night = Decimal::from(180);
        store.save_room(&stale).await.unwrap();

        let stored = store.get_room(r.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RoomStatus::Occupied);
        assert_eq!(stored.price_per_night, Decimal::from(180));
    }

    #[tokio::test]
    async fn test_status_write_leaves_room_fields_alone() {
        let store = MemoryStore::new();
        let r = room(Uuid::new_v4(), "502");
        store.insert_room(&r).await.unwrap();

        let mut changed = r.clone();
        changed.price_per_night = Decimal::from(999);
        changed.set_status(RoomStatus::Maintenance, Utc::now());
        store.save_room_status(&changed).await.unwrap();

        let stored = store.get_room(r.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RoomStatus::Maintenance);
        assert_eq!(stored.price_per_night, Decimal::from(150));
    }

    #[tokio::test]
    async fn test_charge_needs_a_stored_booking() {
        let store = MemoryStore::new();
        let r = room(Uuid::new_v4(), "601");
        store.insert_room(&r).await.unwrap();
        let b = booking(&r, 0, 1, BookingStatus::CheckedIn);
        let charge = RoomServiceCharge::new(
            &b,
            NewCharge {
                booking_id: b.id,
                order_id: Uuid::new_v4(),
                amount: Decimal::from(12),
                description: None,
            },
        )
        .unwrap();

        let result = store.insert_charge(&charge).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
