use chrono::{Duration, Utc};
use hearth_core::bookings::CheckInRequest;
use hearth_core::checkout::{CheckoutReceipt, CheckoutRequest};
use hearth_core::payment::{CardDetails, FailurePolicy, PaymentOrchestrator, ScriptedOutcome, SimulatedGateway};
use hearth_core::repository::{BookingRepository, HotelStore, InvoiceRepository, RoomServiceRepository};
use hearth_core::{CoreError, EventBus, HotelSettings, Services};
use hearth_folio::{
    BillingStatus, BookingPatch, BookingSource, BookingStatus, ChargeStatus, NewBooking, NewCharge, PaymentInfo,
    PaymentMethod, RoomServiceCharge,
};
use hearth_property::{NewGuest, NewRoom, PersonalInfo, RoomStatus, RoomType};
use hearth_shared::Masked;
use hearth_store::MemoryStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

struct Hotel {
    id: Uuid,
    store: Arc<MemoryStore>,
    services: Services,
}

fn hotel_with_gateway(gateway: SimulatedGateway) -> Hotel {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = PaymentOrchestrator::new(Arc::new(gateway), FailurePolicy::FailClosed, "USD");
    let services = Services::new(
        store.clone() as Arc<dyn HotelStore>,
        orchestrator,
        HotelSettings::default(),
        EventBus::default(),
    );
    Hotel {
        id: Uuid::new_v4(),
        store,
        services,
    }
}

fn hotel() -> Hotel {
    hotel_with_gateway(SimulatedGateway::new())
}

fn dollars(value: i64) -> Decimal {
    Decimal::from(value)
}

fn personal_info(email: &str) -> PersonalInfo {
    PersonalInfo {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: Some(Masked::from(email)),
        phone: None,
        address: None,
        id_type: None,
        id_number: None,
        nationality: None,
        date_of_birth: None,
    }
}

impl Hotel {
    async fn room(&self, number: &str, price: i64) -> Uuid {
        self.services
            .rooms
            .create_room(NewRoom {
                hotel_id: self.id,
                room_number: number.to_string(),
                room_type: RoomType::Standard,
                floor: 1,
                bed_configuration: "queen".to_string(),
                capacity: 2,
                amenities: vec!["wifi".to_string()],
                price_per_night: dollars(price),
            })
            .await
            .unwrap()
            .id
    }

    async fn guest(&self, email: &str) -> Uuid {
        let (guest, _) = self
            .services
            .guests
            .create_guest(NewGuest {
                hotel_id: self.id,
                personal_info: personal_info(email),
                is_corporate: false,
                company_name: None,
            })
            .await
            .unwrap();
        guest.id
    }

    fn stay(&self, guest_id: Uuid, room_id: Uuid, arrived_hours_ago: i64, nights: i64) -> NewBooking {
        let check_in = Utc::now() - Duration::hours(arrived_hours_ago);
        NewBooking {
            hotel_id: self.id,
            guest_id,
            room_id,
            check_in,
            expected_check_out: check_in + Duration::days(nights),
            adults: 1,
            children: 0,
            add_ons: vec![],
            payment: PaymentInfo::default(),
            status: None,
            source: BookingSource::WalkIn,
            special_requests: None,
        }
    }

    async fn cash_checkout(&self, guest_id: Uuid, booking_id: Uuid) -> CheckoutReceipt {
        self.services
            .checkout
            .process_checkout(CheckoutRequest {
                user_id: guest_id,
                booking_id,
                payment_method: PaymentMethod::Cash,
                payment_details: None,
                room_service_ids: None,
            })
            .await
            .unwrap()
    }

    async fn check_in(&self, booking: NewBooking) -> Result<Uuid, CoreError> {
        let (booking, _) = self
            .services
            .bookings
            .check_in_guest(CheckInRequest {
                booking,
                total_amount: None,
                line_items: None,
            })
            .await?;
        Ok(booking.id)
    }
}

#[tokio::test]
async fn test_three_night_stay_with_room_service_checks_out_paid() {
    let hotel = hotel();
    let room_id = hotel.room("101", 100).await;
    let guest_id = hotel.guest("grace@example.com").await;
    // Arrived 71 hours ago: billed as three nights.
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 71, 3)).await.unwrap();

    let charge = hotel
        .services
        .room_service
        .create_charge(NewCharge {
            booking_id,
            order_id: Uuid::new_v4(),
            amount: dollars(20),
            description: Some("Club sandwich".to_string()),
        })
        .await
        .unwrap();

    let preview = hotel.services.checkout.checkout_details(guest_id).await.unwrap();
    assert_eq!(preview.summary.subtotal, dollars(320));
    assert_eq!(preview.room_services.len(), 1);

    let receipt = hotel
        .services
        .checkout
        .process_checkout(CheckoutRequest {
            user_id: guest_id,
            booking_id,
            payment_method: PaymentMethod::Cash,
            payment_details: None,
            room_service_ids: None,
        })
        .await
        .unwrap();

    assert_eq!(receipt.nights_stayed, 3);
    assert_eq!(receipt.room_revenue, dollars(300));
    assert_eq!(receipt.additional_revenue, dollars(20));
    assert_eq!(receipt.invoice.subtotal, dollars(320));
    assert_eq!(receipt.invoice.tax_amount, Decimal::new(3200, 2));
    assert_eq!(receipt.invoice.total_amount, Decimal::new(35200, 2));
    assert_eq!(receipt.payment_status, BillingStatus::Paid);

    let room = hotel.services.rooms.get_room(room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Cleaning);
    assert!(room.last_cleaned.is_none());
    assert_eq!(room.total_revenue(), dollars(320));

    let booking = hotel.services.bookings.get_booking(booking_id).await.unwrap().booking;
    assert_eq!(booking.status, BookingStatus::CheckedOut);
    assert!(booking.actual_check_out.is_some());

    let charge = hotel.store.get_charge(charge.id).await.unwrap().unwrap();
    assert_eq!(charge.status, ChargeStatus::Charged);
    assert!(charge.added_to_invoice);

    let guest = hotel.services.guests.get_guest(guest_id).await.unwrap();
    assert_eq!(guest.past_stays.len(), 1);
    assert_eq!(guest.billing_history.len(), 1);

    // Check-in invoice plus the checkout invoice.
    let invoices = hotel.services.checkout.list_invoices(booking_id).await.unwrap();
    assert_eq!(invoices.len(), 2);
}

#[tokio::test]
async fn test_declined_card_leaves_stay_open() {
    let hotel = hotel_with_gateway(SimulatedGateway::scripted([ScriptedOutcome::Decline(
        "Insufficient funds".to_string(),
    )]));
    let room_id = hotel.room("102", 100).await;
    let guest_id = hotel.guest("ada@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 2, 1)).await.unwrap();

    let request = CheckoutRequest {
        user_id: guest_id,
        booking_id,
        payment_method: PaymentMethod::CreditCard,
        payment_details: Some(CardDetails {
            card_number: Masked::from("4111111111111111"),
            expiration_date: "12/30".to_string(),
            cvv: Some(Masked::from("123")),
            cardholder_name: None,
        }),
        room_service_ids: None,
    };
    let result = hotel.services.checkout.process_checkout(request.clone()).await;
    assert!(matches!(result, Err(CoreError::Payment(_))));

    let booking = hotel.services.bookings.get_booking(booking_id).await.unwrap().booking;
    assert_eq!(booking.status, BookingStatus::CheckedIn);
    let room = hotel.services.rooms.get_room(room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Occupied);
    assert!(room.revenue_history.is_empty());
    assert_eq!(hotel.services.checkout.list_invoices(booking_id).await.unwrap().len(), 1);

    // The next attempt is approved.
    let receipt = hotel.services.checkout.process_checkout(request).await.unwrap();
    assert_eq!(receipt.payment_status, BillingStatus::Paid);
}

#[tokio::test]
async fn test_check_in_to_occupied_room_is_refused() {
    let hotel = hotel();
    let room_id = hotel.room("103", 120).await;
    let first = hotel.guest("first@example.com").await;
    let second = hotel.guest("second@example.com").await;

    hotel.check_in(hotel.stay(first, room_id, 1, 2)).await.unwrap();
    // A later, non-overlapping stay still cannot check in while the room is occupied.
    let mut later = hotel.stay(second, room_id, 1, 2);
    later.check_in = Utc::now() + Duration::days(5);
    later.expected_check_out = later.check_in + Duration::days(1);
    let result = hotel.check_in(later).await;
    assert!(matches!(result, Err(CoreError::RoomUnavailable)));

    let bookings = hotel
        .services
        .bookings
        .guest_bookings(second)
        .await
        .unwrap();
    assert!(bookings.is_empty());
}

#[tokio::test]
async fn test_overlapping_reservations_are_rejected() {
    let hotel = hotel();
    let room_id = hotel.room("104", 90).await;
    let guest_id = hotel.guest("overlap@example.com").await;

    let mut first = hotel.stay(guest_id, room_id, 0, 3);
    first.check_in = Utc::now() + Duration::days(10);
    first.expected_check_out = first.check_in + Duration::days(3);
    hotel.services.bookings.create_booking(first.clone()).await.unwrap();

    let mut clash = first.clone();
    clash.check_in = first.check_in + Duration::days(1);
    clash.expected_check_out = first.expected_check_out + Duration::days(1);
    let result = hotel.services.bookings.create_booking(clash).await;
    assert!(matches!(result, Err(CoreError::Conflict(_))));

    let mut adjacent = first.clone();
    adjacent.check_in = first.expected_check_out;
    adjacent.expected_check_out = first.expected_check_out + Duration::days(2);
    hotel.services.bookings.create_booking(adjacent).await.unwrap();
}

#[tokio::test]
async fn test_availability_skips_booked_and_unavailable_rooms() {
    let hotel = hotel();
    let free = hotel.room("201", 100).await;
    let booked = hotel.room("202", 100).await;
    let repairing = hotel.room("203", 100).await;
    let guest_id = hotel.guest("avail@example.com").await;

    let check_in = Utc::now() + Duration::days(3);
    let check_out = check_in + Duration::days(2);
    let mut reservation = hotel.stay(guest_id, booked, 0, 2);
    reservation.check_in = check_in;
    reservation.expected_check_out = check_out;
    hotel.services.bookings.create_booking(reservation).await.unwrap();
    hotel
        .services
        .rooms
        .update_room_status(repairing, RoomStatus::Maintenance)
        .await
        .unwrap();

    let rooms = hotel
        .services
        .rooms
        .find_available_rooms(hotel.id, Some(check_in), Some(check_out), None)
        .await
        .unwrap();
    let ids: Vec<Uuid> = rooms.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![free]);

    // Without dates only the room status matters.
    let rooms = hotel
        .services
        .rooms
        .find_available_rooms(hotel.id, None, None, None)
        .await
        .unwrap();
    assert_eq!(rooms.len(), 2);
}

#[tokio::test]
async fn test_guest_registration_is_deduplicated_by_email() {
    let hotel = hotel();
    let (first, created) = hotel
        .services
        .guests
        .create_guest(NewGuest {
            hotel_id: hotel.id,
            personal_info: personal_info("Grace@Example.com"),
            is_corporate: false,
            company_name: None,
        })
        .await
        .unwrap();
    assert!(created);

    let (second, created) = hotel
        .services
        .guests
        .create_guest(NewGuest {
            hotel_id: hotel.id,
            personal_info: personal_info("grace@example.com"),
            is_corporate: false,
            company_name: None,
        })
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
    assert_eq!(hotel.services.guests.list_guests(hotel.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_two_checkouts_on_one_day_accumulate_revenue() {
    let hotel = hotel();
    let room_id = hotel.room("301", 100).await;

    for email in ["one@example.com", "two@example.com"] {
        let guest_id = hotel.guest(email).await;
        let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 1, 1)).await.unwrap();
        hotel
            .services
            .checkout
            .process_checkout(CheckoutRequest {
                user_id: guest_id,
                booking_id,
                payment_method: PaymentMethod::Cash,
                payment_details: None,
                room_service_ids: None,
            })
            .await
            .unwrap();
        hotel.services.rooms.mark_cleaned(room_id).await.unwrap();
    }

    let report = hotel.services.rooms.room_revenue(room_id, None, None).await.unwrap();
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.room_revenue, dollars(200));
    assert_eq!(report.occupied_nights, 2);
    assert_eq!(report.average_daily_rate, dollars(100));
}

#[tokio::test]
async fn test_cancelling_checked_in_booking_is_refused() {
    let hotel = hotel();
    let room_id = hotel.room("401", 80).await;
    let guest_id = hotel.guest("cancel@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 1, 2)).await.unwrap();

    let result = hotel.services.bookings.cancel_booking(booking_id).await;
    assert!(matches!(result, Err(CoreError::Validation(_))));

    let booking = hotel.services.bookings.get_booking(booking_id).await.unwrap().booking;
    assert_eq!(booking.status, BookingStatus::CheckedIn);
    let room = hotel.services.rooms.get_room(room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Occupied);
}

#[tokio::test]
async fn test_cancelling_reservation_before_arrival() {
    let hotel = hotel();
    let room_id = hotel.room("402", 80).await;
    let guest_id = hotel.guest("plans@example.com").await;
    // Arrives in two days.
    let booking = hotel
        .services
        .bookings
        .create_booking(hotel.stay(guest_id, room_id, -48, 2))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Booked);

    let cancelled = hotel.services.bookings.cancel_booking(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    let room = hotel.services.rooms.get_room(room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Available);

    let again = hotel.services.bookings.cancel_booking(booking.id).await;
    assert!(matches!(again, Err(CoreError::Validation(_))));

    // The dates are free again.
    hotel
        .services
        .bookings
        .create_booking(hotel.stay(guest_id, room_id, -48, 2))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_patching_stay_to_checked_out_releases_room() {
    let hotel = hotel();
    let room_id = hotel.room("403", 80).await;
    let guest_id = hotel.guest("patch@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 5, 1)).await.unwrap();

    let booking = hotel
        .services
        .bookings
        .update_booking(
            booking_id,
            BookingPatch {
                status: Some(BookingStatus::CheckedOut),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::CheckedOut);
    assert!(booking.actual_check_out.is_some());

    let room = hotel.services.rooms.get_room(room_id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Available);
}

#[tokio::test]
async fn test_dashboard_counts_same_day_stay_once() {
    let hotel = hotel();
    let room_id = hotel.room("404", 100).await;
    let guest_id = hotel.guest("sameday@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 1, 1)).await.unwrap();

    let receipt = hotel.cash_checkout(guest_id, booking_id).await;
    assert_eq!(receipt.invoice.total_amount, dollars(110));

    let dashboard = hotel.services.reporting.dashboard(hotel.id, None, Utc::now()).await.unwrap();
    assert_eq!(dashboard.today_revenue, dollars(110));
}

#[tokio::test]
async fn test_deleting_closed_booking_removes_its_invoices() {
    let hotel = hotel();
    let room_id = hotel.room("405", 100).await;
    let guest_id = hotel.guest("history@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 1, 1)).await.unwrap();
    hotel.cash_checkout(guest_id, booking_id).await;
    assert_eq!(hotel.store.list_invoices_for_booking(booking_id).await.unwrap().len(), 2);

    hotel.services.bookings.delete_booking(booking_id).await.unwrap();

    let gone = hotel.services.bookings.get_booking(booking_id).await;
    assert!(matches!(gone, Err(CoreError::NotFound(_))));
    assert!(hotel.store.list_invoices_for_booking(booking_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_guest_and_room_deletable_once_stays_close() {
    let hotel = hotel();
    let room_id = hotel.room("406", 100).await;
    let guest_id = hotel.guest("leaving@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 1, 1)).await.unwrap();

    let guest = hotel.services.guests.delete_guest(guest_id).await;
    assert!(matches!(guest, Err(CoreError::Conflict(_))));
    let room = hotel.services.rooms.delete_room(room_id).await;
    assert!(matches!(room, Err(CoreError::Conflict(_))));

    hotel.cash_checkout(guest_id, booking_id).await;

    hotel.services.guests.delete_guest(guest_id).await.unwrap();
    hotel.services.rooms.delete_room(room_id).await.unwrap();
    assert!(matches!(
        hotel.services.guests.get_guest(guest_id).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(
        hotel.services.rooms.get_room(room_id).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(hotel.store.get_booking(booking_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_refuses_charge_on_closed_stay() {
    let hotel = hotel();
    let room_id = hotel.room("407", 100).await;
    let guest_id = hotel.guest("late@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 1, 1)).await.unwrap();
    let open = hotel.services.bookings.get_booking(booking_id).await.unwrap().booking;
    // Built while the stay was open, written after checkout.
    let late = RoomServiceCharge::new(
        &open,
        NewCharge {
            booking_id,
            order_id: Uuid::new_v4(),
            amount: dollars(15),
            description: Some("Nightcap".to_string()),
        },
    )
    .unwrap();

    hotel.cash_checkout(guest_id, booking_id).await;

    let result = hotel.store.insert_charge(&late).await;
    assert!(matches!(result, Err(CoreError::Conflict(_))));
    assert!(hotel.store.get_charge(late.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_checkout_of_selected_charges_leaves_the_rest_pending() {
    let hotel = hotel();
    let room_id = hotel.room("408", 100).await;
    let guest_id = hotel.guest("split@example.com").await;
    let booking_id = hotel.check_in(hotel.stay(guest_id, room_id, 1, 1)).await.unwrap();

    let mut charge_ids = Vec::new();
    for amount in [10, 30] {
        let charge = hotel
            .services
            .room_service
            .create_charge(NewCharge {
                booking_id,
                order_id: Uuid::new_v4(),
                amount: dollars(amount),
                description: None,
            })
            .await
            .unwrap();
        charge_ids.push(charge.id);
    }

    let receipt = hotel
        .services
        .checkout
        .process_checkout(CheckoutRequest {
            user_id: guest_id,
            booking_id,
            payment_method: PaymentMethod::Cash,
            payment_details: None,
            room_service_ids: Some(vec![charge_ids[0]]),
        })
        .await
        .unwrap();
    assert_eq!(receipt.additional_revenue, dollars(10));

    let skipped = hotel.store.get_charge(charge_ids[1]).await.unwrap().unwrap();
    assert!(skipped.is_pending());
}
