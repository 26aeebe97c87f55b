use chrono::{DateTime, Utc};
use hearth_folio::totals::{checkout_line_items, compute_checkout_totals, CheckoutTotals};
use hearth_folio::{
    Billing, BillingStatus, Booking, BookingStatus, Invoice, InvoiceKind, PaymentMethod, PaymentStatus,
    RoomServiceCharge,
};
use hearth_property::guest::{BillingRecord, StaySummary};
use hearth_property::{Guest, Room};
use hearth_shared::HotelEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::payment::{CardDetails, PaymentOrchestrator};
use crate::repository::{BookingFilter, CheckoutCommit, HotelStore, RevenuePosting};
use crate::{CoreError, CoreResult, EventBus, HotelSettings};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Guest closing the stay.
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_details: Option<CardDetails>,
    /// Charges to fold into the invoice. All pending charges when absent.
    #[serde(default, rename = "roomServices", alias = "roomServiceIds")]
    pub room_service_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub invoice: Invoice,
    pub payment_status: BillingStatus,
    pub checkout_date: DateTime<Utc>,
    pub nights_stayed: u32,
    pub room_revenue: Decimal,
    pub additional_revenue: Decimal,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    pub guest: Guest,
    pub booking: Booking,
    pub room: Room,
    pub room_services: Vec<RoomServiceCharge>,
    pub summary: CheckoutTotals,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn HotelStore>,
    payments: Arc<PaymentOrchestrator>,
    settings: Arc<HotelSettings>,
    events: EventBus,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn HotelStore>,
        payments: Arc<PaymentOrchestrator>,
        settings: Arc<HotelSettings>,
        events: EventBus,
    ) -> Self {
        Self { store, payments, settings, events }
    }

    async fn load_room(&self, id: Uuid) -> CoreResult<Room> {
        self.store
            .get_room(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room", id))
    }

    /// Charges of `booking` still open, restricted to `ids` when given.
    async fn open_charges(&self, booking: &Booking, ids: Option<&[Uuid]>) -> CoreResult<Vec<RoomServiceCharge>> {
        let charges = self.store.list_charges_for_booking(booking.id).await?;
        Ok(charges
            .into_iter()
            .filter(|c| c.booking_id == booking.id && c.is_pending())
            .filter(|c| ids.map_or(true, |ids| ids.contains(&c.id)))
            .collect())
    }

    /// Settles and closes a checked-in stay. Payment happens before anything is
    /// written; a failed payment leaves every record untouched.
    pub async fn process_checkout(&self, request: CheckoutRequest) -> CoreResult<CheckoutReceipt> {
        let mut booking = self
            .store
            .get_booking(request.booking_id)
            .await?
            .filter(|b| b.guest_id == request.user_id && b.status == BookingStatus::CheckedIn)
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "No checked-in booking {} for guest {}",
                    request.booking_id, request.user_id
                ))
            })?;
        let room = self.load_room(booking.room_id).await?;
        let charges = self
            .open_charges(&booking, request.room_service_ids.as_deref())
            .await?;

        let now = Utc::now();
        let totals = compute_checkout_totals(
            &booking,
            &room,
            &charges,
            self.settings.tax_rate_for(booking.hotel_id),
            now,
        );
        let line_items = checkout_line_items(&totals, &booking, &charges);

        let settlement = self
            .payments
            .settle(
                request.payment_method,
                totals.remaining_balance,
                request.payment_details.as_ref(),
                &format!("Room {} stay, booking {}", room.room_number, booking.id),
            )
            .await?;

        let paid_amount = totals.already_paid + settlement.amount_charged;
        let transaction_id = settlement
            .transaction_id
            .clone()
            .or_else(|| booking.payment.transaction_id.clone());

        let invoice = Invoice::issue(
            InvoiceKind::Checkout,
            &booking,
            line_items,
            totals.subtotal,
            totals.tax_amount,
            Billing {
                method: request.payment_method,
                paid_amount,
                status: BillingStatus::Paid,
                transaction_id: transaction_id.clone(),
                paid_at: Some(now),
            },
            now,
        );

        booking.payment.method = request.payment_method;
        booking.payment.status = PaymentStatus::Paid;
        booking.payment.total_amount = totals.grand_total;
        booking.payment.paid_amount = paid_amount;
        booking.payment.transaction_id = transaction_id;
        booking.actual_check_out = Some(now);
        booking.transition(BookingStatus::CheckedOut, now)?;

        let commit = CheckoutCommit {
            stay: StaySummary {
                booking_id: booking.id,
                room_number: room.room_number.clone(),
                check_in: booking.check_in,
                check_out: now,
                nights: totals.nights_stayed,
                total_amount: totals.grand_total,
            },
            billing: BillingRecord {
                invoice_id: invoice.id,
                amount: invoice.total_amount,
                method: request.payment_method.as_str().to_string(),
                paid_at: now,
            },
            revenue: RevenuePosting {
                at: now,
                room_revenue: totals.room_charge_total,
                additional_revenue: totals.additional_revenue(),
                occupied_nights: totals.nights_stayed,
            },
            charge_ids: charges.iter().map(|c| c.id).collect(),
            bills_all_pending: request.room_service_ids.is_none(),
            invoice,
            booking,
        };

        if let Err(err) = self.store.commit_checkout(&commit).await {
            if settlement.amount_charged > Decimal::ZERO {
                tracing::error!(
                    "Checkout commit for booking {} failed after collecting {} (transaction {:?}): {}",
                    commit.booking.id,
                    settlement.amount_charged,
                    settlement.transaction_id,
                    err
                );
            }
            return Err(err);
        }

        tracing::info!(
            "Checked out booking {} from room {}: {} night(s), total {}",
            commit.booking.id,
            room.room_number,
            totals.nights_stayed,
            totals.grand_total
        );
        self.events.publish(HotelEvent::GuestCheckedOut {
            hotel_id: commit.booking.hotel_id,
            booking_id: commit.booking.id,
            room_id: commit.booking.room_id,
            invoice_id: commit.invoice.id,
            total_amount: commit.invoice.total_amount,
            timestamp: now,
        });

        Ok(CheckoutReceipt {
            payment_status: commit.invoice.billing.status,
            checkout_date: now,
            nights_stayed: totals.nights_stayed,
            room_revenue: totals.room_charge_total,
            additional_revenue: totals.additional_revenue(),
            total_revenue: totals.grand_total,
            invoice: commit.invoice,
        })
    }

    /// Read-only preview of what checking out now would bill.
    pub async fn checkout_details(&self, user_id: Uuid) -> CoreResult<CheckoutDetails> {
        let guest = self
            .store
            .get_guest(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Guest", user_id))?;
        let booking = self
            .store
            .list_bookings(&BookingFilter {
                guest_id: Some(user_id),
                status: Some(BookingStatus::CheckedIn),
                ..Default::default()
            })
            .await?
            .into_iter()
            .max_by_key(|b| b.check_in)
            .ok_or_else(|| CoreError::NotFound(format!("No checked-in booking for guest {}", user_id)))?;
        let room = self.load_room(booking.room_id).await?;
        let room_services = self.open_charges(&booking, None).await?;
        let summary = compute_checkout_totals(
            &booking,
            &room,
            &room_services,
            self.settings.tax_rate_for(booking.hotel_id),
            Utc::now(),
        );

        Ok(CheckoutDetails {
            guest,
            booking,
            room,
            room_services,
            summary,
        })
    }

    pub async fn get_invoice(&self, id: Uuid) -> CoreResult<Invoice> {
        self.store
            .get_invoice(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", id))
    }

    pub async fn list_invoices(&self, booking_id: Uuid) -> CoreResult<Vec<Invoice>> {
        if self.store.get_booking(booking_id).await?.is_none() {
            return Err(CoreError::not_found("Booking", booking_id));
        }
        self.store.list_invoices_for_booking(booking_id).await
    }
}
