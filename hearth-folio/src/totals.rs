use chrono::{DateTime, Utc};
use hearth_property::{ceil_days, Room};
use hearth_shared::round_money;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::booking::Booking;
use crate::invoice::{LineItem, LineItemKind};
use crate::room_service::RoomServiceCharge;

/// Bill for a stay. Shared by the checkout preview and checkout processing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotals {
    pub nights_stayed: u32,
    pub room_rate: Decimal,
    pub room_charge_total: Decimal,
    pub room_service_total: Decimal,
    pub add_on_total: Decimal,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub already_paid: Decimal,
    pub remaining_balance: Decimal,
}

impl CheckoutTotals {
    /// Revenue beyond the room rate: room service plus add-ons.
    pub fn additional_revenue(&self) -> Decimal {
        self.room_service_total + self.add_on_total
    }
}

/// Nights billed when leaving at `now`: whole days since check-in rounded up,
/// never less than one.
pub fn nights_stayed(booking: &Booking, now: DateTime<Utc>) -> u32 {
    ceil_days(now - booking.check_in).max(1)
}

/// Computes the checkout bill. Only charges that are still pending count.
pub fn compute_checkout_totals(
    booking: &Booking,
    room: &Room,
    pending_charges: &[RoomServiceCharge],
    tax_rate: Decimal,
    now: DateTime<Utc>,
) -> CheckoutTotals {
    let room_service_total = pending_charges
        .iter()
        .filter(|c| c.is_pending() && c.booking_id == booking.id)
        .map(|c| c.amount)
        .sum();
    build_totals(
        nights_stayed(booking, now),
        room.price_per_night,
        room_service_total,
        booking.add_on_total(),
        tax_rate,
        booking.payment.paid_amount,
    )
}

/// Quote for the planned stay, used for the check-in invoice.
pub fn quote_stay(booking: &Booking, room: &Room, tax_rate: Decimal) -> CheckoutTotals {
    build_totals(
        booking.window().nights().max(1),
        room.price_per_night,
        Decimal::ZERO,
        booking.add_on_total(),
        tax_rate,
        booking.payment.paid_amount,
    )
}

fn build_totals(
    nights: u32,
    room_rate: Decimal,
    room_service_total: Decimal,
    add_on_total: Decimal,
    tax_rate: Decimal,
    already_paid: Decimal,
) -> CheckoutTotals {
    let room_charge_total = round_money(room_rate * Decimal::from(nights));
    let room_service_total = round_money(room_service_total);
    let subtotal = room_charge_total + room_service_total + add_on_total;
    let tax_amount = round_money(subtotal * tax_rate);
    let grand_total = subtotal + tax_amount;
    let remaining_balance = (grand_total - already_paid).max(Decimal::ZERO);

    CheckoutTotals {
        nights_stayed: nights,
        room_rate,
        room_charge_total,
        room_service_total,
        add_on_total,
        subtotal,
        tax_rate,
        tax_amount,
        grand_total,
        already_paid,
        remaining_balance,
    }
}

/// Invoice lines in billing order: room charge, tax, each room-service
/// charge, each add-on.
pub fn checkout_line_items(
    totals: &CheckoutTotals,
    booking: &Booking,
    charges: &[RoomServiceCharge],
) -> Vec<LineItem> {
    let mut items = vec![
        LineItem::new(
            LineItemKind::RoomCharge,
            format!("Room charge ({} night(s) @ {})", totals.nights_stayed, totals.room_rate),
            totals.room_charge_total,
        ),
        LineItem::new(
            LineItemKind::Tax,
            format!("Tax ({}%)", (totals.tax_rate * Decimal::from(100)).normalize()),
            totals.tax_amount,
        ),
    ];

    for charge in charges.iter().filter(|c| c.is_pending() && c.booking_id == booking.id) {
        let description = charge
            .description
            .clone()
            .unwrap_or_else(|| format!("Room service order {}", charge.order_id));
        items.push(LineItem::new(LineItemKind::RoomService, description, charge.amount));
    }

    for add_on in &booking.add_ons {
        items.push(LineItem::new(LineItemKind::AddOn, add_on.name.clone(), add_on.cost));
    }

    items
}
