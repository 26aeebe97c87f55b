use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::booking::{Booking, PaymentMethod};
use crate::FolioError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    RoomCharge,
    AddOn,
    RoomService,
    Tax,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "type")]
    pub kind: LineItemKind,
    pub description: String,
    pub amount: Decimal,
}

impl LineItem {
    pub fn new(kind: LineItemKind, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind,
            description: description.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Unpaid => "unpaid",
            BillingStatus::Partial => "partial",
            BillingStatus::Paid => "paid",
            BillingStatus::Refunded => "refunded",
        }
    }

    /// Status implied by how much of `total` has been paid.
    pub fn for_amounts(paid: Decimal, total: Decimal) -> Self {
        if paid >= total {
            BillingStatus::Paid
        } else if paid > Decimal::ZERO {
            BillingStatus::Partial
        } else {
            BillingStatus::Unpaid
        }
    }
}

impl FromStr for BillingStatus {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(BillingStatus::Unpaid),
            "partial" => Ok(BillingStatus::Partial),
            "paid" => Ok(BillingStatus::Paid),
            "refunded" => Ok(BillingStatus::Refunded),
            other => Err(FolioError::InvalidBooking(format!("unknown billing status '{}'", other))),
        }
    }
}

/// Which point of a stay an invoice was issued at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// Opening bill issued with the check-in.
    CheckIn,
    /// Final bill settled at checkout.
    #[default]
    Checkout,
}

impl InvoiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceKind::CheckIn => "check_in",
            InvoiceKind::Checkout => "checkout",
        }
    }
}

impl FromStr for InvoiceKind {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_in" => Ok(InvoiceKind::CheckIn),
            "checkout" => Ok(InvoiceKind::Checkout),
            other => Err(FolioError::InvalidBooking(format!("unknown invoice kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    pub method: PaymentMethod,
    pub paid_amount: Decimal,
    pub status: BillingStatus,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// A finalized bill. Never edited after issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub hotel_id: Uuid,
    pub booking_id: Uuid,
    pub guest_id: Uuid,
    pub room_id: Uuid,
    #[serde(default)]
    pub kind: InvoiceKind,
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub billing: Billing,
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    pub fn issue(
        kind: InvoiceKind,
        booking: &Booking,
        line_items: Vec<LineItem>,
        subtotal: Decimal,
        tax_amount: Decimal,
        billing: Billing,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            invoice_number: invoice_number(id, issued_at),
            hotel_id: booking.hotel_id,
            booking_id: booking.id,
            guest_id: booking.guest_id,
            room_id: booking.room_id,
            kind,
            line_items,
            subtotal,
            tax_amount,
            total_amount: subtotal + tax_amount,
            billing,
            issued_at,
        }
    }
}

/// `INV-YYYYMMDD-XXXXXXXX`, suffix taken from the invoice id.
pub fn invoice_number(id: Uuid, issued_at: DateTime<Utc>) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("INV-{}-{}", issued_at.format("%Y%m%d"), &simple[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_billing_status_for_amounts() {
        let total = Decimal::from(352);
        assert_eq!(BillingStatus::for_amounts(Decimal::ZERO, total), BillingStatus::Unpaid);
        assert_eq!(BillingStatus::for_amounts(Decimal::from(100), total), BillingStatus::Partial);
        assert_eq!(BillingStatus::for_amounts(total, total), BillingStatus::Paid);
    }

    #[test]
    fn test_invoice_number_format() {
        let id = Uuid::parse_str("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(invoice_number(id, at), "INV-20240309-3F2504E0");
    }

    #[test]
    fn test_line_item_serializes_type_field() {
        let item = LineItem::new(LineItemKind::RoomService, "Club sandwich", Decimal::from(20));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "room_service");
        assert_eq!(json["amount"], 20.0);
    }

    #[test]
    fn test_invoice_kind_parses_stored_names() {
        assert_eq!("check_in".parse::<InvoiceKind>().unwrap(), InvoiceKind::CheckIn);
        assert_eq!(InvoiceKind::Checkout.as_str().parse::<InvoiceKind>().unwrap(), InvoiceKind::Checkout);
        assert!("quote".parse::<InvoiceKind>().is_err());
    }
}
