pub mod analytics;
pub mod booking;
pub mod invoice;
pub mod room_service;
pub mod totals;

pub use booking::{
    AddOn, Booking, BookingPatch, BookingSource, BookingStatus, NewBooking, PaymentInfo, PaymentMethod,
    PaymentStatus, RoomEffect,
};
pub use invoice::{Billing, BillingStatus, Invoice, InvoiceKind, LineItem, LineItemKind};
pub use room_service::{ChargePatch, ChargeStatus, NewCharge, RoomServiceCharge};
pub use totals::{checkout_line_items, compute_checkout_totals, quote_stay, CheckoutTotals};

#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("Cannot move booking from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Invalid booking: {0}")]
    InvalidBooking(String),
    #[error("Invalid charge: {0}")]
    InvalidCharge(String),
    #[error("{0}")]
    Closed(String),
}
