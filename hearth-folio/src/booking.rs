use chrono::{DateTime, Utc};
use hearth_property::StayWindow;
use hearth_shared::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::FolioError;

/// Booking lifecycle: `booked → checked_in → checked_out`, `booked → cancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Holds the room for its stay window.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Booked | BookingStatus::CheckedIn)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Booked, BookingStatus::CheckedIn)
                | (BookingStatus::Booked, BookingStatus::Cancelled)
                | (BookingStatus::CheckedIn, BookingStatus::CheckedOut)
        )
    }

    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Booked, BookingStatus::CheckedIn];
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(BookingStatus::Booked),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "checked_out" => Ok(BookingStatus::CheckedOut),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(FolioError::InvalidBooking(format!("unknown booking status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    #[default]
    WalkIn,
    Phone,
    Website,
    Ota,
    Corporate,
    Other,
}

impl BookingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingSource::WalkIn => "walk_in",
            BookingSource::Phone => "phone",
            BookingSource::Website => "website",
            BookingSource::Ota => "ota",
            BookingSource::Corporate => "corporate",
            BookingSource::Other => "other",
        }
    }
}

impl FromStr for BookingSource {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walk_in" => Ok(BookingSource::WalkIn),
            "phone" => Ok(BookingSource::Phone),
            "website" => Ok(BookingSource::Website),
            "ota" => Ok(BookingSource::Ota),
            "corporate" => Ok(BookingSource::Corporate),
            "other" => Ok(BookingSource::Other),
            other => Err(FolioError::InvalidBooking(format!("unknown booking source '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    pub fn is_card(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::DebitCard)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Refunded,
    Failed,
}

/// Payment snapshot embedded in a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub security_deposit: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub transaction_id: Option<String>,
}

impl PaymentInfo {
    fn validate(&self) -> Result<(), FolioError> {
        if self.security_deposit.is_sign_negative()
            || self.total_amount.is_sign_negative()
            || self.paid_amount.is_sign_negative()
        {
            return Err(FolioError::InvalidBooking(
                "payment amounts cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub name: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub guest_id: Uuid,
    pub room_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub expected_check_out: DateTime<Utc>,
    pub actual_check_out: Option<DateTime<Utc>>,
    pub adults: u32,
    pub children: u32,
    pub add_ons: Vec<AddOn>,
    pub payment: PaymentInfo,
    pub status: BookingStatus,
    pub source: BookingSource,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_adults() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub hotel_id: Uuid,
    pub guest_id: Uuid,
    pub room_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub expected_check_out: DateTime<Utc>,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub add_ons: Vec<AddOn>,
    #[serde(default)]
    pub payment: PaymentInfo,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub source: BookingSource,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub check_in: Option<DateTime<Utc>>,
    pub expected_check_out: Option<DateTime<Utc>>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub add_ons: Option<Vec<AddOn>>,
    pub payment: Option<PaymentInfo>,
    pub special_requests: Option<String>,
    pub status: Option<BookingStatus>,
}

/// What a booking change does to its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEffect {
    None,
    /// Room must accept a check-in and becomes occupied.
    Occupy,
    /// Room goes back to available if this booking was occupying it.
    Release,
}

impl Booking {
    pub fn new(input: NewBooking) -> Result<Self, FolioError> {
        let status = input.status.unwrap_or(BookingStatus::Booked);
        if !status.is_active() {
            return Err(FolioError::InvalidBooking(format!(
                "a booking cannot be created with status {}",
                status
            )));
        }
        StayWindow::new(input.check_in, input.expected_check_out)
            .map_err(|e| FolioError::InvalidBooking(e.to_string()))?;
        if input.adults == 0 {
            return Err(FolioError::InvalidBooking("at least one adult is required".to_string()));
        }
        validate_add_ons(&input.add_ons)?;
        input.payment.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            hotel_id: input.hotel_id,
            guest_id: input.guest_id,
            room_id: input.room_id,
            check_in: input.check_in,
            expected_check_out: input.expected_check_out,
            actual_check_out: None,
            adults: input.adults,
            children: input.children,
            add_ons: input.add_ons,
            payment: input.payment,
            status,
            source: input.source,
            special_requests: input.special_requests,
            created_at: now,
            updated_at: now,
        })
    }

    /// Planned stay, `[check_in, expected_check_out)`.
    pub fn window(&self) -> StayWindow {
        StayWindow {
            check_in: self.check_in,
            check_out: self.expected_check_out,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn guests(&self) -> u32 {
        self.adults + self.children
    }

    pub fn add_on_total(&self) -> Decimal {
        round_money(self.add_ons.iter().map(|a| a.cost).sum())
    }

    /// Moves the booking to `next`, returning the effect on its room.
    /// Re-applying the current status is a no-op.
    pub fn transition(&mut self, next: BookingStatus, now: DateTime<Utc>) -> Result<RoomEffect, FolioError> {
        if self.status == next {
            return Ok(RoomEffect::None);
        }
        if !self.status.can_transition_to(next) {
            return Err(FolioError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        let effect = match next {
            BookingStatus::CheckedIn => RoomEffect::Occupy,
            BookingStatus::CheckedOut => {
                if self.actual_check_out.is_none() {
                    self.actual_check_out = Some(now);
                }
                RoomEffect::Release
            }
            BookingStatus::Cancelled => RoomEffect::Release,
            BookingStatus::Booked => RoomEffect::None,
        };
        self.status = next;
        self.updated_at = now;
        Ok(effect)
    }

    /// Applies a field patch; a status change goes through [`Booking::transition`].
    pub fn apply_patch(&mut self, patch: BookingPatch, now: DateTime<Utc>) -> Result<RoomEffect, FolioError> {
        if self.status.is_terminal() {
            return Err(FolioError::Closed(format!(
                "booking {} is {} and can no longer be changed",
                self.id, self.status
            )));
        }

        if let Some(check_in) = patch.check_in {
            if self.status != BookingStatus::Booked && check_in != self.check_in {
                return Err(FolioError::InvalidBooking(
                    "check-in date can only change before the guest arrives".to_string(),
                ));
            }
            self.check_in = check_in;
        }
        if let Some(check_out) = patch.expected_check_out {
            self.expected_check_out = check_out;
        }
        StayWindow::new(self.check_in, self.expected_check_out)
            .map_err(|e| FolioError::InvalidBooking(e.to_string()))?;

        if let Some(adults) = patch.adults {
            if adults == 0 {
                return Err(FolioError::InvalidBooking("at least one adult is required".to_string()));
            }
            self.adults = adults;
        }
        if let Some(children) = patch.children {
            self.children = children;
        }
        if let Some(add_ons) = patch.add_ons {
            validate_add_ons(&add_ons)?;
            self.add_ons = add_ons;
        }
        if let Some(payment) = patch.payment {
            payment.validate()?;
            self.payment = payment;
        }
        if let Some(requests) = patch.special_requests {
            self.special_requests = Some(requests);
        }
        self.updated_at = now;

        match patch.status {
            Some(next) => self.transition(next, now),
            None => Ok(RoomEffect::None),
        }
    }
}

fn validate_add_ons(add_ons: &[AddOn]) -> Result<(), FolioError> {
    for add_on in add_ons {
        if add_on.name.trim().is_empty() {
            return Err(FolioError::InvalidBooking("add-on name is required".to_string()));
        }
        if add_on.cost.is_sign_negative() {
            return Err(FolioError::InvalidBooking(format!(
                "add-on '{}' has a negative cost",
                add_on.name
            )));
        }
    }
    Ok(())
}
