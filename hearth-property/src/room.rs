use chrono::{DateTime, NaiveDate, Utc};
use hearth_shared::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::PropertyError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Standard,
    Deluxe,
    Suite,
    Accessible,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Standard => "standard",
            RoomType::Deluxe => "deluxe",
            RoomType::Suite => "suite",
            RoomType::Accessible => "accessible",
        }
    }
}

impl FromStr for RoomType {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(RoomType::Standard),
            "deluxe" => Ok(RoomType::Deluxe),
            "suite" => Ok(RoomType::Suite),
            "accessible" => Ok(RoomType::Accessible),
            other => Err(PropertyError::InvalidRoom(format!("unknown room type '{}'", other))),
        }
    }
}

/// Physical state of a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
    Cleaning,
    OutOfOrder,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Maintenance => "maintenance",
            RoomStatus::Cleaning => "cleaning",
            RoomStatus::OutOfOrder => "out_of_order",
        }
    }

    /// Whether a guest may be put into the room right now.
    pub fn accepts_check_in(&self) -> bool {
        !matches!(
            self,
            RoomStatus::Occupied | RoomStatus::Maintenance | RoomStatus::OutOfOrder
        )
    }

    pub fn needs_attention(&self) -> bool {
        matches!(self, RoomStatus::Maintenance | RoomStatus::OutOfOrder)
    }
}

impl FromStr for RoomStatus {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(RoomStatus::Available),
            "occupied" => Ok(RoomStatus::Occupied),
            "maintenance" => Ok(RoomStatus::Maintenance),
            "cleaning" => Ok(RoomStatus::Cleaning),
            "out_of_order" => Ok(RoomStatus::OutOfOrder),
            other => Err(PropertyError::InvalidRoom(format!("unknown room status '{}'", other))),
        }
    }
}

/// Revenue accrued by a room on one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub room_revenue: Decimal,
    pub additional_revenue: Decimal,
    pub occupied_nights: u32,
    pub average_daily_rate: Decimal,
}

impl DailyRevenue {
    pub fn new(date: NaiveDate, room_revenue: Decimal, additional_revenue: Decimal, occupied_nights: u32) -> Self {
        Self {
            date,
            room_revenue,
            additional_revenue,
            occupied_nights,
            average_daily_rate: average_daily_rate(room_revenue, additional_revenue, occupied_nights),
        }
    }

    pub fn total(&self) -> Decimal {
        self.room_revenue + self.additional_revenue
    }

    /// Adds another posting for the same day and recomputes the rate.
    pub fn accumulate(&mut self, room_revenue: Decimal, additional_revenue: Decimal, occupied_nights: u32) {
        self.room_revenue += room_revenue;
        self.additional_revenue += additional_revenue;
        self.occupied_nights += occupied_nights;
        self.average_daily_rate = average_daily_rate(
            self.room_revenue,
            self.additional_revenue,
            self.occupied_nights,
        );
    }
}

/// `(room + additional) / nights`, zero when no nights were occupied.
pub fn average_daily_rate(room_revenue: Decimal, additional_revenue: Decimal, nights: u32) -> Decimal {
    if nights == 0 {
        return Decimal::ZERO;
    }
    round_money((room_revenue + additional_revenue) / Decimal::from(nights))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    pub floor: i32,
    pub bed_configuration: String,
    pub capacity: u32,
    pub amenities: Vec<String>,
    pub price_per_night: Decimal,
    pub status: RoomStatus,
    pub last_cleaned: Option<DateTime<Utc>>,
    pub revenue_history: Vec<DailyRevenue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when registering a room.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoom {
    pub hotel_id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    #[serde(default)]
    pub floor: i32,
    #[serde(default)]
    pub bed_configuration: String,
    pub capacity: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub price_per_night: Decimal,
}

/// Partial room update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    pub room_number: Option<String>,
    pub room_type: Option<RoomType>,
    pub floor: Option<i32>,
    pub bed_configuration: Option<String>,
    pub capacity: Option<u32>,
    pub amenities: Option<Vec<String>>,
    pub price_per_night: Option<Decimal>,
}

impl Room {
    pub fn new(input: NewRoom) -> Result<Self, PropertyError> {
        validate_number(&input.room_number)?;
        validate_capacity(input.capacity)?;
        validate_price(input.price_per_night)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            hotel_id: input.hotel_id,
            room_number: input.room_number.trim().to_string(),
            room_type: input.room_type,
            floor: input.floor,
            bed_configuration: input.bed_configuration,
            capacity: input.capacity,
            amenities: input.amenities,
            price_per_night: round_money(input.price_per_night),
            status: RoomStatus::Available,
            last_cleaned: None,
            revenue_history: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: RoomPatch) -> Result<(), PropertyError> {
        if let Some(number) = patch.room_number {
            validate_number(&number)?;
            self.room_number = number.trim().to_string();
        }
        if let Some(room_type) = patch.room_type {
            self.room_type = room_type;
        }
        if let Some(floor) = patch.floor {
            self.floor = floor;
        }
        if let Some(beds) = patch.bed_configuration {
            self.bed_configuration = beds;
        }
        if let Some(capacity) = patch.capacity {
            validate_capacity(capacity)?;
            self.capacity = capacity;
        }
        if let Some(amenities) = patch.amenities {
            self.amenities = amenities;
        }
        if let Some(price) = patch.price_per_night {
            validate_price(price)?;
            self.price_per_night = round_money(price);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Direct status change. Entering `cleaning` clears `last_cleaned`.
    pub fn set_status(&mut self, status: RoomStatus, now: DateTime<Utc>) {
        if status == RoomStatus::Cleaning {
            self.last_cleaned = None;
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn mark_cleaned(&mut self, now: DateTime<Utc>) {
        self.last_cleaned = Some(now);
        self.status = RoomStatus::Available;
        self.updated_at = now;
    }

    /// Accrues revenue for the calendar day containing `at`. An existing entry
    /// for that day accumulates; otherwise a new entry is appended.
    pub fn add_daily_revenue(
        &mut self,
        at: DateTime<Utc>,
        room_revenue: Decimal,
        additional_revenue: Decimal,
        occupied_nights: u32,
    ) {
        let date = at.date_naive();
        match self.revenue_history.iter_mut().find(|e| e.date == date) {
            Some(entry) => entry.accumulate(room_revenue, additional_revenue, occupied_nights),
            None => self
                .revenue_history
                .push(DailyRevenue::new(date, room_revenue, additional_revenue, occupied_nights)),
        }
        self.updated_at = at;
    }

    /// Revenue entries inside the inclusive date range, with totals.
    pub fn revenue_between(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> RevenueReport {
        let entries: Vec<DailyRevenue> = self
            .revenue_history
            .iter()
            .filter(|e| from.map_or(true, |f| e.date >= f) && to.map_or(true, |t| e.date <= t))
            .cloned()
            .collect();

        let room_revenue: Decimal = entries.iter().map(|e| e.room_revenue).sum();
        let additional_revenue: Decimal = entries.iter().map(|e| e.additional_revenue).sum();
        let occupied_nights: u32 = entries.iter().map(|e| e.occupied_nights).sum();

        RevenueReport {
            room_id: self.id,
            room_number: self.room_number.clone(),
            average_daily_rate: average_daily_rate(room_revenue, additional_revenue, occupied_nights),
            room_revenue,
            additional_revenue,
            occupied_nights,
            entries,
        }
    }

    pub fn total_revenue(&self) -> Decimal {
        self.revenue_history.iter().map(DailyRevenue::total).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub room_id: Uuid,
    pub room_number: String,
    pub room_revenue: Decimal,
    pub additional_revenue: Decimal,
    pub occupied_nights: u32,
    pub average_daily_rate: Decimal,
    pub entries: Vec<DailyRevenue>,
}

fn validate_number(number: &str) -> Result<(), PropertyError> {
    if number.trim().is_empty() {
        return Err(PropertyError::InvalidRoom("room number is required".to_string()));
    }
    Ok(())
}

fn validate_capacity(capacity: u32) -> Result<(), PropertyError> {
    if capacity == 0 {
        return Err(PropertyError::InvalidRoom("capacity must be at least 1".to_string()));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), PropertyError> {
    if price.is_sign_negative() {
        return Err(PropertyError::InvalidRoom("price per night cannot be negative".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_room() -> Room {
        Room::new(NewRoom {
            hotel_id: Uuid::new_v4(),
            room_number: "101".to_string(),
            room_type: RoomType::Deluxe,
            floor: 1,
            bed_configuration: "1 king".to_string(),
            capacity: 2,
            amenities: vec!["wifi".to_string()],
            price_per_night: Decimal::from(100),
        })
        .unwrap()
    }

    #[test]
    fn test_new_room_defaults_to_available() {
        let room = sample_room();
        assert_eq!(room.status, RoomStatus::Available);
        assert!(room.revenue_history.is_empty());
    }

    #[test]
    fn test_new_room_rejects_blank_number() {
        let result = Room::new(NewRoom {
            hotel_id: Uuid::new_v4(),
            room_number: "  ".to_string(),
            room_type: RoomType::Standard,
            floor: 0,
            bed_configuration: String::new(),
            capacity: 1,
            amenities: vec![],
            price_per_night: Decimal::from(50),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_revenue_accumulates_per_day() {
        let mut split = sample_room();
        let mut single = sample_room();
        let morning = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 5, 1, 21, 15, 0).unwrap();

        split.add_daily_revenue(morning, Decimal::from(300), Decimal::from(20), 3);
        split.add_daily_revenue(evening, Decimal::from(200), Decimal::from(30), 2);
        single.add_daily_revenue(morning, Decimal::from(500), Decimal::from(50), 5);

        assert_eq!(split.revenue_history.len(), 1);
        let a = &split.revenue_history[0];
        let b = &single.revenue_history[0];
        assert_eq!(a.room_revenue, b.room_revenue);
        assert_eq!(a.additional_revenue, b.additional_revenue);
        assert_eq!(a.occupied_nights, b.occupied_nights);
        assert_eq!(a.average_daily_rate, b.average_daily_rate);
        assert_eq!(a.average_daily_rate, Decimal::from(110));
        assert_eq!(a.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_revenue_new_day_appends() {
        let mut room = sample_room();
        room.add_daily_revenue(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(), Decimal::from(100), Decimal::ZERO, 1);
        room.add_daily_revenue(Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap(), Decimal::from(100), Decimal::ZERO, 1);
        assert_eq!(room.revenue_history.len(), 2);

        let report = room.revenue_between(NaiveDate::from_ymd_opt(2024, 5, 2), None);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.room_revenue, Decimal::from(100));
        assert_eq!(room.total_revenue(), Decimal::from(200));
    }

    #[test]
    fn test_zero_nights_rate_is_zero() {
        assert_eq!(average_daily_rate(Decimal::from(10), Decimal::ZERO, 0), Decimal::ZERO);
    }

    #[test]
    fn test_cleaning_cycle() {
        let mut room = sample_room();
        let now = Utc::now();
        room.mark_cleaned(now);
        assert_eq!(room.last_cleaned, Some(now));

        room.set_status(RoomStatus::Cleaning, now);
        assert_eq!(room.status, RoomStatus::Cleaning);
        assert!(room.last_cleaned.is_none());

        room.mark_cleaned(now);
        assert_eq!(room.status, RoomStatus::Available);
    }

    #[test]
    fn test_check_in_acceptance() {
        assert!(RoomStatus::Available.accepts_check_in());
        assert!(RoomStatus::Cleaning.accepts_check_in());
        assert!(!RoomStatus::Occupied.accepts_check_in());
        assert!(!RoomStatus::Maintenance.accepts_check_in());
        assert_eq!("out_of_order".parse::<RoomStatus>().unwrap(), RoomStatus::OutOfOrder);
    }
}
