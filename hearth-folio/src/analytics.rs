use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use hearth_property::{ceil_days, Room, RoomStatus, RoomType};
use hearth_shared::round_money;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::invoice::{Invoice, InvoiceKind};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySnapshot {
    pub total_rooms: usize,
    pub occupied: usize,
    pub available: usize,
    pub cleaning: usize,
    pub maintenance: usize,
    pub occupancy_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyOccupancy {
    pub month: u32,
    pub occupied_room_nights: u32,
    pub available_room_nights: u32,
    pub occupancy_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomTypeRevenue {
    pub room_type: RoomType,
    pub rooms: usize,
    pub room_revenue: Decimal,
    pub additional_revenue: Decimal,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    RoomOutOfService,
    Overbooking,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub room_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

fn percentage(part: u64, whole: u64) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    round_money(Decimal::from(part) * Decimal::from(100) / Decimal::from(whole))
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Sum of checkout invoice totals issued on `day`. Check-in invoices are
/// superseded by the checkout bill of the same stay and are not counted.
pub fn revenue_for_day(invoices: &[Invoice], day: NaiveDate) -> Decimal {
    invoices
        .iter()
        .filter(|i| i.kind == InvoiceKind::Checkout && i.issued_at.date_naive() == day)
        .map(|i| i.total_amount)
        .sum()
}

pub fn current_occupancy(rooms: &[Room]) -> OccupancySnapshot {
    let count = |status: RoomStatus| rooms.iter().filter(|r| r.status == status).count();
    let occupied = count(RoomStatus::Occupied);
    OccupancySnapshot {
        total_rooms: rooms.len(),
        occupied,
        available: count(RoomStatus::Available),
        cleaning: count(RoomStatus::Cleaning),
        maintenance: count(RoomStatus::Maintenance) + count(RoomStatus::OutOfOrder),
        occupancy_rate: percentage(occupied as u64, rooms.len() as u64),
    }
}

/// Room-nights `booking` spent inside `[start, end)`. Open stays run to `now`.
fn nights_within(booking: &Booking, start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let stay_end = booking.actual_check_out.unwrap_or(now);
    let from = booking.check_in.max(start);
    let to = stay_end.min(end);
    ceil_days(to - from)
}

/// Occupancy for every month of `year`:
/// `occupied room-nights / (rooms × days in month) × 100`.
pub fn monthly_occupancy(
    bookings: &[Booking],
    total_rooms: usize,
    year: i32,
    now: DateTime<Utc>,
) -> Vec<MonthlyOccupancy> {
    let stays: Vec<&Booking> = bookings
        .iter()
        .filter(|b| matches!(b.status, BookingStatus::CheckedIn | BookingStatus::CheckedOut))
        .collect();

    (1..=12u32)
        .filter_map(|month| {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)?
            };
            let days = (next - first).num_days() as u32;
            let (start, end) = (day_start(first), day_start(next));

            let occupied: u32 = stays.iter().map(|b| nights_within(b, start, end, now)).sum();
            let available = total_rooms as u32 * days;

            Some(MonthlyOccupancy {
                month,
                occupied_room_nights: occupied,
                available_room_nights: available,
                occupancy_rate: percentage(occupied as u64, available as u64),
            })
        })
        .collect()
}

pub fn revenue_by_room_type(rooms: &[Room]) -> Vec<RoomTypeRevenue> {
    let mut grouped: BTreeMap<&'static str, RoomTypeRevenue> = BTreeMap::new();
    for room in rooms {
        let entry = grouped.entry(room.room_type.as_str()).or_insert_with(|| RoomTypeRevenue {
            room_type: room.room_type,
            rooms: 0,
            room_revenue: Decimal::ZERO,
            additional_revenue: Decimal::ZERO,
            total_revenue: Decimal::ZERO,
        });
        entry.rooms += 1;
        for day in &room.revenue_history {
            entry.room_revenue += day.room_revenue;
            entry.additional_revenue += day.additional_revenue;
        }
        entry.total_revenue = entry.room_revenue + entry.additional_revenue;
    }
    grouped.into_values().collect()
}

/// Derived alerts: rooms out of service, and days within `horizon_days` of
/// `today` where active bookings outnumber rooms.
pub fn alerts(rooms: &[Room], bookings: &[Booking], today: NaiveDate, horizon_days: u32) -> Vec<Alert> {
    let mut out = Vec::new();

    for room in rooms.iter().filter(|r| r.status.needs_attention()) {
        out.push(Alert {
            kind: AlertKind::RoomOutOfService,
            severity: if room.status == RoomStatus::OutOfOrder { Severity::Critical } else { Severity::Warning },
            message: format!("Room {} is {}", room.room_number, room.status.as_str()),
            room_id: Some(room.id),
            date: None,
        });
    }

    let active: Vec<&Booking> = bookings.iter().filter(|b| b.is_active()).collect();
    for offset in 0..horizon_days {
        let date = today + Duration::days(offset as i64);
        let start = day_start(date);
        let end = start + Duration::days(1);
        let booked = active
            .iter()
            .filter(|b| b.check_in < end && b.expected_check_out > start)
            .count();
        if booked > rooms.len() {
            out.push(Alert {
                kind: AlertKind::Overbooking,
                severity: Severity::Critical,
                message: format!("{} bookings for {} rooms on {}", booked, rooms.len(), date),
                room_id: None,
                date: Some(date),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingSource, NewBooking, PaymentInfo, PaymentMethod};
    use crate::invoice::{Billing, BillingStatus};
    use chrono::TimeZone;
    use hearth_property::NewRoom;

    fn room(number: &str, room_type: RoomType) -> Room {
        Room::new(NewRoom {
            hotel_id: Uuid::nil(),
            room_number: number.to_string(),
            room_type,
            floor: 1,
            bed_configuration: String::new(),
            capacity: 2,
            amenities: vec![],
            price_per_night: Decimal::from(100),
        })
        .unwrap()
    }

    fn stay(check_in: DateTime<Utc>, check_out: DateTime<Utc>, status: BookingStatus) -> Booking {
        let mut b = Booking::new(NewBooking {
            hotel_id: Uuid::nil(),
            guest_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            check_in,
            expected_check_out: check_out,
            adults: 1,
            children: 0,
            add_ons: vec![],
            payment: PaymentInfo::default(),
            status: None,
            source: BookingSource::WalkIn,
            special_requests: None,
        })
        .unwrap();
        b.status = status;
        if status == BookingStatus::CheckedOut {
            b.actual_check_out = Some(check_out);
        }
        b
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_monthly_occupancy_splits_across_months() {
        let now = at(2024, 12, 31);
        let bookings = vec![
            stay(at(2024, 1, 30), at(2024, 2, 3), BookingStatus::CheckedOut),
            stay(at(2024, 2, 10), at(2024, 2, 12), BookingStatus::Cancelled),
        ];
        let months = monthly_occupancy(&bookings, 2, 2024, now);

        assert_eq!(months.len(), 12);
        assert_eq!(months[0].occupied_room_nights, 2);
        assert_eq!(months[0].available_room_nights, 62);
        assert_eq!(months[1].occupied_room_nights, 2);
        assert_eq!(months[1].available_room_nights, 58); // leap year
        assert_eq!(months[1].occupancy_rate, round_money(Decimal::from(200) / Decimal::from(58)));
        assert_eq!(months[2].occupied_room_nights, 0);
    }

    #[test]
    fn test_open_stay_runs_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let bookings = vec![stay(at(2024, 3, 1), at(2024, 3, 20), BookingStatus::CheckedIn)];
        let months = monthly_occupancy(&bookings, 1, 2024, now);
        assert_eq!(months[2].occupied_room_nights, 5);
    }

    #[test]
    fn test_no_rooms_means_zero_rate() {
        let months = monthly_occupancy(&[], 0, 2024, Utc::now());
        assert!(months.iter().all(|m| m.occupancy_rate == Decimal::ZERO));
    }

    #[test]
    fn test_current_occupancy() {
        let mut rooms = vec![room("1", RoomType::Standard), room("2", RoomType::Standard), room("3", RoomType::Suite), room("4", RoomType::Suite)];
        rooms[0].status = RoomStatus::Occupied;
        rooms[1].status = RoomStatus::Maintenance;
        let snapshot = current_occupancy(&rooms);
        assert_eq!(snapshot.occupied, 1);
        assert_eq!(snapshot.maintenance, 1);
        assert_eq!(snapshot.occupancy_rate, Decimal::from(25));
    }

    #[test]
    fn test_revenue_by_room_type() {
        let mut suite = room("3", RoomType::Suite);
        suite.add_daily_revenue(at(2024, 4, 1), Decimal::from(400), Decimal::from(50), 2);
        let rooms = vec![room("1", RoomType::Standard), suite];
        let report = revenue_by_room_type(&rooms);
        let suites = report.iter().find(|r| r.room_type == RoomType::Suite).unwrap();
        assert_eq!(suites.total_revenue, Decimal::from(450));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_alerts() {
        let mut rooms = vec![room("1", RoomType::Standard)];
        rooms[0].status = RoomStatus::OutOfOrder;
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let bookings = vec![
            stay(at(2024, 7, 2), at(2024, 7, 4), BookingStatus::Booked),
            stay(at(2024, 7, 3), at(2024, 7, 5), BookingStatus::Booked),
        ];
        let found = alerts(&rooms, &bookings, today, 7);

        assert_eq!(found.iter().filter(|a| a.kind == AlertKind::RoomOutOfService).count(), 1);
        let overbooked: Vec<NaiveDate> = found
            .iter()
            .filter(|a| a.kind == AlertKind::Overbooking)
            .filter_map(|a| a.date)
            .collect();
        assert_eq!(overbooked, vec![NaiveDate::from_ymd_opt(2024, 7, 3).unwrap()]);
    }

    #[test]
    fn test_revenue_for_day_is_empty_without_invoices() {
        assert_eq!(revenue_for_day(&[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()), Decimal::ZERO);
    }

    #[test]
    fn test_revenue_for_day_counts_each_stay_once() {
        let issued = Utc.with_ymd_and_hms(2024, 5, 2, 15, 0, 0).unwrap();
        let booking = stay(at(2024, 5, 1), at(2024, 5, 2), BookingStatus::CheckedOut);
        let bill = |kind: InvoiceKind, status: BillingStatus| {
            Invoice::issue(
                kind,
                &booking,
                vec![],
                Decimal::from(100),
                Decimal::from(10),
                Billing {
                    method: PaymentMethod::Cash,
                    paid_amount: Decimal::ZERO,
                    status,
                    transaction_id: None,
                    paid_at: None,
                },
                issued,
            )
        };
        let invoices = vec![
            bill(InvoiceKind::CheckIn, BillingStatus::Unpaid),
            bill(InvoiceKind::Checkout, BillingStatus::Paid),
        ];

        assert_eq!(revenue_for_day(&invoices, issued.date_naive()), Decimal::from(110));
        assert_eq!(revenue_for_day(&invoices, at(2024, 5, 3).date_naive()), Decimal::ZERO);
    }
}
