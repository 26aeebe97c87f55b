use chrono::{DateTime, Datelike, Duration, Utc};
use hearth_folio::analytics::{
    alerts, current_occupancy, monthly_occupancy, revenue_by_room_type, revenue_for_day, Alert, MonthlyOccupancy,
    OccupancySnapshot, RoomTypeRevenue,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::{BookingFilter, HotelStore, RoomFilter};
use crate::{CoreResult, HotelSettings};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub hotel_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub today_revenue: Decimal,
    pub occupancy: OccupancySnapshot,
    pub year: i32,
    pub monthly_occupancy: Vec<MonthlyOccupancy>,
    pub revenue_by_room_type: Vec<RoomTypeRevenue>,
    pub alerts: Vec<Alert>,
}

/// Read-only aggregations for manager dashboards.
#[derive(Clone)]
pub struct ReportingService {
    store: Arc<dyn HotelStore>,
    settings: Arc<HotelSettings>,
}

impl ReportingService {
    pub fn new(store: Arc<dyn HotelStore>, settings: Arc<HotelSettings>) -> Self {
        Self { store, settings }
    }

    pub async fn dashboard(&self, hotel_id: Uuid, year: Option<i32>, now: DateTime<Utc>) -> CoreResult<Dashboard> {
        let today = now.date_naive();
        let day_start = today.and_time(chrono::NaiveTime::MIN).and_utc();

        let rooms = self.store.list_rooms(hotel_id, &RoomFilter::default()).await?;
        let bookings = self
            .store
            .list_bookings(&BookingFilter {
                hotel_id: Some(hotel_id),
                ..Default::default()
            })
            .await?;
        let invoices = self
            .store
            .list_invoices_issued_between(hotel_id, day_start, day_start + Duration::days(1))
            .await?;

        let year = year.unwrap_or_else(|| now.year());
        Ok(Dashboard {
            hotel_id,
            generated_at: now,
            today_revenue: revenue_for_day(&invoices, today),
            occupancy: current_occupancy(&rooms),
            year,
            monthly_occupancy: monthly_occupancy(&bookings, rooms.len(), year, now),
            revenue_by_room_type: revenue_by_room_type(&rooms),
            alerts: alerts(&rooms, &bookings, today, self.settings.overbooking_horizon_days),
        })
    }
}
