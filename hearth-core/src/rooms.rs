use chrono::{DateTime, NaiveDate, Utc};
use hearth_property::availability::is_free;
use hearth_property::room::RevenueReport;
use hearth_property::{NewRoom, Room, RoomPatch, RoomStatus, RoomType, StayWindow};
use hearth_shared::HotelEvent;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::{BookingFilter, HotelStore, RoomFilter};
use crate::{CoreError, CoreResult, EventBus};

#[derive(Clone)]
pub struct RoomService {
    store: Arc<dyn HotelStore>,
    events: EventBus,
}

impl RoomService {
    pub fn new(store: Arc<dyn HotelStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub async fn create_room(&self, input: NewRoom) -> CoreResult<Room> {
        let room = Room::new(input)?;
        self.store.insert_room(&room).await?;
        tracing::info!("Created room {} ({}) for hotel {}", room.room_number, room.id, room.hotel_id);
        Ok(room)
    }

    pub async fn get_room(&self, id: Uuid) -> CoreResult<Room> {
        self.store
            .get_room(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room", id))
    }

    pub async fn list_rooms(&self, hotel_id: Uuid, filter: RoomFilter) -> CoreResult<Vec<Room>> {
        self.store.list_rooms(hotel_id, &filter).await
    }

    pub async fn update_room(&self, id: Uuid, patch: RoomPatch) -> CoreResult<Room> {
        let mut room = self.get_room(id).await?;
        room.apply_patch(patch)?;
        self.store.save_room(&room).await?;
        self.get_room(id).await
    }

    pub async fn delete_room(&self, id: Uuid) -> CoreResult<()> {
        if !self.store.delete_room(id).await? {
            return Err(CoreError::not_found("Room", id));
        }
        tracing::info!("Deleted room {}", id);
        Ok(())
    }

    /// Rooms currently `available`, optionally of one type, with no active
    /// booking overlapping `[check_in, check_out)` when both bounds are given.
    pub async fn find_available_rooms(
        &self,
        hotel_id: Uuid,
        check_in: Option<DateTime<Utc>>,
        check_out: Option<DateTime<Utc>>,
        room_type: Option<RoomType>,
    ) -> CoreResult<Vec<Room>> {
        let window = StayWindow::from_bounds(check_in, check_out)?;
        let rooms = self
            .store
            .list_rooms(
                hotel_id,
                &RoomFilter {
                    status: Some(RoomStatus::Available),
                    room_type,
                    floor: None,
                },
            )
            .await?;

        let Some(window) = window else {
            return Ok(rooms);
        };

        let bookings = self
            .store
            .list_bookings(&BookingFilter {
                hotel_id: Some(hotel_id),
                active_only: true,
                ..Default::default()
            })
            .await?;

        Ok(rooms
            .into_iter()
            .filter(|room| {
                let stays: Vec<StayWindow> = bookings
                    .iter()
                    .filter(|b| b.room_id == room.id)
                    .map(|b| b.window())
                    .collect();
                is_free(&window, &stays)
            })
            .collect())
    }

    pub async fn update_room_status(&self, id: Uuid, status: RoomStatus) -> CoreResult<Room> {
        let mut room = self.get_room(id).await?;
        let now = Utc::now();
        room.set_status(status, now);
        self.store.save_room_status(&room).await?;
        self.publish_status(&room);
        Ok(room)
    }

    pub async fn mark_cleaned(&self, id: Uuid) -> CoreResult<Room> {
        let mut room = self.get_room(id).await?;
        room.mark_cleaned(Utc::now());
        self.store.save_room_status(&room).await?;
        self.publish_status(&room);
        Ok(room)
    }

    pub async fn room_revenue(
        &self,
        id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<RevenueReport> {
        if let (Some(f), Some(t)) = (from, to) {
            if t < f {
                return Err(CoreError::Validation("'to' must not be before 'from'".to_string()));
            }
        }
        Ok(self.get_room(id).await?.revenue_between(from, to))
    }

    fn publish_status(&self, room: &Room) {
        self.events.publish(HotelEvent::RoomStatusChanged {
            hotel_id: room.hotel_id,
            room_id: room.id,
            status: room.status.as_str().to_string(),
            timestamp: room.updated_at,
        });
    }
}
