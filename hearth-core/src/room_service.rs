use hearth_folio::room_service::pending_total;
use hearth_folio::{ChargePatch, NewCharge, RoomServiceCharge};
use hearth_shared::HotelEvent;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::HotelStore;
use crate::{CoreError, CoreResult, EventBus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCharges {
    pub charges: Vec<RoomServiceCharge>,
    pub total: Decimal,
}

#[derive(Clone)]
pub struct RoomServiceLedger {
    store: Arc<dyn HotelStore>,
    events: EventBus,
}

impl RoomServiceLedger {
    pub fn new(store: Arc<dyn HotelStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Bills a POS order to the room of an active booking.
    pub async fn create_charge(&self, input: NewCharge) -> CoreResult<RoomServiceCharge> {
        let booking = self
            .store
            .get_booking(input.booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", input.booking_id))?;
        let charge = RoomServiceCharge::new(&booking, input)?;
        self.store.insert_charge(&charge).await?;

        tracing::info!(
            "Room-service charge {} of {} on booking {}",
            charge.id,
            charge.amount,
            charge.booking_id
        );
        self.events.publish(HotelEvent::RoomServiceCharged {
            hotel_id: charge.hotel_id,
            booking_id: charge.booking_id,
            charge_id: charge.id,
            amount: charge.amount,
            timestamp: charge.created_at,
        });
        Ok(charge)
    }

    pub async fn pending_charges(&self, booking_id: Uuid) -> CoreResult<PendingCharges> {
        let charges: Vec<RoomServiceCharge> = self
            .list_charges(booking_id)
            .await?
            .into_iter()
            .filter(RoomServiceCharge::is_pending)
            .collect();
        let total = pending_total(&charges);
        Ok(PendingCharges { charges, total })
    }

    pub async fn list_charges(&self, booking_id: Uuid) -> CoreResult<Vec<RoomServiceCharge>> {
        if self.store.get_booking(booking_id).await?.is_none() {
            return Err(CoreError::not_found("Booking", booking_id));
        }
        self.store.list_charges_for_booking(booking_id).await
    }

    pub async fn update_status(&self, id: Uuid, patch: ChargePatch) -> CoreResult<RoomServiceCharge> {
        let mut charge = self
            .store
            .get_charge(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room-service charge", id))?;
        charge.apply_patch(patch);
        self.store.save_charge(&charge).await?;
        tracing::info!("Charge {} set to {}", charge.id, charge.status.as_str());
        Ok(charge)
    }
}
