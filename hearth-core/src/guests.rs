use hearth_property::{Guest, GuestIdentity, GuestPatch, NewGuest};
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::HotelStore;
use crate::{CoreError, CoreResult};

#[derive(Clone)]
pub struct GuestService {
    store: Arc<dyn HotelStore>,
}

impl GuestService {
    pub fn new(store: Arc<dyn HotelStore>) -> Self {
        Self { store }
    }

    /// Registers a guest, or returns the hotel's existing guest sharing an
    /// email, phone or ID number. The flag is `true` when a guest was inserted.
    pub async fn create_guest(&self, input: NewGuest) -> CoreResult<(Guest, bool)> {
        let guest = Guest::new(input)?;
        let identity = GuestIdentity::of(&guest.personal_info);

        if !identity.is_empty() {
            if let Some(existing) = self
                .store
                .find_guest_by_identity(guest.hotel_id, &identity)
                .await?
            {
                tracing::debug!("Guest already registered as {}", existing.id);
                return Ok((existing, false));
            }
        }

        self.store.insert_guest(&guest).await?;
        tracing::info!("Registered guest {} for hotel {}", guest.id, guest.hotel_id);
        Ok((guest, true))
    }

    pub async fn get_guest(&self, id: Uuid) -> CoreResult<Guest> {
        self.store
            .get_guest(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Guest", id))
    }

    pub async fn list_guests(&self, hotel_id: Uuid) -> CoreResult<Vec<Guest>> {
        self.store.list_guests(hotel_id).await
    }

    pub async fn search_guests(&self, hotel_id: Uuid, query: &str) -> CoreResult<Vec<Guest>> {
        if query.trim().is_empty() {
            return Err(CoreError::Validation("search query is required".to_string()));
        }
        self.store.search_guests(hotel_id, query.trim()).await
    }

    pub async fn update_guest(&self, id: Uuid, patch: GuestPatch) -> CoreResult<Guest> {
        let mut guest = self.get_guest(id).await?;
        guest.apply_patch(patch)?;
        self.store.save_guest(&guest).await?;
        Ok(guest)
    }

    pub async fn delete_guest(&self, id: Uuid) -> CoreResult<()> {
        if !self.store.delete_guest(id).await? {
            return Err(CoreError::not_found("Guest", id));
        }
        tracing::info!("Deleted guest {}", id);
        Ok(())
    }

    pub async fn add_note(&self, id: Uuid, text: String, author: Option<String>) -> CoreResult<Guest> {
        let mut guest = self.get_guest(id).await?;
        guest.add_note(text, author)?;
        self.store.save_guest(&guest).await?;
        Ok(guest)
    }
}
