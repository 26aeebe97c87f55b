pub mod bookings;
pub mod checkout;
pub mod events;
pub mod guests;
pub mod payment;
pub mod reporting;
pub mod repository;
pub mod room_service;
pub mod rooms;
pub mod settings;

use hearth_folio::FolioError;
use hearth_property::PropertyError;
use std::sync::Arc;

pub use events::EventBus;
pub use repository::HotelStore;
pub use settings::HotelSettings;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Room is not available for check-in")]
    RoomUnavailable,
    #[error("{0}")]
    Payment(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{} {} not found", entity, id))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<PropertyError> for CoreError {
    fn from(err: PropertyError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<FolioError> for CoreError {
    fn from(err: FolioError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Application services wired over one store.
#[derive(Clone)]
pub struct Services {
    pub rooms: rooms::RoomService,
    pub guests: guests::GuestService,
    pub bookings: bookings::BookingService,
    pub room_service: room_service::RoomServiceLedger,
    pub checkout: checkout::CheckoutService,
    pub reporting: reporting::ReportingService,
}

impl Services {
    pub fn new(
        store: Arc<dyn HotelStore>,
        orchestrator: payment::PaymentOrchestrator,
        settings: HotelSettings,
        events: EventBus,
    ) -> Self {
        let settings = Arc::new(settings);
        Self {
            rooms: rooms::RoomService::new(store.clone(), events.clone()),
            guests: guests::GuestService::new(store.clone()),
            bookings: bookings::BookingService::new(store.clone(), settings.clone(), events.clone()),
            room_service: room_service::RoomServiceLedger::new(store.clone(), events.clone()),
            checkout: checkout::CheckoutService::new(
                store.clone(),
                Arc::new(orchestrator),
                settings.clone(),
                events,
            ),
            reporting: reporting::ReportingService::new(store, settings),
        }
    }
}
