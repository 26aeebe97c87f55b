pub mod availability;
pub mod guest;
pub mod room;

pub use availability::{ceil_days, StayWindow};
pub use guest::{Guest, GuestIdentity, GuestPatch, NewGuest, PersonalInfo};
pub use room::{DailyRevenue, NewRoom, Room, RoomPatch, RoomStatus, RoomType};

#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("Invalid room: {0}")]
    InvalidRoom(String),
    #[error("Invalid stay: {0}")]
    InvalidStay(String),
    #[error("Invalid guest: {0}")]
    InvalidGuest(String),
}
