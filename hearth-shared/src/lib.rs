pub mod models;
pub mod money;
pub mod pii;

pub use models::events::HotelEvent;
pub use money::round_money;
pub use pii::Masked;
