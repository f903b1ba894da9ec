pub mod status;
pub mod types;

pub use status::{InvalidStatus, PaymentStatus, ShippingStatus};
pub use types::OrderId;
