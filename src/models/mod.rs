pub mod flight;
pub mod price_update;
