#[cfg(test)]
pub mod mock_db;
pub mod postgres_price_update_repository;
pub mod price_update_repository;
