pub mod ticket_provider;
