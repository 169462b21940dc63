pub mod client_service;
pub mod status_service;
