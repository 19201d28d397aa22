pub mod session_registry;
pub mod session_service;
