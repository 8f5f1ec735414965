pub mod admin;
pub mod api_router;
pub mod appointments;
pub mod auth;
pub mod config;
pub mod contact;
pub mod customers;
pub mod drive;
pub mod security;
pub mod shared;
pub mod site;
pub mod tickets;
