pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod payment;
pub mod purchase;
pub mod sale;
pub mod stock;
