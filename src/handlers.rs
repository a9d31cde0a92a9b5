pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod purchases;
pub mod sales;
pub mod settings;
pub mod stock;
pub mod webhooks;
