pub mod auth;
pub mod stock_ledger;
pub mod stock_service;
pub mod purchase_service;
pub mod sale_service;
pub mod payment_gateway;
pub mod payment_webhook;
pub mod catalog_service;
pub mod dashboard_service;
