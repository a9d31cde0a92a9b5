pub mod unit_of_work;
pub use unit_of_work::{Store, UnitOfWork};
pub mod pg_store;
pub use pg_store::PgStore;
#[cfg(test)]
pub mod memory_store;

pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod purchase_repo;
pub use purchase_repo::PurchaseRepository;
pub mod sale_repo;
pub use sale_repo::SaleRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
