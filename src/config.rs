// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CatalogRepository, DashboardRepository, PgStore, PurchaseRepository, SaleRepository,
        SettingsRepository, StockRepository, Store,
    },
    services::{
        auth::AuthService,
        catalog_service::CatalogService,
        dashboard_service::DashboardService,
        payment_gateway::{MercadoPagoClient, PaymentGateway},
        payment_webhook::PaymentWebhookService,
        purchase_service::PurchaseService,
        sale_service::SaleService,
        stock_ledger::StockLedger,
        stock_service::StockService,
    },
};

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub payment_gateway_url: String,
    pub payment_gateway_timeout: Duration,
    pub payment_webhook_secret: Option<String>,
    pub payer_email_domain: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DB_MAX_CONNECTIONS inválido")?
            .unwrap_or(5);

        let timeout_secs = env::var("PAYMENT_GATEWAY_TIMEOUT_SECS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("PAYMENT_GATEWAY_TIMEOUT_SECS inválido")?
            .unwrap_or(10);

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections,
            payment_gateway_url: env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "https://api.mercadopago.com".to_string()),
            payment_gateway_timeout: Duration::from_secs(timeout_secs),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            payer_email_domain: env::var("PAYER_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "fitcell.local".to_string()),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("db_max_connections", &self.db_max_connections)
            .field("payment_gateway_url", &self.payment_gateway_url)
            .field("payment_gateway_timeout", &self.payment_gateway_timeout)
            .field("payment_webhook_secret", &self.payment_webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("payer_email_domain", &self.payer_email_domain)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,

    // Repositórios de leitura
    pub stock_repo: StockRepository,
    pub purchase_repo: PurchaseRepository,
    pub sale_repo: SaleRepository,
    pub settings_repo: SettingsRepository,

    // Serviços
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub stock_service: StockService,
    pub purchase_service: PurchaseService,
    pub sale_service: SaleService,
    pub webhook_service: PaymentWebhookService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let gateway: Arc<dyn PaymentGateway> = Arc::new(MercadoPagoClient::new(
            config.payment_gateway_url.clone(),
            config.payment_gateway_timeout,
        )?);
        let ledger = StockLedger::new();
        let sale_service = SaleService::new(ledger.clone(), gateway.clone(), config.payer_email_domain.clone());

        Ok(Self {
            store: Arc::new(PgStore::new(db_pool.clone())),
            stock_repo: StockRepository::new(db_pool.clone()),
            purchase_repo: PurchaseRepository::new(db_pool.clone()),
            sale_repo: SaleRepository::new(db_pool.clone()),
            settings_repo: SettingsRepository::new(db_pool.clone()),
            auth_service: AuthService::new(config.jwt_secret.clone()),
            catalog_service: CatalogService::new(CatalogRepository::new(db_pool.clone())),
            stock_service: StockService::new(ledger.clone()),
            purchase_service: PurchaseService::new(ledger),
            webhook_service: PaymentWebhookService::new(sale_service.clone(), gateway),
            sale_service,
            dashboard_service: DashboardService::new(DashboardRepository::new(db_pool.clone())),
            config: Arc::new(config),
            db_pool,
        })
    }
}
