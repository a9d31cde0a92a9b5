// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Users ---
        handlers::auth::get_me,

        // --- Catalog ---
        handlers::catalog::create_brand,
        handlers::catalog::list_brands,
        handlers::catalog::update_brand,
        handlers::catalog::delete_brand,
        handlers::catalog::create_phone_model,
        handlers::catalog::list_phone_models,
        handlers::catalog::update_phone_model,
        handlers::catalog::delete_phone_model,
        handlers::catalog::list_compatible_parts,
        handlers::catalog::create_part,
        handlers::catalog::list_parts,
        handlers::catalog::update_part,
        handlers::catalog::delete_part,
        handlers::catalog::add_compatibility,
        handlers::catalog::create_supplier,
        handlers::catalog::list_suppliers,
        handlers::catalog::update_supplier,
        handlers::catalog::delete_supplier,

        // --- Stock ---
        handlers::stock::list_levels,
        handlers::stock::list_movements,
        handlers::stock::adjust_stock,

        // --- Purchases ---
        handlers::purchases::create_purchase,
        handlers::purchases::list_purchases,
        handlers::purchases::get_purchase,
        handlers::purchases::reverse_purchase,

        // --- Sales ---
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::sales::get_sale_status,
        handlers::sales::convert_quote,
        handlers::sales::cancel_sale,

        // --- Webhooks ---
        handlers::webhooks::payment_notification,

        // --- Dashboard ---
        handlers::dashboard::get_kpis,
        handlers::dashboard::get_daily_sales,
        handlers::dashboard::get_top_parts,

        // --- Settings ---
        handlers::settings::get_payment_settings,
        handlers::settings::update_payment_settings,
    ),
    components(
        schemas(
            // --- Catalog ---
            models::catalog::Brand,
            models::catalog::PhoneModel,
            models::catalog::Part,
            models::catalog::PartCompatibility,
            models::catalog::Supplier,

            // --- Stock ---
            models::stock::MovementKind,
            models::stock::StockLevel,
            models::stock::StockLevelView,
            models::stock::StockMovement,

            // --- Purchases ---
            models::purchase::PurchaseStatus,
            models::purchase::Purchase,
            models::purchase::PurchaseItem,
            models::purchase::PurchaseLine,
            models::purchase::PurchaseDetail,

            // --- Sales ---
            models::sale::SaleStatus,
            models::sale::PaymentMethod,
            models::sale::Sale,
            models::sale::SaleItem,
            models::sale::SaleLine,
            models::sale::SaleDetail,
            models::sale::SaleStatusView,

            // --- Payment ---
            models::payment::PaymentSettingsView,
            models::payment::WebhookAck,

            // --- Dashboard ---
            models::dashboard::DashboardKpis,
            models::dashboard::DailySalesEntry,
            models::dashboard::TopPartEntry,

            // --- Payloads ---
            handlers::auth::MeResponse,
            handlers::catalog::CreateBrandPayload,
            handlers::catalog::CreatePhoneModelPayload,
            handlers::catalog::CreatePartPayload,
            handlers::catalog::AddCompatibilityPayload,
            handlers::catalog::CreateSupplierPayload,
            handlers::catalog::UpdateBrandPayload,
            handlers::catalog::UpdatePhoneModelPayload,
            handlers::catalog::UpdatePartPayload,
            handlers::catalog::UpdateSupplierPayload,
            handlers::stock::AdjustStockPayload,
            handlers::stock::AdjustStockResponse,
            handlers::purchases::PurchaseLinePayload,
            handlers::purchases::CreatePurchasePayload,
            handlers::sales::SaleKindPayload,
            handlers::sales::SaleLinePayload,
            handlers::sales::CreateSalePayload,
            handlers::sales::ConvertQuotePayload,
            handlers::settings::UpdatePaymentSettingsPayload,
        )
    ),
    tags(
        (name = "Users", description = "Dados do Usuário do token"),
        (name = "Catalog", description = "Marcas, Modelos, Peças e Fornecedores"),
        (name = "Stock", description = "Saldo, Movimentações e Ajustes de Estoque"),
        (name = "Purchases", description = "Compras de Fornecedores e Estornos"),
        (name = "Sales", description = "Vendas de Balcão, PIX Online e Orçamentos"),
        (name = "Webhooks", description = "Notificações do Gateway de Pagamento"),
        (name = "Dashboard", description = "Indicadores e Gráficos Gerenciais"),
        (name = "Settings", description = "Configurações da Loja")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
