//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    tracing::debug!("Configuração carregada: {:?}", config);
    let bind_addr = config.bind_addr.clone();

    let app_state = AppState::new(config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas do usuário (só login)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let catalog_routes = Router::new()
        .route(
            "/brands",
            post(handlers::catalog::create_brand).get(handlers::catalog::list_brands),
        )
        .route(
            "/brands/{brand_id}",
            put(handlers::catalog::update_brand).delete(handlers::catalog::delete_brand),
        )
        .route(
            "/models",
            post(handlers::catalog::create_phone_model).get(handlers::catalog::list_phone_models),
        )
        .route(
            "/models/{model_id}",
            put(handlers::catalog::update_phone_model).delete(handlers::catalog::delete_phone_model),
        )
        .route("/models/{model_id}/parts", get(handlers::catalog::list_compatible_parts))
        .route(
            "/parts",
            post(handlers::catalog::create_part).get(handlers::catalog::list_parts),
        )
        .route(
            "/parts/{part_id}",
            put(handlers::catalog::update_part).delete(handlers::catalog::delete_part),
        )
        .route("/parts/{part_id}/compatibility", post(handlers::catalog::add_compatibility))
        .route(
            "/suppliers",
            post(handlers::catalog::create_supplier).get(handlers::catalog::list_suppliers),
        )
        .route(
            "/suppliers/{supplier_id}",
            put(handlers::catalog::update_supplier).delete(handlers::catalog::delete_supplier),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let stock_routes = Router::new()
        .route("/", get(handlers::stock::list_levels))
        .route("/movements", get(handlers::stock::list_movements))
        .route("/adjustments", post(handlers::stock::adjust_stock))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let purchase_routes = Router::new()
        .route(
            "/",
            post(handlers::purchases::create_purchase).get(handlers::purchases::list_purchases),
        )
        .route("/{purchase_id}", get(handlers::purchases::get_purchase))
        .route("/{purchase_id}/reverse", post(handlers::purchases::reverse_purchase))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let sale_routes = Router::new()
        .route(
            "/",
            post(handlers::sales::create_sale).get(handlers::sales::list_sales),
        )
        .route("/{sale_id}", get(handlers::sales::get_sale))
        .route("/{sale_id}/status", get(handlers::sales::get_sale_status))
        .route("/{sale_id}/convert", post(handlers::sales::convert_quote))
        .route("/{sale_id}/cancel", post(handlers::sales::cancel_sale))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let dashboard_routes = Router::new()
        .route("/kpis", get(handlers::dashboard::get_kpis))
        .route("/daily-sales", get(handlers::dashboard::get_daily_sales))
        .route("/top-parts", get(handlers::dashboard::get_top_parts))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let settings_routes = Router::new()
        .route(
            "/payment",
            get(handlers::settings::get_payment_settings).put(handlers::settings::update_payment_settings),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    // Público: o gateway não manda JWT
    let webhook_routes = Router::new()
        .route("/payments", post(handlers::webhooks::payment_notification));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/users", user_routes)
        .nest("/api/catalog", catalog_routes)
        .nest("/api/stock", stock_routes)
        .nest("/api/purchases", purchase_routes)
        .nest("/api/sales", sale_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/settings", settings_routes)
        .nest("/api/webhooks", webhook_routes)
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
