// src/models/dashboard.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

// Janela opcional (datas no fuso de São Paulo)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpis {
    #[schema(example = 42)]
    pub quantity_sold: i64,
    #[schema(example = "3250.00")]
    pub amount_sold: Decimal,
    #[schema(example = 310)]
    pub stock_quantity: i64,
    #[schema(example = "18900.00")]
    pub stock_value: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySalesEntry {
    pub day: NaiveDate,
    pub total: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopPartEntry {
    pub internal_code: Option<String>,
    pub name: Option<String>,
    pub image_path: Option<String>,
    pub quantity: i64,
}
