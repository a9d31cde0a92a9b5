// src/services/dashboard_service.rs

use chrono::NaiveDate;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{DailySalesEntry, DashboardKpis, PeriodQuery, TopPartEntry},
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_kpis<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        period: &PeriodQuery,
    ) -> Result<DashboardKpis, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let (from, to) = checked_window(period)?;
        self.repo.get_kpis(executor, tenant_id, from, to).await
    }

    pub async fn get_daily_sales(
        &self,
        tenant_id: Uuid,
        period: &PeriodQuery,
    ) -> Result<Vec<DailySalesEntry>, AppError> {
        let (from, to) = checked_window(period)?;
        self.repo.get_daily_sales(tenant_id, from, to).await
    }

    pub async fn get_top_parts(
        &self,
        tenant_id: Uuid,
        period: &PeriodQuery,
    ) -> Result<Vec<TopPartEntry>, AppError> {
        let (from, to) = checked_window(period)?;
        self.repo.get_top_parts(tenant_id, from, to).await
    }
}

fn checked_window(period: &PeriodQuery) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError> {
    if let (Some(from), Some(to)) = (period.from, period.to) {
        if from > to {
            return Err(AppError::InvalidInput(
                "A data inicial deve ser anterior à data final.".to_string(),
            ));
        }
    }
    Ok((period.from, period.to))
}
