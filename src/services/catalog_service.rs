// src/services/catalog_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::catalog::{Brand, NewPart, NewSupplier, Part, PartCompatibility, PhoneModel, Supplier},
};

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository) -> Self {
        Self { repo }
    }

    pub async fn create_brand<'e, E>(&self, executor: E, tenant_id: Uuid, name: &str) -> Result<Brand, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_brand(executor, tenant_id, name.trim()).await
    }

    pub async fn update_brand<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        brand_id: Uuid,
        name: &str,
        active: bool,
    ) -> Result<Brand, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_brand(executor, tenant_id, brand_id, name.trim(), active)
            .await?
            .ok_or(AppError::NotFound("Marca"))
    }

    /// Marca com modelos vinculados não pode ser excluída (desative-a).
    pub async fn delete_brand<'e, A>(&self, executor: A, tenant_id: Uuid, brand_id: Uuid) -> Result<(), AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let models = self
            .repo
            .lock_brand_usage(&mut *tx, tenant_id, brand_id)
            .await?
            .ok_or(AppError::NotFound("Marca"))?;
        ensure_unused(models, "Não é possível excluir esta marca pois existem modelos vinculados.")?;

        self.repo.delete_brand(&mut *tx, tenant_id, brand_id).await?;
        tx.commit().await?;
        tracing::info!("🗑️ Marca {} excluída", brand_id);
        Ok(())
    }

    pub async fn list_brands(&self, tenant_id: Uuid) -> Result<Vec<Brand>, AppError> {
        self.repo.list_brands(tenant_id).await
    }

    pub async fn create_phone_model<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        brand_id: Uuid,
        name: &str,
        variant: Option<&str>,
    ) -> Result<PhoneModel, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .create_phone_model(executor, tenant_id, brand_id, name.trim(), normalize_variant(variant))
            .await?
            .ok_or(AppError::NotFound("Marca"))
    }

    pub async fn update_phone_model<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        phone_model_id: Uuid,
        brand_id: Uuid,
        name: &str,
        variant: Option<&str>,
        active: bool,
    ) -> Result<PhoneModel, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_phone_model(
                executor,
                tenant_id,
                phone_model_id,
                brand_id,
                name.trim(),
                normalize_variant(variant),
                active,
            )
            .await?
            .ok_or(AppError::NotFound("Modelo ou marca"))
    }

    /// Modelo com vendas não pode ser excluído; as compatibilidades saem junto.
    pub async fn delete_phone_model<'e, A>(
        &self,
        executor: A,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<(), AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let sales = self
            .repo
            .lock_phone_model_usage(&mut *tx, tenant_id, phone_model_id)
            .await?
            .ok_or(AppError::NotFound("Modelo"))?;
        ensure_unused(sales, "Não é possível excluir este modelo pois existem vendas vinculadas.")?;

        self.repo.delete_phone_model(&mut *tx, tenant_id, phone_model_id).await?;
        tx.commit().await?;
        tracing::info!("🗑️ Modelo {} excluído", phone_model_id);
        Ok(())
    }

    pub async fn list_phone_models(
        &self,
        tenant_id: Uuid,
        brand_id: Option<Uuid>,
    ) -> Result<Vec<PhoneModel>, AppError> {
        self.repo.list_phone_models(tenant_id, brand_id).await
    }

    pub async fn create_part<'e, E>(&self, executor: E, tenant_id: Uuid, input: NewPart) -> Result<Part, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        check_min_price(&input)?;
        let part = self.repo.create_part(executor, tenant_id, &input).await?;
        tracing::info!("🔧 Peça {} cadastrada ({})", part.id, part.part_type);
        Ok(part)
    }

    /// Edição completa; `active = false` tira a peça da tela de venda.
    pub async fn update_part<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        part_id: Uuid,
        input: NewPart,
        active: bool,
    ) -> Result<Part, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        check_min_price(&input)?;
        self.repo
            .update_part(executor, tenant_id, part_id, &input, active)
            .await?
            .ok_or(AppError::NotFound("Peça"))
    }

    /// Só exclui peça que nunca foi vendida, comprada nem movimentada.
    pub async fn delete_part<'e, A>(&self, executor: A, tenant_id: Uuid, part_id: Uuid) -> Result<(), AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let usage = self
            .repo
            .lock_part_usage(&mut *tx, tenant_id, part_id)
            .await?
            .ok_or(AppError::NotFound("Peça"))?;
        if let Some(reason) = usage.delete_blocker() {
            return Err(AppError::Conflict(reason.to_string()));
        }

        self.repo.delete_part(&mut *tx, tenant_id, part_id).await?;
        tx.commit().await?;
        tracing::info!("🗑️ Peça {} excluída", part_id);
        Ok(())
    }

    pub async fn list_parts(&self, tenant_id: Uuid) -> Result<Vec<Part>, AppError> {
        self.repo.list_parts(tenant_id).await
    }

    pub async fn add_compatibility<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        part_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<PartCompatibility, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .add_compatibility(executor, tenant_id, part_id, phone_model_id)
            .await?
            .ok_or(AppError::NotFound("Peça ou modelo"))
    }

    pub async fn list_compatible_parts(
        &self,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<Vec<Part>, AppError> {
        self.repo.list_compatible_parts(tenant_id, phone_model_id).await
    }

    pub async fn create_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: NewSupplier,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_supplier(executor, tenant_id, &input).await
    }

    pub async fn update_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        supplier_id: Uuid,
        input: NewSupplier,
        active: bool,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_supplier(executor, tenant_id, supplier_id, &input, active)
            .await?
            .ok_or(AppError::NotFound("Fornecedor"))
    }

    pub async fn delete_supplier<'e, A>(
        &self,
        executor: A,
        tenant_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<(), AppError>
    where
        A: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let purchases = self
            .repo
            .lock_supplier_usage(&mut *tx, tenant_id, supplier_id)
            .await?
            .ok_or(AppError::NotFound("Fornecedor"))?;
        ensure_unused(purchases, "Não é possível excluir. Fornecedor usado em compras.")?;

        self.repo.delete_supplier(&mut *tx, tenant_id, supplier_id).await?;
        tx.commit().await?;
        tracing::info!("🗑️ Fornecedor {} excluído", supplier_id);
        Ok(())
    }

    pub async fn list_suppliers(&self, tenant_id: Uuid) -> Result<Vec<Supplier>, AppError> {
        self.repo.list_suppliers(tenant_id).await
    }
}

// Variante vazia vira NULL (mantém a unicidade marca+nome)
fn normalize_variant(variant: Option<&str>) -> Option<&str> {
    variant.map(str::trim).filter(|v| !v.is_empty())
}

fn check_min_price(input: &NewPart) -> Result<(), AppError> {
    match input.min_price {
        Some(min_price) if min_price > input.sale_price => Err(AppError::InvalidInput(
            "O preço mínimo não pode ser maior que o preço de venda.".to_string(),
        )),
        _ => Ok(()),
    }
}

fn ensure_unused(dependents: i64, message: &str) -> Result<(), AppError> {
    if dependents > 0 {
        return Err(AppError::Conflict(message.to_string()));
    }
    Ok(())
}
