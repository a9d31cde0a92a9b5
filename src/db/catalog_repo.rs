// src/db/catalog_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::catalog::{Brand, NewPart, NewSupplier, Part, PartCompatibility, PartUsage, PhoneModel, Supplier},
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Leituras usam a pool principal; escritas recebem o executor do chamador.

    // ---
    // Marcas
    // ---
    pub async fn create_brand<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<Brand, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Brand>(
            "INSERT INTO brands (tenant_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("A marca '{}' já existe.", name)))
    }

    pub async fn list_brands(&self, tenant_id: Uuid) -> Result<Vec<Brand>, AppError> {
        let brands = sqlx::query_as::<_, Brand>(
            "SELECT * FROM brands WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(brands)
    }

    /// Retorna `None` se a marca não pertence à loja.
    pub async fn update_brand<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        brand_id: Uuid,
        name: &str,
        active: bool,
    ) -> Result<Option<Brand>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Brand>(
            "UPDATE brands SET name = $3, active = $4 WHERE id = $2 AND tenant_id = $1 RETURNING *",
        )
        .bind(tenant_id)
        .bind(brand_id)
        .bind(name)
        .bind(active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("A marca '{}' já existe.", name)))
    }

    /// Trava a marca e conta os modelos vinculados (None se não existe na loja).
    pub async fn lock_brand_usage(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        brand_id: Uuid,
    ) -> Result<Option<i64>, AppError> {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM brands WHERE id = $2 AND tenant_id = $1 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(brand_id)
        .fetch_optional(&mut *conn)
        .await?;
        if found.is_none() {
            return Ok(None);
        }

        let models = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM phone_models WHERE tenant_id = $1 AND brand_id = $2",
        )
        .bind(tenant_id)
        .bind(brand_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(Some(models))
    }

    pub async fn delete_brand(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        brand_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM brands WHERE id = $2 AND tenant_id = $1")
            .bind(tenant_id)
            .bind(brand_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    // ---
    // Modelos
    // ---
    /// Retorna `None` se a marca não pertence à loja.
    pub async fn create_phone_model<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        brand_id: Uuid,
        name: &str,
        variant: Option<&str>,
    ) -> Result<Option<PhoneModel>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, PhoneModel>(
            r#"
            INSERT INTO phone_models (tenant_id, brand_id, name, variant)
            SELECT $1, b.id, $3, $4
            FROM brands b
            WHERE b.id = $2 AND b.tenant_id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(brand_id)
        .bind(name)
        .bind(variant)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("O modelo '{}' já existe para esta marca.", name)))
    }

    pub async fn list_phone_models(
        &self,
        tenant_id: Uuid,
        brand_id: Option<Uuid>,
    ) -> Result<Vec<PhoneModel>, AppError> {
        let models = sqlx::query_as::<_, PhoneModel>(
            r#"
            SELECT * FROM phone_models
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR brand_id = $2)
            ORDER BY name ASC, variant ASC NULLS FIRST
            "#,
        )
        .bind(tenant_id)
        .bind(brand_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(models)
    }

    /// Retorna `None` se o modelo ou a nova marca não pertencem à loja.
    pub async fn update_phone_model<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        phone_model_id: Uuid,
        brand_id: Uuid,
        name: &str,
        variant: Option<&str>,
        active: bool,
    ) -> Result<Option<PhoneModel>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, PhoneModel>(
            r#"
            UPDATE phone_models m
            SET brand_id = b.id, name = $4, variant = $5, active = $6
            FROM brands b
            WHERE m.id = $2 AND m.tenant_id = $1
              AND b.id = $3 AND b.tenant_id = $1
            RETURNING m.*
            "#,
        )
        .bind(tenant_id)
        .bind(phone_model_id)
        .bind(brand_id)
        .bind(name)
        .bind(variant)
        .bind(active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("O modelo '{}' já existe para esta marca.", name)))
    }

    /// Trava o modelo e conta as vendas ligadas a ele.
    pub async fn lock_phone_model_usage(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<Option<i64>, AppError> {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM phone_models WHERE id = $2 AND tenant_id = $1 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(phone_model_id)
        .fetch_optional(&mut *conn)
        .await?;
        if found.is_none() {
            return Ok(None);
        }

        let sales = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sales WHERE tenant_id = $1 AND phone_model_id = $2",
        )
        .bind(tenant_id)
        .bind(phone_model_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(Some(sales))
    }

    /// Remove o modelo junto com as compatibilidades dele.
    pub async fn delete_phone_model(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM part_compatibilities WHERE tenant_id = $1 AND phone_model_id = $2")
            .bind(tenant_id)
            .bind(phone_model_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM phone_models WHERE id = $2 AND tenant_id = $1")
            .bind(tenant_id)
            .bind(phone_model_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    // ---
    // Peças
    // ---
    pub async fn create_part<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &NewPart,
    ) -> Result<Part, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let part = sqlx::query_as::<_, Part>(
            r#"
            INSERT INTO parts
                (tenant_id, part_type, quality, name, internal_code, part_brand,
                 sale_price, min_price, image_path, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.part_type)
        .bind(&input.quality)
        .bind(&input.name)
        .bind(&input.internal_code)
        .bind(&input.part_brand)
        .bind(input.sale_price)
        .bind(input.min_price)
        .bind(&input.image_path)
        .bind(&input.notes)
        .fetch_one(executor)
        .await?;
        Ok(part)
    }

    pub async fn list_parts(&self, tenant_id: Uuid) -> Result<Vec<Part>, AppError> {
        let parts = sqlx::query_as::<_, Part>(
            "SELECT * FROM parts WHERE tenant_id = $1 ORDER BY part_type ASC, name ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }

    pub async fn update_part<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        part_id: Uuid,
        input: &NewPart,
        active: bool,
    ) -> Result<Option<Part>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let part = sqlx::query_as::<_, Part>(
            r#"
            UPDATE parts
            SET part_type = $3, quality = $4, name = $5, internal_code = $6, part_brand = $7,
                sale_price = $8, min_price = $9, image_path = $10, notes = $11, active = $12
            WHERE id = $2 AND tenant_id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(part_id)
        .bind(&input.part_type)
        .bind(&input.quality)
        .bind(&input.name)
        .bind(&input.internal_code)
        .bind(&input.part_brand)
        .bind(input.sale_price)
        .bind(input.min_price)
        .bind(&input.image_path)
        .bind(&input.notes)
        .bind(active)
        .fetch_optional(executor)
        .await?;
        Ok(part)
    }

    /// Trava a peça e conta onde ela já foi usada.
    pub async fn lock_part_usage(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        part_id: Uuid,
    ) -> Result<Option<PartUsage>, AppError> {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM parts WHERE id = $2 AND tenant_id = $1 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(part_id)
        .fetch_optional(&mut *conn)
        .await?;
        if found.is_none() {
            return Ok(None);
        }

        let usage = sqlx::query_as::<_, PartUsage>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM sale_items WHERE tenant_id = $1 AND part_id = $2) AS sale_items,
                (SELECT COUNT(*) FROM purchase_items WHERE tenant_id = $1 AND part_id = $2) AS purchase_items,
                (SELECT COUNT(*) FROM stock_movements WHERE tenant_id = $1 AND part_id = $2) AS movements
            "#,
        )
        .bind(tenant_id)
        .bind(part_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(Some(usage))
    }

    /// Remove a peça, as compatibilidades e a linha de saldo zerada.
    pub async fn delete_part(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        part_id: Uuid,
    ) -> Result<(), AppError> {
        for sql in [
            "DELETE FROM part_compatibilities WHERE tenant_id = $1 AND part_id = $2",
            "DELETE FROM stock_levels WHERE tenant_id = $1 AND part_id = $2",
            "DELETE FROM parts WHERE tenant_id = $1 AND id = $2",
        ] {
            sqlx::query(sql)
                .bind(tenant_id)
                .bind(part_id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    // ---
    // Compatibilidade
    // ---
    /// Retorna `None` se a peça ou o modelo não pertencem à loja.
    pub async fn add_compatibility<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        part_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<Option<PartCompatibility>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, PartCompatibility>(
            r#"
            INSERT INTO part_compatibilities (tenant_id, part_id, phone_model_id)
            SELECT $1, p.id, m.id
            FROM parts p, phone_models m
            WHERE p.id = $2 AND p.tenant_id = $1
              AND m.id = $3 AND m.tenant_id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(part_id)
        .bind(phone_model_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || "Esta peça já é compatível com o modelo.".to_string()))
    }

    pub async fn list_compatible_parts(
        &self,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<Vec<Part>, AppError> {
        let parts = sqlx::query_as::<_, Part>(
            r#"
            SELECT p.*
            FROM parts p
            JOIN part_compatibilities c ON c.part_id = p.id
            WHERE c.tenant_id = $1 AND c.phone_model_id = $2 AND p.active = TRUE
            ORDER BY p.part_type ASC, p.quality ASC
            "#,
        )
        .bind(tenant_id)
        .bind(phone_model_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }

    // ---
    // Fornecedores
    // ---
    pub async fn create_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &NewSupplier,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (tenant_id, name, document, kind, phone, email, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.document)
        .bind(&input.kind)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("O fornecedor '{}' já existe.", input.name)))
    }

    pub async fn list_suppliers(&self, tenant_id: Uuid) -> Result<Vec<Supplier>, AppError> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(suppliers)
    }

    pub async fn update_supplier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        supplier_id: Uuid,
        input: &NewSupplier,
        active: bool,
    ) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers
            SET name = $3, document = $4, kind = $5, phone = $6, email = $7, notes = $8, active = $9
            WHERE id = $2 AND tenant_id = $1
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(supplier_id)
        .bind(&input.name)
        .bind(&input.document)
        .bind(&input.kind)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.notes)
        .bind(active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, || format!("O fornecedor '{}' já existe.", input.name)))
    }

    /// Trava o fornecedor e conta as compras dele.
    pub async fn lock_supplier_usage(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<i64>, AppError> {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM suppliers WHERE id = $2 AND tenant_id = $1 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(supplier_id)
        .fetch_optional(&mut *conn)
        .await?;
        if found.is_none() {
            return Ok(None);
        }

        let purchases = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchases WHERE tenant_id = $1 AND supplier_id = $2",
        )
        .bind(tenant_id)
        .bind(supplier_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(Some(purchases))
    }

    pub async fn delete_supplier(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM suppliers WHERE id = $2 AND tenant_id = $1")
            .bind(tenant_id)
            .bind(supplier_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
