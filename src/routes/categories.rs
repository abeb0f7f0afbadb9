// src/routes/categories.rs

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::{query, query_as, query_scalar};
use uuid::Uuid;

use crate::models::{Category, CategoryWithCount, CategoryWithKpis, Kpi};
use crate::AppState;

use super::{created, missing, ok, ok_with_count, storage_error, ApiError, Envelope};

#[derive(Deserialize)]
pub struct CreateCategoryBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategoryBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<CategoryWithCount>>>, ApiError> {
    let categories = query_as::<_, Category>(r#"SELECT * FROM categories ORDER BY name ASC"#)
        .fetch_all(&state.pool)
        .await
        .map_err(storage_error)?;

    let counts: Vec<(Uuid, i64)> = query_as(
        r#"SELECT category_id, COUNT(*) FROM kpis WHERE category_id IS NOT NULL GROUP BY category_id"#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;
    let counts: HashMap<Uuid, i64> = counts.into_iter().collect();

    let total = categories.len();
    let data: Vec<CategoryWithCount> = categories
        .into_iter()
        .map(|category| {
            let kpi_count = counts.get(&category.category_id).copied().unwrap_or(0);
            CategoryWithCount { category, kpi_count }
        })
        .collect();

    Ok(ok_with_count(data, total))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<CategoryWithKpis>>, ApiError> {
    let category = query_as::<_, Category>(r#"SELECT * FROM categories WHERE category_id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(missing("Category not found"))?;

    let kpis = query_as::<_, Kpi>(
        r#"SELECT * FROM kpis WHERE category_id = $1 ORDER BY created_at ASC"#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;

    Ok(ok(CategoryWithKpis { category, kpis }))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryBody>,
) -> Result<(StatusCode, Json<Envelope<Category>>), ApiError> {
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Name is required".to_string()))?;

    let row = query_as::<_, Category>(
        r#"
        INSERT INTO categories (category_id, name, description, color, icon, created_at, updated_at)
        VALUES ($1,$2,$3,$4,$5,now(),now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name.trim())
    .bind(body.description)
    .bind(body.color)
    .bind(body.icon)
    .fetch_one(&state.pool)
    .await
    .map_err(storage_error)?;

    Ok(created(row))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCategoryBody>,
) -> Result<Json<Envelope<Category>>, ApiError> {
    let row = query_as::<_, Category>(
        r#"
        UPDATE categories SET
          name        = COALESCE($2, name),
          description = COALESCE($3, description),
          color       = COALESCE($4, color),
          icon        = COALESCE($5, icon),
          updated_at  = now()
        WHERE category_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(body.name)
    .bind(body.description)
    .bind(body.color)
    .bind(body.icon)
    .fetch_one(&state.pool)
    .await
    .map_err(missing("Category not found"))?;

    Ok(ok(row))
}

/// Deletion is blocked while any KPI still references the category; the
/// error names the blocking count.
fn delete_guard(kpi_count: i64) -> Result<(), ApiError> {
    if kpi_count > 0 {
        return Err(ApiError::Validation(format!(
            "Cannot delete category with {kpi_count} associated KPIs"
        )));
    }
    Ok(())
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let kpi_count: i64 = query_scalar(r#"SELECT COUNT(*) FROM kpis WHERE category_id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(storage_error)?;
    delete_guard(kpi_count)?;

    let res = query(r#"DELETE FROM categories WHERE category_id = $1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(storage_error)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    Ok(ok(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_guard_blocks_referenced_category_naming_count() {
        let err = delete_guard(3).unwrap_err();
        match err {
            ApiError::Validation(msg) => {
                assert_eq!(msg, "Cannot delete category with 3 associated KPIs");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn delete_guard_allows_unreferenced_category() {
        assert!(delete_guard(0).is_ok());
    }
}
