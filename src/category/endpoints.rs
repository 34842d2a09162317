//! The `/v1/categories` endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error, UserId,
    category::{
        CategoryPatch, NewCategory, create_category, delete_category, get_all_categories,
        get_category, update_category,
    },
    database_id::CategoryId,
    db::lock_connection,
    extract::{JsonBody, PathParam},
};

/// The state needed for the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the caller's categories.
pub async fn get_all_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let categories = get_all_categories(user_id, &connection)?;

    Ok(Json(json!({ "categories": categories })).into_response())
}

/// Create a category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    JsonBody(new_category): JsonBody<NewCategory>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = create_category(user_id, new_category, &connection)?;

    Ok((StatusCode::CREATED, Json(json!({ "category": category }))).into_response())
}

/// Get one of the caller's categories.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    PathParam(category_id): PathParam<CategoryId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = get_category(category_id, user_id, &connection)?;

    Ok(Json(json!({ "category": category })).into_response())
}

/// Partially update one of the caller's categories.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    PathParam(category_id): PathParam<CategoryId>,
    JsonBody(patch): JsonBody<CategoryPatch>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = update_category(category_id, user_id, patch, &connection)?;

    Ok(Json(json!({ "category": category })).into_response())
}

/// Delete one of the caller's categories.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserId>,
    PathParam(category_id): PathParam<CategoryId>,
) -> Result<Response, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_category(category_id, user_id, &connection)?;

    Ok(Json(json!({ "message": "category successfully deleted" })).into_response())
}
