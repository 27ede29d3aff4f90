//! Catalog route handlers.
//!
//! Listing and reads are public; create/update/delete and image upload are
//! admin-only.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bodega_core::ItemId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Item;
use crate::routes::MessageResponse;
use crate::services::catalog::{CreateItem, ItemQuery, Pagination, UpdateItem};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/image", post(upload_image))
}

/// Listing query string.
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Item creation body.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    pub stock: i64,
}

/// Item update body; absent fields are left unchanged.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock: Option<i64>,
}

/// Single item envelope.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub item: Item,
}

/// Listing envelope.
#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub success: bool,
    pub items: Vec<Item>,
    pub pagination: Pagination,
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ItemListResponse>> {
    let page = state
        .catalog()
        .list(ItemQuery {
            category: query.category,
            min_price: query.min_price,
            max_price: query.max_price,
            search: query.search,
            page: query.page,
            limit: query.limit,
        })
        .await?;

    Ok(Json(ItemListResponse {
        success: true,
        items: page.items,
        pagination: page.pagination,
    }))
}

#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<ItemResponse>> {
    let item = state.catalog().get(id).await?;
    Ok(Json(ItemResponse {
        success: true,
        message: None,
        item,
    }))
}

#[instrument(skip(state, admin, req))]
async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse> {
    let item = state
        .catalog()
        .create(CreateItem {
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
            image_url: req.image_url,
            stock: req.stock,
        })
        .await?;

    tracing::info!(item_id = %item.id, admin = %admin.0.user_id, "item created");

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            success: true,
            message: Some("Item created successfully".to_owned()),
            item,
        }),
    ))
}

#[instrument(skip(state, admin, req))]
async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<ItemId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>> {
    let item = state
        .catalog()
        .update(
            id,
            UpdateItem {
                name: req.name,
                description: req.description,
                price: req.price,
                category: req.category,
                image_url: req.image_url,
                stock: req.stock,
            },
        )
        .await?;

    tracing::info!(item_id = %item.id, admin = %admin.0.user_id, "item updated");

    Ok(Json(ItemResponse {
        success: true,
        message: Some("Item updated successfully".to_owned()),
        item,
    }))
}

#[instrument(skip(state, admin))]
async fn remove(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<ItemId>,
) -> Result<Json<MessageResponse>> {
    state.catalog().delete(id).await?;

    tracing::info!(item_id = %id, admin = %admin.0.user_id, "item deleted");

    Ok(Json(MessageResponse::ok("Item deleted successfully")))
}

#[instrument(skip(state, admin, multipart))]
async fn upload_image(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<ItemId>,
    mut multipart: Multipart,
) -> Result<Json<ItemResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("image") {
            let content_type = field
                .content_type()
                .map(str::to_owned)
                .ok_or_else(|| AppError::BadRequest("image field needs a content type".to_owned()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("failed to read image: {e}")))?;
            upload = Some((bytes, content_type));
        }
    }

    let (bytes, content_type) =
        upload.ok_or_else(|| AppError::BadRequest("missing image field".to_owned()))?;

    let item = state
        .catalog()
        .attach_image(id, &bytes, &content_type)
        .await?;

    tracing::info!(item_id = %item.id, admin = %admin.0.user_id, "item image uploaded");

    Ok(Json(ItemResponse {
        success: true,
        message: Some("Image uploaded successfully".to_owned()),
        item,
    }))
}
