//! Product handlers.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::filters::CurrentUser;
use crate::api::AppState;
use crate::config::{MAX_PRODUCT_DESCRIPTION_LENGTH, MAX_PRODUCT_NAME_LENGTH};
use crate::domain::{NewProduct, Product, ProductChanges};
use crate::errors::AppResult;

/// Product creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, max = MAX_PRODUCT_NAME_LENGTH, message = "Name must be 1-100 characters")
    )]
    pub name: Option<String>,
    #[validate(length(max = MAX_PRODUCT_DESCRIPTION_LENGTH, message = "Description is too long"))]
    pub description: Option<String>,
    #[validate(
        required(message = "Quantity is required"),
        range(min = 0, message = "Quantity must not be negative")
    )]
    pub quantity: Option<i32>,
    #[validate(
        required(message = "Unit price is required"),
        range(min = 0.0, message = "Unit price must not be negative")
    )]
    pub unit_price: Option<f64>,
}

/// Partial product update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = MAX_PRODUCT_NAME_LENGTH, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = MAX_PRODUCT_DESCRIPTION_LENGTH, message = "Description is too long"))]
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 0.0, message = "Unit price must not be negative"))]
    pub unit_price: Option<f64>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(request: CreateProductRequest) -> Self {
        NewProduct {
            name: request.name.unwrap_or_default(),
            description: request.description,
            quantity: request.quantity.unwrap_or_default(),
            unit_price: request.unit_price.unwrap_or_default(),
        }
    }
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(request: UpdateProductRequest) -> Self {
        ProductChanges {
            name: request.name,
            description: request.description,
            quantity: request.quantity,
            unit_price: request.unit_price,
        }
    }
}

/// Create product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.product_service.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.product_service.get_product(id).await?))
}

/// Create a product owned by the caller
pub async fn create_product(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = state
        .product_service
        .create_product(current_user.id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<Product>> {
    Ok(Json(
        state
            .product_service
            .update_product(id, payload.into())
            .await?,
    ))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.product_service.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
