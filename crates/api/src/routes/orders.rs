//! Order command and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ShippingStatus;
use domain::{OrderCommands, OrderProjection, PlaceOrderRequest};
use projections::DbProjection;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: Arc<dyn OrderCommands>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderBody {
    pub vendor_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: f64,
    pub payment_method: String,
}

#[derive(Deserialize)]
pub struct CancelOrderBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct UpdateShippingStatusBody {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderIdResponse {
    pub order_id: String,
}

#[derive(Serialize)]
pub struct OrderDetailsResponse {
    pub order_id: String,
    pub customer_id: String,
    pub vendor_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<OrderProjection> for OrderDetailsResponse {
    fn from(projection: OrderProjection) -> Self {
        Self {
            order_id: projection.order_id,
            customer_id: projection.customer_id,
            vendor_id: projection.vendor_id,
            product_id: projection.product_id,
            quantity: projection.quantity,
            total_price: projection.total_price,
            payment_method: projection.payment_method,
            payment_status: projection.payment_status.to_string(),
            shipping_status: projection.shipping_status.to_string(),
            created_at: projection.created_at.to_rfc3339(),
            updated_at: projection.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ListOrdersItem {
    pub order_id: String,
    pub payment_status: String,
    pub shipping_status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DbProjection> for ListOrdersItem {
    fn from(row: DbProjection) -> Self {
        Self {
            order_id: row.order_id,
            payment_status: row.payment_status.to_string(),
            shipping_status: row.shipping_status.to_string(),
            created_at: row.created_at.to_rfc3339(),
            updated_at: row.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — place a new order.
pub async fn place(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PlaceOrderBody>,
) -> Result<(StatusCode, Json<OrderIdResponse>), ApiError> {
    let order_id = state
        .orders
        .place_order(PlaceOrderRequest {
            vendor_id: body.vendor_id,
            customer_id: body.customer_id,
            product_id: body.product_id,
            quantity: body.quantity,
            total_price: body.total_price,
            payment_method: body.payment_method,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(OrderIdResponse { order_id })))
}

/// POST /orders/{id}/cancel — cancel an order.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(body): Json<CancelOrderBody>,
) -> Result<Json<OrderIdResponse>, ApiError> {
    state.orders.cancel_order(&order_id, &body.reason).await?;
    Ok(Json(OrderIdResponse { order_id }))
}

/// POST /orders/{id}/shipping-status — move a paid order forward.
pub async fn update_shipping_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(body): Json<UpdateShippingStatusBody>,
) -> Result<Json<OrderIdResponse>, ApiError> {
    let status: ShippingStatus = body
        .status
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid shipping status: {}", body.status)))?;

    state.orders.update_shipping_status(&order_id, status).await?;
    Ok(Json(OrderIdResponse { order_id }))
}

/// GET /orders/{id} — the live projection of one order.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let projection = state.orders.get_order(&order_id).await?;
    Ok(Json(projection.into()))
}

/// GET /orders — list materialized projections, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<ListOrdersItem>>, ApiError> {
    let orders = state.orders.list_orders(query.limit, query.offset).await?;
    Ok(Json(orders.into_iter().map(ListOrdersItem::from).collect()))
}
