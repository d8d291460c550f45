use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::OrderOperations;
use crate::domain::order::{
    cart_total, check_amount, CartLine, Order, OrderItem, OrderStatus, OrderSummary, ShippingInfo,
};
use crate::domain::principal::Principal;
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    /// Product id
    pub id: Uuid,
    pub quantity: i32,
    /// Unit price captured when the item was added to the cart, as a decimal
    /// string, e.g. "9.99"
    pub price: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfoDto {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub cart_items: Vec<CartItemRequest>,
    pub shipping_info: ShippingInfoDto,
    /// Total shown to the customer. When present it must match the cart.
    #[serde(default)]
    pub total: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of Processing, Shipped, Delivered, Cancelled
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    pub estimated_delivery_date: String,
    pub delivery_date: Option<String>,
    pub total: String,
    pub status: String,
    pub shipping_info: ShippingInfoDto,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: String,
    pub estimated_delivery_date: String,
    pub total: String,
    pub status: String,
    pub purchaser_name: String,
}

fn parse_amount(field: &str, value: &str) -> Result<BigDecimal, AppError> {
    let amount = BigDecimal::from_str(value.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid {field} '{value}': {e}")))?;
    check_amount(field, &amount)?;
    Ok(amount)
}

impl From<ShippingInfoDto> for ShippingInfo {
    fn from(dto: ShippingInfoDto) -> Self {
        ShippingInfo {
            first_name: dto.first_name,
            last_name: dto.last_name,
            email: dto.email,
            address: dto.address,
            city: dto.city,
            postal_code: dto.postal_code,
            country: dto.country,
        }
    }
}

impl From<ShippingInfo> for ShippingInfoDto {
    fn from(info: ShippingInfo) -> Self {
        ShippingInfoDto {
            first_name: info.first_name,
            last_name: info.last_name,
            email: info.email,
            address: info.address,
            city: info.city,
            postal_code: info.postal_code,
            country: info.country,
        }
    }
}

impl PlaceOrderRequest {
    /// Converts the payload into cart lines, checking the client total
    /// against the lines before anything is reserved.
    pub fn into_domain(self) -> Result<(Vec<CartLine>, ShippingInfo), AppError> {
        let lines = self
            .cart_items
            .iter()
            .map(|item| {
                Ok(CartLine {
                    product_id: item.id,
                    quantity: item.quantity,
                    unit_price: parse_amount("price", &item.price)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        if let Some(total) = &self.total {
            let claimed = parse_amount("total", total)?;
            if claimed != cart_total(&lines) {
                return Err(AppError::BadRequest(
                    "Order total does not match cart items".to_string(),
                ));
            }
        }

        Ok((lines, self.shipping_info.into()))
    }
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        OrderItemResponse {
            product_id: item.product_id,
            name: item.name,
            image_url: item.image_url,
            quantity: item.quantity,
            price: item.price.to_string(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id,
            user_id: order.user_id,
            date: order.date.to_rfc3339(),
            estimated_delivery_date: order.estimated_delivery_date.to_string(),
            delivery_date: order.delivery_date.map(|d| d.to_rfc3339()),
            total: order.total.to_string(),
            status: order.status.to_string(),
            shipping_info: order.shipping_info.into(),
            items: order.items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        OrderSummaryResponse {
            id: summary.id,
            user_id: summary.user_id,
            date: summary.date.to_rfc3339(),
            estimated_delivery_date: summary.estimated_delivery_date.to_string(),
            total: summary.total.to_string(),
            status: summary.status.to_string(),
            purchaser_name: summary.purchaser_name,
        }
    }
}

fn summaries(list: Vec<OrderSummary>) -> Vec<OrderSummaryResponse> {
    list.into_iter().map(Into::into).collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order for the caller's cart. Stock for every line is reserved
/// and the order written in one transaction; if any line cannot be reserved
/// nothing is kept.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    params(
        ("x-user-id" = Uuid, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Empty cart or malformed payload"),
        (status = 401, description = "Missing identity"),
        (status = 409, description = "Product out of stock or unknown"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    service: web::Data<dyn OrderOperations>,
    principal: Principal,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let (lines, shipping_info) = body.into_inner().into_domain()?;

    let order = web::block(move || service.place_order(principal.user_id, lines, shipping_info))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/myorders
///
/// The caller's own orders, most recent first.
#[utoipa::path(
    get,
    path = "/orders/myorders",
    params(
        ("x-user-id" = Uuid, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Caller's orders", body = [OrderSummaryResponse]),
        (status = 401, description = "Missing identity"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn my_orders(
    service: web::Data<dyn OrderOperations>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || service.get_orders_for_user(principal.user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(summaries(orders)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("x-user-id" = Uuid, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<dyn OrderOperations>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order_detail(order_id, &principal))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Every order in the store, most recent first. Admin only.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("x-user-id" = Uuid, Header, description = "Authenticated user id"),
        ("x-user-role" = String, Header, description = "Must be admin"),
    ),
    responses(
        (status = 200, description = "All orders", body = [OrderSummaryResponse]),
        (status = 401, description = "Missing identity"),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    service: web::Data<dyn OrderOperations>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || service.get_all_orders(&principal))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(summaries(orders)))
}

/// PUT /orders/{id}/status
///
/// Admin status change. Moving to Delivered records the delivery time.
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    request_body = UpdateStatusRequest,
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("x-user-id" = Uuid, Header, description = "Authenticated user id"),
        ("x-user-role" = String, Header, description = "Must be admin"),
    ),
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Unknown status or illegal transition"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    service: web::Data<dyn OrderOperations>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    if !principal.is_admin() {
        return Err(AppError::Forbidden);
    }
    let order_id = path.into_inner();
    let status = OrderStatus::from_str(&body.status)?;

    let order = web::block(move || service.update_status(order_id, status, &principal))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{id}/cancel
///
/// Cancels a Processing order and returns its items to stock.
#[utoipa::path(
    put,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("x-user-id" = Uuid, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 400, description = "Order is no longer Processing"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    service: web::Data<dyn OrderOperations>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.cancel_order(order_id, &principal))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
