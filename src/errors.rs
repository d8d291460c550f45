use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Not enough stock for {product_name}. Only {available} left.")]
    OutOfStock {
        product_id: Uuid,
        product_name: String,
        available: i32,
    },

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::EmptyCart
            | DomainError::InvalidInput(_)
            | DomainError::InvalidTransition { .. } => AppError::BadRequest(e.to_string()),
            DomainError::OutOfStock {
                product_id,
                product_name,
                available,
            } => AppError::OutOfStock {
                product_id,
                product_name,
                available,
            },
            DomainError::ProductNotFound(id) => AppError::ProductNotFound(id),
            DomainError::NotFound => AppError::NotFound,
            DomainError::NotAuthorized => AppError::Unauthorized,
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::Persistence(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::BadRequest(_) => HttpResponse::BadRequest().json(json!({
                "error": self.to_string()
            })),
            AppError::Unauthorized => HttpResponse::Unauthorized().json(json!({
                "error": self.to_string()
            })),
            AppError::Forbidden => HttpResponse::Forbidden().json(json!({
                "error": self.to_string()
            })),
            AppError::NotFound => HttpResponse::NotFound().json(json!({
                "error": self.to_string()
            })),
            AppError::OutOfStock {
                product_id,
                product_name,
                available,
            } => HttpResponse::Conflict().json(json!({
                "error": self.to_string(),
                "productId": product_id,
                "productName": product_name,
                "available": available
            })),
            AppError::ProductNotFound(product_id) => HttpResponse::Conflict().json(json!({
                "error": self.to_string(),
                "productId": product_id
            })),
            AppError::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }))
            }
        }
    }
}
