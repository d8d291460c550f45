use bigdecimal::BigDecimal;
use uuid::Uuid;

/// Catalog product as seen by the order core. Catalog management lives
/// elsewhere; only stock and archival are changed here.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_archived: bool,
}

/// Result of a successful stock reservation: the product snapshot copied
/// into the order item and the stock left afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservedStock {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub remaining: i32,
}
