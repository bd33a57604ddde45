use serde::Serialize;
use uuid::Uuid;

/// Contact details resolved from the account service for a buyer.
#[derive(Debug, Clone, Serialize)]
pub struct Buyer {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}
