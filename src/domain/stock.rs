use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::errors::DomainError;

/// `Locked` is a soft hold; on-hand inventory is only touched when a lock is
/// completed. `Released` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockStatus {
    Locked,
    Released,
    Completed,
}

impl LockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Locked => "locked",
            LockStatus::Released => "released",
            LockStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(LockStatus::Locked),
            "released" => Ok(LockStatus::Released),
            "completed" => Ok(LockStatus::Completed),
            other => Err(DomainError::Persistence(format!(
                "unknown lock status '{other}'"
            ))),
        }
    }
}

/// The inventory record a lock points at: a whole product or one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum StockTarget {
    Product(i64),
    Variant(i64),
}

impl StockTarget {
    /// Builds a target from the nullable `product_id`/`variant_id` column pair.
    pub fn from_columns(product_id: Option<i64>, variant_id: Option<i64>) -> Result<Self, DomainError> {
        match (product_id, variant_id) {
            (Some(id), None) => Ok(StockTarget::Product(id)),
            (None, Some(id)) => Ok(StockTarget::Variant(id)),
            (p, v) => Err(DomainError::Persistence(format!(
                "lock entry must reference exactly one of product/variant, got {p:?}/{v:?}"
            ))),
        }
    }

    pub fn product_id(&self) -> Option<i64> {
        match self {
            StockTarget::Product(id) => Some(*id),
            StockTarget::Variant(_) => None,
        }
    }

    pub fn variant_id(&self) -> Option<i64> {
        match self {
            StockTarget::Variant(id) => Some(*id),
            StockTarget::Product(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLockEntry {
    pub id: i64,
    pub order_number: String,
    pub target: StockTarget,
    pub quantity: i32,
    pub status: LockStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockLock {
    pub order_number: String,
    pub target: StockTarget,
    pub quantity: i32,
}

/// A product or variant row as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
}

impl InventoryRecord {
    /// Exact name match, or SKU match when the line carries one.
    pub fn matches(&self, name: &str, sku: Option<&str>) -> bool {
        self.name == name
            || matches!((self.sku.as_deref(), sku), (Some(own), Some(wanted)) if !wanted.is_empty() && own == wanted)
    }
}
