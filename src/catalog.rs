//! Product catalog.
//!
//! The store sells three fixed Dasai Mochi variants. Prices are in whole
//! Rupiah. This table is the only place prices live; clients read it through
//! `GET /api/products`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Line-item category sent to the payment provider
pub const ITEM_CATEGORY: &str = "Robot Dashboard";
/// Merchant name sent to the payment provider
pub const MERCHANT_NAME: &str = "Dasai Mochi Store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProductCode {
    Basic,
    Colorful,
    Ultimate,
}

impl ProductCode {
    pub const ALL: [ProductCode; 3] = [
        ProductCode::Basic,
        ProductCode::Colorful,
        ProductCode::Ultimate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCode::Basic => "basic",
            ProductCode::Colorful => "colorful",
            ProductCode::Ultimate => "ultimate",
        }
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ProductCode::Basic),
            "colorful" => Ok(ProductCode::Colorful),
            "ultimate" => Ok(ProductCode::Ultimate),
            other => Err(format!("unknown product code '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub code: ProductCode,
    pub display_name: &'static str,
    /// Unit price in Rupiah
    pub unit_price: i64,
    pub description: &'static str,
}

impl Product {
    pub fn price_label(&self) -> String {
        format_rupiah(self.unit_price)
    }
}

static PRODUCTS: [Product; 3] = [
    Product {
        code: ProductCode::Basic,
        display_name: "Dasai Mochi - Basic",
        unit_price: 150_000,
        description: "LCD 1 Warna",
    },
    Product {
        code: ProductCode::Colorful,
        display_name: "Dasai Mochi - Colorful",
        unit_price: 180_000,
        description: "LCD dengan LED Warna",
    },
    Product {
        code: ProductCode::Ultimate,
        display_name: "Dasai Mochi - Ultimate",
        unit_price: 210_000,
        description: "LCD Warna + Speaker",
    },
];

pub fn products() -> &'static [Product] {
    &PRODUCTS
}

pub fn product(code: ProductCode) -> &'static Product {
    match code {
        ProductCode::Basic => &PRODUCTS[0],
        ProductCode::Colorful => &PRODUCTS[1],
        ProductCode::Ultimate => &PRODUCTS[2],
    }
}

/// Looks up a product by its wire code (`basic`, `colorful`, `ultimate`).
pub fn find(code: &str) -> Option<&'static Product> {
    code.parse::<ProductCode>().ok().map(product)
}

/// Formats a Rupiah amount the way Indonesian shoppers read it: `Rp 150.000`.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}
