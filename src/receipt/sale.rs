use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /print-sale`.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleRequest {
    pub sale: Sale,
    #[serde(default)]
    pub store: Option<Store>,
    #[serde(default)]
    pub employee: Option<Employee>,
    pub items: Vec<SaleItem>,
    /// Only an absent key means English. `null` or any non-string value
    /// is kept as-is and falls back to Spanish.
    #[serde(default = "default_locale")]
    pub locale: Value,
}

fn default_locale() -> Value {
    Value::String("en".into())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sale {
    /// String or number; keys the lookup URL.
    pub id: Value,
    /// Printed as the CODE128 barcode.
    pub number: Value,
    pub date: Value,
    pub subtotal: f64,
    pub tax_total: f64,
    pub discount_total: f64,
    pub grand_total: f64,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Store {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Employee {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaleItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub tax: f64,
}

impl SaleItem {
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price + self.tax
    }
}

/// Display text of a loosely typed JSON scalar. Strings lose their quotes,
/// null becomes empty.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Present and not blank.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
