use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Receipt captions for one language.
#[derive(Debug, PartialEq, Eq)]
pub struct Labels {
    pub invoice: &'static str,
    pub date: &'static str,
    pub seller: &'static str,
    pub product: &'static str,
    pub qty: &'static str,
    pub price: &'static str,
    pub total: &'static str,
    pub subtotal: &'static str,
    pub tax: &'static str,
    pub discount: &'static str,
    pub grand_total: &'static str,
    pub thanks: &'static str,
    pub payment_method: &'static str,
    date_format: &'static str,
}

pub static ES: Labels = Labels {
    invoice: "Factura",
    date: "Fecha",
    seller: "Vendedor",
    product: "Producto",
    qty: "Cant",
    price: "Precio",
    total: "Total",
    subtotal: "Subtotal",
    tax: "IVA",
    discount: "Descuento",
    grand_total: "TOTAL",
    thanks: "¡Gracias por su compra!",
    payment_method: "Método de pago",
    date_format: "%-d/%-m/%Y, %-H:%M:%S",
};

pub static EN: Labels = Labels {
    invoice: "Invoice",
    date: "Date",
    seller: "Seller",
    product: "Product",
    qty: "Qty",
    price: "Price",
    total: "Total",
    subtotal: "Subtotal",
    tax: "Tax",
    discount: "Discount",
    grand_total: "TOTAL",
    thanks: "Thank you for your purchase!",
    payment_method: "Payment method",
    date_format: "%-m/%-d/%Y, %-I:%M:%S %p",
};

/// Exactly `"en"` selects English; every other code, or no usable code,
/// gets Spanish.
pub fn labels_for(locale: Option<&str>) -> &'static Labels {
    match locale {
        Some("en") => &EN,
        _ => &ES,
    }
}

impl Labels {
    /// Render a sale timestamp. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`,
    /// `YYYY-MM-DD` or epoch milliseconds; anything else prints verbatim.
    pub fn format_date(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.with_timezone(&Local).format(self.date_format).to_string())
                .unwrap_or_else(|| n.to_string()),
            serde_json::Value::String(s) => self.format_date_str(s),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn format_date_str(&self, raw: &str) -> String {
        let s = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return dt.with_timezone(&Local).format(self.date_format).to_string();
        }
        for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
                return dt.format(self.date_format).to_string();
            }
        }
        if let Some(dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return dt.format(self.date_format).to_string();
        }
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locale_selection() {
        assert_eq!(labels_for(Some("en")), &EN);
        assert_eq!(labels_for(Some("es")), &ES);
        assert_eq!(labels_for(Some("en-US")), &ES);
        assert_eq!(labels_for(Some("EN")), &ES);
        assert_eq!(labels_for(Some("fr")), &ES);
        assert_eq!(labels_for(Some("")), &ES);
        assert_eq!(labels_for(None), &ES);
    }

    #[test]
    fn naive_dates_follow_locale() {
        let when = json!("2026-10-19 14:05:09");
        assert_eq!(ES.format_date(&when), "19/10/2026, 14:05:09");
        assert_eq!(EN.format_date(&when), "10/19/2026, 2:05:09 PM");
    }

    #[test]
    fn date_parts_are_not_zero_padded() {
        let when = json!("2026-01-02 09:05:00");
        assert_eq!(EN.format_date(&when), "1/2/2026, 9:05:00 AM");
        assert_eq!(ES.format_date(&when), "2/1/2026, 9:05:00");
    }

    #[test]
    fn date_only() {
        assert_eq!(ES.format_date(&json!("2026-01-02")), "2/1/2026, 0:00:00");
    }

    #[test]
    fn unparsable_dates_print_verbatim() {
        assert_eq!(ES.format_date(&json!("ayer")), "ayer");
        assert_eq!(ES.format_date(&json!(null)), "");
    }
}
