//! Fixed-width item table.
//!
//! Widths are counted in characters. The product column silently drops
//! whatever does not fit; numeric columns are right-justified and never cut.

pub const PRODUCT_WIDTH: usize = 22;
pub const QTY_WIDTH: usize = 4;
pub const MONEY_WIDTH: usize = 10;

/// Left-justify `text` in exactly `width` characters, dropping the tail.
pub fn fit_left(text: &str, width: usize) -> String {
    let cut: String = text.chars().take(width).collect();
    format!("{cut:<width$}")
}

pub fn fit_right(text: &str, width: usize) -> String {
    format!("{text:>width$}")
}

/// Two-decimal fixed formatting. Never renders `-0.00`.
pub fn money(value: f64) -> String {
    let value = if value.abs() < 0.005 { 0.0 } else { value };
    format!("{value:.2}")
}

/// Whole quantities print without decimals, fractional ones with up to three.
pub fn quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let s = format!("{value:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn table_row(product: &str, qty: &str, price: &str, total: &str) -> String {
    format!(
        "{}{}{}{}",
        fit_left(product, PRODUCT_WIDTH),
        fit_right(qty, QTY_WIDTH),
        fit_right(price, MONEY_WIDTH),
        fit_right(total, MONEY_WIDTH)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_product_name_is_truncated_silently() {
        let row = table_row(
            "A very very long product name exceeding twenty two chars",
            &quantity(2.0),
            &money(5.0),
            &money(2.0 * 5.0 + 1.0),
        );
        assert_eq!(&row[..22], "A very very long produ");
        assert_eq!(&row[22..26], "   2");
        assert_eq!(&row[26..36], "      5.00");
        assert_eq!(&row[36..], "     11.00");
        assert_eq!(row.chars().count(), 46);
    }

    #[test]
    fn short_product_is_padded() {
        assert_eq!(fit_left("Café", 6), "Café  ");
        assert_eq!(fit_left("", 3), "   ");
    }

    #[test]
    fn multibyte_names_count_characters() {
        let name = "ñ".repeat(30);
        let cell = fit_left(&name, PRODUCT_WIDTH);
        assert_eq!(cell.chars().count(), PRODUCT_WIDTH);
    }

    #[test]
    fn numeric_columns_overflow_instead_of_cutting() {
        assert_eq!(fit_right("12345", QTY_WIDTH), "12345");
    }

    #[test]
    fn money_formatting() {
        assert_eq!(money(11.0), "11.00");
        assert_eq!(money(0.126), "0.13");
        assert_eq!(money(-0.001), "0.00");
        assert_eq!(money(1234.5), "1234.50");
    }

    #[test]
    fn quantity_formatting() {
        assert_eq!(quantity(2.0), "2");
        assert_eq!(quantity(1.5), "1.5");
        assert_eq!(quantity(0.125), "0.125");
        assert_eq!(quantity(0.3333), "0.333");
    }
}
