use std::fmt::Display;

use rust_decimal::Decimal;

/// Indian rupee sign.
pub const CURRENCY_SYMBOL: char = '\u{20B9}';

/// Currency glyph, a space, then the decimal's own digits.
///
/// Values carrying fewer than two fractional digits are zero-padded to two;
/// nothing is ever rounded and no grouping separators are introduced.
pub fn format_currency(amount: Decimal) -> String {
    let mut amount = amount;
    if amount.scale() < 2 {
        amount.rescale(2);
    }
    format!("{CURRENCY_SYMBOL} {amount}")
}

pub(crate) fn currency_or_blank(amount: Option<Decimal>) -> String {
    amount.map(format_currency).unwrap_or_default()
}

pub(crate) fn display_or_blank<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn keeps_two_fraction_digits() {
        assert_eq!(format_currency(dec("1234.50")), "\u{20B9} 1234.50");
        assert_eq!(format_currency(dec("55000.00")), "\u{20B9} 55000.00");
    }

    #[test]
    fn pads_short_scales() {
        assert_eq!(format_currency(dec("55000")), "\u{20B9} 55000.00");
        assert_eq!(format_currency(dec("0.5")), "\u{20B9} 0.50");
    }

    #[test]
    fn never_rounds_or_groups() {
        assert_eq!(format_currency(dec("1.005")), "\u{20B9} 1.005");
        assert_eq!(format_currency(dec("1234567.89")), "\u{20B9} 1234567.89");
    }

    #[test]
    fn absent_values_are_blank() {
        assert_eq!(currency_or_blank(None), "");
        assert_eq!(display_or_blank::<u32>(None), "");
        assert_eq!(display_or_blank(Some(30u32)), "30");
    }
}
