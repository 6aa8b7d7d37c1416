//! Notification language selection and money formatting.
//!
//! The language of customer-facing mail follows the billing currency:
//! BRL-denominated subscriptions get Portuguese, everything else English.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Languages notification templates exist in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Pt,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Pt => "pt",
        }
    }
}

/// Selects the notification language for a billing currency.
pub fn language_for_currency(currency: &str) -> Language {
    if currency.eq_ignore_ascii_case("brl") {
        Language::Pt
    } else {
        Language::En
    }
}

static CURRENCY_SYMBOLS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("usd", "$"),
        ("brl", "R$"),
        ("eur", "\u{20ac}"),
        ("gbp", "\u{a3}"),
    ])
});

/// Formats a minor-unit amount for display, e.g. `(2000, "usd")` -> `"$20.00"`.
///
/// Currencies without a known symbol render as `"20.00 XYZ"`.
pub fn format_amount(amount_minor: i64, currency: &str) -> String {
    let currency = currency.to_ascii_lowercase();
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    let units = abs / 100;
    let cents = abs % 100;

    match CURRENCY_SYMBOLS.get(currency.as_str()) {
        Some(symbol) => format!("{sign}{symbol}{units}.{cents:02}"),
        None => format!("{sign}{units}.{cents:02} {}", currency.to_ascii_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brl_selects_portuguese() {
        assert_eq!(language_for_currency("brl"), Language::Pt);
        assert_eq!(language_for_currency("BRL"), Language::Pt);
    }

    #[test]
    fn other_currencies_select_english() {
        assert_eq!(language_for_currency("usd"), Language::En);
        assert_eq!(language_for_currency("eur"), Language::En);
        assert_eq!(language_for_currency("jpy"), Language::En);
    }

    #[test]
    fn formats_usd_with_dollar_sign() {
        assert_eq!(format_amount(2000, "usd"), "$20.00");
        assert_eq!(format_amount(2050, "usd"), "$20.50");
        assert_eq!(format_amount(5, "usd"), "$0.05");
    }

    #[test]
    fn formats_brl_with_real_sign() {
        assert_eq!(format_amount(9900, "brl"), "R$99.00");
    }

    #[test]
    fn unknown_currency_falls_back_to_code() {
        assert_eq!(format_amount(2000, "sek"), "20.00 SEK");
    }

    #[test]
    fn negative_amounts_keep_the_sign() {
        assert_eq!(format_amount(-2000, "usd"), "-$20.00");
    }
}
