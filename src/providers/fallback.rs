use crate::core::quote::{QuoteTable, RateQuote};

/// Bundled quotes served when every live source has failed.
pub fn static_rates() -> QuoteTable {
    [
        RateQuote::new("USD", "US Dollar", 33.89, 34.01, 34.76, 34.385),
        RateQuote::new("EUR", "Euro", 36.52, 36.68, 37.51, 37.095),
        RateQuote::new("GBP", "British Pound", 43.17, 43.38, 44.75, 44.065),
        RateQuote::new("JPY", "Japanese Yen", 0.221, 0.223, 0.232, 0.2275),
        RateQuote::new("CNY", "Chinese Yuan", 4.67, 4.72, 4.91, 4.815),
        RateQuote::new("AUD", "Australian Dollar", 22.34, 22.45, 23.10, 22.775),
        RateQuote::new("SGD", "Singapore Dollar", 25.28, 25.38, 26.01, 25.695),
    ]
    .into_iter()
    .collect()
}
