//! Commercial markup applied to every tier's quotes before caching.

use super::quote::QuoteTable;

/// Widens the spread of every quote by `markup_percentage`.
///
/// With `f = 1 + p/100`, positive selling rates are multiplied by `f` and
/// positive buying rates divided by it, the pre-markup value being kept in the
/// matching `original_*` field. Non-positive rates pass through untouched and
/// get no `original_*`. The average is then recomputed as the midpoint of
/// buying-transfer and selling.
pub fn apply_markup(mut table: QuoteTable, markup_percentage: f64) -> QuoteTable {
    let factor = 1.0 + markup_percentage / 100.0;

    for quote in table.quotes_mut() {
        if quote.selling > 0.0 {
            quote.original_selling = Some(quote.selling);
            quote.selling *= factor;
        }

        if quote.buying_sight > 0.0 {
            quote.original_buying_sight = Some(quote.buying_sight);
            quote.buying_sight /= factor;
        }

        if quote.buying_transfer > 0.0 {
            quote.original_buying_transfer = Some(quote.buying_transfer);
            quote.buying_transfer /= factor;
        }

        quote.average = (quote.buying_transfer + quote.selling) / 2.0;
    }

    table
}
