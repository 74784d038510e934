//! Currency conversion pivoting through the base unit.

use super::error::RateError;
use super::quote::{BASE_CURRENCY, QuoteTable, RateQuote};
use serde::{Deserialize, Serialize};

/// The rate shown alongside a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateInfo {
    pub from: String,
    pub to: String,
    pub rate: f64,
}

/// Response to a conversion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub amount: f64,
    pub from_currency: String,
    pub to_currency: String,
    pub converted_amount: f64,
    pub rate_info: RateInfo,
    pub last_updated: String,
}

fn lookup<'a>(table: &'a QuoteTable, code: &str) -> Result<&'a RateQuote, RateError> {
    table
        .get(code)
        .ok_or_else(|| RateError::InvalidCurrency(code.to_string()))
}

fn selling_rate(quote: &RateQuote) -> Result<f64, RateError> {
    if quote.selling > 0.0 {
        Ok(quote.selling)
    } else {
        Err(RateError::UnpricedCurrency(quote.code.clone()))
    }
}

fn buying_transfer_rate(quote: &RateQuote) -> Result<f64, RateError> {
    if quote.buying_transfer > 0.0 {
        Ok(quote.buying_transfer)
    } else {
        Err(RateError::UnpricedCurrency(quote.code.clone()))
    }
}

/// Converts `amount` of `from` into `to` using the quotes in `table`.
///
/// Both codes must be present in the table, including the base unit when it
/// is one of the endpoints (see [`QuoteTable::with_base_unit`]). Foreign to
/// base uses the selling rate; base to foreign divides by the buying-transfer
/// rate; any other pair goes through the base unit in those two steps, so a
/// round trip does not return the original amount.
pub fn convert(amount: f64, from: &str, to: &str, table: &QuoteTable) -> Result<f64, RateError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(RateError::InvalidAmount(amount));
    }

    let source = lookup(table, from)?;
    let destination = lookup(table, to)?;

    if to == BASE_CURRENCY {
        return Ok(amount * selling_rate(source)?);
    }

    if from == BASE_CURRENCY {
        return Ok(amount / buying_transfer_rate(destination)?);
    }

    let in_base = convert(amount, from, BASE_CURRENCY, table)?;
    convert(in_base, BASE_CURRENCY, to, table)
}

/// Converts and reports the effective rate, producing the full response.
pub fn quote_conversion(
    amount: f64,
    from: &str,
    to: &str,
    table: &QuoteTable,
    last_updated: &str,
) -> Result<ConversionResult, RateError> {
    let converted_amount = convert(amount, from, to, table)?;

    let rate = if from == BASE_CURRENCY {
        1.0 / buying_transfer_rate(lookup(table, to)?)?
    } else if to == BASE_CURRENCY {
        selling_rate(lookup(table, from)?)?
    } else {
        converted_amount / amount
    };

    Ok(ConversionResult {
        amount,
        from_currency: from.to_string(),
        to_currency: to.to_string(),
        converted_amount,
        rate_info: RateInfo {
            from: from.to_string(),
            to: to.to_string(),
            rate,
        },
        last_updated: last_updated.to_string(),
    })
}
