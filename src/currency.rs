use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::CalcError;

/// INR per USD used by the dean's budget screen.
pub const DEFAULT_USD_INR_RATE: f64 = 90.22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Inr,
}

impl Currency {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" | "$" => Some(Self::Usd),
            "INR" | "₹" => Some(Self::Inr),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usd => f.write_str("USD"),
            Self::Inr => f.write_str("INR"),
        }
    }
}

/// INR per one USD. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    pub fn new(rate: f64) -> Result<Self, CalcError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CalcError::InvalidRate(rate));
        }
        Ok(Self(rate))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self(DEFAULT_USD_INR_RATE)
    }
}

// Whole units only. `f64::round` is half-away-from-zero, which equals
// half-up on the non-negative budget domain.
pub fn usd_to_inr(usd: f64, rate: ExchangeRate) -> f64 {
    (usd * rate.0).round()
}

pub fn inr_to_usd(inr: f64, rate: ExchangeRate) -> f64 {
    (inr / rate.0).round()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAmount {
    pub currency: Currency,
    pub value: f64,
}

impl BudgetAmount {
    pub fn new(currency: Currency, value: f64) -> Result<Self, CalcError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CalcError::InvalidAmount(value));
        }
        Ok(Self { currency, value })
    }

    pub fn in_currency(&self, target: Currency, rate: ExchangeRate) -> f64 {
        match (self.currency, target) {
            (Currency::Usd, Currency::Inr) => usd_to_inr(self.value, rate),
            (Currency::Inr, Currency::Usd) => inr_to_usd(self.value, rate),
            _ => self.value,
        }
    }
}

/// Two budget inputs kept in sync: the last edited side is the source of
/// truth and the other is derived from it on read.
///
/// Editing one side and then the other is lossy; see [`usd_to_inr`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualCurrencyBudget {
    source: BudgetAmount,
    rate: ExchangeRate,
}

impl DualCurrencyBudget {
    pub fn new(source: BudgetAmount, rate: ExchangeRate) -> Self {
        Self { source, rate }
    }

    pub fn set_usd(&mut self, usd: f64) -> Result<(), CalcError> {
        self.source = BudgetAmount::new(Currency::Usd, usd)?;
        Ok(())
    }

    pub fn set_inr(&mut self, inr: f64) -> Result<(), CalcError> {
        self.source = BudgetAmount::new(Currency::Inr, inr)?;
        Ok(())
    }

    pub fn set_rate(&mut self, rate: ExchangeRate) {
        self.rate = rate;
    }

    pub fn source(&self) -> BudgetAmount {
        self.source
    }

    pub fn rate(&self) -> ExchangeRate {
        self.rate
    }

    pub fn usd(&self) -> f64 {
        self.source.in_currency(Currency::Usd, self.rate)
    }

    pub fn inr(&self) -> f64 {
        self.source.in_currency(Currency::Inr, self.rate)
    }

    /// `(usd, inr)`, failing when the derived side overflows `f64`.
    pub fn both(&self) -> Result<(f64, f64), CalcError> {
        let (usd, inr) = (self.usd(), self.inr());
        if !usd.is_finite() || !inr.is_finite() {
            return Err(CalcError::InvalidAmount(self.source.value));
        }
        Ok((usd, inr))
    }
}

/// Parses display strings such as `"$450,000"` or `"$450k"`.
pub fn parse_budget(text: &str) -> Result<f64, CalcError> {
    let parse_err = || CalcError::Parse {
        input: text.to_string(),
    };
    let cleaned: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
    let cleaned = cleaned.trim();

    let (numeric, multiplier) = match cleaned.strip_suffix(['k', 'K']) {
        Some(prefix) => (prefix.trim_end(), 1000.0),
        None => (cleaned, 1.0),
    };
    if numeric.is_empty() {
        return Err(parse_err());
    }
    // Reject words `f64::from_str` would accept ("inf", "NaN").
    if !numeric
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+')
    {
        return Err(parse_err());
    }
    let value = numeric.parse::<f64>().map_err(|_| parse_err())? * multiplier;
    if !value.is_finite() || value < 0.0 {
        return Err(parse_err());
    }
    Ok(value)
}

pub fn parse_budget_or_zero(text: &str) -> f64 {
    match parse_budget(text) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "budget parse fell back to 0");
            0.0
        }
    }
}

/// `"$"` plus the rounded amount with thousands separators.
pub fn format_budget(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate() -> ExchangeRate {
        ExchangeRate::new(90.22).expect("rate")
    }

    #[test]
    fn converts_with_whole_unit_rounding() {
        assert_eq!(usd_to_inr(450_000.0, rate()), 40_599_000.0);
        assert_eq!(inr_to_usd(40_599_000.0, rate()), 450_000.0);
        assert_eq!(usd_to_inr(1.0, rate()), 90.0);
        assert_eq!(inr_to_usd(100.0, rate()), 1.0);
        assert_eq!(usd_to_inr(0.0, rate()), 0.0);
    }

    #[test]
    fn round_trip_through_usd_is_lossy() {
        // 1000 INR -> 11 USD -> 992 INR
        let back = usd_to_inr(inr_to_usd(1000.0, rate()), rate());
        assert_eq!(back, 992.0);
        assert!((back - 1000.0).abs() <= rate().value() / 2.0 + 0.5);
    }

    #[test]
    fn rejects_bad_rates() {
        assert_eq!(ExchangeRate::new(0.0), Err(CalcError::InvalidRate(0.0)));
        assert!(ExchangeRate::new(-1.0).is_err());
        assert!(ExchangeRate::new(f64::NAN).is_err());
        assert!(ExchangeRate::new(f64::INFINITY).is_err());
        assert_eq!(ExchangeRate::default().value(), DEFAULT_USD_INR_RATE);
    }

    #[test]
    fn dual_budget_follows_last_edit() {
        let mut b = DualCurrencyBudget::new(
            BudgetAmount::new(Currency::Usd, 450_000.0).expect("amount"),
            rate(),
        );
        assert_eq!(b.inr(), 40_599_000.0);

        b.set_inr(902.2).expect("set inr");
        assert_eq!(b.source().currency, Currency::Inr);
        assert_eq!(b.usd(), 10.0);
        assert_eq!(b.inr(), 902.2);

        assert_eq!(b.set_usd(-5.0), Err(CalcError::InvalidAmount(-5.0)));
        assert_eq!(b.source().currency, Currency::Inr);
    }

    #[test]
    fn rate_change_rederives_the_other_side() {
        let mut b = DualCurrencyBudget::new(
            BudgetAmount::new(Currency::Usd, 100.0).expect("amount"),
            rate(),
        );
        assert_eq!(b.inr(), 9022.0);

        b.set_rate(ExchangeRate::new(83.0).expect("rate"));
        assert_eq!(b.rate().value(), 83.0);
        assert_eq!(b.usd(), 100.0);
        assert_eq!(b.inr(), 8300.0);
    }

    #[test]
    fn overflowing_conversion_is_rejected() {
        let b = DualCurrencyBudget::new(
            BudgetAmount::new(Currency::Usd, 1e307).expect("finite input"),
            rate(),
        );
        assert!(b.inr().is_infinite());
        assert_eq!(b.both(), Err(CalcError::InvalidAmount(1e307)));

        let fine = DualCurrencyBudget::new(
            BudgetAmount::new(Currency::Inr, 902.2).expect("amount"),
            rate(),
        );
        assert_eq!(fine.both(), Ok((10.0, 902.2)));
    }

    #[test]
    fn parses_budget_strings() {
        assert_eq!(parse_budget("$450,000"), Ok(450_000.0));
        assert_eq!(parse_budget("$450k"), Ok(450_000.0));
        assert_eq!(parse_budget("$450K"), Ok(450_000.0));
        assert_eq!(parse_budget("$45.5k"), Ok(45_500.0));
        assert_eq!(parse_budget("$0"), Ok(0.0));
        assert_eq!(parse_budget(" 1,250.75 "), Ok(1250.75));
    }

    #[test]
    fn malformed_budget_strings_fall_back() {
        for bad in ["abc", "", "$", "k", "$inf", "NaN", "$-10", "12abc"] {
            assert!(
                matches!(parse_budget(bad), Err(CalcError::Parse { .. })),
                "{:?} should not parse",
                bad
            );
            assert_eq!(parse_budget_or_zero(bad), 0.0);
        }
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_budget(450_000.0), "$450,000");
        assert_eq!(format_budget(40_599_000.0), "$40,599,000");
        assert_eq!(format_budget(999.0), "$999");
        assert_eq!(format_budget(1000.4), "$1,000");
        assert_eq!(format_budget(0.0), "$0");
        assert_eq!(format_budget(-1234.0), "-$1,234");
    }

    #[test]
    fn currency_codes() {
        assert_eq!(Currency::parse("usd"), Some(Currency::Usd));
        assert_eq!(Currency::parse("INR"), Some(Currency::Inr));
        assert_eq!(Currency::parse("eur"), None);
        assert_eq!(Currency::Inr.to_string(), "INR");
    }
}
