use crate::error::PaymentError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the vendor charges in whole units.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

/// Currencies the vendor charges in thousandths.
const THREE_DECIMAL_CURRENCIES: &[&str] = &["bhd", "jod", "kwd", "omr", "tnd"];

/// Represents a positive monetary amount in major currency units.
///
/// The host framework always speaks major units (`10.50` dollars); the vendor
/// speaks integer minor units (`1050` cents). Conversions go through [`Currency`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to the vendor's integer minor units, rounding half away from zero.
    pub fn to_minor_units(&self, currency: &Currency) -> Result<i64, PaymentError> {
        let overflow = || {
            PaymentError::ValidationError(format!(
                "Amount {} {} does not fit in minor units",
                self.0, currency
            ))
        };
        let minor = self
            .0
            .checked_mul(currency.minor_unit_factor())
            .ok_or_else(overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(overflow)?;
        if minor == 0 {
            return Err(PaymentError::ValidationError(format!(
                "Amount {} {} is below the smallest currency unit",
                self.0, currency
            )));
        }
        Ok(minor)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A lower-cased ISO-4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Result<Self, PaymentError> {
        let code = code.as_ref().trim().to_ascii_lowercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Invalid currency code '{}'",
                code
            )))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of decimal places the vendor's minor unit represents.
    pub fn exponent(&self) -> u32 {
        if ZERO_DECIMAL_CURRENCIES.contains(&self.0.as_str()) {
            0
        } else if THREE_DECIMAL_CURRENCIES.contains(&self.0.as_str()) {
            3
        } else {
            2
        }
    }

    fn minor_unit_factor(&self) -> Decimal {
        Decimal::from(10_i64.pow(self.exponent()))
    }

    /// Converts vendor minor units back to a major-unit decimal.
    pub fn from_minor_units(&self, minor: i64) -> Decimal {
        Decimal::new(minor, self.exponent()).normalize()
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_currency_normalizes_case() {
        let currency = Currency::new(" USD ").unwrap();
        assert_eq!(currency.code(), "usd");
        assert!(Currency::new("").is_err());
        assert!(Currency::new("us").is_err());
        assert!(Currency::new("u5d").is_err());
    }

    #[test]
    fn test_currency_exponents() {
        assert_eq!(Currency::new("usd").unwrap().exponent(), 2);
        assert_eq!(Currency::new("jpy").unwrap().exponent(), 0);
        assert_eq!(Currency::new("kwd").unwrap().exponent(), 3);
    }

    #[test]
    fn test_to_minor_units() {
        let usd = Currency::new("usd").unwrap();
        let jpy = Currency::new("jpy").unwrap();
        let kwd = Currency::new("kwd").unwrap();

        assert_eq!(Amount::new(dec!(10.50)).unwrap().to_minor_units(&usd).unwrap(), 1050);
        assert_eq!(Amount::new(dec!(1200)).unwrap().to_minor_units(&jpy).unwrap(), 1200);
        assert_eq!(Amount::new(dec!(1.234)).unwrap().to_minor_units(&kwd).unwrap(), 1234);
    }

    #[test]
    fn test_to_minor_units_rounds_half_away_from_zero() {
        let usd = Currency::new("usd").unwrap();
        assert_eq!(Amount::new(dec!(0.005)).unwrap().to_minor_units(&usd).unwrap(), 1);
    }

    #[test]
    fn test_to_minor_units_rejects_rounding_to_zero() {
        let usd = Currency::new("usd").unwrap();
        let jpy = Currency::new("jpy").unwrap();
        assert!(matches!(
            Amount::new(dec!(0.004)).unwrap().to_minor_units(&usd),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(0.4)).unwrap().to_minor_units(&jpy),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_to_minor_units_overflow() {
        let usd = Currency::new("usd").unwrap();
        let huge = Amount::new(Decimal::MAX).unwrap();
        assert!(matches!(
            huge.to_minor_units(&usd),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_from_minor_units() {
        let usd = Currency::new("usd").unwrap();
        let jpy = Currency::new("jpy").unwrap();
        assert_eq!(usd.from_minor_units(1050), dec!(10.5));
        assert_eq!(jpy.from_minor_units(1200), dec!(1200));
    }

    #[test]
    fn test_amount_deserialization_rejects_zero() {
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
        let amount: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(amount.value(), dec!(12.5));
    }
}
