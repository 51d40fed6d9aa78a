//! Position sizing: pure calculation from balance, allocation,
//! leverage, price, and a resolved or manual rate.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::InvalidInput;
use crate::models::{SizingRequest, SizingResult};

/// Calculator for order quantities. Stateless; all context arrives in
/// the request.
pub struct PositionSizer;

impl PositionSizer {
    /// Size a position:
    ///
    /// `allocated = balance * pct/100`, converted through `rate` when
    /// the currencies differ, multiplied by leverage, then floored to
    /// whole units at the instrument price.
    pub fn calculate(
        request: &SizingRequest,
        rate: Decimal,
        inverted: bool,
    ) -> Result<SizingResult, InvalidInput> {
        Self::validate(request, rate)?;

        let allocated = request.account_balance * (request.allocation_pct / dec!(100));

        let allocated_quote = if request.pair.is_identity() {
            allocated * request.leverage
        } else {
            allocated * rate * request.leverage
        };

        let quantity = (allocated_quote / request.instrument_price)
            .floor()
            .to_u64()
            .ok_or_else(|| InvalidInput("quantity out of range".to_string()))?;

        Ok(SizingResult {
            quantity,
            rate_used: rate,
            inverted,
        })
    }

    /// Check the numeric request fields. Rate-independent, so callers
    /// can reject bad input before any resolution work starts.
    pub fn validate_request(request: &SizingRequest) -> Result<(), InvalidInput> {
        if request.account_balance <= Decimal::ZERO {
            return Err(InvalidInput("account balance must be positive".to_string()));
        }
        if request.allocation_pct <= Decimal::ZERO || request.allocation_pct > dec!(100) {
            return Err(InvalidInput(
                "allocation percentage must be in (0, 100]".to_string(),
            ));
        }
        if request.leverage < Decimal::ONE {
            return Err(InvalidInput("leverage must be at least 1".to_string()));
        }
        if request.instrument_price <= Decimal::ZERO {
            return Err(InvalidInput("instrument price must be positive".to_string()));
        }
        Ok(())
    }

    fn validate(request: &SizingRequest, rate: Decimal) -> Result<(), InvalidInput> {
        Self::validate_request(request)?;
        if rate <= Decimal::ZERO {
            return Err(InvalidInput("exchange rate must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CurrencyPair;

    fn request(
        balance: Decimal,
        pct: Decimal,
        leverage: Decimal,
        price: Decimal,
        base: &str,
        quote: &str,
    ) -> SizingRequest {
        SizingRequest {
            account_balance: balance,
            allocation_pct: pct,
            leverage,
            instrument_price: price,
            pair: CurrencyPair::new(base, quote).unwrap(),
            manual_rate: None,
        }
    }

    #[test]
    fn test_identity_currency_sizing() {
        let req = request(dec!(10000), dec!(50), dec!(1), dec!(100), "USD", "USD");
        let result = PositionSizer::calculate(&req, Decimal::ONE, false).unwrap();

        assert_eq!(result.quantity, 50);
        assert_eq!(result.rate_used, Decimal::ONE);
        assert!(!result.inverted);
    }

    #[test]
    fn test_cross_currency_sizing_with_leverage() {
        // allocated 5000, converted 10000, leveraged 20000, price 100
        let req = request(dec!(10000), dec!(50), dec!(2), dec!(100), "EUR", "USD");
        let result = PositionSizer::calculate(&req, dec!(2.0), false).unwrap();

        assert_eq!(result.quantity, 200);
        assert_eq!(result.rate_used, dec!(2.0));
    }

    #[test]
    fn test_quantity_floors_toward_zero() {
        let req = request(dec!(1000), dec!(10), dec!(1), dec!(33), "USD", "USD");
        let result = PositionSizer::calculate(&req, Decimal::ONE, false).unwrap();

        // 100 / 33 = 3.03..
        assert_eq!(result.quantity, 3);
    }

    #[test]
    fn test_inverted_flag_carried_through() {
        let req = request(dec!(10000), dec!(25), dec!(1), dec!(50), "EUR", "USD");
        let result = PositionSizer::calculate(&req, dec!(1.25), true).unwrap();

        assert!(result.inverted);
        assert_eq!(result.rate_used, dec!(1.25));
    }

    #[test]
    fn test_rejects_out_of_range_inputs() {
        let good = request(dec!(10000), dec!(50), dec!(1), dec!(100), "USD", "USD");

        let mut bad = good.clone();
        bad.account_balance = Decimal::ZERO;
        assert!(PositionSizer::calculate(&bad, Decimal::ONE, false).is_err());

        let mut bad = good.clone();
        bad.allocation_pct = dec!(100.1);
        assert!(PositionSizer::calculate(&bad, Decimal::ONE, false).is_err());

        let mut bad = good.clone();
        bad.allocation_pct = Decimal::ZERO;
        assert!(PositionSizer::calculate(&bad, Decimal::ONE, false).is_err());

        let mut bad = good.clone();
        bad.leverage = dec!(0.5);
        assert!(PositionSizer::calculate(&bad, Decimal::ONE, false).is_err());

        // Zero price is invalid input, not a division error
        let mut bad = good.clone();
        bad.instrument_price = Decimal::ZERO;
        let err = PositionSizer::calculate(&bad, Decimal::ONE, false).unwrap_err();
        assert!(err.to_string().contains("price"));

        assert!(PositionSizer::calculate(&good, Decimal::ZERO, false).is_err());
    }

    #[test]
    fn test_full_allocation_boundary_is_valid() {
        let req = request(dec!(10000), dec!(100), dec!(1), dec!(100), "USD", "USD");
        let result = PositionSizer::calculate(&req, Decimal::ONE, false).unwrap();
        assert_eq!(result.quantity, 100);
    }
}
