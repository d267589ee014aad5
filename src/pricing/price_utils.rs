//! Price grid and profit helpers

use rand::Rng;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::error::{MerchantError, Result};

/// Points on the deterministic grid: 0.9·base to 3.0·base in 0.005·base steps
pub const GRID_POINTS: usize = 420;

fn out_of_range(price: Decimal) -> MerchantError {
    MerchantError::InvalidPrice(format!("price arithmetic on {} overflows", price))
}

/// `price * factor`, failing instead of overflowing
pub fn scale_price(price: Decimal, factor: Decimal) -> Result<Decimal> {
    price.checked_mul(factor).ok_or_else(|| out_of_range(price))
}

/// `price + delta`, failing instead of overflowing
pub fn offset_price(price: Decimal, delta: Decimal) -> Result<Decimal> {
    price.checked_add(delta).ok_or_else(|| out_of_range(price))
}

/// Candidate prices between 0.9·base (inclusive) and 3.0·base (exclusive)
///
/// The deterministic grid always has [`GRID_POINTS`] entries. With
/// `randomize_distance` every step is drawn from 0.001·base to 0.049·base,
/// which keeps the length between 43 and 2100. Non-positive base prices
/// produce no candidates.
pub fn get_potential_prices<R: Rng>(
    base_price: Decimal,
    randomize_distance: bool,
    rng: &mut R,
) -> Result<Vec<Decimal>> {
    if base_price <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let start = scale_price(base_price, dec!(0.9))?;
    if !randomize_distance {
        let step = scale_price(base_price, dec!(0.005))?;
        return (0..GRID_POINTS)
            .map(|i| offset_price(start, scale_price(step, Decimal::from(i))?))
            .collect();
    }

    let end = scale_price(base_price, dec!(3.0))?;
    let mut prices = Vec::new();
    let mut price = start;
    while price < end {
        prices.push(price);
        let thousandths: i64 = rng.random_range(1..=49);
        price = offset_price(price, scale_price(base_price, Decimal::new(thousandths, 3))?)?;
    }
    Ok(prices)
}

/// Uniform whole-cent price in [0.8·base, 3.0·base]
pub fn random_price<R: Rng>(base_price: Decimal, rng: &mut R) -> Result<Decimal> {
    let low = scale_price(base_price, dec!(80))?.ceil().to_i64();
    let high = scale_price(base_price, dec!(300))?.floor().to_i64();
    match (low, high) {
        (Some(low), Some(high)) if low <= high => {
            Ok(Decimal::new(rng.random_range(low..=high), 2))
        }
        (Some(_), Some(_)) => Ok(base_price), // no whole cent fits the interval
        _ => Err(out_of_range(base_price)),
    }
}

/// `probability[i] * (price[i] - base)` for every candidate, in order
pub fn calculate_expected_profits(
    potential_prices: &[Decimal],
    base_price: Decimal,
    probabilities: &[f64],
) -> Vec<f64> {
    potential_prices
        .iter()
        .zip(probabilities)
        .map(|(price, proba)| {
            let margin = price.checked_sub(base_price).and_then(|m| m.to_f64());
            proba * margin.unwrap_or(0.0)
        })
        .collect()
}

/// Index of the strictly largest value; the first one wins ties
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &value) in values.iter().enumerate() {
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_potential_prices_without_random_distances() {
        let expected: Vec<Decimal> = (900..3000)
            .step_by(5)
            .map(|i| Decimal::new(i, 2))
            .collect();

        let actual = get_potential_prices(dec!(10), false, &mut rng()).unwrap();

        assert_eq!(actual.len(), 420);
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_potential_prices_scale_with_base() {
        for base in [dec!(0.5), dec!(3.33), dec!(42), dec!(999.99)] {
            let prices = get_potential_prices(base, false, &mut rng()).unwrap();
            assert_eq!(prices.len(), GRID_POINTS);
            assert_eq!(prices[0], base * dec!(0.9));
            assert!(*prices.last().unwrap() < base * dec!(3));
            for pair in prices.windows(2) {
                assert_eq!(pair[1] - pair[0], base * dec!(0.005));
            }
        }
    }

    #[test]
    fn test_potential_prices_with_random_distances_are_in_range() {
        let mut rng = rng();
        for base in [dec!(1), dec!(10), dec!(57.25)] {
            for _ in 0..20 {
                let prices = get_potential_prices(base, true, &mut rng).unwrap();
                assert!(prices.len() >= 43, "too few: {}", prices.len());
                assert!(prices.len() <= 2100, "too many: {}", prices.len());
                assert!(prices.iter().all(|p| *p >= base * dec!(0.9) && *p <= base * dec!(3)));
                assert!(prices.windows(2).all(|w| w[1] > w[0]));
            }
        }
    }

    #[test]
    fn test_potential_prices_non_positive_base() {
        assert!(get_potential_prices(Decimal::ZERO, false, &mut rng()).unwrap().is_empty());
        assert!(get_potential_prices(dec!(-1), true, &mut rng()).unwrap().is_empty());
    }

    #[test]
    fn test_random_price_is_in_range() {
        let mut rng = rng();
        for _ in 0..500 {
            let price = random_price(dec!(10), &mut rng).unwrap();
            assert!(price >= dec!(8) && price <= dec!(30), "out of range: {}", price);
        }
    }

    #[test]
    fn test_random_price_tiny_base() {
        let price = random_price(dec!(0.001), &mut rng()).unwrap();
        assert_eq!(price, dec!(0.001));
    }

    #[test]
    fn test_huge_base_price_is_rejected() {
        for randomize in [false, true] {
            let result = get_potential_prices(Decimal::MAX, randomize, &mut rng());
            assert!(matches!(result, Err(MerchantError::InvalidPrice(_))));
        }
        assert!(matches!(
            random_price(Decimal::MAX, &mut rng()),
            Err(MerchantError::InvalidPrice(_))
        ));
        // representable, but not as a whole number of cents in i64
        let large = Decimal::from_i128_with_scale(10i128.pow(20), 0);
        assert!(random_price(large, &mut rng()).is_err());
    }

    #[test]
    fn test_checked_price_arithmetic() {
        assert_eq!(scale_price(dec!(10), dec!(1.5)).unwrap(), dec!(15));
        assert_eq!(offset_price(dec!(10), dec!(0.1)).unwrap(), dec!(10.1));
        assert!(matches!(
            scale_price(Decimal::MAX, dec!(2)),
            Err(MerchantError::InvalidPrice(_))
        ));
        assert!(offset_price(Decimal::MAX, dec!(1)).is_err());
    }

    #[test]
    fn test_calculate_expected_profits() {
        let prices = [dec!(9), dec!(9.5), dec!(10), dec!(10.5), dec!(11)];

        let actual = calculate_expected_profits(&prices, dec!(10.0), &[0.3, 0.4, 0.5, 0.6, 0.7]);

        assert_eq!(actual, vec![-0.3, -0.2, 0.0, 0.3, 0.7]);
    }

    #[test]
    fn test_argmax_first_occurrence_wins() {
        assert_eq!(argmax(&[0.1, 0.5, 0.5, 0.2]), Some(1));
        assert_eq!(argmax(&[-1.0, -2.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }
}
