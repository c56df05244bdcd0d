//! Effective unit price from a product's discount fields.
//!
//! Signals are checked in priority order:
//! 1. explicit percentage plus precomputed discounted prices,
//! 2. explicit percentage alone,
//! 3. a free-text offer such as `"Oferta 20%"`, `"$5 off"` or `"Bs 40"`,
//! 4. nothing, in which case there is no discount.
//!
//! Discounted prices are floored at zero.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::{Deserialize, Serialize};

use super::order::Prices;

/// Catalog snapshot of a product as the storefront priced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedProduct {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub price_usd: BigDecimal,
    pub price_bs: BigDecimal,
    #[serde(default)]
    pub discount_percentage: Option<BigDecimal>,
    #[serde(default)]
    pub discounted_price_usd: Option<BigDecimal>,
    #[serde(default)]
    pub discounted_price_bs: Option<BigDecimal>,
    #[serde(default)]
    pub offer: Option<String>,
}

impl PricedProduct {
    pub fn original_prices(&self) -> Prices {
        Prices::new(self.price_usd.clone(), self.price_bs.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    pub percentage: BigDecimal,
    pub original: Prices,
    pub discounted: Prices,
}

enum Offer {
    Percent(BigDecimal),
    FixedUsd(BigDecimal),
    FixedBs(BigDecimal),
}

pub fn discount(product: &PricedProduct) -> Option<Discount> {
    let original = product.original_prices();

    if let Some(pct) = product
        .discount_percentage
        .as_ref()
        .filter(|p| *p > &BigDecimal::zero())
    {
        let pct = clamp_percentage(pct.clone());
        let discounted = Prices::new(
            product
                .discounted_price_usd
                .clone()
                .unwrap_or_else(|| apply_percentage(&original.usd, &pct)),
            product
                .discounted_price_bs
                .clone()
                .unwrap_or_else(|| apply_percentage(&original.bs, &pct)),
        );
        return Some(Discount {
            percentage: pct,
            discounted: floor_zero(discounted),
            original,
        });
    }

    let offer = product.offer.as_deref().and_then(parse_offer)?;
    let (percentage, discounted) = match offer {
        Offer::Percent(pct) => {
            let pct = clamp_percentage(pct);
            let discounted = Prices::new(
                apply_percentage(&original.usd, &pct),
                apply_percentage(&original.bs, &pct),
            );
            (pct, discounted)
        }
        Offer::FixedUsd(amount) => fixed_amount(&original.usd, &original.bs, &amount),
        Offer::FixedBs(amount) => {
            let (pct, swapped) = fixed_amount(&original.bs, &original.usd, &amount);
            (pct, Prices::new(swapped.bs, swapped.usd))
        }
    };

    Some(Discount {
        percentage,
        discounted: floor_zero(discounted),
        original,
    })
}

/// Unit price to charge: the discounted price when a discount applies,
/// otherwise the list price.
pub fn effective_unit_price(product: &PricedProduct) -> Prices {
    discount(product)
        .map(|d| d.discounted)
        .unwrap_or_else(|| product.original_prices())
}

fn clamp_percentage(pct: BigDecimal) -> BigDecimal {
    let hundred = BigDecimal::from(100);
    if pct > hundred {
        hundred
    } else {
        pct
    }
}

fn apply_percentage(price: &BigDecimal, pct: &BigDecimal) -> BigDecimal {
    let hundred = BigDecimal::from(100);
    round_money(price * (&hundred - pct) / hundred)
}

/// Subtracts `amount` from `primary` and scales `secondary` by the same factor.
fn fixed_amount(primary: &BigDecimal, secondary: &BigDecimal, amount: &BigDecimal) -> (BigDecimal, Prices) {
    if primary <= &BigDecimal::zero() {
        return (BigDecimal::zero(), Prices::new(primary.clone(), secondary.clone()));
    }
    let reduced = primary - amount;
    let reduced = if reduced < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        reduced
    };
    let ratio = &reduced / primary;
    let pct = round_money((BigDecimal::from(1) - &ratio) * BigDecimal::from(100));
    let scaled = round_money(secondary * &ratio);
    (pct, Prices::new(round_money(reduced), scaled))
}

fn floor_zero(prices: Prices) -> Prices {
    let floor = |v: BigDecimal| if v < BigDecimal::zero() { BigDecimal::zero() } else { v };
    Prices::new(floor(prices.usd), floor(prices.bs))
}

fn round_money(v: BigDecimal) -> BigDecimal {
    v.with_scale_round(2, RoundingMode::HalfUp)
}

fn parse_offer(text: &str) -> Option<Offer> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(head) = text.strip_suffix('%') {
        let digits: String = head
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return parse_number(&digits).map(Offer::Percent);
    }

    if let Some(rest) = text.strip_prefix('$') {
        return leading_number(rest).map(Offer::FixedUsd);
    }

    let lower = text.to_ascii_lowercase();
    if lower.starts_with("bs") {
        let rest = text[2..].trim_start_matches(['.', ' ']);
        return leading_number(rest).map(Offer::FixedBs);
    }

    None
}

fn leading_number(text: &str) -> Option<BigDecimal> {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    parse_number(&digits)
}

fn parse_number(digits: &str) -> Option<BigDecimal> {
    let normalized = digits.trim_matches(|c| c == '.' || c == ',').replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized
        .parse::<BigDecimal>()
        .ok()
        .filter(|v| v > &BigDecimal::zero())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn product(usd: &str, bs: &str) -> PricedProduct {
        PricedProduct {
            name: "Widget".into(),
            price_usd: dec(usd),
            price_bs: dec(bs),
            ..Default::default()
        }
    }

    #[test]
    fn no_signal_means_no_discount() {
        assert!(discount(&product("10", "360")).is_none());
        assert_eq!(effective_unit_price(&product("10", "360")), Prices::new(dec("10"), dec("360")));
    }

    #[test]
    fn precomputed_prices_are_used_as_is() {
        let mut p = product("10", "360");
        p.discount_percentage = Some(dec("15"));
        p.discounted_price_usd = Some(dec("8.75"));
        p.discounted_price_bs = Some(dec("300"));

        let d = discount(&p).expect("discount");
        assert_eq!(d.percentage, dec("15"));
        assert_eq!(d.discounted, Prices::new(dec("8.75"), dec("300")));
        assert_eq!(d.original, Prices::new(dec("10"), dec("360")));
    }

    #[test]
    fn percentage_alone_is_applied_to_both_currencies() {
        let mut p = product("10", "360");
        p.discount_percentage = Some(dec("20"));

        let d = discount(&p).expect("discount");
        assert_eq!(d.discounted.usd, dec("8.00"));
        assert_eq!(d.discounted.bs, dec("288.00"));
    }

    #[test]
    fn zero_percentage_falls_through_to_offer() {
        let mut p = product("10", "360");
        p.discount_percentage = Some(dec("0"));
        p.offer = Some("Oferta 50%".into());

        let d = discount(&p).expect("discount");
        assert_eq!(d.percentage, dec("50"));
        assert_eq!(d.discounted.usd, dec("5.00"));
    }

    #[test]
    fn offer_with_trailing_percentage() {
        let mut p = product("20", "720");
        p.offer = Some("Black friday 25%".into());

        let d = discount(&p).expect("discount");
        assert_eq!(d.discounted, Prices::new(dec("15.00"), dec("540.00")));
    }

    #[test]
    fn offer_with_fixed_usd_amount() {
        let mut p = product("20", "720");
        p.offer = Some("$5 de descuento".into());

        let d = discount(&p).expect("discount");
        assert_eq!(d.discounted.usd, dec("15.00"));
        assert_eq!(d.discounted.bs, dec("540.00"));
        assert_eq!(d.percentage, dec("25.00"));
    }

    #[test]
    fn offer_with_fixed_bs_amount() {
        let mut p = product("20", "720");
        p.offer = Some("Bs 180".into());

        let d = discount(&p).expect("discount");
        assert_eq!(d.discounted.bs, dec("540.00"));
        assert_eq!(d.discounted.usd, dec("15.00"));
    }

    #[test]
    fn fixed_amount_larger_than_price_floors_at_zero() {
        let mut p = product("3", "108");
        p.offer = Some("$10".into());

        let d = discount(&p).expect("discount");
        assert_eq!(d.discounted.usd, dec("0"));
        assert_eq!(d.discounted.bs, dec("0"));
        assert_eq!(d.percentage, dec("100"));
    }

    #[test]
    fn percentage_above_hundred_never_goes_negative() {
        let mut p = product("10", "360");
        p.discount_percentage = Some(dec("150"));

        let d = discount(&p).expect("discount");
        assert!(d.discounted.usd >= BigDecimal::zero());
        assert!(d.discounted.bs >= BigDecimal::zero());
    }

    #[test]
    fn negative_precomputed_price_is_floored() {
        let mut p = product("10", "360");
        p.discount_percentage = Some(dec("10"));
        p.discounted_price_usd = Some(dec("-1"));

        let d = discount(&p).expect("discount");
        assert_eq!(d.discounted.usd, BigDecimal::zero());
    }

    #[test]
    fn unparseable_offer_is_ignored() {
        let mut p = product("10", "360");
        p.offer = Some("Free shipping".into());
        assert!(discount(&p).is_none());
    }
}
