//! Client-side price computation: what a customized line costs, and what the customer pays
//! at checkout once delivery and an optional coupon are accounted for.

use crate::api::{CartItem, Coupon, DiscountType, Product, ProductOption};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};

/// Subtotal from which delivery is free
pub const FREE_DELIVERY_THRESHOLD: f64 = 500.0;

/// Delivery fee charged below the threshold
pub const DELIVERY_FEE: f64 = 49.0;

/// The customizations picked for one product.
///
/// Names that do not match any option of the product are ignored when pricing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub size: Option<String>,
    pub crust: Option<String>,
    pub toppings: Vec<String>,
}

impl Selection {
    pub fn new(size: Option<&str>, crust: Option<&str>, toppings: &[&str]) -> Selection {
        Selection {
            size: size.map(str::to_string),
            crust: crust.map(str::to_string),
            toppings: toppings.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// The selection stored on a cart line
    pub fn of_item(item: &CartItem) -> Selection {
        Selection {
            size: item.size.clone(),
            crust: item.crust.clone(),
            toppings: item.toppings.clone(),
        }
    }
}

fn option_price(options: &[ProductOption], name: Option<&str>) -> Option<f64> {
    let name = name?;
    options.iter().find(|o| o.name == name).map(|o| o.price)
}

/// Price of a single unit of `product` with the given customizations.
///
/// The size price replaces the base price; crust and toppings are added on top.
pub fn unit_price(product: &Product, selection: &Selection) -> f64 {
    let size = option_price(&product.sizes, selection.size.as_deref()).unwrap_or(product.base_price);
    let crust = option_price(&product.crusts, selection.crust.as_deref()).unwrap_or(0.0);
    // Iterating the product's list rather than the selection prices a topping once even if
    // it was selected twice.
    let toppings: f64 = product
        .toppings
        .iter()
        .filter(|t| selection.toppings.iter().any(|s| *s == t.name))
        .map(|t| t.price)
        .sum();

    size + crust + toppings
}

/// Total for a cart line. A quantity of 0 is priced as 1.
pub fn line_total(product: &Product, selection: &Selection, quantity: u32) -> f64 {
    unit_price(product, selection) * quantity.max(1) as f64
}

/// Sum of the item totals of a cart
pub fn subtotal(items: &[CartItem]) -> f64 {
    items.iter().map(|item| item.item_total).sum()
}

/// Flat delivery pricing with a free-delivery threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryPolicy {
    pub threshold: f64,
    pub fee: f64,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        DeliveryPolicy {
            threshold: FREE_DELIVERY_THRESHOLD,
            fee: DELIVERY_FEE,
        }
    }
}

impl DeliveryPolicy {
    /// Delivery charge for a subtotal, waived at or above the threshold
    pub fn charge(&self, subtotal: f64) -> f64 {
        if subtotal >= self.threshold {
            0.0
        } else {
            self.fee
        }
    }

    /// How much more the customer has to add to get free delivery, if anything
    pub fn remaining_for_free_delivery(&self, subtotal: f64) -> Option<f64> {
        (subtotal < self.threshold).then(|| self.threshold - subtotal)
    }
}

/// Discount a coupon grants on `subtotal`, ignoring its eligibility rules.
pub fn coupon_discount(coupon: &Coupon, subtotal: f64) -> f64 {
    match coupon.discount_type {
        DiscountType::Percentage => {
            (subtotal * coupon.discount_value / 100.0).min(coupon.max_discount)
        }
        DiscountType::Flat => coupon.discount_value,
    }
}

/// Check that `coupon` can be applied to `subtotal` at time `now` and return the discount.
///
/// Returns Error::CouponRejected when the coupon is inactive, outside its validity window,
/// or when the subtotal is below its minimum order amount.
pub fn validate_coupon(coupon: &Coupon, subtotal: f64, now: DateTime<Utc>) -> Result<f64> {
    if !coupon.is_active {
        return Err(Error::CouponRejected(format!(
            "Coupon {} is no longer active",
            coupon.code
        )));
    }
    if now < coupon.valid_from {
        return Err(Error::CouponRejected(format!(
            "Coupon {} is not valid yet",
            coupon.code
        )));
    }
    if now > coupon.valid_until {
        return Err(Error::CouponRejected(format!(
            "Coupon {} has expired",
            coupon.code
        )));
    }
    if subtotal < coupon.min_order_amount {
        return Err(Error::CouponRejected(format!(
            "Minimum order amount is {}",
            format_price(coupon.min_order_amount)
        )));
    }
    Ok(coupon_discount(coupon, subtotal))
}

/// Everything the customer sees in the price breakdown
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSummary {
    pub subtotal: f64,
    pub discount: f64,
    pub delivery_charge: f64,
    pub total: f64,
    /// Code of the coupon that produced `discount`, if one was applied
    pub coupon_code: Option<String>,
    pub remaining_for_free_delivery: Option<f64>,
}

/// Assemble the checkout totals.
///
/// A coupon that is not eligible for this subtotal contributes no discount. The total never
/// goes below zero, even when a flat coupon is worth more than the order.
pub fn summarize(
    subtotal: f64,
    coupon: Option<&Coupon>,
    policy: &DeliveryPolicy,
    now: DateTime<Utc>,
) -> CheckoutSummary {
    let (discount, coupon_code) = coupon
        .and_then(|c| {
            validate_coupon(c, subtotal, now)
                .ok()
                .map(|d| (d, Some(c.code.clone())))
        })
        .unwrap_or((0.0, None));
    let delivery_charge = policy.charge(subtotal);

    CheckoutSummary {
        subtotal,
        discount,
        delivery_charge,
        total: (subtotal - discount + delivery_charge).max(0.0),
        coupon_code,
        remaining_for_free_delivery: policy.remaining_for_free_delivery(subtotal),
    }
}

/// Render an amount in rupees, without decimals when it is a whole number
pub fn format_price(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("₹{:.0}", amount)
    } else {
        format!("₹{:.2}", amount)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::api::Category;
    use chrono::TimeZone;

    pub fn option(name: &str, price: f64) -> ProductOption {
        ProductOption {
            name: name.to_string(),
            price,
            is_veg: None,
        }
    }

    pub fn margherita() -> Product {
        Product {
            id: "1".to_string(),
            name: "Margherita".to_string(),
            description: "Classic delight with 100% real mozzarella cheese".to_string(),
            category: Category::Pizza,
            base_price: 199.0,
            image: String::new(),
            is_veg: true,
            is_available: true,
            sizes: vec![
                option("small", 199.0),
                option("medium", 349.0),
                option("large", 549.0),
            ],
            crusts: vec![option("Classic Hand Tossed", 0.0), option("Cheese Burst", 99.0)],
            toppings: vec![
                option("Extra Cheese", 59.0),
                option("Black Olives", 49.0),
                option("Jalapeno", 39.0),
            ],
        }
    }

    pub fn garlic_bread() -> Product {
        Product {
            id: "9".to_string(),
            name: "Garlic Breadsticks".to_string(),
            description: "Baked to perfection".to_string(),
            category: Category::Sides,
            base_price: 129.0,
            image: String::new(),
            is_veg: true,
            is_available: true,
            sizes: vec![],
            crusts: vec![],
            toppings: vec![],
        }
    }

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn coupon(code: &str, discount_type: DiscountType, value: f64, min: f64, cap: f64) -> Coupon {
        Coupon {
            id: format!("c-{}", code),
            code: code.to_string(),
            description: "Test coupon".to_string(),
            discount_type,
            discount_value: value,
            min_order_amount: min,
            max_discount: cap,
            valid_from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            valid_until: Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap(),
            is_active: true,
        }
    }
}
