//! Seed data of the development backend

use crate::api::{Category, Coupon, DiscountType, Product, ProductOption};
use chrono::{DateTime, Duration, Utc};

fn option(name: &str, price: f64, is_veg: Option<bool>) -> ProductOption {
    ProductOption {
        name: name.to_string(),
        price,
        is_veg,
    }
}

fn crusts() -> Vec<ProductOption> {
    vec![
        option("Classic Hand Tossed", 0.0, None),
        option("Cheese Burst", 99.0, None),
        option("Thin Crust", 0.0, None),
    ]
}

fn pizza(
    id: &str,
    name: &str,
    description: &str,
    is_veg: bool,
    sizes: [f64; 3],
    toppings: &[(&str, f64, bool)],
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category: Category::Pizza,
        base_price: sizes[0],
        image: format!("/images/{}.jpg", id),
        is_veg,
        is_available: true,
        sizes: vec![
            option("small", sizes[0], None),
            option("medium", sizes[1], None),
            option("large", sizes[2], None),
        ],
        crusts: crusts(),
        toppings: toppings
            .iter()
            .map(|(name, price, veg)| option(name, *price, Some(*veg)))
            .collect(),
    }
}

fn simple(id: &str, name: &str, description: &str, category: Category, price: f64) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        base_price: price,
        image: format!("/images/{}.jpg", id),
        is_veg: true,
        is_available: true,
        sizes: vec![],
        crusts: vec![],
        toppings: vec![],
    }
}

pub fn products() -> Vec<Product> {
    let mut strawberry_tub = simple(
        "24",
        "Strawberry Ice Cream Tub",
        "Delicious strawberry ice cream tub",
        Category::Desserts,
        79.0,
    );
    strawberry_tub.is_available = false;

    vec![
        pizza(
            "1",
            "Margherita",
            "Classic delight with 100% real mozzarella cheese",
            true,
            [199.0, 349.0, 549.0],
            &[("Extra Cheese", 59.0, true), ("Black Olives", 49.0, true), ("Jalapeno", 39.0, true)],
        ),
        pizza(
            "2",
            "Farmhouse",
            "Delightful combination of onion, capsicum, tomato & grilled mushroom",
            true,
            [299.0, 449.0, 649.0],
            &[("Extra Cheese", 59.0, true), ("Paneer", 69.0, true), ("Corn", 49.0, true)],
        ),
        pizza(
            "3",
            "Peppy Paneer",
            "Chunky paneer with crisp capsicum and spicy red pepper",
            true,
            [349.0, 499.0, 699.0],
            &[("Extra Cheese", 59.0, true), ("Extra Paneer", 79.0, true), ("Mushroom", 59.0, true)],
        ),
        pizza(
            "5",
            "Chicken Dominator",
            "Loaded with double pepper barbecue chicken, peri-peri chicken and grilled chicken rashers",
            false,
            [499.0, 649.0, 849.0],
            &[("Extra Cheese", 59.0, true), ("Extra Chicken", 99.0, false), ("Onion", 29.0, true)],
        ),
        simple(
            "9",
            "Garlic Breadsticks",
            "Baked to perfection with garlic butter",
            Category::Sides,
            129.0,
        ),
        simple(
            "10",
            "Stuffed Garlic Bread",
            "Freshly baked garlic bread stuffed with mozzarella and corn",
            Category::Sides,
            169.0,
        ),
        simple(
            "11",
            "Coca Cola (750ml)",
            "The perfect companion to your pizza",
            Category::Beverages,
            57.0,
        ),
        simple(
            "13",
            "Thums Up (750ml)",
            "Strong fizzy refreshment with bold taste",
            Category::Beverages,
            57.0,
        ),
        simple(
            "17",
            "Choco Lava Cake",
            "Chocolate cake with gooey molten lava inside",
            Category::Desserts,
            99.0,
        ),
        simple(
            "18",
            "Brownie Fantasy",
            "Rich chocolate brownie topped with chocolate sauce",
            Category::Desserts,
            119.0,
        ),
        strawberry_tub,
    ]
}

#[allow(clippy::too_many_arguments)]
fn coupon(
    code: &str,
    description: &str,
    discount_type: DiscountType,
    discount_value: f64,
    min_order_amount: f64,
    max_discount: f64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
) -> Coupon {
    Coupon {
        id: format!("coupon-{}", code.to_ascii_lowercase()),
        code: code.to_string(),
        description: description.to_string(),
        discount_type,
        discount_value,
        min_order_amount,
        max_discount,
        valid_from,
        valid_until,
        is_active: true,
    }
}

/// Coupons valid relative to `now`, plus one that has already expired
pub fn coupons(now: DateTime<Utc>) -> Vec<Coupon> {
    let from = now - Duration::days(30);
    let until = now + Duration::days(365);
    vec![
        coupon(
            "WELCOME50",
            "Flat ₹50 off on your first order",
            DiscountType::Flat,
            50.0,
            300.0,
            50.0,
            from,
            until,
        ),
        coupon(
            "PIZZA20",
            "20% off up to ₹150",
            DiscountType::Percentage,
            20.0,
            400.0,
            150.0,
            from,
            until,
        ),
        coupon(
            "SUMMER10",
            "10% off, summer special",
            DiscountType::Percentage,
            10.0,
            0.0,
            100.0,
            now - Duration::days(120),
            now - Duration::days(30),
        ),
    ]
}
