//! Client-side application state, mirroring what the server last told us.

use crate::api::{Cart, CartItem, Category, Coupon, Product, User};
use crate::errors::Result;
use crate::pricing::{self, CheckoutSummary, DeliveryPolicy, Selection};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl AuthState {
    pub fn signed_in(&mut self, user: User) {
        self.user = Some(user);
        self.is_authenticated = true;
        self.is_loading = false;
    }

    pub fn signed_out(&mut self) {
        self.user = None;
        self.is_authenticated = false;
        self.is_loading = false;
    }
}

/// Cart lines, either the server's copy or a guest cart held only locally
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub is_loading: bool,
}

/// Suffix keeping guest line ids unique within a process
static GUEST_LINE_COUNTER: AtomicU64 = AtomicU64::new(0);

impl CartState {
    /// Number of units in the cart
    pub fn items_count(&self) -> u32 {
        self.items.iter().fold(0, |count: u32, item| count.saturating_add(item.quantity))
    }

    pub fn total(&self) -> f64 {
        pricing::subtotal(&self.items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the server's cart as the new truth
    pub fn replace(&mut self, cart: Cart) {
        self.items = cart.items;
        self.is_loading = false;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.is_loading = false;
    }

    /// Add a line to the guest cart, pricing it locally
    pub fn add_local(&mut self, product: &Product, selection: Selection, quantity: u32) -> &CartItem {
        let quantity = quantity.max(1);
        let id = format!(
            "{}-{}-{}",
            product.id,
            Utc::now().timestamp_millis(),
            GUEST_LINE_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let item_total = pricing::line_total(product, &selection, quantity);

        self.items.push(CartItem {
            id,
            product: product.clone(),
            quantity,
            size: selection.size,
            crust: selection.crust,
            toppings: selection.toppings,
            item_total,
        });
        &self.items[self.items.len() - 1]
    }

    /// Change the quantity of a guest line. A quantity below 1 removes it.
    ///
    /// Returns false if no line has this id.
    pub fn set_local_quantity(&mut self, item_id: &str, quantity: u32) -> bool {
        if quantity < 1 {
            return self.remove_local(item_id);
        }
        match self.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                item.item_total =
                    pricing::line_total(&item.product, &Selection::of_item(item), quantity);
                true
            }
            None => false,
        }
    }

    pub fn remove_local(&mut self, item_id: &str) -> bool {
        let old_len = self.items.len();
        self.items.retain(|item| item.id != item_id);
        old_len != self.items.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductState {
    pub products: Vec<Product>,
    pub is_loading: bool,
    pub selected_category: Option<Category>,
}

impl ProductState {
    /// Products of the selected category, or all of them when none is selected
    pub fn filtered(&self) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| self.selected_category.map_or(true, |c| p.category == c))
            .collect()
    }

    /// Every category with its products, in menu order
    pub fn by_category(&self) -> Vec<(Category, Vec<&Product>)> {
        Category::ALL
            .into_iter()
            .map(|category| {
                let products = self
                    .products
                    .iter()
                    .filter(|p| p.category == category)
                    .collect();
                (category, products)
            })
            .collect()
    }

    pub fn find(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }
}

/// The coupon the customer applied to the current cart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouponState {
    pub coupon: Option<Coupon>,
}

impl CouponState {
    /// Apply `coupon` to a cart worth `subtotal`, returning the discount.
    ///
    /// On rejection the previously applied coupon, if any, stays in place.
    pub fn apply(&mut self, coupon: Coupon, subtotal: f64, now: DateTime<Utc>) -> Result<f64> {
        let discount = pricing::validate_coupon(&coupon, subtotal, now)?;
        self.coupon = Some(coupon);
        Ok(discount)
    }

    pub fn remove(&mut self) {
        self.coupon = None;
    }

    pub fn code(&self) -> Option<&str> {
        self.coupon.as_ref().map(|c| c.code.as_str())
    }

    /// Drop the coupon if the cart no longer qualifies for it. Returns the dropped coupon.
    pub fn reconcile(&mut self, subtotal: f64, now: DateTime<Utc>) -> Option<Coupon> {
        let still_valid = self
            .coupon
            .as_ref()
            .map_or(true, |c| pricing::validate_coupon(c, subtotal, now).is_ok());
        if still_valid {
            None
        } else {
            self.coupon.take()
        }
    }

    pub fn summary(&self, subtotal: f64, policy: &DeliveryPolicy, now: DateTime<Utc>) -> CheckoutSummary {
        pricing::summarize(subtotal, self.coupon.as_ref(), policy, now)
    }
}

/// Everything the storefront keeps between user actions
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub auth: AuthState,
    pub cart: CartState,
    pub products: ProductState,
    pub coupon: CouponState,
}
