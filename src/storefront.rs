//! What the customer can do, wired to the API, the local state and the notifications.
//!
//! Each action runs to completion before the next one starts. Whatever the server returns
//! for the cart replaces the local copy, so the last completed action wins.

use crate::api::*;
use crate::client::{ApiClient, ProductQuery};
use crate::errors::{Error, Result};
use crate::notify::Notifier;
use crate::pricing::{format_price, CheckoutSummary, DeliveryPolicy, Selection};
use crate::state::AppState;
use crate::tracker::Tracker;
use crate::validation;
use chrono::Utc;
use tracing::{info, instrument, warn};

pub struct Storefront {
    client: ApiClient,
    pub state: AppState,
    pub notifier: Notifier,
    policy: DeliveryPolicy,
}

impl Storefront {
    pub fn new(client: ApiClient, policy: DeliveryPolicy) -> Self {
        Storefront {
            client,
            state: AppState::default(),
            notifier: Notifier::new(),
            policy,
        }
    }

    /// Push a notification for the outcome of an action and pass the result through.
    ///
    /// An Unauthorized error also signs the user out locally.
    fn report<T>(&mut self, result: Result<T>, success: Option<String>, fallback: &str) -> Result<T> {
        match &result {
            Ok(_) => {
                if let Some(message) = success {
                    self.notifier.success(message);
                }
            }
            Err(err) => {
                if matches!(err, Error::Unauthorized) {
                    self.state.auth.signed_out();
                }
                self.notifier.error(err, fallback);
            }
        }
        result
    }

    fn require_login(&self) -> Result<()> {
        if self.state.auth.is_authenticated {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    // ------------------------------------------------------------- session

    /// Pick up a session stored by a previous run. Returns whether the user is signed in.
    #[instrument(skip(self))]
    pub fn restore_session(&mut self) -> bool {
        if !self.client.has_session() {
            self.state.auth.signed_out();
            return false;
        }
        self.state.auth.is_loading = true;
        match self.client.me() {
            Ok(user) => {
                self.state.auth.signed_in(user);
                true
            }
            Err(err) => {
                info!(error = %err, "Stored session is no longer valid");
                self.state.auth.signed_out();
                false
            }
        }
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub fn login(&mut self, credentials: &LoginCredentials) -> Result<User> {
        let result = validation::validate_login(credentials).and_then(|_| {
            self.state.auth.is_loading = true;
            self.client.login(credentials)
        });
        let user = self.report(result, Some("Login successful!".to_string()), "Login failed");
        let user = match user {
            Ok(user) => user,
            Err(err) => {
                self.state.auth.is_loading = false;
                return Err(err);
            }
        };
        self.state.auth.signed_in(user.clone());
        self.merge_guest_cart();
        Ok(user)
    }

    #[instrument(skip(self, credentials, confirm_password), fields(email = %credentials.email))]
    pub fn register(&mut self, credentials: &RegisterCredentials, confirm_password: &str) -> Result<User> {
        let result = validation::validate_register(credentials, confirm_password)
            .and_then(|_| self.client.register(credentials));
        let user = self.report(
            result,
            Some("Registration successful!".to_string()),
            "Registration failed",
        )?;
        self.state.auth.signed_in(user.clone());
        self.merge_guest_cart();
        Ok(user)
    }

    #[instrument(skip(self))]
    pub fn logout(&mut self) -> Result<()> {
        let result = self.client.logout();
        self.state.auth.signed_out();
        self.state.cart.clear();
        self.state.coupon.remove();
        self.report(
            result,
            Some("Logged out successfully".to_string()),
            "Failed to log out",
        )
    }

    /// Replay the lines added while signed out into the server cart, then drop the guest cart.
    ///
    /// Lines the server refuses are reported and skipped.
    fn merge_guest_cart(&mut self) {
        let guest_items = std::mem::take(&mut self.state.cart.items);
        if !guest_items.is_empty() {
            info!(lines = guest_items.len(), "Merging guest cart into account cart");
        }
        for item in guest_items {
            let new_item = NewCartItem {
                product_id: item.product.id.clone(),
                quantity: item.quantity,
                size: item.size.clone(),
                crust: item.crust.clone(),
                toppings: item.toppings.clone(),
            };
            if let Err(err) = self.client.add_to_cart(&new_item) {
                warn!(product = %item.product.id, error = %err, "Could not merge guest line");
                let fallback = format!("Could not keep {} in your cart", item.product.name);
                self.notifier.error(&err, &fallback);
            }
        }
        // Not fatal: the cart is fetched again on the next cart action
        if let Err(err) = self.refresh_cart() {
            warn!(error = %err, "Could not load account cart after login");
        }
    }

    // ---------------------------------------------------------------- menu

    /// Load the menu, optionally restricted to one category
    #[instrument(skip(self))]
    pub fn load_menu(&mut self, category: Option<Category>) -> Result<&[Product]> {
        self.state.products.is_loading = true;
        let result = match category {
            Some(category) => self.client.products_by_category(category),
            None => self
                .client
                .products(&ProductQuery::default())
                .map(|page| page.data),
        };
        self.state.products.is_loading = false;
        let products = self.report(result, None, "Failed to load menu")?;
        self.state.products.products = products;
        self.state.products.selected_category = category;
        Ok(&self.state.products.products)
    }

    #[instrument(skip(self))]
    pub fn product(&mut self, product_id: &str) -> Result<Product> {
        let result = self.lookup_product(product_id);
        self.report(result, None, "Product not found")
    }

    /// From the loaded menu when possible, from the API otherwise
    fn lookup_product(&mut self, product_id: &str) -> Result<Product> {
        match self.state.products.find(product_id) {
            Some(product) => Ok(product.clone()),
            None => self.client.product(product_id),
        }
    }

    // ---------------------------------------------------------------- cart

    /// Fetch the account cart and make it the local truth
    #[instrument(skip(self))]
    pub fn refresh_cart(&mut self) -> Result<()> {
        let result = self.require_login().and_then(|_| {
            self.state.cart.is_loading = true;
            self.client.cart()
        });
        self.state.cart.is_loading = false;
        let cart = self.report(result, None, "Failed to load cart")?;
        self.state.cart.replace(cart);
        self.reconcile_coupon();
        Ok(())
    }

    /// Add a customized product. Guests get a local line priced on the client.
    #[instrument(skip(self))]
    pub fn add_to_cart(&mut self, product_id: &str, selection: Selection, quantity: u32) -> Result<()> {
        let quantity = quantity.max(1);
        let result = if self.state.auth.is_authenticated {
            let new_item = NewCartItem {
                product_id: product_id.to_string(),
                quantity,
                size: selection.size,
                crust: selection.crust,
                toppings: selection.toppings,
            };
            self.client
                .add_to_cart(&new_item)
                .map(|cart| self.state.cart.replace(cart))
        } else {
            self.lookup_product(product_id).and_then(|product| {
                if product.is_available {
                    self.state.cart.add_local(&product, selection, quantity);
                    Ok(())
                } else {
                    Err(Error::BadRequest(format!("{} is not available", product.name)))
                }
            })
        };
        self.report(result, Some("Added to cart".to_string()), "Failed to add to cart")?;
        self.reconcile_coupon();
        Ok(())
    }

    /// Change a line's quantity; anything below 1 removes the line
    #[instrument(skip(self))]
    pub fn update_quantity(&mut self, item_id: &str, quantity: u32) -> Result<()> {
        if quantity < 1 {
            return self.remove_item(item_id);
        }
        let result = if self.state.auth.is_authenticated {
            self.client
                .update_cart_item(item_id, quantity)
                .map(|cart| self.state.cart.replace(cart))
        } else if self.state.cart.set_local_quantity(item_id, quantity) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("No cart item {}", item_id)))
        };
        self.report(result, None, "Failed to update cart")?;
        self.reconcile_coupon();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn remove_item(&mut self, item_id: &str) -> Result<()> {
        let result = if self.state.auth.is_authenticated {
            self.client
                .remove_cart_item(item_id)
                .map(|cart| self.state.cart.replace(cart))
        } else if self.state.cart.remove_local(item_id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("No cart item {}", item_id)))
        };
        self.report(
            result,
            Some("Item removed from cart".to_string()),
            "Failed to remove item",
        )?;
        self.reconcile_coupon();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) -> Result<()> {
        let result = if self.state.auth.is_authenticated {
            self.client.clear_cart().map(|_| ())
        } else {
            Ok(())
        };
        self.report(result, Some("Cart cleared".to_string()), "Failed to clear cart")?;
        self.state.cart.clear();
        self.state.coupon.remove();
        Ok(())
    }

    // -------------------------------------------------------------- coupon

    /// Look the code up and apply it to the current cart. Returns the discount.
    ///
    /// A coupon the cart does not qualify for is reported and leaves the totals unchanged.
    #[instrument(skip(self))]
    pub fn apply_coupon(&mut self, code: &str) -> Result<f64> {
        let code = validation::normalize_coupon_code(code);
        let subtotal = self.state.cart.total();
        let result = if code.is_empty() {
            Err(Error::CouponRejected("Please enter a coupon code".to_string()))
        } else {
            self.client
                .validate_coupon(&code)
                .and_then(|coupon| self.state.coupon.apply(coupon, subtotal, Utc::now()))
        };
        let success = result
            .as_ref()
            .ok()
            .map(|discount| format!("Coupon applied! You save {}", format_price(*discount)));
        self.report(result, success, "Invalid coupon code")
    }

    pub fn remove_coupon(&mut self) {
        self.state.coupon.remove();
    }

    fn reconcile_coupon(&mut self) {
        let subtotal = self.state.cart.total();
        if let Some(coupon) = self.state.coupon.reconcile(subtotal, Utc::now()) {
            let err = Error::CouponRejected(format!(
                "Coupon {} no longer applies to your cart",
                coupon.code
            ));
            self.notifier.error(&err, "Coupon removed");
        }
    }

    /// Current price breakdown of the cart
    pub fn summary(&self) -> CheckoutSummary {
        self.state
            .coupon
            .summary(self.state.cart.total(), &self.policy, Utc::now())
    }

    // ------------------------------------------------------------ checkout

    /// Place the order for the current cart. The cart and coupon are cleared on success.
    #[instrument(skip(self))]
    pub fn checkout(&mut self, address_id: Option<&str>, payment_method: PaymentMethod) -> Result<Order> {
        let result = self.require_login().and_then(|_| {
            let address_id = address_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| Error::Checkout("Please select a delivery address".to_string()))?;
            if self.state.cart.is_empty() {
                return Err(Error::Checkout("Your cart is empty".to_string()));
            }
            let new_order = NewOrder {
                address_id: address_id.to_string(),
                payment_method,
                coupon_code: self.state.coupon.code().map(str::to_string),
            };
            self.client.create_order(&new_order)
        });

        let expected = self.summary();
        let order = self.report(
            result,
            Some("Order placed successfully!".to_string()),
            "Failed to place order",
        )?;

        if (order.total_amount - expected.total).abs() > 0.005 {
            warn!(
                server = order.total_amount,
                client = expected.total,
                "Server total differs from the client estimate"
            );
        }
        self.state.cart.clear();
        self.state.coupon.remove();
        Ok(order)
    }

    // -------------------------------------------------------------- orders

    #[instrument(skip(self))]
    pub fn orders(&mut self) -> Result<Vec<Order>> {
        let result = self.require_login().and_then(|_| self.client.orders());
        self.report(result, None, "Failed to load orders")
    }

    #[instrument(skip(self))]
    pub fn order(&mut self, order_id: &str) -> Result<(Order, Tracker)> {
        let result = self.require_login().and_then(|_| self.client.order(order_id));
        let order = self.report(result, None, "Failed to load order")?;
        let tracker = Tracker::for_status(&order.order_status);
        Ok((order, tracker))
    }

    #[instrument(skip(self))]
    pub fn track(&mut self, order_number: &str) -> Result<(Order, Tracker)> {
        let result = self.client.track_order(order_number);
        let order = self.report(result, None, "Order not found")?;
        let tracker = Tracker::for_status(&order.order_status);
        Ok((order, tracker))
    }

    // ------------------------------------------------------------- profile

    #[instrument(skip(self))]
    pub fn update_profile(&mut self, update: &ProfileUpdate) -> Result<User> {
        let result = self
            .require_login()
            .and_then(|_| validation::validate_profile(update))
            .and_then(|_| self.client.update_profile(update));
        let user = self.report(
            result,
            Some("Profile updated successfully".to_string()),
            "Failed to update profile",
        )?;
        self.state.auth.user = Some(user.clone());
        Ok(user)
    }

    /// Addresses on the profile, fetched fresh
    #[instrument(skip(self))]
    pub fn addresses(&mut self) -> Result<Vec<Address>> {
        let result = self.require_login().and_then(|_| self.client.profile());
        let user = self.report(result, None, "Failed to load profile")?;
        let addresses = user.addresses.clone();
        self.state.auth.user = Some(user);
        Ok(addresses)
    }

    #[instrument(skip(self))]
    pub fn add_address(&mut self, address: &AddressInput) -> Result<Address> {
        let result = self
            .require_login()
            .and_then(|_| validation::validate_address(address))
            .and_then(|_| self.client.add_address(address));
        let added = self.report(
            result,
            Some("Address added successfully".to_string()),
            "Failed to save address",
        )?;
        if let Some(user) = self.state.auth.user.as_mut() {
            user.addresses.push(added.clone());
        }
        Ok(added)
    }

    #[instrument(skip(self))]
    pub fn update_address(&mut self, address_id: &str, address: &AddressInput) -> Result<Address> {
        let result = self
            .require_login()
            .and_then(|_| validation::validate_address(address))
            .and_then(|_| self.client.update_address(address_id, address));
        let updated = self.report(
            result,
            Some("Address updated successfully".to_string()),
            "Failed to save address",
        )?;
        if let Some(user) = self.state.auth.user.as_mut() {
            if let Some(slot) = user.addresses.iter_mut().find(|a| a.id == updated.id) {
                *slot = updated.clone();
            }
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub fn delete_address(&mut self, address_id: &str) -> Result<()> {
        let result = self
            .require_login()
            .and_then(|_| self.client.delete_address(address_id));
        let remaining = self.report(
            result,
            Some("Address deleted successfully".to_string()),
            "Failed to delete address",
        )?;
        if let Some(user) = self.state.auth.user.as_mut() {
            user.addresses = remaining;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::notify::Level;
    use crate::session::mock::MemoryStore;

    fn guest() -> Storefront {
        // Nothing listens here; guest paths must fail before connecting.
        let client = ApiClient::new("127.0.0.1:9", Box::new(MemoryStore::new()));
        Storefront::new(client, DeliveryPolicy::default())
    }

    #[test]
    fn test_guest_cart_refresh_is_reported() {
        let mut shop = guest();
        assert!(matches!(shop.refresh_cart(), Err(Error::Unauthorized)));
        assert!(!shop.state.cart.is_loading);

        let notification = shop.notifier.last().unwrap();
        assert_eq!(notification.message, "Please login to continue");
        assert_eq!(notification.level, Level::Error);
    }

    #[test]
    fn test_guest_orders_are_reported() {
        let mut shop = guest();
        assert!(shop.orders().is_err());
        assert_eq!(shop.notifier.drain().len(), 1);
    }
}
