//! Typed client for the storefront REST API.
//!
//! Every call opens its own connection, attaches the session token when one is stored, and
//! unwraps the `{ success, data, message }` envelope. A 401 forgets the stored token.

use crate::api::*;
use crate::errors::{Error, Result};
use crate::http::{Headers, HttpClient, Response};
use crate::routes::{self, paths};
use crate::session::TokenStore;
use crate::validation::normalize_coupon_code;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Filters for the product listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub category: Option<Category>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    fn to_path(&self) -> String {
        let mut query = Vec::new();
        if let Some(category) = self.category {
            query.push(format!("category={}", category.as_str()));
        }
        if let Some(page) = self.page {
            query.push(format!("page={}", page));
        }
        if let Some(limit) = self.limit {
            query.push(format!("limit={}", limit));
        }
        if query.is_empty() {
            paths::PRODUCTS.to_string()
        } else {
            format!("{}?{}", paths::PRODUCTS, query.join("&"))
        }
    }
}

pub struct ApiClient {
    /// Backend address, as <host>:<port>
    target: String,
    store: Box<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(target: &str, store: Box<dyn TokenStore>) -> Self {
        ApiClient {
            target: target.to_string(),
            store,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether a session token is currently stored
    pub fn has_session(&self) -> bool {
        matches!(self.store.load(), Ok(Some(_)))
    }

    /// Send a request and check its status. Non-2xx statuses become errors carrying the
    /// server's message.
    fn send(&mut self, method: &str, path: &str, body: Option<String>) -> Result<Response> {
        let mut headers: Headers = vec![("Accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = self.store.load()? {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let mut http = HttpClient::new(&self.target)?;
        let response = http.send(method, path, &headers, body.as_deref().unwrap_or(""))?;
        let status = response.status.ok_or(Error::NoResponse)?;
        debug!(method, path, status, "Received response");

        match status {
            200..=299 => Ok(response),
            401 => {
                warn!(path, "Session rejected, clearing stored token");
                self.store.clear()?;
                Err(Error::Unauthorized)
            }
            404 => Err(Error::NotFound(response.error_message().unwrap_or_default())),
            _ => Err(Error::Status {
                status,
                message: response.error_message().unwrap_or_default(),
            }),
        }
    }

    /// Send a request and decode the whole body as `T`
    fn call<B, T>(&mut self, method: &str, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body.map(serde_json::to_string).transpose()?;
        let response = self.send(method, path, body)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Send a request and return the `data` field of the envelope
    fn data<B, T>(&mut self, method: &str, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call::<B, ApiResponse<T>>(method, path, body)
            .map(|envelope| envelope.data)
    }

    fn get<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        self.data::<(), T>("GET", path, None)
    }

    // ------------------------------------------------------------------ auth

    /// Register and keep the returned session token
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub fn register(&mut self, credentials: &RegisterCredentials) -> Result<User> {
        let auth: AuthResponse = self.call("POST", paths::AUTH_REGISTER, Some(credentials))?;
        self.store.save(&auth.token)?;
        info!(user = %auth.user.id, "Registered");
        Ok(auth.user)
    }

    /// Log in and keep the returned session token
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub fn login(&mut self, credentials: &LoginCredentials) -> Result<User> {
        let auth: AuthResponse = self.call("POST", paths::AUTH_LOGIN, Some(credentials))?;
        self.store.save(&auth.token)?;
        info!(user = %auth.user.id, "Logged in");
        Ok(auth.user)
    }

    /// Log out. The local token is dropped even if the server call fails.
    #[instrument(skip(self))]
    pub fn logout(&mut self) -> Result<()> {
        let result = self.send("POST", paths::AUTH_LOGOUT, None).map(|_| ());
        self.store.clear()?;
        result
    }

    #[instrument(skip(self))]
    pub fn me(&mut self) -> Result<User> {
        self.get(paths::AUTH_ME)
    }

    // -------------------------------------------------------------- products

    #[instrument(skip(self))]
    pub fn products(&mut self, query: &ProductQuery) -> Result<PaginatedResponse<Product>> {
        self.call::<(), _>("GET", &query.to_path(), None)
    }

    #[instrument(skip(self))]
    pub fn product(&mut self, product_id: &str) -> Result<Product> {
        self.get(&routes::product_by_id(product_id))
    }

    #[instrument(skip(self))]
    pub fn products_by_category(&mut self, category: Category) -> Result<Vec<Product>> {
        self.get(&routes::products_by_category(category.as_str()))
    }

    // ------------------------------------------------------------------ cart

    #[instrument(skip(self))]
    pub fn cart(&mut self) -> Result<Cart> {
        self.get(paths::CART)
    }

    #[instrument(skip(self))]
    pub fn add_to_cart(&mut self, item: &NewCartItem) -> Result<Cart> {
        self.data("POST", paths::CART_ADD, Some(item))
    }

    #[instrument(skip(self))]
    pub fn update_cart_item(&mut self, item_id: &str, quantity: u32) -> Result<Cart> {
        self.data("PUT", &routes::cart_update(item_id), Some(&QuantityUpdate { quantity }))
    }

    #[instrument(skip(self))]
    pub fn remove_cart_item(&mut self, item_id: &str) -> Result<Cart> {
        self.data::<(), _>("DELETE", &routes::cart_remove(item_id), None)
    }

    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) -> Result<Cart> {
        self.data::<(), _>("DELETE", paths::CART_CLEAR, None)
    }

    // ---------------------------------------------------------------- orders

    #[instrument(skip(self))]
    pub fn create_order(&mut self, order: &NewOrder) -> Result<Order> {
        self.data("POST", paths::ORDERS, Some(order))
    }

    #[instrument(skip(self))]
    pub fn orders(&mut self) -> Result<Vec<Order>> {
        self.get(paths::ORDERS)
    }

    #[instrument(skip(self))]
    pub fn order(&mut self, order_id: &str) -> Result<Order> {
        self.get(&routes::order_by_id(order_id))
    }

    #[instrument(skip(self))]
    pub fn track_order(&mut self, order_number: &str) -> Result<Order> {
        self.get(&routes::order_track(order_number))
    }

    /// Admin-only on the real backend
    #[instrument(skip(self))]
    pub fn update_order_status(&mut self, order_id: &str, status: &str) -> Result<Order> {
        let body = StatusUpdate {
            status: status.to_string(),
        };
        self.data("PUT", &routes::order_status(order_id), Some(&body))
    }

    // --------------------------------------------------------------- coupons

    /// Look a coupon up by code. Eligibility for a given cart is checked client side.
    #[instrument(skip(self))]
    pub fn validate_coupon(&mut self, code: &str) -> Result<Coupon> {
        let body = CouponCode {
            code: normalize_coupon_code(code),
        };
        self.data("POST", paths::COUPON_VALIDATE, Some(&body))
    }

    // ----------------------------------------------------------------- users

    #[instrument(skip(self))]
    pub fn profile(&mut self) -> Result<User> {
        self.get(paths::USER_PROFILE)
    }

    #[instrument(skip(self))]
    pub fn update_profile(&mut self, update: &ProfileUpdate) -> Result<User> {
        self.data("PUT", paths::USER_PROFILE, Some(update))
    }

    #[instrument(skip(self))]
    pub fn add_address(&mut self, address: &AddressInput) -> Result<Address> {
        self.data("POST", paths::USER_ADDRESSES, Some(address))
    }

    #[instrument(skip(self))]
    pub fn update_address(&mut self, address_id: &str, address: &AddressInput) -> Result<Address> {
        self.data("PUT", &routes::address_by_id(address_id), Some(address))
    }

    /// Delete an address and return the ones left on the profile
    #[instrument(skip(self))]
    pub fn delete_address(&mut self, address_id: &str) -> Result<Vec<Address>> {
        self.data::<(), _>("DELETE", &routes::address_by_id(address_id), None)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_product_query_path() {
        assert_eq!(ProductQuery::default().to_path(), "/api/products");
        let query = ProductQuery {
            category: Some(Category::Desserts),
            page: Some(2),
            limit: Some(10),
        };
        assert_eq!(
            query.to_path(),
            "/api/products?category=desserts&page=2&limit=10"
        );
    }
}
