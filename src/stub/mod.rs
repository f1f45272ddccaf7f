//! In-memory backend implementing the storefront REST contract, for local runs and tests.
//!
//! Only what the client needs is implemented. Passwords are kept in clear and every
//! authenticated user may change order statuses.

use crate::api::*;
use crate::errors::{Error, Result};
use crate::http::HttpServer;
use crate::pricing::{self, DeliveryPolicy, Selection};
use crate::tracker::OrderStatus;
use crate::validation;
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

pub mod catalog;
pub mod handlers;

/// Minutes between placing an order and its estimated delivery
const DELIVERY_ESTIMATE_MINUTES: i64 = 45;

struct Account {
    user: User,
    password: String,
}

/// Everything the stub backend knows
pub struct StubState {
    products: Vec<Product>,
    coupons: Vec<Coupon>,
    accounts: Vec<Account>,
    /// Session token to user id
    sessions: HashMap<String, String>,
    /// User id to cart lines
    carts: HashMap<String, Vec<CartItem>>,
    orders: Vec<Order>,
    next_id: u64,
    policy: DeliveryPolicy,
}

impl Default for StubState {
    fn default() -> Self {
        Self::new()
    }
}

impl StubState {
    /// A backend seeded with the demo menu and coupons, and no users
    pub fn new() -> Self {
        StubState {
            products: catalog::products(),
            coupons: catalog::coupons(Utc::now()),
            accounts: Vec::new(),
            sessions: HashMap::new(),
            carts: HashMap::new(),
            orders: Vec::new(),
            next_id: 1,
            policy: DeliveryPolicy::default(),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("{}-{}", prefix, id)
    }

    fn new_session(&mut self, user_id: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        self.sessions.insert(token.clone(), user_id.to_string());
        token
    }

    fn account_mut(&mut self, user_id: &str) -> Result<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|a| a.user.id == user_id)
            .ok_or(Error::Unauthorized)
    }

    // ---------------------------------------------------------------- auth

    pub fn register(&mut self, credentials: &RegisterCredentials) -> Result<AuthResponse> {
        validation::validate_register(credentials, &credentials.password)?;
        let email = credentials.email.trim().to_ascii_lowercase();
        if self.accounts.iter().any(|a| a.user.email == email) {
            return Err(Error::BadRequest("User already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: self.next_id("user"),
            name: credentials.name.trim().to_string(),
            email,
            phone: credentials.phone.trim().to_string(),
            addresses: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        info!(user = %user.id, "Registered user");
        let token = self.new_session(&user.id);
        self.accounts.push(Account {
            user: user.clone(),
            password: credentials.password.clone(),
        });
        Ok(AuthResponse {
            success: true,
            token,
            user,
        })
    }

    pub fn login(&mut self, credentials: &LoginCredentials) -> Result<AuthResponse> {
        let email = credentials.email.trim().to_ascii_lowercase();
        let user = self
            .accounts
            .iter()
            .find(|a| a.user.email == email && a.password == credentials.password)
            .map(|a| a.user.clone())
            .ok_or_else(|| Error::BadRequest("Invalid email or password".to_string()))?;
        let token = self.new_session(&user.id);
        Ok(AuthResponse {
            success: true,
            token,
            user,
        })
    }

    pub fn logout(&mut self, token: &str) {
        self.sessions.remove(token);
    }

    /// Id of the user owning `token`
    pub fn authenticate(&self, token: Option<&str>) -> Result<String> {
        token
            .and_then(|t| self.sessions.get(t))
            .cloned()
            .ok_or(Error::Unauthorized)
    }

    pub fn user(&self, user_id: &str) -> Result<User> {
        self.accounts
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(Error::Unauthorized)
    }

    // ------------------------------------------------------------ products

    pub fn products(&self, category: Option<Category>) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .cloned()
            .collect()
    }

    pub fn product(&self, product_id: &str) -> Result<Product> {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Product not found".to_string()))
    }

    // ---------------------------------------------------------------- cart

    pub fn cart(&self, user_id: &str) -> Cart {
        let items = self.carts.get(user_id).cloned().unwrap_or_default();
        Cart {
            id: format!("cart-{}", user_id),
            user: user_id.to_string(),
            total_amount: pricing::subtotal(&items),
            items,
            updated_at: Utc::now(),
        }
    }

    /// Add a line, or bump the quantity of an identical one
    pub fn add_to_cart(&mut self, user_id: &str, new_item: &NewCartItem) -> Result<Cart> {
        let product = self.product(&new_item.product_id)?;
        if !product.is_available {
            return Err(Error::BadRequest(format!("{} is not available", product.name)));
        }
        let quantity = new_item.quantity.max(1);
        let selection = Selection {
            size: new_item.size.clone(),
            crust: new_item.crust.clone(),
            toppings: new_item.toppings.clone(),
        };

        let line_id = self.next_id("line");
        let lines = self.carts.entry(user_id.to_string()).or_default();
        let same_line = lines.iter_mut().find(|line| {
            line.product.id == product.id
                && line.size == selection.size
                && line.crust == selection.crust
                && line.toppings == selection.toppings
        });
        match same_line {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity);
                line.item_total = pricing::line_total(&product, &selection, line.quantity);
            }
            None => lines.push(CartItem {
                id: line_id,
                item_total: pricing::line_total(&product, &selection, quantity),
                product,
                quantity,
                size: selection.size,
                crust: selection.crust,
                toppings: selection.toppings,
            }),
        }
        Ok(self.cart(user_id))
    }

    pub fn update_cart_item(&mut self, user_id: &str, item_id: &str, quantity: u32) -> Result<Cart> {
        if quantity < 1 {
            return Err(Error::BadRequest("Quantity must be at least 1".to_string()));
        }
        let line = self
            .carts
            .get_mut(user_id)
            .and_then(|lines| lines.iter_mut().find(|line| line.id == item_id))
            .ok_or_else(|| Error::NotFound("Cart item not found".to_string()))?;
        line.quantity = quantity;
        line.item_total = pricing::line_total(&line.product, &Selection::of_item(line), quantity);
        Ok(self.cart(user_id))
    }

    pub fn remove_cart_item(&mut self, user_id: &str, item_id: &str) -> Result<Cart> {
        let lines = self.carts.entry(user_id.to_string()).or_default();
        let old_len = lines.len();
        lines.retain(|line| line.id != item_id);
        if old_len == lines.len() {
            return Err(Error::NotFound("Cart item not found".to_string()));
        }
        Ok(self.cart(user_id))
    }

    pub fn clear_cart(&mut self, user_id: &str) -> Cart {
        self.carts.remove(user_id);
        self.cart(user_id)
    }

    // -------------------------------------------------------------- coupon

    /// Look an active coupon up. Whether the cart qualifies is left to the caller.
    pub fn coupon(&self, code: &str) -> Result<Coupon> {
        let code = validation::normalize_coupon_code(code);
        self.coupons
            .iter()
            .find(|c| c.code == code && c.is_active)
            .cloned()
            .ok_or_else(|| Error::NotFound("Invalid coupon code".to_string()))
    }

    // -------------------------------------------------------------- orders

    /// Turn the user's cart into an order, pricing it the same way the client does
    pub fn place_order(&mut self, user_id: &str, new_order: &NewOrder) -> Result<Order> {
        let user = self.user(user_id)?;
        let items = self.carts.get(user_id).cloned().unwrap_or_default();
        if items.is_empty() {
            return Err(Error::BadRequest("Your cart is empty".to_string()));
        }
        let address = user
            .addresses
            .iter()
            .find(|a| a.id == new_order.address_id)
            .ok_or_else(|| Error::NotFound("Address not found".to_string()))?;

        let now = Utc::now();
        let subtotal = pricing::subtotal(&items);
        let coupon = new_order
            .coupon_code
            .as_deref()
            .map(|code| self.coupon(code))
            .transpose()?;
        if let Some(coupon) = &coupon {
            pricing::validate_coupon(coupon, subtotal, now)?;
        }
        let summary = pricing::summarize(subtotal, coupon.as_ref(), &self.policy, now);

        let order = Order {
            id: self.next_id("order"),
            order_number: format!(
                "ORD{}{:04}",
                now.format("%y%m%d"),
                rand::thread_rng().gen_range(0..10_000)
            ),
            user: user_id.to_string(),
            items: items
                .iter()
                .map(|line| OrderItem {
                    product: line.product.id.clone(),
                    name: line.product.name.clone(),
                    quantity: line.quantity,
                    price: line.item_total,
                })
                .collect(),
            delivery_address: DeliveryAddress::from(address),
            payment_method: new_order.payment_method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Placed.tag().to_string(),
            subtotal: summary.subtotal,
            delivery_charge: summary.delivery_charge,
            discount: summary.discount,
            total_amount: summary.total,
            coupon_applied: summary.coupon_code,
            estimated_delivery: now + Duration::minutes(DELIVERY_ESTIMATE_MINUTES),
            created_at: now,
            updated_at: now,
        };
        info!(order = %order.order_number, total = order.total_amount, "Order placed");
        self.carts.remove(user_id);
        self.orders.push(order.clone());
        Ok(order)
    }

    /// Orders of a user, newest first
    pub fn orders(&self, user_id: &str) -> Vec<Order> {
        self.orders
            .iter()
            .rev()
            .filter(|o| o.user == user_id)
            .cloned()
            .collect()
    }

    pub fn order(&self, user_id: &str, order_id: &str) -> Result<Order> {
        self.orders
            .iter()
            .find(|o| o.id == order_id && o.user == user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Order not found".to_string()))
    }

    pub fn track_order(&self, order_number: &str) -> Result<Order> {
        self.orders
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned()
            .ok_or_else(|| Error::NotFound("Order not found".to_string()))
    }

    pub fn set_order_status(&mut self, order_id: &str, status: &str) -> Result<Order> {
        let status = OrderStatus::from_tag(status)
            .ok_or_else(|| Error::BadRequest(format!("Invalid status '{}'", status)))?;
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| Error::NotFound("Order not found".to_string()))?;
        order.order_status = status.tag().to_string();
        order.updated_at = Utc::now();
        if status == OrderStatus::Delivered && order.payment_method == PaymentMethod::Cod {
            order.payment_status = PaymentStatus::Paid;
        }
        Ok(order.clone())
    }

    // ------------------------------------------------------------- profile

    pub fn update_profile(&mut self, user_id: &str, update: &ProfileUpdate) -> Result<User> {
        validation::validate_profile(update)?;
        let account = self.account_mut(user_id)?;
        if let Some(name) = &update.name {
            account.user.name = name.trim().to_string();
        }
        if let Some(phone) = &update.phone {
            account.user.phone = phone.trim().to_string();
        }
        account.user.updated_at = Utc::now();
        Ok(account.user.clone())
    }

    /// Add an address. The first address, or one flagged as default, becomes the default.
    pub fn add_address(&mut self, user_id: &str, input: &AddressInput) -> Result<Address> {
        validation::validate_address(input)?;
        let id = self.next_id("address");
        let account = self.account_mut(user_id)?;
        let is_default = input.is_default || account.user.addresses.is_empty();
        if is_default {
            account.user.addresses.iter_mut().for_each(|a| a.is_default = false);
        }
        let address = Address {
            id,
            label: Some(input.label.clone()),
            kind: input.kind.clone(),
            street: input.street.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            pincode: input.pincode.clone(),
            landmark: input.landmark.clone(),
            is_default,
        };
        account.user.addresses.push(address.clone());
        Ok(address)
    }

    pub fn update_address(&mut self, user_id: &str, address_id: &str, input: &AddressInput) -> Result<Address> {
        validation::validate_address(input)?;
        let addresses = &mut self.account_mut(user_id)?.user.addresses;
        let index = addresses
            .iter()
            .position(|a| a.id == address_id)
            .ok_or_else(|| Error::NotFound("Address not found".to_string()))?;
        if input.is_default {
            addresses.iter_mut().for_each(|a| a.is_default = false);
        }
        let address = &mut addresses[index];
        address.label = Some(input.label.clone());
        address.kind = input.kind.clone();
        address.street = input.street.clone();
        address.city = input.city.clone();
        address.state = input.state.clone();
        address.pincode = input.pincode.clone();
        address.landmark = input.landmark.clone();
        address.is_default = input.is_default || address.is_default;
        Ok(address.clone())
    }

    /// Delete an address and return the remaining ones
    pub fn delete_address(&mut self, user_id: &str, address_id: &str) -> Result<Vec<Address>> {
        let account = self.account_mut(user_id)?;
        let addresses = &mut account.user.addresses;
        let old_len = addresses.len();
        addresses.retain(|a| a.id != address_id);
        if old_len == addresses.len() {
            return Err(Error::NotFound("Address not found".to_string()));
        }
        if !addresses.iter().any(|a| a.is_default) {
            if let Some(first) = addresses.first_mut() {
                first.is_default = true;
            }
        }
        Ok(addresses.clone())
    }
}

/// Serve the stub backend on `addr` until the process ends
pub fn run(addr: &str, workers: usize) -> Result<()> {
    let server = HttpServer::new(addr)?;
    info!(addr = %server.local_addr()?, workers, "Stub backend listening");
    serve(server, workers)
}

/// Start the stub backend on a background thread and return the address it listens on.
///
/// Binding port 0 picks a free port.
pub fn spawn(addr: &str, workers: usize) -> Result<SocketAddr> {
    let server = HttpServer::new(addr)?;
    let local_addr = server.local_addr()?;
    std::thread::Builder::new()
        .name("storefront-stub".to_string())
        .spawn(move || {
            if let Err(err) = serve(server, workers) {
                error!(error = %err, "Stub backend stopped");
            }
        })?;
    Ok(local_addr)
}

fn serve(server: HttpServer, workers: usize) -> Result<()> {
    let router = Arc::new(handlers::create_http_router()?);
    let state = Arc::new(Mutex::new(StubState::new()));

    server.serve(workers, move |request| {
        let mut state = match state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        match router.route(request, &mut state) {
            Ok(response) => response,
            Err(err) => handlers::error_response(&err),
        }
    });
    Ok(())
}
