use std::net::SocketAddr;

use storefront::api::*;
use storefront::client::ApiClient;
use storefront::errors::Error;
use storefront::http::{HttpServer, Response};
use storefront::notify::Level;
use storefront::pricing::{DeliveryPolicy, Selection};
use storefront::session::mock::MemoryStore;
use storefront::storefront::Storefront;
use storefront::stub;
use storefront::tracker::Tracker;

fn start_backend() -> SocketAddr {
    stub::spawn("127.0.0.1:0", 2).expect("Failed to start stub backend")
}

fn client(addr: SocketAddr) -> ApiClient {
    ApiClient::new(&addr.to_string(), Box::new(MemoryStore::new()))
}

fn storefront(addr: SocketAddr) -> Storefront {
    Storefront::new(client(addr), DeliveryPolicy::default())
}

fn credentials(email: &str) -> RegisterCredentials {
    RegisterCredentials {
        name: "Meera Iyer".to_string(),
        email: email.to_string(),
        password: "paneer123".to_string(),
        phone: "9123456780".to_string(),
    }
}

fn login(email: &str) -> LoginCredentials {
    LoginCredentials {
        email: email.to_string(),
        password: "paneer123".to_string(),
    }
}

fn home() -> AddressInput {
    AddressInput {
        label: "Home".to_string(),
        kind: "Home".to_string(),
        street: "221 Residency Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pincode: "560025".to_string(),
        landmark: Some("Opposite the park".to_string()),
        is_default: true,
    }
}

/// A registered storefront with one saved address
fn signed_up(addr: SocketAddr, email: &str) -> (Storefront, Address) {
    let mut shop = storefront(addr);
    shop.register(&credentials(email), "paneer123").unwrap();
    let address = shop.add_address(&home()).unwrap();
    shop.notifier.drain();
    (shop, address)
}

#[test]
fn test_checkout_end_to_end() {
    let addr = start_backend();
    let (mut shop, address) = signed_up(addr, "meera@example.com");

    shop.add_to_cart("1", Selection::new(Some("medium"), None, &["Extra Cheese"]), 2)
        .unwrap();
    shop.add_to_cart("11", Selection::default(), 1).unwrap();
    assert_eq!(shop.state.cart.items_count(), 3);
    assert_eq!(shop.state.cart.total(), 816.0 + 57.0);

    let discount = shop.apply_coupon("pizza20").unwrap();
    assert_eq!(discount, 150.0);

    let summary = shop.summary();
    assert_eq!(summary.delivery_charge, 0.0);
    assert_eq!(summary.total, 873.0 - 150.0);

    let order = shop.checkout(Some(&address.id), PaymentMethod::Cod).unwrap();
    assert_eq!(order.subtotal, 873.0);
    assert_eq!(order.discount, 150.0);
    assert_eq!(
        order.total_amount,
        order.subtotal - order.discount + order.delivery_charge
    );
    assert_eq!(order.coupon_applied.as_deref(), Some("PIZZA20"));
    assert_eq!(order.delivery_address.pincode, "560025");

    assert!(shop.state.cart.is_empty());
    assert_eq!(shop.state.coupon.code(), None);
    let messages: Vec<String> = shop.notifier.drain().into_iter().map(|n| n.message).collect();
    assert!(messages.contains(&"Coupon applied! You save ₹150".to_string()));
    assert!(messages.contains(&"Order placed successfully!".to_string()));

    let (tracked, tracker) = shop.track(&order.order_number).unwrap();
    assert_eq!(tracked.id, order.id);
    assert_eq!(tracker.completed(), 1);

    let orders = shop.orders().unwrap();
    assert_eq!(orders.len(), 1);
}

#[test]
fn test_small_order_pays_delivery() {
    let addr = start_backend();
    let (mut shop, address) = signed_up(addr, "small@example.com");

    shop.add_to_cart("9", Selection::default(), 1).unwrap();
    let summary = shop.summary();
    assert_eq!(summary.subtotal, 129.0);
    assert_eq!(summary.delivery_charge, 49.0);
    assert_eq!(summary.remaining_for_free_delivery, Some(371.0));

    let order = shop.checkout(Some(&address.id), PaymentMethod::Online).unwrap();
    assert_eq!(order.total_amount, 178.0);
}

#[test]
fn test_rejected_coupons_leave_totals_alone() {
    let addr = start_backend();
    let (mut shop, _) = signed_up(addr, "coupons@example.com");
    shop.add_to_cart("9", Selection::default(), 1).unwrap();
    shop.notifier.drain();

    assert!(shop.apply_coupon("PIZZA20").is_err());
    assert_eq!(
        shop.notifier.last().unwrap().message,
        "Minimum order amount is ₹400"
    );

    assert!(shop.apply_coupon("summer10").is_err());
    assert_eq!(
        shop.notifier.last().unwrap().message,
        "Coupon SUMMER10 has expired"
    );

    assert!(matches!(shop.apply_coupon("FREEPIZZA"), Err(Error::NotFound(_))));
    assert_eq!(shop.notifier.last().unwrap().message, "Invalid coupon code");

    let summary = shop.summary();
    assert_eq!(summary.discount, 0.0);
    assert_eq!(summary.total, 178.0);
}

#[test]
fn test_coupon_dropped_when_cart_shrinks() {
    let addr = start_backend();
    let (mut shop, _) = signed_up(addr, "shrink@example.com");

    shop.add_to_cart("2", Selection::new(Some("small"), None, &[]), 2).unwrap();
    shop.apply_coupon("PIZZA20").unwrap();
    assert_eq!(shop.summary().discount, 119.6);

    let line = shop.state.cart.items[0].id.clone();
    shop.update_quantity(&line, 1).unwrap();
    assert_eq!(shop.state.coupon.code(), None);
    assert_eq!(shop.summary().discount, 0.0);
    assert_eq!(shop.notifier.last().unwrap().level, Level::Error);
}

#[test]
fn test_checkout_preconditions() {
    let addr = start_backend();
    let (mut shop, address) = signed_up(addr, "precheck@example.com");

    let err = shop.checkout(Some(&address.id), PaymentMethod::Cod).unwrap_err();
    assert_eq!(err.to_string(), "Your cart is empty");

    shop.add_to_cart("17", Selection::default(), 1).unwrap();
    let err = shop.checkout(None, PaymentMethod::Cod).unwrap_err();
    assert_eq!(err.to_string(), "Please select a delivery address");
    assert_eq!(shop.state.cart.items.len(), 1);
}

#[test]
fn test_quantity_below_one_removes_line() {
    let addr = start_backend();
    let (mut shop, _) = signed_up(addr, "qty@example.com");

    shop.add_to_cart("17", Selection::default(), 1).unwrap();
    shop.add_to_cart("18", Selection::default(), 1).unwrap();
    let line = shop.state.cart.items[0].id.clone();

    shop.update_quantity(&line, 3).unwrap();
    assert_eq!(shop.state.cart.items[0].quantity, 3);

    shop.update_quantity(&line, 0).unwrap();
    assert_eq!(shop.state.cart.items.len(), 1);
    assert_eq!(shop.state.cart.items[0].product.id, "18");
}

#[test]
fn test_guest_cart_merges_on_login() {
    let addr = start_backend();
    let (mut account, _) = signed_up(addr, "guest@example.com");
    account.add_to_cart("9", Selection::default(), 1).unwrap();
    account.logout().unwrap();

    let mut shop = storefront(addr);
    shop.load_menu(None).unwrap();
    shop.add_to_cart("1", Selection::new(Some("large"), Some("Cheese Burst"), &[]), 1)
        .unwrap();
    shop.add_to_cart("17", Selection::default(), 2).unwrap();
    assert_eq!(shop.state.cart.total(), 648.0 + 198.0);
    assert!(shop.add_to_cart("24", Selection::default(), 1).is_err());

    shop.login(&login("guest@example.com")).unwrap();
    assert!(shop.state.auth.is_authenticated);
    assert_eq!(shop.state.cart.items.len(), 3);
    assert_eq!(shop.state.cart.total(), 129.0 + 648.0 + 198.0);
    assert!(shop
        .state
        .cart
        .items
        .iter()
        .all(|item| !item.id.starts_with("1-") && !item.id.starts_with("17-")));
}

#[test]
fn test_stale_session_is_cleared() {
    let addr = start_backend();
    let mut client = ApiClient::new(&addr.to_string(), Box::new(MemoryStore::with_token("stale")));
    assert!(client.has_session());

    assert!(matches!(client.cart(), Err(Error::Unauthorized)));
    assert!(!client.has_session());

    let mut shop = Storefront::new(
        ApiClient::new(&addr.to_string(), Box::new(MemoryStore::with_token("stale"))),
        DeliveryPolicy::default(),
    );
    assert!(!shop.restore_session());
    assert!(shop.orders().is_err());
    assert_eq!(shop.notifier.last().unwrap().message, "Please login to continue");
}

#[test]
fn test_bearer_token_is_sent() {
    let server = HttpServer::new("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        server.serve_once(|request| {
            let now = chrono::Utc::now();
            let user = User {
                id: "u1".to_string(),
                name: request.bearer_token().unwrap_or("none").to_string(),
                email: "echo@example.com".to_string(),
                phone: "9000000000".to_string(),
                addresses: vec![],
                created_at: now,
                updated_at: now,
            };
            Response::json(200, user).unwrap()
        })
    });

    let mut client = ApiClient::new(&addr.to_string(), Box::new(MemoryStore::with_token("t0k3n")));
    let user = client.me().unwrap();
    assert_eq!(user.name, "t0k3n");
    handle.join().unwrap();
}

#[test]
fn test_tracking_follows_status_updates() {
    let addr = start_backend();
    let (mut shop, address) = signed_up(addr, "track@example.com");
    shop.add_to_cart("3", Selection::new(Some("medium"), None, &[]), 1).unwrap();
    let order = shop.checkout(Some(&address.id), PaymentMethod::Cod).unwrap();

    let mut admin = client(addr);
    admin.login(&login("track@example.com")).unwrap();
    admin.update_order_status(&order.id, "preparing").unwrap();

    let (_, tracker) = shop.order(&order.id).unwrap();
    assert_eq!(tracker.completed(), 3);

    admin.update_order_status(&order.id, "cancelled").unwrap();
    let (tracked, tracker) = shop.track(&order.order_number).unwrap();
    assert_eq!(tracked.order_status, "cancelled");
    assert_eq!(tracker, Tracker::Cancelled);

    assert!(matches!(
        admin.update_order_status(&order.id, "teleported"),
        Err(Error::Status { status: 400, .. })
    ));
}

#[test]
fn test_profile_and_addresses() {
    let addr = start_backend();
    let (mut shop, first) = signed_up(addr, "profile@example.com");

    let invalid = AddressInput {
        pincode: "5600".to_string(),
        ..home()
    };
    assert!(matches!(shop.add_address(&invalid), Err(Error::Validation(_))));

    let second = shop
        .add_address(&AddressInput {
            label: "Work".to_string(),
            kind: "Work".to_string(),
            is_default: false,
            ..home()
        })
        .unwrap();
    assert_eq!(shop.addresses().unwrap().len(), 2);

    shop.delete_address(&first.id).unwrap();
    let remaining = shop.addresses().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
    assert!(remaining[0].is_default);

    let user = shop
        .update_profile(&ProfileUpdate {
            name: Some("Meera I".to_string()),
            phone: None,
        })
        .unwrap();
    assert_eq!(user.name, "Meera I");
    assert_eq!(
        shop.notifier.last().unwrap().message,
        "Profile updated successfully"
    );
}
