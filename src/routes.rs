use std::collections::HashMap;

use crate::errors::{Error, Result};
use crate::http::{Request, Response};
use matchit::Router;

/// Utility macro generating a constant for the HTTP endpoint, and associate it with
/// an identifier. Matchit requires both
macro_rules! make_paths {
        ($($name:ident: $path:expr,)*) => {

        pub mod paths {
                    $(
                        pub const $name: &str = concat!("/api", $path);
                    )*
        }
        pub mod endpoints {
            $(
                pub const $name: &str = stringify!($name);
            )*
        }

        /// Every (path, endpoint) pair, in declaration order
        const ALL_PATHS: &[(&str, &str)] = &[$((paths::$name, endpoints::$name),)*];
        }
    }

make_paths! {
    AUTH_REGISTER: "/auth/register",
    AUTH_LOGIN: "/auth/login",
    AUTH_LOGOUT: "/auth/logout",
    AUTH_ME: "/auth/me",
    PRODUCTS: "/products",
    PRODUCT_BY_ID: "/products/{product_id}",
    PRODUCTS_BY_CATEGORY: "/products/category/{category}",
    CART: "/cart",
    CART_ADD: "/cart/add",
    CART_UPDATE: "/cart/update/{item_id}",
    CART_REMOVE: "/cart/remove/{item_id}",
    CART_CLEAR: "/cart/clear",
    ORDERS: "/orders",
    ORDER_BY_ID: "/orders/{order_id}",
    ORDER_TRACK: "/orders/track/{order_number}",
    ORDER_STATUS: "/orders/{order_id}/status",
    COUPON_VALIDATE: "/coupons/validate",
    USER_PROFILE: "/users/profile",
    USER_ADDRESSES: "/users/address",
    USER_ADDRESS_BY_ID: "/users/address/{address_id}",
}

/// Names of the parameters in the HTTP paths, used to extract them
/// from the parameters inside of request handling
pub mod params {
    pub const PRODUCT_ID: &str = "product_id";
    pub const CATEGORY: &str = "category";
    pub const ITEM_ID: &str = "item_id";
    pub const ORDER_ID: &str = "order_id";
    pub const ORDER_NUMBER: &str = "order_number";
    pub const ADDRESS_ID: &str = "address_id";
}

/// Substitute `{name}` in a path template. The value is percent-encoded, so an id can never
/// address a different route or break the request line.
fn fill(template: &str, name: &str, value: &str) -> String {
    template.replace(&format!("{{{}}}", name), &encode_segment(value))
}

/// Percent-encode everything outside the unreserved set of RFC 3986
fn encode_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

pub fn product_by_id(product_id: &str) -> String {
    fill(paths::PRODUCT_BY_ID, params::PRODUCT_ID, product_id)
}

pub fn products_by_category(category: &str) -> String {
    fill(paths::PRODUCTS_BY_CATEGORY, params::CATEGORY, category)
}

pub fn cart_update(item_id: &str) -> String {
    fill(paths::CART_UPDATE, params::ITEM_ID, item_id)
}

pub fn cart_remove(item_id: &str) -> String {
    fill(paths::CART_REMOVE, params::ITEM_ID, item_id)
}

pub fn order_by_id(order_id: &str) -> String {
    fill(paths::ORDER_BY_ID, params::ORDER_ID, order_id)
}

pub fn order_track(order_number: &str) -> String {
    fill(paths::ORDER_TRACK, params::ORDER_NUMBER, order_number)
}

pub fn order_status(order_id: &str) -> String {
    fill(paths::ORDER_STATUS, params::ORDER_ID, order_id)
}

pub fn address_by_id(address_id: &str) -> String {
    fill(paths::USER_ADDRESS_BY_ID, params::ADDRESS_ID, address_id)
}

// spurious warning, I am using this in tests
#[allow(unused_macros)]
/// Utility to create easily hashmaps of parameters for testing
macro_rules! make_params {
    () => {
        std::collections::HashMap::new()
    };
    ($name:ident: $value:expr $(, $name2:ident: $value2:expr)* ) => {
        {
            let mut map = std::collections::HashMap::new();
            map.insert(params::$name.to_string(), $value.to_string());
            $(
                map.insert(params::$name2.to_string(), $value2.to_string());
            )*
            map
        }
        }
    }

#[allow(unused_imports)]
pub(crate) use make_params;

/// Create a new router with the paths defined in this module
///
/// Errors from this functions are programming errors, most likely steming from a
/// misuse of matchit
fn new_router() -> Result<Router<&'static str>> {
    let mut router = Router::new();
    for (path, endpoint) in ALL_PATHS {
        router.insert(*path, *endpoint)?;
    }
    Ok(router)
}

/// Type of the object containing the HTTP path parameters passed to handlers
pub type HttpParams = HashMap<String, String>;
/// Type of the function that handles HTTP requests against some state `S`
pub type HttpHandler<S> = fn(Request, HttpParams, &mut S) -> Result<Response>;

/// The router is in charge of taking in raw HTTP requests and to dispatch them to
/// the appropriate handler function.
pub struct HttpRouter<S> {
    routes: Router<&'static str>,
    handlers: HashMap<&'static str, HashMap<&'static str, HttpHandler<S>>>,
}

impl<S> HttpRouter<S> {
    /// Creates a new empty router
    ///
    /// Although the matchit router is not empty, there are no methods associated
    /// to the routes yet, so no request can be processed
    /// Errors in this function are programming errors.
    pub fn new() -> Result<Self> {
        let routes = new_router()?;
        Ok(HttpRouter {
            routes,
            handlers: HashMap::new(),
        })
    }

    /// Add a new route to the router
    pub fn add_route(&mut self, method: &'static str, endpoint: &'static str, handler: HttpHandler<S>) {
        let method_to_handler = self.handlers.entry(endpoint).or_default();
        method_to_handler.insert(method, handler);
    }

    /// Sends a request to the appropriate handler if it exists
    ///
    /// If there is a route matching the request, its handler will be called and the result of the
    /// function will be the result of the handler. If no route is defined for this request,
    /// return Error::NotFound
    ///
    /// Checking that all parameters are presents and that the body is correct is the
    /// responsibility of the handler
    pub fn route(&self, request: Request, state: &mut S) -> Result<Response> {
        let route = self
            .routes
            .at(request.route_path())
            .map_err(|err| Error::NotFound(err.to_string()))?;
        let method_to_handler = self.handlers.get(route.value).ok_or_else(|| {
            Error::NotFound(format!(
                "No method associated to this route: {}",
                route.value
            ))
        })?;
        let handler = method_to_handler
            .get(request.method.as_str())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No handler for {} {}",
                    request.method.as_str(),
                    route.value
                ))
            })?;

        let params: HttpParams = route
            .params
            .iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        handler(request, params, state)
    }
}
