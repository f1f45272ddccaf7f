use super::StubState;
use crate::api::*;
use crate::errors::{Error, Result};
use crate::http::{Request, Response};
use crate::routes::*;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

const DEFAULT_PAGE_SIZE: u32 = 20;

pub fn create_http_router() -> Result<HttpRouter<StubState>> {
    let mut router = HttpRouter::new()?;

    router.add_route("POST", endpoints::AUTH_REGISTER, register);
    router.add_route("POST", endpoints::AUTH_LOGIN, login);
    router.add_route("POST", endpoints::AUTH_LOGOUT, logout);
    router.add_route("GET", endpoints::AUTH_ME, me);

    router.add_route("GET", endpoints::PRODUCTS, get_products);
    router.add_route("GET", endpoints::PRODUCT_BY_ID, get_product);
    router.add_route("GET", endpoints::PRODUCTS_BY_CATEGORY, get_products_by_category);

    router.add_route("GET", endpoints::CART, get_cart);
    router.add_route("POST", endpoints::CART_ADD, add_to_cart);
    router.add_route("PUT", endpoints::CART_UPDATE, update_cart_item);
    router.add_route("DELETE", endpoints::CART_REMOVE, remove_cart_item);
    router.add_route("DELETE", endpoints::CART_CLEAR, clear_cart);

    router.add_route("POST", endpoints::ORDERS, create_order);
    router.add_route("GET", endpoints::ORDERS, get_orders);
    router.add_route("GET", endpoints::ORDER_BY_ID, get_order);
    router.add_route("GET", endpoints::ORDER_TRACK, track_order);
    router.add_route("PUT", endpoints::ORDER_STATUS, update_order_status);

    router.add_route("POST", endpoints::COUPON_VALIDATE, validate_coupon);

    router.add_route("GET", endpoints::USER_PROFILE, get_profile);
    router.add_route("PUT", endpoints::USER_PROFILE, update_profile);
    router.add_route("POST", endpoints::USER_ADDRESSES, add_address);
    router.add_route("PUT", endpoints::USER_ADDRESS_BY_ID, update_address);
    router.add_route("DELETE", endpoints::USER_ADDRESS_BY_ID, delete_address);

    Ok(router)
}

/// Map a failed handler to the response the client sees
pub fn error_response(err: &Error) -> Response {
    match err {
        Error::Unauthorized => Response::error(401, "Not authorized, please login"),
        Error::NotFound(message) => Response::error(404, message),
        Error::BadRequest(message)
        | Error::CouponRejected(message)
        | Error::Checkout(message) => Response::error(400, message),
        Error::Validation(errors) => Response::error(400, &errors.to_string()),
        Error::Json(err) => {
            warn!(error = %err, "Rejecting invalid body");
            Response::error(400, "Invalid request body")
        }
        err => {
            error!(error = %err, "Handler failed");
            Response::internal_server_error()
        }
    }
}

fn body<T: DeserializeOwned>(request: &Request) -> Result<T> {
    Ok(serde_json::from_str(&request.body)?)
}

fn param<'a>(route_params: &'a HttpParams, name: &'static str) -> Result<&'a str> {
    route_params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::BadRequest(format!("Missing {}", name)))
}

fn user_id(request: &Request, state: &StubState) -> Result<String> {
    state.authenticate(request.bearer_token())
}

// ------------------------------------------------------------------- auth

fn register(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let credentials: RegisterCredentials = body(&request)?;
    Response::raw_json(201, &state.register(&credentials)?)
}

fn login(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let credentials: LoginCredentials = body(&request)?;
    Response::raw_json(200, &state.login(&credentials)?)
}

fn logout(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    if let Some(token) = request.bearer_token() {
        state.logout(token);
    }
    Ok(Response::ok())
}

fn me(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = state.user(&user_id(&request, state)?)?;
    Response::json(200, user)
}

// --------------------------------------------------------------- products

fn get_products(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let category = match request.query_param("category") {
        Some(value) => Some(
            Category::parse(value)
                .ok_or_else(|| Error::BadRequest(format!("Unknown category '{}'", value)))?,
        ),
        None => None,
    };
    let page = request
        .query_param("page")
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = request
        .query_param("limit")
        .and_then(|l| l.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .max(1);

    let products = state.products(category);
    let total = products.len() as u32;
    let offset = (page as usize - 1).saturating_mul(limit as usize);
    let data = products
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .collect();

    Response::raw_json(
        200,
        &PaginatedResponse {
            success: true,
            data,
            pagination: Pagination {
                page,
                limit,
                total,
                pages: total.div_ceil(limit),
            },
        },
    )
}

fn get_product(_: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let product_id = param(&route_params, params::PRODUCT_ID)?;
    Response::json(200, state.product(product_id)?)
}

fn get_products_by_category(_: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let value = param(&route_params, params::CATEGORY)?;
    let category = Category::parse(value)
        .ok_or_else(|| Error::BadRequest(format!("Unknown category '{}'", value)))?;
    Response::json(200, state.products(Some(category)))
}

// ------------------------------------------------------------------- cart

fn get_cart(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    Response::json(200, state.cart(&user))
}

fn add_to_cart(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let item: NewCartItem = body(&request)?;
    Response::json(200, state.add_to_cart(&user, &item)?)
}

fn update_cart_item(request: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let update: QuantityUpdate = body(&request)?;
    let item_id = param(&route_params, params::ITEM_ID)?;
    Response::json(200, state.update_cart_item(&user, item_id, update.quantity)?)
}

fn remove_cart_item(request: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let item_id = param(&route_params, params::ITEM_ID)?;
    Response::json(200, state.remove_cart_item(&user, item_id)?)
}

fn clear_cart(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    Response::json(200, state.clear_cart(&user))
}

// ----------------------------------------------------------------- orders

fn create_order(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let new_order: NewOrder = body(&request)?;
    Response::json(201, state.place_order(&user, &new_order)?)
}

fn get_orders(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    Response::json(200, state.orders(&user))
}

fn get_order(request: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let order_id = param(&route_params, params::ORDER_ID)?;
    Response::json(200, state.order(&user, order_id)?)
}

fn track_order(_: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let order_number = param(&route_params, params::ORDER_NUMBER)?;
    Response::json(200, state.track_order(order_number)?)
}

fn update_order_status(request: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    user_id(&request, state)?;
    let update: StatusUpdate = body(&request)?;
    let order_id = param(&route_params, params::ORDER_ID)?;
    Response::json(200, state.set_order_status(order_id, &update.status)?)
}

// ----------------------------------------------------------------- coupon

fn validate_coupon(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let code: CouponCode = body(&request)?;
    Response::json(200, state.coupon(&code.code)?)
}

// ------------------------------------------------------------------ users

fn get_profile(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    Response::json(200, state.user(&user)?)
}

fn update_profile(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let update: ProfileUpdate = body(&request)?;
    Response::json(200, state.update_profile(&user, &update)?)
}

fn add_address(request: Request, _: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let input: AddressInput = body(&request)?;
    Response::json(201, state.add_address(&user, &input)?)
}

fn update_address(request: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let input: AddressInput = body(&request)?;
    let address_id = param(&route_params, params::ADDRESS_ID)?;
    Response::json(200, state.update_address(&user, address_id, &input)?)
}

fn delete_address(request: Request, route_params: HttpParams, state: &mut StubState) -> Result<Response> {
    let user = user_id(&request, state)?;
    let address_id = param(&route_params, params::ADDRESS_ID)?;
    Response::json(200, state.delete_address(&user, address_id)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::routes::make_params;

    fn authed(request: Request, token: &str) -> Request {
        request.with_header("Authorization", &format!("Bearer {}", token))
    }

    fn session(state: &mut StubState) -> String {
        state
            .register(&RegisterCredentials {
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                password: "hunter22".to_string(),
                phone: "8123456789".to_string(),
            })
            .unwrap()
            .token
    }

    #[test]
    fn test_cart_requires_session() {
        let router = create_http_router().unwrap();
        let mut state = StubState::new();

        let err = router.route(Request::get(paths::CART), &mut state).unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
        assert_eq!(error_response(&err).status, Some(401));

        let token = session(&mut state);
        let response = router
            .route(authed(Request::get(paths::CART), &token), &mut state)
            .unwrap();
        let cart: ApiResponse<Cart> = serde_json::from_str(&response.body).unwrap();
        assert!(cart.data.items.is_empty());
    }

    #[test]
    fn test_products_pagination() {
        let mut state = StubState::new();
        let response = get_products(
            Request::get("/api/products?category=pizza&page=2&limit=3"),
            make_params!(),
            &mut state,
        )
        .unwrap();
        let page: PaginatedResponse<Product> = serde_json::from_str(&response.body).unwrap();
        assert_eq!(page.pagination.total, 4);
        assert_eq!(page.pagination.pages, 2);
        assert_eq!(page.data.len(), 1);
        assert!(page.data.iter().all(|p| p.category == Category::Pizza));
    }

    #[test]
    fn test_page_past_the_end() {
        let router = create_http_router().unwrap();
        let mut state = StubState::new();
        let response = router
            .route(Request::get("/api/products?page=5000000&limit=5000"), &mut state)
            .unwrap();
        assert_eq!(response.status, Some(200));
        let page: PaginatedResponse<Product> = serde_json::from_str(&response.body).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.page, 5000000);
        assert_eq!(page.pagination.total, 11);
        assert_eq!(page.pagination.pages, 1);

        let page = format!("/api/products?page={}&limit={}", u32::MAX, u32::MAX);
        let response = router.route(Request::get(&page), &mut state).unwrap();
        let page: PaginatedResponse<Product> = serde_json::from_str(&response.body).unwrap();
        assert!(page.data.is_empty());
    }

    #[test]
    fn test_unknown_category() {
        let mut state = StubState::new();
        let err = get_products_by_category(
            Request::get("/api/products/category/salads"),
            make_params!(CATEGORY: "salads"),
            &mut state,
        )
        .unwrap_err();
        assert_eq!(error_response(&err).status, Some(400));
    }

    #[test]
    fn test_update_cart_item() {
        let router = create_http_router().unwrap();
        let mut state = StubState::new();
        let token = session(&mut state);

        let add = Request::post(
            paths::CART_ADD,
            r#"{"productId":"1","quantity":1,"size":"large","toppings":["Jalapeno"]}"#.to_string(),
        );
        let response = router.route(authed(add, &token), &mut state).unwrap();
        let cart: ApiResponse<Cart> = serde_json::from_str(&response.body).unwrap();
        assert_eq!(cart.data.total_amount, 588.0);

        let line_id = &cart.data.items[0].id;
        let update = Request::put(&cart_update(line_id), r#"{"quantity":2}"#.to_string());
        let response = router.route(authed(update, &token), &mut state).unwrap();
        let cart: ApiResponse<Cart> = serde_json::from_str(&response.body).unwrap();
        assert_eq!(cart.data.items[0].quantity, 2);
        assert_eq!(cart.data.total_amount, 1176.0);
    }

    #[test]
    fn test_error_bodies() {
        let response = error_response(&Error::NotFound("Order not found".to_string()));
        assert_eq!(response.status, Some(404));
        assert_eq!(response.error_message().as_deref(), Some("Order not found"));

        let response = error_response(&Error::ConnectionReset);
        assert_eq!(response.status, Some(500));
    }
}
