use std::process::ExitCode;
use std::str::FromStr;

use storefront::api::{AddressInput, Category, LoginCredentials, Order, PaymentMethod, RegisterCredentials};
use storefront::client::ApiClient;
use storefront::config::{validate_address, Config};
use storefront::errors::{CLIError, Result};
use storefront::pricing::{format_price, CheckoutSummary, DeliveryPolicy, Selection};
use storefront::session::sqlite::SQLiteStore;
use storefront::storefront::Storefront;
use storefront::telemetry::setup_tracing;
use storefront::tracker::{status_text, Tracker};

const USAGE: &str = "Usage: client [<host>:<port>] <command> [args...]

Commands:
  menu [pizza|sides|beverages|desserts]
  product <id>
  login <email> <password>
  register <name> <email> <password> <phone>
  logout
  me
  cart
  add <productId> [qty] [size] [crust] [topping,topping,...]
  qty <itemId> <qty>
  remove <itemId>
  clear
  quote [coupon]
  checkout <addressId> <cod|online> [coupon]
  orders
  order <id>
  track <orderNumber>
  addresses
  address-add <label> <street> <city> <state> <pincode>
  address-rm <id>";

#[derive(Debug, PartialEq)]
enum Command {
    Menu(Option<Category>),
    Product(String),
    Login(LoginCredentials),
    Register(RegisterCredentials),
    Logout,
    Me,
    Cart,
    Add {
        product_id: String,
        quantity: u32,
        selection: Selection,
    },
    Quantity {
        item_id: String,
        quantity: u32,
    },
    Remove(String),
    Clear,
    Quote(Option<String>),
    Checkout {
        address_id: String,
        payment_method: PaymentMethod,
        coupon: Option<String>,
    },
    Orders,
    Order(String),
    Track(String),
    Addresses,
    AddressAdd(AddressInput),
    AddressRemove(String),
}

impl Command {
    /// Login and register start a new session, so a stored one is not restored first
    fn restores_session(&self) -> bool {
        !matches!(self, Command::Login(_) | Command::Register(_))
    }
}

#[derive(Debug)]
struct CLIOptions {
    target: String,
    command: Command,
}

fn required<I>(args: &mut I, name: &'static str) -> std::result::Result<String, CLIError>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or(CLIError::MissingParameter(name))
}

fn number<T: FromStr>(value: &str) -> std::result::Result<T, CLIError> {
    value
        .parse::<T>()
        .map_err(|_| CLIError::InvalidParameter(value.to_string()))
}

fn parse_category(value: &str) -> std::result::Result<Category, CLIError> {
    Category::parse(value).ok_or_else(|| CLIError::InvalidParameter(value.to_string()))
}

/// "-" skips an optional positional argument
fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| v != "-" && !v.is_empty())
}

fn parse_command<I>(name: &str, mut args: I) -> std::result::Result<Command, CLIError>
where
    I: Iterator<Item = String>,
{
    let command = match name.to_ascii_lowercase().as_str() {
        "menu" => Command::Menu(args.next().as_deref().map(parse_category).transpose()?),
        "product" => Command::Product(required(&mut args, "product id")?),
        "login" => Command::Login(LoginCredentials {
            email: required(&mut args, "email")?,
            password: required(&mut args, "password")?,
        }),
        "register" => Command::Register(RegisterCredentials {
            name: required(&mut args, "name")?,
            email: required(&mut args, "email")?,
            password: required(&mut args, "password")?,
            phone: required(&mut args, "phone")?,
        }),
        "logout" => Command::Logout,
        "me" => Command::Me,
        "cart" => Command::Cart,
        "add" => {
            let product_id = required(&mut args, "product id")?;
            let quantity = match optional(args.next()) {
                Some(quantity) => number(&quantity)?,
                None => 1,
            };
            let size = optional(args.next());
            let crust = optional(args.next());
            let toppings = optional(args.next())
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Command::Add {
                product_id,
                quantity,
                selection: Selection {
                    size,
                    crust,
                    toppings,
                },
            }
        }
        "qty" => Command::Quantity {
            item_id: required(&mut args, "item id")?,
            quantity: number(&required(&mut args, "quantity")?)?,
        },
        "remove" => Command::Remove(required(&mut args, "item id")?),
        "clear" => Command::Clear,
        "quote" => Command::Quote(args.next()),
        "checkout" => {
            let address_id = required(&mut args, "address id")?;
            let payment = required(&mut args, "payment method")?;
            Command::Checkout {
                address_id,
                payment_method: PaymentMethod::parse(&payment)
                    .ok_or(CLIError::InvalidParameter(payment))?,
                coupon: args.next(),
            }
        }
        "orders" => Command::Orders,
        "order" => Command::Order(required(&mut args, "order id")?),
        "track" => Command::Track(required(&mut args, "order number")?),
        "addresses" => Command::Addresses,
        "address-add" => {
            let label = required(&mut args, "label")?;
            Command::AddressAdd(AddressInput {
                kind: label.clone(),
                label,
                street: required(&mut args, "street")?,
                city: required(&mut args, "city")?,
                state: required(&mut args, "state")?,
                pincode: required(&mut args, "pincode")?,
                landmark: optional(args.next()),
                is_default: false,
            })
        }
        "address-rm" => Command::AddressRemove(required(&mut args, "address id")?),
        other => return Err(CLIError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

fn parse_cli_args<I>(mut args: I, default_target: &str) -> std::result::Result<CLIOptions, CLIError>
where
    I: Iterator<Item = String>,
{
    args.next(); // Skip the program name
    let maybe_target = args
        .next()
        .ok_or(CLIError::MissingParameter("target or command"))?;

    let (target, command) = match validate_address(&maybe_target) {
        Ok(target) => (
            target.to_string(),
            required(&mut args, "command")?,
        ),
        Err(_) => (default_target.to_string(), maybe_target),
    };

    Ok(CLIOptions {
        target,
        command: parse_command(&command, args)?,
    })
}

fn print_summary(summary: &CheckoutSummary) {
    println!("Subtotal:  {}", format_price(summary.subtotal));
    if let Some(code) = &summary.coupon_code {
        println!("Discount:  -{} ({})", format_price(summary.discount), code);
    }
    if summary.delivery_charge == 0.0 {
        println!("Delivery:  FREE");
    } else {
        println!("Delivery:  {}", format_price(summary.delivery_charge));
    }
    println!("Total:     {}", format_price(summary.total));
    if let Some(remaining) = summary.remaining_for_free_delivery {
        println!("Add {} more for free delivery", format_price(remaining));
    }
}

fn print_cart(storefront: &Storefront) {
    let cart = &storefront.state.cart;
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in &cart.items {
        let mut options: Vec<&str> = Vec::new();
        options.extend(item.size.as_deref());
        options.extend(item.crust.as_deref());
        options.extend(item.toppings.iter().map(String::as_str));
        println!(
            "{:<24} {} x{:<3} {:>8}  [{}]",
            item.product.name,
            options.join(", "),
            item.quantity,
            format_price(item.item_total),
            item.id
        );
    }
    println!("{} item(s)", cart.items_count());
    print_summary(&storefront.summary());
}

fn print_order(order: &Order, tracker: Option<&Tracker>) {
    println!(
        "Order {} ({}) - {}",
        order.order_number,
        order.id,
        status_text(&order.order_status)
    );
    for item in &order.items {
        println!("  {} x{}  {}", item.name, item.quantity, format_price(item.price));
    }
    println!(
        "  Subtotal {}  Discount {}  Delivery {}  Total {}",
        format_price(order.subtotal),
        format_price(order.discount),
        format_price(order.delivery_charge),
        format_price(order.total_amount)
    );
    if let Some(tracker) = tracker {
        println!("{}", tracker.render());
        println!(
            "Estimated delivery: {}",
            order.estimated_delivery.format("%H:%M")
        );
    }
}

fn execute(storefront: &mut Storefront, command: Command) -> Result<()> {
    match command {
        Command::Menu(category) => {
            storefront.load_menu(category)?;
            for (category, products) in storefront.state.products.by_category() {
                if products.is_empty() {
                    continue;
                }
                println!("== {} ==", category.as_str());
                for product in products {
                    let availability = if product.is_available { "" } else { " (unavailable)" };
                    println!(
                        "  [{:>3}] {:<28} {:>6}{}",
                        product.id,
                        product.name,
                        format_price(product.base_price),
                        availability
                    );
                }
            }
        }
        Command::Product(id) => {
            let product = storefront.product(&id)?;
            println!("{} - {}", product.name, product.description);
            println!("Price from {}", format_price(product.base_price));
            for (title, options) in [
                ("Sizes", &product.sizes),
                ("Crusts", &product.crusts),
                ("Toppings", &product.toppings),
            ] {
                if !options.is_empty() {
                    let list: Vec<String> = options
                        .iter()
                        .map(|o| format!("{} (+{})", o.name, format_price(o.price)))
                        .collect();
                    println!("{}: {}", title, list.join(", "));
                }
            }
        }
        Command::Login(credentials) => {
            let user = storefront.login(&credentials)?;
            println!("Welcome back, {}", user.name);
        }
        Command::Register(credentials) => {
            let confirm = credentials.password.clone();
            let user = storefront.register(&credentials, &confirm)?;
            println!("Welcome, {}", user.name);
        }
        Command::Logout => storefront.logout()?,
        Command::Me => match &storefront.state.auth.user {
            Some(user) => println!("{} <{}> {}", user.name, user.email, user.phone),
            None => println!("Not logged in"),
        },
        Command::Cart => {
            storefront.refresh_cart()?;
            print_cart(storefront);
        }
        Command::Add {
            product_id,
            quantity,
            selection,
        } => {
            storefront.add_to_cart(&product_id, selection, quantity)?;
            print_cart(storefront);
        }
        Command::Quantity { item_id, quantity } => {
            storefront.update_quantity(&item_id, quantity)?;
            print_cart(storefront);
        }
        Command::Remove(item_id) => {
            storefront.remove_item(&item_id)?;
            print_cart(storefront);
        }
        Command::Clear => storefront.clear_cart()?,
        Command::Quote(coupon) => {
            storefront.refresh_cart()?;
            if let Some(code) = coupon {
                // The quote is still worth showing when the coupon does not apply
                let _ = storefront.apply_coupon(&code);
            }
            print_cart(storefront);
        }
        Command::Checkout {
            address_id,
            payment_method,
            coupon,
        } => {
            storefront.refresh_cart()?;
            if let Some(code) = coupon {
                storefront.apply_coupon(&code)?;
            }
            print_summary(&storefront.summary());
            let order = storefront.checkout(Some(&address_id), payment_method)?;
            print_order(&order, None);
        }
        Command::Orders => {
            let orders = storefront.orders()?;
            if orders.is_empty() {
                println!("No orders yet");
            }
            for order in orders {
                println!(
                    "{:<16} {:<18} {:>8}  {}",
                    order.order_number,
                    status_text(&order.order_status),
                    format_price(order.total_amount),
                    order.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Order(id) => {
            let (order, tracker) = storefront.order(&id)?;
            print_order(&order, Some(&tracker));
        }
        Command::Track(number) => {
            let (order, tracker) = storefront.track(&number)?;
            print_order(&order, Some(&tracker));
        }
        Command::Addresses => {
            for address in storefront.addresses()? {
                let default = if address.is_default { " (default)" } else { "" };
                println!(
                    "[{}] {}: {}, {}, {} {}{}",
                    address.id,
                    address.label.as_deref().unwrap_or(&address.kind),
                    address.street,
                    address.city,
                    address.state,
                    address.pincode,
                    default
                );
            }
        }
        Command::AddressAdd(input) => {
            let address = storefront.add_address(&input)?;
            println!("Saved address {}", address.id);
        }
        Command::AddressRemove(id) => storefront.delete_address(&id)?,
    }
    Ok(())
}

fn run() -> Result<ExitCode> {
    let config = Config::load()?;
    let options = parse_cli_args(std::env::args(), &config.api_addr)?;

    let store = SQLiteStore::open(&config.token_db)?;
    let client = ApiClient::new(&options.target, Box::new(store));
    let mut storefront = Storefront::new(client, DeliveryPolicy::default());

    if options.command.restores_session() {
        storefront.restore_session();
    }
    let result = execute(&mut storefront, options.command);

    // Failures of the command itself were already turned into notifications
    for notification in storefront.notifier.drain() {
        println!("{}", notification);
    }
    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    setup_tracing("warn");
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        std::iter::once("client".to_string())
            .chain(list.iter().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_target_is_optional() {
        let options = parse_cli_args(args(&["orders"]), "127.0.0.1:9898").unwrap();
        assert_eq!(options.target, "127.0.0.1:9898");
        assert_eq!(options.command, Command::Orders);

        let options = parse_cli_args(args(&["localhost:5000", "cart"]), "127.0.0.1:9898").unwrap();
        assert_eq!(options.target, "localhost:5000");
        assert_eq!(options.command, Command::Cart);
    }

    #[test]
    fn test_parse_add() {
        let options = parse_cli_args(
            args(&["add", "1", "2", "medium", "-", "Extra Cheese,Jalapeno"]),
            "127.0.0.1:9898",
        )
        .unwrap();
        assert_eq!(
            options.command,
            Command::Add {
                product_id: "1".to_string(),
                quantity: 2,
                selection: Selection::new(Some("medium"), None, &["Extra Cheese", "Jalapeno"]),
            }
        );

        let options = parse_cli_args(args(&["add", "9"]), "127.0.0.1:9898").unwrap();
        assert_eq!(
            options.command,
            Command::Add {
                product_id: "9".to_string(),
                quantity: 1,
                selection: Selection::default(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_cli_args(args(&[]), "127.0.0.1:9898"),
            Err(CLIError::MissingParameter(_))
        ));
        assert!(matches!(
            parse_cli_args(args(&["checkout", "a1", "card"]), "127.0.0.1:9898"),
            Err(CLIError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_cli_args(args(&["qty", "line-1", "two"]), "127.0.0.1:9898"),
            Err(CLIError::InvalidParameter(_))
        ));
        assert!(matches!(
            parse_cli_args(args(&["bake"]), "127.0.0.1:9898"),
            Err(CLIError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_parse_checkout() {
        let options =
            parse_cli_args(args(&["checkout", "address-3", "COD", "pizza20"]), "127.0.0.1:9898")
                .unwrap();
        assert_eq!(
            options.command,
            Command::Checkout {
                address_id: "address-3".to_string(),
                payment_method: PaymentMethod::Cod,
                coupon: Some("pizza20".to_string()),
            }
        );
    }
}
