use crate::validation::FieldErrors;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the storefront can surface to a user.
///
/// None of these are fatal: the caller shows the message and lets the user try again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No response from server")]
    NoResponse,
    #[error("Connection reset by peer")]
    ConnectionReset,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed HTTP message: {0}")]
    Http(#[from] httparse::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Session storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Invalid route: {0}")]
    Route(#[from] matchit::InsertError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Please login to continue")]
    Unauthorized,
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Validation(FieldErrors),
    #[error("{0}")]
    CouponRejected(String),
    #[error("{0}")]
    Checkout(String),
    #[error("{0}")]
    Cli(#[from] CLIError),
}

impl Error {
    /// The message shown to the user, falling back to `fallback` for errors that carry
    /// nothing a customer could act on.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Status { message, .. } if !message.is_empty() => message.clone(),
            Error::BadRequest(message) | Error::NotFound(message) if !message.is_empty() => {
                message.clone()
            }
            Error::Unauthorized
            | Error::Validation(_)
            | Error::CouponRejected(_)
            | Error::Checkout(_)
            | Error::Cli(_) => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Errors that can occur when parsing the command line arguments
#[derive(Debug, Clone, thiserror::Error)]
pub enum CLIError {
    #[error("Invalid target format. Should be <host>:<port>")]
    InvalidUrlFormat,
    #[error("Missing parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("Invalid parameter '{0}'")]
    InvalidParameter(String),
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = Error::Status {
            status: 400,
            message: "Coupon expired".to_string(),
        };
        assert_eq!(err.user_message("Invalid coupon code"), "Coupon expired");

        let err = Error::Status {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message("Invalid coupon code"), "Invalid coupon code");
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = Error::ConnectionReset;
        assert_eq!(err.user_message("Failed to place order"), "Failed to place order");
        assert_eq!(
            Error::Unauthorized.user_message("ignored"),
            "Please login to continue"
        );
    }
}
