use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Quantity must be a positive whole number, got '{input}'")]
    InvalidQuantity { input: String },

    #[error("Product id must be a positive whole number, got '{input}'")]
    InvalidProductId { input: String },

    #[error("Product {id} is unavailable: {reason}")]
    ProductUnavailable { id: u64, reason: String },

    #[error("Stored cart is unreadable: {reason}")]
    StoreCorrupt { reason: String },

    #[error("Your shopping list is empty. Please add items to proceed.")]
    EmptyCartCheckout,

    #[error("Product {id} not found in catalog")]
    ProductNotFound { id: u64 },

    #[error("Catalog returned malformed product data for {id}: {reason}")]
    MalformedProduct { id: u64, reason: String },

    #[error("Catalog request to {url} failed with status {status}")]
    CatalogStatusError { url: String, status: u16 },

    #[error("Catalog lookup for product {id} timed out after {timeout_ms}ms")]
    LookupTimeout { id: u64, timeout_ms: u64 },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Catalog,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CartError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CartError::InvalidQuantity { .. }
            | CartError::InvalidProductId { .. }
            | CartError::EmptyCartCheckout => ErrorCategory::Input,
            CartError::ProductUnavailable { .. }
            | CartError::ProductNotFound { .. }
            | CartError::MalformedProduct { .. }
            | CartError::CatalogStatusError { .. }
            | CartError::LookupTimeout { .. }
            | CartError::ApiError(_) => ErrorCategory::Catalog,
            CartError::StoreCorrupt { .. }
            | CartError::IoError(_)
            | CartError::SerializationError(_) => ErrorCategory::Storage,
            CartError::UrlError(_)
            | CartError::ConfigError { .. }
            | CartError::ConfigValidationError { .. }
            | CartError::InvalidConfigValueError { .. }
            | CartError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // guidance only, the cart is untouched
            CartError::EmptyCartCheckout | CartError::StoreCorrupt { .. } => ErrorSeverity::Low,
            CartError::InvalidQuantity { .. }
            | CartError::InvalidProductId { .. }
            | CartError::ProductUnavailable { .. }
            | CartError::ProductNotFound { .. }
            | CartError::MalformedProduct { .. } => ErrorSeverity::Medium,
            CartError::CatalogStatusError { .. }
            | CartError::LookupTimeout { .. }
            | CartError::ApiError(_)
            | CartError::IoError(_)
            | CartError::SerializationError(_) => ErrorSeverity::High,
            CartError::UrlError(_)
            | CartError::ConfigError { .. }
            | CartError::ConfigValidationError { .. }
            | CartError::InvalidConfigValueError { .. }
            | CartError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CartError::InvalidQuantity { .. } => {
                "Please enter a valid quantity (1 or more).".to_string()
            }
            CartError::ProductNotFound { id } | CartError::ProductUnavailable { id, .. } => {
                format!("Product {} is no longer available.", id)
            }
            CartError::ApiError(_)
            | CartError::CatalogStatusError { .. }
            | CartError::LookupTimeout { .. } => {
                "The product catalog could not be reached.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the product id and quantity and try again",
            ErrorCategory::Catalog => "Check that the catalog service is running and reachable",
            ErrorCategory::Storage => "Check that the cart storage directory is writable",
            ErrorCategory::Configuration => "Review the configuration file and command-line flags",
        }
    }
}

pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cart_checkout_is_guidance() {
        let err = CartError::EmptyCartCheckout;
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(
            err.to_string(),
            "Your shopping list is empty. Please add items to proceed."
        );
    }

    #[test]
    fn catalog_failures_share_a_category() {
        let errors = [
            CartError::ProductNotFound { id: 3 },
            CartError::LookupTimeout {
                id: 3,
                timeout_ms: 10,
            },
            CartError::CatalogStatusError {
                url: "http://localhost/products".to_string(),
                status: 500,
            },
        ];
        for err in &errors {
            assert_eq!(err.category(), ErrorCategory::Catalog);
        }
        assert_eq!(
            errors[0].user_friendly_message(),
            "Product 3 is no longer available."
        );
    }
}
