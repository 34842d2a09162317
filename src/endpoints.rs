//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/v1/accounts/{account_id}', use [format_endpoint].

/// Health check.
pub const PING: &str = "/v1/ping";
/// Register a user.
pub const USERS: &str = "/v1/users";
/// The user making the request.
pub const CURRENT_USER: &str = "/v1/users/me";
/// Exchange a username and password for a bearer token.
pub const LOG_IN: &str = "/v1/tokens/authentication";
/// List or create categories.
pub const CATEGORIES: &str = "/v1/categories";
/// A single category.
pub const CATEGORY: &str = "/v1/categories/{category_id}";
/// List or create accounts.
pub const ACCOUNTS: &str = "/v1/accounts";
/// A single account.
pub const ACCOUNT: &str = "/v1/accounts/{account_id}";
/// The cached balance of an account.
pub const ACCOUNT_BALANCE: &str = "/v1/accounts/{account_id}/balance";
/// The transactions of an account.
pub const ACCOUNT_TRANSACTIONS: &str = "/v1/accounts/{account_id}/transactions";
/// List or create transactions.
pub const TRANSACTIONS: &str = "/v1/transactions";
/// A single transaction.
pub const TRANSACTION: &str = "/v1/transactions/{transaction_id}";
/// Refund a transaction.
pub const REFUND_TRANSACTION: &str = "/v1/transactions/{transaction_id}/refund";
/// List or create recurring transactions.
pub const RECURRING_TRANSACTIONS: &str = "/v1/recurring_transactions";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// This function assumes that an endpoint path contains a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok(), "{uri} is not a valid URI");
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::PING);
        assert_endpoint_is_valid_uri(endpoints::USERS);
        assert_endpoint_is_valid_uri(endpoints::CURRENT_USER);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::CATEGORIES);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::RECURRING_TRANSACTIONS);

        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::CATEGORY, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::ACCOUNT, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::ACCOUNT_BALANCE, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::ACCOUNT_TRANSACTIONS, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::TRANSACTION, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::REFUND_TRANSACTION, 1));
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint(endpoints::REFUND_TRANSACTION, 42);

        assert_eq!(formatted_path, "/v1/transactions/42/refund");
    }
}
