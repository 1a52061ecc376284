use miette::Diagnostic;
use oauth2::HttpClientError;
use oauth2::basic::BasicErrorResponse;
use thiserror::Error;

/// Error returned by the `oauth2` crate for a failed token-endpoint request.
pub type TokenRequestError =
    oauth2::RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>;

/// Errors that can occur during a sync run.
///
/// `Config` and `AuthExchange` are fatal and abort the run. `Refresh` is
/// recoverable (the token manager falls back to the manual authorization
/// flow). `Persistence` is logged and never propagated past the token
/// manager. `InvoiceCreate` and `PaymentCreate` are caught per customer by
/// the orchestrator and converted into counter increments.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(xerosync::config_error),
        help("Check config.json and product_mappings.csv for missing or malformed entries")
    )]
    Config(String),

    #[error("error making request: {0:?}")]
    #[diagnostic(
        code(xerosync::request_error),
        help("Check your network connection and the remote API's availability")
    )]
    Request(#[from] reqwest::Error),

    #[error("error decoding response: {0:?}")]
    #[diagnostic(
        code(xerosync::unexpected_response_shape),
        help("The API returned data in an unexpected format")
    )]
    UnexpectedResponseShape(#[source] serde_json::Error, Option<String>),

    #[error("api error ({status}) from {url}: {body}")]
    #[diagnostic(
        code(xerosync::api_error),
        help("Review the response body returned by the remote API")
    )]
    Api {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("endpoint could not be parsed as a URL")]
    #[diagnostic(
        code(xerosync::invalid_endpoint),
        help("Check that the API endpoint URL is correctly formatted")
    )]
    InvalidEndpoint,

    #[error("authorization code exchange failed: {0:?}")]
    #[diagnostic(
        code(xerosync::auth_exchange_failed),
        help("Verify the OAuth2 client credentials and the pasted authorization code")
    )]
    AuthExchange(#[source] Box<TokenRequestError>),

    #[error("token refresh failed: {0:?}")]
    #[diagnostic(
        code(xerosync::refresh_failed),
        help("The stored refresh token may have been revoked; re-authorization will be required")
    )]
    Refresh(#[source] Box<TokenRequestError>),

    #[error("failed to persist token state: {0}")]
    #[diagnostic(
        code(xerosync::persistence_failed),
        help("Token state could not be written back to config.json; the next run may require manual re-authorization")
    )]
    Persistence(#[source] std::io::Error),

    #[error("invoice creation failed for customer {customer_id}")]
    #[diagnostic(
        code(xerosync::invoice_create_failed),
        help("The invoice remains unsynced; it will be retried on the next run while it is unpaid")
    )]
    InvoiceCreate {
        customer_id: i64,
        #[source]
        source: Box<Error>,
    },

    #[error("payment creation failed for invoice {invoice_id}")]
    #[diagnostic(
        code(xerosync::payment_create_failed),
        help(
            "The invoice was created in the accounting platform but is still unpaid at the source; reconcile manually"
        )
    )]
    PaymentCreate {
        invoice_id: i64,
        #[source]
        source: Box<Error>,
    },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::UnexpectedResponseShape(e, None)
    }
}

/// Type alias for results from this crate.
pub type Result<O> = std::result::Result<O, Error>;
