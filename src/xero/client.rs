use core::fmt;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::{Error, Result};
use crate::xero::invoice;

pub const API_URL: &str = "https://api.xero.com/api.xro/2.0/";

/// Client for the Xero accounting API. Carries a bearer token produced by the
/// token manager and the tenant the invoices belong to.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    access_token: String,
    tenant_id: String,
}

impl Client {
    pub fn new(access_token: impl Into<String>, tenant_id: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(API_URL).map_err(|_| Error::InvalidEndpoint)?;
        Ok(Self::with_base_url(base_url, access_token, tenant_id))
    }

    /// Builds a client against a non-default API root. Used by tests to point
    /// at a mock server.
    #[must_use]
    pub fn with_base_url(
        base_url: Url,
        access_token: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            access_token: access_token.into(),
            tenant_id: tenant_id.into(),
        }
    }

    fn build_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|_| Error::InvalidEndpoint)?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header("Xero-tenant-id", &self.tenant_id)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    /// Perform an authenticated `PUT` request against the API. One attempt,
    /// no retries.
    #[instrument(skip(self, data))]
    pub(crate) async fn put<R: DeserializeOwned, T: Serialize + fmt::Debug>(
        &self,
        path: &str,
        data: &T,
    ) -> Result<R> {
        trace!(?path, "making PUT request");
        let response = self.build_request(Method::PUT, path)?.json(data).send().await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(response))]
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text().await?;

        if status == StatusCode::OK {
            serde_json::from_str(&text).map_err(|e| {
                error!(error = %e, "failed to deserialize response");
                Error::UnexpectedResponseShape(e, Some(text))
            })
        } else {
            error!(%status, %url, "unexpected status code");
            Err(Error::Api {
                status,
                url,
                body: text,
            })
        }
    }

    /// Access the invoices API.
    #[must_use]
    pub fn invoices(&self) -> InvoicesApi<'_> {
        InvoicesApi { client: self }
    }
}

/// API handler for Invoices endpoints.
#[derive(Debug)]
pub struct InvoicesApi<'a> {
    client: &'a Client,
}

impl InvoicesApi<'_> {
    /// Create a new invoice.
    #[instrument(skip(self, builder), fields(reference = ?builder.reference))]
    pub async fn create(&self, builder: &invoice::Builder) -> Result<invoice::Invoice> {
        #[derive(Serialize, Debug)]
        #[serde(rename_all = "PascalCase")]
        struct InvoiceWrapper<'a> {
            invoices: Vec<&'a invoice::Builder>,
        }

        let request = InvoiceWrapper {
            invoices: vec![builder],
        };

        let response: invoice::ListResponse =
            self.client.put(invoice::ENDPOINT, &request).await?;

        response
            .invoices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Api {
                status: StatusCode::OK,
                url: invoice::ENDPOINT.to_string(),
                body: "no invoice returned in response".to_string(),
            })
    }
}
