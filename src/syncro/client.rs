use core::fmt;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use time::Date;
use time::macros::format_description;
use url::Url;

use crate::error::{Error, Result};
use crate::syncro::{customer, invoice, payment};

/// Client for the Syncro MSP API.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl Client {
    /// Builds a client for the given account subdomain.
    pub fn new(subdomain: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(&format!("https://{subdomain}.syncromsp.com/api/v1/"))
            .map_err(|_| Error::Config(format!("invalid Syncro subdomain: {subdomain:?}")))?;
        Ok(Self::with_base_url(base_url, api_key))
    }

    /// Builds a client against a non-default API root. Used by tests to point
    /// at a mock server.
    #[must_use]
    pub fn with_base_url(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
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
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    #[instrument(skip(self, query))]
    async fn get<R: DeserializeOwned, Q: Serialize + fmt::Debug>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<R> {
        trace!(?query, ?path, "making GET request");
        let response = self
            .build_request(Method::GET, path)?
            .query(query)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(self, data))]
    async fn post<R: DeserializeOwned, T: Serialize + fmt::Debug>(
        &self,
        path: &str,
        data: &T,
    ) -> Result<R> {
        trace!(?path, "making POST request");
        let response = self
            .build_request(Method::POST, path)?
            .json(data)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(response))]
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text().await?;

        if status == StatusCode::OK || status == StatusCode::CREATED {
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

    /// Access the customers API.
    #[must_use]
    pub fn customers(&self) -> CustomersApi<'_> {
        CustomersApi { client: self }
    }

    /// Access the invoices API.
    #[must_use]
    pub fn invoices(&self) -> InvoicesApi<'_> {
        InvoicesApi { client: self }
    }

    /// Access the payments API.
    #[must_use]
    pub fn payments(&self) -> PaymentsApi<'_> {
        PaymentsApi { client: self }
    }
}

/// API handler for Customers endpoints.
#[derive(Debug)]
pub struct CustomersApi<'a> {
    client: &'a Client,
}

impl CustomersApi<'_> {
    /// Retrieve every customer, walking all pages.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<customer::Customer>> {
        #[derive(Serialize, Debug)]
        struct Query {
            page: u32,
        }

        let mut customers = Vec::new();
        let mut page = 1;
        loop {
            let response: customer::ListResponse =
                self.client.get("customers", &Query { page }).await?;
            customers.extend(response.customers);
            if response.meta.page >= response.meta.total_pages {
                break;
            }
            page += 1;
        }
        debug!(count = customers.len(), "fetched customer list");
        Ok(customers)
    }
}

/// API handler for Invoices endpoints.
#[derive(Debug)]
pub struct InvoicesApi<'a> {
    client: &'a Client,
}

impl InvoicesApi<'_> {
    /// Retrieve unpaid invoices updated since the given date, walking all
    /// pages.
    #[instrument(skip(self))]
    pub async fn list_unpaid_since(&self, since: Date) -> Result<Vec<invoice::InvoiceSummary>> {
        #[derive(Serialize, Debug)]
        struct Query {
            unpaid: bool,
            since_updated_at: String,
            page: u32,
        }

        let format = format_description!("[year]-[month]-[day]");
        let since = since
            .format(&format)
            .map_err(|_| Error::Config(format!("unformattable cutoff date: {since}")))?;

        let mut invoices = Vec::new();
        let mut page = 1;
        loop {
            let response: invoice::ListResponse = self
                .client
                .get(
                    "invoices",
                    &Query {
                        unpaid: true,
                        since_updated_at: since.clone(),
                        page,
                    },
                )
                .await?;
            invoices.extend(response.invoices);
            if response.meta.page >= response.meta.total_pages {
                break;
            }
            page += 1;
        }
        debug!(count = invoices.len(), %since, "fetched unpaid invoices");
        Ok(invoices)
    }

    /// Retrieve a single invoice with its line items.
    #[instrument(skip(self))]
    pub async fn get(&self, invoice_id: i64) -> Result<invoice::Invoice> {
        let response: invoice::DetailResponse = self
            .client
            .get(&format!("invoices/{invoice_id}"), &Vec::<String>::new())
            .await?;
        Ok(response.invoice)
    }
}

/// API handler for Payments endpoints.
#[derive(Debug)]
pub struct PaymentsApi<'a> {
    client: &'a Client,
}

impl PaymentsApi<'_> {
    /// Record a payment against a source invoice.
    #[instrument(skip(self, new_payment), fields(invoice_id = new_payment.invoice_id))]
    pub async fn create(&self, new_payment: &payment::NewPayment) -> Result<payment::Payment> {
        let response: payment::CreateResponse =
            self.client.post("payments", new_payment).await?;
        Ok(response.payment)
    }
}
