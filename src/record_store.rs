use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Serialize;

use crate::domain::SubscriptionRecord;

/// Client for the external tabular store (Airtable's REST API). The store is
/// the system of record for subscriptions; we only ever create rows.
///
/// Like any `reqwest::Client` wrapper, this should be built once and shared
/// (via `web::Data`), so that connections are pooled across requests.
#[derive(Clone, Debug)]
pub struct RecordStoreClient {
    http_client: Client,
    base_url: String,
    base_id: Secret<String>,
    api_key: Secret<String>,
    table: String,
}

/// Request body of `POST /v0/{base}/{table}`; the API takes a batch, we always
/// send exactly one record.
#[derive(Serialize)]
struct CreateRecordsRequest<'a> {
    records: [NewRecord<'a>; 1],
}

#[derive(Serialize)]
struct NewRecord<'a> {
    fields: &'a SubscriptionRecord<'a>,
}

impl RecordStoreClient {
    pub fn new(
        base_url: String,
        base_id: Secret<String>,
        api_key: Secret<String>,
        table: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            base_id,
            api_key,
            table,
        })
    }

    /// Table names may contain spaces (and start with digits), so both path
    /// segments are percent-encoded
    fn records_url(&self) -> String {
        format!(
            "{}/v0/{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(self.base_id.expose_secret()),
            urlencoding::encode(&self.table),
        )
    }

    /// Single attempt; a non-2xx status is an error. Nothing is retried: if
    /// this fails, the subscription is lost and the caller gets a 500.
    #[tracing::instrument(
        name = "Creating newsletter record in store",
        skip(self, record),
        fields(table = %self.table)
    )]
    pub async fn create_record(
        &self,
        record: &SubscriptionRecord<'_>,
    ) -> Result<(), reqwest::Error> {
        let body = CreateRecordsRequest {
            records: [NewRecord { fields: record }],
        };
        self.http_client
            .post(self.records_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
