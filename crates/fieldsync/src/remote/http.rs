//! HTTP client for a CouchDB-style document store.
//!
//! - Discovery: `GET {base}/_all_dbs`
//! - Create (default): `POST {base}/{db}` with the document as JSON
//! - Create (idempotent): `PUT {base}/{db}/{id}`; `409 Conflict` means the
//!   document is already there
//!
//! Every request carries a Basic-Auth header when a user name is configured.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use tracing::{debug, instrument, warn};

use crate::config::{PushMode, RemoteConfig};
use crate::document::{Collection, Document};
use crate::error::{Error, Result};
use crate::logging::DEGRADED_TARGET;

use super::RemoteStore;

/// Path of the discovery endpoint.
const DISCOVERY_PATH: &str = "_all_dbs";

/// Remote store reached over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: Url,
    client: reqwest::Client,
    headers: HeaderMap,
    probe_timeout: Duration,
    distributions_db: String,
    gps_photos_db: String,
    push_mode: PushMode,
}

/// Map a transport error, keeping timeouts distinct.
fn transport_error(operation: &'static str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            operation: operation.to_string(),
        }
    } else {
        Error::network(operation, err.to_string())
    }
}

/// Build a Basic-Auth header value from a user name and password.
#[must_use]
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {credentials}")
}

impl HttpRemote {
    /// Create a client from the remote section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid, the credentials cannot be
    /// encoded as a header, or the HTTP client cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid base_url '{}': {e}", config.base_url),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(username) = &config.username {
            let password = config.password.as_deref().unwrap_or_default();
            let mut value = HeaderValue::from_str(&basic_auth_header(username, password))
                .map_err(|e| Error::ConfigValidation {
                    message: format!("invalid credentials: {e}"),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::network("client setup", e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            headers,
            probe_timeout: config.probe_timeout(),
            distributions_db: config.distributions_db.clone(),
            gps_photos_db: config.gps_photos_db.clone(),
            push_mode: config.push_mode,
        })
    }

    /// Name of the remote collection backing a local one.
    #[must_use]
    pub fn remote_name(&self, collection: Collection) -> &str {
        match collection {
            Collection::Distributions => &self.distributions_db,
            Collection::GpsPhotos => &self.gps_photos_db,
        }
    }

    /// URL of the discovery endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn discovery_url(&self) -> Result<Url> {
        self.url_with(&[DISCOVERY_PATH])
    }

    /// URL a document is pushed to under the configured push mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn push_url(&self, collection: Collection, doc: &Document) -> Result<Url> {
        let db = self.remote_name(collection);
        match self.push_mode {
            PushMode::Create => self.url_with(&[db]),
            PushMode::Idempotent => self.url_with(&[db, doc.id()]),
        }
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::ConfigValidation {
                message: format!("base_url '{}' cannot be a base", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    #[instrument(name = "remote_list_collections", skip(self))]
    async fn list_collections(&self) -> Result<Vec<String>> {
        let url = self.discovery_url()?;
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| transport_error("probe", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        match response.json::<Vec<String>>().await {
            Ok(collections) => {
                debug!("Remote collections: {:?}", collections);
                Ok(collections)
            }
            Err(e) => {
                warn!(
                    target: DEGRADED_TARGET,
                    "Discovery response was not a collection list: {}",
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    #[instrument(name = "remote_create_document", skip(self, doc), fields(id = doc.id()))]
    async fn create_document(&self, collection: Collection, doc: &Document) -> Result<()> {
        let url = self.push_url(collection, doc)?;
        let request = match self.push_mode {
            PushMode::Create => self.client.post(url.clone()),
            PushMode::Idempotent => self.client.put(url.clone()),
        };

        let response = request
            .headers(self.headers.clone())
            .json(doc)
            .send()
            .await
            .map_err(|e| transport_error("push", &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if self.push_mode == PushMode::Idempotent && status == StatusCode::CONFLICT {
            debug!("Document {} already present remotely", doc.id());
            return Ok(());
        }
        Err(Error::RemoteStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}
