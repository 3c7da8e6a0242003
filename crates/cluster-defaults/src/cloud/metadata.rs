//! Client for the Azure Stack metadata endpoint, which publishes the gallery,
//! graph and login endpoints of a custom cloud.
use std::time::Duration;

use reqwest::{StatusCode, blocking::Client};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, instrument};
use url::Url;

const METADATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_ENDPOINTS_PATH: &str = "metadata/endpoints";
const METADATA_API_VERSION: &str = "1.0";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to build the metadata HTTP client"))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("failed to parse resource manager endpoint {endpoint:?}"))]
    ParseEndpoint {
        source: url::ParseError,
        endpoint: String,
    },

    #[snafu(display("failed to request metadata endpoints from {url}"))]
    SendRequest { source: reqwest::Error, url: Url },

    #[snafu(display("metadata endpoint {url} responded with status {status}"))]
    UnexpectedStatus { status: StatusCode, url: Url },

    #[snafu(display("failed to read metadata response body from {url}"))]
    ReadBody { source: reqwest::Error, url: Url },

    #[snafu(display("failed to parse metadata response body from {url}"))]
    ParseBody {
        source: serde_json::Error,
        url: Url,
    },

    #[snafu(display("metadata response from {url} is missing {field:?}"))]
    MissingField { field: &'static str, url: Url },
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MetadataEndpointsResponse {
    gallery_endpoint: String,
    graph_endpoint: String,
    portal_endpoint: String,
    authentication: Option<MetadataAuthentication>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MetadataAuthentication {
    login_endpoint: String,
    audiences: Vec<String>,
}

/// Validated content of the metadata endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetadataEndpoints {
    pub gallery_endpoint: String,
    pub graph_endpoint: String,
    pub portal_endpoint: String,
    pub login_endpoint: String,

    /// The first audience, which serves as the service management endpoint.
    pub audience: String,
}

/// Anything that can look up the metadata endpoints of a resource manager.
pub trait MetadataSource {
    fn metadata_endpoints(&self, resource_manager_endpoint: &str) -> Result<MetadataEndpoints>;
}

/// Fetches metadata endpoints over HTTP with a single, time bounded request.
#[derive(Clone, Debug)]
pub struct HttpMetadataClient {
    client: Client,
}

impl HttpMetadataClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(METADATA_REQUEST_TIMEOUT)
            .build()
            .context(BuildClientSnafu)?;

        Ok(Self { client })
    }
}

impl MetadataSource for HttpMetadataClient {
    #[instrument(name = "fetch_metadata_endpoints", skip(self))]
    fn metadata_endpoints(&self, resource_manager_endpoint: &str) -> Result<MetadataEndpoints> {
        let url = metadata_url(resource_manager_endpoint)?;
        debug!(%url, "requesting metadata endpoints");

        let response = self
            .client
            .get(url.clone())
            .send()
            .context(SendRequestSnafu { url: url.clone() })?;

        let status = response.status();
        ensure!(
            status == StatusCode::OK,
            UnexpectedStatusSnafu { status, url }
        );

        let body = response.text().context(ReadBodySnafu { url: url.clone() })?;
        parse_metadata_endpoints(&body, url)
    }
}

/// Builds `{resource_manager_endpoint}metadata/endpoints?api-version=1.0`.
fn metadata_url(resource_manager_endpoint: &str) -> Result<Url> {
    let context = || ParseEndpointSnafu {
        endpoint: resource_manager_endpoint,
    };

    let mut base = Url::parse(resource_manager_endpoint).with_context(|_| context())?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base.join(METADATA_ENDPOINTS_PATH).with_context(|_| context())?;
    url.query_pairs_mut()
        .append_pair("api-version", METADATA_API_VERSION);

    Ok(url)
}

fn parse_metadata_endpoints(body: &str, url: Url) -> Result<MetadataEndpoints> {
    let response: MetadataEndpointsResponse =
        serde_json::from_str(body).context(ParseBodySnafu { url: url.clone() })?;

    ensure!(
        !response.graph_endpoint.is_empty(),
        MissingFieldSnafu {
            field: "graphEndpoint",
            url
        }
    );

    let authentication = response.authentication.context(MissingFieldSnafu {
        field: "authentication",
        url: url.clone(),
    })?;

    ensure!(
        !authentication.login_endpoint.is_empty(),
        MissingFieldSnafu {
            field: "authentication.loginEndpoint",
            url
        }
    );

    let audience = authentication
        .audiences
        .into_iter()
        .next()
        .filter(|audience| !audience.is_empty())
        .context(MissingFieldSnafu {
            field: "authentication.audiences",
            url,
        })?;

    Ok(MetadataEndpoints {
        gallery_endpoint: response.gallery_endpoint,
        graph_endpoint: response.graph_endpoint,
        portal_endpoint: response.portal_endpoint,
        login_endpoint: authentication.login_endpoint,
        audience,
    })
}
