use serde_json::Value;

use crate::catalog::{EndpointCatalog, OperationSpec};
use crate::error::{Error, Result};
use crate::params::{API_KEY_PARAM, Params, RequestBuilder, ResolvedRequest, SUBSCRIPTION_PARAM};
use crate::result::ResultCollection;
use crate::subscription::Subscription;
use crate::transport::{HttpResponse, HttpTransport, Transport};

/// Client for the FantasyData NFL service.
///
/// Holds the credentials and the catalog; every call is independent, so one
/// client can be shared across threads when its transport allows it.
pub struct ServiceClient<T = HttpTransport> {
    api_key: String,
    subscription: Subscription,
    catalog: EndpointCatalog,
    builder: RequestBuilder,
    transport: T,
}

impl ServiceClient<HttpTransport> {
    /// Builtin catalog, default HTTP transport, no timeout.
    pub fn new(api_key: impl Into<String>, subscription: &str) -> Result<Self> {
        let api_key = api_key.into();
        check_credentials(&api_key, subscription)?;
        let catalog = EndpointCatalog::builtin()?;
        let transport = HttpTransport::new(None).map_err(|source| Error::Transport {
            url: catalog.default_base_url().to_string(),
            source,
        })?;
        Self::with_transport(api_key, subscription, catalog, transport)
    }
}

impl<T: Transport> ServiceClient<T> {
    pub fn with_transport(
        api_key: impl Into<String>,
        subscription: &str,
        catalog: EndpointCatalog,
        transport: T,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let subscription = check_credentials(&api_key, subscription)?;
        let builder = RequestBuilder::new(catalog.default_base_url(), &catalog);
        Ok(Self {
            api_key,
            subscription,
            catalog,
            builder,
            transport,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.builder = RequestBuilder::new(base_url, &self.catalog);
        self
    }

    pub fn subscription(&self) -> Subscription {
        self.subscription
    }

    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn operation(&self, name: &str) -> Result<Operation<'_, T>> {
        let spec = self.catalog.lookup(name)?;
        Ok(Operation { client: self, spec })
    }

    pub fn invoke(&self, name: &str, params: &Params) -> Result<ResultCollection> {
        self.operation(name)?.call(params)
    }

    /// Builds the request for `name` without sending it.
    pub fn resolve(&self, name: &str, params: &Params) -> Result<ResolvedRequest> {
        self.operation(name)?.resolve(params)
    }

    pub fn are_any_games_in_progress(&self) -> Result<bool> {
        let result = self.invoke("AreAnyGamesInProgress", &Params::new())?;
        result.as_bool().ok_or_else(|| Error::MalformedResponse {
            operation: "AreAnyGamesInProgress".to_string(),
            reason: "expected a boolean".to_string(),
        })
    }

    pub fn teams(&self, season: &str) -> Result<ResultCollection> {
        self.invoke("Teams", &single("Season", season))
    }

    pub fn schedules(&self, season: &str) -> Result<ResultCollection> {
        self.invoke("Schedules", &single("Season", season))
    }

    pub fn team_season_stats(&self, season: &str) -> Result<ResultCollection> {
        self.invoke("TeamSeasonStats", &single("Season", season))
    }

    /// `kind` is one of current, upcoming, completed, recent or all.
    pub fn timeframes(&self, kind: &str) -> Result<ResultCollection> {
        self.invoke("Timeframes", &single("Type", kind))
    }

    fn defaults(&self) -> Params {
        let mut defaults = Params::new();
        defaults.insert(SUBSCRIPTION_PARAM.to_string(), self.subscription.to_string());
        defaults.insert(API_KEY_PARAM.to_string(), self.api_key.clone());
        defaults
    }
}

/// One catalog operation bound to a client.
pub struct Operation<'a, T> {
    client: &'a ServiceClient<T>,
    spec: &'a OperationSpec,
}

impl<'a, T: Transport> Operation<'a, T> {
    pub fn spec(&self) -> &'a OperationSpec {
        self.spec
    }

    pub fn resolve(&self, params: &Params) -> Result<ResolvedRequest> {
        self.client
            .builder
            .build(self.spec, &self.client.defaults(), params)
    }

    pub fn call(&self, params: &Params) -> Result<ResultCollection> {
        let request = self.resolve(params)?;
        log::debug!("request {request}");
        let resp = self
            .client
            .transport
            .send(request.method, &request.url)
            .map_err(|source| Error::Transport {
                url: request.redacted_url(),
                source,
            })?;
        log::debug!("{} responded {}", self.spec.name, resp.status);

        if !resp.is_success() {
            return Err(Error::UnexpectedStatus {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }
        self.decode(&resp).map(ResultCollection::new)
    }

    fn decode(&self, resp: &HttpResponse) -> Result<Value> {
        let malformed = |reason: String| Error::MalformedResponse {
            operation: self.spec.name.clone(),
            reason,
        };
        if resp.body.iter().all(u8::is_ascii_whitespace) {
            return Err(malformed("empty body".to_string()));
        }
        let value: Value =
            serde_json::from_slice(&resp.body).map_err(|err| malformed(err.to_string()))?;
        if !self.spec.response.matches(&value) {
            return Err(malformed(format!(
                "expected {:?} response, got {}",
                self.spec.response,
                json_kind(&value)
            )));
        }
        Ok(value)
    }
}

fn check_credentials(api_key: &str, subscription: &str) -> Result<Subscription> {
    if api_key.is_empty() {
        return Err(Error::InvalidCredential);
    }
    Subscription::parse(subscription)
}

fn single(name: &str, value: &str) -> Params {
    let mut params = Params::new();
    params.insert(name.to_string(), value.to_string());
    params
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
