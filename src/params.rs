use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::{
    EndpointCatalog, Method, OperationSpec, ParamLocation, ParamSpec, PathTemplate, Segment,
};
use crate::error::{Error, Result};

/// Parameter name -> value, as supplied by the caller.
pub type Params = BTreeMap<String, String>;

pub const API_KEY_PARAM: &str = "key";
pub const SUBSCRIPTION_PARAM: &str = "Subscription";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub method: Method,
    pub url: String,
}

impl ResolvedRequest {
    /// The URL with the API key masked, safe for logs and error messages.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

impl fmt::Display for ResolvedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.redacted_url())
    }
}

pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((API_KEY_PARAM, _)) => format!("{API_KEY_PARAM}=***"),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", pairs.join("&"))
}

/// Turns an operation plus parameter values into a concrete URL. Pure; no I/O.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    root: PathTemplate,
    globals: Vec<ParamSpec>,
}

impl RequestBuilder {
    pub fn new(base_url: impl Into<String>, catalog: &EndpointCatalog) -> Self {
        Self {
            base_url: base_url.into(),
            root: catalog.root().clone(),
            globals: catalog.globals().to_vec(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `supplied` wins over `defaults`; spec-level defaults fill whatever is left.
    pub fn build(
        &self,
        op: &OperationSpec,
        defaults: &Params,
        supplied: &Params,
    ) -> Result<ResolvedRequest> {
        let specs: Vec<&ParamSpec> = op.params.iter().chain(&self.globals).collect();

        for name in supplied.keys() {
            if !specs.iter().any(|p| p.name == *name) {
                return Err(Error::UnknownParameter(name.clone()));
            }
        }

        let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
        for (k, v) in defaults.iter().chain(supplied) {
            merged.insert(k.as_str(), v.as_str());
        }

        let mut resolved: BTreeMap<&str, &str> = BTreeMap::new();
        for param in &specs {
            let value = merged
                .get(param.name.as_str())
                .copied()
                .or(param.default.as_deref());
            match value {
                Some(value) => {
                    param.check(value)?;
                    resolved.insert(param.name.as_str(), value);
                }
                None if param.required => {
                    return Err(Error::MissingParameter(param.name.clone()));
                }
                None => {}
            }
        }

        let mut path = Vec::new();
        for segment in self.root.segments().iter().chain(op.path.segments()) {
            match segment {
                Segment::Literal(v) => path.push(v.clone()),
                Segment::Param(name) => {
                    let value = resolved
                        .get(name.as_str())
                        .ok_or_else(|| Error::MissingParameter(name.clone()))?;
                    path.push(urlencoding::encode(value).into_owned());
                }
            }
        }

        let query: Vec<String> = specs
            .iter()
            .filter(|p| p.location == ParamLocation::Query)
            .filter_map(|p| {
                resolved.get(p.name.as_str()).map(|v| {
                    format!("{}={}", urlencoding::encode(&p.name), urlencoding::encode(v))
                })
            })
            .collect();

        let mut url = format!("{}/{}", self.base_url.trim_end_matches('/'), path.join("/"));
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }

        Ok(ResolvedRequest {
            method: op.method,
            url,
        })
    }
}
