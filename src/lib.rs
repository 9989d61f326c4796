//! Client for the FantasyData NFL web service.
//!
//! Operations are described declaratively in an [`EndpointCatalog`]; a
//! [`RequestBuilder`] turns an operation and its parameters into a URL of the
//! form `{base}/{subscription}/json/{operation...}?key={api key}`, and
//! [`ServiceClient`] sends it and wraps the decoded body in a
//! [`ResultCollection`].

pub mod catalog;
pub mod client;
pub mod error;
pub mod params;
pub mod result;
pub mod subscription;
pub mod transport;

pub use catalog::{
    EndpointCatalog, Method, OperationSpec, ParamLocation, ParamSpec, ParamType, PathTemplate,
    ResponseShape, Segment,
};
pub use client::{Operation, ServiceClient};
pub use error::{BoxError, Error, Result};
pub use params::{Params, RequestBuilder, ResolvedRequest};
pub use result::{EntryKey, ResultCollection};
pub use subscription::Subscription;
pub use transport::{HttpResponse, HttpTransport, Transport};
