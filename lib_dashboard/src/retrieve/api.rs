//! # Dashboard API Seam
//!
//! The engine talks to the collaborator REST API only through
//! [`DashboardApi`]. The HTTP client in `ky_http` is the production
//! implementation; tests plug in an in-memory one.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::dashboard::query::ParameterSet;
use crate::error::DashboardResult;

/// Transport capability for the dashboard REST API.
///
/// Paths are relative to the API base (`api/stats`, `api/alerts/7/ack`).
/// Any non-2xx status must surface as an error.
pub trait DashboardApi: Send + Sync + 'static {
    /// `GET path?params`, returning the decoded JSON body.
    fn get_json(&self, path: &str, params: &ParameterSet) -> impl Future<Output = DashboardResult<Value>> + Send;

    /// `POST path?params` with an optional JSON body. The response body is ignored.
    fn post(&self, path: &str, params: &ParameterSet, body: Option<Value>)
        -> impl Future<Output = DashboardResult<()>> + Send;
}

impl<A: DashboardApi> DashboardApi for Arc<A> {
    fn get_json(&self, path: &str, params: &ParameterSet) -> impl Future<Output = DashboardResult<Value>> + Send {
        (**self).get_json(path, params)
    }

    fn post(
        &self,
        path: &str,
        params: &ParameterSet,
        body: Option<Value>,
    ) -> impl Future<Output = DashboardResult<()>> + Send {
        (**self).post(path, params, body)
    }
}
