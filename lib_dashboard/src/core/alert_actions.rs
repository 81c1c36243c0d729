//! # Alert Actions
//!
//! Mutating calls against a single alert. A successful call schedules exactly
//! one resync through the controller so the change shows up everywhere; a
//! failed call is logged, returned, and schedules nothing.

use serde_json::json;

use crate::core::controller::ControllerHandle;
use crate::dashboard::query::QueryBuilder;
use crate::error::DashboardResult;
use crate::retrieve::api::DashboardApi;

#[derive(Debug, Clone)]
pub struct AlertActionCoordinator<A> {
    api: A,
    query: QueryBuilder,
    controller: ControllerHandle,
}

impl<A: DashboardApi> AlertActionCoordinator<A> {
    pub fn new(api: A, query: QueryBuilder, controller: ControllerHandle) -> Self {
        Self { api, query, controller }
    }

    /// `POST api/alerts/{id}/ack`.
    pub async fn acknowledge(&self, alert_id: i64) -> DashboardResult<()> {
        let path = format!("api/alerts/{}/ack", alert_id);
        self.mutate(&path, None, "acknowledge", alert_id).await
    }

    /// `POST api/alerts/{id}/note` with `{"note": ...}`.
    pub async fn add_note(&self, alert_id: i64, note: &str) -> DashboardResult<()> {
        let path = format!("api/alerts/{}/note", alert_id);
        self.mutate(&path, Some(json!({ "note": note })), "annotate", alert_id)
            .await
    }

    async fn mutate(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
        action: &str,
        alert_id: i64,
    ) -> DashboardResult<()> {
        match self.api.post(path, &self.query.token_only(), body).await {
            Ok(()) => {
                log::info!("Alert {}: {} succeeded, resyncing", alert_id, action);
                if !self.controller.resync() {
                    log::warn!("Controller is gone; resync after {} dropped", action);
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Alert {}: {} failed: {}", alert_id, action, e);
                Err(e)
            }
        }
    }
}
