//! Automation rule handlers.
//!
//! Field requirements depend on the rule kind and are enforced here, at
//! the boundary, so stores and the evaluator can assume well-formed rules.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use homelink_core::{AutomationRule, Comparator, DeviceId, RelayAction, RuleId, RuleKind};

use super::ServerState;
use crate::error::{ApiError, HandlerResult};

/// Rule list response.
#[derive(Debug, Serialize)]
pub struct RuleListResponse {
    pub rules: Vec<AutomationRule>,
    pub count: usize,
}

/// Request body for creating or replacing a rule.
#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    /// Display name
    pub name: String,
    /// Relay commanded when the rule fires
    pub target_device: String,
    /// Trigger classification
    pub kind: RuleKind,
    /// Command to send on trigger
    pub action: RelayAction,
    /// Time of day (time rules)
    pub fire_time: Option<NaiveTime>,
    /// Sensor whose reading is compared (sensor rules)
    pub source_sensor: Option<String>,
    /// Reading field to compare (sensor rules)
    pub reading_field: Option<String>,
    /// Threshold comparator (sensor rules)
    pub comparator: Option<Comparator>,
    /// Threshold value (sensor rules)
    pub threshold: Option<f64>,
}

impl RuleRequest {
    /// Validate kind-specific fields and build the rule.
    fn into_rule(self, id: RuleId) -> HandlerResult<AutomationRule> {
        let target_device = DeviceId::from_string(&self.target_device).map_err(|_| {
            ApiError::BadRequest(format!("invalid target_device: {}", self.target_device))
        })?;

        let mut rule = match self.kind {
            RuleKind::Time => {
                let fire_time = self.fire_time.ok_or_else(|| {
                    ApiError::BadRequest("time rules require fire_time".to_string())
                })?;
                AutomationRule::time(self.name, target_device, fire_time, self.action)
            }
            RuleKind::Sensor => {
                let source = self.source_sensor.as_deref().ok_or_else(|| {
                    ApiError::BadRequest("sensor rules require source_sensor".to_string())
                })?;
                let source = DeviceId::from_string(source).map_err(|_| {
                    ApiError::BadRequest(format!("invalid source_sensor: {source}"))
                })?;
                let field = self.reading_field.ok_or_else(|| {
                    ApiError::BadRequest("sensor rules require reading_field".to_string())
                })?;
                let comparator = self.comparator.ok_or_else(|| {
                    ApiError::BadRequest("sensor rules require comparator".to_string())
                })?;
                let threshold = self.threshold.ok_or_else(|| {
                    ApiError::BadRequest("sensor rules require threshold".to_string())
                })?;
                AutomationRule::sensor(
                    self.name,
                    target_device,
                    source,
                    field,
                    comparator,
                    threshold,
                    self.action,
                )
            }
        };
        rule.id = id;
        Ok(rule)
    }
}

fn parse_rule_id(raw: &str) -> HandlerResult<RuleId> {
    RuleId::from_string(raw).map_err(|_| ApiError::BadRequest(format!("invalid rule id: {raw}")))
}

/// List all rules.
pub async fn list_rules_handler(
    State(state): State<ServerState>,
) -> HandlerResult<Json<RuleListResponse>> {
    let rules = state.rules.list().await?;
    let count = rules.len();
    Ok(Json(RuleListResponse { rules, count }))
}

/// Create a rule. The target device must exist.
pub async fn create_rule_handler(
    State(state): State<ServerState>,
    Json(req): Json<RuleRequest>,
) -> HandlerResult<(StatusCode, Json<AutomationRule>)> {
    let rule = req.into_rule(RuleId::new())?;
    state.devices.get(rule.target_device).await?;
    state.rules.insert(rule.clone()).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Fetch one rule.
pub async fn get_rule_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> HandlerResult<Json<AutomationRule>> {
    let id = parse_rule_id(&id)?;
    Ok(Json(state.rules.get(id).await?))
}

/// Replace a rule. The id in the path wins; the body carries the fields.
pub async fn update_rule_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<RuleRequest>,
) -> HandlerResult<Json<AutomationRule>> {
    let id = parse_rule_id(&id)?;
    // Fail with 404 before validating the body against the wrong rule.
    state.rules.get(id).await?;
    let rule = req.into_rule(id)?;
    state.devices.get(rule.target_device).await?;
    state.rules.update(rule.clone()).await?;
    Ok(Json(rule))
}

/// Delete a rule.
pub async fn delete_rule_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    let id = parse_rule_id(&id)?;
    state.rules.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
