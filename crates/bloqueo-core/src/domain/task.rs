//! Task record and the creation request it is built from.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::BloqueoError;
use super::ids::{Tid, Vdom};
use super::state::TaskStatus;

/// Application tag stamped on every task record.
pub const APP_NAME: &str = "tsmx-bloqueo-forti";

/// Render a UTC instant the way task records store it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// One block/unblock request tracked through its lifecycle.
///
/// Design:
/// - `tid` is unique within its domain collection
/// - `updated_at` stays empty until the first status transition
/// - `current_tid` / `cliente` are only ever present on legacy records and
///   feed the fallback lookup in [`crate::store::TaskStore::get`]
/// - unknown fields survive a load/save cycle through `extra`
/// - `service` / `obj` / `gdr` / `ticket` / `action` are opaque JSON values,
///   stored exactly as the client sent them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default = "default_app")]
    pub app: String,
    pub tid: Tid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_tids: Option<Vec<Tid>>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub vdom: Vdom,
    #[serde(default)]
    pub service: Value,
    #[serde(default)]
    pub obj: Value,
    #[serde(default)]
    pub gdr: Value,
    #[serde(default)]
    pub ticket: Value,
    #[serde(default)]
    pub action: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cliente: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_app() -> String {
    APP_NAME.to_string()
}

impl Task {
    /// A fresh `pending` task for a validated request.
    pub fn pending(tid: Tid, request: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            app: default_app(),
            tid,
            historical_tids: None,
            status: TaskStatus::Pending,
            created_at: format_timestamp(now),
            updated_at: String::new(),
            vdom: request.vdom,
            service: request.service,
            obj: request.obj,
            gdr: request.gdr,
            ticket: request.ticket,
            action: request.action,
            current_tid: None,
            cliente: None,
            extra: Map::new(),
        }
    }

    /// Exact match on `tid` or on any of `historical_tids`.
    pub fn answers_to(&self, tid: &Tid) -> bool {
        self.tid == *tid
            || self
                .historical_tids
                .as_ref()
                .is_some_and(|history| history.contains(tid))
    }

    /// Overwrite the status and stamp `updated_at`.
    pub fn transition(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = format_timestamp(now);
    }

    pub fn status_view(&self) -> TaskStatusView {
        TaskStatusView {
            tid: self.tid.clone(),
            status: self.status,
        }
    }
}

/// `{tid, status}` projection returned by status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub tid: Tid,
    pub status: TaskStatus,
}

/// Raw creation request; every field is required.
///
/// Fields are arbitrary JSON: a numeric `ticket` is as valid as a string one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub service: Option<Value>,
    pub vdom: Option<Value>,
    pub obj: Option<Value>,
    pub gdr: Option<Value>,
    pub ticket: Option<Value>,
    pub action: Option<Value>,
}

/// A creation request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub vdom: Vdom,
    pub service: Value,
    pub obj: Value,
    pub gdr: Value,
    pub ticket: Value,
    pub action: Value,
}

/// `null`, `false`, `0`, `""`, `[]` and `{}` count as absent.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

impl CreateTaskRequest {
    /// Reject the request if any field is absent or blank, then validate the vdom.
    pub fn validate(self) -> Result<NewTask, BloqueoError> {
        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: Option<Value>| match value {
            Some(value) if !is_blank(&value) => value,
            _ => {
                missing.push(name);
                Value::Null
            }
        };
        let service = take("service", self.service);
        let vdom = take("vdom", self.vdom);
        let obj = take("obj", self.obj);
        let gdr = take("gdr", self.gdr);
        let ticket = take("ticket", self.ticket);
        let action = take("action", self.action);

        if !missing.is_empty() {
            return Err(BloqueoError::MissingFields(missing));
        }

        let vdom = match vdom {
            Value::String(name) => Vdom::parse(name)?,
            Value::Number(n) => Vdom::parse(n.to_string())?,
            other => {
                return Err(BloqueoError::Validation(format!(
                    "vdom must be a string, got {other}"
                )));
            }
        };

        Ok(NewTask {
            vdom,
            service,
            obj,
            gdr,
            ticket,
            action,
        })
    }
}
