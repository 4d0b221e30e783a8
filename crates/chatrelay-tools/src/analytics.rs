//! Mock analytics lookup.
//!
//! Serves a fixed in-memory dataset keyed by app name. Stateless and
//! side-effect-free; exists so the agent variant has a real tool-call round
//! trip without any external service.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::Tool;

/// Per-app usage snapshot returned by the lookup.
struct AppStats {
    name: &'static str,
    daily_active_users: u32,
    sessions: u32,
    crash_free_rate: f64,
}

const DATASET: &[AppStats] = &[
    AppStats { name: "Foo", daily_active_users: 12_450, sessions: 48_211, crash_free_rate: 99.2 },
    AppStats { name: "Bar", daily_active_users: 3_801, sessions: 9_874, crash_free_rate: 97.5 },
    AppStats { name: "Baz", daily_active_users: 621, sessions: 1_302, crash_free_rate: 99.9 },
];

pub struct FetchAnalyticsData;

impl FetchAnalyticsData {
    pub fn new() -> Self {
        Self
    }

    fn lookup(app_name: &str) -> Option<&'static AppStats> {
        DATASET
            .iter()
            .find(|stats| stats.name.eq_ignore_ascii_case(app_name))
    }
}

impl Default for FetchAnalyticsData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchAnalyticsData {
    fn name(&self) -> &str {
        "fetch_analytics_data"
    }

    fn description(&self) -> &str {
        "Fetch usage analytics (daily active users, sessions, crash-free rate) for a tracked app by name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "app_name": {
                    "type": "string",
                    "description": "Name of the app to look up, e.g. \"Foo\"",
                }
            },
            "required": ["app_name"],
        })
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        // The model sends JSON arguments; a bare app name is accepted too.
        let app_name = serde_json::from_str::<serde_json::Value>(input)
            .ok()
            .and_then(|v| v["app_name"].as_str().map(str::to_string))
            .unwrap_or_else(|| input.trim().trim_matches('"').to_string());
        debug!(%app_name, "Analytics lookup");

        match Self::lookup(&app_name) {
            Some(stats) => Ok(format!(
                "Analytics for {}: {} daily active users, {} sessions this week, {:.1}% crash-free rate.",
                stats.name, stats.daily_active_users, stats.sessions, stats.crash_free_rate
            )),
            None => Ok(format!("No analytics data tracked for app \"{app_name}\".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_app_json_arguments() {
        let tool = FetchAnalyticsData::new();
        let out = tool.invoke(r#"{"app_name": "Foo"}"#).await.unwrap();
        assert!(out.contains("Analytics for Foo"));
        assert!(out.contains("12450 daily active users"));
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let tool = FetchAnalyticsData::new();
        let out = tool.invoke(r#"{"app_name": "foo"}"#).await.unwrap();
        assert!(out.contains("Analytics for Foo"));
    }

    #[tokio::test]
    async fn test_unknown_app_is_not_an_error() {
        let tool = FetchAnalyticsData::new();
        let out = tool.invoke(r#"{"app_name": "Quux"}"#).await.unwrap();
        assert!(out.contains("No analytics data"));
    }

    #[tokio::test]
    async fn test_bare_name_input() {
        let tool = FetchAnalyticsData::new();
        let out = tool.invoke("Bar").await.unwrap();
        assert!(out.contains("Analytics for Bar"));
    }
}
