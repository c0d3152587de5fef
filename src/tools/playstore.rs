//! `get-playstore-rating` tool backed by a [`RatingLookup`]

use crate::lookup::RatingLookup;
use crate::observability::metrics;
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const TOOL_NAME: &str = "get-playstore-rating";

/// Parameters the model supplies when calling the tool
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingToolInput {
    /// Name of the app to search for
    pub app_name: String,
}

impl RatingToolInput {
    /// JSON Schema advertised to the model
    pub fn json_schema() -> Value {
        let schema = schemars::schema_for!(RatingToolInput);
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("$schema");
            map.remove("title");
        }
        value
    }
}

/// Fetches current ratings and store information for an app
pub struct PlayStoreRatingTool {
    lookup: Arc<dyn RatingLookup>,
}

impl PlayStoreRatingTool {
    pub fn new(lookup: Arc<dyn RatingLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Tool for PlayStoreRatingTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: TOOL_NAME.to_string(),
            description: "Get current ratings and information for an app from Google Play Store"
                .to_string(),
            parameters: RatingToolInput::json_schema(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: RatingToolInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::ValidationError(e.to_string()))?;

        metrics::metrics().tool_call();
        debug!(app_name = %input.app_name, "Looking up app rating");

        let record = self.lookup.lookup(&input.app_name).await.map_err(|e| {
            warn!(app_name = %input.app_name, error = %e, "Rating lookup failed");
            ToolError::ExecutionError(e.to_string())
        })?;

        serde_json::to_value(record).map_err(|e| ToolError::ExecutionError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{sample_record, MockRatingLookup};
    use crate::tools::ToolSystem;
    use serde_json::json;

    #[test]
    fn test_schema_requires_app_name() {
        let schema = RatingToolInput::json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["appName"]));
        assert!(schema["properties"]["appName"].is_object());
        assert!(schema.get("$schema").is_none());
    }

    #[tokio::test]
    async fn test_execute_returns_record_json() {
        let lookup = MockRatingLookup::new().with_app("Spotify", sample_record("com.spotify.music"));
        let tool = PlayStoreRatingTool::new(Arc::new(lookup));

        let result = tool.execute(&json!({"appName": "Spotify"})).await.unwrap();
        assert_eq!(result["appId"], "com.spotify.music");
        assert_eq!(result["price"], "Free");
    }

    #[tokio::test]
    async fn test_execute_surfaces_lookup_failure() {
        let tool = PlayStoreRatingTool::new(Arc::new(MockRatingLookup::new()));

        let err = tool.execute(&json!({"appName": "Ghost"})).await.unwrap_err();
        match err {
            ToolError::ExecutionError(message) => {
                assert!(message.starts_with("Failed to fetch app details:"));
                assert!(message.contains("No app found with name: Ghost"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tool_system_rejects_missing_app_name() {
        let mut tools = ToolSystem::new();
        tools
            .register(
                Box::new(PlayStoreRatingTool::new(Arc::new(MockRatingLookup::new()))),
                None,
            )
            .await
            .unwrap();

        let result = tools.execute_tool(TOOL_NAME, &json!({"name": "x"})).await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));
    }
}
