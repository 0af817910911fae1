//! The fixed set of locally executed tools. Dispatch is infallible at the
//! transport level: every outcome, including unknown functions and malformed
//! arguments, is folded into a tool-role message so the backend can inspect
//! the failure and recover conversationally.

mod calc;

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Map, Value};

use crate::errors::ToolError;
use crate::knowledge::KnowledgeBase;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};

pub struct ToolRegistry {
    knowledge: Arc<KnowledgeBase>,
}

impl ToolRegistry {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    /// Declarations for the built-in handlers, as offered to backends and on
    /// the service descriptor.
    pub fn declarations(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "get_weather",
                "Get weather information for a location",
                json!({
                    "type": "object",
                    "properties": {
                        "location": {"type": "string"},
                        "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
                    },
                    "required": ["location"]
                }),
            ),
            Tool::new(
                "search_company_info",
                "Search company information in the knowledge base",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"}
                    },
                    "required": ["query"]
                }),
            ),
            Tool::new(
                "calculate",
                "Perform mathematical calculations",
                json!({
                    "type": "object",
                    "properties": {
                        "expression": {"type": "string"}
                    },
                    "required": ["expression"]
                }),
            ),
        ]
    }

    /// Execute one requested call and wrap the outcome in a tool-role
    /// message. Never errors; failures are encoded inside the content.
    pub async fn dispatch(&self, call: &ToolCall) -> Message {
        let payload = match self.invoke(call).await {
            Ok(value) => value,
            Err(err) => json!({"error": err.to_string(), "success": false}),
        };
        Message::tool(&call.id, &call.function.name, payload.to_string())
    }

    /// Execute a round of calls, preserving backend order in the results.
    pub async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<Message> {
        join_all(calls.iter().map(|call| self.dispatch(call))).await
    }

    async fn invoke(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let args = call.function.parsed_arguments()?;
        match call.function.name.as_str() {
            "get_weather" => self.get_weather(&args).await,
            "search_company_info" => self.search_company_info(&args).await,
            "calculate" => self.calculate(&args).await,
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }

    async fn get_weather(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let location = required_str(args, "location")?;
        let unit = args
            .get("unit")
            .and_then(Value::as_str)
            .unwrap_or("celsius");

        let key = location.to_lowercase().replace(' ', "_").replace(',', "");
        let Some(record) = self.knowledge.weather(&key) else {
            return Ok(json!({
                "location": location,
                "error": "Weather data not available for this location",
                "available_locations": self.knowledge.weather_keys(),
            }));
        };

        let (temp, symbol) = if unit.eq_ignore_ascii_case("fahrenheit") {
            ((f64::from(record.temp) * 9.0 / 5.0 + 32.0).round() as i64, "°F")
        } else {
            (i64::from(record.temp), "°C")
        };

        Ok(json!({
            "location": location,
            "temperature": format!("{temp}{symbol}"),
            "condition": record.condition,
            "humidity": format!("{}%", record.humidity),
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }

    async fn search_company_info(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let query = required_str(args, "query")?;
        Ok(json!({
            "query": query,
            "information": self.knowledge.lookup(query),
            "source": "Company Knowledge Base",
        }))
    }

    async fn calculate(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let expression = required_str(args, "expression")?;

        // Character whitelist as a first gate, then a real arithmetic parser.
        let sanitized: String = expression
            .chars()
            .filter(|c| c.is_ascii_digit() || "+-*/.() ".contains(*c))
            .collect();

        Ok(match calc::evaluate(&sanitized) {
            Ok(result) => json!({
                "expression": expression,
                "result": number_value(result),
                "success": true,
            }),
            Err(err) => json!({
                "expression": expression,
                "error": err,
                "success": false,
            }),
        })
    }
}

/// Integral results serialize as JSON integers so `25 * 4 + 10` comes back
/// as `110`, not `110.0`.
fn number_value(result: f64) -> Value {
    if result.is_finite() && result.fract() == 0.0 && result.abs() < 9.0e15 {
        json!(result as i64)
    } else {
        json!(result)
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing required parameter `{key}`")))
}
