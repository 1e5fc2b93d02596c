//! Calculator tool definition.
//!
//! Basic arithmetic: add, subtract, multiply, divide, power and square root.
//! Arithmetic failures (division by zero, negative square roots) are domain
//! errors and come back to the client as tool output.

use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{CallToolResult, Content, JsonObject};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domains::tools::contract::InputContract;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolContext, ToolHandler};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Arithmetic operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Sqrt,
}

impl Operation {
    fn noun(self) -> &'static str {
        match self {
            Self::Add => "addition",
            Self::Subtract => "subtraction",
            Self::Multiply => "multiplication",
            Self::Divide => "division",
            Self::Power => "power operation",
            Self::Sqrt => "square root",
        }
    }
}

/// Parameters for the calculator tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CalculatorParams {
    #[schemars(description = "Arithmetic operation to perform")]
    pub operation: Operation,
    #[schemars(description = "First operand")]
    pub a: f64,
    #[schemars(description = "Second operand (required for every operation except sqrt)")]
    #[serde(default)]
    pub b: Option<f64>,
}

/// A finished calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub expression: String,
    pub result: f64,
}

impl Calculation {
    /// Text returned to the client.
    pub fn summary(&self) -> String {
        format!("Calculation result: {} = {}", self.expression, self.result)
    }
}

/// Evaluate one operation.
pub fn evaluate(params: &CalculatorParams) -> Result<Calculation, ToolError> {
    let a = params.a;
    let operand = || {
        params.b.ok_or_else(|| {
            ToolError::execution_failed(format!(
                "Second number 'b' is required for {}",
                params.operation.noun()
            ))
        })
    };

    let (expression, result) = match params.operation {
        Operation::Add => {
            let b = operand()?;
            (format!("{a} + {b}"), a + b)
        }
        Operation::Subtract => {
            let b = operand()?;
            (format!("{a} - {b}"), a - b)
        }
        Operation::Multiply => {
            let b = operand()?;
            (format!("{a} × {b}"), a * b)
        }
        Operation::Divide => {
            let b = operand()?;
            if b == 0.0 {
                return Err(ToolError::execution_failed("Division by zero is not allowed"));
            }
            (format!("{a} ÷ {b}"), a / b)
        }
        Operation::Power => {
            let b = operand()?;
            (format!("{a} ^ {b}"), a.powf(b))
        }
        Operation::Sqrt => {
            if a < 0.0 {
                return Err(ToolError::execution_failed(
                    "Cannot calculate square root of negative number",
                ));
            }
            (format!("√{a}"), a.sqrt())
        }
    };

    if !result.is_finite() {
        return Err(ToolError::execution_failed(format!(
            "Result of {expression} is not a finite number"
        )));
    }

    Ok(Calculation { expression, result })
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Calculator tool.
pub struct CalculatorTool {
    schema: Arc<JsonObject>,
    contract: InputContract,
}

impl CalculatorTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "calculator";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Perform basic arithmetic operations: add, subtract, multiply, divide, power, and square root";

    pub fn new() -> Self {
        let schema = cached_schema_for_type::<CalculatorParams>();
        let contract = InputContract::from_schema(&schema);
        Self { schema, contract }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ToolHandler for CalculatorTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn input_schema(&self) -> Arc<JsonObject> {
        self.schema.clone()
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    #[instrument(skip_all, fields(session_id = ?context.session_id))]
    async fn invoke(
        &self,
        arguments: Map<String, Value>,
        context: &ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let params: CalculatorParams = serde_json::from_value(Value::Object(arguments))
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        debug!(?params, "Calculator tool called");

        let calculation = evaluate(&params)?;
        info!(
            expression = %calculation.expression,
            result = calculation.result,
            "Calculator operation completed"
        );

        Ok(CallToolResult::success(vec![Content::text(calculation.summary())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::contract::FieldKind;
    use rmcp::model::RawContent;
    use serde_json::json;

    fn params(operation: Operation, a: f64, b: Option<f64>) -> CalculatorParams {
        CalculatorParams { operation, a, b }
    }

    fn text_of(result: &CallToolResult) -> String {
        match &result.content[0].raw {
            RawContent::Text(text) => text.text.clone(),
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[test]
    fn test_add_formats_integers() {
        let calc = evaluate(&params(Operation::Add, 2.0, Some(3.0))).unwrap();
        assert_eq!(calc.summary(), "Calculation result: 2 + 3 = 5");
    }

    #[test]
    fn test_divide_by_zero() {
        let err = evaluate(&params(Operation::Divide, 10.0, Some(0.0))).unwrap_err();
        assert_eq!(err.to_string(), "Division by zero is not allowed");
    }

    #[test]
    fn test_fractional_division() {
        let calc = evaluate(&params(Operation::Divide, 10.0, Some(4.0))).unwrap();
        assert_eq!(calc.expression, "10 ÷ 4");
        assert_eq!(calc.result, 2.5);
    }

    #[test]
    fn test_sqrt_ignores_b() {
        let calc = evaluate(&params(Operation::Sqrt, 16.0, None)).unwrap();
        assert_eq!(calc.summary(), "Calculation result: √16 = 4");
    }

    #[test]
    fn test_sqrt_negative() {
        assert!(evaluate(&params(Operation::Sqrt, -1.0, None)).is_err());
    }

    #[test]
    fn test_missing_b_names_operation() {
        let err = evaluate(&params(Operation::Power, 2.0, None)).unwrap_err();
        assert_eq!(err.to_string(), "Second number 'b' is required for power operation");
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert!(evaluate(&params(Operation::Power, 10.0, Some(400.0))).is_err());
    }

    #[test]
    fn test_schema_advertises_operations() {
        let tool = CalculatorTool::new();
        let schema = tool.input_schema();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["operation", "a"]));
        assert_eq!(
            tool.contract().fields()[2].kind,
            FieldKind::Enum(
                ["add", "subtract", "multiply", "divide", "power", "sqrt"]
                    .map(String::from)
                    .to_vec()
            )
        );
    }

    #[tokio::test]
    async fn test_invoke_returns_text_content() {
        let tool = CalculatorTool::new();
        let args = json!({"operation": "multiply", "a": 6, "b": 7});
        let result = tool
            .invoke(args.as_object().cloned().unwrap(), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(text_of(&result), "Calculation result: 6 × 7 = 42");
    }
}
