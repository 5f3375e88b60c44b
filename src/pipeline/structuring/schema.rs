use std::sync::LazyLock;

use serde_json::{json, Value};

/// Output schema the extraction service is constrained to.
///
/// Every field that cannot be filled confidently is the literal `"NA"`.
static REPORT_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "object",
        "properties": {
            "tests": {
                "type": "array",
                "description": "Normalized medical test results",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Test name (required)"
                        },
                        "value": {
                            "oneOf": [
                                { "type": "number", "description": "Numeric test value" },
                                { "type": "string", "enum": ["NA"], "description": "Missing or unreadable value" }
                            ]
                        },
                        "unit": {
                            "oneOf": [
                                { "type": "string", "description": "Unit of measurement" },
                                { "type": "string", "enum": ["NA"], "description": "Missing or invalid unit" }
                            ]
                        },
                        "status": {
                            "oneOf": [
                                { "type": "string", "enum": ["low", "high", "normal"] },
                                { "type": "string", "enum": ["NA"], "description": "Missing or undetermined status" }
                            ]
                        },
                        "ref_range": {
                            "oneOf": [
                                {
                                    "type": "object",
                                    "properties": {
                                        "low": { "type": "number" },
                                        "high": { "type": "number" }
                                    },
                                    "required": ["low", "high"]
                                },
                                { "type": "string", "enum": ["NA"], "description": "Missing or unavailable reference range" }
                            ]
                        }
                    },
                    "required": ["name", "value", "unit", "status", "ref_range"]
                }
            },
            "summary": {
                "type": "string",
                "description": "Patient-friendly summary of extracted tests"
            },
            "status": {
                "type": "string",
                "enum": ["ok", "unprocessed"],
                "description": "Processing status"
            },
            "reason": {
                "type": "string",
                "description": "Why the report could not be processed (only when status is unprocessed)"
            }
        },
        "required": ["tests", "summary", "status"]
    })
});

pub fn report_schema() -> &'static Value {
    &REPORT_SCHEMA
}
