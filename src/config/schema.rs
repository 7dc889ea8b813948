use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "headers": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            },
            "custom_user_agent": { "type": ["string", "null"] },
            "proxies": {
                "oneOf": [
                    { "type": "null" },
                    { "type": "string" },
                    {
                        "type": "object",
                        "properties": {
                            "http": { "type": "string" },
                            "https": { "type": "string" }
                        }
                    }
                ]
            },
            "rate_limit": { "type": "number", "exclusiveMinimum": 0 },
            "timeout": { "type": "number", "exclusiveMinimum": 0 },
            "retries": { "type": "integer", "minimum": 0 },
            "status_codes_to_log": {
                "type": "array",
                "items": { "type": "integer", "minimum": 100, "maximum": 599 }
            },
            "extensions": { "type": "array", "items": { "type": "string" } },
            "workers": { "type": "integer", "minimum": 1 },
            "backoff_base": { "type": "number", "minimum": 0 },
            "backoff_max": { "type": "number", "minimum": 0 },
            "time_threshold": { "type": "number", "minimum": 0 },
            "baseline_multiplier": { "type": "number", "minimum": 0 },
            "output_log_file": { "type": "string" },
            "output_json_file": { "type": "string" },
            "output_html_file": { "type": "string" },
            "resume_file": { "type": "string" },
            "vulnerabilities_file": { "type": "string" }
        }
    })
});
