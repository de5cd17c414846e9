use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

/// `{"success": true, "message": ..}` with the fields of an object payload
/// flattened in beside the message
pub fn success_envelope(message: &str, data: Option<Value>) -> Value {
    let mut envelope = Map::new();
    envelope.insert("success".into(), Value::Bool(true));
    envelope.insert("message".into(), Value::String(message.to_string()));
    match data {
        Some(Value::Object(fields)) => envelope.extend(fields),
        Some(Value::Null) | None => {}
        Some(other) => {
            envelope.insert("data".into(), other);
        }
    }
    Value::Object(envelope)
}

pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&success_envelope(message, data))?),
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

/// JSON errors go to stdout so scripts can parse them; text errors to stderr
pub fn output_error(output_format: OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let body = json!({ "success": false, "error": message });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => eprintln!("Error: {}", message),
    }
    Ok(())
}
