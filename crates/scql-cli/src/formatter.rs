//! Output formatting for command/response exchanges.
//!
//! Supports text, hex and JSON output formats.

use serde_json::{json, Value as JsonValue};

use scql_apdu::ResponseApdu;
use scql_engine::codec;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable lines with decoded rows.
    Text,
    /// Raw response bytes in hex.
    Hex,
    /// One JSON object per exchange.
    Json,
}

impl OutputFormat {
    /// Parses a format name as written in the configuration file.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "hex" => Some(Self::Hex),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Formats one exchange according to the specified format.
///
/// `command` is the hex text of the command APDU; it is echoed by the text
/// format only when `echo` is set.
pub fn format_exchange(
    command: &str,
    response: &ResponseApdu,
    format: OutputFormat,
    echo: bool,
) -> String {
    match format {
        OutputFormat::Text => format_text(command, response, echo),
        OutputFormat::Hex => hex::encode_upper(response.to_bytes()),
        OutputFormat::Json => format_json(command, response),
    }
}

fn format_text(command: &str, response: &ResponseApdu, echo: bool) -> String {
    let mut output = String::new();
    if echo {
        output.push_str("> ");
        output.push_str(command);
        output.push('\n');
    }

    output.push_str(&format!(
        "< {} {}",
        response.status,
        response.status.description()
    ));
    if !response.data.is_empty() {
        match decode_row(&response.data) {
            Some(values) => {
                let cells: Vec<String> = values.iter().map(|v| display_value(v)).collect();
                output.push_str(&format!(" [{}]", cells.join(", ")));
            }
            None => output.push_str(&format!(" data={}", hex::encode_upper(&response.data))),
        }
    }
    output
}

fn format_json(command: &str, response: &ResponseApdu) -> String {
    let mut obj = serde_json::Map::new();
    obj.insert("command".to_string(), json!(command));
    obj.insert("status".to_string(), json!(response.status.to_string()));
    obj.insert(
        "description".to_string(),
        json!(response.status.description()),
    );
    if !response.data.is_empty() {
        obj.insert(
            "data".to_string(),
            json!(hex::encode_upper(&response.data)),
        );
        if let Some(values) = decode_row(&response.data) {
            let row: Vec<JsonValue> = values.iter().map(|v| value_to_json(v)).collect();
            obj.insert("row".to_string(), JsonValue::Array(row));
        }
    }
    JsonValue::Object(obj).to_string()
}

/// Decodes fetch response data (`column count || encoded row`).
fn decode_row(data: &[u8]) -> Option<Vec<&[u8]>> {
    let (&count, row) = data.split_first()?;
    let values = codec::columns(row).collect::<Result<Vec<_>, _>>().ok()?;
    (values.len() == usize::from(count)).then_some(values)
}

/// Renders a value as text, or as `0x..` when it is not printable.
fn display_value(value: &[u8]) -> String {
    match std::str::from_utf8(value) {
        Ok(text) if !text.chars().any(char::is_control) => format!("{text:?}"),
        _ => format!("0x{}", hex::encode_upper(value)),
    }
}

fn value_to_json(value: &[u8]) -> JsonValue {
    match std::str::from_utf8(value) {
        Ok(text) => json!(text),
        Err(_) => json!({ "hex": hex::encode_upper(value) }),
    }
}
