//! Log-line renderer used by the binary.

use dashfeed_core::{Payload, Renderer, Resource};

/// Emits one `info` line per rendered resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryRenderer;

impl Renderer for SummaryRenderer {
    fn render(&self, resource: Resource, data: &Payload) {
        tracing::info!(resource = %resource, summary = %summarize(data), "resource updated");
    }
}

/// Short shape description: entry count for arrays, field names for objects.
pub fn summarize(data: &Payload) -> String {
    match data {
        Payload::Array(items) => format!("{} entries", items.len()),
        Payload::Object(fields) if fields.is_empty() => "{}".to_string(),
        Payload::Object(fields) => {
            let names: Vec<&str> = fields.keys().map(String::as_str).collect();
            format!("{{{}}}", names.join(", "))
        }
        Payload::Null => "empty".to_string(),
        scalar => scalar.to_string(),
    }
}
