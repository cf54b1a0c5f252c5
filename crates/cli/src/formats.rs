//! Caller-owned record parsers and the parsing transform.
//!
//! Format knowledge lives here, outside the pipeline and dispatcher.

use contracts::{ContractError, FormatTag, Item, Notification, NotificationParser, Transform};
use dispatcher::ParserRegistry;

/// One JSON object per record:
/// `{"name": "...", "kind": "...", "target_id": "...", "content": "..."}`
pub struct StructuredParser;

impl NotificationParser for StructuredParser {
    fn parse(&self, raw: &str) -> Result<Notification, ContractError> {
        let notification: Notification = serde_json::from_str(raw)
            .map_err(|e| ContractError::parse(FormatTag::Structured.as_str(), e.to_string()))?;
        require_kind(FormatTag::Structured, notification)
    }
}

/// Comma separated `name,kind,target_id,content`; the content may itself
/// contain commas.
pub struct TabularParser;

impl NotificationParser for TabularParser {
    fn parse(&self, raw: &str) -> Result<Notification, ContractError> {
        let fields: Vec<&str> = raw.splitn(4, ',').map(str::trim).collect();
        let [name, kind, target_id, content] = fields.as_slice() else {
            return Err(ContractError::parse(
                FormatTag::Tabular.as_str(),
                format!("expected 4 fields, got {}", fields.len()),
            ));
        };
        require_kind(
            FormatTag::Tabular,
            Notification::new(*name, *kind, *target_id, *content),
        )
    }
}

fn require_kind(format: FormatTag, notification: Notification) -> Result<Notification, ContractError> {
    if notification.kind.is_empty() {
        return Err(ContractError::parse(format.as_str(), "missing kind"));
    }
    Ok(notification)
}

/// Registry with every built-in format
pub fn parser_registry() -> ParserRegistry {
    ParserRegistry::new()
        .with(FormatTag::Structured, StructuredParser)
        .with(FormatTag::Tabular, TabularParser)
}

/// Worker transform: raw record → notification
///
/// A parse failure becomes the item's `ItemError`; it never stops the batch.
pub struct ParseTransform {
    parsers: ParserRegistry,
    format: FormatTag,
}

impl ParseTransform {
    pub fn new(parsers: ParserRegistry, format: FormatTag) -> Self {
        Self { parsers, format }
    }
}

impl Transform<String, Notification> for ParseTransform {
    async fn apply(&self, item: Item) -> Result<Notification, String> {
        self.parsers
            .parse(&self.format, &item.payload)
            .map_err(|e| e.to_string())
    }
}
