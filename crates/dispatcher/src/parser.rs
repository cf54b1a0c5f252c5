//! ParserRegistry - format tag → parser capability

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use contracts::{FormatTag, Notification, NotificationParser};
use tracing::{debug, warn};

use crate::error::DispatchError;

/// Parsers keyed by an explicit, caller-supplied format tag
///
/// The registry never inspects raw input to guess a format.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<FormatTag, Arc<dyn NotificationParser>>,
}

impl ParserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser, returning the one it replaced
    pub fn register(
        &mut self,
        tag: FormatTag,
        parser: impl NotificationParser + 'static,
    ) -> Option<Arc<dyn NotificationParser>> {
        debug!(format = %tag, "Parser registered");
        self.parsers.insert(tag, Arc::new(parser))
    }

    /// Builder-style registration
    pub fn with(mut self, tag: FormatTag, parser: impl NotificationParser + 'static) -> Self {
        self.register(tag, parser);
        self
    }

    /// Parse `raw` with the parser registered for `tag`
    ///
    /// # Errors
    /// - `UnknownFormat` if no parser is registered for `tag`
    /// - `Parse` if the parser rejects the input
    pub fn parse(&self, tag: &FormatTag, raw: &str) -> Result<Notification, DispatchError> {
        let parser = self
            .parsers
            .get(tag)
            .ok_or_else(|| DispatchError::UnknownFormat {
                format: tag.clone(),
            })?;

        parser.parse(raw).map_err(|e| {
            warn!(format = %tag, error = %e, "Parse failed");
            DispatchError::Parse(e)
        })
    }

    /// Whether a parser is registered for `tag`
    pub fn contains(&self, tag: &FormatTag) -> bool {
        self.parsers.contains_key(tag)
    }

    /// Registered format tags
    pub fn formats(&self) -> Vec<FormatTag> {
        self.parsers.keys().cloned().collect()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("formats", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;

    /// "name|kind|target|content"
    struct PipeParser;

    impl NotificationParser for PipeParser {
        fn parse(&self, raw: &str) -> Result<Notification, ContractError> {
            let fields: Vec<&str> = raw.split('|').collect();
            match fields.as_slice() {
                [name, kind, target, content] => {
                    Ok(Notification::new(*name, *kind, *target, *content))
                }
                _ => Err(ContractError::parse(
                    "pipe",
                    format!("expected 4 fields, got {}", fields.len()),
                )),
            }
        }
    }

    #[test]
    fn test_parse_with_registered_format() {
        let registry = ParserRegistry::new().with(FormatTag::Other("pipe".into()), PipeParser);
        let n = registry
            .parse(&FormatTag::Other("pipe".into()), "Ann|email|ann@x.io|hi")
            .unwrap();
        assert_eq!(n, Notification::new("Ann", "email", "ann@x.io", "hi"));
    }

    #[test]
    fn test_unknown_format() {
        let registry = ParserRegistry::new();
        let err = registry.parse(&FormatTag::Tabular, "a,b,c,d").unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnknownFormat {
                format: FormatTag::Tabular
            }
        ));
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let registry = ParserRegistry::new().with(FormatTag::Other("pipe".into()), PipeParser);
        let err = registry
            .parse(&FormatTag::Other("pipe".into()), "only|two")
            .unwrap_err();
        match err {
            DispatchError::Parse(inner) => assert!(inner.is_parse()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
