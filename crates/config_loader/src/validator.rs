//! 配置校验模块
//!
//! 校验规则：
//! - 字段规则 (`validator` derive): worker_count >= 1, queue_capacity >= 1,
//!   route kind 非空
//! - route kind 唯一且不含首尾空白

use std::collections::HashSet;

use contracts::{ContractError, RelayConfig};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 RelayConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| first_violation("", &errors))?;
    validate_route_kinds(config)?;
    Ok(())
}

/// 校验 route kind 唯一性
fn validate_route_kinds(config: &RelayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, route) in config.routes.iter().enumerate() {
        if route.kind.trim() != route.kind || route.kind.is_empty() {
            return Err(ContractError::config_validation(
                format!("routes[{idx}].kind"),
                format!("kind '{}' must be non-empty without surrounding whitespace", route.kind),
            ));
        }
        if !seen.insert(route.kind.as_str()) {
            return Err(ContractError::config_validation(
                format!("routes[kind={}]", route.kind),
                "duplicate route kind",
            ));
        }
    }
    Ok(())
}

/// 将 validator 的嵌套错误转为第一条 `ConfigValidation`
fn first_violation(prefix: &str, errors: &ValidationErrors) -> ContractError {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(violations) => {
                if let Some(violation) = violations.first() {
                    let message = match &violation.message {
                        Some(message) => message.to_string(),
                        None => format!("failed '{}' check", violation.code),
                    };
                    return ContractError::config_validation(path, message);
                }
            }
            ValidationErrorsKind::Struct(nested) => return first_violation(&path, nested),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, nested)) = items.iter().next() {
                    return first_violation(&format!("{path}[{idx}]"), nested);
                }
            }
        }
    }

    ContractError::config_validation(prefix, errors.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{PipelineConfig, RouteConfig, SenderType};
    use std::collections::HashMap;

    fn route(kind: &str) -> RouteConfig {
        RouteConfig {
            kind: kind.into(),
            sender: SenderType::Log,
            params: HashMap::new(),
        }
    }

    fn minimal_config() -> RelayConfig {
        RelayConfig {
            routes: vec![route("email"), route("telegram")],
            ..Default::default()
        }
    }

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zero_workers() {
        let mut config = minimal_config();
        config.pipeline = PipelineConfig::with_workers(0);
        let err = validate(&config).unwrap_err();
        assert_eq!(field_of(err), "pipeline.worker_count");
    }

    #[test]
    fn test_zero_capacity() {
        let mut config = minimal_config();
        config.pipeline.queue_capacity = 0;
        let err = validate(&config).unwrap_err();
        assert_eq!(field_of(err), "pipeline.queue_capacity");
    }

    #[test]
    fn test_empty_route_kind() {
        let mut config = minimal_config();
        config.routes.push(route(""));
        let err = validate(&config).unwrap_err();
        assert_eq!(field_of(err), "routes[2].kind");
    }

    #[test]
    fn test_duplicate_route_kind() {
        let mut config = minimal_config();
        config.routes.push(route("email"));
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate route kind"), "got: {err}");
    }

    #[test]
    fn test_padded_route_kind() {
        let mut config = minimal_config();
        config.routes[0].kind = " email".into();
        let err = validate(&config).unwrap_err();
        assert_eq!(field_of(err), "routes[0].kind");
    }
}
