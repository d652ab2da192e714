//! Per-invocation context threaded explicitly through every tool.

use crate::datasource::ExternalDatasourceBinding;

/// Who is calling: the conversation's session id and, in live-database
/// mode, the datasource it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub session_id: String,
    pub datasource: Option<ExternalDatasourceBinding>,
}

impl ToolContext {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            datasource: None,
        }
    }

    /// Live-database context; the session id comes from the binding.
    pub fn for_datasource(binding: ExternalDatasourceBinding) -> Self {
        Self {
            session_id: binding.session_id.clone(),
            datasource: Some(binding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::DatasourceType;

    #[test]
    fn test_datasource_context_uses_binding_session() {
        let binding = ExternalDatasourceBinding::new(3, DatasourceType::Doris, "enc", None);
        let ctx = ToolContext::for_datasource(binding);
        assert_eq!(ctx.session_id, "datasource_3");
        assert!(ctx.datasource.is_some());
        assert!(ToolContext::for_session("chat").datasource.is_none());
    }
}
