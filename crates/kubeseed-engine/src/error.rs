//! Render error types with source-mapped diagnostics

use kubeseed_core::ResourceKind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors produced while rendering one manifest template
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum RenderError {
    /// The template references a parameter the set does not carry
    #[error("{template}: missing template parameter `{key}`")]
    #[diagnostic(
        code(kubeseed::render::missing_parameter),
        help("add `{key}` to the component's parameter overrides")
    )]
    MissingParameter { template: String, key: String },

    /// MiniJinja rejected the template (syntax, filter or evaluation error)
    #[error("{template}: {message}")]
    #[diagnostic(code(kubeseed::render::template))]
    Template {
        template: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("error occurred here")]
        span: Option<SourceSpan>,
        #[source]
        source: minijinja::Error,
    },

    /// The rendered text is not a single YAML manifest
    #[error("{template}: rendered output is not a valid manifest: {message}")]
    #[diagnostic(code(kubeseed::render::invalid_manifest))]
    InvalidManifest { template: String, message: String },

    /// The rendered manifest declares a different kind than expected
    #[error("{template}: expected kind {expected}, rendered manifest declares {found}")]
    #[diagnostic(code(kubeseed::render::kind_mismatch))]
    KindMismatch {
        template: String,
        expected: ResourceKind,
        found: String,
    },
}

impl RenderError {
    pub(crate) fn from_minijinja(err: minijinja::Error, template: &str, source: &str) -> Self {
        let message = err
            .detail()
            .map(str::to_string)
            .unwrap_or_else(|| err.kind().to_string());
        let span = err.line().and_then(|line| calculate_span(source, line));

        Self::Template {
            template: template.to_string(),
            message,
            src: NamedSource::new(template, source.to_string()),
            span,
            source: err,
        }
    }

    /// The missing parameter name, if this is a missing-parameter error
    pub fn missing_key(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Span covering the whole of `line_num` (1-based)
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (index, line) in source.lines().enumerate() {
        if index + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_span() {
        let source = "kind: Service\nmetadata:\n  name: {{ Name }}";
        let span = calculate_span(source, 3).unwrap();
        assert_eq!(span.offset(), 24);
        assert_eq!(span.len(), 18);
        assert!(calculate_span(source, 4).is_none());
    }

    #[test]
    fn test_missing_parameter_display() {
        let err = RenderError::MissingParameter {
            template: "dns/service.yaml".to_string(),
            key: "ClusterIP".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "dns/service.yaml: missing template parameter `ClusterIP`"
        );
        assert_eq!(err.missing_key(), Some("ClusterIP"));
    }
}
