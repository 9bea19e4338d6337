//! Template renderer based on MiniJinja

use kubeseed_core::{ManifestTemplate, ParameterSet, ResourceKind};
use minijinja::{Environment, UndefinedBehavior};
use serde::Deserialize;

use crate::error::{RenderError, Result};
use crate::filters;

/// Bytes of one rendered manifest
///
/// Ephemeral: produced by [`Renderer::render`] and consumed once by an applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedManifest {
    path: String,
    kind: ResourceKind,
    text: String,
}

impl RenderedManifest {
    /// Path of the template this manifest was rendered from
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.text.into_bytes()
    }
}

/// The manifest renderer
///
/// Rendering never touches the filesystem, so a single renderer can be
/// shared by every installer. Each call builds its own environment borrowing
/// the template source.
#[derive(Debug, Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Create a configured MiniJinja environment
    fn environment<'s>(&self) -> Environment<'s> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("quote", filters::quote);
        env.add_filter("indent", filters::indent);
        env.add_filter("nindent", filters::nindent);

        env
    }

    /// Render `template` with `params`
    ///
    /// Every parameter the template references must be present; unused
    /// parameters are ignored. The output must be exactly one manifest of
    /// the template's declared kind.
    pub fn render(
        &self,
        template: &ManifestTemplate,
        params: &ParameterSet,
    ) -> Result<RenderedManifest> {
        let path = template.path();
        let source = template.source();

        let env = self.environment();
        let tmpl = env
            .template_from_named_str(path, source)
            .map_err(|e| RenderError::from_minijinja(e, path, source))?;

        // Sorted so the reported key is stable across runs
        let mut missing: Vec<String> = tmpl
            .undeclared_variables(false)
            .into_iter()
            .filter(|name| {
                !params.contains_key(name) && !env.globals().any(|(g, _)| g == name.as_str())
            })
            .collect();
        missing.sort();

        if let Some(key) = missing.into_iter().next() {
            return Err(RenderError::MissingParameter {
                template: path.to_string(),
                key,
            });
        }

        let text = tmpl
            .render(params)
            .map_err(|e| RenderError::from_minijinja(e, path, source))?;

        check_manifest(template, &text)?;

        Ok(RenderedManifest {
            path: path.to_string(),
            kind: template.kind(),
            text,
        })
    }
}

/// The rendered text must hold exactly one document declaring the expected kind
fn check_manifest(template: &ManifestTemplate, text: &str) -> Result<()> {
    let invalid = |message: String| RenderError::InvalidManifest {
        template: template.path().to_string(),
        message,
    };

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| invalid(e.to_string()))?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    let document = match documents.as_slice() {
        [document] => document,
        [] => return Err(invalid("no manifest document".to_string())),
        many => {
            return Err(invalid(format!(
                "expected one manifest document, found {}",
                many.len()
            )));
        }
    };

    let found = document
        .get("kind")
        .and_then(serde_yaml::Value::as_str)
        .ok_or_else(|| invalid("missing `kind`".to_string()))?;

    if found != template.kind().as_str() {
        return Err(RenderError::KindMismatch {
            template: template.path().to_string(),
            expected: template.kind(),
            found: found.to_string(),
        });
    }

    Ok(())
}
