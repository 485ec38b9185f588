//! Recursive include expansion and compilation.

use super::evaluator::{self, CompiledTemplate};
use super::include::{self, IncludeDirective};
use super::TemplateCache;
use crate::config::RouterOptions;
use crate::errors::TemplateError;
use crate::pipeline::join_settled;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Compiles template files into cached render functions.
///
/// Each compiler owns its cache; compilers built from separate options never
/// share compiled templates.
#[derive(Debug, Clone)]
pub struct TemplateCompiler {
    root: PathBuf,
    exts: Vec<String>,
    cache: Arc<TemplateCache>,
}

impl TemplateCompiler {
    /// Creates a compiler with an empty cache.
    ///
    /// `root` anchors include paths that start with `/`; `exts` are the file
    /// extensions tried, in order, when resolving an include.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, exts: Vec<String>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            root: normalize(&root),
            exts,
            cache: Arc::new(TemplateCache::new()),
        }
    }

    /// Creates a compiler for the site described by `options`.
    #[must_use]
    pub fn from_options(options: &RouterOptions) -> Self {
        Self::new(options.template_root(), options.template_exts.clone())
    }

    /// Uses `cache` instead of the compiler's own.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TemplateCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    /// Returns the template root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compiles the template at `path`, or returns the cached result.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateError` if the file or any include cannot be read,
    /// an include is missing or circular, or the expanded text is invalid.
    pub async fn compile(&self, path: &Path) -> Result<Arc<CompiledTemplate>, TemplateError> {
        let path = std::path::absolute(path)
            .map(|p| normalize(&p))
            .map_err(|err| TemplateError::read_failed(path, &err))?;

        if let Some(compiled) = self.cache.get(&path) {
            trace!(path = %path.display(), "Template cache hit");
            return Ok(compiled);
        }

        debug!(path = %path.display(), "Compiling template");
        let expanded = self.expand(path.clone(), vec![path.clone()]).await?;
        let compiled = Arc::new(evaluator::compile(&path, &expanded)?);

        self.cache.insert(path, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Renders a compiled template.
    ///
    /// # Errors
    ///
    /// Returns a `RenderFailed` error if the template fails on `data`.
    pub fn render(&self, template: &CompiledTemplate, data: &Value) -> Result<String, TemplateError> {
        template.render(data)
    }

    /// Compiles (or fetches) and renders in one step.
    ///
    /// # Errors
    ///
    /// Returns any compile or render error.
    pub async fn compile_and_render(&self, path: &Path, data: &Value) -> Result<String, TemplateError> {
        let compiled = self.compile(path).await?;
        self.render(&compiled, data)
    }

    /// Reads `path` and replaces its include directives with their expansions.
    ///
    /// `stack` holds the files being expanded on this branch, `path` last.
    fn expand(&self, path: PathBuf, stack: Vec<PathBuf>) -> BoxFuture<'_, Result<String, TemplateError>> {
        async move {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|err| TemplateError::read_failed(&path, &err).with_chain(stack.clone()))?;

            let directives = include::scan(&path, &text)?;
            if directives.is_empty() {
                return Ok(text);
            }

            let expansions = join_settled(
                directives
                    .iter()
                    .map(|directive| self.expand_include(directive, &path, &stack)),
            )
            .await?;

            Ok(include::splice(&text, &directives, &expansions))
        }
        .boxed()
    }

    async fn expand_include(
        &self,
        directive: &IncludeDirective,
        including: &Path,
        stack: &[PathBuf],
    ) -> Result<String, TemplateError> {
        let target = self.resolve_include(&directive.reference, including, stack).await?;

        if stack.contains(&target) {
            return Err(TemplateError::circular(stack.to_vec(), &target));
        }

        let mut branch = stack.to_vec();
        branch.push(target.clone());
        let fragment = self.expand(target, branch).await?;

        Ok(match &directive.args {
            Some(args) => include::substitute(&fragment, args),
            None => fragment,
        })
    }

    async fn resolve_include(
        &self,
        reference: &str,
        including: &Path,
        stack: &[PathBuf],
    ) -> Result<PathBuf, TemplateError> {
        let base = match reference.strip_prefix('/') {
            Some(rooted) => self.root.join(rooted),
            None => including
                .parent()
                .unwrap_or(self.root.as_path())
                .join(reference),
        };
        let base = normalize(&base);

        let has_known_ext = base
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.exts.iter().any(|known| known == ext));

        let mut candidates = Vec::with_capacity(self.exts.len() + 1);
        if has_known_ext {
            candidates.push(base.clone());
        }
        candidates.extend(self.exts.iter().map(|ext| with_appended_ext(&base, ext)));

        for candidate in candidates {
            if tokio::fs::metadata(&candidate)
                .await
                .is_ok_and(|meta| meta.is_file())
            {
                return Ok(candidate);
            }
        }

        Err(TemplateError::include_not_found(reference, including, stack.to_vec()))
    }
}

fn with_appended_ext(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
