//! Template compilation with recursive includes.
//!
//! This module provides:
//! - The compiler that expands `include` directives and detects cycles
//! - The per-compiler cache of compiled templates
//! - The embedded evaluator that renders expanded text

mod cache;
mod compiler;
mod evaluator;
mod include;

pub use cache::TemplateCache;
pub use compiler::TemplateCompiler;
pub use evaluator::{escape_html, CompiledTemplate};
