//! URL to target resolution.
//!
//! This module provides:
//! - The route matcher seam and its filesystem implementation
//! - The resolver adapter that layers index and `.json` policies on top
//! - Controllers and the registry they are looked up in

mod controllers;
mod matcher;
mod resolver;

pub use controllers::{normalize_route, Controller, ControllerRegistry, FnController};
pub use matcher::{FsRouteMatcher, RouteMatcher};
pub use resolver::{RouteDecision, RouteResolver, INDEX_ROUTE};

#[cfg(test)]
pub use matcher::MockRouteMatcher;
