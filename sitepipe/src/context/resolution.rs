//! The outcome of resolving a logical path.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which targets exist for a logical path.
///
/// Any combination is valid, including none at all (target not found).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Route key of a registered controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_path: Option<String>,
    /// Absolute path of a template file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    /// Absolute path of a static file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_path: Option<PathBuf>,
}

impl Resolution {
    /// Creates an empty resolution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the controller route key.
    #[must_use]
    pub fn with_controller(mut self, controller: impl Into<String>) -> Self {
        self.controller_path = Some(controller.into());
        self
    }

    /// Sets the template path.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template_path = Some(template.into());
        self
    }

    /// Sets the static file path.
    #[must_use]
    pub fn with_static(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_path = Some(path.into());
        self
    }

    /// Returns true if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controller_path.is_none() && self.template_path.is_none() && self.static_path.is_none()
    }

    /// Layers `other` onto `self`.
    ///
    /// Fields present in `self` win; an absent field never overwrites a present one.
    #[must_use]
    pub fn layered_over(self, other: Self) -> Self {
        Self {
            controller_path: self.controller_path.or(other.controller_path),
            template_path: self.template_path.or(other.template_path),
            static_path: self.static_path.or(other.static_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_resolution() {
        assert!(Resolution::new().is_empty());
        assert!(!Resolution::new().with_controller("default").is_empty());
    }

    #[test]
    fn test_layering_keeps_present_fields() {
        let probe = Resolution::new().with_static("/site/public/foo.json");
        let stripped = Resolution::new().with_controller("foo").with_template("/site/t/foo.tmpl");

        let merged = probe.layered_over(stripped);

        assert_eq!(merged.controller_path.as_deref(), Some("foo"));
        assert_eq!(merged.template_path, Some(PathBuf::from("/site/t/foo.tmpl")));
        assert_eq!(merged.static_path, Some(PathBuf::from("/site/public/foo.json")));
    }

    #[test]
    fn test_layering_absent_does_not_overwrite() {
        let merged = Resolution::new().layered_over(Resolution::new().with_static("/a"));
        assert_eq!(merged.static_path, Some(PathBuf::from("/a")));
    }
}
