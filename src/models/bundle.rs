//! Test bundle catalog
//!
//! Defines the bundles the framework test suite is grouped into, plus the
//! optional finer-grained specs within a bundle.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Test bundles shipped with the framework suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestBundle {
    All,
    Core,
    Model,
    Controller,
    View,
    Plugin,
}

impl TestBundle {
    /// Catalog id (also the runner's `testBundles` parameter value)
    pub fn id(&self) -> &'static str {
        match self {
            TestBundle::All => "all",
            TestBundle::Core => "core",
            TestBundle::Model => "model",
            TestBundle::Controller => "controller",
            TestBundle::View => "view",
            TestBundle::Plugin => "plugin",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            TestBundle::All => "All Tests",
            TestBundle::Core => "Core Tests",
            TestBundle::Model => "Model Tests",
            TestBundle::Controller => "Controller Tests",
            TestBundle::View => "View Tests",
            TestBundle::Plugin => "Plugin Tests",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TestBundle::All => "Run all available tests",
            TestBundle::Core => "Tests for core framework functionality",
            TestBundle::Model => "Tests for model-related functionality",
            TestBundle::Controller => "Tests for controller-related functionality",
            TestBundle::View => "Tests for view-related functionality",
            TestBundle::Plugin => "Tests for plugins",
        }
    }

    /// Suite path within the framework test directory
    pub fn path(&self) -> &'static str {
        match self {
            TestBundle::All => "/",
            TestBundle::Core => "/core",
            TestBundle::Model => "/models",
            TestBundle::Controller => "/controllers",
            TestBundle::View => "/views",
            TestBundle::Plugin => "/plugins",
        }
    }

    /// Whether the runner needs an explicit `testBundles` parameter
    pub fn is_subset(&self) -> bool {
        !matches!(self, TestBundle::All)
    }

    /// Get all bundles
    pub fn all() -> Vec<TestBundle> {
        vec![
            TestBundle::All,
            TestBundle::Core,
            TestBundle::Model,
            TestBundle::Controller,
            TestBundle::View,
            TestBundle::Plugin,
        ]
    }

    /// Parse from catalog id
    pub fn from_str(s: &str) -> Option<TestBundle> {
        match s.to_lowercase().as_str() {
            "all" => Some(TestBundle::All),
            "core" => Some(TestBundle::Core),
            "model" | "models" => Some(TestBundle::Model),
            "controller" | "controllers" => Some(TestBundle::Controller),
            "view" | "views" => Some(TestBundle::View),
            "plugin" | "plugins" => Some(TestBundle::Plugin),
            _ => None,
        }
    }
}

impl fmt::Display for TestBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Optional subset within a bundle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    pub id: String,
    pub name: String,
    pub bundle: TestBundle,
    pub path: String,
}

impl TestSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bundle: TestBundle) -> Self {
        let id = id.into();
        let path = format!("{}/{}", bundle.path().trim_end_matches('/'), id);
        Self {
            id,
            name: name.into(),
            bundle,
            path,
        }
    }
}

impl fmt::Display for TestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_ids() {
        assert_eq!(TestBundle::Core.id(), "core");
        assert_eq!(TestBundle::All.path(), "/");
        assert_eq!(TestBundle::Model.path(), "/models");
    }

    #[test]
    fn test_bundle_from_str() {
        assert_eq!(TestBundle::from_str("core"), Some(TestBundle::Core));
        assert_eq!(TestBundle::from_str("Views"), Some(TestBundle::View));
        assert_eq!(TestBundle::from_str("unknown"), None);
    }

    #[test]
    fn test_all_bundle_needs_no_param() {
        assert!(!TestBundle::All.is_subset());
        assert!(TestBundle::Plugin.is_subset());
    }

    #[test]
    fn test_spec_path() {
        let spec = TestSpec::new("validation", "Validation", TestBundle::Model);
        assert_eq!(spec.path, "/models/validation");
        assert_eq!(spec.bundle, TestBundle::Model);
    }
}
