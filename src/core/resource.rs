//! Resource paths detected from repository changes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A directory path of the form `<namespace>/<resource-name>` holding one
/// deployment-config document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The application segment: everything up to the final path component
    pub fn application(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((app, _)) => app,
            None => "",
        }
    }

    /// The resource name: the final path component
    pub fn resource_name(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// Resolve this path against a repository root
    pub fn join_root(&self, root: &Path) -> std::path::PathBuf {
        root.join(&self.0)
    }

    /// Parse a comma-separated path list, dropping empty segments
    pub fn parse_list(input: &str) -> Vec<ResourcePath> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ResourcePath::new)
            .collect()
    }

    /// Join paths back into the comma-separated output form
    pub fn join_list(paths: &[ResourcePath]) -> String {
        paths
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_and_resource_segments() {
        let path = ResourcePath::new("cloud-formation/rcc/queue");
        assert_eq!(path.application(), "cloud-formation/rcc");
        assert_eq!(path.resource_name(), "queue");
    }

    #[test]
    fn test_single_segment_path() {
        let path = ResourcePath::new("queue");
        assert_eq!(path.application(), "");
        assert_eq!(path.resource_name(), "queue");
    }

    #[test]
    fn test_parse_list_trims_and_drops_empties() {
        let paths = ResourcePath::parse_list("a/x, a/y ,, a/z,");
        assert_eq!(
            paths,
            vec![
                ResourcePath::new("a/x"),
                ResourcePath::new("a/y"),
                ResourcePath::new("a/z"),
            ]
        );
    }

    #[test]
    fn test_join_list_round_trip() {
        let paths = ResourcePath::parse_list("a/x,a/y");
        assert_eq!(ResourcePath::join_list(&paths), "a/x,a/y");
    }
}
