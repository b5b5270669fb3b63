//! Materialized ancestor path for the department tree
//!
//! Every department row stores the id chain of its ancestors as a
//! comma-delimited string, root first (top-level departments carry `"0"`).
//! All prefix work is segment-exact: `"0,1"` is a prefix of `"0,1,5"` but
//! never of `"0,11"`, so rebasing one subtree can not corrupt another.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Parsed ancestor id chain of a department.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AncestorPath(Vec<i64>);

impl AncestorPath {
    /// Path carried by top-level departments (`parent_id` = 0).
    pub fn root() -> Self {
        Self(vec![0])
    }

    /// Ancestor ids, root first.
    pub fn segments(&self) -> &[i64] {
        &self.0
    }

    /// Whether `id` appears anywhere in the chain, i.e. whether the owning
    /// department is a descendant of `id`.
    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    /// Path for a department whose parent has this path and the given id.
    pub fn child(&self, parent_id: i64) -> Self {
        let mut segments = self.0.clone();
        segments.push(parent_id);
        Self(segments)
    }

    /// Segment-exact prefix test.
    pub fn starts_with(&self, prefix: &AncestorPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Replace the leading `old_prefix` with `new_prefix`.
    ///
    /// Returns `None` when the path does not start with `old_prefix` on
    /// whole segments; callers must not rewrite such rows.
    pub fn rebase(&self, old_prefix: &AncestorPath, new_prefix: &AncestorPath) -> Option<Self> {
        if !self.starts_with(old_prefix) {
            return None;
        }
        let mut segments = new_prefix.0.clone();
        segments.extend_from_slice(&self.0[old_prefix.0.len()..]);
        Some(Self(segments))
    }
}

impl FromStr for AncestorPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AppError::Validation("ancestors must not be empty".to_string()));
        }
        let segments = s
            .split(',')
            .map(|part| {
                part.trim().parse::<i64>().map_err(|_| {
                    AppError::Validation(format!("invalid ancestors segment: {:?}", part))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }
}

impl fmt::Display for AncestorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", id)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> AncestorPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let p = path("0,100,101");
        assert_eq!(p.segments(), &[0, 100, 101]);
        assert_eq!(p.to_string(), "0,100,101");
        assert_eq!(AncestorPath::root().to_string(), "0");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<AncestorPath>().is_err());
        assert!("0,,5".parse::<AncestorPath>().is_err());
        assert!("0,abc".parse::<AncestorPath>().is_err());
    }

    #[test]
    fn test_contains() {
        let p = path("0,100,101");
        assert!(p.contains(100));
        assert!(!p.contains(10));
        assert!(!p.contains(1));
    }

    #[test]
    fn test_child() {
        assert_eq!(AncestorPath::root().child(100), path("0,100"));
        assert_eq!(path("0,100").child(101), path("0,100,101"));
    }

    #[test]
    fn test_prefix_is_segment_exact() {
        assert!(path("0,1,5").starts_with(&path("0,1")));
        assert!(path("0,1").starts_with(&path("0,1")));
        // "0,1" must not match inside "0,11"
        assert!(!path("0,11").starts_with(&path("0,1")));
        assert!(!path("0,11,5").starts_with(&path("0,1")));
        assert!(!path("0").starts_with(&path("0,1")));
    }

    #[test]
    fn test_rebase() {
        // Move department 5 (ancestors "0,1") under 200 (ancestors "0,200"):
        // a descendant "0,1,5" becomes "0,200,5".
        let rebased = path("0,1,5").rebase(&path("0,1"), &path("0,200")).unwrap();
        assert_eq!(rebased, path("0,200,5"));

        let deep = path("0,1,5,7").rebase(&path("0,1"), &path("0,200")).unwrap();
        assert_eq!(deep, path("0,200,5,7"));
    }

    #[test]
    fn test_rebase_refuses_partial_match() {
        assert!(path("0,11,5").rebase(&path("0,1"), &path("0,200")).is_none());
        assert!(path("0,2").rebase(&path("0,1"), &path("0,200")).is_none());
    }
}
