//! Context paths: the innermost override dimension.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dimension::{Dimension, Id};
use crate::error::ContextPathError;

/// One link of a [`ContextPath`]: a context template and, optionally, the
/// concrete instance of that template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathLink {
    template: Id,
    instance: Dimension<Id>,
}

impl PathLink {
    /// Creates a link pointing at a concrete instance of a template.
    pub fn instance(template: Id, instance: Id) -> Self {
        Self {
            template,
            instance: Dimension::from_raw(instance),
        }
    }

    /// Creates a link that refers to the template itself.
    pub fn template(template: Id) -> Self {
        Self {
            template,
            instance: Dimension::Common,
        }
    }

    /// Returns the template id.
    pub fn template_id(&self) -> Id {
        self.template
    }

    /// Returns the instance dimension.
    pub fn instance_id(&self) -> Dimension<Id> {
        self.instance
    }

    /// Returns true if this link names a concrete instance.
    pub fn is_specific(&self) -> bool {
        self.instance.is_specific()
    }

    fn to_template(self) -> Self {
        Self::template(self.template)
    }
}

/// A chain of context links, innermost first.
///
/// The text form is `template.instance` links joined by `-`, with instance
/// `0` meaning the template itself: `"1.10-2.20"` is instance 10 of template
/// 1 inside instance 20 of template 2.
///
/// Collapsing a path replaces its innermost concrete instance with its
/// template; once every link is a template the path is at its root.
///
/// # Example
///
/// ```
/// use strata_core::ContextPath;
///
/// let path: ContextPath = "1.10-2.20".parse().unwrap();
/// let parent = path.parent().unwrap();
/// assert_eq!(parent.to_string(), "1.0-2.20");
/// assert_eq!(parent.parent().unwrap().to_string(), "1.0-2.0");
/// assert!(parent.parent().unwrap().parent().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContextPath {
    links: Vec<PathLink>,
}

impl ContextPath {
    /// Creates a path from its links, innermost first.
    ///
    /// # Errors
    ///
    /// Returns an error if `links` is empty; "no context" is expressed by the
    /// absence of a path, not by an empty one.
    pub fn new(links: Vec<PathLink>) -> Result<Self, ContextPathError> {
        if links.is_empty() {
            return Err(ContextPathError::new("", "a context path needs at least one link"));
        }
        Ok(Self { links })
    }

    /// Returns the links, innermost first.
    pub fn links(&self) -> &[PathLink] {
        &self.links
    }

    /// Returns the number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Always false; kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Returns how many links still name a concrete instance.
    pub fn specific_links(&self) -> usize {
        self.links.iter().filter(|l| l.is_specific()).count()
    }

    /// Returns true if every link is a template.
    pub fn is_root(&self) -> bool {
        self.specific_links() == 0
    }

    /// Returns the parent template path, or `None` when already at the root.
    pub fn parent(&self) -> Option<Self> {
        let position = self.links.iter().position(PathLink::is_specific)?;
        let mut links = self.links.clone();
        links[position] = links[position].to_template();
        Some(Self { links })
    }

    /// Returns the fully templated form of this path.
    pub fn root(&self) -> Self {
        Self {
            links: self.links.iter().map(|l| l.to_template()).collect(),
        }
    }
}

impl fmt::Display for ContextPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, link) in self.links.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            let instance = link.instance.specific().copied().unwrap_or(0);
            write!(f, "{}.{}", link.template, instance)?;
        }
        Ok(())
    }
}

impl FromStr for ContextPath {
    type Err = ContextPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ContextPathError::new(s, "path is empty"));
        }

        let mut links = Vec::new();
        for part in trimmed.split('-') {
            let (template, instance) = match part.split_once('.') {
                Some((t, i)) => (t, Some(i)),
                None => (part, None),
            };

            let template: Id = template
                .parse()
                .map_err(|_| ContextPathError::new(s, format!("bad template id in '{part}'")))?;
            let instance: Id = match instance {
                Some(i) => i
                    .parse()
                    .map_err(|_| ContextPathError::new(s, format!("bad instance id in '{part}'")))?,
                None => 0,
            };

            links.push(PathLink::instance(template, instance));
        }

        Ok(Self { links })
    }
}

impl TryFrom<String> for ContextPath {
    type Error = ContextPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContextPath> for String {
    fn from(path: ContextPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path: ContextPath = "1.10-2.20".parse().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.specific_links(), 2);
        assert_eq!(path.links()[0], PathLink::instance(1, 10));
        assert_eq!(path.to_string(), "1.10-2.20");
    }

    #[test]
    fn test_bare_template_link() {
        let path: ContextPath = "4-2.20".parse().unwrap();
        assert_eq!(path.links()[0], PathLink::template(4));
        assert_eq!(path.to_string(), "4.0-2.20");
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<ContextPath>().is_err());
        assert!("x.1".parse::<ContextPath>().is_err());
        assert!("1.y".parse::<ContextPath>().is_err());
        assert!("1.2--3.4".parse::<ContextPath>().is_err());
        assert!(ContextPath::new(vec![]).is_err());
    }

    #[test]
    fn test_parent_skips_templates() {
        let path: ContextPath = "1.0-2.20-3.30".parse().unwrap();
        let parent = path.parent().unwrap();
        assert_eq!(parent.to_string(), "1.0-2.0-3.30");
    }

    #[test]
    fn test_root() {
        let path: ContextPath = "1.10-2.20".parse().unwrap();
        assert!(!path.is_root());
        assert_eq!(path.root().to_string(), "1.0-2.0");
        assert!(path.root().is_root());
        assert!(path.root().parent().is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let path: ContextPath = "1.10-2.20".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"1.10-2.20\"");

        let back: ContextPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
