use std::fmt;

/// Qualified name of a node declaration, e.g. `list::cons`.
///
/// Declarations and definitions are registered and looked up by this name.
///
/// # Examples
///
/// ```
/// use weave_core::QualifiedName;
///
/// let cons = QualifiedName::new("cons", vec!["list".into()]);
/// assert_eq!(cons.to_string(), "list::cons");
/// assert_eq!(QualifiedName::from("list::cons"), cons);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Simple name (e.g. "cons", "add").
    pub name: String,
    /// Namespace path, empty for the global namespace.
    pub namespace: Vec<String>,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>, namespace: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }

    /// A name in the global namespace.
    pub fn global(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// A name inside a `::`-separated namespace string. An empty namespace is global.
    pub fn in_namespace(namespace: &str, name: impl Into<String>) -> Self {
        let namespace = namespace
            .split("::")
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(name, namespace)
    }

    /// Parse `a::b::name`. Leading `::` is ignored.
    pub fn from_qualified_string(s: &str) -> Self {
        let mut parts: Vec<String> = s
            .split("::")
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        match parts.pop() {
            Some(name) => Self::new(name, parts),
            None => Self::global(""),
        }
    }

    pub fn is_global(&self) -> bool {
        self.namespace.is_empty()
    }

    pub fn simple_name(&self) -> &str {
        &self.name
    }

    pub fn namespace_string(&self) -> String {
        self.namespace.join("::")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.namespace {
            write!(f, "{segment}::")?;
        }
        write!(f, "{}", self.name)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::from_qualified_string(s)
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self::from_qualified_string(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_name() {
        let name = QualifiedName::global("identity");
        assert!(name.is_global());
        assert_eq!(name.to_string(), "identity");
    }

    #[test]
    fn parse_namespaced() {
        let name = QualifiedName::from_qualified_string("math::vector::add");
        assert_eq!(name.simple_name(), "add");
        assert_eq!(name.namespace_string(), "math::vector");
    }

    #[test]
    fn leading_colons_are_ignored() {
        assert_eq!(
            QualifiedName::from("::list::head"),
            QualifiedName::from("list::head")
        );
        assert!(QualifiedName::from("::").is_global());
    }

    #[test]
    fn in_namespace_matches_parse() {
        assert_eq!(
            QualifiedName::in_namespace("list", "tail"),
            QualifiedName::from("list::tail")
        );
        assert!(QualifiedName::in_namespace("", "x").is_global());
    }
}
