//! The resolved build spec: package name, variants, and parameters, plus
//! the constraint queries hooks use to decide whether they apply.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::manifest::Manifest;

/// A variant the package declares, with its default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantDecl {
    pub name: &'static str,
    pub default: bool,
    pub description: &'static str,
}

/// Variants understood by the CMake extension.
pub const VARIANTS: &[VariantDecl] = &[VariantDecl {
    name: "ninja",
    default: false,
    description: "Enable Ninja makefile generator",
}];

/// Parameter naming a developer-owned source checkout.
pub const DEV_PATH: &str = "dev_path";

/// An immutable snapshot of the build configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    name: String,
    variants: BTreeMap<String, bool>,
    parameters: BTreeMap<String, String>,
}

impl BuildSpec {
    /// A spec with every declared variant at its default and no parameters.
    pub fn new(name: &str) -> Self {
        let variants = VARIANTS
            .iter()
            .map(|v| (v.name.to_owned(), v.default))
            .collect();
        Self {
            name: name.to_owned(),
            variants,
            parameters: BTreeMap::new(),
        }
    }

    /// Resolve a manifest into a spec, filling in variant defaults.
    ///
    /// # Errors
    /// Returns an error if the manifest sets a variant the package does not declare.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, SpecError> {
        let mut spec = Self::new(&manifest.package.name);
        for (name, enabled) in &manifest.variants {
            spec = spec.with_variant(name, *enabled)?;
        }
        for (key, value) in &manifest.parameters {
            spec = spec.with_parameter(key, value);
        }
        Ok(spec)
    }

    /// Return a copy with `name` set to `enabled`.
    ///
    /// # Errors
    /// Returns an error if `name` is not a declared variant.
    pub fn with_variant(mut self, name: &str, enabled: bool) -> Result<Self, SpecError> {
        let Some(slot) = self.variants.get_mut(name) else {
            return Err(SpecError::UnknownVariant {
                name: name.to_owned(),
                package: self.name,
            });
        };
        *slot = enabled;
        Ok(self)
    }

    /// Return a copy with parameter `key` set to `value`.
    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether variant `name` is enabled. Undeclared variants are never enabled.
    pub fn variant(&self, name: &str) -> bool {
        self.variants.get(name).copied().unwrap_or(false)
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// The developer checkout this build was pointed at, if any.
    pub fn dev_path(&self) -> Option<&Path> {
        self.parameter(DEV_PATH).map(Path::new)
    }

    /// Check the spec against a constraint such as `"+ninja dev_path=*"`.
    ///
    /// # Errors
    /// Returns an error if the constraint cannot be parsed.
    pub fn satisfies(&self, constraint: &str) -> Result<bool, SpecError> {
        Ok(constraint.parse::<Constraint>()?.matches(self))
    }

    /// Tools that must be on `PATH` to build this spec.
    pub fn build_dependencies(&self) -> Vec<&'static str> {
        let mut deps = vec!["cmake"];
        if self.variant("ninja") {
            deps.push("ninja");
        }
        deps
    }
}

impl fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (name, enabled) in &self.variants {
            let sigil = if *enabled { '+' } else { '~' };
            write!(f, "{sigil}{name}")?;
        }
        for (key, value) in &self.parameters {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// One term of a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// `+name`
    Enabled(String),
    /// `~name`
    Disabled(String),
    /// `key=*`
    Present(String),
    /// `key=value`
    Equals(String, String),
}

impl Term {
    fn matches(&self, spec: &BuildSpec) -> bool {
        match self {
            Term::Enabled(name) => spec.variant(name),
            Term::Disabled(name) => spec.variants.get(name).is_some_and(|on| !on),
            Term::Present(key) => spec.parameters.contains_key(key),
            Term::Equals(key, value) => spec.parameter(key) == Some(value.as_str()),
        }
    }
}

/// A conjunction of terms; the empty constraint matches every spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    pub terms: Vec<Term>,
}

impl Constraint {
    pub fn matches(&self, spec: &BuildSpec) -> bool {
        self.terms.iter().all(|t| t.matches(spec))
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl FromStr for Constraint {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut terms = Vec::new();
        for token in s.split_whitespace() {
            let bad = || SpecError::InvalidConstraint {
                constraint: s.to_owned(),
                token: token.to_owned(),
            };
            let term = if let Some(name) = token.strip_prefix('+') {
                Term::Enabled(name.to_owned())
            } else if let Some(name) = token.strip_prefix('~') {
                Term::Disabled(name.to_owned())
            } else if let Some((key, value)) = token.split_once('=') {
                if !is_identifier(key) || value.is_empty() {
                    return Err(bad());
                }
                if value == "*" {
                    Term::Present(key.to_owned())
                } else {
                    Term::Equals(key.to_owned(), value.to_owned())
                }
            } else {
                return Err(bad());
            };

            if let Term::Enabled(name) | Term::Disabled(name) = &term {
                if !is_identifier(name) {
                    return Err(bad());
                }
            }
            terms.push(term);
        }
        Ok(Self { terms })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("package `{package}` has no variant `{name}` — known variants: ninja")]
    UnknownVariant { name: String, package: String },
    #[error("invalid constraint \"{constraint}\": cannot parse `{token}` — expected +variant, ~variant, key=value, or key=*")]
    InvalidConstraint { constraint: String, token: String },
}
