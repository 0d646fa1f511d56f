use std::collections::{BTreeMap, BTreeSet};

use rolegate_core::{AppResult, Slug};
use serde::{Deserialize, Serialize};

/// Declarative access configuration consumed by the synchronizer.
///
/// Maps role slugs to a display name and an ordered permission list. The
/// map is the single source of truth for seed and sync runs; services
/// receive it by value and never perform ambient configuration lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Declared roles keyed by role slug.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleConfig>,
}

/// A single declared role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Display name for the role.
    pub name: String,
    /// Ordered permission declarations owned by the role.
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
}

/// A declared permission, either a bare slug or a structured entry.
///
/// The structured form carries the slug in `name` together with an
/// optional description, mirroring the two shapes accepted by the
/// original configuration reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionEntry {
    /// Bare permission slug.
    Slug(String),
    /// Structured entry with the slug under `name`.
    Detailed {
        /// Permission slug.
        name: String,
        /// Optional human-readable description.
        #[serde(default)]
        description: Option<String>,
    },
}

impl PermissionEntry {
    /// Returns the declared slug string.
    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::Slug(slug) => slug.as_str(),
            Self::Detailed { name, .. } => name.as_str(),
        }
    }

    /// Returns the declared description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Slug(_) => None,
            Self::Detailed { description, .. } => description.as_deref(),
        }
    }
}

/// A declared permission resolved to its canonical attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDeclaration {
    /// Canonical identity key.
    pub slug: Slug,
    /// Display name derived from the slug.
    pub name: String,
    /// Description from the first structured declaration, if any.
    pub description: Option<String>,
}

impl AccessConfig {
    /// Returns whether no roles are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns declared roles with validated slugs, in sorted slug order.
    pub fn role_entries(&self) -> AppResult<Vec<(Slug, &RoleConfig)>> {
        self.roles
            .iter()
            .map(|(slug, role)| Ok((Slug::new(slug.as_str())?, role)))
            .collect()
    }

    /// Returns all declared permissions deduplicated across roles.
    ///
    /// The first occurrence (roles iterated in sorted slug order, entries
    /// in declaration order) wins the display-name and description
    /// derivation; later duplicates and blank entries are ignored.
    pub fn declared_permissions(&self) -> AppResult<Vec<PermissionDeclaration>> {
        let mut seen = BTreeSet::new();
        let mut declarations = Vec::new();

        for role in self.roles.values() {
            for entry in &role.permissions {
                if entry.slug().trim().is_empty() {
                    continue;
                }

                let slug = Slug::new(entry.slug())?;
                if !seen.insert(slug.clone()) {
                    continue;
                }

                declarations.push(PermissionDeclaration {
                    name: slug.derive_display_name(),
                    description: entry.description().map(str::to_owned),
                    slug,
                });
            }
        }

        Ok(declarations)
    }
}
