//! OpenAPI version policy.
//!
//! OpenAPI 2 (Swagger) and OpenAPI 3 disagree on where reusable components live and how
//! they are referenced. [`VersionPolicy`] keeps every such difference in one place so the rest
//! of the crate only asks questions ("where does a schema reference point?") and never branches
//! on the major version itself.

use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::registry::ComponentKind;

const METHODS_V2: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];
const METHODS_V3: &[&str] = &[
    "get", "post", "put", "patch", "delete", "head", "options", "trace",
];

/// The supported OpenAPI major versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorVersion {
    /// OpenAPI 2.x (Swagger): flat `definitions`, `parameters`, `responses` sections.
    V2,
    /// OpenAPI 3.x: everything reusable lives under `components`.
    V3,
}

/// Structural rules of one OpenAPI version.
///
/// # Example
///
/// ```rust
/// use specmill_core::{ComponentKind, VersionPolicy};
///
/// let v2: VersionPolicy = "2.0".parse()?;
/// assert_eq!(v2.ref_path(ComponentKind::Schema, "Pet")?, "#/definitions/Pet");
///
/// let v3: VersionPolicy = "3.0.2".parse()?;
/// assert_eq!(v3.ref_path(ComponentKind::Schema, "Pet")?, "#/components/schemas/Pet");
/// # Ok::<(), specmill_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    major: MajorVersion,
    minor: u64,
    patch: u64,
    raw: String,
}

impl VersionPolicy {
    /// Parses a version string such as `2.0`, `3.0.2` or `3.1.0`.
    ///
    /// Minor and patch components are optional. Only versions `>= 2.0` and `< 4.0` are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] when the string is not a dotted numeric version or
    /// when the major version is neither 2 nor 3.
    pub fn parse(version: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidVersion {
            version: version.to_string(),
        };

        let trimmed = version.trim();
        let mut parts = trimmed.split('.');
        let mut next_number = |required: bool| -> Result<u64, Error> {
            match parts.next() {
                Some(part) if !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit()) => {
                    part.parse().map_err(|_| invalid())
                }
                None if !required => Ok(0),
                _ => Err(invalid()),
            }
        };

        let major = next_number(true)?;
        let minor = next_number(false)?;
        let patch = next_number(false)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let major = match major {
            2 => MajorVersion::V2,
            3 => MajorVersion::V3,
            _ => return Err(invalid()),
        };

        Ok(Self {
            major,
            minor,
            patch,
            raw: trimmed.to_string(),
        })
    }

    /// The major version, for branching.
    #[must_use]
    pub fn major(&self) -> MajorVersion {
        self.major
    }

    /// The `(major, minor, patch)` triple.
    #[must_use]
    pub fn triple(&self) -> (u64, u64, u64) {
        let major = match self.major {
            MajorVersion::V2 => 2,
            MajorVersion::V3 => 3,
        };
        (major, self.minor, self.patch)
    }

    /// The top-level key carrying the OpenAPI version: `swagger` or `openapi`.
    #[must_use]
    pub fn version_key(&self) -> &'static str {
        match self.major {
            MajorVersion::V2 => "swagger",
            MajorVersion::V3 => "openapi",
        }
    }

    /// The name of the section holding components of `kind`, if the version has one.
    ///
    /// Under OpenAPI 2 the sections are top-level keys; under OpenAPI 3 they are
    /// children of `components`.
    #[must_use]
    pub fn section_name(&self, kind: ComponentKind) -> Option<&'static str> {
        match (self.major, kind) {
            (MajorVersion::V2, ComponentKind::Schema) => Some("definitions"),
            (MajorVersion::V2, ComponentKind::SecurityScheme) => Some("securityDefinitions"),
            (MajorVersion::V2, ComponentKind::Header | ComponentKind::Example) => None,
            (MajorVersion::V2, ComponentKind::Parameter | ComponentKind::Response)
            | (MajorVersion::V3, _) => Some(kind.section()),
        }
    }

    /// Whether components of `kind` can be registered under this version.
    #[must_use]
    pub fn supports(&self, kind: ComponentKind) -> bool {
        self.section_name(kind).is_some()
    }

    /// Builds the `$ref` target of a component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedComponent`] when the version has no section for `kind`.
    pub fn ref_path(&self, kind: ComponentKind, name: &str) -> Result<String, Error> {
        let section = self
            .section_name(kind)
            .ok_or_else(|| self.unsupported(kind))?;
        let path = match self.major {
            MajorVersion::V2 => format!("#/{section}/{name}"),
            MajorVersion::V3 => format!("#/components/{section}/{name}"),
        };
        Ok(path)
    }

    /// Builds a `{"$ref": ...}` mapping pointing to a component.
    ///
    /// # Errors
    ///
    /// Same as [`VersionPolicy::ref_path`].
    pub fn reference(&self, kind: ComponentKind, name: &str) -> Result<serde_json::Value, Error> {
        let path = self.ref_path(kind, name)?;
        Ok(serde_json::json!({ "$ref": path }))
    }

    /// Whether a parameter nests its type under a `schema` key.
    ///
    /// OpenAPI 2 only allows this for `in: body` parameters; other parameters carry
    /// `type`/`format` directly.
    #[must_use]
    pub fn supports_inline_schema_in_parameter(&self) -> bool {
        self.major == MajorVersion::V3
    }

    /// The keyword marking a schema as nullable.
    #[must_use]
    pub fn nullable_key(&self) -> &'static str {
        match self.major {
            MajorVersion::V2 => "x-nullable",
            MajorVersion::V3 => "nullable",
        }
    }

    /// The HTTP methods allowed as operation keys of a path item.
    #[must_use]
    pub fn valid_methods(&self) -> &'static [&'static str] {
        match self.major {
            MajorVersion::V2 => METHODS_V2,
            MajorVersion::V3 => METHODS_V3,
        }
    }

    pub(crate) fn unsupported(&self, kind: ComponentKind) -> Error {
        Error::UnsupportedComponent {
            kind,
            version: self.raw.clone(),
        }
    }
}

impl FromStr for VersionPolicy {
    type Err = Error;

    fn from_str(version: &str) -> Result<Self, Self::Err> {
        Self::parse(version)
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
