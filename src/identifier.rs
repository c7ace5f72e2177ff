//! Plan identifiers: owner/name URLs and owner/name/revision IDs.
//!
//! Both forms are only ever built by parsing their canonical string, so a
//! value in hand has already passed the owner and name grammars.
//! - `PlanUrl`: `owner/name`, the logical (mutable) plan.
//! - `PlanId`: `owner/name/revision`, one released snapshot.
//! - `PlanOwner`: owner-only entry point, used when listing an owner's plans.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// User-name style owners, optionally qualified with a domain.
static VALID_OWNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.+-]*[a-zA-Z0-9](@[a-zA-Z0-9][a-zA-Z0-9.-]*)?$")
        .expect("owner grammar compiles")
});

static VALID_PLAN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z](-?[a-z0-9]+)+$").expect("plan name grammar compiles"));

// schema:[~user/][series/]name[-revision]
static VALID_CHARM_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(cs|local):",
        r"(~[a-zA-Z0-9][a-zA-Z0-9.+-]*[a-zA-Z0-9](@[a-zA-Z0-9][a-zA-Z0-9.-]*)?/)?",
        r"([a-z]+[a-z0-9]*/)?",
        r"[a-z][a-z0-9]*(-[a-z0-9]*[a-z][a-z0-9]*)*",
        r"(-[0-9]+)?$",
    ))
    .expect("charm url grammar compiles")
});

/// Reports whether `owner` is an acceptable plan owner.
pub fn is_valid_owner_name(owner: &str) -> bool {
    VALID_OWNER.is_match(owner)
}

/// Reports whether `name` is an acceptable plan name.
pub fn is_valid_plan_name(name: &str) -> bool {
    VALID_PLAN_NAME.is_match(name)
}

/// Reports whether `url` is a well-formed charm URL such as
/// `cs:~owner/trusty/app-3` or `local:app`.
pub fn is_valid_charm_url(url: &str) -> bool {
    VALID_CHARM_URL.is_match(url)
}

/// The identifier component a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    PlanUrl,
    PlanId,
    Owner,
    Name,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Component::PlanUrl => "plan url",
            Component::PlanId => "plan id",
            Component::Owner => "plan owner",
            Component::Name => "plan name",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("{component} {value:?} not valid")]
    NotValid { component: Component, value: String },

    #[error("invalid revision format: {source}")]
    RevisionFormat {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("revision must be greater than 0")]
    RevisionNotPositive { revision: i64 },

    #[error("invalid plan id: {0}")]
    InvalidPlanId(Box<IdentifierError>),
}

impl IdentifierError {
    fn not_valid(component: Component, value: &str) -> Self {
        IdentifierError::NotValid {
            component,
            value: value.to_string(),
        }
    }

    /// The component that failed validation, if the failure is a grammar one.
    pub fn component(&self) -> Option<Component> {
        match self {
            IdentifierError::NotValid { component, .. } => Some(*component),
            IdentifierError::InvalidPlanId(inner) => inner.component(),
            _ => None,
        }
    }
}

/// Owner of a plan: a user or group name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanOwner(String);

impl PlanOwner {
    /// Parses an owner-only identifier such as `canonical`.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        if !is_valid_owner_name(s) {
            return Err(IdentifierError::not_valid(Component::Owner, s));
        }
        Ok(PlanOwner(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A plan addressed by owner and name, without a revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlanUrl {
    owner: String,
    name: String,
}

impl PlanUrl {
    /// Parses `owner/name`. Exactly two segments are accepted.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let parts: Vec<&str> = s.split('/').collect();
        let url = match parts.as_slice() {
            [owner, name] => PlanUrl {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            _ => return Err(IdentifierError::not_valid(Component::PlanUrl, s)),
        };
        url.validate()?;
        Ok(url)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks the owner and name against their grammars.
    pub fn validate(&self) -> Result<(), IdentifierError> {
        if !is_valid_owner_name(&self.owner) {
            return Err(IdentifierError::not_valid(Component::Owner, &self.owner));
        }
        if !is_valid_plan_name(&self.name) {
            return Err(IdentifierError::not_valid(Component::Name, &self.name));
        }
        Ok(())
    }

    /// Pins this plan to a revision. The result is not validated; call
    /// [`PlanId::validate`] before sending it anywhere.
    pub fn revision(&self, revision: u64) -> PlanId {
        PlanId {
            url: self.clone(),
            revision,
        }
    }

    pub fn path_segments(&self) -> [&str; 2] {
        [&self.owner, &self.name]
    }
}

impl fmt::Display for PlanUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for PlanUrl {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanUrl::parse(s)
    }
}

impl TryFrom<String> for PlanUrl {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PlanUrl::parse(&value)
    }
}

impl From<PlanUrl> for String {
    fn from(url: PlanUrl) -> Self {
        url.to_string()
    }
}

/// One immutable revision of a plan.
///
/// A revision of `0` means "unspecified" and is only produced by
/// [`PlanId::parse_with_optional_revision`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlanId {
    url: PlanUrl,
    revision: u64,
}

impl PlanId {
    /// Parses `owner/name/revision`; the revision must be greater than zero.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let parts: Vec<&str> = s.split('/').collect();
        let id = match parts.as_slice() {
            [owner, name, revision] => Self::from_parts(s, owner, name, revision)?,
            _ => return Err(IdentifierError::not_valid(Component::PlanId, s)),
        };
        id.validate()?;
        Ok(id)
    }

    /// Parses either `owner/name` (revision 0) or `owner/name/revision`.
    pub fn parse_with_optional_revision(s: &str) -> Result<Self, IdentifierError> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [owner, name, revision] => {
                let id = Self::from_parts(s, owner, name, revision)?;
                id.validate()?;
                Ok(id)
            }
            [owner, name] => {
                let url = Self::url_part(s, owner, name)?;
                Ok(PlanId { url, revision: 0 })
            }
            _ => Err(IdentifierError::not_valid(Component::PlanId, s)),
        }
    }

    // The revision is checked for format before the owner/name pair; a
    // negative number is a format success and is rejected by validate().
    fn from_parts(
        input: &str,
        owner: &str,
        name: &str,
        revision: &str,
    ) -> Result<Self, IdentifierError> {
        let parsed: i64 = revision
            .parse()
            .map_err(|source| IdentifierError::RevisionFormat {
                value: revision.to_string(),
                source,
            })?;
        let url = Self::url_part(input, owner, name)?;
        if parsed <= 0 {
            return Err(IdentifierError::RevisionNotPositive { revision: parsed });
        }
        Ok(PlanId {
            url,
            revision: parsed as u64,
        })
    }

    fn url_part(input: &str, owner: &str, name: &str) -> Result<PlanUrl, IdentifierError> {
        let url = PlanUrl {
            owner: owner.to_string(),
            name: name.to_string(),
        };
        url.validate()
            .map_err(|_| IdentifierError::not_valid(Component::PlanId, input))?;
        Ok(url)
    }

    pub fn url(&self) -> &PlanUrl {
        &self.url
    }

    pub fn owner(&self) -> &str {
        self.url.owner()
    }

    pub fn name(&self) -> &str {
        self.url.name()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when the id came from the optional-revision parser without one.
    pub fn has_revision(&self) -> bool {
        self.revision > 0
    }

    pub fn validate(&self) -> Result<(), IdentifierError> {
        if self.revision == 0 {
            return Err(IdentifierError::RevisionNotPositive { revision: 0 });
        }
        self.url
            .validate()
            .map_err(|err| IdentifierError::InvalidPlanId(Box::new(err)))
    }

    /// URL path segments; the revision is omitted when unspecified.
    pub fn path_segments(&self) -> Vec<String> {
        let mut segments = vec![self.url.owner.clone(), self.url.name.clone()];
        if self.has_revision() {
            segments.push(self.revision.to_string());
        }
        segments
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.url, self.revision)
    }
}

impl FromStr for PlanId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanId::parse(s)
    }
}

impl TryFrom<String> for PlanId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PlanId::parse(&value)
    }
}

impl From<PlanId> for String {
    fn from(id: PlanId) -> Self {
        id.to_string()
    }
}
