//! Wire-compatible decoding of records whose JSON field names were renamed
//! between API generations (`env-uuid` became `model-uuid`, `service-name`
//! became `application`).
//!
//! Every compat record keeps its canonical field under the legacy name. On
//! decode the payload is first read as a JSON object, the rename table is
//! applied to it, and only then is the canonical shape decoded. Encoding
//! always writes the legacy names.

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifier::is_valid_charm_url;

/// One field renamed between API generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenamedField {
    pub legacy: &'static str,
    pub modern: &'static str,
}

pub const MODEL_UUID: RenamedField = RenamedField {
    legacy: "env-uuid",
    modern: "model-uuid",
};

pub const APPLICATION: RenamedField = RenamedField {
    legacy: "service-name",
    modern: "application",
};

/// Renames shared by all authorization records.
pub const AUTHORIZATION_RENAMES: &[RenamedField] = &[MODEL_UUID, APPLICATION];

/// A record that accepts both legacy and modern field names.
pub trait CompatRecord: DeserializeOwned {
    const RENAMES: &'static [RenamedField];
}

/// Decodes a single JSON object into `T`, accepting either naming scheme.
pub fn decode<T: CompatRecord>(raw: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(raw)
}

/// Folds modern-named fields onto their legacy (canonical) names.
///
/// The legacy value wins when it is a non-empty string; otherwise the modern
/// value is used. `null` counts as empty. Any other JSON type in a renamed
/// field is reported as a type error, as a direct decode would.
pub fn reconcile(
    mut object: Map<String, Value>,
    renames: &[RenamedField],
) -> Result<Map<String, Value>, serde_json::Error> {
    for rename in renames {
        let legacy = take_string(&mut object, rename.legacy)?;
        let modern = take_string(&mut object, rename.modern)?;
        let canonical = match (legacy, modern) {
            (Some(legacy), _) if !legacy.is_empty() => Some(legacy),
            (_, Some(modern)) => Some(modern),
            (legacy, None) => legacy,
        };
        if let Some(value) = canonical {
            object.insert(rename.legacy.to_string(), Value::String(value));
        }
    }
    Ok(object)
}

fn take_string(
    object: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<String>, serde_json::Error> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(de::Error::invalid_type(unexpected(&other), &"a string")),
    }
}

fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Bool(b) => de::Unexpected::Bool(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) => de::Unexpected::Float(f),
            None => de::Unexpected::Other("number"),
        },
        Value::Array(_) => de::Unexpected::Seq,
        Value::Object(_) => de::Unexpected::Map,
        Value::String(s) => de::Unexpected::Str(s),
        Value::Null => de::Unexpected::Unit,
    }
}

/// Reads `value` as an object, reconciles it and decodes the canonical shape.
fn decode_reconciled<T: DeserializeOwned>(
    value: Value,
    renames: &[RenamedField],
) -> Result<T, serde_json::Error> {
    let object = match value {
        Value::Object(object) => object,
        other => return Err(de::Error::invalid_type(unexpected(&other), &"a JSON object")),
    };
    serde_json::from_value(Value::Object(reconcile(object, renames)?))
}

/// Declares a compat record: the public canonical struct plus a private
/// mirror with the same fields that performs the direct decode after
/// reconciliation with the record's rename table.
macro_rules! compat_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident via $mirror:ident with $renames:path {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident : $ty:ty,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
        #[serde(try_from = "serde_json::Value")]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        #[derive(Deserialize)]
        struct $mirror {
            $(
                $(#[$fmeta])*
                $field: $ty,
            )*
        }

        impl From<$mirror> for $name {
            fn from(mirror: $mirror) -> Self {
                $name {
                    $( $field: mirror.$field, )*
                }
            }
        }

        impl TryFrom<Value> for $name {
            type Error = serde_json::Error;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                decode_reconciled::<$mirror>(value, <$name as CompatRecord>::RENAMES).map($name::from)
            }
        }

        impl CompatRecord for $name {
            const RENAMES: &'static [RenamedField] = $renames;
        }
    };
}

compat_record! {
    /// Request for a plan authorization.
    pub struct AuthorizationRequest via AuthorizationRequestFields with AUTHORIZATION_RENAMES {
        #[serde(rename = "env-uuid", default)]
        pub environment_uuid: String,
        #[serde(rename = "charm-url", default)]
        pub charm_url: String,
        #[serde(rename = "service-name", default)]
        pub service_name: String,
        #[serde(rename = "plan-url", default)]
        pub plan_url: String,
        #[serde(default)]
        pub budget: String,
        #[serde(default)]
        pub limit: String,
    }
}

compat_record! {
    /// An issued authorization.
    pub struct Authorization via AuthorizationFields with AUTHORIZATION_RENAMES {
        #[serde(rename = "authorization-id", default)]
        pub authorization_id: String,
        #[serde(default)]
        pub user: String,
        #[serde(rename = "plan", default)]
        pub plan_url: String,
        #[serde(rename = "env-uuid", default)]
        pub environment_uuid: String,
        #[serde(rename = "charm-url", default)]
        pub charm_url: String,
        #[serde(rename = "service-name", default)]
        pub service_name: String,
        #[serde(rename = "created-on", default)]
        pub created_on: Option<DateTime<Utc>>,
        #[serde(rename = "credentials-id", default)]
        pub credentials_id: String,
    }
}

compat_record! {
    /// Query over authorization records. Empty fields do not constrain.
    pub struct AuthorizationQuery via AuthorizationQueryFields with AUTHORIZATION_RENAMES {
        #[serde(rename = "authorization-id", default)]
        pub authorization_id: String,
        #[serde(default)]
        pub user: String,
        #[serde(rename = "plan", default)]
        pub plan_url: String,
        #[serde(rename = "env-uuid", default)]
        pub environment_uuid: String,
        #[serde(rename = "charm-url", default)]
        pub charm_url: String,
        #[serde(rename = "service-name", default)]
        pub service_name: String,
    }
}

compat_record! {
    /// Authorization request made by a reseller on behalf of a user.
    pub struct ResellerAuthorizationRequest via ResellerAuthorizationRequestFields with AUTHORIZATION_RENAMES {
        #[serde(default)]
        pub reseller: String,
        #[serde(default)]
        pub user: String,
        #[serde(rename = "env-uuid", default)]
        pub environment_uuid: String,
        #[serde(rename = "charm-url", default)]
        pub charm_url: String,
        #[serde(rename = "service-name", default)]
        pub service_name: String,
        #[serde(rename = "plan-url", default)]
        pub plan_url: String,
    }
}

compat_record! {
    /// Authorization issued to a reseller.
    pub struct ResellerAuthorization via ResellerAuthorizationFields with AUTHORIZATION_RENAMES {
        #[serde(rename = "authorization-id", default)]
        pub authorization_id: String,
        #[serde(default)]
        pub reseller: String,
        #[serde(default)]
        pub user: String,
        #[serde(rename = "plan", default)]
        pub plan_url: String,
        #[serde(rename = "env-uuid", default)]
        pub environment_uuid: String,
        #[serde(rename = "charm-url", default)]
        pub charm_url: String,
        #[serde(rename = "service-name", default)]
        pub service_name: String,
        #[serde(rename = "created-on", default)]
        pub created_on: Option<DateTime<Utc>>,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationRequestError {
    #[error("invalid environment UUID: {0:?}")]
    EnvironmentUuid(String),
    #[error("undefined service name")]
    MissingServiceName,
    #[error("invalid service name: {0:?}")]
    ServiceName(String),
    #[error("undefined charm url")]
    MissingCharmUrl,
    #[error("invalid charm url: {0:?}")]
    CharmUrl(String),
    #[error("undefined plan url")]
    MissingPlanUrl,
    #[error("unspecified budget")]
    MissingBudget,
    #[error("unspecified limit")]
    MissingLimit,
}

// Application names: lowercase words joined by single hyphens, where no word
// may be purely numeric.
fn is_valid_application_name(name: &str) -> bool {
    let mut words = name.split('-');
    let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    starts_with_letter
        && words.all(|word| {
            !word.is_empty()
                && word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && !word.chars().all(|c| c.is_ascii_digit())
        })
}

impl AuthorizationRequest {
    pub fn validate(&self) -> Result<(), AuthorizationRequestError> {
        if uuid::Uuid::parse_str(&self.environment_uuid).is_err() {
            return Err(AuthorizationRequestError::EnvironmentUuid(
                self.environment_uuid.clone(),
            ));
        }
        if self.service_name.is_empty() {
            return Err(AuthorizationRequestError::MissingServiceName);
        }
        if !is_valid_application_name(&self.service_name) {
            return Err(AuthorizationRequestError::ServiceName(self.service_name.clone()));
        }
        if self.charm_url.is_empty() {
            return Err(AuthorizationRequestError::MissingCharmUrl);
        }
        if !is_valid_charm_url(&self.charm_url) {
            return Err(AuthorizationRequestError::CharmUrl(self.charm_url.clone()));
        }
        if self.plan_url.is_empty() {
            return Err(AuthorizationRequestError::MissingPlanUrl);
        }
        match (self.budget.is_empty(), self.limit.is_empty()) {
            (true, false) => Err(AuthorizationRequestError::MissingBudget),
            (false, true) => Err(AuthorizationRequestError::MissingLimit),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LEGACY_REQUEST: &str = r#"{
        "env-uuid": "env-is-model",
        "charm-url": "some-charm",
        "service-name": "service-is-application",
        "plan-url": "some-plan",
        "budget": "some-budget",
        "limit": "some-limit"
    }"#;

    const MODERN_REQUEST: &str = r#"{
        "model-uuid": "env-is-model",
        "charm-url": "some-charm",
        "application": "service-is-application",
        "plan-url": "some-plan",
        "budget": "some-budget",
        "limit": "some-limit"
    }"#;

    #[test]
    fn authorization_request_legacy_and_modern_agree() {
        let legacy: AuthorizationRequest = decode(LEGACY_REQUEST.as_bytes()).expect("legacy");
        let modern: AuthorizationRequest = decode(MODERN_REQUEST.as_bytes()).expect("modern");
        assert_eq!(legacy, modern);
        assert_eq!(legacy.environment_uuid, "env-is-model");
        assert_eq!(legacy.service_name, "service-is-application");
        assert_eq!(legacy.budget, "some-budget");
    }

    #[test]
    fn names_can_be_mixed_per_field() {
        let raw = br#"{"env-uuid":"X","application":"Y","charm-url":"c"}"#;
        let req: AuthorizationRequest = decode(raw).unwrap();
        assert_eq!(req.environment_uuid, "X");
        assert_eq!(req.service_name, "Y");
    }

    #[test]
    fn legacy_wins_only_when_non_empty() {
        let raw = br#"{"env-uuid":"old","model-uuid":"new","service-name":"","application":"app"}"#;
        let req: AuthorizationRequest = decode(raw).unwrap();
        assert_eq!(req.environment_uuid, "old");
        assert_eq!(req.service_name, "app");

        let raw = br#"{"env-uuid":null,"model-uuid":"new"}"#;
        let req: AuthorizationRequest = decode(raw).unwrap();
        assert_eq!(req.environment_uuid, "new");
    }

    #[test]
    fn plain_serde_decode_is_compatible_too() {
        let req: AuthorizationRequest = serde_json::from_str(MODERN_REQUEST).unwrap();
        assert_eq!(req.environment_uuid, "env-is-model");
    }

    #[test]
    fn authorization_legacy_and_modern_agree() {
        let legacy = br#"{
            "authorization-id": "some-authorization",
            "user": "some-user",
            "plan": "some-plan",
            "env-uuid": "env-is-model",
            "charm-url": "some-charm",
            "service-name": "service-is-application",
            "created-on": "2016-08-06T12:34:56Z",
            "credentials-id": "some-creds"
        }"#;
        let modern = br#"{
            "authorization-id": "some-authorization",
            "user": "some-user",
            "plan": "some-plan",
            "model-uuid": "env-is-model",
            "charm-url": "some-charm",
            "application": "service-is-application",
            "created-on": "2016-08-06T12:34:56Z",
            "credentials-id": "some-creds"
        }"#;
        let a: Authorization = decode(legacy).unwrap();
        let b: Authorization = decode(modern).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.created_on,
            Some(Utc.with_ymd_and_hms(2016, 8, 6, 12, 34, 56).unwrap())
        );
        assert_eq!(a.credentials_id, "some-creds");
    }

    #[test]
    fn authorization_query_legacy_and_modern_agree() {
        let legacy = br#"{"authorization-id":"a","user":"u","plan":"p","env-uuid":"m","charm-url":"c","service-name":"s"}"#;
        let modern = br#"{"authorization-id":"a","user":"u","plan":"p","model-uuid":"m","charm-url":"c","application":"s"}"#;
        let a: AuthorizationQuery = decode(legacy).unwrap();
        let b: AuthorizationQuery = decode(modern).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.environment_uuid, "m");
        assert_eq!(a.service_name, "s");
    }

    #[test]
    fn reseller_records_reconcile() {
        let legacy = br#"{"reseller":"r","user":"u","env-uuid":"m","service-name":"s","plan-url":"p"}"#;
        let modern = br#"{"reseller":"r","user":"u","model-uuid":"m","application":"s","plan-url":"p"}"#;
        let a: ResellerAuthorizationRequest = decode(legacy).unwrap();
        let b: ResellerAuthorizationRequest = decode(modern).unwrap();
        assert_eq!(a, b);

        let auth: ResellerAuthorization =
            decode(br#"{"authorization-id":"id","model-uuid":"m","application":"s"}"#).unwrap();
        assert_eq!(auth.environment_uuid, "m");
        assert_eq!(auth.service_name, "s");
    }

    #[test]
    fn structural_errors_are_not_hidden() {
        assert!(decode::<AuthorizationRequest>(b"{not json").is_err());
        assert!(decode::<AuthorizationRequest>(b"[]").is_err());
        // wrong type in a plain field
        assert!(decode::<AuthorizationRequest>(br#"{"budget": 10}"#).is_err());
        // wrong type in a renamed field, under either name
        assert!(decode::<AuthorizationRequest>(br#"{"env-uuid": 1}"#).is_err());
        assert!(decode::<AuthorizationRequest>(br#"{"application": true}"#).is_err());
        assert!(decode::<Authorization>(br#"{"created-on": "yesterday"}"#).is_err());
    }

    #[test]
    fn records_carry_their_rename_tables() {
        assert_eq!(AuthorizationRequest::RENAMES, AUTHORIZATION_RENAMES);
        assert_eq!(Authorization::RENAMES, AUTHORIZATION_RENAMES);
        assert_eq!(AuthorizationQuery::RENAMES, AUTHORIZATION_RENAMES);
        assert_eq!(ResellerAuthorizationRequest::RENAMES, AUTHORIZATION_RENAMES);
        assert_eq!(ResellerAuthorization::RENAMES, AUTHORIZATION_RENAMES);
    }

    #[test]
    fn reconcile_applies_any_table() {
        let table = [RenamedField {
            legacy: "old-name",
            modern: "new-name",
        }];
        let object = match serde_json::json!({"new-name": "v", "env-uuid": "untouched"}) {
            Value::Object(object) => object,
            _ => unreachable!(),
        };
        let reconciled = reconcile(object, &table).unwrap();
        assert_eq!(reconciled["old-name"], "v");
        assert!(reconciled.get("new-name").is_none());
        assert_eq!(reconciled["env-uuid"], "untouched");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = br#"{"model-uuid":"m","added-in-v3":{"x":1}}"#;
        let req: AuthorizationRequest = decode(raw).unwrap();
        assert_eq!(req.environment_uuid, "m");
    }

    #[test]
    fn encoding_uses_legacy_names_and_decodes_back() {
        let req: AuthorizationRequest = decode(MODERN_REQUEST.as_bytes()).unwrap();
        let encoded = serde_json::to_vec(&req).unwrap();
        let value: Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(value["env-uuid"], "env-is-model");
        assert_eq!(value["service-name"], "service-is-application");
        assert!(value.get("model-uuid").is_none());

        let again: AuthorizationRequest = decode(&encoded).unwrap();
        assert_eq!(again, req);
    }

    #[test]
    fn validate_authorization_request() {
        let mut req = AuthorizationRequest {
            environment_uuid: uuid::Uuid::new_v4().to_string(),
            charm_url: "cs:~testisv/app-1".to_string(),
            service_name: "app".to_string(),
            plan_url: "testisv/default".to_string(),
            budget: String::new(),
            limit: String::new(),
        };
        assert_eq!(req.validate(), Ok(()));

        req.budget = "personal".to_string();
        assert_eq!(req.validate(), Err(AuthorizationRequestError::MissingLimit));
        req.limit = "10".to_string();
        assert_eq!(req.validate(), Ok(()));

        req.charm_url = "some-charm".to_string();
        assert_eq!(
            req.validate(),
            Err(AuthorizationRequestError::CharmUrl("some-charm".to_string()))
        );
        assert_eq!(
            req.validate().unwrap_err().to_string(),
            r#"invalid charm url: "some-charm""#
        );
        req.charm_url = String::new();
        assert_eq!(req.validate(), Err(AuthorizationRequestError::MissingCharmUrl));
        req.charm_url = "cs:~testisv/trusty/app-1".to_string();
        assert_eq!(req.validate(), Ok(()));

        req.service_name = "App_1".to_string();
        assert!(matches!(req.validate(), Err(AuthorizationRequestError::ServiceName(_))));

        req.environment_uuid = "env-is-model".to_string();
        assert!(matches!(req.validate(), Err(AuthorizationRequestError::EnvironmentUuid(_))));
    }
}
