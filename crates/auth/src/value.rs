//! Value codec: domain objects to the policy service's typed references.

use serde::{Deserialize, Serialize};

use gitclub_core::{Entity, Issue, Repository, User};

/// Kind used for plain string arguments (e.g. role or relation names).
pub const STRING_KIND: &str = "String";

/// A typed policy reference.
///
/// Both fields are optional: a reference naming only a kind (or nothing at
/// all) is an unbound pattern, valid only in queries and deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Value {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            id: Some(id.into()),
        }
    }

    /// A reference to "any instance of `kind`".
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            id: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(STRING_KIND, s)
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Both kind and identifier are present.
    pub fn is_bound(&self) -> bool {
        self.kind.is_some() && self.id.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.id.is_none()
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}:{}",
            self.kind.as_deref().unwrap_or("_"),
            self.id.as_deref().unwrap_or("_")
        )
    }
}

/// An argument before encoding, classified by input shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Plain string input.
    Str(String),
    /// An already-shaped (possibly partial) reference, passed through.
    Ref(Value),
    /// No specific target.
    Null,
    /// A typed domain object.
    Object(Value),
}

impl Arg {
    /// Encode into a wire `Value`.
    ///
    /// # Panics
    ///
    /// A partial reference is a caller contract violation unless
    /// `allow_unbound` is set.
    pub fn encode(&self, allow_unbound: bool) -> Value {
        match self {
            Arg::Str(s) => Value::string(s.clone()),
            Arg::Ref(v) => {
                assert!(
                    allow_unbound || v.is_bound(),
                    "partial reference {v} passed where a bound value is required"
                );
                v.clone()
            }
            Arg::Null => Value::empty(),
            Arg::Object(v) => v.clone(),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Arg::Str(s.into())
    }
}

/// Conversion into a policy argument.
pub trait ToValue {
    fn to_arg(&self) -> Arg;
}

impl ToValue for str {
    fn to_arg(&self) -> Arg {
        Arg::Str(self.to_string())
    }
}

impl ToValue for String {
    fn to_arg(&self) -> Arg {
        Arg::Str(self.clone())
    }
}

impl ToValue for Value {
    fn to_arg(&self) -> Arg {
        Arg::Ref(self.clone())
    }
}

impl ToValue for Arg {
    fn to_arg(&self) -> Arg {
        self.clone()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_arg(&self) -> Arg {
        match self {
            Some(v) => v.to_arg(),
            None => Arg::Null,
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_arg(&self) -> Arg {
        (**self).to_arg()
    }
}

/// Encode a typed domain object as `{kind: KIND, id: string(id)}`.
pub fn entity_value<E: Entity>(entity: &E) -> Value {
    Value::new(E::KIND, entity.id().to_string())
}

macro_rules! impl_entity_to_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToValue for $t {
                fn to_arg(&self) -> Arg {
                    Arg::Object(entity_value(self))
                }
            }
        )*
    };
}

impl_entity_to_value!(User, Repository, Issue);

impl<T: ToValue + ?Sized> From<&T> for Arg {
    fn from(value: &T) -> Self {
        value.to_arg()
    }
}

/// Encode any supported input as a policy `Value`.
///
/// # Panics
///
/// See [`Arg::encode`].
pub fn to_value<T: ToValue + ?Sized>(obj: &T, allow_unbound: bool) -> Value {
    obj.to_arg().encode(allow_unbound)
}
