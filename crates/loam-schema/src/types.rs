//! Newtype wrappers for devfile identifiers.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Lower-cased form used for case-insensitive comparisons.
            pub fn normalized(&self) -> String {
                self.0.to_lowercase()
            }

            /// Case-insensitive equality against a user-supplied name.
            pub fn matches(&self, other: &str) -> bool {
                self.normalized() == other.to_lowercase()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Identifier of a devfile command, unique per manifest ignoring case.
    CommandId
);

string_newtype!(
    /// Name of a container component declared in the devfile.
    ComponentName
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_id_matches_ignoring_case() {
        let id = CommandId::new("Build");
        assert!(id.matches("build"));
        assert!(id.matches("BUILD"));
        assert!(!id.matches("run"));
        assert_eq!(id.normalized(), "build");
    }

    #[test]
    fn component_name_serde_is_transparent() {
        let name = ComponentName::new("runtime");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"runtime\"");
        let back: ComponentName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn display_keeps_original_case() {
        assert_eq!(CommandId::from("DevRun").to_string(), "DevRun");
    }
}
