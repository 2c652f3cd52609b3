use std::fmt;

use serde::{Deserialize, Serialize};

// GTFS identifiers are opaque strings. Each table gets its own type, so a trip_id can't be used to
// look up a stop by accident.
macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: Into<String>>(raw: S) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(StopID);
string_id!(RouteID);
string_id!(TripID);
string_id!(ShapeID);
string_id!(ServiceID);
string_id!(BlockID);
