//! Strongly-typed ID newtypes for domain entities.
//!
//! Branch and leaf nodes of a program tree share the UUID space but never the
//! type: an [`EducationGroupYearId`] cannot be compared with a
//! [`LearningUnitYearId`] even when both wrap the same UUID.
//!
//! ```ignore
//! use campus_models::ids::{EducationGroupYearId, LearningUnitYearId};
//!
//! fn attach(parent: EducationGroupYearId, leaf: LearningUnitYearId) { /* ... */ }
//! ```

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Generates a `Uuid` newtype with serde, sqlx and OpenAPI support.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
        #[schema(value_type = String, format = "uuid")]
        pub struct $name(pub Uuid);

        impl $name {
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[inline]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Useful for constants and fixtures.
            #[inline]
            pub const fn from_u128(v: u128) -> Self {
                Self(Uuid::from_u128(v))
            }

            #[inline]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            #[inline]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            #[inline]
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            #[inline]
            fn from(id: $name) -> Uuid {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <Uuid as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <Uuid as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <Uuid as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <Uuid as Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        // `= ANY($1)` queries bind slices of ids
        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <Uuid as PgHasArrayType>::array_type_info()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Uuid::deserialize(deserializer).map(Self)
            }
        }
    };
}

define_id!(
    /// Identity of an academic calendar window.
    AcademicEventId
);

define_id!(
    /// Identity of a branch node (training, mini-training or group) for one year.
    EducationGroupYearId
);

define_id!(
    /// Identity of a leaf node (learning unit) for one year.
    LearningUnitYearId
);

define_id!(
    /// Identity of a parent/child link in a program tree.
    LinkId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_str_and_display() {
        let id: LinkId = "12345678-1234-1234-1234-123456789abc".parse().unwrap();
        assert_eq!(id.to_string(), "12345678-1234-1234-1234-123456789abc");
        assert_eq!(
            id.into_inner(),
            Uuid::from_u128(0x12345678_1234_1234_1234_123456789abc)
        );
    }

    #[test]
    fn test_id_from_str_trims_whitespace() {
        let id: EducationGroupYearId = " 12345678-1234-1234-1234-123456789abc ".parse().unwrap();
        assert_eq!(id, EducationGroupYearId::from_u128(0x12345678_1234_1234_1234_123456789abc));
    }

    #[test]
    fn test_id_from_str_invalid() {
        assert!("not-a-uuid".parse::<LearningUnitYearId>().is_err());
    }

    #[test]
    fn test_id_debug_names_the_type() {
        let id = AcademicEventId::from_u128(1);
        assert!(format!("{:?}", id).starts_with("AcademicEventId("));
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = EducationGroupYearId::from_u128(0x12345678_1234_1234_1234_123456789abc);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""12345678-1234-1234-1234-123456789abc""#);
        let back: EducationGroupYearId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
