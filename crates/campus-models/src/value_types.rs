//! Strongly-typed value types with validation for domain primitives.
//!
//! - [`Block`]: the study years of a program a link belongs to, written as a
//!   string of ascending digits (`146` means years 1, 4 and 6)
//! - [`SessionNumber`]: exam session 1, 2 or 3
//!
//! ```ignore
//! use campus_models::value_types::Block;
//!
//! let block: Block = "146".parse().unwrap();
//! assert_eq!(block.block_repr(), "1 ; 4 ; 6");
//! assert!("1446".parse::<Block>().is_err());
//! ```

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Error type for value type parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTypeError {
    InvalidBlock(String),
    InvalidSessionNumber(String),
    /// A text value that names no variant of a closed enumeration.
    UnknownVariant {
        type_name: &'static str,
        value: String,
    },
}

impl std::error::Error for ValueTypeError {}

impl fmt::Display for ValueTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            Self::InvalidSessionNumber(msg) => write!(f, "Invalid session number: {}", msg),
            Self::UnknownVariant { type_name, value } => {
                write!(f, "'{}' is not a valid {}", value, type_name)
            }
        }
    }
}

// ============================================================================
// Block
// ============================================================================

/// Study years a link is offered in.
///
/// A block is a non-empty run of digits between 1 and 6, each digit at most
/// once, in strictly ascending order. It is stored as an integer (`146`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[schema(value_type = i32, example = 146)]
#[serde(into = "i32")]
pub struct Block(i32);

impl Block {
    pub const MAX_VALUE: u32 = 6;

    /// Validates a block given as an integer.
    pub fn new(value: i64) -> Result<Self, ValueTypeError> {
        if value <= 0 {
            return Err(ValueTypeError::InvalidBlock(format!(
                "{} is not a positive number",
                value
            )));
        }
        Self::parse_digits(&value.to_string())
    }

    fn parse_digits(raw: &str) -> Result<Self, ValueTypeError> {
        if raw.is_empty() {
            return Err(ValueTypeError::InvalidBlock("block cannot be empty".into()));
        }
        if raw.len() > Self::MAX_VALUE as usize {
            return Err(ValueTypeError::InvalidBlock(format!(
                "'{}' has more than {} years",
                raw,
                Self::MAX_VALUE
            )));
        }

        let mut previous = 0;
        for c in raw.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| ValueTypeError::InvalidBlock(format!("'{}' is not a number", raw)))?;
            if digit == 0 || digit > Self::MAX_VALUE {
                return Err(ValueTypeError::InvalidBlock(format!(
                    "year {} is outside 1..{}",
                    digit,
                    Self::MAX_VALUE
                )));
            }
            if digit <= previous {
                return Err(ValueTypeError::InvalidBlock(format!(
                    "'{}' must list each year once in ascending order",
                    raw
                )));
            }
            previous = digit;
        }

        // at most six digits, all below 7
        raw.parse::<i32>()
            .map(Self)
            .map_err(|e| ValueTypeError::InvalidBlock(e.to_string()))
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn years(&self) -> Vec<u32> {
        self.0
            .to_string()
            .chars()
            .filter_map(|c| c.to_digit(10))
            .collect()
    }

    /// Display form used on program sheets: `"1 ; 4 ; 6"`.
    pub fn block_repr(&self) -> String {
        self.years()
            .iter()
            .map(|year| year.to_string())
            .collect::<Vec<_>>()
            .join(" ; ")
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Block {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('-') {
            return Err(ValueTypeError::InvalidBlock(format!(
                "-{} is not a positive number",
                rest
            )));
        }
        Self::parse_digits(s)
    }
}

impl TryFrom<i64> for Block {
    type Error = ValueTypeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Block> for i32 {
    fn from(block: Block) -> i32 {
        block.0
    }
}

impl Type<sqlx::Postgres> for Block {
    fn type_info() -> PgTypeInfo {
        <i32 as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <i32 as Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, sqlx::Postgres> for Block {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for Block {
    fn decode(
        value: <sqlx::Postgres as Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

impl PgHasArrayType for Block {
    fn array_type_info() -> PgTypeInfo {
        <i32 as PgHasArrayType>::array_type_info()
    }
}

/// A block as submitted by a client, before grammar validation.
///
/// Accepts `146` or `"146"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BlockInput {
    Int(i64),
    Text(String),
}

impl BlockInput {
    pub fn parse(&self) -> Result<Block, ValueTypeError> {
        match self {
            Self::Int(value) => Block::new(*value),
            Self::Text(value) => value.parse(),
        }
    }
}

impl From<Block> for BlockInput {
    fn from(block: Block) -> Self {
        Self::Int(i64::from(block.0))
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        BlockInput::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SessionNumber
// ============================================================================

/// Exam session number within an academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[schema(value_type = i32, example = 1)]
#[serde(into = "i32")]
pub struct SessionNumber(i32);

impl SessionNumber {
    pub const FIRST: Self = Self(1);
    pub const SECOND: Self = Self(2);
    pub const THIRD: Self = Self(3);

    pub fn new(value: i32) -> Result<Self, ValueTypeError> {
        if (1..=3).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValueTypeError::InvalidSessionNumber(format!(
                "{} is not one of 1, 2, 3",
                value
            )))
        }
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for SessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SessionNumber> for i32 {
    fn from(session: SessionNumber) -> i32 {
        session.0
    }
}

impl TryFrom<i32> for SessionNumber {
    type Error = ValueTypeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for SessionNumber {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i32>()
            .map_err(|_| ValueTypeError::InvalidSessionNumber(format!("'{}' is not a number", s)))?;
        Self::new(value)
    }
}

impl Type<sqlx::Postgres> for SessionNumber {
    fn type_info() -> PgTypeInfo {
        <i32 as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <i32 as Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, sqlx::Postgres> for SessionNumber {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for SessionNumber {
    fn decode(
        value: <sqlx::Postgres as Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(raw)?)
    }
}

impl<'de> Deserialize<'de> for SessionNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}
