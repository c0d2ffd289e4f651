//! Closed enumerations stored as `TEXT`.
//!
//! Every enum serializes to and parses from its SCREAMING_SNAKE_CASE name, so
//! the JSON value, the database value and the `FromStr` input are identical.

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use utoipa::openapi::{ObjectBuilder, RefOr, Schema, schema};
use utoipa::{PartialSchema, ToSchema};

use crate::value_types::ValueTypeError;

/// Generates a fieldless enum backed by a fixed text value per variant.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValueTypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ValueTypeError::UnknownVariant {
                        type_name: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str().to_string(), buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <String as Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(raw.parse::<Self>()?)
            }
        }

        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <String as PgHasArrayType>::array_type_info()
            }
        }
    };
}

text_enum!(
    /// Kind of academic calendar window.
    AcademicCalendarType {
        ScoresExamSubmission => "SCORES_EXAM_SUBMISSION",
        AttendanceMark => "ATTENDANCE_MARK",
        Deliberation => "DELIBERATION",
        ExamEnrollments => "EXAM_ENROLLMENTS",
        ScoresExamDiffusion => "SCORES_EXAM_DIFFUSION",
        TeachingChargeApplication => "TEACHING_CHARGE_APPLICATION",
        SummaryCourseSubmission => "SUMMARY_COURSE_SUBMISSION",
        EducationGroupEdition => "EDUCATION_GROUP_EDITION",
        LearningUnitEditionCentralManagers => "LEARNING_UNIT_EDITION_CENTRAL_MANAGERS",
        LearningUnitEditionFacultyManagers => "LEARNING_UNIT_EDITION_FACULTY_MANAGERS",
    }
);

text_enum!(
    /// Category of a branch node.
    NodeType {
        Training => "TRAINING",
        MiniTraining => "MINI_TRAINING",
        Group => "GROUP",
    }
);

text_enum!(
    GroupType {
        CommonCore => "COMMON_CORE",
        SubGroup => "SUB_GROUP",
        MinorListChoice => "MINOR_LIST_CHOICE",
        MajorListChoice => "MAJOR_LIST_CHOICE",
        OptionListChoice => "OPTION_LIST_CHOICE",
        ComplementaryModule => "COMPLEMENTARY_MODULE",
    }
);

text_enum!(
    MiniTrainingType {
        SocietyMinor => "SOCIETY_MINOR",
        AccessMinor => "ACCESS_MINOR",
        OpenMinor => "OPEN_MINOR",
        DisciplinaryComplementMinor => "DISCIPLINARY_COMPLEMENT_MINOR",
        Deepening => "DEEPENING",
        FsaSpeciality => "FSA_SPECIALITY",
        OptionTraining => "OPTION",
        MobilityPartnership => "MOBILITY_PARTNERSHIP",
    }
);

impl MiniTrainingType {
    pub const fn minors() -> &'static [MiniTrainingType] {
        &[
            Self::SocietyMinor,
            Self::AccessMinor,
            Self::OpenMinor,
            Self::DisciplinaryComplementMinor,
        ]
    }

    pub fn is_minor(&self) -> bool {
        Self::minors().contains(self)
    }
}

text_enum!(
    TrainingType {
        Bachelor => "BACHELOR",
        MasterMa => "MASTER_MA",
        MasterMs => "MASTER_MS",
        Aggregation => "AGGREGATION",
    }
);

text_enum!(
    /// Semantics of a parent/child link.
    ///
    /// A `REFERENCE` link shows the child's content in place rather than
    /// attaching the child itself.
    LinkType {
        Reference => "REFERENCE",
    }
);

/// Concrete type of a branch node, one of the three families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EducationGroupType {
    Group(GroupType),
    MiniTraining(MiniTrainingType),
    Training(TrainingType),
}

impl EducationGroupType {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Group(_) => NodeType::Group,
            Self::MiniTraining(_) => NodeType::MiniTraining,
            Self::Training(_) => NodeType::Training,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Group(t) => t.as_str(),
            Self::MiniTraining(t) => t.as_str(),
            Self::Training(t) => t.as_str(),
        }
    }

    pub fn is_minor_or_deepening(&self) -> bool {
        matches!(self, Self::MiniTraining(t) if t.is_minor() || *t == MiniTrainingType::Deepening)
    }
}

impl fmt::Display for EducationGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EducationGroupType {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(t) = s.parse::<GroupType>() {
            return Ok(Self::Group(t));
        }
        if let Ok(t) = s.parse::<MiniTrainingType>() {
            return Ok(Self::MiniTraining(t));
        }
        if let Ok(t) = s.parse::<TrainingType>() {
            return Ok(Self::Training(t));
        }
        Err(ValueTypeError::UnknownVariant {
            type_name: "EducationGroupType",
            value: s.trim().to_string(),
        })
    }
}

impl From<GroupType> for EducationGroupType {
    fn from(t: GroupType) -> Self {
        Self::Group(t)
    }
}

impl From<MiniTrainingType> for EducationGroupType {
    fn from(t: MiniTrainingType) -> Self {
        Self::MiniTraining(t)
    }
}

impl From<TrainingType> for EducationGroupType {
    fn from(t: TrainingType) -> Self {
        Self::Training(t)
    }
}

impl PartialSchema for EducationGroupType {
    fn schema() -> RefOr<Schema> {
        RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(schema::Type::String)
                .description(Some("Any GroupType, MiniTrainingType or TrainingType name"))
                .build(),
        ))
    }
}

impl ToSchema for EducationGroupType {
    fn name() -> Cow<'static, str> {
        Cow::Borrowed("EducationGroupType")
    }
}

impl Serialize for EducationGroupType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EducationGroupType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Type<sqlx::Postgres> for EducationGroupType {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, sqlx::Postgres> for EducationGroupType {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str().to_string(), buf)
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for EducationGroupType {
    fn decode(
        value: <sqlx::Postgres as Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(raw.parse::<Self>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_serde_uses_screaming_names() {
        let json = serde_json::to_string(&AcademicCalendarType::ScoresExamSubmission).unwrap();
        assert_eq!(json, r#""SCORES_EXAM_SUBMISSION""#);
        let back: AcademicCalendarType = serde_json::from_str(r#""ATTENDANCE_MARK""#).unwrap();
        assert_eq!(back, AcademicCalendarType::AttendanceMark);
    }

    #[test]
    fn test_text_enum_from_str_matches_as_str() {
        for reference in AcademicCalendarType::ALL {
            assert_eq!(reference.as_str().parse::<AcademicCalendarType>().unwrap(), *reference);
        }
        assert!("attendance_mark".parse::<AcademicCalendarType>().is_err());
    }

    #[test]
    fn test_minors() {
        assert_eq!(MiniTrainingType::minors().len(), 4);
        assert!(MiniTrainingType::OpenMinor.is_minor());
        assert!(!MiniTrainingType::Deepening.is_minor());
        assert!(!MiniTrainingType::FsaSpeciality.is_minor());
    }

    #[test]
    fn test_education_group_type_parses_any_family() {
        assert_eq!(
            "COMMON_CORE".parse::<EducationGroupType>().unwrap(),
            EducationGroupType::Group(GroupType::CommonCore)
        );
        assert_eq!(
            "DEEPENING".parse::<EducationGroupType>().unwrap().node_type(),
            NodeType::MiniTraining
        );
        assert_eq!(
            "BACHELOR".parse::<EducationGroupType>().unwrap().node_type(),
            NodeType::Training
        );
        assert!("UNKNOWN".parse::<EducationGroupType>().is_err());
    }

    #[test]
    fn test_minor_or_deepening() {
        assert!(EducationGroupType::from(MiniTrainingType::AccessMinor).is_minor_or_deepening());
        assert!(EducationGroupType::from(MiniTrainingType::Deepening).is_minor_or_deepening());
        assert!(!EducationGroupType::from(MiniTrainingType::OptionTraining).is_minor_or_deepening());
        assert!(!EducationGroupType::from(GroupType::SubGroup).is_minor_or_deepening());
    }
}
