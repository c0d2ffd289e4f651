//! Program tree domain models and DTOs.
//!
//! A program tree is built from branch nodes ([`EducationGroupYear`]) and
//! leaf nodes ([`LearningUnitYear`]) joined by [`Link`]s. A link always has a
//! branch parent and exactly one child, either a branch or a leaf.

use crate::enums::{EducationGroupType, LinkType, NodeType};
use crate::ids::{EducationGroupYearId, LearningUnitYearId, LinkId};
use crate::value_types::{Block, BlockInput};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Branch node: a training, mini-training or group for one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EducationGroupYear {
    pub id: EducationGroupYearId,
    pub acronym: String,
    pub title: String,
    pub education_group_type: EducationGroupType,
    pub academic_year: i32,
}

impl EducationGroupYear {
    pub fn node_type(&self) -> NodeType {
        self.education_group_type.node_type()
    }
}

/// Leaf node: a learning unit for one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LearningUnitYear {
    pub id: LearningUnitYearId,
    pub acronym: String,
    pub title: String,
    pub academic_year: i32,
}

/// The child end of a link. Branch and leaf ids are separate namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkChild {
    Branch(EducationGroupYearId),
    Leaf(LearningUnitYearId),
}

impl LinkChild {
    pub fn branch_id(&self) -> Option<EducationGroupYearId> {
        match self {
            Self::Branch(id) => Some(*id),
            Self::Leaf(_) => None,
        }
    }

    pub fn leaf_id(&self) -> Option<LearningUnitYearId> {
        match self {
            Self::Leaf(id) => Some(*id),
            Self::Branch(_) => None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Branch(id) => id.into_inner(),
            Self::Leaf(id) => id.into_inner(),
        }
    }
}

/// Parent/child link between two nodes of a program tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub parent_id: EducationGroupYearId,
    pub child: LinkChild,
    /// Position among the parent's children
    pub order: i32,
    pub block: Option<Block>,
    pub link_type: Option<LinkType>,
    pub is_mandatory: bool,
    pub comment: Option<String>,
}

/// JSON view of a [`Link`] with the child split into two nullable columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    pub id: LinkId,
    pub parent_id: EducationGroupYearId,
    pub child_branch_id: Option<EducationGroupYearId>,
    pub child_leaf_id: Option<LearningUnitYearId>,
    pub order: i32,
    pub block: Option<Block>,
    pub link_type: Option<LinkType>,
    pub is_mandatory: bool,
    pub comment: Option<String>,
}

impl From<Link> for LinkResponse {
    fn from(link: Link) -> Self {
        Self {
            id: link.id,
            parent_id: link.parent_id,
            child_branch_id: link.child.branch_id(),
            child_leaf_id: link.child.leaf_id(),
            order: link.order,
            block: link.block,
            link_type: link.link_type,
            is_mandatory: link.is_mandatory,
            comment: link.comment,
        }
    }
}

/// DTO for attaching a child under a parent.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLinkDto {
    pub parent_id: EducationGroupYearId,
    /// Set exactly one of `child_branch_id` / `child_leaf_id`
    pub child_branch_id: Option<EducationGroupYearId>,
    pub child_leaf_id: Option<LearningUnitYearId>,
    /// Appended after the last sibling when absent
    #[validate(range(min = 0))]
    pub order: Option<i32>,
    /// Digits 1-6, ascending, e.g. `146`
    pub block: Option<BlockInput>,
    pub link_type: Option<LinkType>,
    #[serde(default)]
    pub is_mandatory: bool,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

/// DTO for moving a link or changing its attributes.
///
/// Absent fields are left unchanged; a new `parent_id` moves the link.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLinkDto {
    pub parent_id: Option<EducationGroupYearId>,
    #[validate(range(min = 0))]
    pub order: Option<i32>,
    pub block: Option<BlockInput>,
    pub link_type: Option<LinkType>,
    pub is_mandatory: Option<bool>,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

/// One row of a downward traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdjacencyRow {
    pub starting_node_id: EducationGroupYearId,
    pub id: LinkId,
    pub parent_id: EducationGroupYearId,
    /// Child UUID regardless of its kind
    pub child_id: Uuid,
    pub child_branch_id: Option<EducationGroupYearId>,
    pub child_leaf_id: Option<LearningUnitYearId>,
    pub order: i32,
    /// 0 for direct children of the starting node
    pub level: u32,
    /// `"<root>|...|<child>"`
    pub path: String,
    pub link_type: Option<LinkType>,
    pub block: Option<Block>,
}

/// One row of an upward traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReverseAdjacencyRow {
    /// The leaf or branch the walk started from
    pub starting_node_id: Uuid,
    pub id: LinkId,
    pub parent_id: EducationGroupYearId,
    pub child_id: Uuid,
    pub child_branch_id: Option<EducationGroupYearId>,
    pub child_leaf_id: Option<LearningUnitYearId>,
    pub order: i32,
    /// 0 for the link whose child is the starting node
    pub level: u32,
    pub link_type: Option<LinkType>,
}

/// Comma-separated root ids, e.g. `?root_ids=<uuid>,<uuid>`.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct AdjacencyParams {
    pub root_ids: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ReverseAdjacencyParams {
    pub child_leaf_ids: Option<String>,
    pub child_branch_ids: Option<String>,
    /// Only links of this type are followed
    pub link_type: Option<LinkType>,
}
