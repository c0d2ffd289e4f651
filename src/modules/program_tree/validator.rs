//! Business rules for attaching and moving links.

use campus_core::{BusinessValidator, FailureKind, TwoStepsValidatorList, ValidationFailure};
use campus_models::{
    BlockInput, EducationGroupType, EducationGroupYear, EducationGroupYearId, GroupType,
    LearningUnitYear, LearningUnitYearId, LinkChild, LinkType, MiniTrainingType,
};

use super::graph::TreeGraph;

pub const CHILD_REFERENCE_MESSAGE: &str =
    "A link must reference exactly one child, either a group or a learning unit";
pub const LOOP_MESSAGE: &str = "The child cannot be attached to this parent because it would create a loop";
pub const ACADEMIC_YEAR_MISMATCH_MESSAGE: &str =
    "The child must have the same academic year as its parent";
pub const INVALID_BLOCK_MESSAGE: &str = "Please register a maximum of 6 digits in ascending order, without any duplication. Authorized values are from 1 to 6. Examples: 12, 23, 46";

/// The resolved child end of a link.
#[derive(Debug, Clone)]
pub enum ChildNode {
    Branch(EducationGroupYear),
    Leaf(LearningUnitYear),
}

impl ChildNode {
    pub fn academic_year(&self) -> i32 {
        match self {
            Self::Branch(node) => node.academic_year,
            Self::Leaf(node) => node.academic_year,
        }
    }

    pub fn link_child(&self) -> LinkChild {
        match self {
            Self::Branch(node) => LinkChild::Branch(node.id),
            Self::Leaf(node) => LinkChild::Leaf(node.id),
        }
    }

    pub fn as_branch(&self) -> Option<&EducationGroupYear> {
        match self {
            Self::Branch(node) => Some(node),
            Self::Leaf(_) => None,
        }
    }
}

pub struct ChildReferenceValidator {
    child_branch_id: Option<EducationGroupYearId>,
    child_leaf_id: Option<LearningUnitYearId>,
}

impl BusinessValidator for ChildReferenceValidator {
    fn validate(&self) -> Result<(), ValidationFailure> {
        match (self.child_branch_id, self.child_leaf_id) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(ValidationFailure::non_field(
                FailureKind::ChildReference,
                CHILD_REFERENCE_MESSAGE,
            )),
        }
    }
}

/// Rejects the link when `parent` is reachable from the child, the parent
/// itself included.
pub struct NoLoopValidator<'a> {
    graph: &'a TreeGraph,
    parent_id: EducationGroupYearId,
    child: LinkChild,
}

impl BusinessValidator for NoLoopValidator<'_> {
    fn validate(&self) -> Result<(), ValidationFailure> {
        let LinkChild::Branch(child_id) = self.child else {
            return Ok(());
        };

        if self.graph.is_reachable(child_id, self.parent_id) {
            return Err(ValidationFailure::non_field(FailureKind::Loop, LOOP_MESSAGE));
        }
        Ok(())
    }
}

pub struct SameAcademicYearValidator {
    parent_year: i32,
    child_year: i32,
}

impl BusinessValidator for SameAcademicYearValidator {
    fn validate(&self) -> Result<(), ValidationFailure> {
        if self.parent_year != self.child_year {
            return Err(ValidationFailure::non_field(
                FailureKind::AcademicYearMismatch,
                ACADEMIC_YEAR_MISMATCH_MESSAGE,
            ));
        }
        Ok(())
    }
}

pub struct BlockValidator<'a> {
    block: Option<&'a BlockInput>,
}

impl BusinessValidator for BlockValidator<'_> {
    fn validate(&self) -> Result<(), ValidationFailure> {
        match self.block.map(BlockInput::parse) {
            Some(Err(_)) => Err(ValidationFailure::field(
                FailureKind::InvalidBlock,
                "block",
                INVALID_BLOCK_MESSAGE,
            )),
            _ => Ok(()),
        }
    }
}

/// Validates attaching a new child under `parent`.
///
/// `child` is `None` when the child reference is ambiguous, which the data
/// contract step reports before any invariant runs.
pub struct CreateLinkValidatorList<'a> {
    graph: &'a TreeGraph,
    parent: &'a EducationGroupYear,
    child_branch_id: Option<EducationGroupYearId>,
    child_leaf_id: Option<LearningUnitYearId>,
    child: Option<&'a ChildNode>,
    block: Option<&'a BlockInput>,
}

impl<'a> CreateLinkValidatorList<'a> {
    pub fn new(
        graph: &'a TreeGraph,
        parent: &'a EducationGroupYear,
        child_branch_id: Option<EducationGroupYearId>,
        child_leaf_id: Option<LearningUnitYearId>,
        child: Option<&'a ChildNode>,
        block: Option<&'a BlockInput>,
    ) -> Self {
        Self {
            graph,
            parent,
            child_branch_id,
            child_leaf_id,
            child,
            block,
        }
    }
}

impl TwoStepsValidatorList for CreateLinkValidatorList<'_> {
    fn data_contract_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
        let mut validators: Vec<Box<dyn BusinessValidator + '_>> = Vec::new();
        validators.push(Box::new(ChildReferenceValidator {
            child_branch_id: self.child_branch_id,
            child_leaf_id: self.child_leaf_id,
        }));
        validators
    }

    fn invariant_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
        let mut validators: Vec<Box<dyn BusinessValidator + '_>> = Vec::new();

        if let Some(child) = self.child {
            validators.push(Box::new(NoLoopValidator {
                graph: self.graph,
                parent_id: self.parent.id,
                child: child.link_child(),
            }));
            validators.push(Box::new(SameAcademicYearValidator {
                parent_year: self.parent.academic_year,
                child_year: child.academic_year(),
            }));
        }
        validators.push(Box::new(BlockValidator { block: self.block }));

        validators
    }
}

/// Validates moving an existing link under `parent` or changing its block.
///
/// `graph` must not contain the link being updated.
pub struct UpdateLinkValidatorList<'a> {
    graph: &'a TreeGraph,
    parent: &'a EducationGroupYear,
    child: &'a ChildNode,
    block: Option<&'a BlockInput>,
}

impl<'a> UpdateLinkValidatorList<'a> {
    pub fn new(
        graph: &'a TreeGraph,
        parent: &'a EducationGroupYear,
        child: &'a ChildNode,
        block: Option<&'a BlockInput>,
    ) -> Self {
        Self {
            graph,
            parent,
            child,
            block,
        }
    }
}

impl TwoStepsValidatorList for UpdateLinkValidatorList<'_> {
    fn data_contract_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
        Vec::new()
    }

    fn invariant_validators(&self) -> Vec<Box<dyn BusinessValidator + '_>> {
        let mut validators: Vec<Box<dyn BusinessValidator + '_>> = Vec::new();
        validators.push(Box::new(NoLoopValidator {
            graph: self.graph,
            parent_id: self.parent.id,
            child: self.child.link_child(),
        }));
        validators.push(Box::new(SameAcademicYearValidator {
            parent_year: self.parent.academic_year,
            child_year: self.child.academic_year(),
        }));
        validators.push(Box::new(BlockValidator { block: self.block }));
        validators
    }
}

/// Link type of a new link between `parent` and a branch `child`.
///
/// Minors and deepenings under a minor list, and FSA specialities under a
/// major list, are always attached as references.
pub fn infer_link_type(
    parent: &EducationGroupYear,
    child: Option<&EducationGroupYear>,
    requested: Option<LinkType>,
) -> Option<LinkType> {
    let Some(child) = child else {
        return requested;
    };

    let forced = match parent.education_group_type {
        EducationGroupType::Group(GroupType::MinorListChoice) => {
            child.education_group_type.is_minor_or_deepening()
        }
        EducationGroupType::Group(GroupType::MajorListChoice) => {
            child.education_group_type
                == EducationGroupType::MiniTraining(MiniTrainingType::FsaSpeciality)
        }
        _ => false,
    };

    if forced { Some(LinkType::Reference) } else { requested }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_models::{Link, LinkId, TrainingType};

    fn branch(id: u128, education_group_type: EducationGroupType, year: i32) -> EducationGroupYear {
        EducationGroupYear {
            id: EducationGroupYearId::from_u128(id),
            acronym: format!("NODE{id}"),
            title: format!("Node {id}"),
            education_group_type,
            academic_year: year,
        }
    }

    fn leaf(id: u128, year: i32) -> LearningUnitYear {
        LearningUnitYear {
            id: LearningUnitYearId::from_u128(id),
            acronym: format!("LDROI{id}"),
            title: format!("Unit {id}"),
            academic_year: year,
        }
    }

    fn link(id: u128, parent: u128, child: u128) -> Link {
        Link {
            id: LinkId::from_u128(id),
            parent_id: EducationGroupYearId::from_u128(parent),
            child: LinkChild::Branch(EducationGroupYearId::from_u128(child)),
            order: 0,
            block: None,
            link_type: None,
            is_mandatory: true,
            comment: None,
        }
    }

    fn common_core(id: u128) -> EducationGroupYear {
        branch(id, GroupType::CommonCore.into(), 2024)
    }

    #[test]
    fn test_attaching_an_ancestor_is_a_loop() {
        // 1 -> 2 -> 3, then try 3 -> 1
        let graph = TreeGraph::from_links(vec![link(100, 1, 2), link(101, 2, 3)]);
        let parent = common_core(3);
        let child = ChildNode::Branch(common_core(1));

        let errors = CreateLinkValidatorList::new(
            &graph,
            &parent,
            Some(EducationGroupYearId::from_u128(1)),
            None,
            Some(&child),
            None,
        )
        .validate()
        .unwrap_err();

        assert!(errors.contains(FailureKind::Loop));
        assert_eq!(errors.non_field_errors(), vec![LOOP_MESSAGE.to_string()]);
    }

    #[test]
    fn test_self_link_is_a_loop() {
        let graph = TreeGraph::default();
        let parent = common_core(1);
        let child = ChildNode::Branch(common_core(1));

        let errors = CreateLinkValidatorList::new(
            &graph,
            &parent,
            Some(parent.id),
            None,
            Some(&child),
            None,
        )
        .validate()
        .unwrap_err();

        assert!(errors.contains(FailureKind::Loop));
    }

    #[test]
    fn test_attaching_a_leaf_never_loops() {
        let graph = TreeGraph::from_links(vec![link(100, 1, 2)]);
        let parent = common_core(2);
        let child = ChildNode::Leaf(leaf(1, 2024));

        let result = CreateLinkValidatorList::new(
            &graph,
            &parent,
            None,
            Some(LearningUnitYearId::from_u128(1)),
            Some(&child),
            None,
        )
        .validate();

        assert!(result.is_ok());
    }

    #[test]
    fn test_ambiguous_child_stops_at_data_contract() {
        let graph = TreeGraph::default();
        let parent = common_core(1);
        let bad_block = BlockInput::Text("1446".to_string());

        let errors = CreateLinkValidatorList::new(
            &graph,
            &parent,
            Some(EducationGroupYearId::from_u128(2)),
            Some(LearningUnitYearId::from_u128(3)),
            None,
            Some(&bad_block),
        )
        .validate()
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors.contains(FailureKind::ChildReference));
    }

    #[test]
    fn test_missing_child_is_rejected() {
        let graph = TreeGraph::default();
        let parent = common_core(1);

        let errors = CreateLinkValidatorList::new(&graph, &parent, None, None, None, None)
            .validate()
            .unwrap_err();

        assert!(errors.contains(FailureKind::ChildReference));
    }

    #[test]
    fn test_invariant_failures_are_reported_together() {
        let graph = TreeGraph::default();
        let parent = common_core(1);
        let child = ChildNode::Branch(branch(1, GroupType::SubGroup.into(), 2023));
        let bad_block = BlockInput::Text("54".to_string());

        let errors = CreateLinkValidatorList::new(
            &graph,
            &parent,
            Some(parent.id),
            None,
            Some(&child),
            Some(&bad_block),
        )
        .validate()
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert!(errors.contains(FailureKind::Loop));
        assert!(errors.contains(FailureKind::AcademicYearMismatch));
        assert!(errors.contains(FailureKind::InvalidBlock));
        assert_eq!(
            errors.field_errors().get("block"),
            Some(&vec![INVALID_BLOCK_MESSAGE.to_string()])
        );
    }

    #[test]
    fn test_block_grammar() {
        for valid in [BlockInput::Text("146".into()), BlockInput::Int(146), BlockInput::Int(1)] {
            assert!(BlockValidator { block: Some(&valid) }.validate().is_ok());
        }
        for invalid in [
            BlockInput::Text("1446".into()),
            BlockInput::Text("54".into()),
            BlockInput::Text("0".into()),
            BlockInput::Text("1234567".into()),
            BlockInput::Int(0),
            BlockInput::Int(-12),
        ] {
            assert!(BlockValidator { block: Some(&invalid) }.validate().is_err());
        }
        assert!(BlockValidator { block: None }.validate().is_ok());
    }

    #[test]
    fn test_moving_under_own_descendant_is_a_loop() {
        // 1 -> 2 -> 3; move link 1 -> 2 so that 2 hangs under 3
        let graph = TreeGraph::from_links(vec![link(100, 1, 2), link(101, 2, 3)]);
        let moved = graph.without(LinkId::from_u128(100));
        let new_parent = common_core(3);
        let child = ChildNode::Branch(common_core(2));

        let errors = UpdateLinkValidatorList::new(&moved, &new_parent, &child, None)
            .validate()
            .unwrap_err();
        assert!(errors.contains(FailureKind::Loop));
    }

    #[test]
    fn test_moving_to_sibling_is_allowed() {
        // 1 -> 2, 1 -> 3; move 2 under 3
        let graph = TreeGraph::from_links(vec![link(100, 1, 2), link(101, 1, 3)]);
        let moved = graph.without(LinkId::from_u128(100));
        let new_parent = common_core(3);
        let child = ChildNode::Branch(common_core(2));

        assert!(
            UpdateLinkValidatorList::new(&moved, &new_parent, &child, None)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_minor_under_minor_list_becomes_reference() {
        let parent = branch(1, GroupType::MinorListChoice.into(), 2024);
        let minor = branch(2, MiniTrainingType::OpenMinor.into(), 2024);
        let deepening = branch(3, MiniTrainingType::Deepening.into(), 2024);

        assert_eq!(
            infer_link_type(&parent, Some(&minor), None),
            Some(LinkType::Reference)
        );
        assert_eq!(
            infer_link_type(&parent, Some(&deepening), None),
            Some(LinkType::Reference)
        );
    }

    #[test]
    fn test_fsa_speciality_under_major_list_becomes_reference() {
        let parent = branch(1, GroupType::MajorListChoice.into(), 2024);
        let speciality = branch(2, MiniTrainingType::FsaSpeciality.into(), 2024);
        let minor = branch(3, MiniTrainingType::SocietyMinor.into(), 2024);

        assert_eq!(
            infer_link_type(&parent, Some(&speciality), None),
            Some(LinkType::Reference)
        );
        assert_eq!(infer_link_type(&parent, Some(&minor), None), None);
    }

    #[test]
    fn test_other_links_keep_requested_type() {
        let parent = common_core(1);
        let training = branch(2, TrainingType::Bachelor.into(), 2024);

        assert_eq!(infer_link_type(&parent, Some(&training), None), None);
        assert_eq!(
            infer_link_type(&parent, Some(&training), Some(LinkType::Reference)),
            Some(LinkType::Reference)
        );
        assert_eq!(infer_link_type(&parent, None, None), None);
    }
}
