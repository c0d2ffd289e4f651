use anyhow::anyhow;
use tracing::instrument;

use campus_core::{AppError, BusinessErrors, TwoStepsValidatorList};
use campus_models::{
    AdjacencyRow, BlockInput, CreateLinkDto, EducationGroupYear, EducationGroupYearId,
    LearningUnitYearId, Link, LinkChild, LinkId, LinkResponse, LinkType, ReverseAdjacencyRow,
    UpdateLinkDto,
};

use crate::metrics;
use crate::modules::program_tree::graph::TreeGraph;
use crate::modules::program_tree::repository::{LinkWrite, ProgramTreeRepository};
use crate::modules::program_tree::validator::{
    ChildNode, CreateLinkValidatorList, UpdateLinkValidatorList, infer_link_type,
};

pub struct ProgramTreeService;

impl ProgramTreeService {
    #[instrument(skip(repo))]
    pub async fn load_graph(repo: &dyn ProgramTreeRepository) -> Result<TreeGraph, AppError> {
        Ok(TreeGraph::from_links(repo.links().await?))
    }

    /// Attaches a child under a parent. Nothing is written when a rule fails.
    #[instrument(skip(repo))]
    pub async fn create_link(
        repo: &dyn ProgramTreeRepository,
        dto: CreateLinkDto,
    ) -> Result<LinkResponse, AppError> {
        let parent = repo.get_branch(dto.parent_id).await?;
        let child = match (dto.child_branch_id, dto.child_leaf_id) {
            (Some(id), None) => Some(ChildNode::Branch(repo.get_branch(id).await?)),
            (None, Some(id)) => Some(ChildNode::Leaf(repo.get_leaf(id).await?)),
            _ => None,
        };

        let link = repo
            .write_link(Box::new(|graph: &TreeGraph| {
                Self::plan_new_link(graph, &parent, child.as_ref(), dto)
            }))
            .await?;

        tracing::info!(
            link_id = %link.id,
            parent_id = %link.parent_id,
            parent_type = %parent.node_type(),
            child_id = %link.child.uuid(),
            "Link created"
        );

        Ok(link.into())
    }

    fn plan_new_link(
        graph: &TreeGraph,
        parent: &EducationGroupYear,
        child: Option<&ChildNode>,
        dto: CreateLinkDto,
    ) -> Result<LinkWrite, AppError> {
        CreateLinkValidatorList::new(
            graph,
            parent,
            dto.child_branch_id,
            dto.child_leaf_id,
            child,
            dto.block.as_ref(),
        )
        .validate()
        .map_err(reject)?;

        let Some(child) = child else {
            return Err(AppError::bad_request(anyhow!("child reference is required")));
        };

        Ok(LinkWrite::Insert(Link {
            id: LinkId::new(),
            parent_id: parent.id,
            child: child.link_child(),
            order: dto.order.unwrap_or_else(|| graph.next_order(parent.id)),
            block: dto
                .block
                .as_ref()
                .map(BlockInput::parse)
                .transpose()
                .map_err(AppError::bad_request)?,
            link_type: infer_link_type(parent, child.as_branch(), dto.link_type),
            is_mandatory: dto.is_mandatory,
            comment: dto.comment,
        }))
    }

    /// Moves a link under another parent or changes its attributes.
    ///
    /// The rules are checked against the tree as it would be without the
    /// link, so moving a node within its own subtree is caught as a loop.
    #[instrument(skip(repo))]
    pub async fn update_link(
        repo: &dyn ProgramTreeRepository,
        id: LinkId,
        dto: UpdateLinkDto,
    ) -> Result<LinkResponse, AppError> {
        let existing = repo.get_link(id).await?;
        let parent = repo
            .get_branch(dto.parent_id.unwrap_or(existing.parent_id))
            .await?;
        let child = match existing.child {
            LinkChild::Branch(id) => ChildNode::Branch(repo.get_branch(id).await?),
            LinkChild::Leaf(id) => ChildNode::Leaf(repo.get_leaf(id).await?),
        };

        let updated = repo
            .write_link(Box::new(|graph: &TreeGraph| {
                Self::plan_moved_link(graph, id, &parent, &child, dto)
            }))
            .await?;

        tracing::info!(
            link_id = %updated.id,
            parent_id = %updated.parent_id,
            moved = updated.parent_id != existing.parent_id,
            "Link updated"
        );

        Ok(updated.into())
    }

    fn plan_moved_link(
        graph: &TreeGraph,
        id: LinkId,
        parent: &EducationGroupYear,
        child: &ChildNode,
        dto: UpdateLinkDto,
    ) -> Result<LinkWrite, AppError> {
        let Some(current) = graph.link(id).cloned() else {
            return Err(AppError::not_found(anyhow!("Link not found")));
        };
        let moved = parent.id != current.parent_id;
        let graph = graph.without(id);

        UpdateLinkValidatorList::new(&graph, parent, child, dto.block.as_ref())
            .validate()
            .map_err(reject)?;

        let block = match dto.block.as_ref() {
            Some(input) => Some(input.parse().map_err(AppError::bad_request)?),
            None => current.block,
        };
        let order = match dto.order {
            Some(order) => order,
            None if moved => graph.next_order(parent.id),
            None => current.order,
        };

        Ok(LinkWrite::Update(Link {
            parent_id: parent.id,
            order,
            block,
            link_type: infer_link_type(
                parent,
                child.as_branch(),
                dto.link_type.or(current.link_type),
            ),
            is_mandatory: dto.is_mandatory.unwrap_or(current.is_mandatory),
            comment: dto.comment.or(current.comment),
            ..current
        }))
    }

    #[instrument(skip(repo))]
    pub async fn delete_link(repo: &dyn ProgramTreeRepository, id: LinkId) -> Result<(), AppError> {
        repo.delete_link(id).await?;
        tracing::info!(link_id = %id, "Link deleted");
        Ok(())
    }

    #[instrument(skip(repo))]
    pub async fn adjacency_list(
        repo: &dyn ProgramTreeRepository,
        root_ids: &[EducationGroupYearId],
    ) -> Result<Vec<AdjacencyRow>, AppError> {
        if root_ids.is_empty() {
            return Ok(Vec::new());
        }
        let graph = Self::load_graph(repo).await?;
        Ok(graph.adjacency_list(root_ids))
    }

    #[instrument(skip(repo))]
    pub async fn reverse_adjacency_list(
        repo: &dyn ProgramTreeRepository,
        child_leaf_ids: &[LearningUnitYearId],
        child_branch_ids: &[EducationGroupYearId],
        link_type: Option<LinkType>,
    ) -> Result<Vec<ReverseAdjacencyRow>, AppError> {
        if child_leaf_ids.is_empty() && child_branch_ids.is_empty() {
            return Ok(Vec::new());
        }
        let graph = Self::load_graph(repo).await?;
        Ok(graph.reverse_adjacency_list(child_leaf_ids, child_branch_ids, link_type))
    }
}

fn reject(errors: BusinessErrors) -> AppError {
    metrics::track_business_validation_failures(&errors);
    AppError::business(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use campus_models::{
        BlockInput, EducationGroupYear, GroupType, LearningUnitYear, MiniTrainingType,
    };

    use crate::modules::program_tree::repository::InMemoryProgramTreeRepository;

    async fn seed_branch(
        repo: &InMemoryProgramTreeRepository,
        id: u128,
        education_group_type: campus_models::EducationGroupType,
    ) -> EducationGroupYear {
        let node = EducationGroupYear {
            id: EducationGroupYearId::from_u128(id),
            acronym: format!("LDROI{id}G"),
            title: format!("Group {id}"),
            education_group_type,
            academic_year: 2024,
        };
        repo.save_branch(&node).await.unwrap();
        node
    }

    async fn seed_leaf(repo: &InMemoryProgramTreeRepository, id: u128) -> LearningUnitYear {
        let node = LearningUnitYear {
            id: LearningUnitYearId::from_u128(id),
            acronym: format!("LDROI{id}"),
            title: format!("Unit {id}"),
            academic_year: 2024,
        };
        repo.save_leaf(&node).await.unwrap();
        node
    }

    fn attach_branch(parent: EducationGroupYearId, child: EducationGroupYearId) -> CreateLinkDto {
        CreateLinkDto {
            parent_id: parent,
            child_branch_id: Some(child),
            child_leaf_id: None,
            order: None,
            block: None,
            link_type: None,
            is_mandatory: true,
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_create_link_appends_after_last_sibling() {
        let repo = InMemoryProgramTreeRepository::new();
        let root = seed_branch(&repo, 1, GroupType::CommonCore.into()).await;
        let a = seed_branch(&repo, 2, GroupType::SubGroup.into()).await;
        let b = seed_branch(&repo, 3, GroupType::SubGroup.into()).await;

        let first = ProgramTreeService::create_link(&repo, attach_branch(root.id, a.id))
            .await
            .unwrap();
        let second = ProgramTreeService::create_link(&repo, attach_branch(root.id, b.id))
            .await
            .unwrap();

        assert_eq!(first.order, 0);
        assert_eq!(second.order, 1);
    }

    #[tokio::test]
    async fn test_create_link_rejects_loop_without_writing() {
        let repo = InMemoryProgramTreeRepository::new();
        let root = seed_branch(&repo, 1, GroupType::CommonCore.into()).await;
        let child = seed_branch(&repo, 2, GroupType::SubGroup.into()).await;
        ProgramTreeService::create_link(&repo, attach_branch(root.id, child.id))
            .await
            .unwrap();

        let err = ProgramTreeService::create_link(&repo, attach_branch(child.id, root.id))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(repo.links().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_opposite_links_keep_the_tree_acyclic() {
        for _ in 0..50 {
            let repo = std::sync::Arc::new(InMemoryProgramTreeRepository::new());
            let a = seed_branch(&repo, 1, GroupType::SubGroup.into()).await.id;
            let b = seed_branch(&repo, 2, GroupType::SubGroup.into()).await.id;

            let down = tokio::spawn({
                let repo = repo.clone();
                async move {
                    ProgramTreeService::create_link(repo.as_ref(), attach_branch(a, b)).await
                }
            });
            let up = tokio::spawn({
                let repo = repo.clone();
                async move {
                    ProgramTreeService::create_link(repo.as_ref(), attach_branch(b, a)).await
                }
            });
            let results = [down.await.unwrap(), up.await.unwrap()];

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert_eq!(repo.links().await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_create_link_stores_parsed_block() {
        let repo = InMemoryProgramTreeRepository::new();
        let root = seed_branch(&repo, 1, GroupType::CommonCore.into()).await;
        let unit = seed_leaf(&repo, 10).await;

        let dto = CreateLinkDto {
            child_branch_id: None,
            child_leaf_id: Some(unit.id),
            block: Some(BlockInput::Text("146".to_string())),
            ..attach_branch(root.id, root.id)
        };
        let link = ProgramTreeService::create_link(&repo, dto).await.unwrap();

        let block = link.block.unwrap();
        assert_eq!(block.block_repr(), "1 ; 4 ; 6");
        assert_eq!(link.child_leaf_id, Some(unit.id));
    }

    #[tokio::test]
    async fn test_create_link_unknown_parent_is_not_found() {
        let repo = InMemoryProgramTreeRepository::new();
        let child = seed_branch(&repo, 2, GroupType::SubGroup.into()).await;

        let err = ProgramTreeService::create_link(
            &repo,
            attach_branch(EducationGroupYearId::from_u128(99), child.id),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_link_infers_reference_for_minor() {
        let repo = InMemoryProgramTreeRepository::new();
        let list = seed_branch(&repo, 1, GroupType::MinorListChoice.into()).await;
        let minor = seed_branch(&repo, 2, MiniTrainingType::AccessMinor.into()).await;

        let link = ProgramTreeService::create_link(&repo, attach_branch(list.id, minor.id))
            .await
            .unwrap();

        assert_eq!(link.link_type, Some(LinkType::Reference));
    }

    #[tokio::test]
    async fn test_move_into_own_subtree_is_rejected() {
        let repo = InMemoryProgramTreeRepository::new();
        let root = seed_branch(&repo, 1, GroupType::CommonCore.into()).await;
        let a = seed_branch(&repo, 2, GroupType::SubGroup.into()).await;
        let b = seed_branch(&repo, 3, GroupType::SubGroup.into()).await;
        let root_to_a = ProgramTreeService::create_link(&repo, attach_branch(root.id, a.id))
            .await
            .unwrap();
        ProgramTreeService::create_link(&repo, attach_branch(a.id, b.id))
            .await
            .unwrap();

        let dto = UpdateLinkDto {
            parent_id: Some(b.id),
            ..Default::default()
        };
        let errors = ProgramTreeService::update_link(&repo, root_to_a.id, dto)
            .await
            .unwrap_err();

        assert_eq!(errors.status, StatusCode::BAD_REQUEST);
        let stored = repo.get_link(root_to_a.id).await.unwrap();
        assert_eq!(stored.parent_id, root.id);
    }

    #[tokio::test]
    async fn test_move_appends_under_new_parent() {
        let repo = InMemoryProgramTreeRepository::new();
        let root = seed_branch(&repo, 1, GroupType::CommonCore.into()).await;
        let a = seed_branch(&repo, 2, GroupType::SubGroup.into()).await;
        let b = seed_branch(&repo, 3, GroupType::SubGroup.into()).await;
        let c = seed_branch(&repo, 4, GroupType::SubGroup.into()).await;
        ProgramTreeService::create_link(&repo, attach_branch(root.id, a.id))
            .await
            .unwrap();
        ProgramTreeService::create_link(&repo, attach_branch(a.id, b.id))
            .await
            .unwrap();
        let root_to_c = ProgramTreeService::create_link(&repo, attach_branch(root.id, c.id))
            .await
            .unwrap();

        let dto = UpdateLinkDto {
            parent_id: Some(a.id),
            ..Default::default()
        };
        let moved = ProgramTreeService::update_link(&repo, root_to_c.id, dto)
            .await
            .unwrap();

        assert_eq!(moved.parent_id, a.id);
        assert_eq!(moved.order, 1);
    }

    #[tokio::test]
    async fn test_update_link_rejects_bad_block() {
        let repo = InMemoryProgramTreeRepository::new();
        let root = seed_branch(&repo, 1, GroupType::CommonCore.into()).await;
        let a = seed_branch(&repo, 2, GroupType::SubGroup.into()).await;
        let link = ProgramTreeService::create_link(&repo, attach_branch(root.id, a.id))
            .await
            .unwrap();

        let dto = UpdateLinkDto {
            block: Some(BlockInput::Int(1446)),
            ..Default::default()
        };
        let err = ProgramTreeService::update_link(&repo, link.id, dto)
            .await
            .unwrap_err();

        let details = err.details.unwrap();
        assert!(details.field_errors.contains_key("block"));
    }

    #[tokio::test]
    async fn test_adjacency_of_no_roots_is_empty() {
        let repo = InMemoryProgramTreeRepository::new();
        let rows = ProgramTreeService::adjacency_list(&repo, &[]).await.unwrap();
        assert!(rows.is_empty());
    }
}
