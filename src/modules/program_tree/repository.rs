//! Storage of program tree nodes and links.
//!
//! Link writes go through [`ProgramTreeRepository::write_link`]: the plan sees
//! the whole tree and its result is written before any other link write can
//! read the tree, so two concurrent moves cannot both pass the loop check.

use async_trait::async_trait;
use sqlx::{FromRow, PgExecutor, PgPool};
use tokio::sync::RwLock;
use tracing::instrument;

use campus_core::{AppError, RepositoryError};
use campus_models::{
    Block, EducationGroupYear, EducationGroupYearId, LearningUnitYear, LearningUnitYearId, Link,
    LinkChild, LinkId, LinkType,
};

use super::graph::TreeGraph;

/// Link written by a [`LinkPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkWrite {
    Insert(Link),
    /// Replaces the stored link with the same id
    Update(Link),
}

impl LinkWrite {
    pub fn into_link(self) -> Link {
        match self {
            Self::Insert(link) | Self::Update(link) => link,
        }
    }
}

/// Decides the link to write from the current tree, or rejects the write.
pub type LinkPlan<'a> = Box<dyn FnOnce(&TreeGraph) -> Result<LinkWrite, AppError> + Send + 'a>;

#[async_trait]
pub trait ProgramTreeRepository: Send + Sync {
    async fn get_branch(&self, id: EducationGroupYearId)
    -> Result<EducationGroupYear, RepositoryError>;

    async fn get_leaf(&self, id: LearningUnitYearId) -> Result<LearningUnitYear, RepositoryError>;

    async fn save_branch(&self, node: &EducationGroupYear) -> Result<(), RepositoryError>;

    async fn save_leaf(&self, node: &LearningUnitYear) -> Result<(), RepositoryError>;

    async fn get_link(&self, id: LinkId) -> Result<Link, RepositoryError>;

    /// Every link, the input of [`TreeGraph`].
    async fn links(&self) -> Result<Vec<Link>, RepositoryError>;

    /// Runs `plan` on the current tree and stores what it returns. Link
    /// writes are serialized from the read to the write. An update of a
    /// missing link fails with `NotFound`.
    async fn write_link(&self, plan: LinkPlan<'_>) -> Result<Link, AppError>;

    async fn delete_link(&self, id: LinkId) -> Result<(), RepositoryError>;
}

// ============================================================================
// Postgres
// ============================================================================

const LINK_COLUMNS: &str = r#"id, parent_id, child_branch_id, child_leaf_id, "order", block, link_type, is_mandatory, comment"#;

/// `pg_advisory_xact_lock` key taken by every link write.
const TREE_WRITE_LOCK: i64 = 0x7472_6565;

/// Row shape of `group_element_years`.
#[derive(Debug, FromRow)]
struct LinkRow {
    id: LinkId,
    parent_id: EducationGroupYearId,
    child_branch_id: Option<EducationGroupYearId>,
    child_leaf_id: Option<LearningUnitYearId>,
    order: i32,
    block: Option<Block>,
    link_type: Option<LinkType>,
    is_mandatory: bool,
    comment: Option<String>,
}

impl TryFrom<LinkRow> for Link {
    type Error = RepositoryError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let child = match (row.child_branch_id, row.child_leaf_id) {
            (Some(branch), None) => LinkChild::Branch(branch),
            (None, Some(leaf)) => LinkChild::Leaf(leaf),
            _ => {
                return Err(RepositoryError::Conflict(format!(
                    "Link {} must reference exactly one child",
                    row.id
                )));
            }
        };

        Ok(Link {
            id: row.id,
            parent_id: row.parent_id,
            child,
            order: row.order,
            block: row.block,
            link_type: row.link_type,
            is_mandatory: row.is_mandatory,
            comment: row.comment,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgProgramTreeRepository {
    db: PgPool,
}

impl PgProgramTreeRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgramTreeRepository for PgProgramTreeRepository {
    #[instrument(skip(self))]
    async fn get_branch(
        &self,
        id: EducationGroupYearId,
    ) -> Result<EducationGroupYear, RepositoryError> {
        sqlx::query_as::<_, EducationGroupYear>(
            r#"SELECT id, acronym, title, education_group_type, academic_year
               FROM education_group_years WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Education group year"))
    }

    #[instrument(skip(self))]
    async fn get_leaf(&self, id: LearningUnitYearId) -> Result<LearningUnitYear, RepositoryError> {
        sqlx::query_as::<_, LearningUnitYear>(
            r#"SELECT id, acronym, title, academic_year
               FROM learning_unit_years WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Learning unit year"))
    }

    #[instrument(skip(self))]
    async fn save_branch(&self, node: &EducationGroupYear) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO education_group_years (id, acronym, title, education_group_type, academic_year)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE SET
                   acronym = EXCLUDED.acronym,
                   title = EXCLUDED.title,
                   education_group_type = EXCLUDED.education_group_type,
                   academic_year = EXCLUDED.academic_year"#,
        )
        .bind(node.id)
        .bind(&node.acronym)
        .bind(&node.title)
        .bind(node.education_group_type)
        .bind(node.academic_year)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn save_leaf(&self, node: &LearningUnitYear) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO learning_unit_years (id, acronym, title, academic_year)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (id) DO UPDATE SET
                   acronym = EXCLUDED.acronym,
                   title = EXCLUDED.title,
                   academic_year = EXCLUDED.academic_year"#,
        )
        .bind(node.id)
        .bind(&node.acronym)
        .bind(&node.title)
        .bind(node.academic_year)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_link(&self, id: LinkId) -> Result<Link, RepositoryError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM group_element_years WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Link"))?;

        Link::try_from(row)
    }

    #[instrument(skip(self))]
    async fn links(&self) -> Result<Vec<Link>, RepositoryError> {
        fetch_links(&self.db).await
    }

    #[instrument(skip(self, plan))]
    async fn write_link(&self, plan: LinkPlan<'_>) -> Result<Link, AppError> {
        let mut tx = self.db.begin().await.map_err(RepositoryError::from)?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(TREE_WRITE_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        let graph = TreeGraph::from_links(fetch_links(&mut *tx).await?);
        let write = plan(&graph)?;
        match &write {
            LinkWrite::Insert(link) => insert_link_row(&mut *tx, link).await?,
            LinkWrite::Update(link) => update_link_row(&mut *tx, link).await?,
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(write.into_link())
    }

    #[instrument(skip(self))]
    async fn delete_link(&self, id: LinkId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM group_element_years WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Link"));
        }
        Ok(())
    }
}

async fn fetch_links<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<Link>, RepositoryError> {
    let rows = sqlx::query_as::<_, LinkRow>(&format!(
        r#"SELECT {LINK_COLUMNS} FROM group_element_years ORDER BY parent_id, "order", id"#
    ))
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(Link::try_from).collect()
}

async fn insert_link_row<'e>(
    executor: impl PgExecutor<'e>,
    link: &Link,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO group_element_years
               (id, parent_id, child_branch_id, child_leaf_id, "order", block, link_type, is_mandatory, comment)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
    )
    .bind(link.id)
    .bind(link.parent_id)
    .bind(link.child.branch_id())
    .bind(link.child.leaf_id())
    .bind(link.order)
    .bind(link.block)
    .bind(link.link_type)
    .bind(link.is_mandatory)
    .bind(&link.comment)
    .execute(executor)
    .await?;

    Ok(())
}

async fn update_link_row<'e>(
    executor: impl PgExecutor<'e>,
    link: &Link,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r#"UPDATE group_element_years
           SET parent_id = $2, "order" = $3, block = $4, link_type = $5,
               is_mandatory = $6, comment = $7, updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(link.id)
    .bind(link.parent_id)
    .bind(link.order)
    .bind(link.block)
    .bind(link.link_type)
    .bind(link.is_mandatory)
    .bind(&link.comment)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::not_found("Link"));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
struct TreeTables {
    branches: Vec<EducationGroupYear>,
    leaves: Vec<LearningUnitYear>,
    links: Vec<Link>,
}

impl TreeTables {
    fn insert_link(&mut self, link: &Link) -> Result<(), RepositoryError> {
        if self.links.iter().any(|existing| existing.id == link.id) {
            return Err(RepositoryError::Conflict(format!("Link {} already exists", link.id)));
        }
        self.links.push(link.clone());
        Ok(())
    }

    fn update_link(&mut self, link: &Link) -> Result<(), RepositoryError> {
        let existing = self
            .links
            .iter_mut()
            .find(|existing| existing.id == link.id)
            .ok_or_else(|| RepositoryError::not_found("Link"))?;
        *existing = link.clone();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProgramTreeRepository {
    tables: RwLock<TreeTables>,
}

impl InMemoryProgramTreeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgramTreeRepository for InMemoryProgramTreeRepository {
    async fn get_branch(
        &self,
        id: EducationGroupYearId,
    ) -> Result<EducationGroupYear, RepositoryError> {
        self.tables
            .read()
            .await
            .branches
            .iter()
            .find(|node| node.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Education group year"))
    }

    async fn get_leaf(&self, id: LearningUnitYearId) -> Result<LearningUnitYear, RepositoryError> {
        self.tables
            .read()
            .await
            .leaves
            .iter()
            .find(|node| node.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Learning unit year"))
    }

    async fn save_branch(&self, node: &EducationGroupYear) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.branches.iter_mut().find(|existing| existing.id == node.id) {
            Some(existing) => *existing = node.clone(),
            None => tables.branches.push(node.clone()),
        }
        Ok(())
    }

    async fn save_leaf(&self, node: &LearningUnitYear) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.leaves.iter_mut().find(|existing| existing.id == node.id) {
            Some(existing) => *existing = node.clone(),
            None => tables.leaves.push(node.clone()),
        }
        Ok(())
    }

    async fn get_link(&self, id: LinkId) -> Result<Link, RepositoryError> {
        self.tables
            .read()
            .await
            .links
            .iter()
            .find(|link| link.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Link"))
    }

    async fn links(&self) -> Result<Vec<Link>, RepositoryError> {
        Ok(self.tables.read().await.links.clone())
    }

    async fn write_link(&self, plan: LinkPlan<'_>) -> Result<Link, AppError> {
        // held from the snapshot to the write
        let mut tables = self.tables.write().await;

        let write = plan(&TreeGraph::from_links(tables.links.clone()))?;
        match &write {
            LinkWrite::Insert(link) => tables.insert_link(link)?,
            LinkWrite::Update(link) => tables.update_link(link)?,
        }

        Ok(write.into_link())
    }

    async fn delete_link(&self, id: LinkId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.links.len();
        tables.links.retain(|link| link.id != id);

        if tables.links.len() == before {
            return Err(RepositoryError::not_found("Link"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use campus_models::GroupType;

    #[tokio::test]
    async fn test_in_memory_link_lifecycle() {
        let repo = InMemoryProgramTreeRepository::new();
        let parent = EducationGroupYear {
            id: EducationGroupYearId::new(),
            acronym: "LDROI100T".to_string(),
            title: "Tronc commun".to_string(),
            education_group_type: GroupType::CommonCore.into(),
            academic_year: 2024,
        };
        repo.save_branch(&parent).await.unwrap();

        let link = Link {
            id: LinkId::new(),
            parent_id: parent.id,
            child: LinkChild::Leaf(LearningUnitYearId::new()),
            order: 0,
            block: None,
            link_type: None,
            is_mandatory: true,
            comment: None,
        };
        let insert = |link: Link| -> LinkPlan<'static> {
            Box::new(move |_: &TreeGraph| Ok(LinkWrite::Insert(link)))
        };
        repo.write_link(insert(link.clone())).await.unwrap();
        let duplicate = repo.write_link(insert(link.clone())).await.unwrap_err();
        assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

        let moved = Link { order: 3, ..link.clone() };
        repo.write_link(Box::new(move |_: &TreeGraph| Ok(LinkWrite::Update(moved))))
            .await
            .unwrap();
        assert_eq!(repo.get_link(link.id).await.unwrap().order, 3);

        repo.delete_link(link.id).await.unwrap();
        assert!(matches!(
            repo.delete_link(link.id).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(repo.links().await.unwrap().is_empty());

        let missing = Link { id: LinkId::new(), ..link };
        let err = repo
            .write_link(Box::new(move |_: &TreeGraph| Ok(LinkWrite::Update(missing))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejected_plan_writes_nothing() {
        let repo = InMemoryProgramTreeRepository::new();

        let err = repo
            .write_link(Box::new(|_: &TreeGraph| {
                Err(AppError::bad_request(anyhow::anyhow!("rejected")))
            }))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(repo.links().await.unwrap().is_empty());
    }

    #[test]
    fn test_link_row_requires_exactly_one_child() {
        let row = LinkRow {
            id: LinkId::new(),
            parent_id: EducationGroupYearId::new(),
            child_branch_id: Some(EducationGroupYearId::new()),
            child_leaf_id: Some(LearningUnitYearId::new()),
            order: 0,
            block: None,
            link_type: None,
            is_mandatory: false,
            comment: None,
        };
        assert!(Link::try_from(row).is_err());
    }
}
