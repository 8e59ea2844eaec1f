//! Directory storage driver.
//!
//! Persists the directory forest and answers tree queries with recursive
//! CTEs over `(id, parent_id)`. Soft-delete filtering is applied to every
//! row a traversal considers, including the seed; the `with_deleted`
//! option disables the filter globally for a call.
//!
//! The driver has two modes set at construction: `read_only` refuses all
//! mutations, and `fast_reads` rewrites read queries to run against a
//! bounded-staleness follower snapshot (CockroachDB follower reads).

use sqlx::types::Json;
use sqlx::PgPool;

use arbor_core::error::{AppError, ErrorKind};
use arbor_core::result::AppResult;
use arbor_core::types::{DirectoryId, QueryOptions};
use arbor_entity::directory::{Directory, DirectoryMetadata, NewDirectory};

/// Clause spliced into read queries when fast reads are enabled.
const FOLLOWER_READS_CLAUSE: &str = "AS OF SYSTEM TIME follower_read_timestamp()";

/// Placeholder in read queries marking where the follower-read clause goes.
const AOST_MARKER: &str = "{aost}";

/// Storage driver for the directory forest.
#[derive(Debug, Clone)]
pub struct DirectoryDriver {
    pool: PgPool,
    read_only: bool,
    fast_reads: bool,
}

impl DirectoryDriver {
    /// Create a new driver over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            read_only: false,
            fast_reads: false,
        }
    }

    /// Refuse all mutations on this driver.
    pub fn with_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Serve reads from a bounded-staleness follower snapshot.
    pub fn with_fast_reads(mut self) -> Self {
        self.fast_reads = true;
        self
    }

    /// Whether this driver refuses mutations.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Create a root directory.
    ///
    /// Root directories have no parent. The id and timestamps are assigned
    /// by the database.
    pub async fn create_root(&self, data: &NewDirectory) -> AppResult<Directory> {
        self.guard_mutation()?;

        if data.parent_id.is_some() {
            return Err(AppError::root_with_parent_directory(
                "root directories cannot have a parent",
            ));
        }

        sqlx::query_as::<_, Directory>(
            "INSERT INTO directories (name, metadata) VALUES ($1, $2) RETURNING *",
        )
        .bind(&data.name)
        .bind(Json(&data.metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create root", e))
    }

    /// Create a directory under an existing live parent.
    ///
    /// The parent-liveness check and the insert happen in a single
    /// statement so a concurrent cascade delete either includes the new
    /// child or refuses the insert, never half of each.
    pub async fn create_directory(&self, data: &NewDirectory) -> AppResult<Directory> {
        self.guard_mutation()?;

        let parent = data.parent_id.ok_or_else(|| {
            AppError::directory_without_parent("non-root directories require a parent")
        })?;

        sqlx::query_as::<_, Directory>(
            "INSERT INTO directories (name, parent_id, metadata) \
             SELECT $1, $2, $3 \
             WHERE EXISTS (SELECT 1 FROM directories WHERE id = $2 AND deleted_at IS NULL) \
             RETURNING *",
        )
        .bind(&data.name)
        .bind(parent)
        .bind(Json(&data.metadata))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create directory", e))?
        .ok_or_else(|| {
            AppError::directory_not_found(format!("parent directory {parent} not found"))
        })
    }

    /// Replace a directory's name and metadata.
    pub async fn update_directory(
        &self,
        id: DirectoryId,
        name: &str,
        metadata: &DirectoryMetadata,
    ) -> AppResult<Directory> {
        self.guard_mutation()?;

        sqlx::query_as::<_, Directory>(
            "UPDATE directories SET name = $2, metadata = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(Json(metadata))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update directory", e))?
        .ok_or_else(|| AppError::directory_not_found(format!("directory {id} not found")))
    }

    /// Cascading soft-delete.
    ///
    /// Computes the live descendant closure of `id` and stamps `deleted_at`
    /// on every member in one atomic statement, so the whole subtree
    /// observes a single deletion instant. Returns the affected
    /// directories. Roots are not deletable; deleting an absent or
    /// already-deleted directory fails with `DirectoryNotFound`.
    pub async fn delete_directory(&self, id: DirectoryId) -> AppResult<Vec<Directory>> {
        self.guard_mutation()?;

        let affected = sqlx::query_as::<_, Directory>(
            "WITH RECURSIVE get_children AS ( \
                 SELECT id, parent_id FROM directories \
                 WHERE id = $1 AND deleted_at IS NULL AND parent_id IS NOT NULL \
                 UNION \
                 SELECT d.id, d.parent_id FROM directories d \
                 INNER JOIN get_children gc ON d.parent_id = gc.id \
                 WHERE d.deleted_at IS NULL \
             ) \
             UPDATE directories \
             SET deleted_at = NOW() \
             WHERE deleted_at IS NULL AND id IN (SELECT id FROM get_children) \
             RETURNING *",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete directory", e))?;

        if affected.is_empty() {
            return Err(AppError::directory_not_found(format!(
                "directory {id} not found"
            )));
        }

        Ok(affected)
    }

    /// Fetch a directory by id.
    pub async fn get_directory(&self, id: DirectoryId, opts: QueryOptions) -> AppResult<Directory> {
        let with_deleted = deleted_filter(opts);
        let query = self.format_query(&format!(
            "SELECT * FROM directories {{aost}} \
             WHERE id = $1 AND ({with_deleted} OR deleted_at IS NULL)"
        ));

        sqlx::query_as::<_, Directory>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get directory", e))?
            .ok_or_else(|| AppError::directory_not_found(format!("directory {id} not found")))
    }

    /// Return all root directory ids.
    pub async fn list_roots(&self, opts: QueryOptions) -> AppResult<Vec<DirectoryId>> {
        let with_deleted = deleted_filter(opts);
        let query = self.format_query(&format!(
            "SELECT id FROM directories {{aost}} \
             WHERE parent_id IS NULL AND ({with_deleted} OR deleted_at IS NULL)"
        ));

        sqlx::query_scalar::<_, DirectoryId>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list roots", e))
    }

    /// Return the direct children of a directory (one level).
    pub async fn list_children(
        &self,
        parent: DirectoryId,
        opts: QueryOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        let with_deleted = deleted_filter(opts);
        let query = self.format_query(&format!(
            "SELECT id FROM directories {{aost}} \
             WHERE parent_id = $1 AND ({with_deleted} OR deleted_at IS NULL)"
        ));

        sqlx::query_scalar::<_, DirectoryId>(&query)
            .bind(parent)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    /// Return the ancestor chain of `child`, from its immediate parent up
    /// to the root. The child itself is not included. Fails with
    /// `DirectoryNotFound` if the child does not exist.
    pub async fn get_parents(
        &self,
        child: DirectoryId,
        opts: QueryOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        let with_deleted = deleted_filter(opts);
        let query = self.format_query(&format!(
            "WITH RECURSIVE get_parents AS ( \
                 SELECT id, parent_id, 0 AS depth FROM directories \
                 WHERE id = $1 AND ({with_deleted} OR deleted_at IS NULL) \
                 UNION \
                 SELECT d.id, d.parent_id, gp.depth + 1 FROM directories d \
                 INNER JOIN get_parents gp ON d.id = gp.parent_id \
                 WHERE ({with_deleted} OR d.deleted_at IS NULL) \
             ) SELECT id FROM get_parents {{aost}} ORDER BY depth ASC"
        ));

        let parents = sqlx::query_scalar::<_, DirectoryId>(&query)
            .bind(child)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get parents", e))?;

        if parents.is_empty() {
            return Err(AppError::directory_not_found(format!(
                "directory {child} not found"
            )));
        }

        // The seed row is the child itself.
        Ok(parents.into_iter().skip(1).collect())
    }

    /// Like [`get_parents`](Self::get_parents), but the traversal stops
    /// inclusive of the step reaching `ancestor`.
    ///
    /// Does not validate that `ancestor` actually is an ancestor of
    /// `child`; callers that care must check membership of the result.
    pub async fn get_parents_until_ancestor(
        &self,
        child: DirectoryId,
        ancestor: DirectoryId,
        opts: QueryOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        // No need to go through the database if the child is the ancestor.
        if child == ancestor {
            return Ok(Vec::new());
        }

        let with_deleted = deleted_filter(opts);
        let query = self.format_query(&format!(
            "WITH RECURSIVE get_parents AS ( \
                 SELECT id, parent_id, 0 AS depth FROM directories \
                 WHERE id = $1 AND ({with_deleted} OR deleted_at IS NULL) \
                 UNION \
                 SELECT d.id, d.parent_id, gp.depth + 1 FROM directories d \
                 INNER JOIN get_parents gp ON d.id = gp.parent_id \
                 WHERE gp.id != $2 AND ({with_deleted} OR d.deleted_at IS NULL) \
             ) SELECT id FROM get_parents {{aost}} ORDER BY depth ASC"
        ));

        let parents = sqlx::query_scalar::<_, DirectoryId>(&query)
            .bind(child)
            .bind(ancestor)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get parents", e))?;

        if parents.is_empty() {
            return Err(AppError::directory_not_found(format!(
                "directory {child} not found"
            )));
        }

        // The seed row is the child itself.
        Ok(parents.into_iter().skip(1).collect())
    }

    /// Return the transitive descendants of `parent`, excluding `parent`
    /// itself. Order is unspecified. Fails with `DirectoryNotFound` if the
    /// parent does not exist.
    pub async fn get_children(
        &self,
        parent: DirectoryId,
        opts: QueryOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        let with_deleted = deleted_filter(opts);
        let query = self.format_query(&format!(
            "WITH RECURSIVE get_children AS ( \
                 SELECT id, parent_id FROM directories \
                 WHERE id = $1 AND ({with_deleted} OR deleted_at IS NULL) \
                 UNION \
                 SELECT d.id, d.parent_id FROM directories d \
                 INNER JOIN get_children gc ON d.parent_id = gc.id \
                 WHERE ({with_deleted} OR d.deleted_at IS NULL) \
             ) SELECT id FROM get_children {{aost}}"
        ));

        let children = sqlx::query_scalar::<_, DirectoryId>(&query)
            .bind(parent)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get children", e))?;

        if children.is_empty() {
            return Err(AppError::directory_not_found(format!(
                "directory {parent} not found"
            )));
        }

        // The seed row is the parent itself.
        Ok(children.into_iter().filter(|d| *d != parent).collect())
    }

    fn guard_mutation(&self) -> AppResult<()> {
        if self.read_only {
            return Err(AppError::read_only("driver is in read-only mode"));
        }
        Ok(())
    }

    /// Splice the follower-read clause into a read query, or strip the
    /// placeholder when fast reads are off. Writes never pass through here.
    fn format_query(&self, query: &str) -> String {
        if self.fast_reads {
            query.replace(AOST_MARKER, FOLLOWER_READS_CLAUSE)
        } else {
            query.replace(AOST_MARKER, "")
        }
    }
}

fn deleted_filter(opts: QueryOptions) -> &'static str {
    if opts.with_deleted {
        "true"
    } else {
        "false"
    }
}
