//! Database repository for CRUD operations.
//!
//! Reads assemble the nested review tree with one query per table level.
//! Ingestion writes the whole tree inside a single transaction.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::ingest::{BlockEntry, FlatBlock, NewField};
use crate::models::{
    Compound, CreateFileRequest, CreateMessageRequest, CreateReviewerRequest, Field, FieldCount,
    File, Message, MessageTarget, Metadatablock, OwnerRef, Review, Reviewer,
    UpdateCompoundRequest, UpdateFieldRequest, UpdateFileRequest, UpdateMessageRequest,
    UpdateMetadatablockRequest, UpdateReviewRequest, UpdateReviewerRequest,
};

const REVIEW_SELECT: &str =
    "SELECT id, reviewer_id, doi, site_url, revision, accepted, date FROM reviews";
const REVIEWER_SELECT: &str =
    "SELECT id, username, first_name, last_name, email, affiliation FROM reviewers";
const BLOCK_SELECT: &str = "SELECT id, review_id, name, description FROM metadatablocks";
const COMPOUND_SELECT: &str =
    "SELECT id, metadatablock_id, name, description, accepted FROM compounds";
const FIELD_SELECT: &str = "SELECT id, metadatablock_id, compound_id, name, description, value, accepted, history FROM fields";
const FILE_SELECT: &str = "SELECT id, review_id, name, description, accepted FROM files";
const MESSAGE_SELECT: &str =
    "SELECT id, field_id, compound_id, content, author, timestamp FROM messages";

/// Parent IDs bound per `IN (...)` query, well below SQLite's variable limit.
const IN_CHUNK_SIZE: usize = 500;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== INGESTION ====================

    /// The first review stored for a DOI, with its full tree.
    pub async fn find_review_by_doi(&self, doi: &str) -> Result<Option<Review>, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE doi = ? ORDER BY date, rowid LIMIT 1",
            REVIEW_SELECT
        ))
        .bind(doi)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self
                .attach_children(vec![review_from_row(&row)])
                .await?
                .pop()),
            None => Ok(None),
        }
    }

    /// Persist a review and its flattened blocks atomically.
    ///
    /// Returns the review ID. When another review for the DOI was committed
    /// first, its ID is returned and nothing is written. Nothing is written
    /// either if any insert fails.
    pub async fn insert_review_tree(
        &self,
        doi: &str,
        site_url: &str,
        blocks: &[FlatBlock],
    ) -> Result<String, AppError> {
        let review_id = new_id();

        let mut tx = self.pool.begin().await?;

        // Writing first takes the write lock before the DOI is checked.
        let inserted = sqlx::query(
            r#"INSERT INTO reviews (id, reviewer_id, doi, site_url, revision, accepted, date)
               SELECT ?, NULL, ?, ?, 1, 0, ?
               WHERE NOT EXISTS (SELECT 1 FROM reviews WHERE doi = ?)"#,
        )
        .bind(&review_id)
        .bind(doi)
        .bind(site_url)
        .bind(timestamp())
        .bind(doi)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let existing: String = sqlx::query(
                "SELECT id FROM reviews WHERE doi = ? ORDER BY date, rowid LIMIT 1",
            )
            .bind(doi)
            .fetch_one(&mut *tx)
            .await?
            .get("id");
            tx.rollback().await?;

            tracing::debug!(doi = %doi, review_id = %existing, "Review already stored for DOI");
            return Ok(existing);
        }

        for (block_position, block) in blocks.iter().enumerate() {
            let block_id = insert_metadatablock(&mut tx, &review_id, block, block_position).await?;
            let block_owner = OwnerRef::Metadatablock(block_id.clone());

            for (position, entry) in block.entries.iter().enumerate() {
                match entry {
                    BlockEntry::Field(field) => {
                        insert_field(&mut tx, &block_owner, field, position).await?;
                    }
                    BlockEntry::Compound {
                        name,
                        description,
                        fields,
                    } => {
                        let compound_id =
                            insert_compound(&mut tx, &block_id, name, description, position)
                                .await?;
                        let compound_owner = OwnerRef::Compound(compound_id);
                        for (field_position, field) in fields.iter().enumerate() {
                            insert_field(&mut tx, &compound_owner, field, field_position).await?;
                        }
                    }
                }
            }
        }

        tx.commit().await?;

        Ok(review_id)
    }

    // ==================== REVIEW OPERATIONS ====================

    /// List all reviews with their trees, oldest first.
    pub async fn list_reviews(&self) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY date, rowid", REVIEW_SELECT))
            .fetch_all(&self.pool)
            .await?;

        self.attach_children(rows.iter().map(review_from_row).collect())
            .await
    }

    /// List reviews of one DOI.
    pub async fn list_reviews_by_doi(&self, doi: &str) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE doi = ? ORDER BY date, rowid",
            REVIEW_SELECT
        ))
        .bind(doi)
        .fetch_all(&self.pool)
        .await?;

        self.attach_children(rows.iter().map(review_from_row).collect())
            .await
    }

    /// List reviews assigned to a reviewer.
    pub async fn list_reviews_by_reviewer(
        &self,
        reviewer_id: &str,
    ) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE reviewer_id = ? ORDER BY date, rowid",
            REVIEW_SELECT
        ))
        .bind(reviewer_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_children(rows.iter().map(review_from_row).collect())
            .await
    }

    /// Get a review with its full tree.
    pub async fn get_review(&self, id: &str) -> Result<Option<Review>, AppError> {
        match self.get_review_summary(id).await? {
            Some(review) => Ok(self.attach_children(vec![review]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Get a review row without blocks or files.
    pub async fn get_review_summary(&self, id: &str) -> Result<Option<Review>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", REVIEW_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(review_from_row))
    }

    /// Update review acceptance or its reviewer.
    pub async fn update_review(
        &self,
        id: &str,
        request: &UpdateReviewRequest,
    ) -> Result<Review, AppError> {
        let existing = self
            .get_review_summary(id)
            .await?
            .ok_or_else(|| review_not_found(id))?;

        let accepted = request.accepted.unwrap_or(existing.accepted);
        let reviewer_id = match &request.reviewer_id {
            Some(reviewer_id) => reviewer_id.clone(),
            None => existing.reviewer_id.clone(),
        };

        if let Some(reviewer_id) = &reviewer_id {
            if self.get_reviewer(reviewer_id).await?.is_none() {
                return Err(AppError::BadRequest(format!(
                    "Reviewer {} does not exist",
                    reviewer_id
                )));
            }
        }

        sqlx::query("UPDATE reviews SET accepted = ?, reviewer_id = ? WHERE id = ?")
            .bind(accepted as i32)
            .bind(&reviewer_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_review(id).await?.ok_or_else(|| review_not_found(id))
    }

    /// Delete a review and everything below it.
    pub async fn delete_review(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(review_not_found(id));
        }

        Ok(())
    }

    /// Names of a review's metadatablocks in stored order.
    pub async fn list_metadatablock_names(&self, review_id: &str) -> Result<Vec<String>, AppError> {
        let rows =
            sqlx::query("SELECT name FROM metadatablocks WHERE review_id = ? ORDER BY position")
                .bind(review_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    /// Count every field of a review, directly owned or below a compound.
    pub async fn field_count(&self, review_id: &str) -> Result<FieldCount, AppError> {
        if self.get_review_summary(review_id).await?.is_none() {
            return Err(review_not_found(review_id));
        }

        let row = sqlx::query(
            r#"SELECT COUNT(*) AS field_count,
                      COALESCE(SUM(CASE WHEN accepted = 1 THEN 1 ELSE 0 END), 0) AS accepted_count
               FROM fields
               WHERE metadatablock_id IN (SELECT id FROM metadatablocks WHERE review_id = ?)
                  OR compound_id IN (
                      SELECT c.id FROM compounds c
                      JOIN metadatablocks b ON c.metadatablock_id = b.id
                      WHERE b.review_id = ?
                  )"#,
        )
        .bind(review_id)
        .bind(review_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FieldCount {
            field_count: row.get("field_count"),
            accepted_count: row.get("accepted_count"),
        })
    }

    // ==================== METADATABLOCK OPERATIONS ====================

    /// Get a metadatablock with its fields and compounds.
    pub async fn get_metadatablock(&self, id: &str) -> Result<Option<Metadatablock>, AppError> {
        Ok(self.load_blocks("id", &[id.to_string()]).await?.pop())
    }

    /// Update a metadatablock's description.
    pub async fn update_metadatablock(
        &self,
        id: &str,
        request: &UpdateMetadatablockRequest,
    ) -> Result<Metadatablock, AppError> {
        let mut block = self
            .get_metadatablock(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Metadatablock {} not found", id)))?;

        if let Some(description) = &request.description {
            block.description = description.clone();
        }

        sqlx::query("UPDATE metadatablocks SET description = ? WHERE id = ?")
            .bind(&block.description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(block)
    }

    /// Delete a metadatablock.
    pub async fn delete_metadatablock(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM metadatablocks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Metadatablock {} not found", id)));
        }

        Ok(())
    }

    // ==================== COMPOUND OPERATIONS ====================

    /// Get a compound with its fields and chat.
    pub async fn get_compound(&self, id: &str) -> Result<Option<Compound>, AppError> {
        Ok(self.load_compounds("id", &[id.to_string()]).await?.pop())
    }

    /// Update a compound's description or acceptance.
    pub async fn update_compound(
        &self,
        id: &str,
        request: &UpdateCompoundRequest,
    ) -> Result<Compound, AppError> {
        let mut compound = self
            .get_compound(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Compound {} not found", id)))?;

        if let Some(description) = &request.description {
            compound.description = description.clone();
        }
        if let Some(accepted) = request.accepted {
            compound.accepted = accepted;
        }

        sqlx::query("UPDATE compounds SET description = ?, accepted = ? WHERE id = ?")
            .bind(&compound.description)
            .bind(compound.accepted as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(compound)
    }

    /// Delete a compound.
    pub async fn delete_compound(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM compounds WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Compound {} not found", id)));
        }

        Ok(())
    }

    // ==================== FIELD OPERATIONS ====================

    /// Get a field with its chat.
    pub async fn get_field(&self, id: &str) -> Result<Option<Field>, AppError> {
        Ok(self.load_fields("id", &[id.to_string()]).await?.pop())
    }

    /// Update a field, keeping its value history.
    pub async fn update_field(
        &self,
        id: &str,
        request: &UpdateFieldRequest,
    ) -> Result<Field, AppError> {
        let mut field = self
            .get_field(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Field {} not found", id)))?;

        field.apply_update(request);
        let history_json = serde_json::to_string(&field.history)?;

        sqlx::query(
            "UPDATE fields SET value = ?, description = ?, accepted = ?, history = ? WHERE id = ?",
        )
        .bind(&field.value)
        .bind(&field.description)
        .bind(field.accepted.map(|b| b as i32))
        .bind(&history_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(field)
    }

    /// Delete a field.
    pub async fn delete_field(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM fields WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Field {} not found", id)));
        }

        Ok(())
    }

    // ==================== REVIEWER OPERATIONS ====================

    /// List all reviewers.
    pub async fn list_reviewers(&self) -> Result<Vec<Reviewer>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY username", REVIEWER_SELECT))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(reviewer_from_row).collect())
    }

    /// Get a reviewer by ID.
    pub async fn get_reviewer(&self, id: &str) -> Result<Option<Reviewer>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", REVIEWER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(reviewer_from_row))
    }

    /// Create a new reviewer.
    pub async fn create_reviewer(
        &self,
        request: &CreateReviewerRequest,
    ) -> Result<Reviewer, AppError> {
        require_non_blank("username", &request.username)?;
        require_non_blank("email", &request.email)?;

        let reviewer = Reviewer {
            id: new_id(),
            username: request.username.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            affiliation: request.affiliation.clone(),
        };

        sqlx::query(
            "INSERT INTO reviewers (id, username, first_name, last_name, email, affiliation) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&reviewer.id)
        .bind(&reviewer.username)
        .bind(&reviewer.first_name)
        .bind(&reviewer.last_name)
        .bind(&reviewer.email)
        .bind(&reviewer.affiliation)
        .execute(&self.pool)
        .await?;

        Ok(reviewer)
    }

    /// Update a reviewer.
    pub async fn update_reviewer(
        &self,
        id: &str,
        request: &UpdateReviewerRequest,
    ) -> Result<Reviewer, AppError> {
        let existing = self
            .get_reviewer(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reviewer {} not found", id)))?;

        let reviewer = Reviewer {
            id: existing.id,
            username: request.username.clone().unwrap_or(existing.username),
            first_name: request.first_name.clone().unwrap_or(existing.first_name),
            last_name: request.last_name.clone().unwrap_or(existing.last_name),
            email: request.email.clone().unwrap_or(existing.email),
            affiliation: request.affiliation.clone().unwrap_or(existing.affiliation),
        };
        require_non_blank("username", &reviewer.username)?;
        require_non_blank("email", &reviewer.email)?;

        sqlx::query(
            "UPDATE reviewers SET username = ?, first_name = ?, last_name = ?, email = ?, affiliation = ? WHERE id = ?",
        )
        .bind(&reviewer.username)
        .bind(&reviewer.first_name)
        .bind(&reviewer.last_name)
        .bind(&reviewer.email)
        .bind(&reviewer.affiliation)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(reviewer)
    }

    /// Delete a reviewer. Their reviews stay, unassigned.
    pub async fn delete_reviewer(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM reviewers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reviewer {} not found", id)));
        }

        Ok(())
    }

    // ==================== FILE OPERATIONS ====================

    /// List the files of a review.
    pub async fn list_files_by_review(&self, review_id: &str) -> Result<Vec<File>, AppError> {
        if self.get_review_summary(review_id).await?.is_none() {
            return Err(review_not_found(review_id));
        }

        self.load_files(&[review_id.to_string()]).await
    }

    /// Get a file by ID.
    pub async fn get_file(&self, id: &str) -> Result<Option<File>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", FILE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(file_from_row))
    }

    /// Attach a new file to a review.
    pub async fn create_file(&self, request: &CreateFileRequest) -> Result<File, AppError> {
        require_non_blank("name", &request.name)?;
        if self.get_review_summary(&request.review_id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "Review {} does not exist",
                request.review_id
            )));
        }

        let file = File {
            id: new_id(),
            review_id: request.review_id.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            accepted: request.accepted,
        };

        sqlx::query(
            "INSERT INTO files (id, review_id, name, description, accepted) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(&file.review_id)
        .bind(&file.name)
        .bind(&file.description)
        .bind(file.accepted as i32)
        .execute(&self.pool)
        .await?;

        Ok(file)
    }

    /// Update a file.
    pub async fn update_file(&self, id: &str, request: &UpdateFileRequest) -> Result<File, AppError> {
        let mut file = self
            .get_file(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        if let Some(name) = &request.name {
            require_non_blank("name", name)?;
            file.name = name.clone();
        }
        if let Some(description) = &request.description {
            file.description = description.clone();
        }
        if let Some(accepted) = request.accepted {
            file.accepted = accepted;
        }

        sqlx::query("UPDATE files SET name = ?, description = ?, accepted = ? WHERE id = ?")
            .bind(&file.name)
            .bind(&file.description)
            .bind(file.accepted as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(file)
    }

    /// Delete a file.
    pub async fn delete_file(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("File {} not found", id)));
        }

        Ok(())
    }

    // ==================== MESSAGE OPERATIONS ====================

    /// List all messages in posting order.
    pub async fn list_messages(&self) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY timestamp, rowid", MESSAGE_SELECT))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(message_from_row).collect()
    }

    /// Get a message by ID.
    pub async fn get_message(&self, id: &str) -> Result<Option<Message>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", MESSAGE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    /// Post a message on a field or compound.
    pub async fn create_message(&self, request: &CreateMessageRequest) -> Result<Message, AppError> {
        require_non_blank("content", &request.content)?;

        let target_exists = match &request.target {
            MessageTarget::Field(id) => self.get_field(id).await?.is_some(),
            MessageTarget::Compound(id) => self.get_compound(id).await?.is_some(),
        };
        if !target_exists {
            return Err(AppError::BadRequest(format!(
                "Message target {} does not exist",
                request.target.id()
            )));
        }

        let message = Message {
            id: new_id(),
            target: request.target.clone(),
            content: request.content.clone(),
            author: request.author.clone(),
            timestamp: timestamp(),
        };
        let (field_id, compound_id) = match &message.target {
            MessageTarget::Field(id) => (Some(id.as_str()), None),
            MessageTarget::Compound(id) => (None, Some(id.as_str())),
        };

        sqlx::query(
            "INSERT INTO messages (id, field_id, compound_id, content, author, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(field_id)
        .bind(compound_id)
        .bind(&message.content)
        .bind(&message.author)
        .bind(&message.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    /// Edit a message's content.
    pub async fn update_message(
        &self,
        id: &str,
        request: &UpdateMessageRequest,
    ) -> Result<Message, AppError> {
        let mut message = self
            .get_message(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

        if let Some(content) = &request.content {
            require_non_blank("content", content)?;
            message.content = content.clone();
        }

        sqlx::query("UPDATE messages SET content = ? WHERE id = ?")
            .bind(&message.content)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(message)
    }

    // ==================== TREE LOADING ====================

    /// Fill in blocks and files for review rows.
    async fn attach_children(&self, mut reviews: Vec<Review>) -> Result<Vec<Review>, AppError> {
        let ids: Vec<String> = reviews.iter().map(|r| r.id.clone()).collect();

        let mut blocks = group_by(self.load_blocks("review_id", &ids).await?, |b| {
            b.review_id.clone()
        });
        let mut files = group_by(self.load_files(&ids).await?, |f| f.review_id.clone());

        for review in &mut reviews {
            review.metadatablocks = blocks.remove(&review.id).unwrap_or_default();
            review.files = files.remove(&review.id).unwrap_or_default();
        }

        Ok(reviews)
    }

    async fn load_blocks(&self, column: &str, ids: &[String]) -> Result<Vec<Metadatablock>, AppError> {
        let rows = self.fetch_in(BLOCK_SELECT, column, ids, "position").await?;
        let mut blocks: Vec<Metadatablock> = rows.iter().map(metadatablock_from_row).collect();
        let block_ids: Vec<String> = blocks.iter().map(|b| b.id.clone()).collect();

        let mut primitives = group_by(self.load_fields("metadatablock_id", &block_ids).await?, |f| {
            f.owner.id().to_string()
        });
        let mut compounds = group_by(
            self.load_compounds("metadatablock_id", &block_ids).await?,
            |c| c.metadatablock_id.clone(),
        );

        for block in &mut blocks {
            block.primitives = primitives.remove(&block.id).unwrap_or_default();
            block.compounds = compounds.remove(&block.id).unwrap_or_default();
        }

        Ok(blocks)
    }

    async fn load_compounds(&self, column: &str, ids: &[String]) -> Result<Vec<Compound>, AppError> {
        let rows = self.fetch_in(COMPOUND_SELECT, column, ids, "position").await?;
        let mut compounds: Vec<Compound> = rows.iter().map(compound_from_row).collect();
        let compound_ids: Vec<String> = compounds.iter().map(|c| c.id.clone()).collect();

        let mut primitives = group_by(self.load_fields("compound_id", &compound_ids).await?, |f| {
            f.owner.id().to_string()
        });
        let mut chat = group_by(self.load_messages("compound_id", &compound_ids).await?, |m| {
            m.target.id().to_string()
        });

        for compound in &mut compounds {
            compound.primitives = primitives.remove(&compound.id).unwrap_or_default();
            compound.chat = chat.remove(&compound.id).unwrap_or_default();
        }

        Ok(compounds)
    }

    async fn load_fields(&self, column: &str, ids: &[String]) -> Result<Vec<Field>, AppError> {
        let rows = self.fetch_in(FIELD_SELECT, column, ids, "position").await?;
        let mut fields = rows
            .iter()
            .map(field_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let field_ids: Vec<String> = fields.iter().map(|f| f.id.clone()).collect();

        let mut chat = group_by(self.load_messages("field_id", &field_ids).await?, |m| {
            m.target.id().to_string()
        });
        for field in &mut fields {
            field.chat = chat.remove(&field.id).unwrap_or_default();
        }

        Ok(fields)
    }

    async fn load_messages(&self, column: &str, ids: &[String]) -> Result<Vec<Message>, AppError> {
        let rows = self
            .fetch_in(MESSAGE_SELECT, column, ids, "timestamp, rowid")
            .await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn load_files(&self, review_ids: &[String]) -> Result<Vec<File>, AppError> {
        let rows = self.fetch_in(FILE_SELECT, "review_id", review_ids, "rowid").await?;
        Ok(rows.iter().map(file_from_row).collect())
    }

    /// `{select} WHERE {column} IN (ids) ORDER BY {order}`, one query per
    /// chunk of IDs.
    ///
    /// Rows are ordered within a chunk only. Every row of one parent lands in
    /// the same chunk, so per-parent order holds after grouping.
    /// `column` and `order` are trusted identifiers from this module.
    async fn fetch_in(
        &self,
        select: &str,
        column: &str,
        ids: &[String],
        order: &str,
    ) -> Result<Vec<SqliteRow>, AppError> {
        let mut rows = Vec::new();

        for chunk in ids.chunks(IN_CHUNK_SIZE) {
            let mut query = QueryBuilder::<Sqlite>::new(select);
            query.push(" WHERE ").push(column).push(" IN (");
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
            query.push(" ORDER BY ").push(order);

            rows.extend(query.build().fetch_all(&self.pool).await?);
        }

        Ok(rows)
    }
}

// Ingestion helpers, run inside the ingestion transaction

async fn insert_metadatablock(
    conn: &mut SqliteConnection,
    review_id: &str,
    block: &FlatBlock,
    position: usize,
) -> Result<String, AppError> {
    let id = new_id();
    sqlx::query(
        "INSERT INTO metadatablocks (id, review_id, name, description, position) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(review_id)
    .bind(&block.name)
    .bind(&block.description)
    .bind(position as i64)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

async fn insert_compound(
    conn: &mut SqliteConnection,
    metadatablock_id: &str,
    name: &str,
    description: &str,
    position: usize,
) -> Result<String, AppError> {
    let id = new_id();
    sqlx::query(
        "INSERT INTO compounds (id, metadatablock_id, name, description, accepted, position) VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(metadatablock_id)
    .bind(name)
    .bind(description)
    .bind(position as i64)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

async fn insert_field(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    field: &NewField,
    position: usize,
) -> Result<String, AppError> {
    let id = new_id();
    let (metadatablock_id, compound_id) = match owner {
        OwnerRef::Metadatablock(id) => (Some(id.as_str()), None),
        OwnerRef::Compound(id) => (None, Some(id.as_str())),
    };
    let history_json = serde_json::to_string(&field.history)?;

    sqlx::query(
        r#"INSERT INTO fields (id, metadatablock_id, compound_id, name, description, value, accepted, history, position)
           VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)"#,
    )
    .bind(&id)
    .bind(metadatablock_id)
    .bind(compound_id)
    .bind(&field.name)
    .bind(&field.description)
    .bind(&field.value)
    .bind(&history_json)
    .bind(position as i64)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

// Helper functions for row conversion

fn review_from_row(row: &SqliteRow) -> Review {
    let accepted: i32 = row.get("accepted");
    Review {
        id: row.get("id"),
        reviewer_id: row.get("reviewer_id"),
        doi: row.get("doi"),
        site_url: row.get("site_url"),
        revision: row.get("revision"),
        accepted: accepted != 0,
        date: row.get("date"),
        metadatablocks: Vec::new(),
        files: Vec::new(),
    }
}

fn reviewer_from_row(row: &SqliteRow) -> Reviewer {
    Reviewer {
        id: row.get("id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        affiliation: row.get("affiliation"),
    }
}

fn metadatablock_from_row(row: &SqliteRow) -> Metadatablock {
    Metadatablock {
        id: row.get("id"),
        review_id: row.get("review_id"),
        name: row.get("name"),
        description: row.get("description"),
        primitives: Vec::new(),
        compounds: Vec::new(),
    }
}

fn compound_from_row(row: &SqliteRow) -> Compound {
    let accepted: i32 = row.get("accepted");
    Compound {
        id: row.get("id"),
        metadatablock_id: row.get("metadatablock_id"),
        name: row.get("name"),
        description: row.get("description"),
        accepted: accepted != 0,
        primitives: Vec::new(),
        chat: Vec::new(),
    }
}

fn field_from_row(row: &SqliteRow) -> Result<Field, AppError> {
    let id: String = row.get("id");
    let metadatablock_id: Option<String> = row.get("metadatablock_id");
    let compound_id: Option<String> = row.get("compound_id");
    let accepted: Option<i32> = row.get("accepted");
    let history: String = row.get("history");

    let owner = match (metadatablock_id, compound_id) {
        (Some(block), None) => OwnerRef::Metadatablock(block),
        (None, Some(compound)) => OwnerRef::Compound(compound),
        _ => return Err(AppError::Internal(format!("Field {} has no single owner", id))),
    };

    Ok(Field {
        id,
        owner,
        name: row.get("name"),
        description: row.get("description"),
        value: row.get("value"),
        accepted: accepted.map(|v| v != 0),
        history: serde_json::from_str(&history)?,
        chat: Vec::new(),
    })
}

fn file_from_row(row: &SqliteRow) -> File {
    let accepted: i32 = row.get("accepted");
    File {
        id: row.get("id"),
        review_id: row.get("review_id"),
        name: row.get("name"),
        description: row.get("description"),
        accepted: accepted != 0,
    }
}

fn message_from_row(row: &SqliteRow) -> Result<Message, AppError> {
    let id: String = row.get("id");
    let field_id: Option<String> = row.get("field_id");
    let compound_id: Option<String> = row.get("compound_id");

    let target = match (field_id, compound_id) {
        (Some(field), None) => MessageTarget::Field(field),
        (None, Some(compound)) => MessageTarget::Compound(compound),
        _ => return Err(AppError::Internal(format!("Message {} has no single target", id))),
    };

    Ok(Message {
        id,
        target,
        content: row.get("content"),
        author: row.get("author"),
        timestamp: row.get("timestamp"),
    })
}

/// Groups rows by parent ID, keeping their order within each group.
fn group_by<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> HashMap<String, Vec<T>> {
    let mut groups: HashMap<String, Vec<T>> = HashMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

fn review_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Review with ID '{}' does not exist.", id))
}

fn require_non_blank(name: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{}' must not be empty", name)));
    }
    Ok(())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fixed-width UTC timestamps sort lexically in creation order.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
