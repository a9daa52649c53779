use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::repositories::TemplateRepository;
use crate::domain::template::PromptTemplate;
use crate::infrastructure::persistence::database::Database;

pub struct SqliteTemplateRepository {
    database: Database,
}

impl SqliteTemplateRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

type TemplateRow = (String, String, String, bool, i64, DateTime<Utc>, DateTime<Utc>);

fn row_to_template(row: TemplateRow) -> PromptTemplate {
    let (template_id, name, content, strict, version, created_at, updated_at) = row;
    PromptTemplate {
        template_id,
        name,
        content,
        strict,
        version,
        created_at,
        updated_at,
    }
}

#[async_trait]
impl TemplateRepository for SqliteTemplateRepository {
    async fn get(&self, template_id: &str) -> Result<Option<PromptTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT template_id, name, content, strict, version, created_at, updated_at
            FROM prompt_templates WHERE template_id = $1
            "#,
        )
        .bind(template_id)
        .fetch_optional(&self.database.pool)
        .await
        .context("failed to load prompt template")?;

        Ok(row.map(row_to_template))
    }

    async fn list(&self) -> Result<Vec<PromptTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT template_id, name, content, strict, version, created_at, updated_at
            FROM prompt_templates ORDER BY name
            "#,
        )
        .fetch_all(&self.database.pool)
        .await
        .context("failed to list prompt templates")?;

        Ok(rows.into_iter().map(row_to_template).collect())
    }

    async fn save(&self, template: &PromptTemplate) -> Result<()> {
        let existing: Option<(String, i64)> =
            sqlx::query_as("SELECT content, version FROM prompt_templates WHERE template_id = $1")
                .bind(&template.template_id)
                .fetch_optional(&self.database.pool)
                .await
                .context("failed to check existing template")?;

        let version = match existing {
            Some((existing_content, existing_version)) if existing_content != template.content => {
                existing_version + 1
            }
            Some((_, existing_version)) => existing_version,
            None => template.version,
        };

        sqlx::query(
            r#"
            INSERT INTO prompt_templates (template_id, name, content, strict, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(template_id) DO UPDATE SET
                name = excluded.name,
                content = excluded.content,
                strict = excluded.strict,
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&template.template_id)
        .bind(&template.name)
        .bind(&template.content)
        .bind(template.strict)
        .bind(version)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.database.pool)
        .await
        .context("failed to save prompt template")?;

        Ok(())
    }

    async fn delete(&self, template_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM prompt_templates WHERE template_id = $1")
            .bind(template_id)
            .execute(&self.database.pool)
            .await
            .context("failed to delete prompt template")?;
        Ok(())
    }
}
