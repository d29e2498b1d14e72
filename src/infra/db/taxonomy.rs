use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Executor, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    RepoError, TaxonomyRepo, TaxonomyWriteRepo, UpsertTaxonomyParams,
};
use crate::domain::entities::{TaxonomyRecord, TranslationRecord};
use crate::domain::types::{Locale, TaxonomyKind};

use super::{PostgresRepositories, map_sqlx_error};

/// Table and column names for one taxonomy kind. All values are static.
#[derive(Debug, Clone, Copy)]
pub(super) struct TaxonomyTables {
    pub(super) entity: &'static str,
    pub(super) translations: &'static str,
    pub(super) links: &'static str,
    pub(super) foreign_key: &'static str,
}

impl TaxonomyTables {
    pub(super) fn of(kind: TaxonomyKind) -> Self {
        match kind {
            TaxonomyKind::Category => Self {
                entity: "categories",
                translations: "category_translations",
                links: "post_categories",
                foreign_key: "category_id",
            },
            TaxonomyKind::Tag => Self {
                entity: "tags",
                translations: "tag_translations",
                links: "post_tags",
                foreign_key: "tag_id",
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaxonomyRow {
    id: Uuid,
    slug: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct TranslationRow {
    owner_id: Uuid,
    locale: Locale,
    name: String,
}

#[derive(sqlx::FromRow)]
struct LinkedTaxonomyRow {
    post_id: Uuid,
    id: Uuid,
    slug: String,
    name: String,
}

async fn load_translations<'e, E>(
    executor: E,
    tables: TaxonomyTables,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<TranslationRecord>>, RepoError>
where
    E: Executor<'e, Database = Postgres>,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT {fk} AS owner_id, locale, name FROM {table} WHERE {fk} = ANY($1) ORDER BY locale",
        fk = tables.foreign_key,
        table = tables.translations,
    );
    let rows = sqlx::query_as::<_, TranslationRow>(&sql)
        .bind(ids)
        .fetch_all(executor)
        .await
        .map_err(map_sqlx_error)?;

    let mut grouped: HashMap<Uuid, Vec<TranslationRecord>> = HashMap::new();
    for row in rows {
        grouped.entry(row.owner_id).or_default().push(TranslationRecord {
            locale: row.locale,
            name: row.name,
        });
    }
    Ok(grouped)
}

fn assemble(
    rows: Vec<TaxonomyRow>,
    mut translations: HashMap<Uuid, Vec<TranslationRecord>>,
) -> Vec<TaxonomyRecord> {
    rows.into_iter()
        .map(|row| TaxonomyRecord {
            translations: translations.remove(&row.id).unwrap_or_default(),
            id: row.id,
            slug: row.slug,
            name: row.name,
        })
        .collect()
}

impl PostgresRepositories {
    /// Taxonomy entries linked to each of `post_ids`, ordered by name.
    pub(super) async fn load_post_taxonomy(
        &self,
        kind: TaxonomyKind,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<TaxonomyRecord>>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let tables = TaxonomyTables::of(kind);
        let sql = format!(
            "SELECT l.post_id, t.id, t.slug, t.name FROM {links} l \
             INNER JOIN {entity} t ON t.id = l.{fk} \
             WHERE l.post_id = ANY($1) ORDER BY t.name, t.id",
            links = tables.links,
            entity = tables.entity,
            fk = tables.foreign_key,
        );
        let rows = sqlx::query_as::<_, LinkedTaxonomyRow>(&sql)
            .bind(post_ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        ids.sort_unstable();
        ids.dedup();
        let translations = load_translations(self.pool(), tables, &ids).await?;

        let mut grouped: HashMap<Uuid, Vec<TaxonomyRecord>> = HashMap::new();
        for row in rows {
            grouped.entry(row.post_id).or_default().push(TaxonomyRecord {
                translations: translations.get(&row.id).cloned().unwrap_or_default(),
                id: row.id,
                slug: row.slug,
                name: row.name,
            });
        }
        Ok(grouped)
    }

    /// Linked taxonomy ids per post, for scoring.
    pub(super) async fn load_post_taxonomy_ids(
        &self,
        kind: TaxonomyKind,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Uuid>>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let tables = TaxonomyTables::of(kind);
        let sql = format!(
            "SELECT post_id, {fk} FROM {links} WHERE post_id = ANY($1)",
            fk = tables.foreign_key,
            links = tables.links,
        );
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(&sql)
            .bind(post_ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (post_id, id) in rows {
            grouped.entry(post_id).or_default().push(id);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl TaxonomyRepo for PostgresRepositories {
    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyRecord>, RepoError> {
        let tables = TaxonomyTables::of(kind);
        let sql = format!(
            "SELECT id, slug, name FROM {entity} ORDER BY name, id",
            entity = tables.entity
        );
        let rows = sqlx::query_as::<_, TaxonomyRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let translations = load_translations(self.pool(), tables, &ids).await?;
        Ok(assemble(rows, translations))
    }

    async fn find_by_slug(
        &self,
        kind: TaxonomyKind,
        slug: &str,
    ) -> Result<Option<TaxonomyRecord>, RepoError> {
        let tables = TaxonomyTables::of(kind);
        let sql = format!(
            "SELECT id, slug, name FROM {entity} WHERE slug = $1",
            entity = tables.entity
        );
        let row = sqlx::query_as::<_, TaxonomyRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let translations = load_translations(self.pool(), tables, &[row.id]).await?;
        Ok(assemble(vec![row], translations).pop())
    }
}

#[async_trait]
impl TaxonomyWriteRepo for PostgresRepositories {
    async fn upsert(
        &self,
        kind: TaxonomyKind,
        params: UpsertTaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError> {
        let tables = TaxonomyTables::of(kind);
        let UpsertTaxonomyParams {
            slug,
            name,
            translations,
        } = params;

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let now = OffsetDateTime::now_utc();

        let sql = format!(
            "INSERT INTO {entity} (id, slug, name, created_at, updated_at) \
             VALUES ($1, $2, COALESCE($3, $2), $4, $4) \
             ON CONFLICT (slug) DO UPDATE \
             SET name = COALESCE($3, {entity}.name), updated_at = $4 \
             RETURNING id, slug, name",
            entity = tables.entity
        );
        let row = sqlx::query_as::<_, TaxonomyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&slug)
            .bind(name)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "INSERT INTO {table} ({fk}, locale, name) VALUES ($1, $2, $3) \
             ON CONFLICT ({fk}, locale) DO UPDATE SET name = EXCLUDED.name",
            table = tables.translations,
            fk = tables.foreign_key,
        );
        for translation in translations {
            sqlx::query(&sql)
                .bind(row.id)
                .bind(translation.locale)
                .bind(translation.name)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        let translations = load_translations(&mut *tx, tables, &[row.id]).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        assemble(vec![row], translations)
            .pop()
            .ok_or(RepoError::NotFound)
    }
}
