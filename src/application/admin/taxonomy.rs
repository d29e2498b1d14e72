use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::application::admin::activity::AdminActivityService;
use crate::application::repos::{RepoError, TaxonomyRepo, TaxonomyWriteRepo, UpsertTaxonomyParams};
use crate::domain::entities::{TaxonomyRecord, TranslationRecord};
use crate::domain::error::DomainError;
use crate::domain::types::{Locale, TaxonomyKind};

#[derive(Debug, Error)]
pub enum AdminTaxonomyError {
    #[error("Missing slug")]
    MissingSlug,
    #[error(transparent)]
    InvalidLocale(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw translation input as sent by the editor.
#[derive(Debug, Clone, Default)]
pub struct TranslationInput {
    pub locale: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpsertTaxonomyCommand {
    pub slug: Option<String>,
    pub translations: Vec<TranslationInput>,
}

#[derive(Debug, Clone, Serialize)]
struct TaxonomySnapshot<'a> {
    slug: &'a str,
    name: &'a str,
    locales: Vec<Locale>,
}

/// Category and tag maintenance. Both kinds share one service.
#[derive(Clone)]
pub struct AdminTaxonomyService {
    reader: Arc<dyn TaxonomyRepo>,
    writer: Arc<dyn TaxonomyWriteRepo>,
    activity: AdminActivityService,
}

impl AdminTaxonomyService {
    pub fn new(
        reader: Arc<dyn TaxonomyRepo>,
        writer: Arc<dyn TaxonomyWriteRepo>,
        activity: AdminActivityService,
    ) -> Self {
        Self {
            reader,
            writer,
            activity,
        }
    }

    pub async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyRecord>, AdminTaxonomyError> {
        self.reader.list(kind).await.map_err(AdminTaxonomyError::from)
    }

    /// Create or update an entry by slug.
    ///
    /// Translations missing a locale or a name are dropped. The first
    /// remaining translation becomes the default name; without one an
    /// existing entry keeps its name and a new entry is named after its slug.
    pub async fn upsert(
        &self,
        actor: &str,
        kind: TaxonomyKind,
        command: UpsertTaxonomyCommand,
    ) -> Result<TaxonomyRecord, AdminTaxonomyError> {
        let slug = command
            .slug
            .map(|slug| slug.trim().to_string())
            .filter(|slug| !slug.is_empty())
            .ok_or(AdminTaxonomyError::MissingSlug)?;

        let translations = normalize_translations(command.translations)?;
        let name = translations.first().map(|translation| translation.name.clone());

        let record = self
            .writer
            .upsert(
                kind,
                UpsertTaxonomyParams {
                    slug,
                    name,
                    translations,
                },
            )
            .await?;

        let snapshot = TaxonomySnapshot {
            slug: &record.slug,
            name: &record.name,
            locales: record
                .translations
                .iter()
                .map(|translation| translation.locale)
                .collect(),
        };
        self.activity
            .record_success(
                actor,
                &format!("{}.upsert", kind.as_str()),
                Some(&record.id.to_string()),
                Some(&snapshot),
            )
            .await;

        Ok(record)
    }
}

fn normalize_translations(
    inputs: Vec<TranslationInput>,
) -> Result<Vec<TranslationRecord>, DomainError> {
    let mut translations: Vec<TranslationRecord> = Vec::new();
    for input in inputs {
        let (Some(locale), Some(name)) = (input.locale, input.name) else {
            continue;
        };
        let (locale, name) = (locale.trim(), name.trim());
        if locale.is_empty() || name.is_empty() {
            continue;
        }
        let locale: Locale = locale.parse()?;
        match translations
            .iter_mut()
            .find(|existing| existing.locale == locale)
        {
            Some(existing) => existing.name = name.to_string(),
            None => translations.push(TranslationRecord {
                locale,
                name: name.to_string(),
            }),
        }
    }
    Ok(translations)
}
