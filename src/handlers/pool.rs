// src/handlers/pool.rs

use std::collections::HashSet;
use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{DEFAULT_CATEGORY, ImportPoolRequest, ImportQuestion, QuestionRecord},
    store::RoomStore,
    utils::html::strip_markup,
};

/// Turns imported rows into pool records.
///
/// * Missing ids become the row's 1-based position.
/// * Missing or blank categories become `DEFAULT_CATEGORY`.
/// * Text is stripped of markup; rows whose term ends up empty are rejected.
/// * Duplicate ids are rejected.
fn normalize_import(rows: Vec<ImportQuestion>) -> Result<Vec<QuestionRecord>, AppError> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(rows.len());

    for (position, row) in rows.into_iter().enumerate() {
        let id = row.id.unwrap_or(position as i64 + 1);
        if !seen.insert(id) {
            return Err(AppError::BadRequest(format!("Duplicate question id {}", id)));
        }

        let term = strip_markup(&row.term);
        if term.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Row {} has an empty term",
                position + 1
            )));
        }

        let category = row
            .category
            .as_deref()
            .map(strip_markup)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        records.push(QuestionRecord {
            id,
            term,
            book: row.book.as_deref().map(strip_markup).unwrap_or_default(),
            category,
            keywords: row.keywords.as_deref().map(strip_markup).unwrap_or_default(),
        });
    }

    Ok(records)
}

/// Lists the current question pool.
pub async fn list_pool(
    State(store): State<Arc<dyn RoomStore>>,
) -> Result<impl IntoResponse, AppError> {
    let pool = store.read_pool().await?;
    Ok(Json(pool))
}

/// Replaces the question pool wholesale.
/// Rooms already playing keep the queue they were dealt.
pub async fn import_pool(
    State(store): State<Arc<dyn RoomStore>>,
    Json(payload): Json<ImportPoolRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let records = normalize_import(payload.questions)?;
    let imported = store.replace_pool(records).await?;
    tracing::info!("Question pool replaced with {} records", imported);

    Ok(Json(serde_json::json!({
        "imported": imported,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<i64>, term: &str, category: Option<&str>) -> ImportQuestion {
        ImportQuestion {
            id,
            term: term.to_string(),
            book: Some("Book 1".to_string()),
            category: category.map(str::to_string),
            keywords: None,
        }
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let records = normalize_import(vec![
            row(None, "Koxinga", Some("Ming loyalists")),
            row(None, "Dutch Formosa", None),
            row(Some(10), "Tainan", Some("  ")),
        ])
        .unwrap();

        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].category, DEFAULT_CATEGORY);
        assert_eq!(records[2].id, 10);
        assert_eq!(records[2].category, DEFAULT_CATEGORY);
        assert_eq!(records[0].keywords, "");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = normalize_import(vec![row(Some(2), "a", None), row(None, "b", None)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_markup_only_term_rejected() {
        let err = normalize_import(vec![row(None, "<script>x</script>", None)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_ampersand_category_survives_import_and_filters() {
        use rand::{SeedableRng, rngs::StdRng};
        use std::collections::BTreeSet;

        let records = normalize_import(vec![
            row(None, "Treaty of Nanking & Opium", Some("Qing & Britain")),
            row(None, "Koxinga", Some("Ming loyalists")),
        ])
        .unwrap();
        assert_eq!(records[0].term, "Treaty of Nanking & Opium");
        assert_eq!(records[0].category, "Qing & Britain");

        let queue = crate::game::round::build_queue(
            &records,
            "Qing & Britain",
            false,
            &BTreeSet::new(),
            &mut StdRng::seed_from_u64(7),
        )
        .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, 1);
    }
}
