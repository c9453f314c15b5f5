//! Subcommand implementations.
//!
//! Each command returns a serializable report; `main` prints it as JSON.

use anyhow::Result;
use clap::ValueEnum;
use liftlog_core::{Exercise, Liftlog, Model, Searchable, Workout};
use serde::Serialize;
use tracing::info;

/// A searchable record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Namespace {
    Workout,
    Exercise,
}

/// Target of a reindex run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReindexTarget {
    Workout,
    Exercise,
    All,
}

#[derive(Debug, Serialize)]
pub struct ReindexReport {
    pub backend: &'static str,
    pub upserted: Vec<(&'static str, usize)>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub namespace: &'static str,
    pub expression: String,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub database: Option<String>,
    pub backend: &'static str,
    pub available: bool,
    pub failure_policy: String,
    pub workouts: usize,
    pub exercises: usize,
}

pub async fn reindex(app: &Liftlog, target: ReindexTarget) -> Result<ReindexReport> {
    let mut upserted = Vec::new();
    if matches!(target, ReindexTarget::Workout | ReindexTarget::All) {
        upserted.push((Workout::TABLE, app.reindex::<Workout>().await?));
    }
    if matches!(target, ReindexTarget::Exercise | ReindexTarget::All) {
        upserted.push((Exercise::TABLE, app.reindex::<Exercise>().await?));
    }

    info!("Reindex finished: {:?}", upserted);
    Ok(ReindexReport {
        backend: app.search_index().backend_name(),
        upserted,
    })
}

pub async fn search(
    app: &Liftlog,
    namespace: Namespace,
    expression: &str,
    page: usize,
    per_page: usize,
) -> Result<SearchReport> {
    let (namespace, total, results) = match namespace {
        Namespace::Workout => {
            let (rows, total) = app.search_records::<Workout>(expression, page, per_page).await?;
            (Workout::TABLE, total, to_results(rows, |w| w.name))
        }
        Namespace::Exercise => {
            let (rows, total) = app
                .search_records::<Exercise>(expression, page, per_page)
                .await?;
            (Exercise::TABLE, total, to_results(rows, |e| e.name))
        }
    };

    Ok(SearchReport {
        namespace,
        expression: expression.to_string(),
        page,
        per_page,
        total,
        results,
    })
}

fn to_results<T: Searchable>(rows: Vec<T>, name: impl Fn(T) -> String) -> Vec<SearchResult> {
    rows.into_iter()
        .map(|row| SearchResult {
            id: row.document_id(),
            name: name(row),
        })
        .collect()
}

pub async fn status(app: &Liftlog) -> Result<StatusReport> {
    let db = app.database();
    Ok(StatusReport {
        database: db.db_path().map(|p| p.display().to_string()),
        backend: app.search_index().backend_name(),
        available: app.search_available().await,
        failure_policy: app.synchronizer().policy().to_string(),
        workouts: Workout::count(db)?,
        exercises: Exercise::count(db)?,
    })
}
