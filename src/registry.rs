use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dataset::Dataset;
use crate::store::DatasetStore;

/// Listing view of a dataset: everything but the rows.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl DatasetSummary {
    pub fn of(dataset: &Dataset) -> Self {
        DatasetSummary {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            columns: dataset.columns.clone(),
            row_count: dataset.row_count(),
            created_at: dataset.created_at,
            created_by: dataset.created_by.clone(),
        }
    }
}

/// Dashboard header numbers plus the most recent uploads.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub dataset_count: usize,
    pub total_rows: usize,
    pub last_upload: Option<DateTime<Utc>>,
    pub recent: Vec<DatasetSummary>,
}

/// How many datasets the dashboard's recent-activity list shows.
pub const RECENT_LIMIT: usize = 5;

/// The dataset collection and the current selection.
///
/// Loads the persisted array once on open; every mutation rewrites the whole
/// blob. The current selection itself is not persisted.
pub struct DataRegistry {
    datasets: Vec<Dataset>,
    current: Option<String>,
    store: DatasetStore,
}

impl DataRegistry {
    pub fn open(store: DatasetStore) -> Result<Self, String> {
        let datasets = store.load()?;
        Ok(DataRegistry {
            datasets,
            current: None,
            store,
        })
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|ds| ds.id == id)
    }

    /// Append a dataset and persist the collection. Existing datasets are
    /// never overwritten; a re-upload simply adds a new entry.
    pub fn add_dataset(&mut self, dataset: Dataset) -> Result<DatasetSummary, String> {
        let summary = DatasetSummary::of(&dataset);
        self.datasets.push(dataset);
        self.persist()?;
        Ok(summary)
    }

    /// Remove a dataset by id and persist. If the removed dataset was the
    /// current selection, the selection is cleared. Returns whether anything
    /// was removed.
    pub fn remove_dataset(&mut self, id: &str) -> Result<bool, String> {
        let before = self.datasets.len();
        self.datasets.retain(|ds| ds.id != id);
        if self.datasets.len() == before {
            return Ok(false);
        }

        if self.current.as_deref() == Some(id) {
            self.current = None;
        }

        self.persist()?;
        Ok(true)
    }

    /// Select a dataset by id. Unknown ids are an error message, not a panic.
    pub fn set_current(&mut self, id: &str) -> Result<(), String> {
        if self.get(id).is_none() {
            return Err("Dataset not found".to_string());
        }
        self.current = Some(id.to_string());
        Ok(())
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Explicitly selected dataset id, if any.
    pub fn selected_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The dataset charts are built from: the explicit selection when one is
    /// set, otherwise the first dataset in the collection. An empty
    /// collection degrades to `None`.
    pub fn current_dataset(&self) -> Option<&Dataset> {
        match &self.current {
            Some(id) => self.get(id),
            None => self.datasets.first(),
        }
    }

    pub fn summaries(&self) -> Vec<DatasetSummary> {
        self.datasets.iter().map(DatasetSummary::of).collect()
    }

    /// Up to `n` datasets, newest first.
    pub fn recent(&self, n: usize) -> Vec<DatasetSummary> {
        let mut summaries = self.summaries();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries.truncate(n);
        summaries
    }

    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary {
            dataset_count: self.datasets.len(),
            total_rows: self.datasets.iter().map(Dataset::row_count).sum(),
            last_upload: self.datasets.iter().map(|ds| ds.created_at).max(),
            recent: self.recent(RECENT_LIMIT),
        }
    }

    fn persist(&self) -> Result<(), String> {
        self.store.save(&self.datasets)
    }
}
