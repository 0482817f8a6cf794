use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::occupancy::OccupancyManager;
use crate::patients::PatientStore;
use crate::projections::Projections;
use crate::records::SubRecordAppender;
use crate::store::DocumentStore;
use crate::wards::WardStore;
use std::sync::Arc;

/// All core operations over one shared store. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct WardService {
    cfg: Arc<CoreConfig>,
    wards: WardStore,
    patients: PatientStore,
    occupancy: OccupancyManager,
    records: SubRecordAppender,
    projections: Projections,
}

impl WardService {
    /// A service whose documents live in memory only.
    pub fn in_memory(cfg: Arc<CoreConfig>) -> Self {
        let store = Arc::new(DocumentStore::in_memory(cfg.clone()));
        Self::with_store(cfg, store)
    }

    /// Open the service described by `cfg`, loading persisted documents when a data directory
    /// is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or read.
    pub fn open(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        let store = Arc::new(DocumentStore::open(cfg.clone())?);
        Ok(Self::with_store(cfg, store))
    }

    fn with_store(cfg: Arc<CoreConfig>, store: Arc<DocumentStore>) -> Self {
        Self {
            cfg,
            wards: WardStore::new(store.clone()),
            patients: PatientStore::new(store.clone()),
            occupancy: OccupancyManager::new(store.clone()),
            records: SubRecordAppender::new(store.clone()),
            projections: Projections::new(store),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn wards(&self) -> &WardStore {
        &self.wards
    }

    pub fn patients(&self) -> &PatientStore {
        &self.patients
    }

    pub fn occupancy(&self) -> &OccupancyManager {
        &self.occupancy
    }

    pub fn records(&self) -> &SubRecordAppender {
        &self.records
    }

    pub fn projections(&self) -> &Projections {
        &self.projections
    }
}
