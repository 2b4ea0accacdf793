//! Detector ID to transform-table index resolution.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::error::{InstviewError, Result};
use crate::geometry::{DetectorId, GeometryModel};

/// Constant-time map from logical detector IDs to table indices.
#[derive(Debug, Clone, Default)]
pub struct DetectorIdMap {
    index_of: FxHashMap<DetectorId, usize>,
}

impl DetectorIdMap {
    /// Builds the map from every detector in the model.
    ///
    /// If an ID occurs twice, the first index wins.
    pub fn from_model<M>(model: &M) -> Self
    where
        M: GeometryModel + ?Sized,
    {
        let n = model.num_detectors();
        let mut index_of = FxHashMap::with_capacity_and_hasher(n, Default::default());
        for index in 0..n {
            let id = model.detector_id(index);
            match index_of.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(_) => {
                    log::warn!("duplicate detector id {id} at index {index}; keeping first");
                }
            }
        }
        Self { index_of }
    }

    /// Returns the table index of one detector.
    pub fn id_to_index(&self, id: DetectorId) -> Result<usize> {
        self.index_of
            .get(&id)
            .copied()
            .ok_or(InstviewError::UnknownDetectorId(id))
    }

    /// Resolves a list of detector IDs, failing on the first unknown one.
    pub fn resolve(&self, ids: &[DetectorId]) -> Result<Vec<usize>> {
        ids.iter().map(|&id| self.id_to_index(id)).collect()
    }

    /// Returns the number of known detectors.
    pub fn len(&self) -> usize {
        self.index_of.len()
    }

    /// Returns true if no detector is known.
    pub fn is_empty(&self) -> bool {
        self.index_of.is_empty()
    }
}
