//! Fixed-size per-query arrays built from a query's documents.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::libsvm::PADDING_LABEL;
use crate::libsvm::line::QueryDocument;

/// Labels and features of one query, padded or truncated to `list_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAggregate {
    pub qid: i64,
    /// `[list_size]`; unused slots hold [`PADDING_LABEL`].
    pub labels: Array1<f32>,
    /// Feature id (`"1"` to `"N"`) to `[list_size, 1]`; unused rows are zero.
    pub features: BTreeMap<String, Array2<f32>>,
    /// Documents kept, at most `list_size`.
    pub num_documents: usize,
}

impl QueryAggregate {
    pub fn list_size(&self) -> usize {
        self.labels.len()
    }

    /// Column `id` as a flat vector.
    pub fn feature(&self, id: &str) -> Option<Vec<f32>> {
        self.features.get(id).map(|values| values.iter().copied().collect())
    }
}

/// Shuffle `documents`, keep at most `list_size` of them and write them row
/// by row. Feature ids outside `1..=num_features` are ignored.
pub fn finalize<R: Rng + ?Sized>(
    qid: i64,
    mut documents: Vec<QueryDocument>,
    num_features: usize,
    list_size: usize,
    rng: &mut R,
) -> QueryAggregate {
    let mut features: BTreeMap<String, Array2<f32>> = (1..=num_features)
        .map(|id| (id.to_string(), Array2::zeros((list_size, 1))))
        .collect();
    let mut labels = Array1::from_elem(list_size, PADDING_LABEL);

    documents.shuffle(rng);
    documents.truncate(list_size);

    for (row, document) in documents.iter().enumerate() {
        labels[row] = document.label;
        for (id, value) in &document.features {
            if let Some(column) = features.get_mut(id) {
                column[[row, 0]] = *value;
            }
        }
    }

    QueryAggregate {
        qid,
        labels,
        features,
        num_documents: documents.len(),
    }
}
