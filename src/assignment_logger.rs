use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Tags;

/// Emitted every time an identity is assigned a variant of an experiment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEvent {
    pub flag_name: String,
    pub variant: String,
    pub identity: String,
    pub tags: Tags,
    pub timestamp: String,
    pub meta_data: HashMap<String, String>,
}

/// Receives [`AssignmentEvent`]s, e.g. to forward exposures to your data warehouse.
///
/// Any `Fn(AssignmentEvent)` closure is an `AssignmentLogger`.
pub trait AssignmentLogger {
    fn log_assignment(&self, event: AssignmentEvent);
}

pub(crate) struct NoopAssignmentLogger;
impl AssignmentLogger for NoopAssignmentLogger {
    fn log_assignment(&self, _event: AssignmentEvent) {}
}

impl<T: Fn(AssignmentEvent)> AssignmentLogger for T {
    fn log_assignment(&self, event: AssignmentEvent) {
        self(event);
    }
}
