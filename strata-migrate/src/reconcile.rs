//! Reconciliation of on-disk groups against recorded history.

use std::collections::HashMap;
use std::fmt;

use crate::history::GroupSummary;
use crate::scan::ScanResult;

/// Non-fatal condition found while reconciling or planning.
///
/// A warning never changes the outcome of a run, but the affected group is
/// left out of the execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A group recorded in history no longer exists on disk.
    MissingGroup {
        /// Group name.
        name: String,
    },
    /// A group has fewer units on disk than history recorded.
    ShrunkGroup {
        /// Group name.
        name: String,
        /// Units found on disk.
        on_disk: usize,
        /// Units recorded in history.
        recorded: usize,
    },
    /// A candidate group turned out to have nothing left to apply.
    NothingPending {
        /// Group name.
        name: String,
    },
}

impl Warning {
    /// Name of the group the warning concerns.
    pub fn group(&self) -> &str {
        match self {
            Self::MissingGroup { name }
            | Self::ShrunkGroup { name, .. }
            | Self::NothingPending { name } => name,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGroup { name } => write!(
                f,
                "previously executed group '{}' not found in migrations folder",
                name
            ),
            Self::ShrunkGroup {
                name,
                on_disk,
                recorded,
            } => write!(
                f,
                "group '{}' has fewer units than previously recorded ({} on disk, {} recorded)",
                name, on_disk, recorded
            ),
            Self::NothingPending { name } => {
                write!(f, "group '{}' has no pending units", name)
            }
        }
    }
}

/// A group that needs planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Group name.
    pub name: String,
    /// Identifier from history, `None` for a group never persisted.
    pub group_id: Option<i64>,
    /// Every unit on disk, in execution order.
    pub units: Vec<String>,
}

impl Candidate {
    /// Check if the group has never been persisted.
    pub fn is_new(&self) -> bool {
        self.group_id.is_none()
    }
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Groups needing planning, in scan order.
    pub candidates: Vec<Candidate>,
    /// Warnings raised, in history order.
    pub warnings: Vec<Warning>,
}

impl Reconciliation {
    /// Check if every group is up to date.
    pub fn is_up_to_date(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Compare the scan against history summaries.
///
/// A group is a candidate when it is absent from history or has more units on
/// disk than history recorded. Groups with equal counts are up to date.
/// Shrunk or vanished groups produce warnings and are never repaired.
pub fn reconcile(history: &[GroupSummary], scan: &ScanResult) -> Reconciliation {
    let mut warnings = Vec::new();
    for summary in history {
        match scan.units(&summary.name) {
            None => warnings.push(Warning::MissingGroup {
                name: summary.name.clone(),
            }),
            Some(units) if units.len() < summary.unit_count => {
                warnings.push(Warning::ShrunkGroup {
                    name: summary.name.clone(),
                    on_disk: units.len(),
                    recorded: summary.unit_count,
                })
            }
            Some(_) => {}
        }
    }

    let recorded: HashMap<&str, &GroupSummary> = history
        .iter()
        .map(|summary| (summary.name.as_str(), summary))
        .collect();

    let candidates = scan
        .iter()
        .filter_map(|(name, units)| match recorded.get(name) {
            None => Some(Candidate {
                name: name.to_string(),
                group_id: None,
                units: units.to_vec(),
            }),
            Some(summary) if units.len() > summary.unit_count => Some(Candidate {
                name: name.to_string(),
                group_id: Some(summary.group_id),
                units: units.to_vec(),
            }),
            Some(_) => None,
        })
        .collect();

    Reconciliation {
        candidates,
        warnings,
    }
}
