// src/models/operation.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The four fixed service types. Declaration order is the certificate row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Rodenticide
    Deratizare,
    /// Insecticide
    Dezinsectie,
    /// Second insecticide treatment
    Dezinsectie2,
    /// Disinfection
    Dezinfectie,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Deratizare,
        OperationKind::Dezinsectie,
        OperationKind::Dezinsectie2,
        OperationKind::Dezinfectie,
    ];

    /// Fixed row of this operation on the certificate template.
    pub fn row_index(&self) -> usize {
        match self {
            OperationKind::Deratizare => 0,
            OperationKind::Dezinsectie => 1,
            OperationKind::Dezinsectie2 => 2,
            OperationKind::Dezinfectie => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deratizare => "deratizare",
            OperationKind::Dezinsectie => "dezinsectie",
            OperationKind::Dezinsectie2 => "dezinsectie2",
            OperationKind::Dezinfectie => "dezinfectie",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Deratizare => "Deratizare",
            OperationKind::Dezinsectie => "Dezinsectie",
            OperationKind::Dezinsectie2 => "Dezinsectie 2",
            OperationKind::Dezinfectie => "Dezinfectie",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    // Accepts both the stored value and the printed label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        OperationKind::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| format!("unknown operation '{}'", s))
    }
}
