use serde::{Deserialize, Serialize};

use crate::contract::RuleParameters;

/// AWS Config rejects annotations longer than this many characters.
pub const MAX_ANNOTATION_CHARS: usize = 256;
pub const COMPLIANT_ANNOTATION: &str = "All instances are in allowed regions";
const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceReservation {
    pub reservation_id: String,
    pub instance_count: usize,
}

impl InstanceReservation {
    pub fn new(reservation_id: impl Into<String>, instance_count: usize) -> Self {
        Self {
            reservation_id: reservation_id.into(),
            instance_count,
        }
    }

    pub fn has_instances(&self) -> bool {
        self.instance_count > 0
    }
}

/// Reservations reported for one region, in the order the inventory returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionReservations {
    pub region: String,
    pub reservations: Vec<InstanceReservation>,
}

impl RegionReservations {
    pub fn new(region: impl Into<String>, reservations: Vec<InstanceReservation>) -> Self {
        Self {
            region: region.into(),
            reservations,
        }
    }

    /// Reservations holding at least one instance.
    pub fn occupied_reservations(&self) -> impl Iterator<Item = &InstanceReservation> {
        self.reservations.iter().filter(|r| r.has_instances())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceType {
    Compliant,
    NonCompliant,
}

impl ComplianceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compliant => "COMPLIANT",
            Self::NonCompliant => "NON_COMPLIANT",
        }
    }
}

impl std::fmt::Display for ComplianceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplianceVerdict {
    Compliant,
    NonCompliant {
        regions: Vec<String>,
        reservation_ids: Vec<String>,
    },
}

impl ComplianceVerdict {
    pub fn compliance_type(&self) -> ComplianceType {
        match self {
            Self::Compliant => ComplianceType::Compliant,
            Self::NonCompliant { .. } => ComplianceType::NonCompliant,
        }
    }

    pub fn offending_regions(&self) -> &[String] {
        match self {
            Self::Compliant => &[],
            Self::NonCompliant { regions, .. } => regions,
        }
    }

    pub fn reservation_ids(&self) -> &[String] {
        match self {
            Self::Compliant => &[],
            Self::NonCompliant {
                reservation_ids, ..
            } => reservation_ids,
        }
    }

    /// Free-text annotation submitted alongside the compliance type, capped at
    /// [`MAX_ANNOTATION_CHARS`].
    pub fn annotation(&self) -> String {
        match self {
            Self::Compliant => COMPLIANT_ANNOTATION.to_string(),
            Self::NonCompliant {
                regions,
                reservation_ids,
            } => truncate_annotation(format!(
                "Instances found in [{}]. Reservations: [{}]",
                regions.join(", "),
                reservation_ids.join(", ")
            )),
        }
    }
}

/// Decides compliance for an inventory snapshot.
///
/// A region offends when it is not allowlisted and holds at least one
/// reservation with instances. Offending regions keep inventory order and
/// reservation ids are flattened region by region.
pub fn assess_regions(
    parameters: &RuleParameters,
    inventory: &[RegionReservations],
) -> ComplianceVerdict {
    let mut regions = Vec::new();
    let mut reservation_ids = Vec::new();

    for entry in inventory {
        if parameters.allows(&entry.region) {
            continue;
        }
        let occupied: Vec<String> = entry
            .occupied_reservations()
            .map(|r| r.reservation_id.clone())
            .collect();
        if occupied.is_empty() {
            continue;
        }
        regions.push(entry.region.clone());
        reservation_ids.extend(occupied);
    }

    if regions.is_empty() {
        ComplianceVerdict::Compliant
    } else {
        ComplianceVerdict::NonCompliant {
            regions,
            reservation_ids,
        }
    }
}

fn truncate_annotation(annotation: String) -> String {
    if annotation.chars().count() <= MAX_ANNOTATION_CHARS {
        return annotation;
    }
    let keep = MAX_ANNOTATION_CHARS - TRUNCATION_MARKER.len();
    let mut truncated: String = annotation.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
