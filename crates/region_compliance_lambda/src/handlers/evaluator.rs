use region_compliance_core::contract::RuleParameters;
use region_compliance_core::error::ComplianceError;
use region_compliance_core::verdict::{assess_regions, ComplianceVerdict, RegionReservations};
use serde_json::{Map, Value};

use crate::adapters::inventory::InventoryService;

/// Checks every available region for instances outside `allowed_regions`.
///
/// Issues one region listing and then one reservation listing per region,
/// in enumeration order. The first listing failure aborts the evaluation.
pub fn evaluate_compliance(
    rule_parameters: &Map<String, Value>,
    inventory: &impl InventoryService,
) -> Result<ComplianceVerdict, ComplianceError> {
    let parameters = RuleParameters::from_parameters(rule_parameters)?;

    let regions = inventory
        .list_regions()
        .map_err(|error| inventory_error("listing regions", error))?;
    tracing::info!(
        component = "evaluator",
        event = "regions_listed",
        region_count = regions.len(),
        allowed_regions = ?parameters.allowed_regions,
    );

    let mut snapshot = Vec::with_capacity(regions.len());
    for region in regions {
        let reservations = inventory
            .list_instance_reservations(&region)
            .map_err(|error| inventory_error(&format!("listing instances in {region}"), error))?;
        tracing::debug!(
            component = "evaluator",
            event = "region_listed",
            region = %region,
            reservation_count = reservations.len(),
        );
        snapshot.push(RegionReservations::new(region, reservations));
    }

    let verdict = assess_regions(&parameters, &snapshot);
    for region in verdict.offending_regions() {
        tracing::warn!(component = "evaluator", event = "region_flagged", region = %region);
    }
    Ok(verdict)
}

fn inventory_error(context: &str, error: String) -> ComplianceError {
    ComplianceError::InventoryService(format!("{context}: {error}"))
}
