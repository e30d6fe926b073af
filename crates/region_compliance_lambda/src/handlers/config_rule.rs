use std::time::Instant;

use region_compliance_core::contract::{parse_config_rule_event, EvaluationRecord};
use region_compliance_core::error::ComplianceError;
use serde_json::Value;

use crate::adapters::evaluation_sink::EvaluationSink;
use crate::adapters::inventory::InventoryService;
use crate::handlers::evaluator::evaluate_compliance;

/// Handles one AWS Config rule invocation end to end.
///
/// Nothing is submitted unless the whole evaluation succeeds. The submitted
/// record is returned so the runtime can echo it.
pub fn handle_config_rule_event(
    event: Value,
    inventory: &impl InventoryService,
    sink: &impl EvaluationSink,
) -> Result<EvaluationRecord, ComplianceError> {
    let started_at = Instant::now();
    let result = evaluate_and_submit(event, inventory, sink);

    match &result {
        Ok(record) => tracing::info!(
            component = "config_rule_handler",
            event = "evaluation_submitted",
            account_id = %record.compliance_resource_id,
            compliance_type = %record.compliance_type,
            annotation = %record.annotation,
            duration_ms = started_at.elapsed().as_millis() as u64,
        ),
        Err(error) => tracing::error!(
            component = "config_rule_handler",
            event = "evaluation_failed",
            error_code = error.error_code(),
            error = %error,
            duration_ms = started_at.elapsed().as_millis() as u64,
        ),
    }

    result
}

fn evaluate_and_submit(
    event: Value,
    inventory: &impl InventoryService,
    sink: &impl EvaluationSink,
) -> Result<EvaluationRecord, ComplianceError> {
    let invocation = parse_config_rule_event(event)?;
    tracing::info!(
        component = "config_rule_handler",
        event = "evaluation_started",
        account_id = %invocation.account_id,
        ordering_timestamp = %invocation.ordering_timestamp.to_rfc3339(),
    );

    let verdict = evaluate_compliance(&invocation.rule_parameters, inventory)?;
    tracing::info!(
        component = "config_rule_handler",
        event = "evaluation_completed",
        compliance_type = %verdict.compliance_type(),
        offending_region_count = verdict.offending_regions().len(),
    );

    let record = EvaluationRecord::for_account(&invocation, &verdict);
    sink.submit_evaluation(&record).map_err(ComplianceError::SinkSubmission)?;
    Ok(record)
}
