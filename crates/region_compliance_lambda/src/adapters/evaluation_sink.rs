use region_compliance_core::contract::EvaluationRecord;

pub trait EvaluationSink {
    fn submit_evaluation(&self, record: &EvaluationRecord) -> Result<(), String>;
}

/// Maps the failed-evaluation count of a `PutEvaluations` response to a
/// submission result. Any rejected evaluation fails the submission.
pub fn check_put_evaluations(failed: usize) -> Result<(), String> {
    if failed > 0 {
        return Err(format!("AWS Config rejected {failed} evaluation(s)"));
    }
    Ok(())
}

/// Logs evaluations instead of submitting them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunSink;

impl EvaluationSink for DryRunSink {
    fn submit_evaluation(&self, record: &EvaluationRecord) -> Result<(), String> {
        tracing::info!(
            component = "evaluation_sink",
            event = "evaluation_skipped",
            dry_run = true,
            account_id = %record.compliance_resource_id,
            compliance_type = %record.compliance_type,
            annotation = %record.annotation,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use region_compliance_core::contract::parse_config_rule_event;
    use region_compliance_core::verdict::ComplianceVerdict;
    use serde_json::json;

    use super::*;

    #[test]
    fn put_evaluations_without_failures_is_accepted() {
        assert_eq!(check_put_evaluations(0), Ok(()));
    }

    #[test]
    fn rejected_evaluations_fail_the_submission() {
        let error = check_put_evaluations(2).expect_err("rejections should fail");
        assert_eq!(error, "AWS Config rejected 2 evaluation(s)");
    }

    #[test]
    fn dry_run_sink_accepts_every_record() {
        let invocation = parse_config_rule_event(json!({
            "invokingEvent": "{\"notificationCreationTime\":\"2024-03-01T12:00:00Z\"}",
            "ruleParameters": "{\"allowed_regions\":\"eu-west-1\"}",
            "accountId": "123456789012",
        }))
        .expect("valid event");
        let verdict = ComplianceVerdict::NonCompliant {
            regions: vec!["us-east-1".to_string()],
            reservation_ids: vec!["r-0abc".to_string()],
        };
        let record = EvaluationRecord::for_account(&invocation, &verdict);

        assert_eq!(DryRunSink.submit_evaluation(&record), Ok(()));
    }
}
