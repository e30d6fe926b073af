use aws_sdk_config::primitives::DateTime;
use aws_sdk_config::types::{ComplianceType, Evaluation};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use region_compliance_core::contract::EvaluationRecord;
use region_compliance_core::verdict::InstanceReservation;
use region_compliance_lambda::adapters::evaluation_sink::{
    check_put_evaluations, DryRunSink, EvaluationSink,
};
use region_compliance_lambda::adapters::inventory::InventoryService;
use region_compliance_lambda::handlers::config_rule::handle_config_rule_event;
use region_compliance_lambda::settings::{RuntimeSettings, DEFAULT_LOG_FILTER};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

struct Ec2Inventory {
    sdk_config: aws_config::SdkConfig,
    ec2_client: aws_sdk_ec2::Client,
}

impl Ec2Inventory {
    fn regional_client(&self, region: &str) -> aws_sdk_ec2::Client {
        let config = aws_sdk_ec2::config::Builder::from(&self.sdk_config)
            .region(aws_sdk_ec2::config::Region::new(region.to_string()))
            .build();
        aws_sdk_ec2::Client::from_conf(config)
    }
}

impl InventoryService for Ec2Inventory {
    fn list_regions(&self) -> Result<Vec<String>, String> {
        let client = self.ec2_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .describe_regions()
                    .send()
                    .await
                    .map(|output| {
                        output
                            .regions()
                            .iter()
                            .filter_map(|region| region.region_name())
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    })
                    .map_err(|error| format!("failed to describe regions: {error}"))
            })
        })
    }

    fn list_instance_reservations(&self, region: &str) -> Result<Vec<InstanceReservation>, String> {
        let client = self.regional_client(region);

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .describe_instances()
                    .send()
                    .await
                    .map(|output| {
                        output
                            .reservations()
                            .iter()
                            .map(|reservation| {
                                InstanceReservation::new(
                                    reservation.reservation_id().unwrap_or_default(),
                                    reservation.instances().len(),
                                )
                            })
                            .collect::<Vec<_>>()
                    })
                    .map_err(|error| format!("failed to describe instances: {error}"))
            })
        })
    }
}

struct ConfigEvaluationSink {
    config_client: aws_sdk_config::Client,
}

impl EvaluationSink for ConfigEvaluationSink {
    fn submit_evaluation(&self, record: &EvaluationRecord) -> Result<(), String> {
        let evaluation = Evaluation::builder()
            .compliance_resource_type(record.compliance_resource_type.clone())
            .compliance_resource_id(record.compliance_resource_id.clone())
            .compliance_type(ComplianceType::from(record.compliance_type.as_str()))
            .annotation(record.annotation.clone())
            .ordering_timestamp(DateTime::from_millis(
                record.ordering_timestamp.timestamp_millis(),
            ))
            .build()
            .map_err(|error| format!("invalid evaluation: {error}"))?;
        let result_token = record.result_token.clone();
        let client = self.config_client.clone();

        let output = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_evaluations()
                    .evaluations(evaluation)
                    .result_token(result_token)
                    .send()
                    .await
                    .map_err(|error| format!("failed to put evaluations: {error}"))
            })
        })?;

        check_put_evaluations(output.failed_evaluations().len())
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<EvaluationRecord, Error> {
    let settings = RuntimeSettings::from_env();
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let inventory = Ec2Inventory {
        ec2_client: aws_sdk_ec2::Client::new(&aws_config),
        sdk_config: aws_config.clone(),
    };

    let result = if settings.dry_run {
        handle_config_rule_event(event.payload, &inventory, &DryRunSink)
    } else {
        let sink = ConfigEvaluationSink {
            config_client: aws_sdk_config::Client::new(&aws_config),
        };
        handle_config_rule_event(event.payload, &inventory, &sink)
    };

    result.map_err(Error::from)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
