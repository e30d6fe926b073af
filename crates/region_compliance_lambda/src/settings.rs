pub const DRY_RUN_ENV: &str = "REGION_COMPLIANCE_DRY_RUN";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Per-invocation runtime settings read from the Lambda environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Log the evaluation instead of submitting it to AWS Config.
    pub dry_run: bool,
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            dry_run: lookup(DRY_RUN_ENV)
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_defaults_to_off() {
        let settings = RuntimeSettings::from_lookup(|_| None);
        assert!(!settings.dry_run);
    }

    #[test]
    fn dry_run_accepts_common_truthy_values() {
        for value in ["1", "true", "TRUE", " yes "] {
            let lookup = |key: &str| (key == DRY_RUN_ENV).then(|| value.to_string());
            let settings = RuntimeSettings::from_lookup(lookup);
            assert!(settings.dry_run, "{value} should enable dry run");
        }

        let settings = RuntimeSettings::from_lookup(|_| Some("off".to_string()));
        assert!(!settings.dry_run);
    }
}
