pub mod config_rule;
pub mod evaluator;
