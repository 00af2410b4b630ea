// Services module - business logic

pub mod claim_workflow;
pub mod credentials;
pub mod notifier;
pub mod pool_stats;
