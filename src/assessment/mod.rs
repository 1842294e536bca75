pub mod cache;
pub mod config;
pub mod engine;
pub mod metric;
pub mod tiers;
pub mod validation;

pub use cache::AssessmentCache;
pub use config::*;
pub use engine::{
    assess, AssessmentBreakdown, ClassificationAssessment, ClusterValidationInput, SignalReading,
    ValidationStatus,
};
pub use metric::{Metric, RangePolicy, ValidationError};
pub use tiers::{Signal, Tier};
pub use validation::validate_thresholds;
