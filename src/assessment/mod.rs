//! Health assessment of air-quality readings.

mod assessor;
mod standards;

pub use assessor::{
    assess, assess_parameter, Assessment, LevelAssessment, ParameterAssessment, Reading,
};
pub use standards::{canonical_parameter, Level};
