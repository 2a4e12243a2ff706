//! Rule-based assessment of a location's latest measurements.

use std::collections::BTreeSet;

use serde::Serialize;

use super::standards::{
    bands_for, canonical_parameter, classify, Level, COMFORT_PARAMETERS, PARTICULATE_PARAMETERS,
};

const MAX_RECOMMENDATIONS: usize = 5;

/// One reading to assess.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub parameter: String,
    pub value: f64,
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelAssessment {
    pub level: Level,
    pub message: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterAssessment {
    pub parameter: String,
    pub value: f64,
    pub units: Option<String>,
    pub assessment: LevelAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub overall_quality: Level,
    pub message: String,
    pub color: String,
    pub primary_concern: Option<String>,
    pub recommendations: Vec<String>,
    pub data_confidence: &'static str,
    pub available_parameters: Vec<String>,
    pub detailed_assessments: Vec<ParameterAssessment>,
}

/// Level of a single parameter reading.
pub fn assess_parameter(parameter: &str, value: f64) -> LevelAssessment {
    let canonical = canonical_parameter(parameter);
    let Some(bands) = bands_for(&canonical) else {
        return unknown_level("No assessment available for this parameter");
    };
    match classify(bands, value) {
        Some(level) => LevelAssessment {
            level,
            message: level.health_message().to_string(),
            color: level.color().to_string(),
        },
        None => unknown_level("Value outside assessment range"),
    }
}

fn unknown_level(message: &str) -> LevelAssessment {
    LevelAssessment {
        level: Level::Unknown,
        message: message.to_string(),
        color: Level::Unknown.color().to_string(),
    }
}

/// Assess a set of readings as a whole.
pub fn assess(readings: &[Reading]) -> Assessment {
    if readings.is_empty() {
        return Assessment {
            overall_quality: Level::Unknown,
            message: "Cannot assess air quality: No measurements available".to_string(),
            color: Level::Unknown.color().to_string(),
            primary_concern: None,
            recommendations: vec!["Check back later when more sensor data is available".to_string()],
            data_confidence: "none",
            available_parameters: Vec::new(),
            detailed_assessments: Vec::new(),
        };
    }

    let detailed: Vec<ParameterAssessment> = readings
        .iter()
        .map(|r| ParameterAssessment {
            parameter: r.parameter.clone(),
            value: r.value,
            units: r.units.clone(),
            assessment: assess_parameter(&r.parameter, r.value),
        })
        .collect();
    let available: BTreeSet<String> = readings
        .iter()
        .map(|r| canonical_parameter(&r.parameter))
        .collect();

    let (level, message, primary_concern) = overall(&detailed, &available);

    Assessment {
        overall_quality: level,
        message,
        color: level.color().to_string(),
        primary_concern,
        recommendations: recommendations(level, &detailed, &available),
        data_confidence: confidence(&available),
        available_parameters: available.into_iter().collect(),
        detailed_assessments: detailed,
    }
}

fn overall(
    detailed: &[ParameterAssessment],
    available: &BTreeSet<String>,
) -> (Level, String, Option<String>) {
    let mut worst = Level::Good;
    let mut primary_concern = None;
    for assessment in detailed {
        let level = assessment.assessment.level;
        if let (Some(rank), Some(worst_rank)) = (level.severity_rank(), worst.severity_rank()) {
            if rank < worst_rank {
                worst = level;
                primary_concern = Some(assessment.parameter.clone());
            }
        }
    }

    let has_particulate = PARTICULATE_PARAMETERS.iter().any(|p| available.contains(*p));
    let has_comfort = COMFORT_PARAMETERS.iter().any(|p| available.contains(*p));

    if !has_particulate && has_comfort {
        let poor_comfort = detailed.iter().any(|a| {
            COMFORT_PARAMETERS.contains(&canonical_parameter(&a.parameter).as_str())
                && matches!(a.assessment.level, Level::Uncomfortable | Level::Dangerous)
        });
        return if poor_comfort {
            (
                Level::Moderate,
                "Comfort conditions are poor, but air quality data is limited".to_string(),
                primary_concern,
            )
        } else {
            (
                Level::Good,
                "Comfort conditions are good, but air quality data is limited".to_string(),
                primary_concern,
            )
        };
    }

    (worst, worst.health_message().to_string(), primary_concern)
}

fn confidence(available: &BTreeSet<String>) -> &'static str {
    let critical = ["pm25", "pm10"]
        .iter()
        .filter(|p| available.contains(**p))
        .count();
    let secondary = ["pm1", "um003", "temperature", "relativehumidity"]
        .iter()
        .filter(|p| available.contains(**p))
        .count();

    if critical >= 2 {
        "high"
    } else if critical == 1 {
        "medium"
    } else if secondary >= 2 {
        "low"
    } else {
        "very_low"
    }
}

fn base_recommendations(level: Level) -> &'static [&'static str] {
    match level {
        Level::Good => &[
            "Ideal conditions for outdoor activities",
            "Good time for opening windows for ventilation",
            "No special precautions needed",
        ],
        Level::Moderate => &[
            "Sensitive individuals should consider reducing prolonged outdoor exertion",
            "Generally acceptable for most activities",
            "Monitor conditions if you have respiratory issues",
        ],
        Level::UnhealthySensitive => &[
            "Sensitive groups should reduce outdoor activities",
            "People with heart or lung disease, older adults, and children should limit exertion",
            "Consider wearing a mask if outdoors for extended periods",
        ],
        Level::Unhealthy => &[
            "Everyone should reduce outdoor activities",
            "Avoid prolonged exertion",
            "Sensitive groups should avoid outdoor activities",
            "Keep windows closed and use air purifiers",
        ],
        Level::VeryUnhealthy => &[
            "Avoid all outdoor activities",
            "Stay indoors with windows closed",
            "Use air purifiers if available",
            "Sensitive groups should take extra precautions",
        ],
        Level::Hazardous => &[
            "Emergency conditions - avoid all outdoor exposure",
            "Stay indoors with windows closed and air purification",
            "Consider relocating if conditions persist",
            "Follow local health authority guidance",
        ],
        _ => &[],
    }
}

fn recommendations(
    level: Level,
    detailed: &[ParameterAssessment],
    available: &BTreeSet<String>,
) -> Vec<String> {
    let mut out: Vec<String> = base_recommendations(level)
        .iter()
        .map(|s| s.to_string())
        .collect();

    for assessment in detailed.iter().filter(|a| a.assessment.level.is_severe()) {
        let parameter = canonical_parameter(&assessment.parameter);
        if parameter.starts_with("pm") {
            out.push(format!(
                "High {} levels - consider using N95 masks outdoors",
                parameter
            ));
        } else if parameter == "temperature" && assessment.value > 35.0 {
            out.push("Extreme heat - stay hydrated and avoid direct sun exposure".to_string());
        } else if parameter == "relativehumidity" && assessment.value > 80.0 {
            out.push(
                "High humidity - may feel uncomfortable, use dehumidifiers if available"
                    .to_string(),
            );
        }
    }

    if !available.contains("pm25") && !available.contains("pm10") {
        out.push(
            "Note: Limited air quality data available - assessment may be incomplete".to_string(),
        );
    }

    out.truncate(MAX_RECOMMENDATIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(parameter: &str, value: f64) -> Reading {
        Reading {
            parameter: parameter.to_string(),
            value,
            units: None,
        }
    }

    #[test]
    fn test_no_readings() {
        let a = assess(&[]);
        assert_eq!(a.overall_quality, Level::Unknown);
        assert_eq!(a.data_confidence, "none");
        assert_eq!(
            a.recommendations,
            vec!["Check back later when more sensor data is available"]
        );
    }

    #[test]
    fn test_unknown_parameter_and_out_of_range() {
        let a = assess_parameter("no2", 10.0);
        assert_eq!(a.level, Level::Unknown);
        assert_eq!(a.message, "No assessment available for this parameter");

        let a = assess_parameter("pm25", 900.0);
        assert_eq!(a.level, Level::Unknown);
        assert_eq!(a.message, "Value outside assessment range");
        assert_eq!(a.color, "#666666");
    }

    #[test]
    fn test_worst_level_wins() {
        let a = assess(&[reading("pm25", 40.0), reading("pm10", 20.0), reading("temperature", 28.0)]);
        assert_eq!(a.overall_quality, Level::UnhealthySensitive);
        assert_eq!(a.primary_concern.as_deref(), Some("pm25"));
        assert_eq!(a.color, "#FF7E00");
        assert_eq!(a.data_confidence, "high");
        assert_eq!(a.recommendations.len(), 3);
    }

    #[test]
    fn test_severe_particulate_adds_mask_note() {
        let a = assess(&[reading("pm25", 200.0)]);
        assert_eq!(a.overall_quality, Level::VeryUnhealthy);
        assert_eq!(a.data_confidence, "medium");
        assert_eq!(a.recommendations.len(), 5);
        assert_eq!(
            a.recommendations[4],
            "High pm25 levels - consider using N95 masks outdoors"
        );
    }

    #[test]
    fn test_comfort_only_data() {
        let a = assess(&[reading("temperature", 32.0), reading("RH", 50.0)]);
        assert_eq!(a.overall_quality, Level::Moderate);
        assert_eq!(
            a.message,
            "Comfort conditions are poor, but air quality data is limited"
        );
        assert_eq!(a.data_confidence, "low");
        assert_eq!(
            a.available_parameters,
            vec!["relativehumidity".to_string(), "temperature".to_string()]
        );
        assert_eq!(
            a.recommendations.last().map(String::as_str),
            Some("Note: Limited air quality data available - assessment may be incomplete")
        );

        let a = assess(&[reading("temperature", 22.0)]);
        assert_eq!(a.overall_quality, Level::Good);
        assert_eq!(a.data_confidence, "very_low");
    }

    #[test]
    fn test_extreme_heat_note() {
        let a = assess(&[reading("pm25", 5.0), reading("temperature", 40.0)]);
        assert_eq!(a.overall_quality, Level::Dangerous);
        assert!(a
            .recommendations
            .iter()
            .any(|r| r.starts_with("Extreme heat")));
    }
}
