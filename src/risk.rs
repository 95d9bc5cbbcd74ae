use crate::error::Result;
use crate::models::{IndicatorReading, RiskAssessment, Status, SubScores};

pub const SUB_SCORE_CAP: f64 = 25.0;
pub const MAX_SCORE: u8 = 100;

/// Highest score still classified NORMAL.
pub const NORMAL_CEILING: u8 = 30;
/// Highest score still classified ALERT.
pub const ALERT_CEILING: u8 = 60;
/// Scores at or above this get a written report.
pub const REPORT_THRESHOLD: u8 = 40;

const ABSENCE_RATE_SCALE: f64 = 30.0;
const MEDICINE_SCALE: f64 = 50.0;
const TOILET_SCALE: f64 = 200.0;
const WATER_SCALE: f64 = 20.0;

fn capped(raw: f64, scale: f64) -> f64 {
    (raw / scale * SUB_SCORE_CAP).clamp(0.0, SUB_SCORE_CAP)
}

pub fn sub_scores(reading: &IndicatorReading) -> Result<SubScores> {
    reading.validate()?;
    Ok(SubScores {
        school: capped(reading.absence_rate()?, ABSENCE_RATE_SCALE),
        medicine: capped(reading.medicine_total(), MEDICINE_SCALE),
        toilet: capped(reading.toilet_usage_count as f64, TOILET_SCALE),
        water: capped(reading.water_deviation(), WATER_SCALE),
    })
}

fn total_score(parts: &SubScores) -> u8 {
    let truncated = parts.total().trunc() as u32;
    truncated.min(MAX_SCORE as u32) as u8
}

pub fn score(reading: &IndicatorReading) -> Result<u8> {
    Ok(total_score(&sub_scores(reading)?))
}

pub fn classify(score: u8) -> Status {
    match score {
        0..=NORMAL_CEILING => Status::Normal,
        s if s <= ALERT_CEILING => Status::Alert,
        _ => Status::Emergency,
    }
}

pub fn assess(reading: &IndicatorReading) -> Result<RiskAssessment> {
    let parts = sub_scores(reading)?;
    let score = total_score(&parts);
    Ok(RiskAssessment {
        date: reading.date,
        score,
        status: classify(score),
        sub_scores: parts,
    })
}

/// Status pair across two consecutive evaluation cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub previous: Option<Status>,
    pub current: Status,
}

impl StatusTransition {
    pub fn is_change(&self) -> bool {
        self.previous != Some(self.current)
    }

    pub fn should_alert(&self) -> bool {
        should_alert(self.previous, self.current)
    }
}

/// True only when entering EMERGENCY, so a sustained emergency alerts once.
pub fn should_alert(previous: Option<Status>, current: Status) -> bool {
    current == Status::Emergency && previous != Some(Status::Emergency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::NaiveDate;

    fn reading() -> IndicatorReading {
        IndicatorReading {
            date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            total_students: 200,
            absent_students: 20,
            cold_sales: 10,
            fever_sales: 5,
            toilet_usage_count: 100,
            ph: 7.0,
            turbidity: 2.0,
        }
    }

    #[test]
    fn worked_example_is_normal_at_thirty() {
        let parts = sub_scores(&reading()).unwrap();
        assert!((parts.school - 25.0 / 3.0).abs() < 1e-9);
        assert!((parts.medicine - 7.5).abs() < 1e-9);
        assert!((parts.toilet - 12.5).abs() < 1e-9);
        assert!((parts.water - 2.5).abs() < 1e-9);

        assert_eq!(score(&reading()).unwrap(), 30);
        assert_eq!(assess(&reading()).unwrap().status, Status::Normal);
    }

    #[test]
    fn high_absence_forces_emergency() {
        let outbreak = IndicatorReading {
            absent_students: 150,
            cold_sales: 30,
            fever_sales: 10,
            toilet_usage_count: 150,
            ph: 7.2,
            turbidity: 3.0,
            ..reading()
        };
        let assessment = assess(&outbreak).unwrap();
        assert_eq!(assessment.sub_scores.school, 25.0);
        assert!(assessment.score > 60);
        assert_eq!(assessment.status, Status::Emergency);
    }

    #[test]
    fn each_component_is_capped() {
        let runaway = IndicatorReading {
            absent_students: 200,
            cold_sales: 5_000,
            fever_sales: 5_000,
            toilet_usage_count: 90_000,
            ph: 0.0,
            turbidity: 400.0,
            ..reading()
        };
        let parts = sub_scores(&runaway).unwrap();
        for value in [parts.school, parts.medicine, parts.toilet, parts.water] {
            assert_eq!(value, SUB_SCORE_CAP);
        }
        assert_eq!(score(&runaway).unwrap(), MAX_SCORE);

        let single = IndicatorReading {
            toilet_usage_count: 1_000_000,
            ..reading()
        };
        let base = sub_scores(&reading()).unwrap();
        let spiked = sub_scores(&single).unwrap();
        assert!(spiked.total() - base.total() <= SUB_SCORE_CAP);
    }

    #[test]
    fn overflowing_medicine_sales_cap_instead_of_vanishing() {
        let flood = IndicatorReading {
            cold_sales: i64::MAX,
            fever_sales: 1,
            ..reading()
        };
        let parts = sub_scores(&flood).unwrap();
        assert_eq!(parts.medicine, SUB_SCORE_CAP);
        assert_eq!(score(&flood).unwrap(), 48);
    }

    #[test]
    fn score_stays_in_bounds_across_grid() {
        for absent in [0, 50, 100, 200] {
            for sales in [0, 25, 500] {
                for usage in [0, 150, 4_000] {
                    for ph in [0.0, 6.8, 7.0, 9.5, 14.0] {
                        let sample = IndicatorReading {
                            absent_students: absent,
                            cold_sales: sales,
                            fever_sales: sales,
                            toilet_usage_count: usage,
                            ph,
                            turbidity: 5.0,
                            ..reading()
                        };
                        let value = score(&sample).unwrap();
                        assert!(value <= MAX_SCORE);
                    }
                }
            }
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let sample = IndicatorReading {
            absent_students: 37,
            ph: 6.4,
            ..reading()
        };
        assert_eq!(assess(&sample).unwrap(), assess(&sample).unwrap());
    }

    #[test]
    fn zero_enrolment_fails_instead_of_nan() {
        let broken = IndicatorReading {
            total_students: 0,
            absent_students: 0,
            ..reading()
        };
        assert!(matches!(score(&broken), Err(Error::InvalidIndicator { .. })));
    }

    #[test]
    fn impossible_ph_is_not_clamped() {
        let broken = IndicatorReading {
            ph: -0.5,
            ..reading()
        };
        assert!(matches!(
            score(&broken),
            Err(Error::InvalidIndicator { field: "ph", .. })
        ));
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(classify(0), Status::Normal);
        assert_eq!(classify(30), Status::Normal);
        assert_eq!(classify(31), Status::Alert);
        assert_eq!(classify(60), Status::Alert);
        assert_eq!(classify(61), Status::Emergency);
        assert_eq!(classify(100), Status::Emergency);
    }

    #[test]
    fn classify_is_monotonic() {
        let mut previous = classify(0);
        for value in 1..=MAX_SCORE {
            let current = classify(value);
            assert!(current >= previous, "status dropped at {value}");
            previous = current;
        }
    }

    #[test]
    fn alerts_only_on_entry_into_emergency() {
        assert!(should_alert(None, Status::Emergency));
        assert!(should_alert(Some(Status::Normal), Status::Emergency));
        assert!(should_alert(Some(Status::Alert), Status::Emergency));
        assert!(!should_alert(Some(Status::Emergency), Status::Emergency));
        assert!(!should_alert(Some(Status::Emergency), Status::Alert));
        assert!(!should_alert(None, Status::Alert));
    }

    #[test]
    fn transition_reports_change() {
        let steady = StatusTransition {
            previous: Some(Status::Alert),
            current: Status::Alert,
        };
        assert!(!steady.is_change());
        assert!(!steady.should_alert());

        let escalated = StatusTransition {
            previous: Some(Status::Alert),
            current: Status::Emergency,
        };
        assert!(escalated.is_change());
        assert!(escalated.should_alert());
    }
}
