use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    School,
    Medicine,
    Toilet,
    Water,
}

impl Stream {
    pub const ALL: [Stream; 4] = [
        Stream::School,
        Stream::Medicine,
        Stream::Toilet,
        Stream::Water,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Stream::School => "school_attendance.csv",
            Stream::Medicine => "medicine_sales.csv",
            Stream::Toilet => "toilet_usage.csv",
            Stream::Water => "water_quality.csv",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stream::School => "school",
            Stream::Medicine => "medicine",
            Stream::Toilet => "toilet",
            Stream::Water => "water",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stream {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "school" => Ok(Stream::School),
            "medicine" => Ok(Stream::Medicine),
            "toilet" => Ok(Stream::Toilet),
            "water" => Ok(Stream::Water),
            other => Err(format!(
                "unknown stream '{other}' (expected school, medicine, toilet or water)"
            )),
        }
    }
}

/// One daily row of one stream, as stored in its CSV table.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    School {
        date: NaiveDate,
        total_students: i64,
        absent_students: i64,
    },
    Medicine {
        date: NaiveDate,
        cold_cough_sales: i64,
        fever_sales: i64,
    },
    Toilet {
        date: NaiveDate,
        usage_count: i64,
    },
    Water {
        date: NaiveDate,
        ph: f64,
        turbidity: f64,
    },
}

impl StreamRecord {
    pub fn stream(&self) -> Stream {
        match self {
            StreamRecord::School { .. } => Stream::School,
            StreamRecord::Medicine { .. } => Stream::Medicine,
            StreamRecord::Toilet { .. } => Stream::Toilet,
            StreamRecord::Water { .. } => Stream::Water,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            StreamRecord::School { date, .. }
            | StreamRecord::Medicine { date, .. }
            | StreamRecord::Toilet { date, .. }
            | StreamRecord::Water { date, .. } => *date,
        }
    }

    /// The single number plotted for this stream on the trend chart.
    pub fn primary_value(&self) -> f64 {
        match self {
            StreamRecord::School {
                absent_students, ..
            } => *absent_students as f64,
            StreamRecord::Medicine {
                cold_cough_sales,
                fever_sales,
                ..
            } => *cold_cough_sales as f64 + *fever_sales as f64,
            StreamRecord::Toilet { usage_count, .. } => *usage_count as f64,
            StreamRecord::Water { ph, turbidity, .. } => water_deviation(*ph, *turbidity),
        }
    }
}

pub fn water_deviation(ph: f64, turbidity: f64) -> f64 {
    (7.0 - ph).abs() * 10.0 + turbidity
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReading {
    pub date: NaiveDate,
    pub total_students: i64,
    pub absent_students: i64,
    pub cold_sales: i64,
    pub fever_sales: i64,
    pub toilet_usage_count: i64,
    pub ph: f64,
    pub turbidity: f64,
}

impl IndicatorReading {
    /// Rejects readings the engine must not score rather than clamping them.
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("total_students", self.total_students),
            ("absent_students", self.absent_students),
            ("cold_sales", self.cold_sales),
            ("fever_sales", self.fever_sales),
            ("toilet_usage_count", self.toilet_usage_count),
        ];
        for (field, value) in counts {
            if value < 0 {
                return Err(Error::invalid(field, format!("negative count {value}")));
            }
        }

        if self.total_students == 0 {
            return Err(Error::invalid(
                "total_students",
                "zero enrolment, absence rate is undefined",
            ));
        }
        if self.absent_students > self.total_students {
            return Err(Error::invalid(
                "absent_students",
                format!(
                    "{} absent exceeds {} enrolled",
                    self.absent_students, self.total_students
                ),
            ));
        }

        if !self.ph.is_finite() || !(0.0..=14.0).contains(&self.ph) {
            return Err(Error::invalid(
                "ph",
                format!("{} is outside the 0-14 scale", self.ph),
            ));
        }
        if !self.turbidity.is_finite() || self.turbidity < 0.0 {
            return Err(Error::invalid(
                "turbidity",
                format!("{} is not a valid turbidity", self.turbidity),
            ));
        }

        Ok(())
    }

    pub fn absence_rate(&self) -> Result<f64> {
        if self.total_students == 0 {
            return Err(Error::invalid(
                "total_students",
                "zero enrolment, absence rate is undefined",
            ));
        }
        Ok(self.absent_students as f64 / self.total_students as f64 * 100.0)
    }

    /// Summed as `f64` so counts near `i64::MAX` saturate the sub-score
    /// instead of overflowing.
    pub fn medicine_total(&self) -> f64 {
        self.cold_sales as f64 + self.fever_sales as f64
    }

    pub fn water_deviation(&self) -> f64 {
        water_deviation(self.ph, self.turbidity)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Normal,
    Alert,
    Emergency,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Normal => "NORMAL",
            Status::Alert => "ALERT",
            Status::Emergency => "EMERGENCY",
        };
        f.write_str(label)
    }
}

/// Capped per-indicator contributions, each within `0.0..=25.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub school: f64,
    pub medicine: f64,
    pub toilet: f64,
    pub water: f64,
}

impl SubScores {
    pub fn total(&self) -> f64 {
        self.school + self.medicine + self.toilet + self.water
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub date: NaiveDate,
    pub score: u8,
    pub status: Status,
    pub sub_scores: SubScores,
}
