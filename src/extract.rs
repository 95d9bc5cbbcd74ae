use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{IndicatorReading, Stream, StreamRecord};

pub const DEFAULT_TREND_WINDOW: usize = 7;

/// Read-only access to the four daily indicator streams.
pub trait DataSource {
    /// The most recent record of `stream`, by date rather than by position
    /// in the table. Rows sharing the newest date resolve to the last one.
    fn latest(&self, stream: Stream) -> Result<StreamRecord>;

    /// Up to `window` trailing records of `stream`, oldest first.
    fn trend(&self, stream: Stream, window: usize) -> Result<Vec<StreamRecord>>;
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SchoolRow {
    pub date: NaiveDate,
    pub total_students: i64,
    pub absent_students: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MedicineRow {
    pub date: NaiveDate,
    pub cold_cough_sales: i64,
    pub fever_sales: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ToiletRow {
    pub date: NaiveDate,
    pub usage_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WaterRow {
    pub date: NaiveDate,
    pub ph: f64,
    pub turbidity: f64,
}

/// Date-keyed tables, one per stream, held in memory.
#[derive(Debug, Default, Clone)]
pub struct TableSource {
    tables: HashMap<Stream, Vec<StreamRecord>>,
}

impl TableSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every stream whose CSV file exists under `dir`. Absent files
    /// leave the stream missing so extraction reports which one it was.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut source = Self::new();
        for stream in Stream::ALL {
            let path = dir.join(stream.file_name());
            if !path.exists() {
                debug!(stream = %stream, path = %path.display(), "stream file not found");
                continue;
            }
            let file = std::fs::File::open(&path)?;
            let records = read_csv(stream, file)?;
            debug!(stream = %stream, records = records.len(), "loaded stream");
            source.tables.insert(stream, records);
        }
        Ok(source)
    }

    pub fn with_table(mut self, stream: Stream, records: Vec<StreamRecord>) -> Self {
        self.tables.insert(stream, records);
        self
    }

    pub fn with_csv<R: Read>(self, stream: Stream, reader: R) -> Result<Self> {
        let records = read_csv(stream, reader)?;
        Ok(self.with_table(stream, records))
    }

    fn table(&self, stream: Stream) -> Result<&[StreamRecord]> {
        let records = self
            .tables
            .get(&stream)
            .ok_or(Error::MissingStream(stream))?;
        if records.is_empty() {
            return Err(Error::EmptyStream(stream));
        }
        Ok(records)
    }
}

impl DataSource for TableSource {
    fn latest(&self, stream: Stream) -> Result<StreamRecord> {
        let records = self.table(stream)?;
        // max_by_key keeps the last of equal dates, so later rows win ties.
        records
            .iter()
            .max_by_key(|record| record.date())
            .cloned()
            .ok_or(Error::EmptyStream(stream))
    }

    fn trend(&self, stream: Stream, window: usize) -> Result<Vec<StreamRecord>> {
        let mut records = self.table(stream)?.to_vec();
        records.sort_by_key(|record| record.date());
        let start = records.len().saturating_sub(window);
        Ok(records.split_off(start))
    }
}

pub fn read_csv<R: Read>(stream: Stream, reader: R) -> Result<Vec<StreamRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    match stream {
        Stream::School => {
            for row in reader.deserialize::<SchoolRow>() {
                let row = row?;
                records.push(StreamRecord::School {
                    date: row.date,
                    total_students: row.total_students,
                    absent_students: row.absent_students,
                });
            }
        }
        Stream::Medicine => {
            for row in reader.deserialize::<MedicineRow>() {
                let row = row?;
                records.push(StreamRecord::Medicine {
                    date: row.date,
                    cold_cough_sales: row.cold_cough_sales,
                    fever_sales: row.fever_sales,
                });
            }
        }
        Stream::Toilet => {
            for row in reader.deserialize::<ToiletRow>() {
                let row = row?;
                records.push(StreamRecord::Toilet {
                    date: row.date,
                    usage_count: row.usage_count,
                });
            }
        }
        Stream::Water => {
            for row in reader.deserialize::<WaterRow>() {
                let row = row?;
                records.push(StreamRecord::Water {
                    date: row.date,
                    ph: row.ph,
                    turbidity: row.turbidity,
                });
            }
        }
    }

    Ok(records)
}

/// Assembles the latest record of every stream into one validated reading.
pub fn extract(source: &dyn DataSource) -> Result<IndicatorReading> {
    let mut dates = Vec::with_capacity(Stream::ALL.len());
    let mut reading = IndicatorReading {
        date: NaiveDate::MIN,
        total_students: 0,
        absent_students: 0,
        cold_sales: 0,
        fever_sales: 0,
        toilet_usage_count: 0,
        ph: 7.0,
        turbidity: 0.0,
    };

    for stream in Stream::ALL {
        let record = source.latest(stream)?;
        dates.push(record.date());
        match record {
            StreamRecord::School {
                total_students,
                absent_students,
                ..
            } => {
                reading.total_students = total_students;
                reading.absent_students = absent_students;
            }
            StreamRecord::Medicine {
                cold_cough_sales,
                fever_sales,
                ..
            } => {
                reading.cold_sales = cold_cough_sales;
                reading.fever_sales = fever_sales;
            }
            StreamRecord::Toilet { usage_count, .. } => {
                reading.toilet_usage_count = usage_count;
            }
            StreamRecord::Water { ph, turbidity, .. } => {
                reading.ph = ph;
                reading.turbidity = turbidity;
            }
        }
    }

    let newest = dates.iter().copied().max().unwrap_or(NaiveDate::MIN);
    let oldest = dates.iter().copied().min().unwrap_or(NaiveDate::MIN);
    if newest != oldest {
        warn!(%oldest, %newest, "latest records differ in date across streams");
    }
    reading.date = newest;

    reading.validate()?;
    Ok(reading)
}

/// Primary values of the trailing `window` records, oldest first, unpadded.
pub fn extract_trend(source: &dyn DataSource, stream: Stream, window: usize) -> Result<Vec<f64>> {
    let records = source.trend(stream, window)?;
    Ok(records.iter().map(StreamRecord::primary_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHOOL: &str = "date,total_students,absent_students\n\
                          2026-03-01,200,8\n\
                          2026-03-02,200,12\n\
                          2026-03-03,200,20\n";
    const MEDICINE: &str = "date,cold_cough_sales,fever_sales\n\
                            2026-03-02,18,9\n\
                            2026-03-03,10,5\n";
    const TOILET: &str = "date,usage_count\n2026-03-03,100\n";
    const WATER: &str = "date,ph,turbidity\n2026-03-03,7.0,2.0\n";

    fn full_source() -> TableSource {
        TableSource::new()
            .with_csv(Stream::School, SCHOOL.as_bytes())
            .unwrap()
            .with_csv(Stream::Medicine, MEDICINE.as_bytes())
            .unwrap()
            .with_csv(Stream::Toilet, TOILET.as_bytes())
            .unwrap()
            .with_csv(Stream::Water, WATER.as_bytes())
            .unwrap()
    }

    #[test]
    fn extracts_latest_record_of_each_stream() {
        let reading = extract(&full_source()).unwrap();
        assert_eq!(reading.date, NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert_eq!(reading.total_students, 200);
        assert_eq!(reading.absent_students, 20);
        assert_eq!(reading.cold_sales, 10);
        assert_eq!(reading.fever_sales, 5);
        assert_eq!(reading.toilet_usage_count, 100);
        assert_eq!(reading.ph, 7.0);
        assert_eq!(reading.turbidity, 2.0);
    }

    #[test]
    fn latest_uses_date_not_file_order() {
        let csv = "date,usage_count\n2026-03-05,310\n2026-03-01,290\n";
        let source = TableSource::new()
            .with_csv(Stream::Toilet, csv.as_bytes())
            .unwrap();
        let latest = source.latest(Stream::Toilet).unwrap();
        assert_eq!(latest.primary_value(), 310.0);
    }

    #[test]
    fn missing_stream_is_named() {
        let source = TableSource::new()
            .with_csv(Stream::School, SCHOOL.as_bytes())
            .unwrap();
        match extract(&source) {
            Err(Error::MissingStream(stream)) => assert_eq!(stream, Stream::Medicine),
            other => panic!("expected missing stream, got {other:?}"),
        }
    }

    #[test]
    fn empty_stream_is_rejected() {
        let source = full_source()
            .with_csv(Stream::Water, "date,ph,turbidity\n".as_bytes())
            .unwrap();
        match extract(&source) {
            Err(Error::EmptyStream(stream)) => assert_eq!(stream, Stream::Water),
            other => panic!("expected empty stream, got {other:?}"),
        }
    }

    #[test]
    fn zero_enrolment_surfaces_as_invalid_indicator() {
        let school = "date,total_students,absent_students\n2026-03-03,0,0\n";
        let source = full_source()
            .with_csv(Stream::School, school.as_bytes())
            .unwrap();
        assert!(matches!(
            extract(&source),
            Err(Error::InvalidIndicator {
                field: "total_students",
                ..
            })
        ));
    }

    #[test]
    fn trend_is_ordered_and_unpadded() {
        let source = full_source();
        let trend = extract_trend(&source, Stream::School, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(trend, vec![8.0, 12.0, 20.0]);

        let short = extract_trend(&source, Stream::School, 2).unwrap();
        assert_eq!(short, vec![12.0, 20.0]);

        let medicine = extract_trend(&source, Stream::Medicine, 7).unwrap();
        assert_eq!(medicine, vec![27.0, 15.0]);
    }

    #[test]
    fn negative_csv_count_reaches_validation() {
        let school = "date,total_students,absent_students\n2026-03-03,200,-4\n";
        let source = full_source()
            .with_csv(Stream::School, school.as_bytes())
            .unwrap();
        assert!(matches!(
            extract(&source),
            Err(Error::InvalidIndicator {
                field: "absent_students",
                ..
            })
        ));
    }

    #[test]
    fn zero_window_yields_empty_trend() {
        let trend = extract_trend(&full_source(), Stream::School, 0).unwrap();
        assert!(trend.is_empty());
    }

    #[test]
    fn toilet_and_water_trends_use_their_metrics() {
        let source = full_source()
            .with_csv(
                Stream::Toilet,
                "date,usage_count\n2026-03-02,280\n2026-03-03,100\n".as_bytes(),
            )
            .unwrap()
            .with_csv(
                Stream::Water,
                "date,ph,turbidity\n2026-03-02,6.0,4.0\n2026-03-03,7.0,2.0\n".as_bytes(),
            )
            .unwrap();

        let toilet = extract_trend(&source, Stream::Toilet, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(toilet, vec![280.0, 100.0]);

        let water = extract_trend(&source, Stream::Water, DEFAULT_TREND_WINDOW).unwrap();
        assert_eq!(water.len(), 2);
        assert!((water[0] - 14.0).abs() < 1e-9);
        assert!((water[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_csv_is_an_error() {
        let csv = "date,usage_count\nnot-a-date,12\n";
        let result = TableSource::new().with_csv(Stream::Toilet, csv.as_bytes());
        assert!(matches!(result, Err(Error::Csv(_))));
    }
}
