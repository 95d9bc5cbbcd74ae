//! Offline synthetic data: four daily tables with seeded outbreak spikes.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::error::{Error, Result};
use crate::extract::{MedicineRow, SchoolRow, ToiletRow, WaterRow};
use crate::models::Stream;

pub const TOTAL_STUDENTS: i64 = 200;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub start: NaiveDate,
    pub days: usize,
    pub spikes: usize,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
            days: 20_000,
            spikes: 120,
            seed: 42,
        }
    }
}

#[derive(Debug, Default)]
pub struct SyntheticTables {
    pub(crate) school: Vec<SchoolRow>,
    pub(crate) medicine: Vec<MedicineRow>,
    pub(crate) toilet: Vec<ToiletRow>,
    pub(crate) water: Vec<WaterRow>,
}

impl SyntheticTables {
    pub fn len(&self) -> usize {
        self.school.len()
    }

    pub fn is_empty(&self) -> bool {
        self.school.is_empty()
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev)
        .map_err(|err| Error::Generator(format!("bad distribution: {err}")))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn generate(config: &GeneratorConfig) -> Result<SyntheticTables> {
    if config.start.checked_add_days(Days::new(config.days as u64)).is_none() {
        return Err(Error::Generator(format!(
            "{} days from {} runs past the last representable date",
            config.days, config.start
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let spike_count = config.spikes.min(config.days);
    let spike_days: HashSet<usize> = index::sample(&mut rng, config.days, spike_count)
        .into_iter()
        .collect();

    let absent = normal(8.0, 2.0)?;
    let cold = normal(20.0, 6.0)?;
    let fever = normal(10.0, 4.0)?;
    let usage = normal(300.0, 40.0)?;
    let ph = normal(7.2, 0.3)?;
    let turbidity = normal(3.0, 1.0)?;

    let mut tables = SyntheticTables::default();
    for day in 0..config.days {
        let date = config
            .start
            .checked_add_days(Days::new(day as u64))
            .ok_or_else(|| Error::Generator(format!("day {day} is out of range")))?;
        let spike = spike_days.contains(&day);

        let mut absent_value = absent.sample(&mut rng);
        let mut cold_value = cold.sample(&mut rng);
        let mut fever_value = fever.sample(&mut rng);
        let mut usage_value = usage.sample(&mut rng);
        let mut ph_value = ph.sample(&mut rng);
        let mut turbidity_value = turbidity.sample(&mut rng);

        if spike {
            absent_value += rng.gen_range(20_i64..60) as f64;
            cold_value += rng.gen_range(30_i64..80) as f64;
            fever_value += rng.gen_range(20_i64..60) as f64;
            usage_value += rng.gen_range(150_i64..400) as f64;
            ph_value -= rng.gen_range(0.8..1.5);
            turbidity_value += rng.gen_range(3.0..6.0);
        }

        tables.school.push(SchoolRow {
            date,
            total_students: TOTAL_STUDENTS,
            absent_students: (absent_value as i64).clamp(0, TOTAL_STUDENTS),
        });
        tables.medicine.push(MedicineRow {
            date,
            cold_cough_sales: (cold_value as i64).max(0),
            fever_sales: (fever_value as i64).max(0),
        });
        tables.toilet.push(ToiletRow {
            date,
            usage_count: (usage_value as i64).max(0),
        });
        tables.water.push(WaterRow {
            date,
            ph: round2(ph_value.clamp(0.0, 14.0)),
            turbidity: round2(turbidity_value.max(0.0)),
        });
    }

    Ok(tables)
}

fn write_rows<W: Write, T: serde::Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_tables(tables: &SyntheticTables, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for stream in Stream::ALL {
        let file = std::fs::File::create(dir.join(stream.file_name()))?;
        match stream {
            Stream::School => write_rows(file, &tables.school)?,
            Stream::Medicine => write_rows(file, &tables.medicine)?,
            Stream::Toilet => write_rows(file, &tables.toilet)?,
            Stream::Water => write_rows(file, &tables.water)?,
        }
    }
    info!(days = tables.len(), dir = %dir.display(), "synthetic tables written");
    Ok(())
}
