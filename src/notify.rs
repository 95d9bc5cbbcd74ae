use std::path::PathBuf;

use chrono::Local;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::extract::{self, DataSource};
use crate::models::{RiskAssessment, Status};
use crate::report;
use crate::risk::{self, StatusTransition, REPORT_THRESHOLD};

pub const EMERGENCY_MESSAGE: &str = "Emergency alert. Disease risk is very high in the village.";

/// Destination for written risk reports.
pub trait ReportSink {
    /// Persists a report and returns its identifier.
    fn emit(&mut self, assessment: &RiskAssessment, reasons: &str) -> Result<String>;
}

/// Destination for urgent alerts (SMS, voice).
pub trait AlertSink {
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// Writes `report_YYYYMMDD_HHMMSS.txt` files into a directory.
pub struct FileReportSink {
    dir: PathBuf,
    village: String,
}

impl FileReportSink {
    pub fn new(dir: impl Into<PathBuf>, village: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            village: village.into(),
        }
    }
}

impl ReportSink for FileReportSink {
    fn emit(&mut self, assessment: &RiskAssessment, reasons: &str) -> Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let now = Local::now().naive_local();
        let stem = format!("report_{}", now.format("%Y%m%d_%H%M%S"));

        let mut file_name = format!("{stem}.txt");
        let mut suffix = 1;
        while self.dir.join(&file_name).exists() {
            file_name = format!("{stem}_{suffix}.txt");
            suffix += 1;
        }

        let body = report::build_report(&self.village, now, assessment, reasons);
        std::fs::write(self.dir.join(&file_name), body)?;
        info!(report = %file_name, score = assessment.score, "report written");
        Ok(file_name)
    }
}

/// Short-message stub: logs what would be sent.
pub struct SmsAlertSink {
    recipient: String,
}

impl SmsAlertSink {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
        }
    }
}

impl AlertSink for SmsAlertSink {
    fn notify(&mut self, message: &str) -> Result<()> {
        warn!(channel = "sms", to = %self.recipient, "{}", message);
        Ok(())
    }
}

/// Spoken-alert stub: logs the phrase instead of synthesizing audio.
pub struct SpeechAlertSink;

impl AlertSink for SpeechAlertSink {
    fn notify(&mut self, message: &str) -> Result<()> {
        warn!(channel = "voice", "{}", message);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub assessment: RiskAssessment,
    pub transition: StatusTransition,
    pub reasons: Vec<String>,
    pub report_id: Option<String>,
    /// Report sink failure, if the report could not be written.
    pub report_error: Option<String>,
    pub alerted: bool,
    pub alert_failures: usize,
}

/// Orchestrates one refresh cycle and remembers the last status so an
/// ongoing emergency alerts only once.
pub struct Notifier {
    last_status: Option<Status>,
    reports: Box<dyn ReportSink>,
    alerts: Vec<Box<dyn AlertSink>>,
}

impl Notifier {
    pub fn new(reports: Box<dyn ReportSink>, alerts: Vec<Box<dyn AlertSink>>) -> Self {
        Self {
            last_status: None,
            reports,
            alerts,
        }
    }

    pub fn last_status(&self) -> Option<Status> {
        self.last_status
    }

    /// Runs extract, score and classify, then dispatches. A failed
    /// evaluation sends nothing and leaves the remembered status untouched.
    /// Sink failures are collected in the outcome and do not stop the other
    /// sinks.
    pub fn run_cycle(&mut self, source: &dyn DataSource) -> Result<CycleOutcome> {
        let reading = extract::extract(source)?;
        let assessment = risk::assess(&reading)?;
        let reasons = report::reasons(&reading, &assessment);

        let transition = StatusTransition {
            previous: self.last_status,
            current: assessment.status,
        };
        if transition.is_change() {
            info!(
                previous = ?transition.previous,
                current = %transition.current,
                "status changed"
            );
        }

        // Alerts are dispatched before the report is written.
        let alerted = transition.should_alert();
        let mut alert_failures = 0;
        if alerted {
            for sink in self.alerts.iter_mut() {
                if let Err(err) = sink.notify(EMERGENCY_MESSAGE) {
                    error!("alert sink failed: {err}");
                    alert_failures += 1;
                }
            }
        }

        // If every channel failed, keep the old status so the next cycle retries.
        let undelivered = alerted && !self.alerts.is_empty() && alert_failures == self.alerts.len();
        if !undelivered {
            self.last_status = Some(assessment.status);
        }

        let mut report_error = None;
        let report_id = if assessment.score >= REPORT_THRESHOLD {
            let text = reasons
                .iter()
                .map(|reason| format!("- {reason}"))
                .collect::<Vec<_>>()
                .join("\n");
            match self.reports.emit(&assessment, &text) {
                Ok(id) => Some(id),
                Err(err) => {
                    error!(score = assessment.score, "report sink failed: {err}");
                    report_error = Some(err.to_string());
                    None
                }
            }
        } else {
            None
        };

        Ok(CycleOutcome {
            assessment,
            transition,
            reasons,
            report_id,
            report_error,
            alerted,
            alert_failures,
        })
    }
}
