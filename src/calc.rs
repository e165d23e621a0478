use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CalcError;

pub const DEFAULT_ELIGIBILITY_THRESHOLD: u32 = 75;
pub const DEFAULT_WARNING_THRESHOLD: u32 = 65;

/// One subject's attendance tally. `attended_classes <= total_classes` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawAttendanceRecord")]
pub struct AttendanceRecord {
    subject_name: String,
    total_classes: u32,
    attended_classes: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttendanceRecord {
    #[serde(default)]
    subject_name: String,
    total_classes: u32,
    attended_classes: u32,
}

impl TryFrom<RawAttendanceRecord> for AttendanceRecord {
    type Error = CalcError;

    fn try_from(raw: RawAttendanceRecord) -> Result<Self, Self::Error> {
        Self::new(raw.subject_name, raw.total_classes, raw.attended_classes)
    }
}

impl AttendanceRecord {
    pub fn new(
        subject_name: impl Into<String>,
        total_classes: u32,
        attended_classes: u32,
    ) -> Result<Self, CalcError> {
        let subject_name = subject_name.into();
        if attended_classes > total_classes {
            return Err(CalcError::InvalidRecord(format!(
                "{}: attended {} exceeds total {}",
                subject_name, attended_classes, total_classes
            )));
        }
        Ok(Self {
            subject_name,
            total_classes,
            attended_classes,
        })
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn total_classes(&self) -> u32 {
        self.total_classes
    }

    pub fn attended_classes(&self) -> u32 {
        self.attended_classes
    }

    pub fn percentage(&self) -> Result<u32, CalcError> {
        attendance_percentage(self.attended_classes, self.total_classes)
    }
}

/// `round(attended / total * 100)`, half-up.
///
/// Computed as `(200a + t) / 2t` in integers, which is `floor(100a/t + 1/2)`
/// exactly, so values sitting on `.5` never drift the way the float form can.
pub fn attendance_percentage(attended: u32, total: u32) -> Result<u32, CalcError> {
    ratio_percentage(attended as u64, total as u64)
}

fn ratio_percentage(attended: u64, total: u64) -> Result<u32, CalcError> {
    if total == 0 {
        return Err(CalcError::DivisionByZero);
    }
    if attended > total {
        return Err(CalcError::InvalidRecord(format!(
            "attended {} exceeds total {}",
            attended, total
        )));
    }
    // u128 keeps the doubled sums in range for any number of u32 records.
    let (attended, total) = (attended as u128, total as u128);
    let pct = (200 * attended + total) / (2 * total);
    Ok(pct as u32)
}

/// Percentage with the documented fallback: any error yields 0.
pub fn percentage_or_zero(attended: u32, total: u32) -> u32 {
    match attendance_percentage(attended, total) {
        Ok(p) => p,
        Err(e) => {
            debug!(attended, total, error = %e, "attendance percentage fell back to 0");
            0
        }
    }
}

/// Ties are eligible.
pub fn is_eligible(percentage: u32, threshold: u32) -> bool {
    percentage >= threshold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceAggregate {
    pub total_classes: u64,
    pub total_attended: u64,
    pub overall_percentage: u32,
    pub percentage_defined: bool,
}

impl AttendanceAggregate {
    /// Aggregate with the zero fallback; `percentage_defined` reports whether it was used.
    pub fn or_zero(records: &[AttendanceRecord]) -> Self {
        let (total_classes, total_attended) = sum_records(records);
        match ratio_percentage(total_attended, total_classes) {
            Ok(overall_percentage) => Self {
                total_classes,
                total_attended,
                overall_percentage,
                percentage_defined: true,
            },
            Err(e) => {
                debug!(records = records.len(), error = %e, "aggregate attendance fell back to 0");
                Self {
                    total_classes,
                    total_attended,
                    overall_percentage: 0,
                    percentage_defined: false,
                }
            }
        }
    }
}

fn sum_records(records: &[AttendanceRecord]) -> (u64, u64) {
    records.iter().fold((0_u64, 0_u64), |(t, a), r| {
        (t + r.total_classes as u64, a + r.attended_classes as u64)
    })
}

pub fn aggregate_attendance(records: &[AttendanceRecord]) -> Result<AttendanceAggregate, CalcError> {
    let (total_classes, total_attended) = sum_records(records);
    let overall_percentage = ratio_percentage(total_attended, total_classes)?;
    Ok(AttendanceAggregate {
        total_classes,
        total_attended,
        overall_percentage,
        percentage_defined: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceThresholds {
    pub eligibility: u32,
    pub warning: u32,
}

impl Default for AttendanceThresholds {
    fn default() -> Self {
        Self {
            eligibility: DEFAULT_ELIGIBILITY_THRESHOLD,
            warning: DEFAULT_WARNING_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceBand {
    Good,
    Warning,
    Critical,
}

impl AttendanceBand {
    pub fn classify(percentage: u32, thresholds: &AttendanceThresholds) -> Self {
        if percentage >= thresholds.eligibility {
            Self::Good
        } else if percentage >= thresholds.warning {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendance {
    pub subject_name: String,
    pub attended_classes: u32,
    pub total_classes: u32,
    pub percentage: u32,
    pub percentage_defined: bool,
    pub band: AttendanceBand,
    pub needs_improvement: bool,
}

/// Per-subject view in input order.
pub fn subject_breakdown(
    records: &[AttendanceRecord],
    thresholds: &AttendanceThresholds,
) -> Vec<SubjectAttendance> {
    records
        .iter()
        .map(|r| {
            let (percentage, percentage_defined) = match r.percentage() {
                Ok(p) => (p, true),
                Err(_) => (0, false),
            };
            SubjectAttendance {
                subject_name: r.subject_name.clone(),
                attended_classes: r.attended_classes,
                total_classes: r.total_classes,
                percentage,
                percentage_defined,
                band: AttendanceBand::classify(percentage, thresholds),
                needs_improvement: percentage < thresholds.eligibility,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    #[serde(flatten)]
    pub aggregate: AttendanceAggregate,
    pub eligible: bool,
    pub threshold: u32,
    pub subjects: Vec<SubjectAttendance>,
}

pub fn attendance_report(
    records: &[AttendanceRecord],
    thresholds: &AttendanceThresholds,
) -> AttendanceReport {
    let aggregate = AttendanceAggregate::or_zero(records);
    AttendanceReport {
        aggregate,
        eligible: aggregate.percentage_defined
            && is_eligible(aggregate.overall_percentage, thresholds.eligibility),
        threshold: thresholds.eligibility,
        subjects: subject_breakdown(records, thresholds),
    }
}
