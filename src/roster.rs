use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CalcError;

pub const DEFAULT_AT_RISK_ATTENDANCE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Performance {
    Strong,
    Average,
    Weak,
}

impl Performance {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strong" => Some(Self::Strong),
            "average" => Some(Self::Average),
            "weak" => Some(Self::Weak),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "Strong",
            Self::Average => "Average",
            Self::Weak => "Weak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceFilter {
    All,
    Only(Performance),
}

impl PerformanceFilter {
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        Performance::parse(s).map(Self::Only)
    }

    fn matches(self, p: Performance) -> bool {
        match self {
            Self::All => true,
            Self::Only(want) => want == p,
        }
    }
}

/// A student's row on the faculty dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStanding")]
pub struct StudentStanding {
    pub id: String,
    pub name: String,
    pub section: String,
    pub course: String,
    pub attendance: u32,
    pub avg_score: u32,
    pub performance: Performance,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStanding {
    id: String,
    name: String,
    #[serde(default)]
    section: String,
    #[serde(default)]
    course: String,
    attendance: u32,
    #[serde(default)]
    avg_score: u32,
    performance: Performance,
}

impl TryFrom<RawStanding> for StudentStanding {
    type Error = CalcError;

    fn try_from(raw: RawStanding) -> Result<Self, Self::Error> {
        let s = Self {
            id: raw.id,
            name: raw.name,
            section: raw.section,
            course: raw.course,
            attendance: raw.attendance,
            avg_score: raw.avg_score,
            performance: raw.performance,
        };
        s.validate()?;
        Ok(s)
    }
}

impl StudentStanding {
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.id.trim().is_empty() {
            return Err(CalcError::InvalidRecord("student id must not be empty".into()));
        }
        if self.attendance > 100 {
            return Err(CalcError::InvalidRecord(format!(
                "{}: attendance {} is above 100",
                self.id, self.attendance
            )));
        }
        if self.avg_score > 100 {
            return Err(CalcError::InvalidRecord(format!(
                "{}: average score {} is above 100",
                self.id, self.avg_score
            )));
        }
        Ok(())
    }
}

pub fn filter_by_performance(
    students: &[StudentStanding],
    filter: PerformanceFilter,
) -> Vec<&StudentStanding> {
    students
        .iter()
        .filter(|s| filter.matches(s.performance))
        .collect()
}

/// Weak performers, plus anyone whose attendance is strictly below `min_attendance`.
pub fn at_risk(students: &[StudentStanding], min_attendance: u32) -> Vec<&StudentStanding> {
    students
        .iter()
        .filter(|s| s.performance == Performance::Weak || s.attendance < min_attendance)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Assigned,
    Course,
}

impl ReportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assigned" => Some(Self::Assigned),
            "course" => Some(Self::Course),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Course => "course",
        }
    }
}

pub fn report_file_name(kind: ReportKind, date: NaiveDate) -> String {
    format!(
        "{}_students_report_{}.csv",
        kind.as_str(),
        date.format("%Y-%m-%d")
    )
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn section_report_csv<'a, I>(students: I) -> String
where
    I: IntoIterator<Item = &'a StudentStanding>,
{
    let mut csv = String::from("Student ID,Name,Course,Status,Attendance\n");
    for s in students {
        csv.push_str(&format!(
            "{},{},{},{},{}%\n",
            csv_quote(&s.id),
            csv_quote(&s.name),
            csv_quote(&s.course),
            s.performance.as_str(),
            s.attendance
        ));
    }
    csv
}
