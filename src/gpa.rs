use crate::chart::Series;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DISTRIBUTION_BUCKETS: [&str; 4] = ["0-1", "1-2", "2-3", "3-4"];

/// 0-100 score to the 0-4 evaluation scale.
pub fn score_to_eval(score: f64) -> u8 {
    if score >= 90.0 {
        4
    } else if score >= 80.0 {
        3
    } else if score >= 70.0 {
        2
    } else if score >= 60.0 {
        1
    } else {
        0
    }
}

/// Evaluation of a (possibly fractional) average: each band's upper edge is
/// inclusive, so 79.5 is a 3 and 89.5 a 4.
pub fn avg_to_eval(avg: f64) -> u8 {
    if avg <= 59.0 {
        0
    } else if avg <= 69.0 {
        1
    } else if avg <= 79.0 {
        2
    } else if avg <= 89.0 {
        3
    } else {
        4
    }
}

pub const MAX_UNIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub student_id: String,
    pub subject_id: i64,
    #[serde(default)]
    pub subject_name: Option<String>,
    pub unit: i64,
    pub score: f64,
}

impl GradeRecord {
    fn eval(&self) -> u8 {
        score_to_eval(self.score)
    }

    fn subject_label(&self) -> String {
        match self.subject_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Subject {}", self.subject_id),
        }
    }
}

/// Rejects credit units outside `0..=MAX_UNIT`.
pub fn check_records(records: &[GradeRecord]) -> Result<(), String> {
    match records.iter().position(|r| !(0..=MAX_UNIT).contains(&r.unit)) {
        Some(i) => Err(format!(
            "records[{}].unit must be between 0 and {}",
            i, MAX_UNIT
        )),
        None => Ok(()),
    }
}

fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Credit-weighted GPA over the given records, rounded to two decimals.
pub fn weighted_gpa<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    let mut total_units: i64 = 0;
    let mut total_points: f64 = 0.0;
    for r in records {
        total_units = total_units.saturating_add(r.unit);
        total_points += f64::from(r.eval()) * r.unit as f64;
    }
    if total_units > 0 {
        round_2(total_points / total_units as f64)
    } else {
        0.0
    }
}

pub fn student_gpa(records: &[GradeRecord], student_id: &str) -> f64 {
    weighted_gpa(records.iter().filter(|r| r.student_id == student_id))
}

fn by_student(records: &[GradeRecord]) -> BTreeMap<&str, Vec<&GradeRecord>> {
    let mut out: BTreeMap<&str, Vec<&GradeRecord>> = BTreeMap::new();
    for r in records {
        out.entry(r.student_id.as_str()).or_default().push(r);
    }
    out
}

/// Student counts per GPA bucket. 4.0 lands in the top bucket.
pub fn gpa_distribution(records: &[GradeRecord]) -> Series {
    let mut counts = [0u32; 4];
    for (_, rows) in by_student(records) {
        let gpa = weighted_gpa(rows.iter().copied());
        let bucket = (gpa.floor().max(0.0) as usize).min(counts.len() - 1);
        counts[bucket] += 1;
    }
    Series::new(
        DISTRIBUTION_BUCKETS.iter().map(|b| b.to_string()).collect(),
        counts.iter().map(|&c| f64::from(c)).collect(),
    )
}

struct SubjectTotals {
    label: String,
    sum: f64,
    count: usize,
}

fn subject_totals<'a, I>(records: I) -> BTreeMap<i64, SubjectTotals>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    let mut out: BTreeMap<i64, SubjectTotals> = BTreeMap::new();
    for r in records {
        let entry = out.entry(r.subject_id).or_insert_with(|| SubjectTotals {
            label: r.subject_label(),
            sum: 0.0,
            count: 0,
        });
        entry.sum += r.score;
        entry.count += 1;
    }
    out
}

fn averages_series(totals: BTreeMap<i64, SubjectTotals>) -> Series {
    let mut series = Series::default();
    for t in totals.into_values() {
        series.labels.push(t.label);
        series.values.push(round_2(t.sum / t.count as f64));
    }
    series
}

/// Mean score per subject across all students, ordered by subject id.
pub fn subject_averages(records: &[GradeRecord]) -> Series {
    averages_series(subject_totals(records))
}

/// One student's mean score per subject, ordered by subject id.
pub fn student_subject_scores(records: &[GradeRecord], student_id: &str) -> Series {
    averages_series(subject_totals(
        records.iter().filter(|r| r.student_id == student_id),
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreditPoints {
    pub by_student: Series,
    pub by_subject: Series,
}

/// Sum of `unit * eval`, grouped by student id and by subject id.
pub fn credit_points(records: &[GradeRecord]) -> CreditPoints {
    let mut students: BTreeMap<&str, i64> = BTreeMap::new();
    let mut subjects: BTreeMap<i64, (String, i64)> = BTreeMap::new();
    for r in records {
        let points = r.unit.saturating_mul(i64::from(r.eval()));
        let student = students.entry(r.student_id.as_str()).or_default();
        *student = student.saturating_add(points);
        let subject = subjects
            .entry(r.subject_id)
            .or_insert_with(|| (r.subject_label(), 0));
        subject.1 = subject.1.saturating_add(points);
    }

    let mut by_student = Series::default();
    for (id, points) in students {
        by_student.labels.push(id.to_string());
        by_student.values.push(points as f64);
    }
    let mut by_subject = Series::default();
    for (label, points) in subjects.into_values() {
        by_subject.labels.push(label);
        by_subject.values.push(points as f64);
    }
    CreditPoints {
        by_student,
        by_subject,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStanding {
    pub subject_id: i64,
    pub subject_name: String,
    pub credits: i64,
    pub eval: u8,
    #[serde(skip)]
    avg_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrengthReport {
    pub strong: Vec<SubjectStanding>,
    pub weak: Vec<SubjectStanding>,
}

/// Splits a student's subjects into strong (eval >= 3) and weak (eval <= 2).
/// Strong is ordered best first, weak worst first; subject id breaks ties.
pub fn strengths_and_weaknesses(records: &[GradeRecord], student_id: &str) -> StrengthReport {
    let mut credits: BTreeMap<i64, i64> = BTreeMap::new();
    let own: Vec<&GradeRecord> = records
        .iter()
        .filter(|r| r.student_id == student_id)
        .collect();
    for r in &own {
        credits.entry(r.subject_id).or_insert(r.unit);
    }

    let mut report = StrengthReport::default();
    for (subject_id, t) in subject_totals(own.iter().copied()) {
        let avg_score = t.sum / t.count as f64;
        let standing = SubjectStanding {
            subject_id,
            subject_name: t.label,
            credits: credits.get(&subject_id).copied().unwrap_or(0),
            eval: avg_to_eval(avg_score),
            avg_score,
        };
        if standing.eval >= 3 {
            report.strong.push(standing);
        } else {
            report.weak.push(standing);
        }
    }

    report.strong.sort_by(|a, b| {
        b.eval
            .cmp(&a.eval)
            .then_with(|| b.avg_score.partial_cmp(&a.avg_score).unwrap_or(Ordering::Equal))
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
    report.weak.sort_by(|a, b| {
        a.eval
            .cmp(&b.eval)
            .then_with(|| a.avg_score.partial_cmp(&b.avg_score).unwrap_or(Ordering::Equal))
            .then_with(|| a.subject_id.cmp(&b.subject_id))
    });
    report
}
