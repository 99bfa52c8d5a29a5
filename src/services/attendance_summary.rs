use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::attendance;
use crate::entities::sea_orm_active_enums::AttendanceStatus;

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct SubjectAttendanceSummary {
    pub subject_id: Uuid,
    pub subject_name: Option<String>,
    pub total: u32,
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub excused: u32,
    /// Present and late classes over all non-excused classes, 0 when nothing counts.
    pub percentage: f64,
}

/// Per-subject totals, ordered by subject id so the output is stable.
pub fn summarize(
    records: &[attendance::Model],
    subject_names: &HashMap<Uuid, String>,
) -> Vec<SubjectAttendanceSummary> {
    let mut by_subject: BTreeMap<Uuid, SubjectAttendanceSummary> = BTreeMap::new();

    for record in records {
        let entry = by_subject
            .entry(record.subject_id)
            .or_insert_with(|| SubjectAttendanceSummary {
                subject_id: record.subject_id,
                subject_name: subject_names.get(&record.subject_id).cloned(),
                total: 0,
                present: 0,
                late: 0,
                absent: 0,
                excused: 0,
                percentage: 0.0,
            });
        entry.total += 1;
        match record.status {
            AttendanceStatus::Present => entry.present += 1,
            AttendanceStatus::Late => entry.late += 1,
            AttendanceStatus::Absent => entry.absent += 1,
            AttendanceStatus::Excused => entry.excused += 1,
        }
    }

    by_subject
        .into_values()
        .map(|mut summary| {
            let counted = summary.total - summary.excused;
            if counted > 0 {
                let attended = f64::from(summary.present + summary.late);
                summary.percentage = (attended * 10000.0 / f64::from(counted)).round() / 100.0;
            }
            summary
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn record(subject_id: Uuid, day: u32, status: AttendanceStatus) -> attendance::Model {
        let now = Utc::now().naive_utc();
        attendance::Model {
            attendance_id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            subject_id,
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            status,
            marked_by: Uuid::nil(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_percentage_counts_late_and_skips_excused() {
        let maths = Uuid::new_v4();
        let records = vec![
            record(maths, 1, AttendanceStatus::Present),
            record(maths, 2, AttendanceStatus::Late),
            record(maths, 3, AttendanceStatus::Absent),
            record(maths, 4, AttendanceStatus::Excused),
        ];
        let names = HashMap::from([(maths, "Mathematics".to_string())]);

        let summary = summarize(&records, &names);
        assert_eq!(summary.len(), 1);
        let maths_summary = &summary[0];
        assert_eq!(maths_summary.subject_name.as_deref(), Some("Mathematics"));
        assert_eq!(maths_summary.total, 4);
        assert_eq!(maths_summary.excused, 1);
        assert_eq!(maths_summary.percentage, 66.67);
    }

    #[test]
    fn test_only_excused_gives_zero() {
        let physics = Uuid::new_v4();
        let records = vec![record(physics, 1, AttendanceStatus::Excused)];
        let summary = summarize(&records, &HashMap::new());
        assert_eq!(summary[0].percentage, 0.0);
        assert_eq!(summary[0].subject_name, None);
    }

    #[test]
    fn test_groups_by_subject() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let records = vec![
            record(a, 1, AttendanceStatus::Present),
            record(b, 1, AttendanceStatus::Absent),
            record(a, 2, AttendanceStatus::Present),
        ];
        let summary = summarize(&records, &HashMap::new());
        assert_eq!(summary.len(), 2);
        let a_summary = summary.iter().find(|s| s.subject_id == a).unwrap();
        assert_eq!(a_summary.percentage, 100.0);
        let b_summary = summary.iter().find(|s| s.subject_id == b).unwrap();
        assert_eq!(b_summary.percentage, 0.0);
    }
}
