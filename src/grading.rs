use std::collections::BTreeMap;

use serde::Serialize;

use crate::curriculum;
use crate::store::ScoreRecord;

/// Letter grade derived from a term total out of 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_total(total: u32) -> Self {
        match total {
            70.. => Grade::A,
            60..=69 => Grade::B,
            50..=59 => Grade::C,
            40..=49 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn remark(self) -> &'static str {
        match self {
            Grade::A => "EXCELLENT",
            Grade::B => "VERY GOOD",
            Grade::C => "GOOD",
            Grade::D => "PASS",
            Grade::F => "FAIL",
        }
    }
}

/// Class extremes for one subject. Empty input reports 0/0 so the report
/// columns always print.
pub fn subject_extremes(class_scores: &[&ScoreRecord], subject: &str) -> (u32, u32) {
    let totals: Vec<u32> = class_scores
        .iter()
        .filter(|s| s.subject == subject)
        .map(|s| s.total())
        .collect();
    if totals.is_empty() {
        return (0, 0);
    }
    let high = totals.iter().copied().max().unwrap_or(0);
    let low = totals.iter().copied().min().unwrap_or(0);
    (high, low)
}

/// The subject rows a class's report prints: the tier curriculum first, then
/// any extra subjects that appear in the class's scores, in first-appearance
/// order.
pub fn report_subjects(class_name: &str, class_scores: &[&ScoreRecord]) -> Vec<String> {
    let mut subjects: Vec<String> = curriculum::base_subjects(class_name)
        .iter()
        .map(|s| s.to_string())
        .collect();
    for score in class_scores {
        if !subjects.iter().any(|s| *s == score.subject) {
            subjects.push(score.subject.clone());
        }
    }
    subjects
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub student_id: String,
    pub grand_total: u32,
    pub position: usize,
}

/// Ranks a class by grand total over the given subject list, descending.
/// Ties break on registration number so repeated runs agree.
pub fn rank_class(
    students: &[(String, String)], // (student_id, reg_number)
    class_scores: &[&ScoreRecord],
    subjects: &[String],
) -> Vec<RankedStudent> {
    let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
    for (id, _) in students {
        totals.insert(id, 0);
    }
    for score in class_scores {
        if subjects.iter().any(|s| *s == score.subject) {
            if let Some(t) = totals.get_mut(score.student_id.as_str()) {
                *t += score.total();
            }
        }
    }

    let mut ordered: Vec<(&String, &String, u32)> = students
        .iter()
        .map(|(id, reg)| (id, reg, *totals.get(id.as_str()).unwrap_or(&0)))
        .collect();
    ordered.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(b.1)));

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (id, _, total))| RankedStudent {
            student_id: id.clone(),
            grand_total: total,
            position: i + 1,
        })
        .collect()
}

pub fn term_label(term: u8) -> &'static str {
    match term {
        1 => "1st",
        2 => "2nd",
        3 => "3rd",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(student_id: &str, subject: &str, ca1: u32, ca2: u32, exam: u32) -> ScoreRecord {
        ScoreRecord {
            id: format!("{student_id}-{subject}"),
            student_id: student_id.to_string(),
            subject: subject.to_string(),
            term: 1,
            session: "2025/2026".to_string(),
            ca1,
            ca2,
            exam,
            teacher_id: "u4".to_string(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn grade_band_boundaries() {
        assert_eq!(Grade::from_total(100), Grade::A);
        assert_eq!(Grade::from_total(70), Grade::A);
        assert_eq!(Grade::from_total(69), Grade::B);
        assert_eq!(Grade::from_total(60), Grade::B);
        assert_eq!(Grade::from_total(59), Grade::C);
        assert_eq!(Grade::from_total(50), Grade::C);
        assert_eq!(Grade::from_total(49), Grade::D);
        assert_eq!(Grade::from_total(40), Grade::D);
        assert_eq!(Grade::from_total(39), Grade::F);
        assert_eq!(Grade::from_total(0), Grade::F);
    }

    #[test]
    fn grade_remarks() {
        assert_eq!(Grade::from_total(90).remark(), "EXCELLENT");
        assert_eq!(Grade::from_total(30).remark(), "FAIL");
        assert_eq!(Grade::from_total(55).letter(), "C");
    }

    #[test]
    fn extremes_default_to_zero() {
        let s1 = score("s1", "Mathematics", 10, 10, 50);
        let s2 = score("s2", "Mathematics", 5, 5, 30);
        let refs: Vec<&ScoreRecord> = vec![&s1, &s2];
        assert_eq!(subject_extremes(&refs, "Mathematics"), (70, 40));
        assert_eq!(subject_extremes(&refs, "Physics"), (0, 0));
    }

    #[test]
    fn extra_subjects_append_after_curriculum() {
        let s1 = score("s1", "French", 10, 10, 50);
        let s2 = score("s1", "Mathematics", 10, 10, 50);
        let refs: Vec<&ScoreRecord> = vec![&s1, &s2];
        let subjects = report_subjects("JSS1 A", &refs);
        assert_eq!(subjects.len(), 15);
        assert_eq!(subjects.last().map(String::as_str), Some("French"));
        assert_eq!(subjects[0], "English Language");
    }

    #[test]
    fn ranking_is_total_then_reg_number() {
        let students = vec![
            ("s1".to_string(), "CDSS/25/1001".to_string()),
            ("s2".to_string(), "CDSS/25/1000".to_string()),
            ("s3".to_string(), "CDSS/25/1002".to_string()),
        ];
        let a = score("s1", "Mathematics", 10, 10, 50);
        let b = score("s2", "Mathematics", 10, 10, 50);
        let c = score("s3", "Mathematics", 5, 5, 30);
        let refs: Vec<&ScoreRecord> = vec![&a, &b, &c];
        let subjects = vec!["Mathematics".to_string()];

        let ranked = rank_class(&students, &refs, &subjects);
        // s1 and s2 tie on 70; s2 has the lower reg number.
        assert_eq!(ranked[0].student_id, "s2");
        assert_eq!(ranked[0].position, 1);
        assert_eq!(ranked[1].student_id, "s1");
        assert_eq!(ranked[1].position, 2);
        assert_eq!(ranked[2].student_id, "s3");
        assert_eq!(ranked[2].grand_total, 40);
    }

    #[test]
    fn ranking_ignores_out_of_list_subjects() {
        let students = vec![("s1".to_string(), "CDSS/25/1000".to_string())];
        let a = score("s1", "Mathematics", 10, 10, 50);
        let b = score("s1", "Astrology", 15, 15, 70);
        let refs: Vec<&ScoreRecord> = vec![&a, &b];
        let ranked = rank_class(&students, &refs, &["Mathematics".to_string()]);
        assert_eq!(ranked[0].grand_total, 70);
    }

    #[test]
    fn term_labels() {
        assert_eq!(term_label(1), "1st");
        assert_eq!(term_label(2), "2nd");
        assert_eq!(term_label(3), "3rd");
    }
}
