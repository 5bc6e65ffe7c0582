/// Fixed class and subject catalogues for the school. Classes are named
/// `<tier><year> <arm>`; the `JSS` prefix marks the junior tier.
pub const CLASSES: [&str; 18] = [
    "JSS1 A", "JSS1 B", "JSS1 C", "JSS2 A", "JSS2 B", "JSS2 C", "JSS3 A", "JSS3 B", "JSS3 C",
    "SSS1 A", "SSS1 B", "SSS1 C", "SSS2 A", "SSS2 B", "SSS2 C", "SSS3 A", "SSS3 B", "SSS3 C",
];

pub const JUNIOR_SUBJECTS: [&str; 14] = [
    "English Language",
    "Mathematics",
    "Basic Science",
    "Social Studies",
    "Civic Education",
    "Agric. Science",
    "Physical & Health Edu.",
    "Computer Studies",
    "Hausa Language",
    "I.R.K./C.R.K.",
    "Basic Technology",
    "Business Studies",
    "Cultural & Creative Art",
    "Home Economics",
];

pub const SENIOR_SUBJECTS: [&str; 18] = [
    "English Language",
    "Mathematics",
    "Chemistry",
    "Physics",
    "Biology",
    "Agric. Science",
    "Civic Education",
    "Economics",
    "Computer Studies",
    "Marketing",
    "Geography",
    "Government",
    "Entrepreneurship",
    "I.R.K./C.R.K.",
    "Hausa Language",
    "History",
    "Accounting",
    "Literature-In-Eng.",
];

pub fn is_valid_class(name: &str) -> bool {
    CLASSES.contains(&name)
}

pub fn is_junior(class_name: &str) -> bool {
    class_name.to_ascii_uppercase().starts_with("JSS")
}

/// The fixed curriculum for a class's tier.
pub fn base_subjects(class_name: &str) -> &'static [&'static str] {
    if is_junior(class_name) {
        &JUNIOR_SUBJECTS
    } else {
        &SENIOR_SUBJECTS
    }
}
