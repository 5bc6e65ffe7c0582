use serde::{Deserialize, Serialize};

use crate::store::User;

/// Closed set of staff roles. The wire form matches the stored collections
/// (`SCREAMING_SNAKE_CASE` strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Commandant,
    AdminOfficer,
    VpAcademics,
    VpAdmin,
    ExamOfficer,
    FormMaster,
    SubjectTeacher,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Commandant => "COMMANDANT",
            Role::AdminOfficer => "ADMIN_OFFICER",
            Role::VpAcademics => "VP_ACADEMICS",
            Role::VpAdmin => "VP_ADMIN",
            Role::ExamOfficer => "EXAM_OFFICER",
            Role::FormMaster => "FORM_MASTER",
            Role::SubjectTeacher => "SUBJECT_TEACHER",
        }
    }
}

// Each permission is defined exactly once and consumed everywhere a surface
// renders a control or accepts a mutation.

pub fn can_manage_users(role: Role) -> bool {
    matches!(
        role,
        Role::Commandant | Role::AdminOfficer | Role::ExamOfficer | Role::VpAcademics
    )
}

/// Destructive user actions: delete, deactivate, reject.
pub fn can_delete_users(role: Role) -> bool {
    matches!(
        role,
        Role::Commandant | Role::AdminOfficer | Role::ExamOfficer
    )
}

pub fn can_manage_students(role: Role) -> bool {
    matches!(
        role,
        Role::Commandant | Role::AdminOfficer | Role::ExamOfficer | Role::VpAdmin
    )
}

pub fn can_manage_session(role: Role) -> bool {
    matches!(role, Role::Commandant | Role::AdminOfficer)
}

pub fn can_manage_branding(role: Role) -> bool {
    matches!(role, Role::Commandant | Role::AdminOfficer)
}

pub fn can_view_logs(role: Role) -> bool {
    matches!(
        role,
        Role::Commandant
            | Role::AdminOfficer
            | Role::ExamOfficer
            | Role::VpAdmin
            | Role::VpAcademics
    )
}

pub fn can_assign_subjects(role: Role) -> bool {
    matches!(
        role,
        Role::Commandant | Role::AdminOfficer | Role::VpAcademics
    )
}

/// Roles that may hold class/subject assignments. Everything but SuperAdmin
/// teaches somewhere; several supervisory roles double as subject teachers.
pub fn is_teaching_role(role: Role) -> bool {
    matches!(
        role,
        Role::SubjectTeacher
            | Role::VpAcademics
            | Role::VpAdmin
            | Role::ExamOfficer
            | Role::FormMaster
            | Role::Commandant
            | Role::AdminOfficer
    )
}

/// System-wide read visibility into scores and classes. Visibility never
/// implies edit authority; see [`can_edit_scores`].
pub fn is_supervisor(role: Role) -> bool {
    matches!(
        role,
        Role::VpAcademics
            | Role::VpAdmin
            | Role::ExamOfficer
            | Role::Commandant
            | Role::AdminOfficer
    )
}

/// VP Academics may only act on accounts that hold teaching roles.
pub fn can_approve_target(actor_role: Role, target_role: Role) -> bool {
    if actor_role == Role::VpAcademics {
        return is_teaching_role(target_role);
    }
    can_manage_users(actor_role)
}

/// Edit authority over a (class, subject) pair requires the user's
/// assignment sets to contain both sides. A form master's single class
/// counts toward the class side.
pub fn can_edit_scores(user: &User, class_name: &str, subject: &str) -> bool {
    let class_match = user.assigned_classes.iter().any(|c| c == class_name)
        || user.assigned_class.as_deref() == Some(class_name);
    let subject_match = user.assigned_subjects.iter().any(|s| s == subject);
    class_match && subject_match
}

/// Classes a user may open in the score grid. Supervisors monitor all
/// classes; teaching staff are restricted to their assignments.
pub fn allowed_classes(user: &User) -> Vec<String> {
    if is_supervisor(user.role) {
        return crate::curriculum::CLASSES
            .iter()
            .map(|c| c.to_string())
            .collect();
    }
    if !user.assigned_classes.is_empty() {
        return crate::curriculum::CLASSES
            .iter()
            .filter(|c| user.assigned_classes.iter().any(|a| a == *c))
            .map(|c| c.to_string())
            .collect();
    }
    if user.role == Role::FormMaster {
        if let Some(class) = &user.assigned_class {
            return vec![class.clone()];
        }
    }
    Vec::new()
}
