// src/utils/policy.rs

use crate::{
    error::AppError,
    models::user::{CurrentUser, Role},
};

/// What is being accessed, with just enough ownership data to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    ExamRoom { owner_id: i64 },
    Attempt { student_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Grade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

/// Single ownership/role rule table for every protected operation.
///
/// An exam room (with its questions and options) belongs to its creator; admins
/// may do anything with it. Attempts belong to the student who started them:
/// only that student reads or writes one, and grading is admin-only.
pub fn decide(user: &CurrentUser, resource: Resource, action: Action) -> Decision {
    let is_admin = user.role == Role::Admin;

    let allowed = match resource {
        Resource::ExamRoom { owner_id } => is_admin || user.id == owner_id,
        Resource::Attempt { student_id } => match action {
            Action::Read | Action::Write => user.id == student_id,
            Action::Grade => is_admin,
        },
    };

    if allowed { Decision::Allowed } else { Decision::Denied }
}

/// `decide`, mapped onto `AppError::AccessDenied`.
pub fn authorize(user: &CurrentUser, resource: Resource, action: Action) -> Result<(), AppError> {
    match decide(user, resource, action) {
        Decision::Allowed => Ok(()),
        Decision::Denied => {
            tracing::debug!(user_id = user.id, ?resource, ?action, "access denied");
            Err(AppError::AccessDenied("Access denied".to_string()))
        }
    }
}
