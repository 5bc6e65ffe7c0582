use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rusqlite::Connection;

use crate::perm::Role;
use crate::store::{self, StoreError, User};

/// Passwords are stored as salted argon2id strings and verified with the
/// library's constant-time comparison.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::new("hash_failed", e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Credential failures are reported uniformly; only an inactive account with
/// valid credentials learns anything more ("pending approval").
pub fn login(conn: &Connection, email: &str, password: &str) -> Result<User, StoreError> {
    let users = store::users(conn)?;
    let user = users
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email));
    let Some(user) = user else {
        return Err(StoreError::new("invalid_credentials", "Invalid credentials"));
    };
    if !verify_password(password, &user.password_hash) {
        return Err(StoreError::new("invalid_credentials", "Invalid credentials"));
    }
    if !user.is_active {
        return Err(StoreError::new(
            "pending_approval",
            "Account pending approval.",
        ));
    }
    store::set_current_user(conn, &user.id)?;
    Ok(user)
}

/// New accounts start inactive and wait for an approver.
pub fn register(
    conn: &Connection,
    email: &str,
    full_name: &str,
    role: Role,
    password: &str,
) -> Result<User, StoreError> {
    let mut users = store::users(conn)?;
    if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
        return Err(StoreError::new("email_exists", "Email already exists"));
    }

    let user = User {
        id: store::new_id(),
        email: email.to_string(),
        full_name: full_name.to_string(),
        role,
        is_active: false,
        assigned_class: None,
        assigned_classes: Vec::new(),
        assigned_subjects: Vec::new(),
        password_hash: hash_password(password)?,
    };
    users.push(user.clone());
    store::save_users(conn, &users)?;
    Ok(user)
}

/// Always succeeds so the response never confirms account existence. The
/// simulated delivery goes to the log only.
pub fn request_password_reset(conn: &Connection, email: &str) -> Result<(), StoreError> {
    let users = store::users(conn)?;
    if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
        tracing::info!(email, "password reset link issued");
    }
    Ok(())
}

pub fn current_user(conn: &Connection) -> Result<Option<User>, StoreError> {
    let Some(id) = store::current_user_id(conn)? else {
        return Ok(None);
    };
    let users = store::users(conn)?;
    Ok(users.into_iter().find(|u| u.id == id))
}

pub fn logout(conn: &Connection) -> Result<(), StoreError> {
    store::clear_current_user(conn)
}
