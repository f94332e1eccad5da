use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const DESCRIPTION_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone_number: String,
    pub phone_verified: bool,
    pub description: String,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn public_name(&self) -> String {
        public_name(&self.first_name, &self.last_name)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for a new account; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: String,
    pub phone_verified: bool,
}

/// "Joe B" style name shown to other users.
pub fn public_name(first_name: &str, last_name: &str) -> String {
    match last_name.chars().next() {
        Some(initial) => format!("{first_name} {initial}"),
        None => first_name.to_string(),
    }
}

/// Keeps only the digits of a submitted phone number.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: 1,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: "a@b.c".to_string(),
            password_hash: String::new(),
            phone_number: "1".to_string(),
            phone_verified: true,
            description: String::new(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_public_name_uses_last_initial() {
        assert_eq!(user("Joe", "Bastianich").public_name(), "Joe B");
        assert_eq!(user("Cher", "").public_name(), "Cher");
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(123) 456-7890"), "1234567890");
        assert_eq!(normalize_phone(" +1 555 "), "1555");
        assert_eq!(normalize_phone("abc"), "");
    }
}
