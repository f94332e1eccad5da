use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub phone_number: String,
    pub code: String,
    pub verified: bool,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl VerificationCode {
    pub fn is_expired(&self, now: &NaiveDateTime) -> bool {
        self.expires_at <= *now
    }
}
