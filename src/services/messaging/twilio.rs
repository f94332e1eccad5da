use anyhow::Context;
use async_trait::async_trait;

use super::MessagingProvider;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioSmsProvider {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

impl TwilioSmsProvider {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            client: reqwest::Client::new(),
        }
    }
}

/// Numbers are stored as bare digits; ten digits are taken as North American.
fn to_e164(phone: &str) -> String {
    if phone.starts_with('+') {
        phone.to_string()
    } else if phone.len() == 10 {
        format!("+1{phone}")
    } else {
        format!("+{phone}")
    }
}

#[async_trait]
impl MessagingProvider for TwilioSmsProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!("{TWILIO_API_BASE}/Accounts/{}/Messages.json", self.account_sid);

        let to = to_e164(to);

        self.client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .context("failed to send Twilio SMS")?
            .error_for_status()
            .context("Twilio API returned error")?;

        tracing::debug!(to = %to, "sent SMS");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_e164() {
        assert_eq!(to_e164("4155550100"), "+14155550100");
        assert_eq!(to_e164("33147737654"), "+33147737654");
        assert_eq!(to_e164("+33147737654"), "+33147737654");
    }
}
