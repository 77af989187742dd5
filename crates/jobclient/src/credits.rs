use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reply of the credits pre-flight for one operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditsCheck {
    #[serde(default)]
    pub ok: bool,
    pub can_proceed: bool,
    pub credits_needed: u32,
    pub credits_remaining: u32,
    #[serde(default)]
    pub daily_limit_reached: bool,
    pub reason: Option<String>,
}

impl CreditsCheck {
    /// Human readable reason for a refusal.
    pub fn refusal(&self) -> String {
        if let Some(reason) = self.reason.as_deref().filter(|r| !r.trim().is_empty()) {
            return reason.to_string();
        }
        if self.daily_limit_reached {
            return "daily generation limit reached".to_string();
        }
        format!(
            "{} credits needed, {} remaining",
            self.credits_needed, self.credits_remaining
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionStatus {
    #[serde(default)]
    pub ok: bool,
    pub is_active: bool,
    /// weekly | monthly | yearly
    pub plan_type: Option<String>,
    pub credits_remaining: u32,
    pub daily_credits_used: u32,
    pub daily_limit: u32,
    pub can_generate_avatar_batch: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at <= now,
            None => !self.is_active,
        }
    }
}
