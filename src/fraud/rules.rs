//! Fraud rule evaluation — pure logic, no I/O.
//!
//! Three rules run against the sliding window of recent events for a wallet;
//! each independently decides whether to raise an alert. Dedup by
//! `(transaction_id, rule_id)` happens at the store layer, not here — this
//! module only decides "does the condition hold".

use chrono::Duration;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::store::RecentEvent;

/// Severity of a fraud alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Risk score delta an alert of this severity contributes.
    pub fn score_delta(self) -> i32 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 15,
            Severity::High => 30,
            Severity::Critical => 50,
        }
    }
}

/// Risk level bucket derived from a wallet's accumulated score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Bucket boundaries: `[0,25]`=LOW, `(25,50]`=MEDIUM, `(50,75]`=HIGH,
    /// `(75,100]`=CRITICAL.
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s <= 25 => RiskLevel::Low,
            s if s <= 50 => RiskLevel::Medium,
            s if s <= 75 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// The velocity/large-amount rules evaluate against.
pub fn large_transaction_threshold() -> Decimal {
    Decimal::new(10000, 0)
}

pub fn high_velocity_window() -> Duration {
    Duration::minutes(10)
}

pub const HIGH_VELOCITY_COUNT: usize = 5;

pub fn rapid_withdrawal_window() -> Duration {
    Duration::minutes(5)
}

/// One rule firing, ready to be persisted as an alert and folded into the
/// wallet's risk score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub rule_id: &'static str,
    pub rule_name: &'static str,
    pub severity: Severity,
}

/// The event currently under evaluation, shaped for rule matching.
pub struct Candidate<'a> {
    pub wallet_id: Uuid,
    pub event_type: &'a str,
    pub amount: Decimal,
    pub transaction_id: Uuid,
}

/// `large-transaction`: `amount > 10000`.
fn large_transaction(candidate: &Candidate) -> Option<RuleHit> {
    (candidate.amount > large_transaction_threshold()).then_some(RuleHit {
        rule_id: "large-transaction",
        rule_name: "Large Transaction",
        severity: Severity::High,
    })
}

/// `high-velocity`: more than 5 events for the wallet in the last 10 minutes,
/// counting the candidate event itself.
fn high_velocity(_candidate: &Candidate, recent: &[RecentEvent]) -> Option<RuleHit> {
    (recent.len() > HIGH_VELOCITY_COUNT).then_some(RuleHit {
        rule_id: "high-velocity",
        rule_name: "High Velocity",
        severity: Severity::Medium,
    })
}

/// `rapid-withdrawal`: the candidate is a withdrawal and a deposit for the
/// same wallet occurred within the last 5 minutes.
fn rapid_withdrawal(candidate: &Candidate, recent: &[RecentEvent]) -> Option<RuleHit> {
    if candidate.event_type != "MoneyWithdrawn" {
        return None;
    }
    let cutoff = chrono::Utc::now() - rapid_withdrawal_window();
    let had_recent_deposit = recent
        .iter()
        .any(|e| e.event_type == "MoneyDeposited" && e.created_at >= cutoff);
    had_recent_deposit.then_some(RuleHit {
        rule_id: "rapid-withdrawal",
        rule_name: "Rapid Withdrawal",
        severity: Severity::High,
    })
}

/// Evaluate all three rules against `candidate`, given its wallet's
/// already-queried sliding window (`recent`, which the caller is expected to
/// have fetched over the widest window any rule needs —
/// [`HIGH_VELOCITY_WINDOW`] here, which covers [`RAPID_WITHDRAWAL_WINDOW`] too).
pub fn evaluate(candidate: &Candidate, recent: &[RecentEvent]) -> Vec<RuleHit> {
    [
        large_transaction(candidate),
        high_velocity(candidate, recent),
        rapid_withdrawal(candidate, recent),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candidate(event_type: &str, amount: Decimal) -> Candidate {
        Candidate {
            wallet_id: Uuid::new_v4(),
            event_type,
            amount,
            transaction_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_large_transaction_fires_above_threshold() {
        let c = candidate("MoneyDeposited", Decimal::new(1000001, 2));
        assert!(large_transaction(&c).is_some());
    }

    #[test]
    fn test_large_transaction_does_not_fire_at_threshold() {
        let c = candidate("MoneyDeposited", large_transaction_threshold());
        assert!(large_transaction(&c).is_none());
    }

    #[test]
    fn test_high_velocity_fires_past_six_events() {
        let c = candidate("MoneyDeposited", Decimal::ONE);
        let recent: Vec<RecentEvent> = (0..6)
            .map(|_| RecentEvent {
                wallet_id: c.wallet_id,
                event_type: "MoneyDeposited".to_string(),
                amount: Decimal::ONE,
                transaction_id: Uuid::new_v4(),
                created_at: Utc::now(),
            })
            .collect();
        assert!(high_velocity(&c, &recent).is_some());
    }

    #[test]
    fn test_high_velocity_does_not_fire_at_five() {
        let c = candidate("MoneyDeposited", Decimal::ONE);
        let recent: Vec<RecentEvent> = (0..5)
            .map(|_| RecentEvent {
                wallet_id: c.wallet_id,
                event_type: "MoneyDeposited".to_string(),
                amount: Decimal::ONE,
                transaction_id: Uuid::new_v4(),
                created_at: Utc::now(),
            })
            .collect();
        assert!(high_velocity(&c, &recent).is_none());
    }

    #[test]
    fn test_rapid_withdrawal_requires_prior_deposit() {
        let c = candidate("MoneyWithdrawn", Decimal::new(100, 0));
        let recent = vec![RecentEvent {
            wallet_id: c.wallet_id,
            event_type: "MoneyDeposited".to_string(),
            amount: Decimal::new(100, 0),
            transaction_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }];
        assert!(rapid_withdrawal(&c, &recent).is_some());
    }

    #[test]
    fn test_rapid_withdrawal_ignores_non_withdrawal_events() {
        let c = candidate("MoneyDeposited", Decimal::new(100, 0));
        let recent = vec![RecentEvent {
            wallet_id: c.wallet_id,
            event_type: "MoneyDeposited".to_string(),
            amount: Decimal::new(100, 0),
            transaction_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }];
        assert!(rapid_withdrawal(&c, &recent).is_none());
    }

    #[test]
    fn test_risk_level_buckets() {
        assert_eq!(RiskLevel::from_score(0).as_str(), "LOW");
        assert_eq!(RiskLevel::from_score(25).as_str(), "LOW");
        assert_eq!(RiskLevel::from_score(26).as_str(), "MEDIUM");
        assert_eq!(RiskLevel::from_score(50).as_str(), "MEDIUM");
        assert_eq!(RiskLevel::from_score(51).as_str(), "HIGH");
        assert_eq!(RiskLevel::from_score(75).as_str(), "HIGH");
        assert_eq!(RiskLevel::from_score(76).as_str(), "CRITICAL");
        assert_eq!(RiskLevel::from_score(100).as_str(), "CRITICAL");
    }

    #[test]
    fn test_evaluate_can_fire_multiple_rules_at_once() {
        let c = candidate("MoneyWithdrawn", Decimal::new(15000, 0));
        let mut recent: Vec<RecentEvent> = (0..6)
            .map(|_| RecentEvent {
                wallet_id: c.wallet_id,
                event_type: "MoneyDeposited".to_string(),
                amount: Decimal::new(100, 0),
                transaction_id: Uuid::new_v4(),
                created_at: Utc::now(),
            })
            .collect();
        recent.push(RecentEvent {
            wallet_id: c.wallet_id,
            event_type: "MoneyDeposited".to_string(),
            amount: Decimal::new(100, 0),
            transaction_id: Uuid::new_v4(),
            created_at: Utc::now(),
        });
        let hits = evaluate(&c, &recent);
        let ids: Vec<_> = hits.iter().map(|h| h.rule_id).collect();
        assert!(ids.contains(&"large-transaction"));
        assert!(ids.contains(&"high-velocity"));
        assert!(ids.contains(&"rapid-withdrawal"));
    }
}
