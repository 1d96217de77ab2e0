//! Check-in cadence planning.
//!
//! Pure logic, no I/O. CSV timelocks count from the confirmation of the
//! vault UTXO, so the owner resets the clock by spending (or re-funding
//! into a fresh vault output). Given how many confirmations the latest
//! funding has, recommend when to check in next:
//!
//! ```text
//! |------ on_track ------|------ due_now ------|--- beneficiary_path_open
//! 0                 locktime*ratio          locktime
//! ```

use serde::{Deserialize, Serialize};

/// Default fraction of the locktime between check-ins
pub const DEFAULT_CADENCE_RATIO: f64 = 0.5;
pub const MIN_CADENCE_RATIO: f64 = 0.2;
pub const MAX_CADENCE_RATIO: f64 = 0.9;

/// Minutes per block in every human-time approximation
pub const MINUTES_PER_BLOCK: u64 = 10;

/// Where the owner stands relative to the recommended cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    /// No confirmation count is known (unfunded or not yet fetched)
    Unknown,
    OnTrack,
    /// Past the recommended check-in point, beneficiary path still closed
    DueNow,
    /// The timelock has matured; the beneficiary can spend
    BeneficiaryPathOpen,
}

/// A check-in recommendation.
///
/// Block counts are signed: a negative count means the point has already
/// passed by that many blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInPlan {
    pub locktime_blocks: u32,
    pub locktime_approx: String,
    /// Ratio actually used, after clamping
    pub cadence_ratio: f64,
    pub recommended_check_in_every_blocks: u32,
    pub recommended_check_in_every_approx: String,
    pub status: CheckInStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations_since_last_funding: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks_until_recommended_check_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks_until_recommended_check_in_approx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks_until_beneficiary_eligible: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks_until_beneficiary_eligible_approx: Option<String>,
}

impl CheckInPlan {
    /// One line for terminals and logs
    pub fn summary(&self) -> String {
        match (
            self.status,
            &self.blocks_until_recommended_check_in_approx,
            &self.blocks_until_beneficiary_eligible_approx,
        ) {
            (CheckInStatus::Unknown, _, _) => format!(
                "No confirmed funding seen yet. Check in every {} ({} blocks).",
                self.recommended_check_in_every_approx, self.recommended_check_in_every_blocks
            ),
            (CheckInStatus::OnTrack, Some(next), Some(open)) => format!(
                "On track. Next check-in in {}; beneficiary path opens in {}.",
                next, open
            ),
            (CheckInStatus::DueNow, _, Some(open)) => format!(
                "Check in now. The beneficiary path opens in {}.",
                open
            ),
            (CheckInStatus::BeneficiaryPathOpen, _, _) => {
                "The timelock has matured: the beneficiary can spend this vault now.".to_string()
            }
            _ => format!("{:?}", self.status),
        }
    }
}

/// Clamp a cadence ratio into the supported range.
///
/// Non-finite input falls back to [`DEFAULT_CADENCE_RATIO`].
pub fn clamp_cadence_ratio(ratio: f64) -> f64 {
    if !ratio.is_finite() {
        return DEFAULT_CADENCE_RATIO;
    }
    ratio.clamp(MIN_CADENCE_RATIO, MAX_CADENCE_RATIO)
}

/// Plan the next check-in.
///
/// * `locktime_blocks` - the vault's CSV delay
/// * `confirmations` - confirmations of the latest confirmed funding, if known
/// * `cadence_ratio` - fraction of the locktime between check-ins
pub fn plan_check_in(
    locktime_blocks: u32,
    confirmations: Option<u32>,
    cadence_ratio: f64,
) -> CheckInPlan {
    let ratio = clamp_cadence_ratio(cadence_ratio);
    let interval = ((f64::from(locktime_blocks) * ratio).floor() as u32).max(1);

    let mut plan = CheckInPlan {
        locktime_blocks,
        locktime_approx: approx_duration(u64::from(locktime_blocks)),
        cadence_ratio: ratio,
        recommended_check_in_every_blocks: interval,
        recommended_check_in_every_approx: approx_duration(u64::from(interval)),
        status: CheckInStatus::Unknown,
        confirmations_since_last_funding: confirmations,
        blocks_until_recommended_check_in: None,
        blocks_until_recommended_check_in_approx: None,
        blocks_until_beneficiary_eligible: None,
        blocks_until_beneficiary_eligible_approx: None,
    };

    let Some(conf) = confirmations else {
        return plan;
    };

    let until_checkin = i64::from(interval) - i64::from(conf);
    let until_eligible = i64::from(locktime_blocks) - i64::from(conf);

    plan.status = if until_eligible <= 0 {
        CheckInStatus::BeneficiaryPathOpen
    } else if until_checkin <= 0 {
        CheckInStatus::DueNow
    } else {
        CheckInStatus::OnTrack
    };
    plan.blocks_until_recommended_check_in = Some(until_checkin);
    plan.blocks_until_recommended_check_in_approx = Some(approx_signed(until_checkin));
    plan.blocks_until_beneficiary_eligible = Some(until_eligible);
    plan.blocks_until_beneficiary_eligible_approx = Some(approx_signed(until_eligible));
    plan
}

/// Approximate wall-clock time for a block count (10 minutes per block).
pub fn approx_duration(blocks: u64) -> String {
    let minutes = blocks.saturating_mul(MINUTES_PER_BLOCK);
    let hours = minutes as f64 / 60.0;
    let days = hours / 24.0;

    if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 48.0 {
        plural(hours.round() as u64, "hour")
    } else if days < 60.0 {
        plural(days.round() as u64, "day")
    } else if days < 730.0 {
        plural((days / (365.0 / 12.0)).round() as u64, "month")
    } else {
        let years = days / 365.0;
        format!("~{:.1} years", years)
    }
}

/// Like [`approx_duration`], phrasing past points as "ago"
fn approx_signed(blocks: i64) -> String {
    if blocks < 0 {
        format!("{} ago", approx_duration(blocks.unsigned_abs()))
    } else {
        approx_duration(blocks as u64)
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("~1 {}", unit)
    } else {
        format!("~{} {}s", n, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_track_example() {
        let plan = plan_check_in(1000, Some(300), 0.5);
        assert_eq!(plan.recommended_check_in_every_blocks, 500);
        assert_eq!(plan.status, CheckInStatus::OnTrack);
        assert_eq!(plan.blocks_until_recommended_check_in, Some(200));
        assert_eq!(plan.blocks_until_beneficiary_eligible, Some(700));
    }

    #[test]
    fn test_beneficiary_path_open_at_locktime() {
        let plan = plan_check_in(1000, Some(1000), 0.5);
        assert_eq!(plan.status, CheckInStatus::BeneficiaryPathOpen);
        assert_eq!(plan.blocks_until_beneficiary_eligible, Some(0));
    }

    #[test]
    fn test_due_now() {
        let plan = plan_check_in(1000, Some(500), 0.5);
        assert_eq!(plan.status, CheckInStatus::DueNow);
        assert_eq!(plan.blocks_until_recommended_check_in, Some(0));

        let plan = plan_check_in(1000, Some(800), 0.5);
        assert_eq!(plan.status, CheckInStatus::DueNow);
        assert_eq!(plan.blocks_until_recommended_check_in, Some(-300));
        assert!(plan
            .blocks_until_recommended_check_in_approx
            .unwrap()
            .ends_with("ago"));
    }

    #[test]
    fn test_unknown_confirmations() {
        let plan = plan_check_in(1000, None, 0.5);
        assert_eq!(plan.status, CheckInStatus::Unknown);
        assert_eq!(plan.recommended_check_in_every_blocks, 500);
        assert!(plan.blocks_until_recommended_check_in.is_none());
        assert!(plan.blocks_until_beneficiary_eligible.is_none());
    }

    #[test]
    fn test_ratio_clamped() {
        assert_eq!(plan_check_in(1000, None, 0.01).cadence_ratio, 0.2);
        assert_eq!(plan_check_in(1000, None, 5.0).cadence_ratio, 0.9);
        assert_eq!(plan_check_in(1000, None, f64::NAN).cadence_ratio, 0.5);
        assert_eq!(plan_check_in(1000, None, f64::INFINITY).cadence_ratio, 0.5);
    }

    #[test]
    fn test_interval_at_least_one_block() {
        let plan = plan_check_in(1, Some(0), 0.2);
        assert_eq!(plan.recommended_check_in_every_blocks, 1);
        assert_eq!(plan.status, CheckInStatus::OnTrack);
    }

    #[test]
    fn test_approx_duration() {
        assert_eq!(approx_duration(1), "~10 minutes");
        assert_eq!(approx_duration(6), "~1 hour");
        assert_eq!(approx_duration(144), "~24 hours");
        assert_eq!(approx_duration(1008), "~7 days");
        assert_eq!(approx_duration(26_280), "~6 months");
        assert_eq!(approx_duration(52_560), "~12 months");
        assert_eq!(approx_duration(157_680), "~3.0 years");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(plan_check_in(1000, Some(300), 0.5)).unwrap();
        assert_eq!(json["recommendedCheckInEveryBlocks"], 500);
        assert_eq!(json["status"], "on_track");
        assert_eq!(json["blocksUntilBeneficiaryEligible"], 700);
    }
}
