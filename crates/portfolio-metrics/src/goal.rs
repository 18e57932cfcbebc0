use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Assumed compounding daily percentage gain per risk level 1-10, plus
/// the stretch rate one level beyond.
const DAILY_PCT_BY_LEVEL: [f64; 11] = [
    0.02, 0.08, 0.16, 0.22, 0.30, 0.35, 0.45, 0.60, 0.72, 0.80, 0.97,
];

/// Trading days assumed for a stretch-goal horizon.
const STRETCH_HORIZON_DAYS: i64 = 252;

/// Cushion applied when a mechanical projection overshoots the user's
/// own goal: aim for 97% of the outstanding gap instead.
const OVERSHOOT_CAP: f64 = 0.97;

fn daily_pct(level: u8) -> f64 {
    let idx = usize::from(level.clamp(1, 11)) - 1;
    DAILY_PCT_BY_LEVEL[idx]
}

/// What to do about the goal given where the portfolio stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GoalSuggestion {
    /// Behind pace: keep the amount, move the date out (or settle for a
    /// smaller amount by the original date).
    Extend {
        extended_date: NaiveDate,
        reduced_goal: f64,
    },
    /// At pace or finished: raise the bar.
    Stretch {
        new_goal: f64,
        new_date: NaiveDate,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAssessment {
    /// current / goal, capped at 1.
    pub progress: f64,
    pub days_remaining: i64,
    /// Daily percentage gain needed to close the gap in time; None once
    /// the goal date has passed.
    pub required_daily_pct: Option<f64>,
    /// What the user's risk level is assumed to earn per day.
    pub assumed_daily_pct: f64,
    /// Days the assumed rate needs to reach the goal from here.
    pub estimated_days_required: f64,
    pub on_track: bool,
    pub suggestion: GoalSuggestion,
}

/// Project a portfolio goal under the risk level's assumed daily rate.
///
/// Returns None when there is nothing to project: a non-positive
/// current value or goal.
pub fn assess_goal(
    current_value: f64,
    goal: f64,
    goal_date: NaiveDate,
    risk_level: u8,
    today: NaiveDate,
) -> Option<GoalAssessment> {
    if current_value <= 0.0 || goal <= 0.0 {
        return None;
    }

    let level = risk_level.clamp(1, 10);
    let assumed_daily_pct = daily_pct(level);
    let stretch_daily_pct = daily_pct(level + 1);

    let days_remaining = (goal_date - today).num_days();
    let progress = (current_value / goal).min(1.0);

    let required_daily_pct = if days_remaining > 0 {
        let pct_increase_needed = 100.0 * (goal - current_value) / current_value;
        Some(pct_increase_needed / days_remaining as f64)
    } else {
        None
    };

    let estimated_days_required = if goal > current_value {
        (goal / current_value).ln() / (1.0 + assumed_daily_pct / 100.0).ln()
    } else {
        0.0
    };

    let stretch_goal =
        (current_value * (1.0 + stretch_daily_pct / 100.0).powi(STRETCH_HORIZON_DAYS as i32))
            .round();
    let stretch_date = today + Duration::days(STRETCH_HORIZON_DAYS);

    let behind = match required_daily_pct {
        Some(required) => days_remaining > 1 && progress < 0.95 && required > assumed_daily_pct,
        // Out of time without being done counts as behind only for the
        // messaging; the suggestion is a fresh stretch goal either way.
        None => false,
    };

    let suggestion = if behind {
        let overshoot_days = (estimated_days_required - days_remaining as f64).ceil() as i64;
        let extended_date = goal_date + Duration::days(overshoot_days + 30);

        let mut reduced_goal = (current_value
            * (1.0 + assumed_daily_pct / 100.0).powi(days_remaining as i32))
        .round();
        if reduced_goal >= goal {
            reduced_goal = (current_value + (goal - current_value) * OVERSHOOT_CAP).round();
        }

        GoalSuggestion::Extend {
            extended_date,
            reduced_goal,
        }
    } else {
        GoalSuggestion::Stretch {
            new_goal: stretch_goal,
            new_date: stretch_date,
        }
    };

    Some(GoalAssessment {
        progress,
        days_remaining,
        required_daily_pct,
        assumed_daily_pct,
        estimated_days_required,
        on_track: !behind,
        suggestion,
    })
}
