use rand::Rng;
use serde::Serialize;

pub const XP_PER_MINUTE: f64 = 5.0;
pub const XP_PER_LEVEL: i32 = 1000;

const LONG_SESSION_MINUTES: f64 = 30.0;
const LONG_SESSION_BONUS: f64 = 25.0;
const HOUR_SESSION_MINUTES: f64 = 60.0;
const HOUR_SESSION_BONUS: f64 = 50.0;

/// Multiplier for an activity type. Unknown types score at 1.0.
pub fn activity_multiplier(activity_type: &str) -> f64 {
    match activity_type {
        "Reading" => 1.2,
        "Listening" => 1.1,
        "Grammar" => 1.5,
        _ => 1.0,
    }
}

/// Deterministic part of the XP formula.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpBreakdown {
    pub base: f64,
    pub multiplier: f64,
    pub multiplied: f64,
    pub session_bonus: f64,
}

impl XpBreakdown {
    pub fn subtotal(&self) -> f64 {
        self.multiplied + self.session_bonus
    }
}

pub fn xp_breakdown(activity_type: &str, duration_minutes: f64) -> XpBreakdown {
    let base = duration_minutes * XP_PER_MINUTE;
    let multiplier = activity_multiplier(activity_type);

    // The two session bonuses stack.
    let mut session_bonus = 0.0;
    if duration_minutes >= LONG_SESSION_MINUTES {
        session_bonus += LONG_SESSION_BONUS;
    }
    if duration_minutes >= HOUR_SESSION_MINUTES {
        session_bonus += HOUR_SESSION_BONUS;
    }

    XpBreakdown {
        base,
        multiplier,
        multiplied: base * multiplier,
        session_bonus,
    }
}

/// XP awarded for a study session, including a uniform random bonus in 1..=10.
pub fn calculate_xp<R: Rng + ?Sized>(activity_type: &str, duration_minutes: f64, rng: &mut R) -> i32 {
    let breakdown = xp_breakdown(activity_type, duration_minutes);
    let random_bonus: i32 = rng.gen_range(1..=10);
    (breakdown.subtotal() + f64::from(random_bonus)).round() as i32
}

pub fn explain_xp(activity_type: &str, duration_minutes: f64) -> String {
    let b = xp_breakdown(activity_type, duration_minutes);

    let mut explanation = format!("Base: {} min × 5 = {} XP\n", duration_minutes, b.base);
    explanation.push_str(&format!(
        "{} bonus: {} × {} = {} XP\n",
        activity_type,
        b.base,
        b.multiplier,
        b.multiplied.round()
    ));
    if duration_minutes >= LONG_SESSION_MINUTES {
        explanation.push_str("30+ min bonus: +25 XP\n");
    }
    if duration_minutes >= HOUR_SESSION_MINUTES {
        explanation.push_str("60+ min bonus: +50 XP\n");
    }
    explanation.push_str("Random bonus: +1-10 XP\n");
    explanation.push_str(&format!("Total: ~{} XP + random bonus", b.subtotal().round()));

    explanation
}

pub fn level_for_xp(xp: i32) -> i32 {
    xp.max(0) / XP_PER_LEVEL + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn grammar_hour_lands_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let xp = calculate_xp("Grammar", 60.0, &mut rng);
            assert!((526..=535).contains(&xp), "got {}", xp);
        }
    }

    #[test]
    fn unknown_type_short_session_lands_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let xp = calculate_xp("Kanji", 10.0, &mut rng);
            assert!((51..=60).contains(&xp), "got {}", xp);
        }
    }

    #[test]
    fn random_bonus_covers_whole_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 10];
        for _ in 0..1000 {
            let xp = calculate_xp("Speaking", 0.0, &mut rng);
            seen[(xp - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn same_seed_same_xp() {
        let a = calculate_xp("Reading", 45.0, &mut StdRng::seed_from_u64(42));
        let b = calculate_xp("Reading", 45.0, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn session_bonuses_are_cumulative() {
        assert_eq!(xp_breakdown("Speaking", 29.0).session_bonus, 0.0);
        assert_eq!(xp_breakdown("Speaking", 30.0).session_bonus, 25.0);
        assert_eq!(xp_breakdown("Speaking", 60.0).session_bonus, 75.0);
    }

    #[test]
    fn reading_half_hour_breakdown() {
        let b = xp_breakdown("Reading", 30.0);
        assert_eq!(b.base, 150.0);
        assert!((b.multiplied - 180.0).abs() < 1e-9);
        assert!((b.subtotal() - 205.0).abs() < 1e-9);
    }

    #[test]
    fn explanation_lists_bonuses() {
        let text = explain_xp("Grammar", 60.0);
        assert!(text.starts_with("Base: 60 min × 5 = 300 XP\n"));
        assert!(text.contains("Grammar bonus: 300 × 1.5 = 450 XP"));
        assert!(text.contains("30+ min bonus: +25 XP"));
        assert!(text.contains("60+ min bonus: +50 XP"));
        assert!(text.ends_with("Total: ~525 XP + random bonus"));

        assert!(!explain_xp("Listening", 10.0).contains("min bonus"));
    }

    #[test]
    fn level_steps_every_thousand() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(999), 1);
        assert_eq!(level_for_xp(1000), 2);
        assert_eq!(level_for_xp(2534), 3);
        assert_eq!(level_for_xp(-5), 1);
    }
}
