//! crates/prospectflow_core/src/subscription.rs
//!
//! Resolves a stored subscription row into the tier, usage limits and grace-period
//! view the rest of the application renders. Everything here is a pure function of
//! its inputs; fetching and writing the row is the caller's business.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;
use tracing::warn;

use crate::domain::{AvailablePlan, SubscriptionRecord, SubscriptionStatus, SubscriptionTier};

/// Days after premium expiry during which the user is warned before being treated as free.
pub const GRACE_PERIOD_DAYS: i64 = 7;

//=========================================================================================
// Plan Limits
//=========================================================================================

/// Countable resources a plan caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Companies,
    Contacts,
    JobOpenings,
}

/// Per-resource caps. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub companies: Option<u32>,
    pub contacts: Option<u32>,
    pub job_openings: Option<u32>,
}

pub const FREE_LIMITS: PlanLimits = PlanLimits {
    companies: Some(30),
    contacts: Some(30),
    job_openings: Some(30),
};

pub const PREMIUM_LIMITS: PlanLimits = PlanLimits {
    companies: Some(100),
    contacts: Some(100),
    job_openings: Some(100),
};

impl PlanLimits {
    pub const UNBOUNDED: PlanLimits = PlanLimits {
        companies: None,
        contacts: None,
        job_openings: None,
    };

    pub fn for_tier(tier: SubscriptionTier, is_privileged: bool) -> Self {
        if is_privileged {
            return Self::UNBOUNDED;
        }
        match tier {
            SubscriptionTier::Free => FREE_LIMITS,
            SubscriptionTier::Premium => PREMIUM_LIMITS,
        }
    }

    pub fn cap(&self, kind: LimitKind) -> Option<u32> {
        match kind {
            LimitKind::Companies => self.companies,
            LimitKind::Contacts => self.contacts,
            LimitKind::JobOpenings => self.job_openings,
        }
    }

    /// Whether one more entry of `kind` may be created on top of `current`.
    pub fn allows(&self, kind: LimitKind, current: u32) -> bool {
        self.cap(kind).map_or(true, |max| current < max)
    }

    /// Entries of `kind` still available. `None` when unbounded.
    pub fn remaining(&self, kind: LimitKind, current: u32) -> Option<u32> {
        self.cap(kind).map(|max| max.saturating_sub(current))
    }
}

//=========================================================================================
// Privileged Users
//=========================================================================================

/// An allow-list of email addresses exempt from usage limits. Matching ignores case.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeList {
    emails: HashSet<String>,
}

impl PrivilegeList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    pub fn is_privileged(&self, email: Option<&str>) -> bool {
        email
            .map(|e| self.emails.contains(&e.trim().to_lowercase()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

//=========================================================================================
// Resolution
//=========================================================================================

/// The derived subscription view handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubscription {
    /// The stored tier while the row is active. Drives the premium badge even after expiry.
    pub actual_tier: SubscriptionTier,
    pub effective_tier_for_limits: SubscriptionTier,
    pub limits: PlanLimits,
    pub in_grace_period: bool,
    /// Present only while `in_grace_period` is true.
    pub days_left_in_grace_period: Option<i64>,
    pub is_privileged: bool,
}

impl ResolvedSubscription {
    fn free(is_privileged: bool) -> Self {
        Self {
            actual_tier: SubscriptionTier::Free,
            effective_tier_for_limits: SubscriptionTier::Free,
            limits: PlanLimits::for_tier(SubscriptionTier::Free, is_privileged),
            in_grace_period: false,
            days_left_in_grace_period: None,
            is_privileged,
        }
    }
}

/// Resolves a subscription row against the current instant.
///
/// Comparisons are made on UTC calendar days. A premium plan stays effective while its
/// expiry day lies after today. Once it does not, the user is on free limits, and is
/// in grace through the seventh day after the expiry day inclusive.
pub fn resolve(
    record: Option<&SubscriptionRecord>,
    now: DateTime<Utc>,
    is_privileged: bool,
) -> ResolvedSubscription {
    let record = match record {
        Some(r) if r.status == SubscriptionStatus::Active => r,
        _ => return ResolvedSubscription::free(is_privileged),
    };

    if record.tier != SubscriptionTier::Premium {
        return ResolvedSubscription::free(is_privileged);
    }

    let today = now.date_naive();
    let (effective, grace_days_left) = match record.plan_expiry_date {
        None => (SubscriptionTier::Premium, None),
        Some(expiry) if expiry.date_naive() > today => (SubscriptionTier::Premium, None),
        Some(expiry) => {
            let grace_end = expiry.date_naive() + Duration::days(GRACE_PERIOD_DAYS);
            let days_left = (grace_end - today).num_days();
            let grace = (days_left >= 0).then_some(days_left.max(0));
            (SubscriptionTier::Free, grace)
        }
    };

    ResolvedSubscription {
        actual_tier: SubscriptionTier::Premium,
        effective_tier_for_limits: effective,
        limits: PlanLimits::for_tier(effective, is_privileged),
        in_grace_period: grace_days_left.is_some(),
        days_left_in_grace_period: grace_days_left,
        is_privileged,
    }
}

/// Parses a stored plan date. Malformed input is logged and read as absent.
///
/// Accepts RFC 3339, PostgreSQL's text rendering of `timestamptz`, and bare dates.
pub fn parse_plan_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
    }
    warn!("Ignoring malformed plan date '{}'", raw);
    None
}

//=========================================================================================
// Renewal Window
//=========================================================================================

/// Start and expiry written to the store once a plan is chosen (and paid for).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalWindow {
    pub start: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

/// Computes the new plan window.
///
/// Buying premium while an unexpired premium plan is in effect extends the existing
/// expiry and keeps the original start. Every other purchase starts now.
pub fn renewal_window(
    plan: &AvailablePlan,
    current: Option<&SubscriptionRecord>,
    resolved: &ResolvedSubscription,
    now: DateTime<Utc>,
) -> RenewalWindow {
    let months = Months::new(plan.duration_months);

    if plan.tier == SubscriptionTier::Premium
        && resolved.effective_tier_for_limits == SubscriptionTier::Premium
    {
        if let Some((start, expiry)) = current.and_then(|c| c.plan_start_date.zip(c.plan_expiry_date))
        {
            if expiry > now {
                if let Some(extended) = expiry.checked_add_months(months) {
                    return RenewalWindow {
                        start,
                        expiry: extended,
                    };
                }
            }
        }
    }

    RenewalWindow {
        start: now,
        expiry: now.checked_add_months(months).unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::find_plan;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn record(
        tier: SubscriptionTier,
        status: SubscriptionStatus,
        expiry: Option<DateTime<Utc>>,
    ) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: Uuid::new_v4(),
            tier,
            status,
            plan_start_date: expiry.map(|e| e - Duration::days(30)),
            plan_expiry_date: expiry,
            payment_order_id: None,
            payment_id: None,
        }
    }

    #[test]
    fn missing_record_resolves_to_free_limits() {
        let resolved = resolve(None, at(2024, 1, 15), false);
        assert_eq!(resolved.actual_tier, SubscriptionTier::Free);
        assert_eq!(resolved.effective_tier_for_limits, SubscriptionTier::Free);
        assert_eq!(resolved.limits, FREE_LIMITS);
        assert_eq!(resolved.limits.companies, Some(30));
        assert!(!resolved.in_grace_period);
        assert_eq!(resolved.days_left_in_grace_period, None);
    }

    #[test]
    fn inactive_records_are_never_in_grace() {
        let now = at(2024, 1, 15);
        for status in [SubscriptionStatus::Cancelled, SubscriptionStatus::Expired] {
            for expiry in [None, Some(at(2024, 1, 12)), Some(at(2025, 1, 1))] {
                let r = record(SubscriptionTier::Premium, status, expiry);
                let resolved = resolve(Some(&r), now, false);
                assert_eq!(resolved.actual_tier, SubscriptionTier::Free);
                assert_eq!(resolved.effective_tier_for_limits, SubscriptionTier::Free);
                assert!(!resolved.in_grace_period);
            }
        }
    }

    #[test]
    fn unexpired_premium_gets_premium_limits() {
        let r = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(at(2024, 2, 1)),
        );
        let resolved = resolve(Some(&r), at(2024, 1, 15), false);
        assert_eq!(resolved.effective_tier_for_limits, SubscriptionTier::Premium);
        assert_eq!(resolved.limits, PREMIUM_LIMITS);
        assert!(!resolved.in_grace_period);
    }

    #[test]
    fn premium_without_expiry_stays_premium() {
        let r = record(SubscriptionTier::Premium, SubscriptionStatus::Active, None);
        let resolved = resolve(Some(&r), at(2024, 1, 15), false);
        assert_eq!(resolved.effective_tier_for_limits, SubscriptionTier::Premium);
    }

    #[test]
    fn expired_premium_five_days_ago_has_two_days_of_grace() {
        let r = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()),
        );
        let resolved = resolve(Some(&r), at(2024, 1, 15), false);
        assert_eq!(resolved.actual_tier, SubscriptionTier::Premium);
        assert_eq!(resolved.effective_tier_for_limits, SubscriptionTier::Free);
        assert_eq!(resolved.limits, FREE_LIMITS);
        assert!(resolved.in_grace_period);
        assert_eq!(resolved.days_left_in_grace_period, Some(2));
    }

    #[test]
    fn seventh_day_after_expiry_is_last_day_of_grace() {
        let now = at(2024, 1, 15);
        let r = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(now - Duration::days(7)),
        );
        let resolved = resolve(Some(&r), now, false);
        assert!(resolved.in_grace_period);
        assert_eq!(resolved.days_left_in_grace_period, Some(0));

        let r = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(now - Duration::days(8)),
        );
        let resolved = resolve(Some(&r), now, false);
        assert!(!resolved.in_grace_period);
        assert_eq!(resolved.days_left_in_grace_period, None);
        assert_eq!(resolved.actual_tier, SubscriptionTier::Premium);
        assert_eq!(resolved.effective_tier_for_limits, SubscriptionTier::Free);
    }

    #[test]
    fn expiry_earlier_today_is_already_expired() {
        let now = at(2024, 1, 15);
        let r = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap()),
        );
        let resolved = resolve(Some(&r), now, false);
        assert_eq!(resolved.effective_tier_for_limits, SubscriptionTier::Free);
        assert_eq!(resolved.days_left_in_grace_period, Some(7));
    }

    #[test]
    fn privileged_users_are_unbounded_on_every_tier() {
        let now = at(2024, 1, 15);
        let premium = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(at(2024, 6, 1)),
        );
        let free = record(SubscriptionTier::Free, SubscriptionStatus::Active, None);
        for r in [None, Some(&premium), Some(&free)] {
            let resolved = resolve(r, now, true);
            assert_eq!(resolved.limits, PlanLimits::UNBOUNDED);
            assert!(resolved.is_privileged);
        }
    }

    #[test]
    fn limits_answer_capacity_questions() {
        assert!(FREE_LIMITS.allows(LimitKind::Contacts, 29));
        assert!(!FREE_LIMITS.allows(LimitKind::Contacts, 30));
        assert_eq!(FREE_LIMITS.remaining(LimitKind::JobOpenings, 42), Some(0));
        assert_eq!(PREMIUM_LIMITS.remaining(LimitKind::Companies, 40), Some(60));
        assert!(PlanLimits::UNBOUNDED.allows(LimitKind::Companies, u32::MAX));
        assert_eq!(PlanLimits::UNBOUNDED.remaining(LimitKind::Companies, 5), None);
    }

    #[test]
    fn privilege_list_ignores_case_and_blanks() {
        let list = PrivilegeList::new(["Owner@Example.com ", "", "team@example.com"]);
        assert_eq!(list.len(), 2);
        assert!(list.is_privileged(Some("owner@example.com")));
        assert!(!list.is_privileged(Some("someone@example.com")));
        assert!(!list.is_privileged(None));
    }

    #[test]
    fn plan_dates_parse_leniently() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert_eq!(parse_plan_date("2024-01-10T00:00:00Z"), Some(expected));
        assert_eq!(parse_plan_date("2024-01-10T05:30:00+05:30"), Some(expected));
        assert_eq!(parse_plan_date("2024-01-10 00:00:00+00"), Some(expected));
        assert_eq!(parse_plan_date("2024-01-10"), Some(expected));
        assert_eq!(parse_plan_date("not a date"), None);
        assert_eq!(parse_plan_date(""), None);
    }

    #[test]
    fn extending_active_premium_keeps_start_and_pushes_expiry() {
        let now = at(2024, 1, 15);
        let current = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(at(2024, 2, 10)),
        );
        let resolved = resolve(Some(&current), now, false);
        let plan = find_plan("premium-6m").unwrap();

        let window = renewal_window(plan, Some(&current), &resolved, now);
        assert_eq!(window.start, current.plan_start_date.unwrap());
        assert_eq!(window.expiry, at(2024, 8, 10));
    }

    #[test]
    fn lapsed_premium_restarts_from_now() {
        let now = at(2024, 1, 15);
        let current = record(
            SubscriptionTier::Premium,
            SubscriptionStatus::Active,
            Some(at(2024, 1, 10)),
        );
        let resolved = resolve(Some(&current), now, false);
        let plan = find_plan("premium-1m").unwrap();

        let window = renewal_window(plan, Some(&current), &resolved, now);
        assert_eq!(window.start, now);
        assert_eq!(window.expiry, at(2024, 2, 15));
    }
}
