//! Scoped metrics: the pure pipeline from raw collections to dashboard KPIs.
//!
//! Scope Filter → Period Filter → Target Allocator + Aggregator. Everything
//! here is synchronous and recomputed in full on every call.

pub mod accounts;
pub mod aggregate;
pub mod filters;

use crate::models::{Dataset, Period, Representative, Scope};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

pub use self::accounts::{AccountSort, account_list};
pub use self::aggregate::{GradeSlice, StageColumn, StatusTotals};
pub use self::filters::{filter_by_scope, today_in};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub scope_label: String,
    pub period: &'static str,
    pub reference_date: NaiveDate,
    pub target: u64,
    pub totals: StatusTotals,
    pub achievement: f64,
    pub deal_count: usize,
    pub account_count: usize,
    pub monthly: [StatusTotals; 12],
    pub grades: Vec<GradeSlice>,
    pub board: Vec<StageColumn>,
}

impl DashboardReport {
    pub fn build(data: &Dataset, scope: &Scope, period: Period, today: NaiveDate) -> Self {
        let accounts = filter_by_scope(&data.accounts, scope);
        let scoped_deals = filter_by_scope(&data.deals, scope);
        let period_deals: Vec<_> = scoped_deals
            .iter()
            .copied()
            .filter(|d| filters::date_in_period(d.expected_close_date, period, today))
            .collect();

        let target = aggregate::allocate_target(accounts.iter().copied(), period);
        let totals = aggregate::status_totals(period_deals.iter().copied());

        Self {
            scope_label: scope.label().to_string(),
            period: period.as_str(),
            reference_date: today,
            target,
            totals,
            achievement: aggregate::achievement_ratio(totals.performance, target),
            deal_count: period_deals.len(),
            account_count: accounts.len(),
            monthly: aggregate::monthly_series(scoped_deals.iter().copied(), today.year()),
            grades: aggregate::grade_distribution(accounts.iter().copied()),
            board: aggregate::pipeline_board(scoped_deals.iter().copied()),
        }
    }

    /// Plain-text KPI block, used when no narrative is available.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Scope: {} ({}, as of {})", self.scope_label, self.period, self.reference_date),
            format!("Target: {}", crate::utils::fmt_amount(self.target)),
            format!(
                "Sales: {} ({:.1}% of target)",
                crate::utils::fmt_amount(self.totals.performance),
                self.achievement * 100.0
            ),
            format!("Confirmed: {}", crate::utils::fmt_amount(self.totals.confirmed)),
            format!("Expected: {}", crate::utils::fmt_amount(self.totals.expected)),
            format!("Undecided: {}", crate::utils::fmt_amount(self.totals.undecided)),
            format!("Deals in window: {}", self.deal_count),
        ]
    }
}

/// Sorted, de-duplicated team names.
pub fn teams(reps: &[Representative]) -> Vec<String> {
    reps.iter()
        .map(|r| r.team.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Default individual selection: the first representative.
pub fn default_individual(reps: &[Representative]) -> Scope {
    reps.first().map(Scope::representative).unwrap_or(Scope::individual(""))
}

/// Default team selection: the first team in sorted order.
pub fn default_team(reps: &[Representative]) -> Scope {
    Scope::Team(teams(reps).into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Deal, DealStage, DealStatus, Grade};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn deal(id: &str, value: u64, status: DealStatus, owner: &str, date: NaiveDate) -> Deal {
        Deal {
            id: id.into(),
            title: id.into(),
            contact_id: "c1".into(),
            product_amount: value,
            goods_amount: 0,
            item_details: String::new(),
            status,
            stage: DealStage::default_for(status),
            expected_close_date: Some(date),
            probability: status.default_probability(),
            owner: owner.into(),
            owner_id: None,
            team: "T1".into(),
            department: String::new(),
        }
    }

    fn rep(id: &str, name: &str, team: &str) -> Representative {
        Representative { id: id.into(), name: name.into(), team: team.into(), ..Default::default() }
    }

    fn dataset() -> Dataset {
        let this_month = today();
        let spring = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
        Dataset {
            accounts: vec![
                Account {
                    id: "c1".into(),
                    grade: Grade::S,
                    target_amount: 1_200_000,
                    owner: Some("Hong".into()),
                    team: Some("T1".into()),
                    ..Default::default()
                },
                Account {
                    id: "c2".into(),
                    grade: Grade::Unrated,
                    target_amount: 600_000,
                    owner: Some("Kim".into()),
                    team: Some("T2".into()),
                    ..Default::default()
                },
            ],
            deals: vec![
                deal("d1", 100, DealStatus::Sales, "Hong", this_month),
                deal("d2", 200, DealStatus::Confirmed, "Hong", this_month),
                deal("d3", 300, DealStatus::Expected, "Hong", this_month),
                deal("d4", 1_000, DealStatus::Sales, "Hong", spring),
                deal("d5", 5_000, DealStatus::Sales, "Kim", this_month),
            ],
            representatives: vec![rep("s2", "Kim", "T2"), rep("s1", "Hong", "T1"), rep("s3", "Lee", "T1")],
            rejected: vec![],
        }
    }

    #[test]
    fn test_month_dashboard_for_individual() {
        let report = DashboardReport::build(&dataset(), &Scope::individual("Hong"), Period::Month, today());
        assert_eq!(report.target, 100_000);
        assert_eq!(report.totals.performance, 100);
        assert_eq!(report.totals.confirmed, 200);
        assert_eq!(report.totals.expected, 300);
        assert_eq!(report.totals.undecided, 0);
        assert_eq!(report.deal_count, 3);
        assert_eq!(report.achievement, 0.001);
        // Monthly series ignores the period selector.
        assert_eq!(report.monthly[3].performance, 1_000);
        assert_eq!(report.monthly[9].total(), 600);
    }

    #[test]
    fn test_year_dashboard_for_everyone() {
        let report = DashboardReport::build(&dataset(), &Scope::All, Period::Year, today());
        assert_eq!(report.target, 1_800_000);
        assert_eq!(report.totals.performance, 6_100);
        assert_eq!(report.account_count, 2);
        assert_eq!(report.grades[0], GradeSlice { grade: Grade::S, amount: 1_200_000 });
        assert_eq!(report.grades[1], GradeSlice { grade: Grade::D, amount: 600_000 });
    }

    #[test]
    fn test_empty_team_selection_reports_zero() {
        let report = DashboardReport::build(&dataset(), &Scope::Team(String::new()), Period::Year, today());
        assert_eq!(report.target, 0);
        assert_eq!(report.totals.total(), 0);
        assert_eq!(report.achievement, 0.0);
        assert!(report.grades.is_empty());
    }

    #[test]
    fn test_scope_defaults() {
        let reps = dataset().representatives;
        assert_eq!(teams(&reps), vec!["T1".to_string(), "T2".to_string()]);
        assert_eq!(default_team(&reps), Scope::Team("T1".into()));
        assert_eq!(
            default_individual(&reps),
            Scope::Individual { name: "Kim".into(), rep_id: Some("s2".into()) }
        );
        assert_eq!(default_individual(&[]), Scope::individual(""));
    }
}
