//! Target allocation, status bucketing and chart series.

use crate::models::{Account, Deal, DealStage, DealStatus, Grade, Period};
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

// ── Target allocation ─────────────────────────────────────────────────────────

/// Integer division rounding half away from zero (operands are non-negative).
fn div_round(n: u64, d: u64) -> u64 {
    ((n as u128 + d as u128 / 2) / d as u128) as u64
}

/// Prorates the summed annual targets of `accounts` to `period`.
/// No remainder redistribution: four quarters need not add up to the year.
pub fn allocate_target<'a>(accounts: impl IntoIterator<Item = &'a Account>, period: Period) -> u64 {
    let annual = accounts
        .into_iter()
        .fold(0u64, |acc, a| acc.saturating_add(a.target_amount));
    match period {
        Period::Month => div_round(annual, 12),
        Period::Quarter => div_round(annual, 4),
        Period::Year | Period::Unbounded => annual,
    }
}

// ── Status buckets ────────────────────────────────────────────────────────────

/// Deal value summed per status. The four buckets partition a deal set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub performance: u64,
    pub confirmed: u64,
    pub expected: u64,
    pub undecided: u64,
}

impl StatusTotals {
    pub fn add(&mut self, status: DealStatus, value: u64) {
        let bucket = match status {
            DealStatus::Sales => &mut self.performance,
            DealStatus::Confirmed => &mut self.confirmed,
            DealStatus::Expected => &mut self.expected,
            DealStatus::Undecided => &mut self.undecided,
        };
        *bucket = bucket.saturating_add(value);
    }

    pub fn get(&self, status: DealStatus) -> u64 {
        match status {
            DealStatus::Sales => self.performance,
            DealStatus::Confirmed => self.confirmed,
            DealStatus::Expected => self.expected,
            DealStatus::Undecided => self.undecided,
        }
    }

    pub fn total(&self) -> u64 {
        DealStatus::ALL
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(self.get(*s)))
    }
}

pub fn status_totals<'a>(deals: impl IntoIterator<Item = &'a Deal>) -> StatusTotals {
    let mut totals = StatusTotals::default();
    for deal in deals {
        totals.add(deal.status, deal.value());
    }
    totals
}

/// `performance / target`, or 0.0 when there is no target.
pub fn achievement_ratio(performance: u64, target: u64) -> f64 {
    if target == 0 {
        0.0
    } else {
        performance as f64 / target as f64
    }
}

// ── Series ────────────────────────────────────────────────────────────────────

/// Twelve buckets (January first) for deals closing in `year`.
/// Ignores the active period selector on purpose.
pub fn monthly_series<'a>(deals: impl IntoIterator<Item = &'a Deal>, year: i32) -> [StatusTotals; 12] {
    let mut months = [StatusTotals::default(); 12];
    for deal in deals {
        let Some(date) = deal.expected_close_date else { continue };
        if date.year() == year {
            months[date.month0() as usize].add(deal.status, deal.value());
        }
    }
    months
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeSlice {
    pub grade: Grade,
    pub amount: u64,
}

/// Target amounts grouped by charted grade, zero slices dropped, largest first.
pub fn grade_distribution<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Vec<GradeSlice> {
    let mut sums: BTreeMap<Grade, u64> = BTreeMap::new();
    for account in accounts {
        let slot = sums.entry(account.grade.charted()).or_default();
        *slot = slot.saturating_add(account.target_amount);
    }

    let mut slices: Vec<GradeSlice> = sums
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(grade, amount)| GradeSlice { grade, amount })
        .collect();
    // Stable sort keeps S..D order among ties.
    slices.sort_by(|a, b| b.amount.cmp(&a.amount));
    slices
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageColumn {
    pub stage: DealStage,
    pub count: usize,
    pub value: u64,
}

/// Kanban column headers: every stage in pipeline order, empty ones included.
pub fn pipeline_board<'a>(deals: impl IntoIterator<Item = &'a Deal> + Clone) -> Vec<StageColumn> {
    DealStage::ALL
        .iter()
        .map(|stage| {
            let (count, value) = deals
                .clone()
                .into_iter()
                .filter(|d| d.stage == *stage)
                .fold((0usize, 0u64), |(n, v), d| (n + 1, v.saturating_add(d.value())));
            StageColumn { stage: *stage, count, value }
        })
        .collect()
}

/// Per-account totals across all of its deals.
pub fn account_rollup(account_id: &str, deals: &[Deal]) -> StatusTotals {
    status_totals(deals.iter().filter(|d| d.contact_id == account_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn deal(id: &str, value: u64, status: DealStatus, date: Option<NaiveDate>) -> Deal {
        Deal {
            id: id.into(),
            title: id.into(),
            contact_id: "c1".into(),
            product_amount: value,
            goods_amount: 0,
            item_details: String::new(),
            status,
            stage: DealStage::default_for(status),
            expected_close_date: date,
            probability: status.default_probability(),
            owner: "Hong".into(),
            owner_id: None,
            team: "T1".into(),
            department: String::new(),
        }
    }

    fn account(grade: Grade, target: u64) -> Account {
        Account { grade, target_amount: target, ..Default::default() }
    }

    fn d(m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, m, day)
    }

    #[test]
    fn test_target_allocation_scenario() {
        let accounts = vec![account(Grade::A, 1_200_000)];
        assert_eq!(allocate_target(&accounts, Period::Month), 100_000);
        assert_eq!(allocate_target(&accounts, Period::Quarter), 300_000);
        assert_eq!(allocate_target(&accounts, Period::Year), 1_200_000);
    }

    #[test]
    fn test_target_allocation_rounds_half_up() {
        let accounts = vec![account(Grade::A, 18), account(Grade::B, 0)];
        // 18 / 12 = 1.5
        assert_eq!(allocate_target(&accounts, Period::Month), 2);
        // 18 / 4 = 4.5
        assert_eq!(allocate_target(&accounts, Period::Quarter), 5);
        let odd = vec![account(Grade::A, 1_000_001)];
        let year = allocate_target(&odd, Period::Year);
        assert!(allocate_target(&odd, Period::Month).abs_diff(year / 12) <= 1);
        assert!((allocate_target(&odd, Period::Month) * 12).abs_diff(year) <= 12);
        assert!((allocate_target(&odd, Period::Quarter) * 4).abs_diff(year) <= 4);
    }

    #[test]
    fn test_status_buckets_scenario() {
        let deals = vec![
            deal("d1", 100, DealStatus::Sales, d(10, 1)),
            deal("d2", 200, DealStatus::Confirmed, d(10, 2)),
            deal("d3", 300, DealStatus::Expected, d(10, 3)),
        ];
        let totals = status_totals(&deals);
        assert_eq!(totals.performance, 100);
        assert_eq!(totals.confirmed, 200);
        assert_eq!(totals.expected, 300);
        assert_eq!(totals.undecided, 0);
        assert_eq!(totals.total(), deals.iter().map(Deal::value).sum::<u64>());
    }

    #[test]
    fn test_achievement_ratio_never_divides_by_zero() {
        assert_eq!(achievement_ratio(500, 0), 0.0);
        assert_eq!(achievement_ratio(50, 200), 0.25);
    }

    #[test]
    fn test_monthly_series_is_current_year_only() {
        let deals = vec![
            deal("d1", 100, DealStatus::Sales, d(1, 5)),
            deal("d2", 40, DealStatus::Undecided, d(1, 20)),
            deal("d3", 70, DealStatus::Expected, NaiveDate::from_ymd_opt(2025, 1, 5)),
            deal("d4", 90, DealStatus::Confirmed, None),
        ];
        let months = monthly_series(&deals, 2026);
        assert_eq!(months[0].performance, 100);
        assert_eq!(months[0].undecided, 40);
        assert_eq!(months[0].expected, 0);
        assert_eq!(months.iter().map(StatusTotals::total).sum::<u64>(), 140);
    }

    #[test]
    fn test_grade_distribution_scenario() {
        let accounts = vec![account(Grade::Unrated, 50), account(Grade::S, 100)];
        let slices = grade_distribution(&accounts);
        assert_eq!(
            slices,
            vec![
                GradeSlice { grade: Grade::S, amount: 100 },
                GradeSlice { grade: Grade::D, amount: 50 },
            ]
        );
    }

    #[test]
    fn test_grade_distribution_drops_zero_slices() {
        let accounts = vec![account(Grade::A, 0), account(Grade::D, 10), account(Grade::Unrated, 5)];
        let slices = grade_distribution(&accounts);
        assert_eq!(slices, vec![GradeSlice { grade: Grade::D, amount: 15 }]);
    }

    #[test]
    fn test_pipeline_board_has_every_stage() {
        let mut lost = deal("d2", 50, DealStatus::Undecided, d(3, 1));
        lost.stage = DealStage::Lost;
        let deals = vec![deal("d1", 100, DealStatus::Sales, d(3, 1)), lost];
        let board = pipeline_board(&deals);
        assert_eq!(board.len(), DealStage::ALL.len());
        let won = board.iter().find(|c| c.stage == DealStage::Won).unwrap();
        assert_eq!((won.count, won.value), (1, 100));
        let lead = board.iter().find(|c| c.stage == DealStage::Lead).unwrap();
        assert_eq!((lead.count, lead.value), (0, 0));
    }

    #[test]
    fn test_account_rollup() {
        let mut other = deal("d3", 999, DealStatus::Sales, d(2, 1));
        other.contact_id = "c2".into();
        let deals = vec![
            deal("d1", 100, DealStatus::Sales, d(2, 1)),
            deal("d2", 30, DealStatus::Confirmed, d(2, 1)),
            other,
        ];
        let rollup = account_rollup("c1", &deals);
        assert_eq!(rollup.performance, 100);
        assert_eq!(rollup.confirmed, 30);
        assert_eq!(rollup.total(), 130);
    }

    #[test]
    fn test_total_saturates() {
        let totals = StatusTotals {
            performance: u64::MAX,
            confirmed: 1,
            expected: 0,
            undecided: 0,
        };
        assert_eq!(totals.total(), u64::MAX);
    }

    #[test]
    fn test_statusless_rows_bucket_by_stage() {
        use crate::store::cleaner::deal_row_to_deal;
        use crate::store::parsers::RawDealRow;

        let row = |id: &str, stage: Option<&str>, amount: &str| RawDealRow {
            id: Some(id.into()),
            contact_id: Some("c1".into()),
            stage: stage.map(str::to_string),
            product_amount: Some(amount.into()),
            expected_close_date: Some("2026-03-05".into()),
            ..Default::default()
        };
        let deals: Vec<Deal> = [
            row("d1", Some("Closed Won"), "100"),
            row("d2", Some("Negotiation"), "20"),
            row("d3", Some("Proposal"), "3"),
            row("d4", None, "4000"),
        ]
        .iter()
        .map(|r| deal_row_to_deal(r).unwrap())
        .collect();

        let totals = status_totals(&deals);
        assert_eq!(totals.performance, 100);
        assert_eq!(totals.confirmed, 20);
        assert_eq!(totals.expected, 3);
        assert_eq!(totals.undecided, 4000);

        let months = monthly_series(&deals, 2026);
        assert_eq!(months[2], totals);
        assert_eq!(months.iter().map(StatusTotals::total).sum::<u64>(), 4123);
    }

    #[test]
    fn test_buckets_partition_generated_deals() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let data = crate::sample::dataset(today);
        assert!(!data.deals.is_empty());

        let all: u64 = data.deals.iter().map(Deal::value).sum();
        assert_eq!(status_totals(&data.deals).total(), all);

        for year in [2025, 2026, 2027] {
            let dated: u64 = data
                .deals
                .iter()
                .filter(|d| d.expected_close_date.map(|c| c.year()) == Some(year))
                .map(Deal::value)
                .sum();
            let series = monthly_series(&data.deals, year);
            assert_eq!(series.iter().map(StatusTotals::total).sum::<u64>(), dated);
        }

        let by_account: u64 = data
            .accounts
            .iter()
            .map(|a| account_rollup(&a.id, &data.deals).total())
            .sum();
        let owned: u64 = data
            .deals
            .iter()
            .filter(|d| data.accounts.iter().any(|a| a.id == d.contact_id))
            .map(Deal::value)
            .sum();
        assert_eq!(by_account, owned);
    }
}
