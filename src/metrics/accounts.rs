//! The account list: one row per account with its deal rollup.

use super::aggregate::{StatusTotals, account_rollup};
use crate::models::{Account, Deal, Grade, Scope};
use serde::Serialize;

use super::filters::filter_by_scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSort {
    Company,
    Name,
    /// Realized plus confirmed value.
    Won,
    Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRow {
    pub id: String,
    pub name: String,
    pub company: String,
    pub grade: Grade,
    pub deal_count: usize,
    pub totals: StatusTotals,
}

impl AccountRow {
    pub fn won(&self) -> u64 {
        self.totals.performance.saturating_add(self.totals.confirmed)
    }
}

fn grade_rank(grade: Grade) -> u8 {
    match grade {
        Grade::S => 5,
        Grade::A => 4,
        Grade::B => 3,
        Grade::C => 2,
        Grade::D => 1,
        Grade::Unrated => 0,
    }
}

fn matches_search(account: &Account, needle: &str) -> bool {
    [&account.name, &account.company, &account.email]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Scoped, optionally searched and sorted account rows. Search is a
/// case-insensitive substring match on name, company and email. Without a
/// sort key rows keep their stored order.
pub fn account_list(
    accounts: &[Account],
    deals: &[Deal],
    scope: &Scope,
    search: Option<&str>,
    sort: Option<AccountSort>,
    descending: bool,
) -> Vec<AccountRow> {
    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

    let mut rows: Vec<AccountRow> = filter_by_scope(accounts, scope)
        .into_iter()
        .filter(|a| needle.as_deref().is_none_or(|n| matches_search(a, n)))
        .map(|a| AccountRow {
            id: a.id.clone(),
            name: a.name.clone(),
            company: a.company.clone(),
            grade: a.grade,
            deal_count: deals.iter().filter(|d| d.contact_id == a.id).count(),
            totals: account_rollup(&a.id, deals),
        })
        .collect();

    if let Some(key) = sort {
        rows.sort_by(|a, b| {
            let ord = match key {
                AccountSort::Company => a.company.cmp(&b.company),
                AccountSort::Name => a.name.cmp(&b.name),
                AccountSort::Won => a.won().cmp(&b.won()),
                AccountSort::Grade => grade_rank(a.grade).cmp(&grade_rank(b.grade)),
            };
            if descending { ord.reverse() } else { ord }
        });
    }
    rows
}
