use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized {what}: {value:?}")]
pub struct UnknownVariant {
    pub what: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(what: &'static str, value: &str) -> Self {
        Self { what, value: value.to_string() }
    }
}

// ── Account classification ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[default]
    Company,
    University,
    Institute,
    Association,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Company => "Company",
            AccountType::University => "University",
            AccountType::Institute => "Institute",
            AccountType::Association => "Association",
        }
    }
}

impl FromStr for AccountType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "company" | "general company" | "" => Ok(AccountType::Company),
            "university" => Ok(AccountType::University),
            "institute" => Ok(AccountType::Institute),
            "association" => Ok(AccountType::Association),
            _ => Err(UnknownVariant::new("account type", s)),
        }
    }
}

// ── Grade ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    #[default]
    Unrated,
}

impl Grade {
    /// The five grades a distribution chart can show.
    pub const CHARTED: [Grade; 5] = [Grade::S, Grade::A, Grade::B, Grade::C, Grade::D];

    /// Unrated accounts are charted as D.
    pub fn charted(self) -> Grade {
        match self {
            Grade::Unrated => Grade::D,
            g => g,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::Unrated => "Unrated",
        }
    }
}

impl FromStr for Grade {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Grade::S),
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "UNRATED" | "" => Ok(Grade::Unrated),
            _ => Err(UnknownVariant::new("grade", s)),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Deal status (drives aggregation) ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStatus {
    /// Realized revenue.
    Sales,
    Confirmed,
    Expected,
    Undecided,
}

impl DealStatus {
    pub const ALL: [DealStatus; 4] = [
        DealStatus::Sales,
        DealStatus::Confirmed,
        DealStatus::Expected,
        DealStatus::Undecided,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DealStatus::Sales => "Sales",
            DealStatus::Confirmed => "Confirmed",
            DealStatus::Expected => "Expected",
            DealStatus::Undecided => "Undecided",
        }
    }

    /// Display-only win probability assigned when a deal is created.
    pub fn default_probability(self) -> u8 {
        match self {
            DealStatus::Sales => 100,
            DealStatus::Confirmed => 90,
            DealStatus::Expected => 60,
            DealStatus::Undecided => 20,
        }
    }
}

impl FromStr for DealStatus {
    type Err = UnknownVariant;

    /// Accepts the English names and the spreadsheet's Korean labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "매출" => return Ok(DealStatus::Sales),
            "확정" => return Ok(DealStatus::Confirmed),
            "예정" => return Ok(DealStatus::Expected),
            "미정" => return Ok(DealStatus::Undecided),
            _ => {}
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" | "sale" | "realized" => Ok(DealStatus::Sales),
            "confirmed" => Ok(DealStatus::Confirmed),
            "expected" => Ok(DealStatus::Expected),
            "undecided" => Ok(DealStatus::Undecided),
            _ => Err(UnknownVariant::new("deal status", s)),
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Deal stage (kanban only) ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl DealStage {
    pub const ALL: [DealStage; 6] = [
        DealStage::Lead,
        DealStage::Qualified,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::Won,
        DealStage::Lost,
    ];

    /// Stage assigned to a freshly created deal.
    pub fn default_for(status: DealStatus) -> DealStage {
        match status {
            DealStatus::Sales => DealStage::Won,
            _ => DealStage::Proposal,
        }
    }

    /// Status inferred for stored rows that carry a stage but no status.
    pub fn implied_status(self) -> DealStatus {
        match self {
            DealStage::Won => DealStatus::Sales,
            DealStage::Negotiation => DealStatus::Confirmed,
            DealStage::Proposal => DealStatus::Expected,
            DealStage::Lead | DealStage::Qualified | DealStage::Lost => DealStatus::Undecided,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DealStage::Lead => "Lead",
            DealStage::Qualified => "Qualified",
            DealStage::Proposal => "Proposal",
            DealStage::Negotiation => "Negotiation",
            DealStage::Won => "Closed Won",
            DealStage::Lost => "Closed Lost",
        }
    }
}

impl FromStr for DealStage {
    type Err = UnknownVariant;

    /// Matches on the English keyword, so "계약 성사 (Closed Won)" parses too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let stage = if lower.contains("won") {
            DealStage::Won
        } else if lower.contains("lost") {
            DealStage::Lost
        } else if lower.contains("negotiation") {
            DealStage::Negotiation
        } else if lower.contains("proposal") {
            DealStage::Proposal
        } else if lower.contains("qualified") {
            DealStage::Qualified
        } else if lower.contains("lead") {
            DealStage::Lead
        } else {
            return Err(UnknownVariant::new("deal stage", s));
        };
        Ok(stage)
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Representative role ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Staff,
    Manager,
    Director,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Director => "director",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staff" | "" => Ok(Role::Staff),
            "manager" => Ok(Role::Manager),
            "director" => Ok(Role::Director),
            _ => Err(UnknownVariant::new("role", s)),
        }
    }
}

// ── Ownership ─────────────────────────────────────────────────────────────────

/// Denormalized ownership fields shared by accounts and deals.
pub trait Owned {
    fn owner(&self) -> Option<&str>;
    fn owner_id(&self) -> Option<&str>;
    fn team(&self) -> Option<&str>;
}

// ── Account ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    /// Contact person at the organization.
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub role: String,
    pub department: String,
    pub last_contacted: Option<NaiveDate>,
    pub account_type: AccountType,
    pub grade: Grade,
    /// Annual revenue target in minor units.
    pub target_amount: u64,
    /// Append-only history.
    pub notes: Vec<String>,
    pub owner: Option<String>,
    pub owner_id: Option<String>,
    pub team: Option<String>,
}

impl Owned for Account {
    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
    fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }
    fn team(&self) -> Option<&str> {
        self.team.as_deref()
    }
}

// ── Deal ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deal {
    pub id: String,
    pub title: String,
    /// Foreign key to `Account::id`.
    pub contact_id: String,
    pub product_amount: u64,
    pub goods_amount: u64,
    pub item_details: String,
    pub status: DealStatus,
    pub stage: DealStage,
    /// `None` when the stored date could not be parsed.
    pub expected_close_date: Option<NaiveDate>,
    pub probability: u8,
    pub owner: String,
    pub owner_id: Option<String>,
    pub team: String,
    pub department: String,
}

impl Deal {
    /// Total deal value. Always `product_amount + goods_amount`.
    pub fn value(&self) -> u64 {
        self.product_amount.saturating_add(self.goods_amount)
    }
}

impl Owned for Deal {
    fn owner(&self) -> Option<&str> {
        Some(&self.owner)
    }
    fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }
    fn team(&self) -> Option<&str> {
        Some(&self.team)
    }
}

// ── Representative ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Representative {
    pub id: String,
    pub name: String,
    pub team: String,
    pub department: String,
    pub role: Role,
    pub email: String,
    pub phone: Option<String>,
}

// ── Selectors ─────────────────────────────────────────────────────────────────

/// Reporting lens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Bound to one representative. `rep_id` is matched first when the record
    /// carries an owner id; `name` is the fallback.
    Individual { name: String, rep_id: Option<String> },
    Team(String),
    All,
}

impl Scope {
    pub fn individual(name: impl Into<String>) -> Self {
        Scope::Individual { name: name.into(), rep_id: None }
    }

    pub fn representative(rep: &Representative) -> Self {
        Scope::Individual {
            name: rep.name.clone(),
            rep_id: Some(rep.id.clone()).filter(|id| !id.is_empty()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Scope::Individual { name, .. } => name,
            Scope::Team(team) => team,
            Scope::All => "All",
        }
    }
}

/// Reporting window, always relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Quarter,
    Year,
    /// Pass-through: every record is in the window. Any unrecognized period
    /// name parses to this.
    Unbounded,
}

impl Period {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" | "monthly" => Period::Month,
            "quarter" | "quarterly" => Period::Quarter,
            "year" | "ytd" | "annual" => Period::Year,
            _ => Period::Unbounded,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
            Period::Unbounded => "all time",
        }
    }
}

// ── Record kinds ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Accounts,
    Deals,
    Representatives,
}

impl RecordKind {
    /// Save order.
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Accounts,
        RecordKind::Deals,
        RecordKind::Representatives,
    ];

    /// Collection name used by the record store.
    pub fn wire_name(self) -> &'static str {
        match self {
            RecordKind::Accounts => "contacts",
            RecordKind::Deals => "deals",
            RecordKind::Representatives => "salesReps",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Accounts => "accounts",
            RecordKind::Deals => "deals",
            RecordKind::Representatives => "representatives",
        })
    }
}

/// A stored row that could not be turned into a domain record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RecordKind,
    pub id: Option<String>,
    pub reason: String,
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// The three collections, as fetched or as held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub accounts: Vec<Account>,
    pub deals: Vec<Deal>,
    pub representatives: Vec<Representative>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<Rejection>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.deals.is_empty() && self.representatives.is_empty()
    }

    pub fn len_of(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Accounts => self.accounts.len(),
            RecordKind::Deals => self.deals.len(),
            RecordKind::Representatives => self.representatives.len(),
        }
    }
}

// ── Ids ───────────────────────────────────────────────────────────────────────

static ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Timestamp-derived id, e.g. `c1729238400123-7`.
pub fn next_id(prefix: &str) -> String {
    let seq = ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}{}-{}", prefix, Utc::now().timestamp_millis(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(product: u64, goods: u64) -> Deal {
        Deal {
            id: "d1".into(),
            title: "t".into(),
            contact_id: "c1".into(),
            product_amount: product,
            goods_amount: goods,
            item_details: String::new(),
            status: DealStatus::Expected,
            stage: DealStage::Proposal,
            expected_close_date: None,
            probability: 60,
            owner: "Kim".into(),
            owner_id: None,
            team: "Team 1".into(),
            department: String::new(),
        }
    }

    #[test]
    fn test_deal_value_is_sum_of_parts() {
        let mut d = deal(700, 300);
        assert_eq!(d.value(), 1000);
        d.goods_amount = 50;
        assert_eq!(d.value(), 750);
    }

    #[test]
    fn test_status_parses_korean_and_english() {
        assert_eq!("매출".parse::<DealStatus>(), Ok(DealStatus::Sales));
        assert_eq!("미정".parse::<DealStatus>(), Ok(DealStatus::Undecided));
        assert_eq!(" confirmed ".parse::<DealStatus>(), Ok(DealStatus::Confirmed));
        assert!("Pending".parse::<DealStatus>().is_err());
    }

    #[test]
    fn test_stage_parses_labelled_values() {
        assert_eq!("계약 성사 (Closed Won)".parse::<DealStage>(), Ok(DealStage::Won));
        assert_eq!("제안 단계 (Proposal)".parse::<DealStage>(), Ok(DealStage::Proposal));
        assert!("??".parse::<DealStage>().is_err());
    }

    #[test]
    fn test_stage_defaults() {
        assert_eq!(DealStage::default_for(DealStatus::Sales), DealStage::Won);
        assert_eq!(DealStage::default_for(DealStatus::Undecided), DealStage::Proposal);
        assert_eq!(DealStage::Won.implied_status(), DealStatus::Sales);
    }

    #[test]
    fn test_unrated_charts_as_d() {
        assert_eq!(Grade::Unrated.charted(), Grade::D);
        assert_eq!(Grade::S.charted(), Grade::S);
    }

    #[test]
    fn test_period_parse_is_lenient() {
        assert_eq!(Period::parse("Quarter"), Period::Quarter);
        assert_eq!(Period::parse("ytd"), Period::Year);
        assert_eq!(Period::parse("fortnight"), Period::Unbounded);
    }

    #[test]
    fn test_next_id_is_unique() {
        let a = next_id("c");
        let b = next_id("c");
        assert_ne!(a, b);
        assert!(a.starts_with('c'));
    }
}
