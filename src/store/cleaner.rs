use crate::models::{
    Account, AccountType, Dataset, Deal, DealStage, DealStatus, Grade, RecordKind, Rejection,
    Representative, Role,
};
use crate::store::parsers::{
    AccountRow, DealRow, RawAccountRow, RawDealRow, RawPayload, RawRepRow, RepRow,
};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

// ── Field parsers ─────────────────────────────────────────────────────────────

/// Parse an amount in minor units: strip everything except digits, dot, minus.
/// "₩1,234,000" → 1234000 | "99.5" → 100 | negative → None
pub fn parse_amount(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" || s == "-" || s == "—" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let n: f64 = cleaned.parse().ok()?;
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    Some(n.round() as u64)
}

/// Parse dates: ISO (optionally with a time part) or a few sheet formats.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let s = s.split('T').next().unwrap_or(s);

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y. %m. %d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%b %d, %Y") {
        return Some(d);
    }

    None
}

/// Notes arrive as a JSON array or a string holding one. A plain string is a
/// single note; an unparseable encoded list yields no notes.
pub fn parse_notes(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(note_text).collect(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.starts_with('[') {
                match serde_json::from_str::<Vec<Value>>(s) {
                    Ok(items) => items.iter().filter_map(note_text).collect(),
                    Err(e) => {
                        warn!("Unparseable notes list {:?}: {}", s, e);
                        vec![]
                    }
                }
            } else if s.is_empty() {
                vec![]
            } else {
                vec![s.to_string()]
            }
        }
        _ => vec![],
    }
}

fn note_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn or_empty(s: &Option<String>) -> String {
    non_empty(s).unwrap_or_default()
}

// ── Rows → records ────────────────────────────────────────────────────────────

pub fn account_row_to_account(row: &RawAccountRow) -> Result<Account, String> {
    let id = non_empty(&row.id).ok_or("missing id")?;

    let grade = match row.grade.as_deref() {
        Some(g) => g.parse::<Grade>().map_err(|e| e.to_string())?,
        None => Grade::Unrated,
    };

    let account_type = row
        .account_type
        .as_deref()
        .map(str::parse::<AccountType>)
        .transpose()
        .unwrap_or_else(|e| {
            warn!("Account {}: {}, using Company", id, e);
            Some(AccountType::Company)
        })
        .unwrap_or_default();

    Ok(Account {
        name: or_empty(&row.name),
        company: or_empty(&row.company),
        email: or_empty(&row.email),
        phone: or_empty(&row.phone),
        address: non_empty(&row.address),
        role: or_empty(&row.role),
        department: or_empty(&row.department),
        last_contacted: row.last_contacted.as_deref().and_then(parse_date),
        account_type,
        grade,
        target_amount: row.target_amount.as_deref().and_then(parse_amount).unwrap_or(0),
        notes: parse_notes(row.notes.as_ref()),
        owner: non_empty(&row.owner),
        owner_id: non_empty(&row.owner_id),
        team: non_empty(&row.team),
        id,
    })
}

pub fn deal_row_to_deal(row: &RawDealRow) -> Result<Deal, String> {
    let id = non_empty(&row.id).ok_or("missing id")?;
    let contact_id = non_empty(&row.contact_id).ok_or("missing contactId")?;

    let stage = non_empty(&row.stage).and_then(|s| match s.parse::<DealStage>() {
        Ok(stage) => Some(stage),
        Err(e) => {
            warn!("Deal {}: {}", id, e);
            None
        }
    });

    // A present but unknown status is rejected; an absent one is implied by
    // the stage.
    let status = match non_empty(&row.status) {
        Some(s) => s.parse::<DealStatus>().map_err(|e| e.to_string())?,
        None => stage.map(DealStage::implied_status).unwrap_or(DealStatus::Undecided),
    };

    let product = row.product_amount.as_deref().and_then(parse_amount);
    let goods = row.goods_amount.as_deref().and_then(parse_amount);
    let (product_amount, goods_amount) = match (product, goods) {
        (None, None) => (row.value.as_deref().and_then(parse_amount).unwrap_or(0), 0),
        (p, g) => (p.unwrap_or(0), g.unwrap_or(0)),
    };

    let expected_close_date = row.expected_close_date.as_deref().and_then(parse_date);
    if expected_close_date.is_none() {
        warn!("Deal {}: unparseable close date {:?}", id, row.expected_close_date);
    }

    let probability = row
        .probability
        .as_deref()
        .and_then(|p| p.trim().trim_end_matches('%').parse::<f64>().ok())
        .map(|p| p.clamp(0.0, 100.0).round() as u8)
        .unwrap_or_else(|| status.default_probability());

    Ok(Deal {
        title: or_empty(&row.title),
        contact_id,
        product_amount,
        goods_amount,
        item_details: or_empty(&row.item_details),
        status,
        stage: stage.unwrap_or_else(|| DealStage::default_for(status)),
        expected_close_date,
        probability,
        owner: or_empty(&row.owner),
        owner_id: non_empty(&row.owner_id),
        team: or_empty(&row.team),
        department: or_empty(&row.department),
        id,
    })
}

pub fn rep_row_to_rep(row: &RawRepRow) -> Result<Representative, String> {
    let id = non_empty(&row.id).ok_or("missing id")?;
    let name = non_empty(&row.name).ok_or("missing name")?;
    let role = match row.role.as_deref() {
        Some(r) => r.parse::<Role>().map_err(|e| e.to_string())?,
        None => Role::Staff,
    };

    Ok(Representative {
        id,
        name,
        team: or_empty(&row.team),
        department: or_empty(&row.department),
        role,
        email: or_empty(&row.email),
        phone: non_empty(&row.phone),
    })
}

fn clean_rows<R, T>(
    kind: RecordKind,
    rows: Option<Vec<R>>,
    id_of: impl Fn(&R) -> Option<String>,
    convert: impl Fn(&R) -> Result<T, String>,
    rejected: &mut Vec<Rejection>,
) -> Vec<T> {
    let rows = rows.unwrap_or_default();
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        match convert(row) {
            Ok(record) => out.push(record),
            Err(reason) => {
                let id = id_of(row);
                warn!("Rejected {} row {:?}: {}", kind, id, reason);
                rejected.push(Rejection { kind, id, reason });
            }
        }
    }
    out
}

/// Clean a whole payload. Missing collections become empty; rejected rows are
/// reported on the dataset instead of being dropped silently.
pub fn clean_payload(raw: RawPayload) -> Dataset {
    let mut rejected = Vec::new();

    let accounts = clean_rows(
        RecordKind::Accounts,
        raw.contacts,
        |r| r.id.clone(),
        account_row_to_account,
        &mut rejected,
    );
    let deals = clean_rows(
        RecordKind::Deals,
        raw.deals,
        |r| r.id.clone(),
        deal_row_to_deal,
        &mut rejected,
    );
    let representatives = clean_rows(
        RecordKind::Representatives,
        raw.sales_reps,
        |r| r.id.clone(),
        rep_row_to_rep,
        &mut rejected,
    );

    debug!(
        "Cleaned payload: {} accounts, {} deals, {} reps, {} rejected",
        accounts.len(),
        deals.len(),
        representatives.len(),
        rejected.len()
    );

    Dataset {
        accounts,
        deals,
        representatives,
        rejected,
    }
}

// ── Records → rows ────────────────────────────────────────────────────────────

fn iso(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

pub fn account_to_row(a: &Account) -> serde_json::Result<AccountRow<'_>> {
    Ok(AccountRow {
        id: &a.id,
        name: &a.name,
        email: &a.email,
        phone: &a.phone,
        company: &a.company,
        address: a.address.as_deref().unwrap_or_default(),
        role: &a.role,
        department: &a.department,
        last_contacted: iso(a.last_contacted),
        notes: serde_json::to_string(&a.notes)?,
        grade: a.grade.as_str(),
        target_amount: a.target_amount,
        account_type: a.account_type.as_str(),
        owner: a.owner.as_deref().unwrap_or_default(),
        owner_id: a.owner_id.as_deref().unwrap_or_default(),
        team: a.team.as_deref().unwrap_or_default(),
    })
}

pub fn deal_to_row(d: &Deal) -> DealRow<'_> {
    DealRow {
        id: &d.id,
        title: &d.title,
        value: d.value(),
        product_amount: d.product_amount,
        goods_amount: d.goods_amount,
        item_details: &d.item_details,
        status: d.status.as_str(),
        stage: d.stage.as_str(),
        contact_id: &d.contact_id,
        expected_close_date: iso(d.expected_close_date),
        probability: d.probability,
        owner: &d.owner,
        owner_id: d.owner_id.as_deref().unwrap_or_default(),
        team: &d.team,
        department: &d.department,
    }
}

pub fn rep_to_row(r: &Representative) -> RepRow<'_> {
    RepRow {
        id: &r.id,
        name: &r.name,
        team: &r.team,
        department: &r.department,
        role: r.role.as_str(),
        email: &r.email,
        phone: r.phone.as_deref().unwrap_or_default(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::parsers::parse_payload;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("₩1,234,000"), Some(1_234_000));
        assert_eq!(parse_amount("120000000"), Some(120_000_000));
        assert_eq!(parse_amount("99.5"), Some(100));
        assert_eq!(parse_amount("-5"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 9);
        assert_eq!(parse_date("2026-03-09"), expected);
        assert_eq!(parse_date("2026-03-09T00:00:00.000Z"), expected);
        assert_eq!(parse_date("2026/03/09"), expected);
        assert_eq!(parse_date("March"), None);
    }

    #[test]
    fn test_parse_notes_shapes() {
        let encoded = Value::String(r#"["first","second"]"#.into());
        assert_eq!(parse_notes(Some(&encoded)), vec!["first", "second"]);
        let array = serde_json::json!(["a", null, 3]);
        assert_eq!(parse_notes(Some(&array)), vec!["a", "3"]);
        assert_eq!(parse_notes(Some(&Value::String("[broken".into()))), Vec::<String>::new());
        assert_eq!(parse_notes(Some(&Value::String("plain".into()))), vec!["plain"]);
        assert!(parse_notes(None).is_empty());
    }

    #[test]
    fn test_unknown_status_is_rejected_not_dropped_silently() {
        let body = r#"{"deals":[
            {"id":"d1","contactId":"c1","status":"확정","productAmount":700,"goodsAmount":300,"expectedCloseDate":"2026-10-01"},
            {"id":"d2","contactId":"c1","status":"Pending","productAmount":5}
        ]}"#;
        let data = clean_payload(parse_payload(body).unwrap());
        assert_eq!(data.deals.len(), 1);
        assert_eq!(data.deals[0].status, DealStatus::Confirmed);
        assert_eq!(data.deals[0].value(), 1_000);
        assert_eq!(data.rejected.len(), 1);
        assert_eq!(data.rejected[0].id.as_deref(), Some("d2"));
        assert_eq!(data.rejected[0].kind, RecordKind::Deals);
    }

    #[test]
    fn test_missing_status_falls_back_to_stage() {
        let row = RawDealRow {
            id: Some("d1".into()),
            contact_id: Some("c1".into()),
            stage: Some("계약 성사 (Closed Won)".into()),
            value: Some("500".into()),
            ..Default::default()
        };
        let deal = deal_row_to_deal(&row).unwrap();
        assert_eq!(deal.status, DealStatus::Sales);
        assert_eq!(deal.stage, DealStage::Won);
        assert_eq!(deal.probability, 100);
        // Legacy rows without a breakdown keep their value.
        assert_eq!(deal.value(), 500);
        assert!(deal.expected_close_date.is_none());
    }

    #[test]
    fn test_value_column_is_ignored_when_breakdown_present() {
        let row = RawDealRow {
            id: Some("d1".into()),
            contact_id: Some("c1".into()),
            status: Some("Sales".into()),
            value: Some("999".into()),
            product_amount: Some("100".into()),
            ..Default::default()
        };
        assert_eq!(deal_row_to_deal(&row).unwrap().value(), 100);
    }

    #[test]
    fn test_account_row() {
        let row = RawAccountRow {
            id: Some("c1".into()),
            company: Some(" Acme ".into()),
            grade: Some("Unrated".into()),
            target_amount: Some("120000000".into()),
            account_type: Some("University".into()),
            owner: Some("Hong".into()),
            team: Some("".into()),
            ..Default::default()
        };
        let account = account_row_to_account(&row).unwrap();
        assert_eq!(account.company, "Acme");
        assert_eq!(account.grade, Grade::Unrated);
        assert_eq!(account.account_type, AccountType::University);
        assert_eq!(account.target_amount, 120_000_000);
        assert_eq!(account.team, None);

        let bad = RawAccountRow { id: Some("c2".into()), grade: Some("Z".into()), ..Default::default() };
        assert!(account_row_to_account(&bad).is_err());
    }

    #[test]
    fn test_rows_round_trip_through_wire() {
        let account = Account {
            id: "c1".into(),
            notes: vec!["met CFO".into()],
            target_amount: 10,
            ..Default::default()
        };
        let row = account_to_row(&account).unwrap();
        assert_eq!(row.notes, r#"["met CFO"]"#);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "Company");
        assert_eq!(json["targetAmount"], 10);
    }
}
