//! In-memory working copy of the three collections.
//!
//! All mutations go through here: whole-collection replacement from the
//! reconciler and id-matched edits from the command layer. Input is validated
//! before anything is touched, so a rejected edit never leaves partial state.

use crate::error::ValidationError;
use crate::models::{
    Account, Dataset, Deal, DealStage, DealStatus, RecordKind, Representative, next_id,
};
use chrono::NaiveDate;
use tracing::{debug, info};

// ── Drafts ────────────────────────────────────────────────────────────────────

/// Deal fields as entered on a form. Value, stage and probability are derived
/// when not given.
#[derive(Debug, Clone)]
pub struct DealDraft {
    /// Set when editing an existing deal.
    pub id: Option<String>,
    pub title: Option<String>,
    pub product_amount: u64,
    pub goods_amount: u64,
    pub item_details: String,
    pub status: DealStatus,
    pub stage: Option<DealStage>,
    pub expected_close_date: NaiveDate,
    pub probability: Option<u8>,
    pub owner: Option<String>,
    pub owner_id: Option<String>,
    pub team: Option<String>,
    pub department: Option<String>,
}

impl DealDraft {
    pub fn new(status: DealStatus, expected_close_date: NaiveDate) -> Self {
        Self {
            id: None,
            title: None,
            product_amount: 0,
            goods_amount: 0,
            item_details: String::new(),
            status,
            stage: None,
            expected_close_date,
            probability: None,
            owner: None,
            owner_id: None,
            team: None,
            department: None,
        }
    }

    pub fn amounts(mut self, product: u64, goods: u64) -> Self {
        self.product_amount = product;
        self.goods_amount = goods;
        self
    }

    /// Build the deal for `account`. Owner and team fall back to the
    /// account's own, then to `previous` when editing.
    fn build(self, account: &Account, previous: Option<&Deal>) -> Result<Deal, ValidationError> {
        if let Some(p) = self.probability.filter(|p| *p > 100) {
            return Err(ValidationError::Invalid(format!(
                "probability must be between 0 and 100, got {}",
                p
            )));
        }

        let owner = self
            .owner
            .or_else(|| previous.map(|d| d.owner.clone()))
            .or_else(|| account.owner.clone())
            .unwrap_or_default();
        let owner_id = self
            .owner_id
            .or_else(|| previous.and_then(|d| d.owner_id.clone()))
            .or_else(|| account.owner_id.clone());
        let team = self
            .team
            .or_else(|| previous.map(|d| d.team.clone()))
            .or_else(|| account.team.clone())
            .unwrap_or_default();

        Ok(Deal {
            id: self.id.unwrap_or_else(|| next_id("d")),
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("{} sale", account.company)),
            contact_id: account.id.clone(),
            product_amount: self.product_amount,
            goods_amount: self.goods_amount,
            item_details: self.item_details,
            status: self.status,
            stage: self.stage.unwrap_or_else(|| DealStage::default_for(self.status)),
            expected_close_date: Some(self.expected_close_date),
            probability: self
                .probability
                .unwrap_or_else(|| self.status.default_probability()),
            owner,
            owner_id,
            team,
            department: self
                .department
                .or_else(|| previous.map(|d| d.department.clone()))
                .unwrap_or_else(|| account.department.clone()),
        })
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

fn validate_account(account: &Account) -> Result<(), ValidationError> {
    require(&account.name, "name")?;
    require(&account.company, "company")
}

fn validate_rep(rep: &Representative) -> Result<(), ValidationError> {
    require(&rep.name, "name")?;
    require(&rep.email, "email")
}

// ── Workspace ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Workspace {
    data: Dataset,
}

impl Workspace {
    pub fn new(data: Dataset) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn accounts(&self) -> &[Account] {
        &self.data.accounts
    }

    pub fn deals(&self) -> &[Deal] {
        &self.data.deals
    }

    pub fn representatives(&self) -> &[Representative] {
        &self.data.representatives
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.data.accounts.iter().find(|a| a.id == id)
    }

    /// Replace one collection with the fetched one, along with the rows of
    /// that kind the fetch could not read.
    pub fn replace(&mut self, kind: RecordKind, fetched: &mut Dataset) {
        let (rejected, others): (Vec<_>, Vec<_>) = std::mem::take(&mut fetched.rejected)
            .into_iter()
            .partition(|r| r.kind == kind);
        fetched.rejected = others;
        self.data.rejected.retain(|r| r.kind != kind);
        self.data.rejected.extend(rejected);

        match kind {
            RecordKind::Accounts => self.data.accounts = std::mem::take(&mut fetched.accounts),
            RecordKind::Deals => self.data.deals = std::mem::take(&mut fetched.deals),
            RecordKind::Representatives => {
                self.data.representatives = std::mem::take(&mut fetched.representatives)
            }
        }
    }

    pub fn replace_all(&mut self, data: Dataset) {
        self.data = data;
    }

    // ── Accounts ──────────────────────────────────────────────────────────────

    /// Add an account, optionally together with its first deal. Returns the
    /// new account id.
    pub fn add_account(
        &mut self,
        mut account: Account,
        deal: Option<DealDraft>,
    ) -> Result<String, ValidationError> {
        validate_account(&account)?;
        if account.id.trim().is_empty() {
            account.id = next_id("c");
        } else if self.account(&account.id).is_some() {
            return Err(ValidationError::Invalid(format!("account {} already exists", account.id)));
        }

        let deal = deal.map(|d| d.build(&account, None)).transpose()?;
        let id = account.id.clone();
        info!("Adding account {} ({})", account.company, id);
        self.data.accounts.push(account);
        if let Some(deal) = deal {
            self.data.deals.push(deal);
        }
        Ok(id)
    }

    /// Replace an account by id. An accompanying deal is updated when its id
    /// exists and added otherwise.
    pub fn update_account(
        &mut self,
        account: Account,
        deal: Option<DealDraft>,
    ) -> Result<(), ValidationError> {
        validate_account(&account)?;
        let idx = self
            .data
            .accounts
            .iter()
            .position(|a| a.id == account.id)
            .ok_or_else(|| unknown(RecordKind::Accounts, &account.id))?;

        let deal = match deal {
            Some(draft) => {
                let previous = draft
                    .id
                    .as_deref()
                    .and_then(|id| self.data.deals.iter().find(|d| d.id == id));
                Some(draft.build(&account, previous)?)
            }
            None => None,
        };

        self.data.accounts[idx] = account;
        if let Some(deal) = deal {
            self.put_deal(deal);
        }
        Ok(())
    }

    /// Remove an account and every deal that references it. Returns the
    /// number of deals removed.
    pub fn delete_account(&mut self, id: &str) -> Result<usize, ValidationError> {
        let before = self.data.accounts.len();
        self.data.accounts.retain(|a| a.id != id);
        if self.data.accounts.len() == before {
            return Err(unknown(RecordKind::Accounts, id));
        }

        let deals_before = self.data.deals.len();
        self.data.deals.retain(|d| d.contact_id != id);
        let removed = deals_before - self.data.deals.len();
        info!("Deleted account {} and {} of its deals", id, removed);
        Ok(removed)
    }

    pub fn append_note(&mut self, account_id: &str, note: &str) -> Result<(), ValidationError> {
        require(note, "note")?;
        let account = self
            .data
            .accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| unknown(RecordKind::Accounts, account_id))?;
        account.notes.push(note.trim().to_string());
        Ok(())
    }

    // ── Deals ─────────────────────────────────────────────────────────────────

    /// Create or update a deal on an existing account. Returns the deal id.
    pub fn upsert_deal(&mut self, account_id: &str, draft: DealDraft) -> Result<String, ValidationError> {
        let account = self
            .account(account_id)
            .ok_or_else(|| unknown(RecordKind::Accounts, account_id))?;
        let previous = draft
            .id
            .as_deref()
            .and_then(|id| self.data.deals.iter().find(|d| d.id == id));
        let deal = draft.build(account, previous)?;
        let id = deal.id.clone();
        self.put_deal(deal);
        Ok(id)
    }

    pub fn delete_deal(&mut self, id: &str) -> Result<(), ValidationError> {
        let before = self.data.deals.len();
        self.data.deals.retain(|d| d.id != id);
        if self.data.deals.len() == before {
            return Err(unknown(RecordKind::Deals, id));
        }
        Ok(())
    }

    fn put_deal(&mut self, deal: Deal) {
        match self.data.deals.iter_mut().find(|d| d.id == deal.id) {
            Some(existing) => {
                debug!("Updating deal {}", deal.id);
                *existing = deal;
            }
            None => {
                debug!("Adding deal {}", deal.id);
                self.data.deals.push(deal);
            }
        }
    }

    // ── Representatives ───────────────────────────────────────────────────────

    pub fn add_rep(&mut self, mut rep: Representative) -> Result<String, ValidationError> {
        validate_rep(&rep)?;
        if rep.id.trim().is_empty() {
            rep.id = next_id("s");
        } else if self.data.representatives.iter().any(|r| r.id == rep.id) {
            return Err(ValidationError::Invalid(format!(
                "representative {} already exists",
                rep.id
            )));
        }
        let id = rep.id.clone();
        info!("Adding representative {} ({})", rep.name, rep.team);
        self.data.representatives.push(rep);
        Ok(id)
    }

    /// Replace a representative by id. A rename is carried over to every
    /// account and deal owned by that id.
    pub fn update_rep(&mut self, rep: Representative) -> Result<(), ValidationError> {
        validate_rep(&rep)?;
        let existing = self
            .data
            .representatives
            .iter_mut()
            .find(|r| r.id == rep.id)
            .ok_or_else(|| unknown(RecordKind::Representatives, &rep.id))?;

        if existing.name != rep.name {
            let mut touched = 0usize;
            for account in &mut self.data.accounts {
                if account.owner_id.as_deref() == Some(rep.id.as_str()) {
                    account.owner = Some(rep.name.clone());
                    touched += 1;
                }
            }
            for deal in &mut self.data.deals {
                if deal.owner_id.as_deref() == Some(rep.id.as_str()) {
                    deal.owner = rep.name.clone();
                    touched += 1;
                }
            }
            info!("Renamed {} to {} on {} records", existing.name, rep.name, touched);
        }
        *existing = rep;
        Ok(())
    }

    /// Ownership fields on accounts and deals are left as they are.
    pub fn delete_rep(&mut self, id: &str) -> Result<Representative, ValidationError> {
        let idx = self
            .data
            .representatives
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| unknown(RecordKind::Representatives, id))?;
        Ok(self.data.representatives.remove(idx))
    }
}

fn unknown(kind: RecordKind, id: &str) -> ValidationError {
    ValidationError::UnknownId {
        kind,
        id: id.to_string(),
    }
}
