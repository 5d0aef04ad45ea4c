mod config;
mod error;
mod metrics;
mod models;
mod narrative;
mod notify;
mod sample;
mod storage;
mod store;
mod sync;
mod utils;
mod workspace;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::metrics::{AccountSort, DashboardReport, default_individual, default_team, today_in};
use crate::models::{Account, AccountType, DealStatus, Grade, Period, Representative, Role, Scope};
use crate::narrative::NarrativeService;
use crate::narrative::prompts::Tone;
use crate::storage::LocalStore;
use crate::store::RecordStore;
use crate::sync::{ManualRefresh, Reconciler, SyncReport};
use crate::utils::{fmt_amount, fmt_millions, fmt_number};
use crate::workspace::DealDraft;

#[derive(Parser)]
#[command(name = "pipeline-tracker", about = "Sales pipeline tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Individual,
    Team,
    All,
}

#[derive(clap::Args)]
struct ScopeOpts {
    /// Reporting scope
    #[arg(short, long, value_enum, default_value = "all")]
    scope: ScopeArg,

    /// Representative id or name (individual scope)
    #[arg(long)]
    rep: Option<String>,

    /// Team name (team scope)
    #[arg(long)]
    team: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortKey {
    Company,
    Name,
    Won,
    Grade,
}

impl From<SortKey> for AccountSort {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Company => AccountSort::Company,
            SortKey::Name => AccountSort::Name,
            SortKey::Won => AccountSort::Won,
            SortKey::Grade => AccountSort::Grade,
        }
    }
}

#[derive(clap::Args)]
struct DealOpts {
    /// Sales, Confirmed, Expected or Undecided (Korean labels accepted)
    #[arg(long)]
    status: String,

    #[arg(long, default_value_t = 0)]
    product: u64,

    #[arg(long, default_value_t = 0)]
    goods: u64,

    /// Expected close date (YYYY-MM-DD), default today
    #[arg(long)]
    close_date: Option<NaiveDate>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long, default_value = "")]
    items: String,
}

#[derive(Subcommand)]
enum Command {
    /// Show KPIs, the monthly trend, grade mix and pipeline board
    Dashboard {
        #[command(flatten)]
        scope: ScopeOpts,

        /// month, quarter or year; anything else covers all dates
        #[arg(short, long, default_value = "month")]
        period: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace local data with the store's (asks first)
    Refresh {
        #[arg(short, long)]
        yes: bool,
    },

    /// Load, then refresh in the background until Ctrl-C
    Watch,

    /// Push accounts, deals and representatives to the store
    Save,

    /// Generate and mail the weekly report
    Report {
        /// Recipient address (default: reporting.recipient, then the representative's email)
        #[arg(long)]
        to: Option<String>,

        /// Representative the report is for (default: the first one)
        #[arg(long)]
        rep: Option<String>,
    },

    /// Discard stored data and start over from the sample dataset
    Reset {
        #[arg(short, long)]
        yes: bool,
    },

    /// Show collection and cache statistics
    Stats,

    /// Add an account, optionally with its first deal
    AddAccount {
        #[arg(long)]
        name: String,

        #[arg(long)]
        company: String,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long, default_value = "")]
        phone: String,

        /// Company, University, Institute or Association
        #[arg(long = "type", default_value = "Company")]
        account_type: String,

        #[arg(long, default_value = "Unrated")]
        grade: String,

        /// Annual target
        #[arg(long, default_value_t = 0)]
        target: u64,

        /// Owning representative id or name
        #[arg(long)]
        owner: Option<String>,

        /// Also create a first deal with this status
        #[arg(long)]
        deal_status: Option<String>,

        #[arg(long, default_value_t = 0)]
        product: u64,

        #[arg(long, default_value_t = 0)]
        goods: u64,

        #[arg(long)]
        close_date: Option<NaiveDate>,
    },

    /// List accounts with their deal totals
    Accounts {
        #[command(flatten)]
        scope: ScopeOpts,

        /// Substring of name, company or email
        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_enum)]
        sort: Option<SortKey>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Also list each account's deals
        #[arg(long)]
        deals: bool,

        #[arg(long)]
        json: bool,
    },

    /// Edit an account; deal flags add a deal, or edit the one given by --deal-id
    UpdateAccount {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long = "type")]
        account_type: Option<String>,

        #[arg(long)]
        grade: Option<String>,

        #[arg(long)]
        target: Option<u64>,

        /// New owning representative id or name
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        deal_id: Option<String>,

        #[arg(long)]
        deal_status: Option<String>,

        #[arg(long)]
        product: Option<u64>,

        #[arg(long)]
        goods: Option<u64>,

        #[arg(long)]
        close_date: Option<NaiveDate>,
    },

    /// Delete an account and all of its deals
    DeleteAccount {
        id: String,

        #[arg(short, long)]
        yes: bool,
    },

    /// Append a note to an account's history
    Note { account: String, text: String },

    /// Add a deal to an account, or update one with --id
    AddDeal {
        #[arg(long)]
        account: String,

        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        deal: DealOpts,
    },

    /// Delete a single deal
    DeleteDeal {
        id: String,

        #[arg(short, long)]
        yes: bool,
    },

    /// Add a representative
    AddRep {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "Sales Team 1")]
        team: String,

        #[arg(long, default_value = "staff")]
        role: String,

        #[arg(long, default_value = "Sales Division")]
        department: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Rename or move a representative; owned records follow the rename
    UpdateRep {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        team: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Delete a representative
    DeleteRep {
        id: String,

        #[arg(short, long)]
        yes: bool,
    },

    /// Generated narratives
    Narrate {
        #[command(subcommand)]
        what: NarrateCommand,
    },
}

#[derive(Subcommand)]
enum NarrateCommand {
    /// Draft an email to an account's contact
    Email {
        account: String,

        #[arg(long)]
        context: String,

        /// professional or friendly
        #[arg(long, default_value = "professional")]
        tone: String,
    },

    /// Assess a deal's health
    Deal { id: String },

    /// Summarize raw meeting notes
    Notes { text: String },

    /// Assess an account's grade with web search
    Grade { account: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "pipeline_tracker=info,warn",
        1 => "pipeline_tracker=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let today = today_in(config.reporting.utc_offset_minutes);

    match cli.command {
        Command::Dashboard { scope, period, json } => {
            let r = load(&config, today).await?;
            let ws = r.workspace();
            let ws = ws.read().await;
            let selected = resolve_scope(&scope, ws.representatives());
            let report = DashboardReport::build(ws.data(), &selected, Period::parse(&period), today);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_dashboard(&report);
            }
        }

        Command::Refresh { yes } => {
            let _t = utils::Timer::start("Manual refresh");
            let r = load(&config, today).await?;
            let outcome = r
                .refresh_manual(|| {
                    confirm(yes, "Overwrite local data with the store's copy?")
                })
                .await?;
            match outcome {
                ManualRefresh::Applied(report) => {
                    log_report(&report);
                    print_counts(&r).await;
                }
                ManualRefresh::Cancelled => println!("Refresh cancelled."),
            }
        }

        Command::Watch => {
            let r = Arc::new(load(&config, today).await?);
            print_counts(&r).await;
            let every = Duration::from_secs(config.sync.refresh_interval_secs.max(1));
            info!("Refreshing every {:?}; Ctrl-C to stop", every);
            let handle = Arc::clone(&r).spawn_periodic(every);
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            handle.abort();
            info!("Stopped");
        }

        Command::Save => {
            let _t = utils::Timer::start("Save");
            let r = load(&config, today).await?;
            persist(&r).await?;
        }

        Command::Report { to, rep } => {
            let _t = utils::Timer::start("Weekly report");
            let r = load(&config, today).await?;
            let ws = r.workspace();
            let ws = ws.read().await;

            let reps = ws.representatives();
            let user = match rep.as_deref() {
                Some(key) => Some(find_rep(reps, key).ok_or_else(|| anyhow!("no representative {}", key))?),
                None => reps.first(),
            };
            let scope = user.map(Scope::representative).unwrap_or(Scope::All);
            let recipient = to
                .or_else(|| config.reporting.recipient.clone())
                .or_else(|| user.map(|u| u.email.clone()))
                .ok_or_else(|| anyhow!("no recipient: pass --to or set reporting.recipient"))?;

            let kpis = DashboardReport::build(ws.data(), &scope, Period::Month, today);
            let narrative = NarrativeService::from_config(&config)?;
            let notifier = notify::connect(&config)?;
            let sent =
                narrative::send_weekly_report(&narrative, notifier.as_ref(), ws.data(), &kpis, &recipient).await?;
            println!(
                "Sent {:?} to {}{}",
                sent.subject,
                sent.recipient,
                if sent.fallback { " (KPI summary only)" } else { "" }
            );
        }

        Command::Reset { yes } => {
            if !confirm(yes, "Discard all data and restore the sample dataset?") {
                println!("Reset cancelled.");
                return Ok(());
            }
            let r = Reconciler::new(store::connect(&config)?, today);
            r.reset_to_sample().await?;
            print_counts(&r).await;
            println!("Run `pipeline-tracker save` to push the sample to a remote store.");
        }

        Command::Stats => {
            let local = match config.store.remote_url.as_deref().filter(|u| !u.trim().is_empty()) {
                Some(_) => None,
                None => Some(Arc::new(
                    LocalStore::open(&config.cache.db_path, &config.cache.cache_key)?
                        .with_reference_date(today),
                )),
            };
            let store: Arc<dyn RecordStore> = match &local {
                Some(l) => l.clone() as Arc<dyn RecordStore>,
                None => store::connect(&config)?,
            };
            let r = Reconciler::new(store, today);
            r.load_initial().await?;

            let ws = r.workspace();
            let ws = ws.read().await;
            println!("─────────────────────────────────");
            println!("  Pipeline tracker: {} store", r.store_name());
            println!("─────────────────────────────────");
            println!("  Accounts        : {}", fmt_number(ws.accounts().len() as u64));
            println!("  Deals           : {}", fmt_number(ws.deals().len() as u64));
            println!("  Representatives : {}", fmt_number(ws.representatives().len() as u64));
            println!("  Teams           : {}", metrics::teams(ws.representatives()).join(", "));
            println!("  Unreadable rows : {}", ws.data().rejected.len());
            if let Some(local) = &local {
                println!("  Cache key       : {}", config.cache.cache_key);
                for e in local.entries()? {
                    println!("    {:<16}{:>6} rows  saved {}", e.kind, e.rows, e.saved_at);
                }
            }
            println!("─────────────────────────────────");
        }

        Command::AddAccount {
            name,
            company,
            email,
            phone,
            account_type,
            grade,
            target,
            owner,
            deal_status,
            product,
            goods,
            close_date,
        } => {
            let r = load(&config, today).await?;
            let id = {
                let ws = r.workspace();
                let mut ws = ws.write().await;
                let owner = match owner.as_deref() {
                    Some(key) => Some(
                        find_rep(ws.representatives(), key)
                            .cloned()
                            .ok_or_else(|| anyhow!("no representative {}", key))?,
                    ),
                    None => None,
                };
                let account = Account {
                    name,
                    company,
                    email,
                    phone,
                    account_type: account_type.parse::<AccountType>()?,
                    grade: grade.parse::<Grade>()?,
                    target_amount: target,
                    department: owner.as_ref().map(|o| o.team.clone()).unwrap_or_default(),
                    last_contacted: Some(today),
                    owner: owner.as_ref().map(|o| o.name.clone()),
                    owner_id: owner.as_ref().map(|o| o.id.clone()),
                    team: owner.as_ref().map(|o| o.team.clone()),
                    ..Default::default()
                };
                let deal = match deal_status {
                    Some(status) => Some(
                        DealDraft::new(status.parse::<DealStatus>()?, close_date.unwrap_or(today))
                            .amounts(product, goods),
                    ),
                    None => None,
                };
                ws.add_account(account, deal)?
            };
            println!("Added account {}", id);
            persist(&r).await?;
        }

        Command::Accounts {
            scope,
            search,
            sort,
            desc,
            deals,
            json,
        } => {
            let r = load(&config, today).await?;
            let ws = r.workspace();
            let ws = ws.read().await;
            let selected = resolve_scope(&scope, ws.representatives());
            let rows = metrics::account_list(
                ws.accounts(),
                ws.deals(),
                &selected,
                search.as_deref(),
                sort.map(AccountSort::from),
                desc,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!(
                    "  {:<22}{:<18}{:<22}{:<8}{:>6}{:>18}",
                    "Id", "Name", "Company", "Grade", "Deals", "Won"
                );
                for row in &rows {
                    println!(
                        "  {:<22}{:<18}{:<22}{:<8}{:>6}{:>18}",
                        row.id,
                        row.name,
                        row.company,
                        row.grade.as_str(),
                        row.deal_count,
                        fmt_amount(row.won())
                    );
                    if deals {
                        for d in ws.deals().iter().filter(|d| d.contact_id == row.id) {
                            println!(
                                "      {:<22}{:<10}{:<12}{:>18}  {}",
                                d.id,
                                d.status.as_str(),
                                d.stage.as_str(),
                                fmt_amount(d.value()),
                                d.expected_close_date.map(|c| c.to_string()).unwrap_or_default()
                            );
                        }
                    }
                }
                println!("  {} accounts", rows.len());
            }
        }

        Command::UpdateAccount {
            id,
            name,
            company,
            email,
            phone,
            account_type,
            grade,
            target,
            owner,
            deal_id,
            deal_status,
            product,
            goods,
            close_date,
        } => {
            let r = load(&config, today).await?;
            {
                let ws = r.workspace();
                let mut ws = ws.write().await;
                let mut account = ws
                    .account(&id)
                    .cloned()
                    .ok_or_else(|| anyhow!("no account {}", id))?;
                if let Some(v) = name {
                    account.name = v;
                }
                if let Some(v) = company {
                    account.company = v;
                }
                if let Some(v) = email {
                    account.email = v;
                }
                if let Some(v) = phone {
                    account.phone = v;
                }
                if let Some(v) = account_type {
                    account.account_type = v.parse::<AccountType>()?;
                }
                if let Some(v) = grade {
                    account.grade = v.parse::<Grade>()?;
                }
                if let Some(v) = target {
                    account.target_amount = v;
                }
                if let Some(key) = owner.as_deref() {
                    let rep = find_rep(ws.representatives(), key)
                        .ok_or_else(|| anyhow!("no representative {}", key))?;
                    account.owner = Some(rep.name.clone());
                    account.owner_id = Some(rep.id.clone());
                    account.team = Some(rep.team.clone());
                }

                let wants_deal = deal_id.is_some()
                    || deal_status.is_some()
                    || product.is_some()
                    || goods.is_some()
                    || close_date.is_some();
                let draft = if wants_deal {
                    let existing = match deal_id.as_deref() {
                        Some(did) => Some(
                            ws.deals()
                                .iter()
                                .find(|d| d.id == did && d.contact_id == account.id)
                                .ok_or_else(|| anyhow!("account {} has no deal {}", account.id, did))?,
                        ),
                        None => None,
                    };
                    let status = match (deal_status.as_deref(), existing) {
                        (Some(s), _) => s.parse::<DealStatus>()?,
                        (None, Some(d)) => d.status,
                        (None, None) => return Err(anyhow!("a new deal needs --deal-status")),
                    };
                    let close = close_date
                        .or_else(|| existing.and_then(|d| d.expected_close_date))
                        .unwrap_or(today);
                    let mut draft = DealDraft::new(status, close).amounts(
                        product.or(existing.map(|d| d.product_amount)).unwrap_or(0),
                        goods.or(existing.map(|d| d.goods_amount)).unwrap_or(0),
                    );
                    if let Some(d) = existing {
                        draft.id = Some(d.id.clone());
                        draft.title = Some(d.title.clone());
                        draft.item_details = d.item_details.clone();
                        if deal_status.is_none() {
                            draft.stage = Some(d.stage);
                            draft.probability = Some(d.probability);
                        }
                    }
                    Some(draft)
                } else {
                    None
                };
                ws.update_account(account, draft)?;
            }
            println!("Updated account {}", id);
            persist(&r).await?;
        }

        Command::DeleteAccount { id, yes } => {
            let r = load(&config, today).await?;
            if !confirm(yes, &format!("Delete account {} and all of its deals?", id)) {
                println!("Delete cancelled.");
                return Ok(());
            }
            let removed = r.workspace().write().await.delete_account(&id)?;
            println!("Deleted account {} and {} deals", id, removed);
            persist(&r).await?;
        }

        Command::Note { account, text } => {
            let r = load(&config, today).await?;
            r.workspace().write().await.append_note(&account, &text)?;
            persist(&r).await?;
        }

        Command::AddDeal { account, id, deal } => {
            let r = load(&config, today).await?;
            let mut draft = DealDraft::new(deal.status.parse::<DealStatus>()?, deal.close_date.unwrap_or(today))
                .amounts(deal.product, deal.goods);
            draft.id = id;
            draft.title = deal.title;
            draft.item_details = deal.items;
            let id = r.workspace().write().await.upsert_deal(&account, draft)?;
            println!("Saved deal {}", id);
            persist(&r).await?;
        }

        Command::DeleteDeal { id, yes } => {
            let r = load(&config, today).await?;
            if !confirm(yes, &format!("Delete deal {}?", id)) {
                println!("Delete cancelled.");
                return Ok(());
            }
            r.workspace().write().await.delete_deal(&id)?;
            println!("Deleted deal {}", id);
            persist(&r).await?;
        }

        Command::AddRep {
            name,
            email,
            team,
            role,
            department,
            phone,
        } => {
            let r = load(&config, today).await?;
            let rep = Representative {
                id: String::new(),
                name,
                team,
                department,
                role: role.parse::<Role>()?,
                email,
                phone,
            };
            let id = r.workspace().write().await.add_rep(rep)?;
            println!("Added representative {}", id);
            persist(&r).await?;
        }

        Command::UpdateRep { id, name, team, email } => {
            let r = load(&config, today).await?;
            {
                let ws = r.workspace();
                let mut ws = ws.write().await;
                let mut rep = ws
                    .representatives()
                    .iter()
                    .find(|rep| rep.id == id)
                    .cloned()
                    .ok_or_else(|| anyhow!("no representative {}", id))?;
                if let Some(name) = name {
                    rep.name = name;
                }
                if let Some(team) = team {
                    rep.team = team;
                }
                if let Some(email) = email {
                    rep.email = email;
                }
                ws.update_rep(rep)?;
            }
            persist(&r).await?;
        }

        Command::DeleteRep { id, yes } => {
            let r = load(&config, today).await?;
            if !confirm(yes, &format!("Delete representative {}?", id)) {
                println!("Delete cancelled.");
                return Ok(());
            }
            let rep = r.workspace().write().await.delete_rep(&id)?;
            println!("Deleted representative {} ({})", rep.name, rep.id);
            persist(&r).await?;
        }

        Command::Narrate { what } => {
            let narrative = NarrativeService::from_config(&config)?;
            let text = match what {
                NarrateCommand::Notes { text } => narrative.meeting_notes(&text).await,
                NarrateCommand::Email { account, context, tone } => {
                    let r = load(&config, today).await?;
                    let ws = r.workspace();
                    let ws = ws.read().await;
                    let a = ws.account(&account).ok_or_else(|| anyhow!("no account {}", account))?;
                    narrative
                        .email_draft(&a.name, &a.company, &context, Tone::parse(&tone))
                        .await
                }
                NarrateCommand::Deal { id } => {
                    let r = load(&config, today).await?;
                    let ws = r.workspace();
                    let ws = ws.read().await;
                    let deal = ws
                        .deals()
                        .iter()
                        .find(|d| d.id == id)
                        .ok_or_else(|| anyhow!("no deal {}", id))?;
                    let notes = ws.account(&deal.contact_id).map(|a| a.notes.clone()).unwrap_or_default();
                    narrative.deal_health(deal, &notes).await
                }
                NarrateCommand::Grade { account } => {
                    let r = load(&config, today).await?;
                    let ws = r.workspace();
                    let ws = ws.read().await;
                    let a = ws.account(&account).ok_or_else(|| anyhow!("no account {}", account))?;
                    let value = metrics::aggregate::account_rollup(&a.id, ws.deals()).total();
                    narrative.account_grade(a, value).await
                }
            };
            println!("{}", text);
        }
    }

    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn load(config: &AppConfig, today: NaiveDate) -> Result<Reconciler> {
    let r = Reconciler::new(store::connect(config)?, today);
    let report = r.load_initial().await?;
    log_report(&report);
    Ok(r)
}

async fn persist(r: &Reconciler) -> Result<()> {
    match r.save().await {
        Ok(written) => {
            println!("Saved {} to the {} store.", kinds(&written), r.store_name());
            Ok(())
        }
        Err(e) => {
            let committed = e.committed();
            if !committed.is_empty() {
                warn!("Already written before the failure: {}", kinds(committed));
            }
            Err(anyhow!(e).context("Save failed; run `pipeline-tracker save` to retry the full save"))
        }
    }
}

fn kinds(kinds: &[models::RecordKind]) -> String {
    kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
}

fn log_report(report: &SyncReport) {
    if report.seeded {
        info!("Started from the sample dataset");
    }
    if !report.kept.is_empty() {
        info!("Kept local {}", kinds(&report.kept));
    }
    if report.rejected > 0 {
        warn!("{} stored rows could not be read; see earlier warnings", report.rejected);
    }
}

fn confirm(assume_yes: bool, prompt: &str) -> bool {
    assume_yes
        || Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
}

fn find_rep<'a>(reps: &'a [Representative], key: &str) -> Option<&'a Representative> {
    reps.iter()
        .find(|r| r.id == key)
        .or_else(|| reps.iter().find(|r| r.name == key))
}

fn resolve_scope(opts: &ScopeOpts, reps: &[Representative]) -> Scope {
    match opts.scope {
        ScopeArg::All => Scope::All,
        ScopeArg::Individual => match opts.rep.as_deref() {
            Some(key) => find_rep(reps, key)
                .map(Scope::representative)
                .unwrap_or_else(|| Scope::individual(key)),
            None => default_individual(reps),
        },
        ScopeArg::Team => match opts.team.as_deref() {
            Some(team) => Scope::Team(team.to_string()),
            None => default_team(reps),
        },
    }
}

async fn print_counts(r: &Reconciler) {
    let ws = r.workspace();
    let ws = ws.read().await;
    println!(
        "{} accounts, {} deals, {} representatives",
        ws.accounts().len(),
        ws.deals().len(),
        ws.representatives().len()
    );
}

fn print_dashboard(report: &DashboardReport) {
    println!("─────────────────────────────────────────────");
    for line in report.summary_lines() {
        println!("  {}", line);
    }
    println!("  Accounts in scope: {}", report.account_count);
    println!("─────────────────────────────────────────────");
    println!("  {:<5}{:>10}{:>10}{:>10}{:>10}", "Month", "Sales", "Confirmed", "Expected", "Undecided");
    for (i, m) in report.monthly.iter().enumerate() {
        println!(
            "  {:<5}{:>10}{:>10}{:>10}{:>10}",
            i + 1,
            fmt_millions(m.performance),
            fmt_millions(m.confirmed),
            fmt_millions(m.expected),
            fmt_millions(m.undecided)
        );
    }
    println!("─────────────────────────────────────────────");
    println!("  Target by grade:");
    for slice in &report.grades {
        println!("    {:<8}{:>18}", slice.grade.as_str(), fmt_amount(slice.amount));
    }
    println!("  Pipeline board:");
    for col in &report.board {
        println!("    {:<12}{:>4} deals {:>18}", col.stage.as_str(), col.count, fmt_amount(col.value));
    }
    println!("─────────────────────────────────────────────");
}
