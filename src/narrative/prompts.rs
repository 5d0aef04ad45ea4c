//! Prompt builders. Pure functions over domain records; the wording of the
//! reply is left entirely to the generator.

use crate::models::{Account, AccountType, Deal, DealStage};
use crate::utils::fmt_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
}

impl Tone {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" | "casual" => Tone::Friendly,
            _ => Tone::Professional,
        }
    }
}

/// A request to the text generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    /// Let the generator consult web search.
    pub grounded: bool,
}

impl Prompt {
    fn plain(text: String) -> Self {
        Self { text, grounded: false }
    }
}

pub fn email_draft(contact_name: &str, company: &str, context: &str, tone: Tone) -> Prompt {
    let style = match tone {
        Tone::Professional => "polite, professional",
        Tone::Friendly => "warm, friendly",
    };
    Prompt::plain(format!(
        "Sender: sales representative\n\
         Recipient: {} ({})\n\
         Context / goal: {}\n\n\
         Write a {} email draft based on the above. Give the subject line and the body separately.",
        contact_name, company, context, style
    ))
}

pub fn deal_health(title: &str, stage: DealStage, value: u64, notes: &[String]) -> Prompt {
    Prompt::plain(format!(
        "You are a seasoned sales professional. Assess the health of this deal:\n\n\
         Deal: {}\n\
         Stage: {}\n\
         Amount: {}\n\
         Recent notes: {}\n\n\
         Reply with an assessment of at most three sentences and two concrete next actions, in this form:\n\
         [Assessment] ...\n\
         [Actions] 1. ... 2. ...",
        title,
        stage,
        fmt_amount(value),
        notes.join("; ")
    ))
}

pub fn meeting_notes(raw_notes: &str) -> Prompt {
    Prompt::plain(format!(
        "Turn these unstructured meeting notes into a clean list of Key Takeaways and Action Items:\n\n\"{}\"",
        raw_notes.trim()
    ))
}

pub fn account_grade(account: &Account, pipeline_value: u64) -> Prompt {
    let focus = match account.account_type {
        AccountType::University | AccountType::Institute => {
            "- This is an educational or research institution. Look for enrolment figures, \
             recent government research grants and research budget size.\n\
             - Consider how demographic decline or changes in public R&D budgets affect it."
        }
        AccountType::Company | AccountType::Association => {
            "- Look for recent financial statements, share price trend if listed, and new funding.\n\
             - Compare market share and competitor activity within its industry."
        }
    };
    Prompt {
        text: format!(
            "Organization: {}\n\
             Type: {}\n\
             Current pipeline value: {}\n\
             Internal notes: {}\n\n\
             [Instructions]\n\
             1. Use web search to research the organization's current situation.\n\
             {}\n\
             2. Combine the internal deal size with what you found to assign a grade.\n\n\
             [Grades]\n\
             - S: strong positive signals (ample budget, large contracts). Top priority.\n\
             - A: excellent account with high growth potential.\n\
             - B: average, expected to hold steady.\n\
             - C: visible risks (budget cuts, losses, shrinking enrolment).\n\
             - D: consider ending the relationship.\n\n\
             [Output]\n\
             Grade: [grade]\n\
             Key figures: [2-3 concrete numbers]\n\
             Analysis: [three-line summary]\n\
             Strategy: [one sentence]",
            account.company,
            account.account_type.as_str(),
            fmt_amount(pipeline_value),
            account.notes.join(", "),
            focus
        ),
        grounded: true,
    }
}

pub fn weekly_report(deals: &[Deal], accounts: &[Account]) -> Prompt {
    let lines: Vec<String> = deals
        .iter()
        .map(|d| {
            let account = accounts.iter().find(|a| a.id == d.contact_id);
            let company = account.map_or("Unknown company", |a| a.company.as_str());
            let grade = account.map_or("Unrated", |a| a.grade.as_str());
            format!(
                "- [{}] {} ({}, grade {}): total {} (product {}, goods {})",
                d.status,
                d.title,
                company,
                grade,
                fmt_amount(d.value()),
                fmt_amount(d.product_amount),
                fmt_amount(d.goods_amount)
            )
        })
        .collect();

    Prompt::plain(format!(
        "You are the sales team's assistant. Analyse the pipeline below and write this week's \
         sales strategy report for the representative, as an HTML fragment (body only).\n\n\
         [Pipeline]\n{}\n\n\
         [Guidelines]\n\
         1. Summarize by status: Sales, Confirmed, Expected, Undecided.\n\
         2. Recommend visiting or calling high-grade (S, A) accounts whose deals are still Undecided.\n\
         3. Weigh product versus goods revenue and steer effort to the more profitable deals.\n\
         4. List exactly three key action items for this week.\n\n\
         Style: skip greetings, use <h3>, <ul>, <li> and <b>, keep amounts in won (₩).",
        lines.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DealStatus, Grade};

    #[test]
    fn test_tone_parse() {
        assert_eq!(Tone::parse("Friendly"), Tone::Friendly);
        assert_eq!(Tone::parse("anything"), Tone::Professional);
    }

    #[test]
    fn test_grade_prompt_is_grounded_and_branches_on_type() {
        let mut account = Account {
            company: "Hanguk University".into(),
            account_type: AccountType::University,
            notes: vec!["budget up".into()],
            ..Default::default()
        };
        let p = account_grade(&account, 50_000_000);
        assert!(p.grounded);
        assert!(p.text.contains("enrolment figures"));
        assert!(p.text.contains("₩50,000,000"));

        account.account_type = AccountType::Company;
        assert!(account_grade(&account, 0).text.contains("financial statements"));
    }

    #[test]
    fn test_weekly_prompt_lists_every_deal() {
        let accounts = vec![Account {
            id: "c1".into(),
            company: "Acme".into(),
            grade: Grade::S,
            ..Default::default()
        }];
        let deals = vec![Deal {
            id: "d1".into(),
            title: "Servers".into(),
            contact_id: "c1".into(),
            product_amount: 800,
            goods_amount: 200,
            item_details: String::new(),
            status: DealStatus::Undecided,
            stage: DealStage::Lead,
            expected_close_date: None,
            probability: 20,
            owner: String::new(),
            owner_id: None,
            team: String::new(),
            department: String::new(),
        }];
        let p = weekly_report(&deals, &accounts);
        assert!(!p.grounded);
        assert!(p.text.contains("- [Undecided] Servers (Acme, grade S): total ₩1,000"));

        let orphan = weekly_report(&deals, &[]);
        assert!(orphan.text.contains("Unknown company, grade Unrated"));
    }
}
