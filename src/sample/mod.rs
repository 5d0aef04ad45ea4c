//! Built-in sample dataset, used on first run and whenever there is nothing
//! better to show. Generation is seeded so the same reference date always
//! yields the same records.

use crate::models::{
    Account, AccountType, Dataset, Deal, DealStage, DealStatus, Grade, Representative, Role,
};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEED: u64 = 0x5EED_0011;

const GRADES: [Grade; 5] = [Grade::S, Grade::A, Grade::B, Grade::C, Grade::D];

const LOCATIONS: [&str; 9] = [
    "Gangnam-gu, Seoul",
    "Jongno-gu, Seoul",
    "Seongnam, Gyeonggi",
    "Yuseong-gu, Daejeon",
    "Haeundae-gu, Busan",
    "Songdo, Incheon",
    "Cheongju, Chungbuk",
    "Sejong",
    "Buk-gu, Gwangju",
];

const COMPANIES: [&str; 30] = [
    "Techcorp",
    "Innovate Systems",
    "Mirae Industries",
    "Hanguk University",
    "Seoul Tech University",
    "Advanced Science Institute",
    "Telecom Research Institute",
    "Software Industry Association",
    "IT Promotion Agency",
    "Samsong Electronics",
    "Lucky Electronics",
    "Hyundo Motors",
    "Skyhigh Semiconductor",
    "Greenleaf Portal",
    "Cacao Platforms",
    "Posteel",
    "Hanhwa Systems",
    "Nexus Defense",
    "Aerospace Industries",
    "Busan National University",
    "Chungnam University",
    "Machinery Research Institute",
    "Chemical Research Institute",
    "Doosan Robotics",
    "Rotem Rail",
    "Korea Telecom",
    "Pearl Games",
    "Carrot Market",
    "Toss Payments",
    "Hyper Connect",
];

fn representatives() -> Vec<Representative> {
    let rep = |id: &str, name: &str, team: &str, role: Role, email: &str, phone: &str| Representative {
        id: id.to_string(),
        name: name.to_string(),
        team: team.to_string(),
        department: "Sales Division".to_string(),
        role,
        email: email.to_string(),
        phone: Some(phone.to_string()),
    };
    vec![
        rep("s1", "Gildong Hong", "Sales Team 1", Role::Manager, "hong@example.com", "010-1234-5678"),
        rep("s2", "Young Kim", "Sales Team 2", Role::Staff, "kim@example.com", "010-2345-6789"),
        rep("s3", "Sujin Lee", "Sales Team 1", Role::Staff, "lee@example.com", "010-3456-7890"),
        rep("s4", "Director Park", "Executive Office", Role::Director, "park@example.com", "010-4567-8901"),
        rep("s5", "Sungsil Choi", "Sales Team 2", Role::Staff, "choi@example.com", "010-5678-9012"),
    ]
}

fn account_type_for(company: &str) -> AccountType {
    if company.contains("University") {
        AccountType::University
    } else if company.contains("Institute") || company.contains("Agency") {
        AccountType::Institute
    } else if company.contains("Association") {
        AccountType::Association
    } else {
        AccountType::Company
    }
}

fn date_in_year(year: i32, month0: u32, day: u32, fallback: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month0 + 1, day).unwrap_or(fallback)
}

/// Generate the sample dataset anchored on `today`'s year: every
/// representative owns 8 to 12 accounts and every account 3 to 6 deals
/// spread over the year.
pub fn dataset(today: NaiveDate) -> Dataset {
    let mut rng = StdRng::seed_from_u64(SEED);
    let year = today.year();
    let reps = representatives();

    let mut accounts = Vec::new();
    let mut idx = 0usize;
    for rep in &reps {
        let count = rng.gen_range(8..=12);
        for _ in 0..count {
            let lap = idx / COMPANIES.len();
            let company = match lap {
                0 => COMPANIES[idx % COMPANIES.len()].to_string(),
                n => format!("{} {}", COMPANIES[idx % COMPANIES.len()], n + 1),
            };
            let account_type = account_type_for(&company);
            let domain = match account_type {
                AccountType::Company => "company.com",
                _ => "org.kr",
            };
            accounts.push(Account {
                id: format!("c{}", idx + 1),
                name: format!("Contact {}", idx + 1),
                email: format!("contact{}@{}", idx + 1, domain),
                phone: format!("010-{}-{}", 1000 + idx, 2000 + idx),
                company,
                address: Some(format!(
                    "{} {}",
                    LOCATIONS[idx % LOCATIONS.len()],
                    if idx % 2 == 0 { "Techno Valley" } else { "Campus" }
                )),
                role: ["Team Lead", "Principal", "Director"][idx % 3].to_string(),
                department: rep.team.clone(),
                last_contacted: Some(date_in_year(year, today.month0(), (idx % 28) as u32 + 1, today)),
                account_type,
                grade: GRADES[idx % GRADES.len()],
                target_amount: rng.gen_range(10u64..60) * 10_000_000,
                notes: vec![
                    format!("Discuss {} business plan", year),
                    "Budget increase reported recently".to_string(),
                ],
                owner: Some(rep.name.clone()),
                owner_id: Some(rep.id.clone()),
                team: Some(rep.team.clone()),
            });
            idx += 1;
        }
    }

    let mut deals = Vec::new();
    for account in &accounts {
        let count = rng.gen_range(3..=6);
        for _ in 0..count {
            let month0 = rng.gen_range(0u32..12);
            let day = rng.gen_range(1u32..=28);
            deals.push(sample_deal(&mut rng, deals.len() + 1, account, year, month0, day, today));
        }
    }

    Dataset {
        accounts,
        deals,
        representatives: reps,
        rejected: Vec::new(),
    }
}

fn sample_deal(
    rng: &mut StdRng,
    n: usize,
    account: &Account,
    year: i32,
    month0: u32,
    day: u32,
    today: NaiveDate,
) -> Deal {
    let status = DealStatus::ALL[rng.gen_range(0..DealStatus::ALL.len())];
    let stage = match status {
        DealStatus::Sales => DealStage::Won,
        DealStatus::Confirmed => DealStage::Negotiation,
        DealStatus::Expected => DealStage::Proposal,
        DealStatus::Undecided => DealStage::Lead,
    };
    let value = rng.gen_range(5u64..25) * 5_000_000;
    let product_share = rng.gen_range(70u64..=90);
    let product_amount = value * product_share / 100;

    Deal {
        id: format!("d{}", n),
        title: format!("{} equipment delivery ({}/{})", account.company, month0 + 1, year),
        contact_id: account.id.clone(),
        product_amount,
        goods_amount: value - product_amount,
        item_details: format!(
            "Servers x{}, licenses x{}",
            rng.gen_range(1..=5),
            rng.gen_range(1..=10)
        ),
        status,
        stage,
        expected_close_date: Some(date_in_year(year, month0, day, today)),
        probability: status.default_probability(),
        owner: account.owner.clone().unwrap_or_default(),
        owner_id: account.owner_id.clone(),
        team: account.team.clone().unwrap_or_default(),
        department: "Sales Division".to_string(),
    }
}
