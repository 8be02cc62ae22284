//! Demo records for an empty in-memory store.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use entity::{
    Activity, ActivityFields, ActivityKind, Contact, ContactFields, Deal, DealFields, Entity,
    Money, RecordId, Stage, encode,
};
use platform_store::{RecordStore, StoreError, StoreResult, record_id};
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub contacts: usize,
    pub deals: usize,
    pub activities: usize,
}

impl SeedSummary {
    pub fn is_empty(&self) -> bool {
        self.contacts + self.deals + self.activities == 0
    }
}

const CONTACTS: [(&str, &str, &str, &str, &str); 4] = [
    ("Maya", "Chen", "maya.chen@northwind.io", "Northwind", "VP Operations"),
    ("Jonas", "Berg", "jonas@fjordlabs.no", "Fjord Labs", "CTO"),
    ("Priya", "Raman", "priya.raman@helio.dev", "Helio Systems", "Head of Sales"),
    ("Diego", "Alvarez", "diego@cascade.mx", "Cascade Foods", "Procurement Lead"),
];

/// `(title, contact index, units, stage, probability, days until close)`
const DEALS: [(&str, usize, i64, Stage, u8, i64); 6] = [
    ("Warehouse analytics rollout", 0, 48_000, Stage::Negotiation, 70, 5),
    ("Edge sensor pilot", 1, 12_500, Stage::Proposal, 50, 21),
    ("Sales enablement seats", 2, 9_000, Stage::Qualified, 30, 3),
    ("Cold-chain monitoring", 3, 27_000, Stage::Lead, 10, 45),
    ("Support renewal", 0, 6_000, Stage::Closed, 100, -10),
    ("Fleet telemetry", 1, 18_000, Stage::Lead, 25, 60),
];

/// `(kind, contact index, deal index, subject, days ago)`
const ACTIVITIES: [(ActivityKind, usize, Option<usize>, &str, i64); 6] = [
    (ActivityKind::Call, 0, Some(0), "Pricing walkthrough", 1),
    (ActivityKind::Email, 1, Some(1), "Sent pilot proposal", 2),
    (ActivityKind::Meeting, 2, Some(2), "Discovery workshop", 4),
    (ActivityKind::Note, 3, None, "Met at trade show", 9),
    (ActivityKind::Call, 0, Some(4), "Renewal confirmed", 12),
    (ActivityKind::Email, 1, None, "Intro to solutions team", 40),
];

async fn create<E: Entity>(store: &dyn RecordStore, fields: &E::Fields) -> StoreResult<RecordId> {
    let record = encode(fields)
        .map_err(|err| StoreError::Protocol(err.to_string()))?;
    let created = store.create(E::TABLE, record).await?;
    record_id(&created)
        .ok_or_else(|| StoreError::Protocol("created record has no Id".into()))
}

/// Populates a store whose contacts table is empty.
///
/// Deal and activity tables that already hold records are left alone.
pub async fn seed_demo(store: &dyn RecordStore, now: DateTime<Utc>) -> StoreResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    let today: NaiveDate = now.date_naive();

    let mut contact_ids = Vec::new();
    if store.list(Contact::TABLE).await?.is_empty() {
        for (first, last, email, company, position) in CONTACTS {
            let fields = ContactFields {
                first_name: first.into(),
                last_name: last.into(),
                email: email.into(),
                phone: None,
                company: company.into(),
                position: Some(position.into()),
                notes: None,
            };
            contact_ids.push(create::<Contact>(store, &fields).await?);
        }
        summary.contacts = contact_ids.len();
    }
    if contact_ids.is_empty() {
        return Ok(summary);
    }

    let mut deal_ids = Vec::new();
    if store.list(Deal::TABLE).await?.is_empty() {
        for (title, contact, units, stage, probability, close_in) in DEALS {
            let fields = DealFields {
                title: title.into(),
                value: Some(Money::from_units(units)),
                stage: stage.into(),
                probability,
                expected_close_date: Some(today + Duration::days(close_in)),
                contact_id: contact_ids[contact],
                notes: None,
            };
            deal_ids.push(create::<Deal>(store, &fields).await?);
        }
        summary.deals = deal_ids.len();
    }

    if store.list(Activity::TABLE).await?.is_empty() {
        for (kind, contact, deal, subject, days_ago) in ACTIVITIES {
            let fields = ActivityFields {
                kind,
                contact_id: contact_ids[contact],
                deal_id: deal.and_then(|index| deal_ids.get(index).copied()),
                subject: subject.into(),
                notes: None,
                date: now - Duration::days(days_ago),
            };
            create::<Activity>(store, &fields).await?;
            summary.activities += 1;
        }
    }

    info!(
        contacts = summary.contacts,
        deals = summary.deals,
        activities = summary.activities,
        "seeded demo records"
    );
    Ok(summary)
}
