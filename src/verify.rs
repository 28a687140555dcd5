use anyhow::Result;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;

use crate::fixture::Fixture;
use crate::models::{Application, Company, Job, Record, Role, Stored, User};
use crate::password;
use crate::store::{Collection, DocumentStore};

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub counts: Vec<(Collection, usize)>,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

async fn load<T: Record>(store: &dyn DocumentStore, report: &mut VerifyReport) -> Result<Vec<Stored<T>>> {
    let docs = store.find_all(T::COLLECTION).await?;
    report.counts.push((T::COLLECTION, docs.len()));

    let mut records = Vec::with_capacity(docs.len());
    for doc in &docs {
        match Stored::<T>::from_document(doc) {
            Ok(stored) => records.push(stored),
            Err(e) => report.problems.push(e.to_string()),
        }
    }
    Ok(records)
}

/// Reads the four collections back and checks them against the fixture:
/// record counts, that every reference points at a record that exists, the
/// role on each end of a reference, and the shared demo password.
pub async fn verify(store: &dyn DocumentStore, fixture: &Fixture) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();

    let users = load::<User>(store, &mut report).await?;
    let companies = load::<Company>(store, &mut report).await?;
    let jobs = load::<Job>(store, &mut report).await?;
    let applications = load::<Application>(store, &mut report).await?;

    let expected = [
        (Collection::Users, fixture.users.len()),
        (Collection::Companies, fixture.companies.len()),
        (Collection::Jobs, fixture.jobs.len()),
        (Collection::Applications, fixture.applications.len()),
    ];
    for (collection, want) in expected {
        let found = report
            .counts
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        if found != want {
            report
                .problems
                .push(format!("{} has {} record(s), expected {}", collection, found, want));
        }
    }

    let roles: HashMap<ObjectId, Role> = users.iter().map(|u| (u.id, u.record.role)).collect();
    let owners: HashMap<ObjectId, ObjectId> =
        companies.iter().map(|c| (c.id, c.record.user_id)).collect();

    for company in &companies {
        match roles.get(&company.record.user_id) {
            Some(Role::Recruiter) => {}
            Some(role) => report.problems.push(format!(
                "company '{}' is owned by a {}",
                company.record.name, role
            )),
            None => report.problems.push(format!(
                "company '{}' userId {} does not exist",
                company.record.name, company.record.user_id
            )),
        }
    }

    for job in &jobs {
        let Stored { record, .. } = job;
        if !roles.contains_key(&record.created_by) {
            report.problems.push(format!(
                "job '{}' created_by {} does not exist",
                record.title, record.created_by
            ));
        }
        match owners.get(&record.company) {
            Some(owner) if *owner == record.created_by => {}
            Some(owner) => report.problems.push(format!(
                "job '{}' created_by {} but its company is owned by {}",
                record.title, record.created_by, owner
            )),
            None => report.problems.push(format!(
                "job '{}' company {} does not exist",
                record.title, record.company
            )),
        }
    }

    let job_ids: Vec<ObjectId> = jobs.iter().map(|j| j.id).collect();
    for application in &applications {
        let Stored { id, record } = application;
        if !job_ids.contains(&record.job) {
            report
                .problems
                .push(format!("application {} job {} does not exist", id, record.job));
        }
        match roles.get(&record.applicant) {
            Some(Role::Student) => {}
            Some(role) => report
                .problems
                .push(format!("application {} applicant is a {}", id, role)),
            None => report.problems.push(format!(
                "application {} applicant {} does not exist",
                id, record.applicant
            )),
        }
    }

    if let Some(first) = users.first() {
        let hash = &first.record.password;
        if users.iter().any(|u| &u.record.password != hash) {
            report.problems.push("users do not share one password hash".to_string());
        }
        match password::verify(fixture.password, hash) {
            Ok(true) => {}
            Ok(false) => report
                .problems
                .push("password hash does not match the demo password".to_string()),
            Err(e) => report.problems.push(e.to_string()),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Loader;
    use crate::password::MIN_COST;
    use crate::store::SqliteStore;
    use mongodb::bson::doc;

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        Loader::new(Fixture::demo(), MIN_COST)
            .unwrap()
            .run(&store)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_fresh_seed_is_clean() {
        let store = seeded().await;
        let report = verify(&store, &Fixture::demo()).await.unwrap();
        assert!(report.is_clean(), "{:?}", report.problems);
        assert!(report.counts.contains(&(Collection::Applications, 7)));
    }

    #[tokio::test]
    async fn test_empty_store_reports_counts() {
        let store = SqliteStore::in_memory().unwrap();
        let report = verify(&store, &Fixture::demo()).await.unwrap();
        assert_eq!(report.problems.len(), 4);
        assert!(report.problems[0].contains("users has 0 record(s), expected 6"));
    }

    #[tokio::test]
    async fn test_dangling_company_reference() {
        let store = seeded().await;
        store.delete_all(Collection::Companies).await.unwrap();

        let report = verify(&store, &Fixture::demo()).await.unwrap();
        assert!(!report.is_clean());
        assert!(report
            .problems
            .iter()
            .any(|p| p.contains("job 'Frontend Developer' company") && p.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_foreign_hash_detected() {
        let store = seeded().await;
        let stray = doc! {
            "fullname": "Mallory",
            "email": "mallory@student.com",
            "phoneNumber": 9000000000i64,
            "password": password::hash("hunter2", MIN_COST).unwrap(),
            "role": "student",
        };
        store.insert_many(Collection::Users, vec![stray]).await.unwrap();

        let report = verify(&store, &Fixture::demo()).await.unwrap();
        assert!(report.problems.iter().any(|p| p.contains("users has 7 record(s)")));
        assert!(report.problems.iter().any(|p| p.contains("share one password hash")));
    }

    #[tokio::test]
    async fn test_malformed_document_reported() {
        let store = seeded().await;
        store
            .insert_many(Collection::Applications, vec![doc! { "status": "maybe" }])
            .await
            .unwrap();

        let report = verify(&store, &Fixture::demo()).await.unwrap();
        assert!(report.problems.iter().any(|p| p.contains("Malformed applications document")));
    }
}
