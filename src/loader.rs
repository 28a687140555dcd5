use anyhow::{anyhow, Result};
use chrono::Utc;
use mongodb::bson::{oid::ObjectId, DateTime, Document};
use std::collections::HashMap;

use crate::error::{SeedError, Step};
use crate::fixture::Fixture;
use crate::models::{stamp, Application, Company, Job, Record, User};
use crate::password;
use crate::store::{Collection, DocumentStore};

/// Natural key (email, company name, job title) to the id the store generated.
type IdMap = HashMap<&'static str, ObjectId>;

#[derive(Debug, Default, Clone)]
pub struct SeedReport {
    pub cleared: Vec<(Collection, u64)>,
    pub users: usize,
    pub companies: usize,
    pub jobs: usize,
    pub applications: usize,
}

/// Replaces the four collections with the fixture, one step at a time.
///
/// Every step waits on the previous one and the first failure aborts the run.
/// Nothing is rolled back: whatever committed before the failure stays.
pub struct Loader {
    fixture: Fixture,
    bcrypt_cost: u32,
}

impl Loader {
    pub fn new(fixture: Fixture, bcrypt_cost: u32) -> Result<Self, SeedError> {
        fixture.validate()?;
        Ok(Self {
            fixture,
            bcrypt_cost,
        })
    }

    pub async fn run(&self, store: &dyn DocumentStore) -> Result<SeedReport, SeedError> {
        let now = DateTime::from_millis(Utc::now().timestamp_millis());
        let mut report = SeedReport::default();

        report.cleared = self.clear(store).await?;
        println!("Old data removed");

        // Only after the clear: stale rows could otherwise break the index build.
        store
            .ensure_indexes()
            .await
            .map_err(|e| SeedError::operation(Step::PrepareIndexes, e))?;
        println!("Indexes ready");

        let users = self
            .seed_users(store, now)
            .await
            .map_err(|e| SeedError::operation(Step::SeedUsers, e))?;
        report.users = users.len();
        println!("Users inserted ({})", report.users);

        let companies = self
            .seed_companies(store, now, &users)
            .await
            .map_err(|e| SeedError::operation(Step::SeedCompanies, e))?;
        report.companies = companies.len();
        println!("Companies inserted ({})", report.companies);

        let jobs = self
            .seed_jobs(store, now, &users, &companies)
            .await
            .map_err(|e| SeedError::operation(Step::SeedJobs, e))?;
        report.jobs = jobs.len();
        println!("Jobs inserted ({})", report.jobs);

        report.applications = self
            .seed_applications(store, now, &users, &jobs)
            .await
            .map_err(|e| SeedError::operation(Step::SeedApplications, e))?;
        println!("Applications inserted ({})", report.applications);

        Ok(report)
    }

    async fn clear(&self, store: &dyn DocumentStore) -> Result<Vec<(Collection, u64)>, SeedError> {
        let mut cleared = Vec::new();
        for collection in Collection::CLEAR_ORDER {
            let deleted = store
                .delete_all(collection)
                .await
                .map_err(|e| SeedError::operation(Step::Clear, e))?;
            log::debug!("Deleted {} document(s) from {}", deleted, collection);
            cleared.push((collection, deleted));
        }
        Ok(cleared)
    }

    async fn seed_users(&self, store: &dyn DocumentStore, now: DateTime) -> Result<IdMap> {
        // One hash shared by every demo account.
        let plaintext = self.fixture.password;
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || password::hash(plaintext, cost)).await??;

        let docs = self
            .fixture
            .users
            .iter()
            .map(|seed| User {
                fullname: seed.fullname.to_string(),
                email: seed.email.to_string(),
                phone_number: seed.phone_number,
                password: hash.clone(),
                role: seed.role,
            })
            .map(|user| stamp(user.to_document(), now))
            .collect();

        let keys = self.fixture.users.iter().map(|seed| seed.email);
        insert_keyed::<User>(store, docs, keys).await
    }

    async fn seed_companies(&self, store: &dyn DocumentStore, now: DateTime, users: &IdMap) -> Result<IdMap> {
        let docs = self
            .fixture
            .companies
            .iter()
            .map(|seed| {
                let company = Company {
                    name: seed.name.to_string(),
                    description: seed.description.to_string(),
                    website: seed.website.to_string(),
                    location: seed.location.to_string(),
                    user_id: resolve(users, seed.owner, "user")?,
                };
                Ok(stamp(company.to_document(), now))
            })
            .collect::<Result<Vec<_>>>()?;

        let keys = self.fixture.companies.iter().map(|seed| seed.name);
        insert_keyed::<Company>(store, docs, keys).await
    }

    async fn seed_jobs(
        &self,
        store: &dyn DocumentStore,
        now: DateTime,
        users: &IdMap,
        companies: &IdMap,
    ) -> Result<IdMap> {
        let docs = self
            .fixture
            .jobs
            .iter()
            .map(|seed| {
                let job = Job {
                    title: seed.title.to_string(),
                    description: seed.description.to_string(),
                    requirements: seed.requirements.iter().map(|r| r.to_string()).collect(),
                    salary: seed.salary,
                    experience_level: seed.experience_level,
                    location: seed.location.to_string(),
                    job_type: seed.job_type,
                    position: seed.position,
                    company: resolve(companies, seed.company, "company")?,
                    created_by: resolve(users, seed.created_by, "user")?,
                };
                Ok(stamp(job.to_document(), now))
            })
            .collect::<Result<Vec<_>>>()?;

        let keys = self.fixture.jobs.iter().map(|seed| seed.title);
        insert_keyed::<Job>(store, docs, keys).await
    }

    async fn seed_applications(
        &self,
        store: &dyn DocumentStore,
        now: DateTime,
        users: &IdMap,
        jobs: &IdMap,
    ) -> Result<usize> {
        let docs = self
            .fixture
            .applications
            .iter()
            .map(|seed| {
                let application = Application {
                    job: resolve(jobs, seed.job, "job")?,
                    applicant: resolve(users, seed.applicant, "user")?,
                    status: seed.status,
                };
                Ok(stamp(application.to_document(), now))
            })
            .collect::<Result<Vec<_>>>()?;

        let ids = store.insert_many(Application::COLLECTION, docs).await?;
        Ok(ids.len())
    }
}

/// Inserts one batch and pairs each generated id with the natural key of the
/// seed it came from.
async fn insert_keyed<T: Record>(
    store: &dyn DocumentStore,
    docs: Vec<Document>,
    keys: impl Iterator<Item = &'static str>,
) -> Result<IdMap> {
    let expected = docs.len();
    let ids = store.insert_many(T::COLLECTION, docs).await?;
    if ids.len() != expected {
        return Err(anyhow!(
            "{} insert returned {} id(s) for {} document(s)",
            T::COLLECTION,
            ids.len(),
            expected
        ));
    }
    log::debug!("Inserted {} {} with ids {:?}", ids.len(), T::COLLECTION, ids);
    Ok(keys.zip(ids).collect())
}

fn resolve(ids: &IdMap, key: &str, kind: &str) -> Result<ObjectId> {
    ids.get(key)
        .copied()
        .ok_or_else(|| anyhow!("No {} was inserted for '{}'", kind, key))
}
