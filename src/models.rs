use anyhow::{anyhow, Result};
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use std::fmt;
use std::str::FromStr;

use crate::store::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Recruiter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Recruiter => "recruiter",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Role::Student),
            "recruiter" => Ok(Role::Recruiter),
            _ => Err(anyhow!("Unknown role '{}'", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    FullTime,
    PartTime,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Internship => "Internship",
        }
    }
}

impl FromStr for JobType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Full-time" => Ok(JobType::FullTime),
            "Part-time" => Ok(JobType::PartTime),
            "Internship" => Ok(JobType::Internship),
            _ => Err(anyhow!("Unknown job type '{}'", s)),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(anyhow!("Unknown application status '{}'", s)),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// --- Records ---

/// A record kind that lives in one collection and maps to a BSON document
/// using the application's field names.
pub trait Record: Sized {
    const COLLECTION: Collection;

    fn to_document(&self) -> Document;
    fn from_document(doc: &Document) -> Result<Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub fullname: String,
    pub email: String,
    pub phone_number: u64,
    pub password: String, // bcrypt hash, never plaintext
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub name: String,
    pub description: String,
    pub website: String,
    pub location: String,
    pub user_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary: u32,
    pub experience_level: u32,
    pub location: String,
    pub job_type: JobType,
    pub position: u32,
    pub company: ObjectId,
    pub created_by: ObjectId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub job: ObjectId,
    pub applicant: ObjectId,
    pub status: ApplicationStatus,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn to_document(&self) -> Document {
        doc! {
            "fullname": self.fullname.as_str(),
            "email": self.email.as_str(),
            "phoneNumber": number(self.phone_number),
            "password": self.password.as_str(),
            "role": self.role.as_str(),
        }
    }

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            fullname: doc.get_str("fullname")?.to_string(),
            email: doc.get_str("email")?.to_string(),
            phone_number: read_number(doc, "phoneNumber")?,
            password: doc.get_str("password")?.to_string(),
            role: doc.get_str("role")?.parse()?,
        })
    }
}

impl Record for Company {
    const COLLECTION: Collection = Collection::Companies;

    fn to_document(&self) -> Document {
        doc! {
            "name": self.name.as_str(),
            "description": self.description.as_str(),
            "website": self.website.as_str(),
            "location": self.location.as_str(),
            "userId": self.user_id,
        }
    }

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            name: doc.get_str("name")?.to_string(),
            description: doc.get_str("description")?.to_string(),
            website: doc.get_str("website")?.to_string(),
            location: doc.get_str("location")?.to_string(),
            user_id: doc.get_object_id("userId")?,
        })
    }
}

impl Record for Job {
    const COLLECTION: Collection = Collection::Jobs;

    fn to_document(&self) -> Document {
        doc! {
            "title": self.title.as_str(),
            "description": self.description.as_str(),
            "requirements": self.requirements.clone(),
            "salary": number(self.salary.into()),
            "experienceLevel": number(self.experience_level.into()),
            "location": self.location.as_str(),
            "jobType": self.job_type.as_str(),
            "position": number(self.position.into()),
            "company": self.company,
            "created_by": self.created_by,
        }
    }

    fn from_document(doc: &Document) -> Result<Self> {
        let requirements = doc
            .get_array("requirements")?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("Job requirement is not a string: {}", item))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            title: doc.get_str("title")?.to_string(),
            description: doc.get_str("description")?.to_string(),
            requirements,
            salary: read_number(doc, "salary")?,
            experience_level: read_number(doc, "experienceLevel")?,
            location: doc.get_str("location")?.to_string(),
            job_type: doc.get_str("jobType")?.parse()?,
            position: read_number(doc, "position")?,
            company: doc.get_object_id("company")?,
            created_by: doc.get_object_id("created_by")?,
        })
    }
}

impl Record for Application {
    const COLLECTION: Collection = Collection::Applications;

    fn to_document(&self) -> Document {
        doc! {
            "job": self.job,
            "applicant": self.applicant,
            "status": self.status.as_str(),
        }
    }

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            job: doc.get_object_id("job")?,
            applicant: doc.get_object_id("applicant")?,
            status: doc.get_str("status")?.parse()?,
        })
    }
}

/// A record read back from the store together with its generated id.
#[derive(Debug, Clone)]
pub struct Stored<T> {
    pub id: ObjectId,
    pub record: T,
}

impl<T: Record> Stored<T> {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let id = doc
            .get_object_id("_id")
            .map_err(|_| anyhow!("{} document has no ObjectId _id", T::COLLECTION))?;
        let record = T::from_document(doc)
            .map_err(|e| anyhow!("Malformed {} document {}: {}", T::COLLECTION, id, e))?;
        Ok(Self { id, record })
    }
}

/// Adds the bookkeeping fields the application's models carry on every record.
pub fn stamp(mut doc: Document, at: DateTime) -> Document {
    doc.insert("createdAt", at);
    doc.insert("updatedAt", at);
    doc.insert("__v", 0i32);
    doc
}

// Smallest integer type that holds the value; doubles only past i64.
fn number(n: u64) -> Bson {
    if let Ok(small) = i32::try_from(n) {
        Bson::Int32(small)
    } else if let Ok(wide) = i64::try_from(n) {
        Bson::Int64(wide)
    } else {
        Bson::Double(n as f64)
    }
}

// Numbers may come back as int32, int64 or double depending on who wrote them.
fn read_number<T: TryFrom<i64>>(doc: &Document, key: &str) -> Result<T> {
    let value = match doc.get(key) {
        Some(Bson::Int32(n)) => *n as i64,
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Double(n)) if n.fract() == 0.0 => *n as i64,
        Some(other) => return Err(anyhow!("Field '{}' is not a whole number: {}", key, other)),
        None => return Err(anyhow!("Missing field '{}'", key)),
    };
    T::try_from(value).map_err(|_| anyhow!("Field '{}' out of range: {}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job {
            title: "Backend Developer".to_string(),
            description: "Design REST APIs.".to_string(),
            requirements: vec!["Node.js".to_string(), "JWT".to_string()],
            salary: 110000,
            experience_level: 3,
            location: "San Francisco, USA".to_string(),
            job_type: JobType::FullTime,
            position: 2,
            company: ObjectId::new(),
            created_by: ObjectId::new(),
        }
    }

    #[test]
    fn test_job_document_uses_application_field_names() {
        let job = sample_job();
        let doc = job.to_document();

        assert_eq!(doc.get_str("jobType").unwrap(), "Full-time");
        assert_eq!(doc.get_object_id("company").unwrap(), job.company);
        assert_eq!(doc.get_object_id("created_by").unwrap(), job.created_by);
        assert!(doc.contains_key("experienceLevel"));
        assert!(!doc.contains_key("job_type"));
    }

    #[test]
    fn test_numbers_are_stored_as_numbers() {
        let doc = sample_job().to_document();
        assert_eq!(doc.get("salary"), Some(&Bson::Int32(110000)));
        assert_eq!(doc.get("experienceLevel"), Some(&Bson::Int32(3)));
        assert_eq!(doc.get("position"), Some(&Bson::Int32(2)));

        let user = User {
            fullname: "Alice Johnson".to_string(),
            email: "alice@student.com".to_string(),
            phone_number: 9876543210,
            password: "$2a$04$hash".to_string(),
            role: Role::Student,
        };
        assert_eq!(user.to_document().get("phoneNumber"), Some(&Bson::Int64(9876543210)));
    }

    #[test]
    fn test_large_salary_is_widened_not_wrapped() {
        let mut job = sample_job();
        job.salary = 3_000_000_000;
        let doc = job.to_document();
        assert_eq!(doc.get("salary"), Some(&Bson::Int64(3_000_000_000)));
        assert_eq!(Job::from_document(&doc).unwrap().salary, 3_000_000_000);

        job.salary = i32::MAX as u32;
        assert_eq!(job.to_document().get("salary"), Some(&Bson::Int32(i32::MAX)));
    }

    #[test]
    fn test_read_number_accepts_doubles_written_by_other_drivers() {
        let mut doc = sample_job().to_document();
        doc.insert("salary", 90000.0f64);
        let job = Job::from_document(&doc).unwrap();
        assert_eq!(job.salary, 90000);

        doc.insert("salary", 12.5f64);
        assert!(Job::from_document(&doc).is_err());

        doc.insert("salary", -1i32);
        assert!(Job::from_document(&doc).is_err());
    }

    #[test]
    fn test_stored_requires_object_id() {
        let job = sample_job();
        let mut doc = job.to_document();
        assert!(Stored::<Job>::from_document(&doc).is_err());

        let id = ObjectId::new();
        doc.insert("_id", id);
        let stored = Stored::<Job>::from_document(&doc).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.record, job);
    }

    #[test]
    fn test_enum_parsing_rejects_unknown_values() {
        assert_eq!("recruiter".parse::<Role>().unwrap(), Role::Recruiter);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!("Internship".parse::<JobType>().unwrap(), JobType::Internship);
        assert!("full-time".parse::<JobType>().is_err());
        assert_eq!("accepted".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Accepted);
        assert!("withdrawn".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_stamp_adds_timestamps_and_version() {
        let at = DateTime::from_millis(1_700_000_000_000);
        let doc = stamp(doc! { "job": ObjectId::new() }, at);
        assert_eq!(doc.get_datetime("createdAt").unwrap(), &at);
        assert_eq!(doc.get_datetime("updatedAt").unwrap(), &at);
        assert_eq!(doc.get_i32("__v").unwrap(), 0);
    }
}
