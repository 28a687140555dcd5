//! The demonstration data set.
//!
//! Records refer to each other by natural key (user email, company name, job
//! title). The loader swaps those keys for the ids the store hands back.

use std::collections::{HashMap, HashSet};

use crate::error::SeedError;
use crate::models::{ApplicationStatus, JobType, Role};

#[derive(Debug, Clone)]
pub struct UserSeed {
    pub fullname: &'static str,
    pub email: &'static str,
    pub phone_number: u64,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CompanySeed {
    pub name: &'static str,
    pub description: &'static str,
    pub website: &'static str,
    pub location: &'static str,
    pub owner: &'static str, // user email
}

#[derive(Debug, Clone)]
pub struct JobSeed {
    pub title: &'static str,
    pub description: &'static str,
    pub requirements: Vec<&'static str>,
    pub salary: u32,
    pub experience_level: u32,
    pub location: &'static str,
    pub job_type: JobType,
    pub position: u32,
    pub company: &'static str,    // company name
    pub created_by: &'static str, // user email
}

#[derive(Debug, Clone)]
pub struct ApplicationSeed {
    pub job: &'static str,       // job title
    pub applicant: &'static str, // user email
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone)]
pub struct Fixture {
    /// Shared by every demo account; only its hash is stored.
    pub password: &'static str,
    pub users: Vec<UserSeed>,
    pub companies: Vec<CompanySeed>,
    pub jobs: Vec<JobSeed>,
    pub applications: Vec<ApplicationSeed>,
}

impl Fixture {
    pub fn demo() -> Self {
        let user = |fullname: &'static str, email: &'static str, phone_number: u64, role: Role| UserSeed {
            fullname,
            email,
            phone_number,
            role,
        };
        let users = vec![
            user("Alice Johnson", "alice@student.com", 9876543210, Role::Student),
            user("Bob Smith", "bob@student.com", 9123456780, Role::Student),
            user("Eve Clark", "eve@student.com", 9001122334, Role::Student),
            user("Frank Wright", "frank@student.com", 8445566778, Role::Student),
            user("Clara Recruiter", "clara@recruiter.com", 9988776655, Role::Recruiter),
            user("David Recruiter", "david@recruiter.com", 8899776655, Role::Recruiter),
        ];

        let companies = vec![
            CompanySeed {
                name: "Tech Corp",
                description: "A leading software company",
                website: "https://techcorp.com",
                location: "New York, USA",
                owner: "clara@recruiter.com",
            },
            CompanySeed {
                name: "Startup Hub",
                description: "An innovative startup accelerator",
                website: "https://startuphub.com",
                location: "San Francisco, USA",
                owner: "david@recruiter.com",
            },
            CompanySeed {
                name: "Cloud Nine",
                description: "Cloud-native solutions and services",
                website: "https://cloudnine.example",
                location: "Remote",
                owner: "clara@recruiter.com",
            },
        ];

        let jobs = vec![
            JobSeed {
                title: "Frontend Developer",
                description: "Build delightful UIs with React, Vite, Tailwind.",
                requirements: vec!["React", "Vite", "Tailwind", "JavaScript"],
                salary: 90000,
                experience_level: 2,
                location: "Remote",
                job_type: JobType::FullTime,
                position: 3,
                company: "Tech Corp",
                created_by: "clara@recruiter.com",
            },
            JobSeed {
                title: "Backend Developer",
                description: "Design REST APIs with Node.js, Express, MongoDB.",
                requirements: vec!["Node.js", "Express", "MongoDB", "JWT"],
                salary: 110000,
                experience_level: 3,
                location: "San Francisco, USA",
                job_type: JobType::FullTime,
                position: 2,
                company: "Startup Hub",
                created_by: "david@recruiter.com",
            },
            JobSeed {
                title: "UI/UX Designer",
                description: "Create user-centered designs and prototypes.",
                requirements: vec!["Figma", "Wireframing", "Prototyping"],
                salary: 80000,
                experience_level: 2,
                location: "New York, USA",
                job_type: JobType::FullTime,
                position: 1,
                company: "Tech Corp",
                created_by: "clara@recruiter.com",
            },
            JobSeed {
                title: "DevOps Engineer",
                description: "CI/CD, Docker, Kubernetes, monitoring and reliability.",
                requirements: vec!["Docker", "Kubernetes", "CI/CD", "Linux"],
                salary: 120000,
                experience_level: 4,
                location: "Remote",
                job_type: JobType::FullTime,
                position: 2,
                company: "Cloud Nine",
                created_by: "clara@recruiter.com",
            },
            JobSeed {
                title: "Software Intern",
                description: "Assist in building features across the stack.",
                requirements: vec!["JavaScript", "Git", "Eagerness to learn"],
                salary: 30000,
                experience_level: 0,
                location: "Remote",
                job_type: JobType::Internship,
                position: 4,
                company: "Startup Hub",
                created_by: "david@recruiter.com",
            },
            JobSeed {
                title: "Part-time QA Tester",
                description: "Manual testing, bug reporting, basic automation.",
                requirements: vec!["Testing", "Jest", "Cypress (nice to have)"],
                salary: 40000,
                experience_level: 1,
                location: "Remote",
                job_type: JobType::PartTime,
                position: 2,
                company: "Cloud Nine",
                created_by: "clara@recruiter.com",
            },
        ];

        let apply = |job: &'static str, applicant: &'static str, status: ApplicationStatus| ApplicationSeed {
            job,
            applicant,
            status,
        };
        let applications = vec![
            apply("Frontend Developer", "alice@student.com", ApplicationStatus::Pending),
            apply("UI/UX Designer", "alice@student.com", ApplicationStatus::Accepted),
            apply("Backend Developer", "bob@student.com", ApplicationStatus::Pending),
            apply("DevOps Engineer", "bob@student.com", ApplicationStatus::Rejected),
            apply("Software Intern", "eve@student.com", ApplicationStatus::Pending),
            apply("Part-time QA Tester", "eve@student.com", ApplicationStatus::Pending),
            apply("Frontend Developer", "frank@student.com", ApplicationStatus::Pending),
        ];

        Self {
            password: "123456",
            users,
            companies,
            jobs,
            applications,
        }
    }

    /// Checks that every natural-key reference resolves and that the roles and
    /// ownership line up, so a bad fixture fails before the store is touched.
    ///
    /// Job creators must own the job's company. The application never checked
    /// this; it is enforced here on purpose.
    pub fn validate(&self) -> Result<(), SeedError> {
        let mut problems = Vec::new();

        let mut roles: HashMap<&str, Role> = HashMap::new();
        for user in &self.users {
            if roles.insert(user.email, user.role).is_some() {
                problems.push(format!("duplicate user email '{}'", user.email));
            }
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for company in &self.companies {
            if owners.insert(company.name, company.owner).is_some() {
                problems.push(format!("duplicate company name '{}'", company.name));
            }
            match roles.get(company.owner) {
                Some(Role::Recruiter) => {}
                Some(role) => problems.push(format!(
                    "company '{}' is owned by {} who is a {}, not a recruiter",
                    company.name, company.owner, role
                )),
                None => problems.push(format!(
                    "company '{}' owner {} is not a seeded user",
                    company.name, company.owner
                )),
            }
        }

        let mut titles: HashSet<&str> = HashSet::new();
        for job in &self.jobs {
            if !titles.insert(job.title) {
                problems.push(format!("duplicate job title '{}'", job.title));
            }
            if job.position == 0 {
                problems.push(format!("job '{}' has no open positions", job.title));
            }
            if !roles.contains_key(job.created_by) {
                problems.push(format!(
                    "job '{}' creator {} is not a seeded user",
                    job.title, job.created_by
                ));
            }
            match owners.get(job.company) {
                Some(owner) if *owner == job.created_by => {}
                Some(owner) => problems.push(format!(
                    "job '{}' was created by {} but '{}' is owned by {}",
                    job.title, job.created_by, job.company, owner
                )),
                None => problems.push(format!(
                    "job '{}' references unknown company '{}'",
                    job.title, job.company
                )),
            }
        }

        for application in &self.applications {
            if !titles.contains(application.job) {
                problems.push(format!(
                    "application by {} references unknown job '{}'",
                    application.applicant, application.job
                ));
            }
            match roles.get(application.applicant) {
                Some(Role::Student) => {}
                Some(role) => problems.push(format!(
                    "applicant {} is a {}, not a student",
                    application.applicant, role
                )),
                None => problems.push(format!(
                    "applicant {} is not a seeded user",
                    application.applicant
                )),
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SeedError::Fixture(problems.join("; ")))
        }
    }
}
