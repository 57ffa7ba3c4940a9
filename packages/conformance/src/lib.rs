//! Shared fixtures for the graphdoc conformance test suite.
//!
//! Provides a small domain (people who work for companies and have friends)
//! with its [`Resource`] declarations, generators for collections of it, and
//! [`init_tracing`] so failing tests can be rerun with engine logs.

use graphdoc::{Resource, ResourceBuilder};
use rand::Rng;

/// The request URL most tests serialize against.
pub const DEFAULT_URL: &str = "http://example.com/api/people";

/// Where a company operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LocationType {
    National = 0,
    International = 1,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub location: LocationType,
    pub number_of_employees: u32,
}

impl Company {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Awesome Inc.".into(),
            location: LocationType::National,
            number_of_employees: 24,
        }
    }
}

/// `location` is exposed as its discriminant, so converters can name it.
impl Resource for Company {
    fn describe(r: &mut ResourceBuilder<Self>) {
        r.type_name("company").url_path("corporations").id(|c| c.id.clone());
        r.attribute("name", |c| c.name.clone());
        r.attribute("location", |c| c.location as u8);
        r.attribute("number-of-employees", |c| c.number_of_employees);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub job: Option<Company>,
    pub friends: Vec<Person>,
}

impl Person {
    /// A person with every field filled in and no friends.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            first_name: "Jean-Luc".into(),
            last_name: "Picard".into(),
            age: 59,
            job: Some(Company::new("456")),
            friends: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn with_job(mut self, job: Option<Company>) -> Self {
        self.job = job;
        self
    }

    pub fn with_friends(mut self, friends: Vec<Person>) -> Self {
        self.friends = friends;
        self
    }
}

impl Resource for Person {
    fn describe(r: &mut ResourceBuilder<Self>) {
        r.type_name("person").url_path("people").id(|p| p.identifier.clone());
        r.attribute("first-name", |p| p.first_name.clone());
        r.attribute("last-name", |p| p.last_name.clone());
        r.attribute("age", |p| p.age);
        r.to_one("job", |p| p.job.as_ref());
        r.to_many("friends", |p| p.friends.iter().collect());
    }
}

/// A person whose friends are only linked, never included.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquaintance(pub Person);

impl Resource for Acquaintance {
    fn describe(r: &mut ResourceBuilder<Self>) {
        r.type_name("acquaintance").id(|a| a.0.identifier.clone());
        r.attribute("first-name", |a| a.0.first_name.clone());
        r.to_many("friends", |a| a.0.friends.iter().collect())
            .linkage_only();
    }
}

/// `count` people with ids `"1"..="count"` and random ages below 80.
///
/// With more than 80 people some ages are guaranteed to repeat, which is
/// what tie-breaking tests need.
pub fn people(count: usize) -> Vec<Person> {
    let mut rng = rand::thread_rng();
    (1..=count)
        .map(|i| Person::new(i.to_string()).with_age(rng.gen_range(0..80)))
        .collect()
}

/// `count` people with ids `"1"..="count"` and ages derived from the id.
pub fn people_not_random(count: usize) -> Vec<Person> {
    (1..=count)
        .map(|i| Person::new(i.to_string()).with_age((i * 7 % 80) as u32))
        .collect()
}

/// Install a `fmt` subscriber honoring `RUST_LOG`, defaulting to engine
/// debug logs. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphdoc=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
