//! Initial state of a campus, built from declarative parameters.
use anyhow::Result;
use campus_core::error::CampusError;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Headcounts of a population on campus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PopulationParams {
    /// Number of people.
    pub total: usize,

    /// Number of infected people.
    pub infected: usize,

    /// Number of recovered people.
    pub recovered: usize,
}

/// A course taught on campus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CourseParams {
    /// Name of the course.
    pub name: String,

    /// Number of enrolled students.
    pub students: usize,

    /// If the course is under quarantine.
    #[serde(default)]
    pub quarantined: bool,
}

/// Parameters of the campus simulation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CampusParams {
    /// Students.
    pub students: PopulationParams,

    /// Teachers.
    pub teachers: PopulationParams,

    /// Courses, in the order of the dimensions of actions and observations.
    pub courses: Vec<CourseParams>,

    /// If the campus is shut down.
    #[serde(default)]
    pub shutdown: bool,

    /// Infection risk in the surrounding community, in `[0, 1]`.
    pub community_risk: f64,
}

impl CampusParams {
    /// Loads parameters from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let params = serde_yaml::from_reader(rdr)
            .map_err(|e| CampusError::Config(format!("Invalid campus parameters: {}", e)))?;
        Ok(params)
    }

    /// Saves parameters as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// A campus of `n_courses` courses of 25 students with no infection.
    pub fn uniform(n_courses: usize, community_risk: f64) -> Self {
        Self {
            students: PopulationParams {
                total: 25 * n_courses,
                infected: 0,
                recovered: 0,
            },
            teachers: PopulationParams {
                total: n_courses,
                infected: 0,
                recovered: 0,
            },
            courses: (1..=n_courses)
                .map(|i| CourseParams {
                    name: format!("course_{}", i),
                    students: 25,
                    quarantined: false,
                })
                .collect(),
            shutdown: false,
            community_risk,
        }
    }
}

/// Health status of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Can be infected.
    Susceptible,

    /// Infected.
    Infected,

    /// Recovered.
    Recovered,
}

fn status_list(what: &str, p: &PopulationParams) -> Result<Vec<HealthStatus>, CampusError> {
    if p.infected + p.recovered > p.total {
        return Err(CampusError::Config(format!(
            "{}: infected ({}) + recovered ({}) exceeds total ({})",
            what, p.infected, p.recovered, p.total
        )));
    }
    let susceptible = p.total - p.infected - p.recovered;
    Ok(std::iter::repeat(HealthStatus::Infected)
        .take(p.infected)
        .chain(std::iter::repeat(HealthStatus::Recovered).take(p.recovered))
        .chain(std::iter::repeat(HealthStatus::Susceptible).take(susceptible))
        .collect())
}

/// State of a campus: health of every person, courses and risk.
#[derive(Debug, Clone, PartialEq)]
pub struct CampusState {
    students: Vec<HealthStatus>,
    teachers: Vec<HealthStatus>,
    courses: Vec<CourseParams>,
    shutdown: bool,
    community_risk: f64,
}

impl CampusState {
    /// Builds the state described by `params`.
    ///
    /// Fails if infected and recovered counts exceed a total, if the
    /// community risk is out of `[0, 1]` or if there is no course.
    pub fn from_params(params: &CampusParams) -> Result<Self, CampusError> {
        if !(0.0..=1.0).contains(&params.community_risk) {
            return Err(CampusError::Config(format!(
                "community_risk must be in [0, 1], got {}",
                params.community_risk
            )));
        }
        if params.courses.is_empty() {
            return Err(CampusError::Config("No course on campus".to_string()));
        }
        Ok(Self {
            students: status_list("students", &params.students)?,
            teachers: status_list("teachers", &params.teachers)?,
            courses: params.courses.clone(),
            shutdown: params.shutdown,
            community_risk: params.community_risk,
        })
    }

    /// Number of courses.
    pub fn total_courses(&self) -> usize {
        self.courses.len()
    }

    /// Courses.
    pub fn courses(&self) -> &[CourseParams] {
        &self.courses
    }

    /// Health status of each student.
    pub fn students(&self) -> &[HealthStatus] {
        &self.students
    }

    /// Health status of each teacher.
    pub fn teachers(&self) -> &[HealthStatus] {
        &self.teachers
    }

    /// Number of infected students.
    pub fn infected_students(&self) -> usize {
        count(&self.students, HealthStatus::Infected)
    }

    /// Number of infected teachers.
    pub fn infected_teachers(&self) -> usize {
        count(&self.teachers, HealthStatus::Infected)
    }

    /// Names of the quarantined courses.
    pub fn quarantined_courses(&self) -> Vec<&str> {
        self.courses
            .iter()
            .filter(|c| c.quarantined)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// If the campus is shut down.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Community risk in `[0, 1]`.
    pub fn community_risk(&self) -> f64 {
        self.community_risk
    }

    /// Community risk discretized into `0..levels`.
    pub fn risk_level(&self, levels: usize) -> usize {
        (self.community_risk * (levels - 1) as f64).round() as usize
    }
}

fn count(xs: &[HealthStatus], status: HealthStatus) -> usize {
    xs.iter().filter(|&&s| s == status).count()
}
