use std::collections::HashSet;

use serde_json::{Map, Value};

/// Written when the API has nothing for experience, salary or location.
pub const NOT_SPECIFIED: &str = "Not Specified";

/// One job flattened for the CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: String,
    pub title: String,
    pub company_name: String,
    pub experience: String,
    pub salary: String,
    pub location: String,
    pub tags_and_skills: String,
    pub job_description: String,
    pub jd_url: String,
    pub fetch_timestamp: String,
}

impl JobRecord {
    /// Looks a field up by its CSV column name. Unknown columns give `None`.
    pub fn field(&self, column: &str) -> Option<&str> {
        let value = match column {
            "jobId" => &self.job_id,
            "title" => &self.title,
            "companyName" => &self.company_name,
            "experience" => &self.experience,
            "salary" => &self.salary,
            "location" => &self.location,
            "tagsAndSkills" => &self.tags_and_skills,
            "jobDescription" => &self.job_description,
            "jdURL" => &self.jd_url,
            "fetchTimestamp" => &self.fetch_timestamp,
            _ => return None,
        };
        Some(value)
    }
}

/// Job ids already accepted in the current filter run. First occurrence wins.
#[derive(Debug, Default)]
pub struct SeenJobs(HashSet<String>);

impl SeenJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id had not been seen yet.
    pub fn insert(&mut self, job_id: &str) -> bool {
        self.0.insert(job_id.to_string())
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.0.contains(job_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flattens one `jobDetails` entry.
/// Returns `None` for entries that aren't objects or don't carry a usable `jobId`.
pub fn normalize_job(job: &Value, timestamp: &str) -> Option<JobRecord> {
    let job = job.as_object()?;
    let job_id = job_id(job.get("jobId")?)?;

    let mut info = PlaceholderInfo::default();
    if let Some(Value::Array(placeholders)) = job.get("placeholders") {
        info.scan(placeholders);
    }

    // Fallback for experience if the placeholders didn't have a usable one.
    if info.experience.as_deref().map_or(true, |e| e == NOT_SPECIFIED) {
        info.experience = job
            .get("experienceText")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty() && *text != NOT_SPECIFIED)
            .map(str::to_string)
            .or(info.experience.take());
    }

    Some(JobRecord {
        job_id,
        title: text_field(job, "title"),
        company_name: text_field(job, "companyName"),
        experience: info.experience.unwrap_or_else(|| NOT_SPECIFIED.into()),
        salary: info.salary.unwrap_or_else(|| NOT_SPECIFIED.into()),
        location: info.location.unwrap_or_else(|| NOT_SPECIFIED.into()),
        tags_and_skills: text_field(job, "tagsAndSkills"),
        job_description: text_field(job, "jobDescription"),
        jd_url: text_field(job, "jdURL"),
        fetch_timestamp: timestamp.into(),
    })
}

/// Normalizes every entry of a page and keeps only ids not in `seen`.
pub fn normalize_page(
    jobs: &[Value],
    timestamp: &str,
    seen: &mut SeenJobs,
) -> Vec<JobRecord> {
    jobs.iter()
        .filter_map(|job| normalize_job(job, timestamp))
        .filter(|record| seen.insert(&record.job_id))
        .collect()
}

#[derive(Debug, Default)]
struct PlaceholderInfo {
    experience: Option<String>,
    salary: Option<String>,
    location: Option<String>,
}

impl PlaceholderInfo {
    /// Later entries of the same type overwrite earlier ones.
    fn scan(&mut self, placeholders: &[Value]) {
        for item in placeholders.iter().filter_map(Value::as_object) {
            let Some(label) = item
                .get("label")
                .and_then(Value::as_str)
                .filter(|label| !label.is_empty())
            else {
                continue;
            };
            let slot = match item.get("type").and_then(Value::as_str) {
                Some("experience") => &mut self.experience,
                Some("salary") => &mut self.salary,
                Some("location") => &mut self.location,
                _ => continue,
            };
            *slot = Some(label.to_string());
        }
    }
}

fn job_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".into()),
        _ => None,
    }
}

fn text_field(job: &Map<String, Value>, key: &str) -> String {
    match job.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
