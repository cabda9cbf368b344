use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{TrackerError, TrackerResult},
    models::RecordId,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: RecordId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub employee_ids: Vec<RecordId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: RecordId,
    pub project_id: RecordId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignedProject {
    pub name: String,
    /// First task registered under the project, if any.
    pub task_id: Option<RecordId>,
}

/// What the operator may track after verifying their employee id.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub employee_id: String,
    pub employee_name: String,
    pub projects: Vec<AssignedProject>,
}

impl Assignment {
    pub fn project(&self, name: &str) -> Option<&AssignedProject> {
        self.projects.iter().find(|project| project.name == name)
    }
}

/// Read-only lookups against the recording service's directory.
#[derive(Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_employees(&self) -> TrackerResult<Vec<Employee>> {
        self.get_list("employee").await
    }

    pub async fn fetch_projects(&self) -> TrackerResult<Vec<Project>> {
        self.get_list("project").await
    }

    pub async fn fetch_tasks(&self) -> TrackerResult<Vec<Task>> {
        self.get_list("task").await
    }

    pub async fn verify(&self, employee_id: &str) -> TrackerResult<Assignment> {
        let employee_id = employee_id.trim();
        let employees = self.fetch_employees().await?;
        // Fail before the remaining lookups, as the operator sees this first.
        if !employees.iter().any(|e| e.id.to_string() == employee_id) {
            return Err(TrackerError::EmployeeNotFound(employee_id.to_string()));
        }
        let projects = self.fetch_projects().await?;
        let tasks = self.fetch_tasks().await?;
        resolve_assignment(employee_id, &employees, &projects, &tasks)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> TrackerResult<Vec<T>> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::TransportError(format!(
                "GET {url} returned {status}"
            )));
        }
        Ok(response.json().await?)
    }
}

pub fn resolve_assignment(
    employee_id: &str,
    employees: &[Employee],
    projects: &[Project],
    tasks: &[Task],
) -> TrackerResult<Assignment> {
    let employee_id = employee_id.trim();
    if employee_id.is_empty() {
        return Err(TrackerError::EmployeeNotFound(String::new()));
    }

    let employee = employees
        .iter()
        .find(|e| e.id.to_string() == employee_id)
        .ok_or_else(|| TrackerError::EmployeeNotFound(employee_id.to_string()))?;

    let projects: Vec<AssignedProject> = projects
        .iter()
        .filter(|p| p.employee_ids.iter().any(|id| id.to_string() == employee_id))
        .map(|p| AssignedProject {
            name: p.name.clone(),
            task_id: tasks
                .iter()
                .find(|t| t.project_id == p.id)
                .map(|t| t.id.clone()),
        })
        .collect();

    if projects.is_empty() {
        return Err(TrackerError::NoProjectsAssigned(employee_id.to_string()));
    }

    Ok(Assignment {
        employee_id: employee_id.to_string(),
        employee_name: employee.name.clone(),
        projects,
    })
}
