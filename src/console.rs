//! Line-oriented front end: verify an employee, pick a project, start/stop.

use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

use crate::{
    error::{TrackerError, TrackerResult},
    models::{SessionIdentity, TimeReport},
    reporting::{Assignment, DirectoryClient},
    timer::{SessionTracker, TrackerStatus},
};

const HELP: &str = "\
commands:
  verify <employee-id>   look up the employee and their projects
  projects               list assigned projects
  start <project name>   start tracking the project's task
  stop                   stop tracking and send the time report
  status                 show elapsed time
  quit                   stop (if tracking) and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Verify(String),
    Projects,
    Start(String),
    Stop,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match (word.to_ascii_lowercase().as_str(), rest) {
            ("verify", id) if !id.is_empty() => Some(Command::Verify(id.to_string())),
            ("projects", "") => Some(Command::Projects),
            ("start", project) if !project.is_empty() => Some(Command::Start(project.to_string())),
            ("stop", "") => Some(Command::Stop),
            ("status", "") => Some(Command::Status),
            ("help" | "?", "") => Some(Command::Help),
            ("quit" | "exit", "") => Some(Command::Quit),
            _ => None,
        }
    }
}

pub struct Console {
    tracker: SessionTracker,
    directory: DirectoryClient,
    assignment: Option<Assignment>,
    notice_tx: mpsc::UnboundedSender<String>,
    notice_rx: mpsc::UnboundedReceiver<String>,
    stopping: Vec<JoinHandle<()>>,
}

impl Console {
    pub fn new(tracker: SessionTracker, directory: DirectoryClient) -> Self {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        Self {
            tracker,
            directory,
            assignment: None,
            notice_tx,
            notice_rx,
            stopping: Vec::new(),
        }
    }

    /// Waits for the outcome of a background stop.
    pub async fn next_notice(&mut self) -> Option<String> {
        self.notice_rx.recv().await
    }

    /// Runs one command and returns the text to show the operator.
    pub async fn handle(&mut self, command: Command) -> String {
        match command {
            Command::Verify(id) => self.verify(&id).await,
            Command::Projects => match &self.assignment {
                Some(assignment) => list_projects(assignment),
                None => "Verify your employee id first.".into(),
            },
            Command::Start(project) => self.start(&project).await,
            Command::Stop => self.stop().await,
            Command::Status => {
                let snapshot = self.tracker.snapshot().await;
                match (snapshot.status, snapshot.identity) {
                    (TrackerStatus::Active, Some(identity)) => format!(
                        "Tracking: {}s ({})",
                        snapshot.elapsed_secs, identity.project_name
                    ),
                    _ => "Timer: 0s (idle)".into(),
                }
            }
            Command::Help => HELP.into(),
            Command::Quit => self.quit().await,
        }
    }

    async fn verify(&mut self, employee_id: &str) -> String {
        if self.tracker.status().await == TrackerStatus::Active {
            return "Stop the current session before verifying another employee.".into();
        }
        match self.directory.verify(employee_id).await {
            Ok(assignment) => {
                let text = format!(
                    "Welcome {}.\n{}",
                    assignment.employee_name,
                    list_projects(&assignment)
                );
                self.assignment = Some(assignment);
                text
            }
            Err(TrackerError::EmployeeNotFound(_)) => "Employee ID not found!".into(),
            Err(TrackerError::NoProjectsAssigned(_)) => {
                "No projects assigned to this Employee ID".into()
            }
            Err(err) => format!("API Error: {err}"),
        }
    }

    async fn start(&mut self, project_name: &str) -> String {
        let Some(assignment) = &self.assignment else {
            return "Verify your employee id first.".into();
        };
        let Some(project) = assignment.project(project_name) else {
            return format!("'{project_name}' is not one of your projects.");
        };

        let identity = SessionIdentity::new(
            assignment.employee_id.clone(),
            assignment.employee_name.clone(),
            project.name.clone(),
            project.task_id.clone(),
        );
        match self.tracker.start(identity).await {
            Ok(_) => format!("Tracking started on {}.", project.name),
            Err(TrackerError::InvalidState(_)) => "A session is already being tracked.".into(),
            Err(err) => format!("Could not start: {err}"),
        }
    }

    /// Hands the stop sequence to a task; its outcome arrives as a notice.
    async fn stop(&mut self) -> String {
        let Some(identity) = self.tracker.snapshot().await.identity else {
            return "No active session.".into();
        };
        let tracker = self.tracker.clone();
        let notices = self.notice_tx.clone();
        self.stopping.retain(|handle| !handle.is_finished());
        self.stopping.push(tokio::spawn(async move {
            let _ = notices.send(stop_outcome(tracker.stop(identity).await));
        }));
        "Stopping, sending the time report...".into()
    }

    /// Finishes any background stop, then stops an active session inline.
    async fn quit(&mut self) -> String {
        let mut lines = Vec::new();
        for handle in self.stopping.drain(..) {
            if let Err(err) = handle.await {
                lines.push(format!("Could not stop: {err}"));
            }
        }
        while let Ok(notice) = self.notice_rx.try_recv() {
            lines.push(notice);
        }
        if let Some(identity) = self.tracker.snapshot().await.identity {
            lines.push(stop_outcome(self.tracker.stop(identity).await));
        }

        if lines.is_empty() {
            "No active session.".into()
        } else {
            lines.join("\n")
        }
    }
}

fn stop_outcome(result: TrackerResult<Option<TimeReport>>) -> String {
    match result {
        Ok(Some(report)) => format!("Stopped after {}s.", report.duration_seconds),
        Ok(None) => "No active session.".into(),
        Err(err) => format!("Could not stop: {err}"),
    }
}

fn list_projects(assignment: &Assignment) -> String {
    let names: Vec<&str> = assignment
        .projects
        .iter()
        .map(|project| project.name.as_str())
        .collect();
    format!("Projects: {}", names.join(", "))
}

/// Reads commands from stdin until `quit`, EOF or Ctrl-C. An active session
/// is stopped (and reported) on the way out.
pub async fn run_console(mut console: Console) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(format!("{HELP}\n> ").as_bytes()).await?;
    stdout.flush().await?;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
            Some(notice) = console.next_notice() => {
                stdout.write_all(format!("\n{notice}\n> ").as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }
        };
        let Some(line) = line else {
            let farewell = console.handle(Command::Quit).await;
            stdout.write_all(format!("\n{farewell}\n").as_bytes()).await?;
            return Ok(());
        };
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }

        let Some(command) = Command::parse(&line) else {
            stdout
                .write_all(b"Unknown command, type 'help'.\n> ")
                .await?;
            stdout.flush().await?;
            continue;
        };

        let quitting = command == Command::Quit;
        let output = console.handle(command).await;
        stdout.write_all(format!("{output}\n").as_bytes()).await?;
        if quitting {
            return Ok(());
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaptureEvent, NetworkIdentity};
    use crate::network::IdentityResolver;
    use crate::reporting::Reporter;
    use crate::sensing::capture::tests::FakeScreen;
    use crate::settings::AgentSettings;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds every time report until `release` is notified.
    #[derive(Default)]
    struct GatedReporter {
        release: Notify,
    }

    #[async_trait]
    impl Reporter for GatedReporter {
        async fn upload_screenshot(&self, _event: &CaptureEvent) -> TrackerResult<()> {
            Ok(())
        }

        async fn send_time_report(&self, _report: &TimeReport) -> TrackerResult<()> {
            self.release.notified().await;
            Ok(())
        }
    }

    struct Loopback;

    impl IdentityResolver for Loopback {
        fn resolve(&self) -> NetworkIdentity {
            NetworkIdentity {
                ip: "127.0.0.1".into(),
                mac: "00:00:00:00:00:00".into(),
            }
        }
    }

    async fn tracking_console(reporter: Arc<GatedReporter>) -> Console {
        let tracker = SessionTracker::new(
            Arc::new(FakeScreen::default()),
            reporter,
            Arc::new(Loopback),
            &AgentSettings::default(),
        );
        tracker
            .start(SessionIdentity::new("E1", "Alice", "ProjA", None))
            .await
            .unwrap();
        let directory = DirectoryClient::new(reqwest::Client::new(), "http://127.0.0.1:1");
        Console::new(tracker, directory)
    }

    #[tokio::test(start_paused = true)]
    async fn stop_replies_before_the_report_is_sent() {
        let reporter = Arc::new(GatedReporter::default());
        let mut console = tracking_console(reporter.clone()).await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let reply = tokio::time::timeout(Duration::from_secs(1), console.handle(Command::Stop))
            .await
            .expect("stop must not wait on the report");
        assert!(reply.starts_with("Stopping"), "{reply}");

        reporter.release.notify_one();
        assert_eq!(
            console.next_notice().await.as_deref(),
            Some("Stopped after 3s.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn quit_waits_for_a_stop_in_flight() {
        let reporter = Arc::new(GatedReporter::default());
        let mut console = tracking_console(reporter.clone()).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        console.handle(Command::Stop).await;
        reporter.release.notify_one();

        assert_eq!(console.handle(Command::Quit).await, "Stopped after 2s.");
        assert_eq!(console.handle(Command::Quit).await, "No active session.");
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("verify E1"), Some(Command::Verify("E1".into())));
        assert_eq!(
            Command::parse("  START  Project Apollo "),
            Some(Command::Start("Project Apollo".into()))
        );
        assert_eq!(Command::parse("stop"), Some(Command::Stop));
        assert_eq!(Command::parse("Status"), Some(Command::Status));
        assert_eq!(Command::parse("exit"), Some(Command::Quit));
        assert_eq!(Command::parse("?"), Some(Command::Help));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(Command::parse("verify"), None);
        assert_eq!(Command::parse("start"), None);
        assert_eq!(Command::parse("stop now"), None);
        assert_eq!(Command::parse("dance"), None);
        assert_eq!(Command::parse(""), None);
    }
}
