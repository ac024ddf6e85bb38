//! Upkeep CLI - Command-line interface for the Upkeep maintenance daemon

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";

#[derive(Parser)]
#[command(name = "upkeep")]
#[command(about = "Upkeep maintenance schedule CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "UPKEEP_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List schedules
    List {
        /// Scheduled, "In Progress", Completed, Overdue or Cancelled
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        machine: Option<String>,

        #[arg(short, long)]
        assigned_to: Option<String>,

        /// Earliest due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Latest due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// Latest due date first
        #[arg(long)]
        desc: bool,
    },

    /// Show one schedule with its checklist
    Show {
        /// Schedule ID
        id: String,
    },

    /// Create a schedule
    Create {
        #[arg(short, long)]
        machine: String,

        #[arg(short, long)]
        title: String,

        /// Daily, Weekly, Monthly, Quarterly, Semi-Annual, Annual or Custom
        #[arg(short, long)]
        frequency: String,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(short, long)]
        date: String,

        /// Estimated duration in hours
        #[arg(long)]
        duration: f64,

        /// Preventive, Predictive, Corrective or Emergency
        #[arg(long = "type")]
        schedule_type: Option<String>,

        /// Low, Medium, High or Critical
        #[arg(short, long)]
        priority: Option<String>,

        #[arg(short, long)]
        assigned_to: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Checklist task (repeatable, kept in order)
        #[arg(long = "task")]
        tasks: Vec<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Change status (Scheduled, "In Progress", Cancelled)
    Status {
        id: String,
        status: String,

        /// Fail if the schedule moved past this version
        #[arg(long)]
        expected_version: Option<i64>,
    },

    /// Mark a schedule completed
    Complete {
        id: String,

        /// Completing user
        #[arg(short, long)]
        by: String,

        #[arg(long)]
        expected_version: Option<i64>,
    },

    /// Tick (or untick) a checklist item
    Check {
        id: String,

        /// Zero-based item index
        #[arg(allow_negative_numbers = true)]
        index: i64,

        /// Mark the item not done
        #[arg(long)]
        undo: bool,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        expected_version: Option<i64>,
    },

    /// List overdue work
    Overdue,

    /// List work due soon
    Upcoming {
        /// Look-ahead window (server default when omitted)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// List work due in a month
    Calendar { year: i32, month: u32 },

    /// Show completion rate
    Stats,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChecklistItem {
    task: String,
    completed: bool,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Schedule {
    id: String,
    machine: String,
    title: String,
    #[serde(rename = "type")]
    schedule_type: String,
    frequency: String,
    scheduled_date: String,
    status: String,
    priority: String,
    #[serde(default)]
    assigned_to: Option<String>,
    #[serde(default)]
    checklist: Vec<ChecklistItem>,
    #[serde(default)]
    completed_by: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    next_scheduled_date: Option<String>,
    total_cost: f64,
    version: i64,
}

#[derive(Debug, Deserialize)]
struct ScheduleList {
    count: usize,
    schedules: Vec<Schedule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionStats {
    completed: i64,
    total: i64,
    completion_rate: f64,
}

#[derive(Tabled)]
struct ScheduleRow {
    id: String,
    machine: String,
    title: String,
    due: String,
    frequency: String,
    status: String,
    priority: String,
    assigned: String,
    checklist: String,
}

impl From<&Schedule> for ScheduleRow {
    fn from(s: &Schedule) -> Self {
        let done = s.checklist.iter().filter(|item| item.completed).count();
        Self {
            id: s.id.clone(),
            machine: s.machine.clone(),
            title: s.title.clone(),
            due: s.scheduled_date.clone(),
            frequency: s.frequency.clone(),
            status: paint_status(&s.status).to_string(),
            priority: s.priority.clone(),
            assigned: s.assigned_to.clone().unwrap_or_else(|| "-".to_string()),
            checklist: format!("{}/{}", done, s.checklist.len()),
        }
    }
}

#[derive(Tabled)]
struct ChecklistRow {
    #[tabled(rename = "#")]
    index: usize,
    done: String,
    task: String,
    notes: String,
}

fn paint_status(status: &str) -> ColoredString {
    match status {
        "Overdue" => status.red().bold(),
        "Completed" => status.green(),
        "In Progress" => status.yellow(),
        "Cancelled" => status.dimmed(),
        _ => status.normal(),
    }
}

/// Accept a bare `YYYY-MM-DD` as midnight UTC, or a full RFC 3339 instant
fn normalize_date(input: &str) -> Result<String> {
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = day.and_time(NaiveTime::MIN).and_utc();
        return Ok(midnight.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    let instant = DateTime::parse_from_rfc3339(input)
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", input))?;
    Ok(instant
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Params object without the unset keys
fn params(pairs: Vec<(&str, Value)>) -> Value {
    let map: Map<String, Value> = pairs
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Value::Object(map)
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

async fn call_schedule(url: &str, method: &str, params: Value) -> Result<Schedule> {
    let result = call_rpc(url, method, params).await?;
    serde_json::from_value(result).context("Unexpected schedule payload")
}

async fn call_list(url: &str, method: &str, params: Value) -> Result<ScheduleList> {
    let result = call_rpc(url, method, params).await?;
    serde_json::from_value(result).context("Unexpected list payload")
}

fn print_list(heading: &str, list: &ScheduleList) {
    println!("{}", format!("{} ({})", heading, list.count).cyan().bold());
    if list.schedules.is_empty() {
        println!("{}", "Nothing to show".yellow());
        return;
    }
    let rows: Vec<ScheduleRow> = list.schedules.iter().map(ScheduleRow::from).collect();
    println!("{}", Table::new(rows));
}

fn print_schedule(s: &Schedule) {
    println!("{}", format!("{} - {}", s.id, s.title).cyan().bold());
    println!("  {} {}", "Machine:".bold(), s.machine);
    println!("  {} {}", "Type:".bold(), s.schedule_type);
    println!("  {} {}", "Status:".bold(), paint_status(&s.status));
    println!("  {} {}", "Priority:".bold(), s.priority);
    println!("  {} {}", "Frequency:".bold(), s.frequency);
    println!("  {} {}", "Due:".bold(), s.scheduled_date);
    if let Some(next) = &s.next_scheduled_date {
        println!("  {} {}", "Next due:".bold(), next);
    }
    if let (Some(by), Some(at)) = (&s.completed_by, &s.completed_at) {
        println!("  {} {} at {}", "Completed by:".bold(), by, at);
    }
    println!("  {} {:.2}", "Total cost:".bold(), s.total_cost);
    println!("  {} {}", "Version:".bold(), s.version);

    if !s.checklist.is_empty() {
        println!();
        let rows: Vec<ChecklistRow> = s
            .checklist
            .iter()
            .enumerate()
            .map(|(index, item)| ChecklistRow {
                index,
                done: if item.completed { "✓" } else { " " }.to_string(),
                task: item.task.clone(),
                notes: item.notes.clone().unwrap_or_default(),
            })
            .collect();
        println!("{}", Table::new(rows));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::List {
            status,
            machine,
            assigned_to,
            from,
            to,
            desc,
        } => {
            let p = params(vec![
                ("status", json!(status)),
                ("machine", json!(machine)),
                ("assignedTo", json!(assigned_to)),
                ("from", json!(from.as_deref().map(normalize_date).transpose()?)),
                ("to", json!(to.as_deref().map(normalize_date).transpose()?)),
                ("order", json!(desc.then_some("desc"))),
            ]);
            let list = call_list(url, "maintenance.list.v1", p).await?;
            print_list("Schedules", &list);
        }

        Commands::Show { id } => {
            let s = call_schedule(url, "maintenance.get.v1", json!({ "id": id })).await?;
            print_schedule(&s);
        }

        Commands::Create {
            machine,
            title,
            frequency,
            date,
            duration,
            schedule_type,
            priority,
            assigned_to,
            description,
            tasks,
            notes,
        } => {
            let p = params(vec![
                ("machine", json!(machine)),
                ("title", json!(title)),
                ("frequency", json!(frequency)),
                ("scheduledDate", json!(normalize_date(&date)?)),
                ("estimatedDuration", json!(duration)),
                ("type", json!(schedule_type)),
                ("priority", json!(priority)),
                ("assignedTo", json!(assigned_to)),
                ("description", json!(description)),
                ("checklist", json!(tasks)),
                ("notes", json!(notes)),
            ]);
            let s = call_schedule(url, "maintenance.create.v1", p).await?;
            println!("{}", "✓ Schedule created".green().bold());
            println!();
            print_schedule(&s);
        }

        Commands::Status {
            id,
            status,
            expected_version,
        } => {
            let p = params(vec![
                ("id", json!(id)),
                ("status", json!(status)),
                ("expectedVersion", json!(expected_version)),
            ]);
            let s = call_schedule(url, "maintenance.status.v1", p).await?;
            println!(
                "{} {} is now {}",
                "✓".green(),
                s.id,
                paint_status(&s.status)
            );
        }

        Commands::Complete {
            id,
            by,
            expected_version,
        } => {
            let p = params(vec![
                ("id", json!(id)),
                ("completedBy", json!(by)),
                ("expectedVersion", json!(expected_version)),
            ]);
            let s = call_schedule(url, "maintenance.complete.v1", p).await?;
            println!("{}", format!("✓ Schedule {} completed", s.id).green().bold());
            match &s.next_scheduled_date {
                Some(next) => println!("  {} {}", "Next due:".bold(), next),
                None => println!("  {}", "No next occurrence (custom frequency)".yellow()),
            }
        }

        Commands::Check {
            id,
            index,
            undo,
            notes,
            expected_version,
        } => {
            let p = params(vec![
                ("id", json!(id)),
                ("index", json!(index)),
                ("completed", json!(!undo)),
                ("notes", json!(notes)),
                ("expectedVersion", json!(expected_version)),
            ]);
            let s = call_schedule(url, "maintenance.checklist.v1", p).await?;
            print_schedule(&s);
        }

        Commands::Overdue => {
            let list = call_list(url, "maintenance.overdue.v1", json!({})).await?;
            print_list("Overdue", &list);
        }

        Commands::Upcoming { days } => {
            let p = params(vec![("horizonDays", json!(days))]);
            let list = call_list(url, "maintenance.upcoming.v1", p).await?;
            print_list("Upcoming", &list);
        }

        Commands::Calendar { year, month } => {
            let p = json!({ "year": year, "month": month });
            let list = call_list(url, "maintenance.calendar.v1", p).await?;
            print_list(&format!("{}-{:02}", year, month), &list);
        }

        Commands::Stats => {
            let result = call_rpc(url, "analytics.completion_rate.v1", json!({})).await?;
            let stats: CompletionStats =
                serde_json::from_value(result).context("Unexpected stats payload")?;

            println!("{}", "Completion".cyan().bold());
            println!("  {} {}", "Completed:".bold(), stats.completed);
            println!("  {} {}", "Total:".bold(), stats.total);
            println!("  {} {:.2}%", "Rate:".bold(), stats.completion_rate);
        }
    }

    Ok(())
}
