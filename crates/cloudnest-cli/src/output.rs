//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use cloudnest_entity::{Item, SearchResult, TreeNode, UploadResult};
use cloudnest_service::Invalidation;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print a list of rows in the selected format
pub fn print_list<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Print a single value in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{item:#?}"),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}

/// Print what a mutation invalidated, at the detail the format allows.
pub fn print_invalidation(invalidation: &Invalidation, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            print_kv("Keys invalidated", &invalidation.removed.len().to_string());
            let events: Vec<String> = invalidation.events.iter().map(|e| format!("{e:?}")).collect();
            print_kv("Events", &events.join(", "));
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "keys": invalidation.keys,
                "removed": invalidation.removed,
                "events": invalidation.events,
            });
            println!("{json:#}");
        }
    }
}

/// Item display row
#[derive(Debug, Serialize, Tabled)]
pub struct ItemRow {
    /// Item ID
    pub id: String,
    /// Name
    pub name: String,
    /// Kind
    #[tabled(rename = "type")]
    pub kind: String,
    /// Size
    pub size: String,
    /// Starred
    #[tabled(rename = "★")]
    pub starred: String,
    /// Updated at
    pub updated_at: String,
}

impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            kind: item.kind.to_string(),
            size: item.size.map(human_size).unwrap_or_default(),
            starred: if item.is_starred { "★".into() } else { String::new() },
            updated_at: item
                .updated_at
                .or(item.created_at)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Search hit display row
#[derive(Debug, Serialize, Tabled)]
pub struct SearchRow {
    /// Item ID
    pub id: String,
    /// Kind
    #[tabled(rename = "type")]
    pub kind: String,
    /// Full path
    pub path: String,
}

impl From<&SearchResult> for SearchRow {
    fn from(hit: &SearchResult) -> Self {
        Self {
            id: hit.item.id.to_string(),
            kind: hit.item.kind.to_string(),
            path: hit.path.clone(),
        }
    }
}

/// Upload result display row
#[derive(Debug, Serialize, Tabled)]
pub struct ResultRow {
    /// Task ID
    pub task: String,
    /// File name
    pub name: String,
    /// Status
    pub status: String,
    /// Created item IDs or failure reason
    pub detail: String,
}

impl From<&UploadResult> for ResultRow {
    fn from(result: &UploadResult) -> Self {
        let detail = match &result.error {
            Some(error) => error.clone(),
            None => result
                .items
                .iter()
                .map(|i| i.id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        };
        Self {
            task: result.task_id.to_string(),
            name: result.name.clone(),
            status: result.status.to_string(),
            detail,
        }
    }
}

/// Print a forest as an indented tree, without recursion.
pub fn print_tree(roots: &[TreeNode], max_depth: usize) {
    println!("/");
    let mut stack: Vec<(&TreeNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let indent = "  ".repeat(depth + 1);
        println!("{indent}├── {}/  ({})", node.name(), node.id());
        for file in &node.files {
            println!("{indent}  ├── {}", file.name);
        }
        if depth < max_depth {
            stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        }
    }
}

/// Render a byte count for humans.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
