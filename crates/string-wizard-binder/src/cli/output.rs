//! Output formatting for the `wizard-bind` CLI
//!
//! JSON and YAML for machines, a colored table for people.

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::error::CliError;
use crate::table::{RouteTarget, RoutingTable};

/// Output format for listings
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Format of emitted deployment documents
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, CliError> {
        Ok(match self {
            DocumentFormat::Json => serde_json::to_string_pretty(value)?,
            DocumentFormat::Yaml => serde_yaml::to_string(value)?,
        })
    }
}

/// One row of the `routes` listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRow {
    pub method: String,
    pub path: String,
    pub kind: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesOutput {
    pub service: String,
    pub fingerprint: String,
    pub routes: Vec<RouteRow>,
}

impl RoutesOutput {
    pub fn from_table(table: &RoutingTable) -> Self {
        let routes = table
            .routes()
            .map(|(key, target)| {
                let (kind, target) = match target {
                    RouteTarget::Dispatch { operation, address } => {
                        ("dispatch", format!("{} -> {}", operation, address))
                    }
                    RouteTarget::Static(response) => ("static", format!("status {}", response.status)),
                };
                RouteRow {
                    method: key.method.to_string(),
                    path: key.path.to_string(),
                    kind: kind.to_string(),
                    target,
                }
            })
            .collect();

        Self {
            service: table.service().to_string(),
            fingerprint: table.fingerprint(),
            routes,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<(), CliError> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(self)?),
            OutputFormat::Table => self.render_table(),
        }
        Ok(())
    }

    fn render_table(&self) {
        let mut stdout = io::stdout();

        writeln!(stdout).ok();
        writeln!(stdout, "{} {}", "Routes for".cyan().bold(), self.service.bold()).ok();
        writeln!(stdout, "{}", "=".repeat(72)).ok();
        writeln!(
            stdout,
            "{:<8} {:<24} {:<9} {}",
            "METHOD".dimmed(),
            "PATH".dimmed(),
            "KIND".dimmed(),
            "TARGET".dimmed()
        )
        .ok();

        for row in &self.routes {
            let kind = if row.kind == "dispatch" {
                row.kind.green()
            } else {
                row.kind.blue()
            };
            writeln!(
                stdout,
                "{:<8} {:<24} {:<9} {}",
                row.method.bold(),
                row.path.cyan(),
                kind,
                row.target
            )
            .ok();
        }

        writeln!(stdout).ok();
        writeln!(stdout, "Fingerprint {}", self.fingerprint.dimmed()).ok();
        stdout.flush().ok();
    }
}

/// Result of the `check` command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckOutput {
    pub complete: bool,
    pub missing: Vec<String>,
    pub undeclared: Vec<String>,
}

impl CheckOutput {
    pub fn render(&self, format: OutputFormat) -> Result<(), CliError> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(self)?),
            OutputFormat::Table => {
                if self.complete {
                    println!("{} Every declared operation has a handler", "+".green());
                }
                for op in &self.missing {
                    println!("{} {} has no deployed handler", "x".red(), op.bold());
                }
                for op in &self.undeclared {
                    println!("{} {} is not declared", "!".yellow(), op.bold());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerSet;
    use crate::table::bind;
    use string_wizard_contract::ServiceDefinition;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
        assert_eq!(DocumentFormat::default(), DocumentFormat::Json);
    }

    #[test]
    fn test_routes_output_rows() {
        let definition = ServiceDefinition::bundled().unwrap();
        let handlers =
            HandlerSet::from_raw(vec![("Echo", "arn:echo"), ("Length", "arn:length")]).unwrap();
        let table = bind(&definition, &handlers).unwrap();

        let output = RoutesOutput::from_table(&table);
        assert_eq!(output.routes.len(), 4);
        assert_eq!(output.routes[0].target, "Echo -> arn:echo");
        assert_eq!(output.routes[1].kind, "static");
        assert_eq!(output.fingerprint, table.fingerprint());
    }

    #[test]
    fn test_document_format_yaml() {
        let text = DocumentFormat::Yaml
            .encode(&serde_json::json!({ "a": 1 }))
            .unwrap();
        assert_eq!(text.trim(), "a: 1");
    }
}
