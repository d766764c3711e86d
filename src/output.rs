//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output of single
//! resources and [`Tabled`] row types for lists, as an alternative to JSON
//! serialization.

use tabled::Tabled;

use crate::pagination::{Page, Pagination};
use crate::{Organization, Run, Variable, Workspace};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Trait for human-readable key-value output.
///
/// Implemented by entity types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

fn header(kind: &str, id: &str) -> Vec<String> {
    let title = format!("{kind}: {id}");
    let divider = "─".repeat(title.chars().count().max(30));
    vec![title, divider]
}

impl PrettyPrint for Organization {
    fn pretty_print(&self) -> String {
        let attrs = &self.attributes;
        let mut lines = header("Organization", &self.id);
        lines.push(format!("Name:           {}", attrs.name));

        if let Some(ref email) = attrs.email {
            lines.push(format!("Email:          {}", email));
        }

        if let Some(ref mode) = attrs.default_execution_mode {
            lines.push(format!("Execution Mode: {}", mode));
        }

        if let Some(ref created) = attrs.created_at {
            lines.push(format!("Created:        {}", created.format(TIME_FORMAT)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for Workspace {
    fn pretty_print(&self) -> String {
        let attrs = &self.attributes;
        let mut lines = header("Workspace", &self.id);
        lines.push(format!("Name:           {}", attrs.name));

        if let Some(org) = self.related_id("organization") {
            lines.push(format!("Organization:   {}", org));
        }

        if let Some(ref version) = attrs.terraform_version {
            lines.push(format!("Terraform:      {}", version));
        }

        lines.push(format!(
            "Locked:         {}",
            if attrs.locked { "yes" } else { "no" }
        ));
        lines.push(format!(
            "Auto Apply:     {}",
            if attrs.auto_apply { "yes" } else { "no" }
        ));
        lines.push(format!("Resources:      {}", attrs.resource_count));

        if let Some(run) = self.related_id("current-run") {
            lines.push(format!("Current Run:    {}", run));
        }

        if !attrs.tag_names.is_empty() {
            lines.push(format!("Tags:           {}", attrs.tag_names.join(", ")));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for Run {
    fn pretty_print(&self) -> String {
        let attrs = &self.attributes;
        let mut lines = header("Run", &self.id);
        lines.push(format!("Status:         {}", attrs.status));

        if let Some(ref message) = attrs.message {
            lines.push(format!("Message:        {}", message));
        }

        if let Some(ws) = self.related_id("workspace") {
            lines.push(format!("Workspace:      {}", ws));
        }

        if attrs.is_destroy {
            lines.push("Destroy:        yes".to_string());
        }

        if let Some(ref created) = attrs.created_at {
            lines.push(format!("Created:        {}", created.format(TIME_FORMAT)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for Variable {
    fn pretty_print(&self) -> String {
        let attrs = &self.attributes;
        let mut lines = header("Variable", &self.id);
        lines.push(format!("Key:            {}", attrs.key));
        lines.push(format!("Category:       {}", attrs.category));
        lines.push(format!("Value:          {}", display_value(self)));
        lines.join("\n")
    }
}

fn display_value(v: &Variable) -> String {
    if v.attributes.sensitive {
        "(sensitive)".to_string()
    } else {
        v.attributes.value.clone().unwrap_or_default()
    }
}

/// Footer line describing where a page sits in the collection.
pub fn page_footer<T>(page: &Page<T, Pagination>) -> String {
    let p = &page.pagination;
    if p.total_pages > 0 {
        format!(
            "Page {}/{} ({} total items)",
            p.current_page, p.total_pages, p.total_count
        )
    } else if p.next_page.is_some() {
        format!("Page {} (more available)", p.current_page)
    } else {
        format!("Page {} (end)", p.current_page)
    }
}

// Table row types for non-JSON output

#[derive(Tabled)]
pub struct OrganizationRow {
    pub name: String,
    pub email: String,
}

impl From<&Organization> for OrganizationRow {
    fn from(o: &Organization) -> Self {
        Self {
            name: o.attributes.name.clone(),
            email: o.attributes.email.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
pub struct WorkspaceRow {
    pub id: String,
    pub name: String,
    pub terraform: String,
    pub locked: bool,
    pub resources: u64,
}

impl From<&Workspace> for WorkspaceRow {
    fn from(w: &Workspace) -> Self {
        Self {
            id: w.id.clone(),
            name: w.attributes.name.clone(),
            terraform: w.attributes.terraform_version.clone().unwrap_or_default(),
            locked: w.attributes.locked,
            resources: w.attributes.resource_count,
        }
    }
}

#[derive(Tabled)]
pub struct RunRow {
    pub id: String,
    pub status: String,
    pub message: String,
}

impl From<&Run> for RunRow {
    fn from(r: &Run) -> Self {
        Self {
            id: r.id.clone(),
            status: r.attributes.status.to_string(),
            message: r.attributes.message.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
pub struct VariableRow {
    pub id: String,
    pub key: String,
    pub category: String,
    pub value: String,
}

impl From<&Variable> for VariableRow {
    fn from(v: &Variable) -> Self {
        Self {
            id: v.id.clone(),
            key: v.attributes.key.clone(),
            category: v.attributes.category.to_string(),
            value: display_value(v),
        }
    }
}
