//! TFE API CLI binary.
//!
//! A command-line interface for browsing a Terraform Cloud / Enterprise
//! organization.

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tabled::{Table, Tabled};
use tfeapi::cli::{Cli, Command, Entity};
use tfeapi::output::{
    page_footer, OrganizationRow, PrettyPrint, RunRow, VariableRow, WorkspaceRow,
};
use tfeapi::{
    collect_all, Config, ListOptions, OrganizationListOptions, Page, RunListOptions, TfeClient,
    TfeError, VariableListOptions, WorkspaceListOptions,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set TFE_TOKEN environment variable");
            return ExitCode::FAILURE;
        }
    };

    let client = match TfeClient::connect(config).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &TfeClient, cli: Cli) -> tfeapi::Result<()> {
    match cli.command {
        Command::Get { entity, id } => {
            handle_get(client, entity, &id, cli.org.as_deref(), cli.json).await
        }
        Command::List {
            entity,
            workspace,
            page,
            page_size,
            all,
        } => {
            let args = ListArgs {
                org: cli.org.as_deref(),
                workspace: workspace.as_deref(),
                list: ListOptions {
                    page_number: page,
                    page_size,
                },
                all,
                json: cli.json,
            };
            handle_list(client, entity, args).await
        }
    }
}

fn required<'a>(value: Option<&'a str>, flag: &str) -> tfeapi::Result<&'a str> {
    value.ok_or_else(|| TfeError::ConfigMissing(format!("--{flag} is required for this entity")))
}

async fn handle_get(
    client: &TfeClient,
    entity: Entity,
    id: &str,
    org: Option<&str>,
    json: bool,
) -> tfeapi::Result<()> {
    match entity {
        Entity::Organization => {
            let org = client.organizations().read(id).await?;
            output_single(&org, json)?;
        }
        Entity::Workspace => {
            let ws = match org {
                Some(org) => client.workspaces().read(org, id).await?,
                None => client.workspaces().read_by_id(id).await?,
            };
            output_single(&ws, json)?;
        }
        Entity::Run => {
            let run = client.runs().read(id).await?;
            output_single(&run, json)?;
        }
        Entity::Variable => {
            eprintln!("Error: Variables are read through their workspace");
            eprintln!("Hint: Use 'tfeapi list variables --workspace <ws-id>'");
            return Err(TfeError::InvalidVariableId);
        }
    }
    Ok(())
}

struct ListArgs<'a> {
    org: Option<&'a str>,
    workspace: Option<&'a str>,
    list: ListOptions,
    all: bool,
    json: bool,
}

async fn handle_list(client: &TfeClient, entity: Entity, args: ListArgs<'_>) -> tfeapi::Result<()> {
    match entity {
        Entity::Organization => {
            let options = OrganizationListOptions {
                list: args.list,
                ..Default::default()
            };
            if args.all {
                let items = collect_all(options, |opts| async move {
                    client.organizations().list(&opts).await
                })
                .await?;
                output_all(&items, args.json, |x| OrganizationRow::from(x))?;
            } else {
                let page = client.organizations().list(&options).await?;
                output_page(&page, args.json, |x| OrganizationRow::from(x))?;
            }
        }
        Entity::Workspace => {
            let org = required(args.org, "org")?;
            let options = WorkspaceListOptions {
                list: args.list,
                ..Default::default()
            };
            if args.all {
                let items = collect_all(options, |opts| async move {
                    client.workspaces().list(org, &opts).await
                })
                .await?;
                output_all(&items, args.json, |x| WorkspaceRow::from(x))?;
            } else {
                let page = client.workspaces().list(org, &options).await?;
                output_page(&page, args.json, |x| WorkspaceRow::from(x))?;
            }
        }
        Entity::Run => {
            let ws = required(args.workspace, "workspace")?;
            let options = RunListOptions {
                list: args.list,
                ..Default::default()
            };
            if args.all {
                let items = collect_all(options, |opts| async move {
                    client.runs().list(ws, &opts).await
                })
                .await?;
                output_all(&items, args.json, |x| RunRow::from(x))?;
            } else {
                let page = client.runs().list(ws, &options).await?;
                output_page(&page, args.json, |x| RunRow::from(x))?;
            }
        }
        Entity::Variable => {
            let ws = required(args.workspace, "workspace")?;
            let options = VariableListOptions { list: args.list };
            if args.all {
                let items = collect_all(options, |opts| async move {
                    client.variables().list(ws, &opts).await
                })
                .await?;
                output_all(&items, args.json, |x| VariableRow::from(x))?;
            } else {
                let page = client.variables().list(ws, &options).await?;
                output_page(&page, args.json, |x| VariableRow::from(x))?;
            }
        }
    }
    Ok(())
}

fn output_single<T: Serialize + PrettyPrint>(item: &T, json: bool) -> tfeapi::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(item)?);
    } else {
        println!("{}", item.pretty_print());
    }
    Ok(())
}

fn output_page<T, R, F>(page: &Page<T>, json: bool, to_row: F) -> tfeapi::Result<()>
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if json {
        println!("{}", serde_json::to_string_pretty(&page.items)?);
    } else {
        let rows: Vec<R> = page.items.iter().map(to_row).collect();
        println!("{}", Table::new(rows));
        println!("\n{}", page_footer(page));
    }
    Ok(())
}

fn output_all<T, R, F>(items: &[T], json: bool, to_row: F) -> tfeapi::Result<()>
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        println!("{}", Table::new(rows));
        println!("\n{} total items", items.len());
    }
    Ok(())
}
