///
/// This module implements the CLI interface for tableau-plumber: command parsing, argument
/// validation, the async entrypoint, and user-visible output.
///
/// All server orchestration (sessions, lookups, downloads, extracts, publishing) lives in the
/// [`tableau-plumber-core`] crate. This module only wires the REST client and Hyper engine into
/// it and prints what comes back.
///
/// ## Features
/// - Entry struct [`Cli`] with the global `--config` and `--credentials` options.
/// - One subcommand per operation, see [`Commands`].
/// - Async entrypoint (`run`) for programmatic invocation and integration testing.
///
/// ## Exit status
/// Commands whose target cannot be found (workbook, view, data source, item) exit non-zero, as do
/// credential and login failures.
///
/// [`tableau-plumber-core`]: ../../tableau-plumber-core/
/// [`Cli`]: struct.Cli.html
/// [`Commands`]: enum.Commands.html
use crate::hyper::HyperEngine;
use crate::load_config::{load_config, PlumberConfig};
use crate::rest::TableauRestClient;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tableau_plumber_core::contract::WriteMode;
use tableau_plumber_core::download::{download_views, DownloadOutcome, DownloadRequest};
use tableau_plumber_core::extract::{create_extract, ExtractRequest, SchemaSource};
use tableau_plumber_core::publish::{
    delete_datasource, job_status, publish_datasource, refresh_datasource, refresh_workbook,
    PublishRequest,
};
use tableau_plumber_core::query::item_details;
use tableau_plumber_core::schema::ExtractInput;
use tableau_plumber_core::search::find_item;
use tableau_plumber_core::session::Session;

/// CLI for tableau-plumber: list, download, build extracts and publish to Tableau Server.
#[derive(Parser)]
#[clap(
    name = "tableau-plumber",
    version,
    about = "Query Tableau Server content, download views, and build and publish extracts"
)]
pub struct Cli {
    /// Path to the YAML settings file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the JSON credential file (default: credential.json)
    #[clap(long, global = true)]
    pub credentials: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List items of one type (Project, Workbook, View, Datasource) as a table
    Items {
        item_type: String,
        /// Also write the table to this CSV file
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Find the first item of a type with exactly this name
    Find { item_type: String, name: String },
    /// Download one or all views of a workbook
    Download {
        workbook: String,
        /// Only this view; omitted downloads every view
        #[clap(long)]
        view: Option<String>,
        /// Base directory (default: current directory)
        #[clap(long)]
        dir: Option<PathBuf>,
        /// image, pdf or csv
        #[clap(long, default_value = "image")]
        format: String,
    },
    /// Build a local extract file from a CSV file
    Extract {
        extract_path: PathBuf,
        #[clap(long)]
        csv: PathBuf,
        /// JSON column list replacing type inference
        #[clap(long)]
        schema: Option<PathBuf>,
    },
    /// Publish an extract file as a data source
    Publish {
        project: String,
        extract_path: PathBuf,
        /// Data source name (default: the extract file stem)
        #[clap(long)]
        name: Option<String>,
        /// CreateNew, Overwrite or Append
        #[clap(long, default_value = "CreateNew")]
        mode: WriteMode,
    },
    /// Start an extract refresh of a data source
    Refresh { datasource: String },
    /// Start an extract refresh of a workbook
    RefreshWorkbook { workbook: String },
    /// Delete a data source
    Delete { datasource: String },
    /// Show the state of a job
    Job { job_id: String },
}

async fn open_session(config: &PlumberConfig) -> Result<Session<TableauRestClient>> {
    config.credentials.validate()?;
    let client = TableauRestClient::connect(&config.credentials.server, &config.client)
        .await
        .context("Failed to reach the server")?;
    let session = Session::login(client, config.credentials.clone(), config.session).await?;
    Ok(session)
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = load_config(cli.config.as_deref(), cli.credentials.as_deref())?;

    let result = match cli.command {
        Commands::Extract {
            extract_path,
            csv,
            schema,
        } => build_extract(&config, extract_path, csv, schema).await,
        command => {
            let session = open_session(&config).await?;
            execute(&session, command).await
        }
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

async fn build_extract(
    config: &PlumberConfig,
    extract_path: PathBuf,
    csv: PathBuf,
    schema: Option<PathBuf>,
) -> Result<()> {
    tracing::info!(command = "extract", "Building extract");
    let engine = HyperEngine::new(config.hyper.clone());
    let request = ExtractRequest {
        schema: schema.map_or(SchemaSource::Inferred, SchemaSource::Custom),
        ..ExtractRequest::new(extract_path, ExtractInput::CsvPath(csv))
    };
    let report = create_extract(&engine, request).await?;
    println!(
        "{} rows written to {}",
        report.row_count,
        report.extract_path.display()
    );
    Ok(())
}

async fn execute(session: &Session<TableauRestClient>, command: Commands) -> Result<()> {
    match command {
        Commands::Items { item_type, output } => {
            tracing::info!(command = "items", item_type = %item_type, "Listing items");
            let table = item_details(session, &item_type).await?;
            println!("{table}");
            if let Some(path) = output {
                table.to_csv_file(&path)?;
                tracing::info!(path = %path.display(), rows = table.len(), "Table written");
            }
        }
        Commands::Find { item_type, name } => {
            match find_item(session, &item_type, &name, None).await? {
                Some(item) => println!("{}\t{}\t{}", item.item_type(), item.name(), item.id()),
                None => bail!("No {item_type} named '{name}' found"),
            }
        }
        Commands::Download {
            workbook,
            view,
            dir,
            format,
        } => {
            let request = DownloadRequest {
                workbook_name: workbook,
                view_name: view,
                directory: dir,
                format,
            };
            match download_views(session, &request).await? {
                DownloadOutcome::Completed(report) => {
                    for path in &report.written {
                        println!("{}", path.display());
                    }
                    if !report.failed.is_empty() {
                        bail!("{} view(s) failed to download", report.failed.len());
                    }
                }
                DownloadOutcome::UnsupportedFormat(format) => {
                    bail!("File format '{format}' is not supported")
                }
                DownloadOutcome::WorkbookNotFound => {
                    bail!("No workbook named '{}' found", request.workbook_name)
                }
                DownloadOutcome::ViewNotFound => bail!(
                    "No view named '{}' found",
                    request.view_name.unwrap_or_default()
                ),
            }
        }
        Commands::Publish {
            project,
            extract_path,
            name,
            mode,
        } => {
            let request = PublishRequest {
                data_source_name: name,
                write_mode: mode,
                ..PublishRequest::new(project, extract_path)
            };
            let published = publish_datasource(session, &request).await?;
            println!("{}\t{}", published.name, published.id);
        }
        Commands::Refresh { datasource } => match refresh_datasource(session, &datasource).await? {
            Some(job) => println!("{}", job.id),
            None => bail!("No data source named '{datasource}' found"),
        },
        Commands::RefreshWorkbook { workbook } => {
            match refresh_workbook(session, &workbook).await? {
                Some(job) => println!("{}", job.id),
                None => bail!("No workbook named '{workbook}' found"),
            }
        }
        Commands::Delete { datasource } => match delete_datasource(session, &datasource).await? {
            Some(deleted) => println!("{}\t{}", deleted.name, deleted.id),
            None => bail!("No data source named '{datasource}' found"),
        },
        Commands::Job { job_id } => {
            let job = job_status(session, &job_id).await?;
            println!(
                "{}\t{}\t{}",
                job.id,
                job.status.as_deref().unwrap_or("-"),
                job.finish_code.map_or("-".to_string(), |c| c.to_string())
            );
        }
        Commands::Extract { .. } => bail!("extract runs without a server session"),
    }
    Ok(())
}
