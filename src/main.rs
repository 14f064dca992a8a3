use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use jobd::client::{Client, JobView};
use jobd::config::ServerConfig;
use jobd::server;
use jobd::shutdown;

#[derive(Parser, Debug)]
#[command(name = "jobd")]
#[command(version)]
#[command(about = "Run shell commands as supervised background jobs over HTTP")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the jobd server
    Server(ServerArgs),

    /// Job management commands
    Job {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: JobCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,
}

// =============================================================================
// Client Arguments (shared by all job commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:8080")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Job Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// Submit a command to run as a background job
    Start {
        /// The command and its arguments (put them after a `--`)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Stop a job: SIGTERM, then SIGKILL after the grace period
    Stop {
        /// The job id
        id: u64,
    },
    /// Get the status of a single job
    Status {
        /// The job id
        id: u64,
    },
    /// List all jobs
    List,
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::new(args.addr);
    let shutdown = shutdown::install_shutdown_handler();
    server::run(config, shutdown).await
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_job_start(
    client: &Client,
    command: Vec<String>,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // clap enforces at least one element
    let (cmd, args) = command.split_first().expect("command is non-empty");
    let id = client.start(cmd, args).await?;

    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "id": id }))?
            );
        }
        OutputFormat::Table => {
            println!("Job started");
            println!("ID: {id}");
        }
    }
    Ok(())
}

async fn handle_job_stop(client: &Client, id: u64) -> Result<(), Box<dyn std::error::Error>> {
    client.stop(id).await?;
    println!("Job {id} stopped");
    Ok(())
}

async fn handle_job_status(
    client: &Client,
    id: u64,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let job = client.status(id).await?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&job)?),
        OutputFormat::Table => {
            println!("Job ID:  {}", job.id);
            println!("Command: {}", render_command(&job));
            println!("Status:  {}", job.status);
        }
    }
    Ok(())
}

async fn handle_job_list(
    client: &Client,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = client.list().await?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&jobs)?),
        OutputFormat::Table => {
            if jobs.is_empty() {
                println!("No jobs found.");
                return Ok(());
            }

            println!("{:<6} {:<18} COMMAND", "ID", "STATUS");
            println!("{}", "-".repeat(50));
            for job in &jobs {
                println!("{:<6} {:<18} {}", job.id, job.status, render_command(job));
            }
        }
    }
    Ok(())
}

fn render_command(job: &JobView) -> String {
    if job.args.is_empty() {
        job.command.clone()
    } else {
        format!("{} {}", job.command, job.args.join(" "))
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Job { client, command } => {
            let api = Client::new(&client.addr);
            let result = match command {
                JobCommands::Start { command } => {
                    handle_job_start(&api, command, &client.output).await
                }
                JobCommands::Stop { id } => handle_job_stop(&api, id).await,
                JobCommands::Status { id } => handle_job_status(&api, id, &client.output).await,
                JobCommands::List => handle_job_list(&api, &client.output).await,
            };

            if let Err(e) = result {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
