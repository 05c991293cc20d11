use crate::{
    commands::{Commands, CursorCommand, QueryArgs},
    conn::ConnectionKind,
    env::EnvManager,
    error::CliError,
    output::PlanReport,
};
use clap::Parser;
use engine_core::{
    codec::CursorCodec,
    page::PageRequest,
    paginator::{PagePlanner, Paginator},
};
use model::pagination::{
    cursor::{Cursor, CursorDirection},
    order::OrderSpec,
};
use planner::{
    query::{
        ast::expr::Expr,
        builder::select::{FromState, SelectBuilder},
        renderer::Renderer,
    },
    table_ref,
};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "keyset", version = "0.1.0", about = "Keyset pagination toolkit")]
struct Cli {
    /// Extra `KEY=VALUE` file layered over the process environment
    #[arg(long, global = true)]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut env = EnvManager::from_process();
    if let Some(path) = &cli.env_file {
        env.load_from_file(path)?;
    }
    let config = env.paginator_config()?;
    debug!(?config, "Loaded paginator config");

    match cli.command {
        Commands::Cursor { command } => match command {
            CursorCommand::Decode { token } => {
                let cursor = CursorCodec::from_config(&config).decode(&token)?;
                output::print_json(&output::cursor_json(&cursor))?;
            }
            CursorCommand::Encode { id, direction, keys } => {
                let direction: CursorDirection = direction.parse().map_err(|_| {
                    CliError::InvalidArgument(format!(
                        "direction must be 'forward' or 'backward', got '{direction}'"
                    ))
                })?;
                let keys = keys
                    .iter()
                    .map(|pair| commands::parse_key(pair))
                    .collect::<Result<Vec<_>, _>>()?;

                let token = CursorCodec::from_config(&config).encode(&Cursor::new(id, direction, keys));
                println!("{token}");
            }
        },
        Commands::Plan { query, dialect } => {
            let kind: ConnectionKind = dialect.parse()?;
            let order = OrderSpec::parse(&query.order)?;

            let plan = PagePlanner::new(config).plan(build_query(&query), &order, &request(&query))?;
            let (sql, params) = Renderer::render_node(plan.select(), kind.dialect());

            output::print_json(&PlanReport::new(
                kind.dialect().name(),
                plan.direction().to_string(),
                plan.take(),
                sql,
                &params,
            ))?;
        }
        Commands::Page { url, query } => {
            let url = url
                .or_else(|| env.database_url().map(String::from))
                .ok_or_else(|| CliError::Config("pass --url or set DATABASE_URL".into()))?;
            let order = OrderSpec::parse(&query.order)?;

            let adapter = conn::connect(ConnectionKind::Postgres, &url).await?;
            let paginator = Paginator::with_config(Arc::new(adapter), config);
            let page = paginator
                .paginate(build_query(&query), &order, &request(&query))
                .await?;

            info!(
                rows = page.items.len(),
                has_next = page.has_next(),
                has_prev = page.has_prev(),
                "Fetched page from {}",
                query.table
            );
            output::print_json(&page)?;
        }
    }

    Ok(())
}

/// `SELECT * FROM <table> [AS alias]`
fn build_query(args: &QueryArgs) -> SelectBuilder<FromState> {
    let table = match &args.schema {
        Some(schema) => table_ref!(schema, &args.table),
        None => table_ref!(&args.table),
    };
    SelectBuilder::new()
        .select(vec![Expr::Wildcard(None)])
        .from(table, args.alias.as_deref())
}

fn request(args: &QueryArgs) -> PageRequest {
    PageRequest::new(args.take, args.cursor.clone())
}
