use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telegazeta_api::client::{ApiClient, ClientError};
use telegazeta_api::numbering::CategoryCode;
use telegazeta_api::session::FileSessionStore;

#[derive(Debug, Parser)]
#[command(author, version, about = "Browse Telegazeta pages from the terminal")]
struct Args {
    /// API base URL (defaults to TELEGAZETA_API_URL or http://localhost:8080/api)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one page
    Page {
        number: i32,
        /// Re-fetch on an interval until interrupted
        #[arg(long)]
        watch: bool,
        /// Refresh interval in seconds for --watch
        #[arg(long, default_value_t = 120)]
        interval: u64,
    },
    /// List active pages, optionally for one category
    Pages {
        #[arg(long)]
        category: Option<String>,
    },
    /// List categories and their number ranges
    Categories,
    /// Store an admin session
    Login { username: String, password: String },
    /// Revoke and forget the stored session
    Logout,
    /// Most viewed pages (admin)
    Stats {
        #[arg(long, default_value_t = 10)]
        size: u32,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let store = Arc::new(FileSessionStore::from_env());
    let client = match args.api_url {
        Some(url) => ApiClient::new(url, store),
        None => ApiClient::from_env(store),
    }
    .context("failed to build API client")?;

    match args.command {
        Command::Page {
            number,
            watch,
            interval,
        } => {
            if !watch {
                return show_page(&client, number).await;
            }
            let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
            loop {
                ticker.tick().await;
                if let Err(error) = show_page(&client, number).await {
                    eprintln!("{error:#}");
                }
            }
        }
        Command::Pages { category } => {
            let pages = match category {
                Some(value) => {
                    let code = CategoryCode::parse(&value)
                        .with_context(|| format!("unknown category {value}"))?;
                    client.pages_in_category(code).await?
                }
                None => client.all_public_pages().await,
            };
            for page in pages {
                println!("{:>3}  {:<9} {}", page.page_number, page.category, page.title);
            }
        }
        Command::Categories => {
            for category in client.categories().await? {
                let range = CategoryCode::parse(&category.original_name)
                    .map(|code| code.range().to_string())
                    .unwrap_or_default();
                println!("{range:<8} {:<14} {}", category.category, category.description);
            }
        }
        Command::Login { username, password } => {
            let session = client.login(&username, &password).await?;
            println!("logged in as {}", session.identity);
        }
        Command::Logout => {
            client.logout().await?;
            println!("logged out");
        }
        Command::Stats { size, page } => match client.stats(size, page, true).await {
            Ok(stats) => {
                for stat in stats {
                    println!(
                        "{:>3}  {:>8}  {}",
                        stat.page_number,
                        stat.views,
                        stat.title.unwrap_or_default()
                    );
                }
            }
            Err(ClientError::Unauthorized) => anyhow::bail!("not logged in; run `viewer login` first"),
            Err(error) => return Err(error.into()),
        },
    }

    Ok(())
}

async fn show_page(client: &ApiClient, number: i32) -> Result<()> {
    let view = client.view(number).await?;
    // clear screen and home cursor
    print!("\x1b[2J\x1b[H");
    println!("{}", view.page.text());
    if let Some(warning) = view.warning {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
