use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use chan_mirror::{ChanClient, Config, PostId};

/// Follow imageboard threads from the command line.
#[derive(Parser, Debug)]
#[command(name = "chan-mirror")]
#[command(about = "Read boards and follow threads over the JSON API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all boards
    Boards,
    /// List live thread ids of a board, by page
    Threads { board: String },
    /// Show one index page of a board
    Index {
        board: String,
        #[arg(default_value_t = 1)]
        page: u32,
    },
    /// Show the catalog of a board
    Catalog { board: String },
    /// Print a whole thread
    Thread { board: String, thread: u64 },
    /// Follow a thread and report new and deleted posts
    Watch {
        board: String,
        thread: u64,
        /// Stop after this many refreshes (default: until interrupted)
        #[arg(long)]
        rounds: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "chan_mirror=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let client = ChanClient::new(&config).context("failed to create HTTP client")?;

    match cli.command {
        Command::Boards => {
            for board in client.boards()? {
                println!("/{}/ - {}", board.board, board.title);
            }
        }
        Command::Threads { board } => {
            let pages = client
                .thread_list(&board)
                .with_context(|| format!("failed to list threads of /{}/", board))?;
            for (page, threads) in pages.iter().enumerate() {
                let ids: Vec<String> = threads.iter().map(PostId::to_string).collect();
                println!("page {}: {}", page + 1, ids.join(" "));
            }
        }
        Command::Index { board, page } => {
            let threads = client
                .index(&board, page)
                .with_context(|| format!("failed to load /{}/ page {}", board, page))?;
            for thread in threads {
                if let Some(op) = thread.op() {
                    println!(
                        "#{} {} ({} replies, {} omitted)",
                        op.id,
                        op.subject,
                        op.op.replies,
                        op.op.omitted_posts
                    );
                }
            }
        }
        Command::Catalog { board } => {
            let pages = client
                .catalog(&board)
                .with_context(|| format!("failed to load catalog of /{}/", board))?;
            for page in pages {
                println!("page {}", page.page);
                for op in page.threads {
                    println!("  #{} {} ({} replies)", op.id, op.subject, op.op.replies);
                }
            }
        }
        Command::Thread { board, thread } => {
            let posts = client
                .thread(&board, PostId(thread))
                .with_context(|| format!("failed to load /{}/{}", board, thread))?;
            for post in posts {
                println!("{}\n", post);
            }
        }
        Command::Watch {
            board,
            thread,
            rounds,
        } => watch(&client, &board, PostId(thread), rounds)?,
    }

    Ok(())
}

fn watch(
    client: &ChanClient,
    board: &str,
    thread: PostId,
    rounds: Option<u64>,
) -> anyhow::Result<()> {
    let mut mirror = client
        .mirror(board, thread)
        .with_context(|| format!("failed to open /{}/{}", board, thread))?;
    println!("{} posts in {}", mirror.len(), mirror.key());

    let mut round = 0;
    while rounds.map_or(true, |limit| round < limit) {
        round += 1;
        // A failed round leaves the mirror as it was; try again next slot.
        match mirror.refresh(client) {
            Ok(delta) if delta.is_unchanged() => {}
            Ok(delta) => {
                println!(
                    "+{} -{} ({} posts)",
                    delta.inserted,
                    delta.deleted,
                    mirror.len()
                );
                for post in &mirror.posts()[mirror.len() - delta.inserted..] {
                    println!("{}\n", post);
                }
            }
            Err(e) if e.is_not_found() => {
                println!("{} is gone", mirror.key());
                break;
            }
            Err(e) => tracing::error!(thread = %mirror.key(), error = %e, "refresh failed"),
        }
        if mirror.closed() {
            println!("{} is closed", mirror.key());
            break;
        }
    }

    Ok(())
}
