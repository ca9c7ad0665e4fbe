//! kvbench CLI Client
//!
//! Command-line interface for interacting with a kvbench server.

use clap::{Parser, Subcommand};
use kvbench::network::Client;
use kvbench::protocol::Reply;

/// kvbench CLI
#[derive(Parser, Debug)]
#[command(name = "kvbench-cli")]
#[command(about = "CLI for the kvbench key-value server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List keys matching a glob pattern
    Keys {
        /// Pattern using `*` and `?`
        pattern: String,

        /// Print each key's value after it
        #[arg(long)]
        withvalues: bool,

        /// Stop after this many keys
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Remove every key
    Flushdb,

    /// Ping the server
    Ping,

    /// Stop the server
    Shutdown,
}

impl Commands {
    fn into_args(self) -> Vec<String> {
        match self {
            Commands::Get { key } => vec!["GET".into(), key],
            Commands::Set { key, value } => vec!["SET".into(), key, value],
            Commands::Del { key } => vec!["DEL".into(), key],
            Commands::Keys {
                pattern,
                withvalues,
                limit,
            } => {
                let mut args = vec!["KEYS".into(), pattern];
                if withvalues {
                    args.push("WITHVALUES".into());
                }
                if let Some(n) = limit {
                    args.push("LIMIT".into());
                    args.push(n.to_string());
                }
                args
            }
            Commands::Flushdb => vec!["FLUSHDB".into()],
            Commands::Ping => vec!["PING".into()],
            Commands::Shutdown => vec!["SHUTDOWN".into()],
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    match client.call(&args.command.into_args()) {
        Ok(reply) => {
            let failed = reply.is_error();
            print_reply(&reply, "");
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a reply the way redis-cli does
fn print_reply(reply: &Reply, indent: &str) {
    match reply {
        Reply::Status(text) => println!("{}", text),
        Reply::Error(message) => println!("(error) {}", message),
        Reply::Integer(n) => println!("(integer) {}", n),
        Reply::Bulk(bytes) => println!("\"{}\"", String::from_utf8_lossy(bytes)),
        Reply::Null => println!("(nil)"),
        Reply::Array(items) if items.is_empty() => println!("(empty array)"),
        Reply::Array(items) => {
            let nested = format!("{}   ", indent);
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    print!("{}", indent);
                }
                print!("{}) ", i + 1);
                print_reply(item, &nested);
            }
        }
    }
}
