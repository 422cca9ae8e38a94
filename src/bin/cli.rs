use anyhow::Context;
use clap::{Parser, Subcommand};

use redload::{
    conf::{Backend, Configuration},
    telemetry::{get_subscriber, init_subscriber},
    ModuleRegistry, Redis, MODULE_NAME,
};

/// Issue commands through the load-testing Redis façade.
///
/// Failures are logged and the command prints the value a script would have received.
#[derive(Parser)]
#[clap(name = "redload-cli", version, author, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    cmd: Commands,

    /// Configuration file, settings are also read from `REDLOAD__*` variables.
    #[clap(long)]
    config: Option<String>,

    /// The `host:port` address of the server.
    #[clap(long)]
    address: Option<String>,

    /// Password of the server.
    #[clap(long)]
    password: Option<String>,

    /// Index of the logical database.
    #[clap(long)]
    db: Option<i64>,

    /// Use an in-process store instead of a server.
    #[clap(long)]
    memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Set key's value.
    Set {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "VALUE")]
        value: String,
        /// Expiration in seconds, 0 keeps the key forever.
        #[clap(long, default_value_t = 0)]
        ex: u64,
    },

    /// Get key's value.
    Get {
        #[clap(name = "KEY")]
        key: String,
    },

    /// Delete a key.
    Del {
        #[clap(name = "KEY")]
        key: String,
    },

    /// Run an arbitrary command against a key.
    Do {
        #[clap(name = "COMMAND")]
        command: String,
        #[clap(name = "KEY")]
        key: String,
    },

    /// Run one step of a key-space scan.
    Scan {
        #[clap(name = "CURSOR", default_value_t = 0)]
        cursor: u64,
        #[clap(long = "match", default_value = "")]
        pattern: String,
        #[clap(long, default_value_t = 0)]
        count: u64,
    },

    /// Set a hash field's value.
    Hset {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "FIELD")]
        field: String,
        #[clap(name = "VALUE")]
        value: String,
    },

    /// Get a hash field's value.
    Hget {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "FIELD")]
        field: String,
    },

    /// Get all fields and values of a hash.
    Hgetall {
        #[clap(name = "KEY")]
        key: String,
    },

    /// Delete hash fields.
    Hdel {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "FIELD", required = true)]
        fields: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let mut conf =
        Configuration::get(cli.config.as_deref()).context("could not load configuration")?;
    if let Some(address) = cli.address {
        conf.client.address = address;
    }
    if let Some(password) = cli.password {
        conf.client.password = password;
    }
    if let Some(db) = cli.db {
        conf.client.database = db;
    }
    if cli.memory {
        conf.backend = Backend::Memory;
    }

    // Setup global `tracing` subscriber
    let subscriber = get_subscriber("redload".into(), conf.log_level.clone(), std::io::stderr);
    init_subscriber(subscriber)?;

    let mut registry = ModuleRegistry::default();
    redload::register(&mut registry)?;
    let redis = registry.instantiate::<Redis>(MODULE_NAME)?;
    let client = conf.client();

    match cli.cmd {
        Commands::Set { key, value, ex } => {
            redis.set(&client, &key, &value, ex).await;
            println!("\"OK\"");
        }
        Commands::Get { key } => println!("{:?}", redis.get(&client, &key).await),
        Commands::Del { key } => {
            redis.del(&client, &key).await;
            println!("\"OK\"");
        }
        Commands::Do { command, key } => {
            println!("{:?}", redis.exec(&client, &command, &key).await)
        }
        Commands::Scan {
            cursor,
            pattern,
            count,
        } => {
            let result = redis.scan(&client, cursor, &pattern, count).await;
            println!("(cursor) {}", result.cursor);
            for (i, key) in result.keys.iter().enumerate() {
                println!("{}) {:?}", i + 1, key);
            }
        }
        Commands::Hset { key, field, value } => {
            redis.hset(&client, &key, &field, &value).await;
            println!("\"OK\"");
        }
        Commands::Hget { key, field } => {
            println!("{:?}", redis.hget(&client, &key, &field).await)
        }
        Commands::Hgetall { key } => {
            let mut pairs: Vec<_> = redis.hgetall(&client, &key).await.into_iter().collect();
            pairs.sort();
            for (field, value) in pairs {
                println!("{:?} => {:?}", field, value);
            }
        }
        Commands::Hdel { key, fields } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            redis.hdel(&client, &key, &fields).await;
            println!("\"OK\"");
        }
    }

    Ok(())
}
