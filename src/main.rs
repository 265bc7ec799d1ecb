use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};

use anyhow::Context;
use clap::Parser;

mod app;
mod auth;
mod categories;
mod cli;
mod config;
mod eid;
mod favicon;
mod links;
mod storage;
#[cfg(test)]
mod tests;
mod users;
mod web;

use config::Config;

fn default_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(base_path) = std::env::var("LINKDOCK_BASE_PATH") {
        return Ok(PathBuf::from(base_path));
    }

    let home = homedir::my_home()
        .context("couldnt determine home directory")?
        .context("no home directory for current user")?;

    Ok(home.join(".local/share/linkdock"))
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    let config = Arc::new(RwLock::new(Config::load_with(&data_dir)?));

    match args.command {
        cli::Command::Daemon {} => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "info".into()),
                )
                .init();

            let mut app_mgr = app::AppLocal::new(config, &data_dir)?;
            app_mgr.run_queue();
            web::start_daemon(app_mgr);
            Ok(())
        }

        cli::Command::Resolve { url } => {
            let http = config.read().unwrap().http.clone();
            let result = favicon::resolve(&http, &url);

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        cli::Command::Register {
            username,
            email,
            password,
        } => {
            let app_mgr = app::AppLocal::new(config, &data_dir)?;
            let (user, _token) = app_mgr.register(&username, &email, &password)?;

            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        }
    }
}
