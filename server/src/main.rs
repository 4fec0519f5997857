/*
 * This file is a part of Vaultd
 * Vaultd is a free and open-source in-memory key-value store
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # Vaultd
//!
//! A single-node, in-memory, multi-datatype key-value store. See the
//! module documentation of [`protocol`], [`engine`] and [`dbnet`] for
//! the wire format, the command engine and the connection dispatch
//! loop respectively.

mod config;
mod dbnet;
mod engine;
mod protocol;
mod util;

use clap::Parser;
use config::Config;
use engine::Engine;
use libshared::{util::terminal, URL, VERSION};
use std::env;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    env_logger::Builder::new()
        .parse_filters(&env::var("VAULTD_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();

    let config = Config::parse();
    println!("vaultd v{} | {}", VERSION, URL);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("vaultd-worker")
        .enable_all()
        .build()
        .expect("failed to start the tokio runtime");

    let result = runtime.block_on(run(config));
    drop(runtime);

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(0x01);
    }
    let _ = terminal::write_info("vaultd has shut down\n");
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new();

    if let Some(restore_path) = &config.restore {
        log::info!("restoring from snapshot at {}", restore_path.display());
        match engine.restore(restore_path) {
            Ok(protocol::Value::Int(1)) => log::info!("restore completed"),
            Ok(_) => log::warn!("no snapshot found at {}, starting empty", restore_path.display()),
            Err(e) => log::error!("restore failed: {}", e),
        }
    }

    let addr = config.bind_addr();
    log::info!("binding to {} (maxcon={})", addr, config.maxcon);
    let listener = dbnet::connect(engine, &addr, config.maxcon).await?;

    tokio::select! {
        res = listener.run() => res?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("received ctrl-c, shutting down");
        }
    }
    Ok(())
}
