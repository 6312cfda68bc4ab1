use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use bbs_player::{
    app::{App, Flow},
    config::Config,
    library::FeedLibrary,
    player::{PlayerOptions, PlayerSession, ProcessBackend},
    sources::HttpSource,
    storage::JsonStorage,
    ui::Command,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs a stderr; stdout queda para la salida de los comandos
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bbs_player=info".parse()?),
        )
        .init();

    info!("📼 Iniciando bbs-player v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("{}", config.summary());

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    let storage = JsonStorage::new(config.data_dir.clone()).await?;

    let source = Arc::new(HttpSource::from_config(&config)?);
    let body_cache = source.cache().clone();
    let mut library = FeedLibrary::new(source, storage.clone(), config.default_feeds.clone())
        .with_cache_time(config.cache_ttl);
    library.initialize().await?;

    let options = PlayerOptions {
        autoplay: config.autoplay,
        persist_state: config.persist_state,
    };
    let backend = Box::new(ProcessBackend::new(config.player_command.clone()));
    let (player, events) = PlayerSession::new(backend, options);
    let player = player.with_storage(storage.clone());

    let mut app = App::new(library, player, events, storage).with_body_cache(body_cache);

    let command = if args.is_empty() {
        Command::Play(None)
    } else {
        match Command::from_args(&args) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                eprintln!("{}", bbs_player::ui::HELP);
                std::process::exit(2);
            }
        }
    };

    // Transporte => sesión interactiva; el resto se ejecuta una vez
    if command.is_transport() {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Error escuchando ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        };
        return app.run_interactive(command, shutdown).await;
    }

    match app.execute(command).await {
        Ok(Flow::Continue(output)) => println!("{}", output),
        Ok(Flow::Quit) => {}
        Err(e) => {
            error!("❌ Error: {:?}", e);
            return Err(e);
        }
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    ProcessBackend::new(config.player_command.clone())
        .health_check()
        .await?;
    println!("OK");
    Ok(())
}
