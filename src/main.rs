use mimalloc::MiMalloc;
use modules::{
    common::signal::SignalManager,
    context::{status, Initialize},
    database::manager::DatabaseManager,
    error::{code::ErrorCode, MailBoardResult},
    logger,
    rest::start_http_server,
    settings::dir::DataDirManager,
    tasks::PeriodicTasks,
    token::ensure_root_token,
};
use tracing::{error, info};

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

static LOGO: &str = r#"
  __  __       _ _ ____                      _
 |  \/  | __ _(_) | __ )  ___   __ _ _ __ __| |
 | |\/| |/ _` | | |  _ \ / _ \ / _` | '__/ _` |
 | |  | | (_| | | | |_) | (_) | (_| | | | (_| |
 |_|  |_|\__,_|_|_|____/ \___/ \__,_|_|  \__,_|

"#;

#[tokio::main]
async fn main() -> MailBoardResult<()> {
    logger::initialize_logging();
    status::mark_started();
    info!("{}", LOGO);
    info!("Starting mailboard-server");
    info!("Version:  {}", mailboard_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    if let Err(error) = initialize().await {
        eprintln!("{:?}", error);
        return Err(error);
    }

    start_server().await
}

/// Initialize the system by validating settings and starting necessary tasks.
async fn initialize() -> MailBoardResult<()> {
    SignalManager::initialize().await?;
    DataDirManager::initialize().await?;
    DatabaseManager::initialize().await?;
    ensure_root_token().await?;
    PeriodicTasks::start_background_tasks();
    Ok(())
}

async fn start_server() -> MailBoardResult<()> {
    let http_server = tokio::spawn(async move {
        let result = start_http_server().await;
        if let Err(e) = &result {
            error!("Failed to start REST server: {}", e);
        }
        result
    });

    http_server
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
}
