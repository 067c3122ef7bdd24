use configs::{AppConfig, LogFormat};
use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG / SERVER_PORT 等环境变量生效
    dotenv().ok();

    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "fruits-api", event = "config_invalid", error = %e, "cannot load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging(cfg.logging.format == LogFormat::Json);
    info!(service = "fruits-api", event = "logger_init", "tracing subscriber initialized");

    // 基础服务上下文（不含敏感信息）
    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    // Panic 钩子：捕获异常并输出错误日志，便于排查问题
    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "fruits-api",
            event = "panic",
            %service_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let worker_threads = cfg.server.worker_threads;
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = worker_threads {
        builder.worker_threads(w);
    }

    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "fruits-api", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "fruits-api",
        event = "start",
        %service_id,
        pid,
        version,
        threads = worker_threads.unwrap_or_default(),
        data_file = %cfg.storage.data_file.display(),
        "fruits api starting"
    );

    // server::run_with_config 自行处理 Ctrl+C / SIGTERM 并在退出前保存数据
    match rt.block_on(server::run_with_config(cfg)) {
        Ok(()) => {
            info!(service = "fruits-api", event = "stop", %service_id, pid, "fruits api stopped normally");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "fruits-api", event = "run_failed", %service_id, error = %e, "fruits api stopped with an error");
            std::process::ExitCode::FAILURE
        }
    }
}
