use std::{future::Future, sync::Arc, time::Duration};

use common::env::ensure_parent_dir;
use configs::AppConfig;
use service::{fruits::FruitStore, storage::JsonSnapshot};
use tokio::{net::TcpListener, sync::Notify};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::routes::{self, ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load the snapshot, bind, serve and save the snapshot on the way out.
/// The caller owns `.env`, config loading and logging setup.
pub async fn run_with_config(cfg: AppConfig) -> anyhow::Result<()> {
    let snapshot = JsonSnapshot::new(&cfg.storage.data_file);
    ensure_parent_dir(snapshot.path()).await?;

    // 启动阶段加载失败直接返回错误，避免带着不完整的数据继续运行
    let store = FruitStore::load(&snapshot).await?;
    info!(
        count = store.len().await,
        path = %snapshot.path().display(),
        "fruit store ready"
    );

    let addr = cfg.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "starting fruits api");

    serve(listener, store, snapshot, cfg.shutdown_grace(), shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` resolves, give in-flight requests up
/// to `grace` to finish, then persist the store.
pub async fn serve<F>(
    listener: TcpListener,
    store: FruitStore,
    snapshot: JsonSnapshot,
    grace: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = routes::build_router(ServerState { store: store.clone() }, build_cors());

    let signalled = Arc::new(Notify::new());
    let mut server = {
        let signalled = Arc::clone(&signalled);
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown.await;
                    signalled.notify_one();
                })
                .await
        })
    };

    let joined = tokio::select! {
        res = &mut server => res,
        _ = signalled.notified() => {
            info!(grace_secs = grace.as_secs(), "shutdown requested, draining in-flight requests");
            match tokio::time::timeout(grace, &mut server).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(grace_secs = grace.as_secs(), "grace period elapsed, dropping remaining connections");
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    let served = match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "http server failed");
            Err(anyhow::Error::from(e))
        }
        Err(e) => {
            error!(error = %e, "http server task join error");
            Err(anyhow::Error::from(e))
        }
    };

    // 超时后被 abort 的只是 accept 循环，已建立的连接任务仍可能写入；
    // 先关闭 store，保存之后不会再有写入成功返回
    store.close().await;
    let count = store.len().await;
    match store.save(&snapshot).await {
        Ok(true) => info!(count, path = %snapshot.path().display(), "fruits saved"),
        Ok(false) => info!(path = %snapshot.path().display(), "no fruits in the store, snapshot not written"),
        Err(e) => {
            error!(count, path = %snapshot.path().display(), error = %e, "saving fruits failed");
            served?;
            return Err(e.into());
        }
    }

    served
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(signal = "ctrl_c", "shutdown signal received"),
        _ = terminate => info!(signal = "sigterm", "shutdown signal received"),
    }
}
