// 该文件是 Haiyan （海眼） 项目的一部分。
// src/server.rs - HTTP 服务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

pub mod page;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
  Router,
  body::Bytes,
  extract::{DefaultBodyLimit, Multipart, State},
  http::StatusCode,
  response::Html,
  routing::{get, post},
};
use image::RgbImage;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::model::{DetectResult, LabelTable, Model};
use crate::output::Draw;
use crate::task::{self, PassError};

/// 上传表单中图像字段的名称
pub const UPLOAD_FIELD: &str = "image";

pub struct AppState<M> {
  pub model: M,
  pub labels: LabelTable,
  pub draw: Draw,
}

/// 构建检测服务的路由
pub fn router<M>(state: Arc<AppState<M>>) -> Router
where
  M: Model<Input = RgbImage, Output = DetectResult> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(index))
    .route("/detect", post(detect::<M>))
    .layer(DefaultBodyLimit::disable())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// 启动服务并阻塞至收到退出信号
pub async fn serve<M>(state: Arc<AppState<M>>, bind: SocketAddr) -> anyhow::Result<()>
where
  M: Model<Input = RgbImage, Output = DetectResult> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  let app = router(state);
  let listener = TcpListener::bind(bind).await?;
  info!("服务已启动: http://{}", bind);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    tokio::signal::ctrl_c()
      .await
      .expect("failed to install Ctrl+C handler");
  };

  #[cfg(unix)]
  let terminate = async {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
      .expect("failed to install signal handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("收到中断信号，准备退出...");
}

async fn index() -> Html<String> {
  Html(page::index())
}

async fn detect<M>(
  State(state): State<Arc<AppState<M>>>,
  multipart: Multipart,
) -> (StatusCode, Html<String>)
where
  M: Model<Input = RgbImage, Output = DetectResult> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  let bytes = match read_upload(multipart).await {
    Ok(bytes) => bytes,
    Err(detail) => {
      warn!("上传请求无效: {}", detail);
      return (StatusCode::BAD_REQUEST, Html(page::rejected(&detail)));
    }
  };

  // 推理为 CPU 密集操作，移出异步执行器
  let worker = {
    let state = state.clone();
    tokio::task::spawn_blocking(move || {
      task::run_pass(&state.model, &state.draw, &state.labels, &bytes)
    })
  };

  match worker.await {
    Ok(Ok(outcome)) => (
      StatusCode::OK,
      Html(page::results(&outcome, &state.labels)),
    ),
    Ok(Err(PassError::Rejected(e))) => {
      warn!("上传图像被拒绝: {}", e);
      (
        StatusCode::BAD_REQUEST,
        Html(page::rejected(&e.to_string())),
      )
    }
    Ok(Err(PassError::Inference { error, original })) => {
      error!("推理失败: {}", error);
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(page::failed(Some(&original), &error.to_string())),
      )
    }
    Err(e) => {
      error!("推理任务异常中止: {}", e);
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(page::failed(None, "inference task aborted unexpectedly")),
      )
    }
  }
}

async fn read_upload(mut multipart: Multipart) -> Result<Bytes, String> {
  loop {
    let field = match multipart.next_field().await {
      Ok(Some(field)) => field,
      Ok(None) => return Err(format!("missing field `{}` in form", UPLOAD_FIELD)),
      Err(e) => return Err(format!("invalid multipart request: {e}")),
    };

    if field.name() == Some(UPLOAD_FIELD) {
      return match field.bytes().await {
        Ok(bytes) => Ok(bytes),
        Err(e) => Err(format!("failed to read upload: {e}")),
      };
    }
  }
}
