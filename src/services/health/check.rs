use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::error::BoxError;
use crate::services::registry::types::Instance;

pub type HealthFuture = BoxFuture<'static, Result<bool, BoxError>>;

/// 调用方提供的健康检查谓词
pub type HealthPredicate = Arc<dyn Fn(Instance) -> HealthFuture + Send + Sync>;

/// 服务的健康检查配置
///
/// `None` 的服务不会被健康检查循环处理，其实例会一直保持 `unknown`。
#[derive(Clone, Default)]
pub enum HealthCheck {
    #[default]
    None,
    Predicate(HealthPredicate),
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthCheck::None => write!(f, "HealthCheck::None"),
            HealthCheck::Predicate(_) => write!(f, "HealthCheck::Predicate(..)"),
        }
    }
}

impl HealthCheck {
    pub fn from_fn<F, Fut, E>(check: F) -> Self
    where
        F: Fn(Instance) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        HealthCheck::Predicate(Arc::new(move |instance: Instance| -> HealthFuture {
            let fut = check(instance);
            async move { fut.await.map_err(|e| -> BoxError { e.into() }) }.boxed()
        }))
    }

    /// 能建立 TCP 连接即视为健康
    pub fn tcp(port: u16) -> Self {
        Self::from_fn(move |instance: Instance| async move {
            let target = tcp_target(&instance.host, port);
            tokio::net::TcpStream::connect(target).await?;
            Ok::<bool, std::io::Error>(true)
        })
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, HealthCheck::Predicate(_))
    }

    pub fn predicate(&self) -> Option<&HealthPredicate> {
        match self {
            HealthCheck::None => None,
            HealthCheck::Predicate(predicate) => Some(predicate),
        }
    }
}

// 实例地址本身带端口时直接使用
fn tcp_target(host: &str, port: u16) -> String {
    if host.parse::<SocketAddr>().is_ok() {
        return host.to_string();
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return SocketAddr::new(ip, port).to_string();
    }
    if host.matches(':').count() == 1 {
        return host.to_string();
    }
    format!("{host}:{port}")
}
