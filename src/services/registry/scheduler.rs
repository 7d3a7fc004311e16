use dashmap::DashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use super::service::ServiceRegistry;

// 后台任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Discovery,
    HealthCheck,
}

// 同一服务同一类型的任务同时只运行一个，guard 释放时清除标记
struct InFlightGuard {
    jobs: Arc<DashSet<(JobKind, String)>>,
    key: (JobKind, String),
}

impl InFlightGuard {
    fn acquire(jobs: &Arc<DashSet<(JobKind, String)>>, kind: JobKind, name: &str) -> Option<Self> {
        let key = (kind, name.to_string());
        if !jobs.insert(key.clone()) {
            return None;
        }
        Some(Self {
            jobs: jobs.clone(),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.jobs.remove(&self.key);
    }
}

impl ServiceRegistry {
    /// 启动后台发现与健康检查循环
    pub fn start(&self) {
        if self.shutdown.is_cancelled() {
            tracing::warn!("Service registry has been stopped and cannot be restarted");
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Service registry background tasks already running");
            return;
        }

        self.spawn_loop(JobKind::Discovery, self.config.discovery_interval);
        self.spawn_loop(JobKind::HealthCheck, self.config.health_check_interval);

        tracing::info!(
            discovery_interval_secs = self.config.discovery_interval.as_secs_f64(),
            health_check_interval_secs = self.config.health_check_interval.as_secs_f64(),
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "Service registry background tasks started"
        );
    }

    /// 停止后台循环并等待正在执行的任务结束
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;
        tracing::info!("Service registry background tasks stopped");
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shutdown.is_cancelled()
    }

    fn spawn_loop(&self, kind: JobKind, period: Duration) {
        // tokio 的 interval 不接受零周期
        let period = period.max(Duration::from_millis(1));
        let registry = self.clone();
        self.task_tracker.spawn(async move {
            // 首次执行在一个周期之后，注册时已经做过一次发现
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = registry.shutdown.cancelled() => break,
                    _ = interval.tick() => registry.dispatch(kind),
                }
            }

            tracing::debug!(job = ?kind, "Background loop exited");
        });
    }

    // 为每个服务投递一个任务，不等待任务完成
    fn dispatch(&self, kind: JobKind) {
        let names = self.service_names();
        tracing::debug!(job = ?kind, services = names.len(), "Dispatching background jobs");

        for name in names {
            let Some(guard) = InFlightGuard::acquire(&self.in_flight, kind, &name) else {
                tracing::debug!(
                    service_name = %name,
                    job = ?kind,
                    "Previous job still running, skipping this tick"
                );
                continue;
            };

            let registry = self.clone();
            self.task_tracker.spawn(async move {
                let _guard = guard;
                let _permit = tokio::select! {
                    _ = registry.shutdown.cancelled() => return,
                    permit = registry.job_permits.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };

                let job = async {
                    match kind {
                        JobKind::Discovery => registry.discover_service(&name).await,
                        JobKind::HealthCheck => registry.check_health(&name).await,
                    }
                };

                tokio::select! {
                    _ = registry.shutdown.cancelled() => {
                        tracing::debug!(service_name = %name, job = ?kind, "Job cancelled by shutdown");
                    }
                    _ = job => {}
                }
            });
        }
    }
}
