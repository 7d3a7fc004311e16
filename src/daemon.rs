use service_registry::{Config, HealthCheck, ServiceRegistry};

pub async fn start() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let registry_config = config.registry_config();
    let report_interval = registry_config.discovery_interval;

    // 初始化服务注册表
    let registry = ServiceRegistry::new(registry_config);

    for service in config.services {
        let mut details = service.details;
        if let Some(port) = service.tcp_health_port {
            details = details.with_health_check(HealthCheck::tcp(port));
        }

        // 单个服务配置错误不影响其他服务
        if let Err(e) = registry.register(service.name.clone(), details).await {
            tracing::error!(service_name = %service.name, error = %e, "Failed to register service");
        }
    }

    registry.start();

    let mut interval = tokio::time::interval(report_interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = interval.tick() => {
                for summary in registry.get_all_services() {
                    tracing::info!(
                        service_name = %summary.name,
                        status = ?summary.status,
                        instances = summary.instance_count,
                        healthy = summary.healthy_instance_count,
                        "Service status"
                    );
                }
            }
        }
    }

    registry.stop().await;
    Ok(())
}
