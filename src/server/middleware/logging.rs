//! HTTP request logging middleware

/// Access log: method, path, status, elapsed time and remote address
pub fn with_request_logging() -> warp::filters::log::Log<impl Fn(warp::filters::log::Info) + Clone>
{
    warp::log::custom(|info| {
        let status = info.status();
        let elapsed_ms = info.elapsed().as_millis();
        let remote_addr = info
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let line = format!(
            "{} {} - {} {}ms - {} - User-Agent: \"{}\"",
            info.method(),
            info.path(),
            status.as_u16(),
            elapsed_ms,
            remote_addr,
            info.user_agent().unwrap_or("unknown")
        );

        if status.is_server_error() {
            log::error!(target: "sketchbrew::access", "{}", line);
        } else if status.is_client_error() || elapsed_ms > 5000 {
            log::warn!(target: "sketchbrew::access", "{}", line);
        } else {
            log::info!(target: "sketchbrew::access", "{}", line);
        }
    })
}
