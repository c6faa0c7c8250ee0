use ferrous_netd_domain::NetworkError;

/// Supplies the dynamic part of the upstream server list as raw server lines.
pub trait UpstreamSource: Send + Sync {
    fn read_servers(&self) -> Result<Vec<String>, NetworkError>;

    /// Used in log lines.
    fn describe(&self) -> String;
}
