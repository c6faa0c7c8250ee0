use ferrous_netd_application::ports::UpstreamSource;
use ferrous_netd_domain::NetworkError;
use std::ffi::CString;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Reads `nameserver` lines from a resolv.conf-style file.
pub struct ResolvFileSource {
    path: PathBuf,
}

impl ResolvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, content: &str) -> Vec<String> {
        let mut servers = Vec::new();

        // Format:
        // nameserver 192.168.1.1
        // nameserver fe80::1%eth0
        for line in content.lines() {
            let mut fields = line.split_whitespace();
            if fields.next() != Some("nameserver") {
                continue;
            }
            let Some(token) = fields.next() else {
                continue;
            };

            match resolve_scope(token) {
                Some(server) => servers.push(server),
                None => warn!(
                    path = %self.path.display(),
                    nameserver = token,
                    "Unknown interface in nameserver scope"
                ),
            }
        }

        servers
    }
}

impl UpstreamSource for ResolvFileSource {
    fn read_servers(&self) -> Result<Vec<String>, NetworkError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| NetworkError::UpstreamSource {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let servers = self.parse(&content);
        debug!(path = %self.path.display(), count = servers.len(), "Read resolv file");
        Ok(servers)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Rewrites `addr%ifname` to `addr%index`. Numeric scopes pass through.
fn resolve_scope(token: &str) -> Option<String> {
    let Some((addr, scope)) = token.split_once('%') else {
        return Some(token.to_string());
    };
    if scope.parse::<u32>().is_ok() {
        return Some(token.to_string());
    }

    let name = CString::new(scope).ok()?;
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    (index != 0).then(|| format!("{}%{}", addr, index))
}

/// Operator-supplied server lines, e.g. from a reconfiguration request.
pub struct StaticServerSource {
    lines: Vec<String>,
}

impl StaticServerSource {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

impl UpstreamSource for StaticServerSource {
    fn read_servers(&self) -> Result<Vec<String>, NetworkError> {
        Ok(self.lines.clone())
    }

    fn describe(&self) -> String {
        "runtime server list".to_string()
    }
}
