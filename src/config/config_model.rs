#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub pi_network: PiNetwork,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Clone)]
pub struct PiNetwork {
    pub api_key: String,
    pub wallet_private_seed: String,
    pub base_url: String,
    pub http_timeout: u64,
}

impl std::fmt::Debug for PiNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiNetwork")
            .field("base_url", &self.base_url)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}
