//! HTTP 客户端构建
//! 统一处理超时、重定向、TLS 校验与自定义 DNS 服务器

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::GlobalConfig;
use crate::error::MarretaResult;

/// 使用指定 DNS 服务器的解析器
#[derive(Clone)]
pub struct CustomDnsResolver {
    inner: Arc<TokioAsyncResolver>,
}

impl CustomDnsResolver {
    pub fn new(servers: &[IpAddr]) -> Self {
        let group = NameServerConfigGroup::from_ips_clear(servers, 53, true);
        let config = ResolverConfig::from_parts(None, Vec::new(), group);
        Self {
            inner: Arc::new(TokioAsyncResolver::tokio(config, ResolverOpts::default())),
        }
    }
}

impl Resolve for CustomDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.inner.clone();
        Box::pin(async move {
            let lookup = resolver.lookup_ip(name.as_str()).await?;
            let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

/// 按配置构建客户端
pub fn build_client(
    config: &GlobalConfig,
    timeout: Duration,
    redirect: Policy,
) -> MarretaResult<Client> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .redirect(redirect)
        .user_agent(config.user_agent.as_str())
        .danger_accept_invalid_certs(!config.verify_ssl);

    if !config.dns_servers.is_empty() {
        builder = builder.dns_resolver(Arc::new(CustomDnsResolver::new(&config.dns_servers)));
    }

    Ok(builder.build()?)
}
