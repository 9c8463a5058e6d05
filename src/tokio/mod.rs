mod bedrock;
mod java;

use std::{net::IpAddr, sync::OnceLock};

use hickory_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
};
use tracing::{debug, trace};

use crate::Error;

/// Represents a pingable entity.
pub trait AsyncPingable {
    /// The type of response that is expected in reply to the ping.
    type Response;

    /// Ping the entity, gathering the latency and response.
    fn ping(self)
    -> impl std::future::Future<Output = Result<(u64, Self::Response), Error>> + Send;
}

/// Retrieve the status of a given Minecraft server using a `AsyncPingable` configuration.
///
///
/// Returns `(latency_ms, response)` where response is a response type of the `Pingable` configuration.
///
/// # Examples
///
/// Ping a Java Server with no timeout:
///
/// ```no_run
/// # async {
/// let (latency, response) = piglin::tokio::get_status(piglin::Java {
///     server_address: "mc.hypixel.net".into(),
///     ..Default::default()
/// }).await?;
/// # Ok::<(), piglin::Error>(())
/// # };
/// ```
///
/// Ping a Bedrock server with a two second deadline:
///
/// ```no_run
/// # async {
/// use std::time::Duration;
///
/// let (latency, response) = piglin::tokio::get_status(piglin::Bedrock {
///     server_address: "play.nethergames.org".into(),
///     timeout: Some(Duration::from_secs(2)),
///     ..Default::default()
/// }).await?;
/// # Ok::<(), piglin::Error>(())
/// # };
/// ```
///
/// # Errors
/// If the server status cannot be recieved
pub async fn get_status<P: AsyncPingable + Send>(pingable: P) -> Result<(u64, P::Response), Error> {
    pingable.ping().await
}

fn new_resolver() -> TokioAsyncResolver {
    let config = ResolverConfig::cloudflare();
    let mut opts = ResolverOpts::default();
    opts.cache_size = 64;
    opts.attempts = 3;
    TokioAsyncResolver::tokio(config, opts)
}

pub fn resolver() -> &'static TokioAsyncResolver {
    static RESOLVER: OnceLock<TokioAsyncResolver> = OnceLock::new();
    RESOLVER.get_or_init(new_resolver)
}

/// Splits `host[:port]`, falling back to `default_port` when no port segment
/// is present.
pub(crate) fn split_address(address: &str, default_port: u16) -> Result<(&str, u16), Error> {
    let (host, port) = match address.split_once(':') {
        Some((host, port)) => (host, port.parse().map_err(|_| Error::InvalidAddress)?),
        None => (address, default_port),
    };
    if host.is_empty() {
        return Err(Error::InvalidAddress);
    }
    Ok((host, port))
}

/// Looks up the SRV record `_minecraft._tcp.{host}.` and, when one exists,
/// rewrites the target to the record's host and port.
///
/// Lookup failure is not an error for the ping as a whole; the caller's
/// host and port are kept unchanged.
pub(crate) async fn srv_override(host: &str, port: u16) -> (String, u16) {
    // SRV records cannot exist for IP literals.
    if host.parse::<IpAddr>().is_ok() {
        return (host.to_string(), port);
    }

    match resolver()
        .srv_lookup(format!("_minecraft._tcp.{host}."))
        .await
    {
        Ok(lookup) => lookup.into_iter().next().map_or_else(
            || (host.to_string(), port),
            |record| {
                let target = record.target().to_string();
                let target = target.trim_end_matches('.').to_string();
                debug!(%target, port = record.port(), "SRV record overrides ping target");
                (target, record.port())
            },
        ),
        Err(err) => {
            trace!(%err, "no SRV override, keeping original target");
            (host.to_string(), port)
        }
    }
}

/// Resolves `host` to a single IP address. Unlike the SRV override, failure
/// here is fatal: there is nothing left to connect to.
pub(crate) async fn lookup_ip(host: &str) -> Result<IpAddr, Error> {
    if let Ok(ip) = host.parse() {
        return Ok(ip);
    }
    resolver()
        .lookup_ip(host)
        .await
        .ok()
        .and_then(|ips| ips.into_iter().next())
        .ok_or(Error::ResolutionFailure)
}
