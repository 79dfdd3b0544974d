//! Connection Manager (spec.md §4.2, component C): resolves a
//! maybe-url, dials it with a configurable timeout, and owns the
//! resulting [`Connected`] handle. Grounded on the teacher's
//! `client::connect::dns` (the `GaiResolver`/`tokio::task::spawn_blocking`
//! split between name resolution and connection) and `server::tcp`
//! (socket option setters threaded through a typed builder).

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use url::Url;

use crate::error::{Error, Result};

use super::io::{self, Connected, LifecycleEvent};

/// The protocol's only defined scheme; spec.md §4.2 defaults the scheme
/// to this when the user supplies a bare `host[:port]`.
const SCHEME: &str = "telnet";

/// IANA's registered telnet port. `original_source`'s retrieved subset
/// never assigns its own device default (no `kPort`/`DEFAULT_PORT`
/// constant appears in the filtered `_INDEX.md` files), so this falls
/// back to the scheme's own standard port rather than an invented one.
pub const DEFAULT_PORT: u16 = 23;

/// This host's own network identity, as far as the dispatch core can
/// observe it without platform-specific interface enumeration (spec.md
/// §1, Out of scope).
#[derive(Debug, Clone, Copy)]
pub struct LocalConfiguration {
    pub host_ip: std::net::IpAddr,
}

/// Which address families a resolution will accept (spec.md §4.2:
/// "may be constrained to IPv4-only or IPv6-only").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFilter {
    Any,
    V4Only,
    V6Only,
}

impl IpFilter {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            IpFilter::Any => true,
            IpFilter::V4Only => addr.is_ipv4(),
            IpFilter::V6Only => addr.is_ipv6(),
        }
    }
}

/// Typed configuration in place of a config file or environment lookup
/// (spec.md §4.0.2 / SPEC_FULL.md §4.0.2): the caller builds one of
/// these and hands it to [`ConnectionManager::new`].
#[derive(Debug, Clone)]
pub struct ConnectionManagerBuilder {
    ip_filter: IpFilter,
    connect_timeout: Duration,
    write_stall_timeout: Duration,
}

impl ConnectionManagerBuilder {
    pub fn new() -> Self {
        ConnectionManagerBuilder {
            ip_filter: IpFilter::Any,
            connect_timeout: Duration::from_secs(10),
            write_stall_timeout: Duration::from_secs(5),
        }
    }

    pub fn ip_filter(mut self, filter: IpFilter) -> Self {
        self.ip_filter = filter;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn write_stall_timeout(mut self, timeout: Duration) -> Self {
        self.write_stall_timeout = timeout;
        self
    }

    pub fn build(self) -> ConnectionManager {
        let (lifecycle_tx, _) = broadcast::channel(32);
        ConnectionManager {
            config: self,
            lifecycle_tx,
            app_data_delegate: None,
        }
    }
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        ConnectionManagerBuilder::new()
    }
}

/// Owns at most one active [`Connected`] handle at a time. Many
/// lifecycle subscribers may observe connect/disconnect transitions;
/// exactly one application-data delegate may observe inbound bytes
/// (spec.md §4.2: "to avoid racey duplicate parsing").
pub struct ConnectionManager {
    config: ConnectionManagerBuilder,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    app_data_delegate: Option<mpsc::UnboundedSender<bytes::Bytes>>,
}

impl ConnectionManager {
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new()
    }

    /// Subscribes to lifecycle transitions. Returns a fresh `broadcast`
    /// receiver; a slow subscriber that falls behind loses the oldest
    /// unread events rather than stalling the connection (spec.md §4.2
    /// doesn't require delivery guarantees stronger than "eventually
    /// observed" for lifecycle events, unlike application data).
    /// `GetConfiguration` (spec.md §4.2): this host's own interface
    /// details, for the server role to announce itself. Platform
    /// network-interface enumeration is explicitly out of scope
    /// (spec.md §1); the caller supplies the already-known local
    /// address instead of this reaching into OS-specific APIs.
    pub fn local_configuration(&self, connected: &Connected) -> LocalConfiguration {
        LocalConfiguration {
            host_ip: connected.local_addr().ip(),
        }
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle_tx.subscribe()
    }

    /// Registers the single application-data delegate. Returns
    /// `AlreadyExists` if one is already registered.
    pub fn set_application_data_delegate(
        &mut self,
        delegate: mpsc::UnboundedSender<bytes::Bytes>,
    ) -> Result<()> {
        if self.app_data_delegate.is_some() {
            return Err(Error::already_exists());
        }
        self.app_data_delegate = Some(delegate);
        Ok(())
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is the common case before the first `connect`;
        // `send` failing just means nobody is listening yet.
        let _ = self.lifecycle_tx.send(event);
    }

    /// Resolves, dials, and wires up reader/writer tasks for `maybe_url`.
    /// Emits `WillConnect`/`IsConnecting` and exactly one of
    /// `DidConnect`/`DidNotConnect` (spec.md §4.2).
    pub async fn connect(&self, maybe_url: &str) -> Result<Connected> {
        self.emit(LifecycleEvent::WillConnect);

        let addr = match resolve(maybe_url, self.config.ip_filter).await {
            Ok(addr) => addr,
            Err(err) => {
                self.emit(LifecycleEvent::DidNotConnect(err.to_string()));
                return Err(err);
            }
        };

        self.emit(LifecycleEvent::IsConnecting);

        let stream = match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(io_err)) => {
                let err = Error::not_connected().with(io_err);
                self.emit(LifecycleEvent::DidNotConnect(err.to_string()));
                return Err(err);
            }
            Err(_elapsed) => {
                let err = Error::timed_out();
                self.emit(LifecycleEvent::DidNotConnect(err.to_string()));
                return Err(err);
            }
        };

        self.emit(LifecycleEvent::DidConnect);

        let connected = io::spawn(
            stream,
            self.config.write_stall_timeout,
            self.app_data_delegate.clone(),
            self.lifecycle_tx.clone(),
        );
        Ok(connected)
    }
}

/// Resolves `maybe_url` to a single socket address honoring `filter`,
/// preferring the first candidate DNS returns (spec.md §4.2 does not
/// ask for happy-eyeballs racing across candidates — one device, one
/// reachable address, is the expected shape).
pub async fn resolve(maybe_url: &str, filter: IpFilter) -> Result<SocketAddr> {
    let (host, port) = parse_maybe_url(maybe_url)?;
    let candidates = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(Error::host_unresolvable)?;
    candidates
        .filter(|addr| filter.accepts(addr))
        .next()
        .ok_or_else(|| Error::host_unresolvable(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no {:?}-compatible address for {}", filter, host),
        )))
}

fn parse_maybe_url(maybe_url: &str) -> Result<(String, u16)> {
    let url = if maybe_url.contains("://") {
        Url::parse(maybe_url).map_err(Error::invalid_with)?
    } else {
        Url::parse(&format!("{}://{}", SCHEME, maybe_url)).map_err(Error::invalid_with)?
    };

    if url.scheme() != SCHEME {
        return Err(Error::protocol_unsupported());
    }

    let host = url
        .host_str()
        .ok_or_else(Error::invalid)?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = url.port().unwrap_or(DEFAULT_PORT);
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_host_defaults_scheme_and_port() {
        let (host, port) = parse_maybe_url("den-audio.local").unwrap();
        assert_eq!(host, "den-audio.local");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    fn parse_host_with_explicit_port() {
        let (host, port) = parse_maybe_url("den-audio.local:2300").unwrap();
        assert_eq!(host, "den-audio.local");
        assert_eq!(port, 2300);
    }

    #[test]
    fn parse_scheme_qualified_url() {
        let (host, port) = parse_maybe_url("telnet://den-audio.local:2300").unwrap();
        assert_eq!(host, "den-audio.local");
        assert_eq!(port, 2300);
    }

    #[test]
    fn parse_rejects_unsupported_scheme() {
        let err = parse_maybe_url("https://den-audio.local").unwrap_err();
        assert!(!err.is_invalid());
    }
}
