use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route4 {
    pub dest: Ipv4Addr,
    pub prefix_len: u8,
    /// `None` for on-link routes.
    pub gateway: Option<Ipv4Addr>,
    /// Preferred source address for traffic using this route.
    pub source: Option<Ipv4Addr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route6 {
    pub dest: Ipv6Addr,
    pub prefix_len: u8,
    pub gateway: Option<Ipv6Addr>,
    pub source: Option<Ipv6Addr>,
}

/// A route of either family, as given on a command line.
///
/// The text form is `DEST[/PREFIX][,via GATEWAY][,src SOURCE]`. A missing prefix means a host
/// route, and all addresses must share one family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    V4(Route4),
    V6(Route6),
}

fn v4(addr: IpAddr) -> Option<Ipv4Addr> {
    match addr {
        IpAddr::V4(a) => Some(a),
        IpAddr::V6(_) => None,
    }
}

fn v6(addr: IpAddr) -> Option<Ipv6Addr> {
    match addr {
        IpAddr::V6(a) => Some(a),
        IpAddr::V4(_) => None,
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Route, String> {
        let mut parts = s.split(',').map(str::trim);
        let target = parts.next().unwrap_or_default();
        let (addr, prefix) = match target.find('/') {
            Some(at) => (&target[..at], Some(&target[at + 1..])),
            None => (target, None),
        };
        let dest: IpAddr = addr
            .parse()
            .map_err(|_| format!("bad route destination '{}'", addr))?;
        let max = if dest.is_ipv4() { 32 } else { 128 };
        let prefix_len = match prefix {
            None => max,
            Some(p) => p
                .parse::<u8>()
                .ok()
                .filter(|len| *len <= max)
                .ok_or_else(|| format!("bad prefix length '{}'", p))?,
        };

        let mut gateway = None;
        let mut source = None;
        for part in parts {
            let words: Vec<&str> = part.split_whitespace().collect();
            let (key, value) = match words.as_slice() {
                [key, value] => (*key, *value),
                _ => return Err(format!("expected 'via ADDR' or 'src ADDR', got '{}'", part)),
            };
            let value: IpAddr = value
                .parse()
                .map_err(|_| format!("bad address '{}'", value))?;
            if value.is_ipv4() != dest.is_ipv4() {
                return Err(format!("'{}' mixes address families", s));
            }
            match key {
                "via" => gateway = Some(value),
                "src" => source = Some(value),
                other => return Err(format!("unknown route attribute '{}'", other)),
            }
        }

        Ok(match dest {
            IpAddr::V4(dest) => Route::V4(Route4 {
                dest,
                prefix_len,
                gateway: gateway.and_then(v4),
                source: source.and_then(v4),
            }),
            IpAddr::V6(dest) => Route::V6(Route6 {
                dest,
                prefix_len,
                gateway: gateway.and_then(v6),
                source: source.and_then(v6),
            }),
        })
    }
}

/// The parts of a matching route the dissector cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub gateway: Option<IpAddr>,
    pub source: Option<IpAddr>,
}

/// Answers which route traffic to an address would take.
pub trait RouteLookup: Send + Sync {
    fn lookup(&self, addr: IpAddr) -> Option<RouteMatch>;
}

/// Per-interface IPv4 and IPv6 routes, kept up to date by whoever watches the kernel's tables.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    v4: Vec<Route4>,
    v6: Vec<Route6>,
}

fn mask4(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - n.min(32) as u32),
    }
}

fn mask6(prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        n => u128::MAX << (128 - n.min(128) as u32),
    }
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    /// Adds a route, replacing any existing one for the same destination prefix.
    pub fn add_route4(&mut self, route: Route4) {
        self.del_route4(route.dest, route.prefix_len);
        self.v4.push(route);
    }

    /// Returns true if a route was removed.
    pub fn del_route4(&mut self, dest: Ipv4Addr, prefix_len: u8) -> bool {
        let before = self.v4.len();
        self.v4
            .retain(|r| !(r.dest == dest && r.prefix_len == prefix_len));
        self.v4.len() != before
    }

    pub fn add_route6(&mut self, route: Route6) {
        self.del_route6(route.dest, route.prefix_len);
        self.v6.push(route);
    }

    pub fn del_route6(&mut self, dest: Ipv6Addr, prefix_len: u8) -> bool {
        let before = self.v6.len();
        self.v6
            .retain(|r| !(r.dest == dest && r.prefix_len == prefix_len));
        self.v6.len() != before
    }

    pub fn add_route(&mut self, route: Route) {
        match route {
            Route::V4(route) => self.add_route4(route),
            Route::V6(route) => self.add_route6(route),
        }
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Longest-prefix match for an IPv4 destination.
    pub fn route4(&self, addr: Ipv4Addr) -> Option<&Route4> {
        let addr = u32::from(addr);
        self.v4
            .iter()
            .filter(|r| {
                let mask = mask4(r.prefix_len);
                addr & mask == u32::from(r.dest) & mask
            })
            .max_by_key(|r| r.prefix_len)
    }

    pub fn route6(&self, addr: Ipv6Addr) -> Option<&Route6> {
        let addr = u128::from(addr);
        self.v6
            .iter()
            .filter(|r| {
                let mask = mask6(r.prefix_len);
                addr & mask == u128::from(r.dest) & mask
            })
            .max_by_key(|r| r.prefix_len)
    }
}

impl RouteLookup for RouteTable {
    fn lookup(&self, addr: IpAddr) -> Option<RouteMatch> {
        match addr {
            IpAddr::V4(a) => self.route4(a).map(|r| RouteMatch {
                gateway: r.gateway.map(IpAddr::V4),
                source: r.source.map(IpAddr::V4),
            }),
            IpAddr::V6(a) => self.route6(a).map(|r| RouteMatch {
                gateway: r.gateway.map(IpAddr::V6),
                source: r.source.map(IpAddr::V6),
            }),
        }
    }
}
