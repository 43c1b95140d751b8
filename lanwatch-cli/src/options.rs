use crate::logging::LogFormat;
use clap::{App, Arg, ArgMatches};
use lanwatch_runtime::interface::Route;
use lanwatch_runtime::{CaptureConfig, Error, Result, RingGeometry};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Everything the command line decides.
#[derive(Clone, Debug)]
pub struct Options {
    pub interface: String,
    pub promisc: bool,
    pub capture: CaptureConfig,
    pub ring: RingGeometry,
    /// Target and source protocol address of an ARP probe to send at startup.
    pub probe: Option<(Ipv4Addr, Ipv4Addr)>,
    /// Routes of the captured interface, used to name hosts and find gateways.
    pub routes: Vec<Route>,
    pub log_level: Option<String>,
    pub log_format: LogFormat,
}

pub fn app() -> App<'static, 'static> {
    App::new("lanwatch")
        .version("0.1.0")
        .about("Watches a LAN segment and keeps track of the hosts on it")
        .arg(
            Arg::with_name("interface")
                .short("i")
                .long("interface")
                .value_name("IFACE")
                .help("Interface to capture on")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("promisc")
                .long("promisc")
                .help("Put the interface into promiscuous mode"),
        )
        .arg(
            Arg::with_name("count")
                .short("c")
                .long("count")
                .value_name("N")
                .help("Exit after N frames")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("snaplen")
                .long("snaplen")
                .value_name("BYTES")
                .help("Capture buffer size")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tx-slots")
                .long("tx-slots")
                .value_name("N")
                .help("Number of transmit ring slots")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tx-slot-size")
                .long("tx-slot-size")
                .value_name("BYTES")
                .help("Size of one transmit ring slot")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("probe")
                .long("probe")
                .value_name("IPV4")
                .help("Broadcast an ARP probe for this address at startup")
                .takes_value(true)
                .requires("source"),
        )
        .arg(
            Arg::with_name("source")
                .long("source")
                .value_name("IPV4")
                .help("Sender protocol address of the probe")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("route")
                .long("route")
                .value_name("CIDR[,via GW][,src ADDR]")
                .help("A route of the interface. May be repeated")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("error, warn, info, debug or trace. RUST_LOG overrides it")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .takes_value(true)
                .possible_values(&["pretty", "compact"])
                .default_value("pretty"),
        )
}

fn parsed<T: FromStr>(matches: &ArgMatches<'_>, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("invalid --{} value '{}'", name, raw))),
    }
}

impl Options {
    pub fn from_matches(matches: &ArgMatches<'_>) -> Result<Options> {
        let interface = matches
            .value_of("interface")
            .ok_or_else(|| Error::Config("no interface given".into()))?
            .to_string();

        let mut capture = CaptureConfig::default();
        capture.count = parsed(matches, "count")?;
        if let Some(snaplen) = parsed::<usize>(matches, "snaplen")? {
            if snaplen == 0 {
                return Err(Error::Config("--snaplen must be positive".into()));
            }
            capture.snaplen = snaplen;
        }

        let mut ring = RingGeometry::default();
        if let Some(slots) = parsed(matches, "tx-slots")? {
            ring.slot_count = slots;
        }
        if let Some(size) = parsed(matches, "tx-slot-size")? {
            ring.slot_size = size;
        }

        let target = parsed::<Ipv4Addr>(matches, "probe")?;
        let source = parsed::<Ipv4Addr>(matches, "source")?;
        let probe = match (target, source) {
            (Some(target), Some(source)) => Some((target, source)),
            (Some(_), None) => return Err(Error::Config("--probe needs --source".into())),
            _ => None,
        };

        let routes = matches
            .values_of("route")
            .into_iter()
            .flatten()
            .map(|raw| {
                raw.parse::<Route>()
                    .map_err(|err| Error::Config(format!("invalid --route '{}': {}", raw, err)))
            })
            .collect::<Result<Vec<_>>>()?;

        let log_format = match matches.value_of("log-format") {
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        Ok(Options {
            interface,
            promisc: matches.is_present("promisc"),
            capture,
            ring,
            probe,
            routes,
            log_level: matches.value_of("log-level").map(str::to_string),
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        let matches = app()
            .get_matches_from_safe(args)
            .map_err(|err| Error::Config(err.message))?;
        Options::from_matches(&matches)
    }

    #[test]
    fn defaults() {
        let opts = parse(&["lanwatch", "-i", "eth0"]).unwrap();
        assert_eq!(opts.interface, "eth0");
        assert!(!opts.promisc);
        assert_eq!(opts.capture.snaplen, 65535);
        assert_eq!(opts.capture.count, None);
        assert_eq!(opts.ring, RingGeometry::default());
        assert_eq!(opts.probe, None);
        assert!(opts.routes.is_empty());
        assert_eq!(opts.log_format, LogFormat::Pretty);
    }

    #[test]
    fn everything() {
        let opts = parse(&[
            "lanwatch",
            "--interface",
            "wlan0",
            "--promisc",
            "-c",
            "10",
            "--snaplen",
            "1600",
            "--tx-slots",
            "4",
            "--tx-slot-size",
            "512",
            "--probe",
            "192.168.1.1",
            "--source",
            "192.168.1.20",
            "--log-level",
            "debug",
            "--log-format",
            "compact",
        ])
        .unwrap();
        assert!(opts.promisc);
        assert_eq!(opts.capture.count, Some(10));
        assert_eq!(opts.capture.snaplen, 1600);
        assert_eq!(
            opts.ring,
            RingGeometry {
                slot_count: 4,
                slot_size: 512
            }
        );
        assert_eq!(
            opts.probe,
            Some((Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 20)))
        );
        assert_eq!(opts.log_level.as_deref(), Some("debug"));
        assert_eq!(opts.log_format, LogFormat::Compact);
    }

    #[test]
    fn repeated_routes() {
        let opts = parse(&[
            "lanwatch",
            "-i",
            "eth0",
            "--route",
            "192.168.1.0/24",
            "--route",
            "0.0.0.0/0,via 192.168.1.1,src 192.168.1.20",
        ])
        .unwrap();
        assert_eq!(opts.routes.len(), 2);
        match opts.routes[1] {
            Route::V4(route) => {
                assert_eq!(route.prefix_len, 0);
                assert_eq!(route.gateway, Some(Ipv4Addr::new(192, 168, 1, 1)));
                assert_eq!(route.source, Some(Ipv4Addr::new(192, 168, 1, 20)));
            }
            Route::V6(_) => panic!("expected an IPv4 route"),
        }

        assert!(matches!(
            parse(&["lanwatch", "-i", "eth0", "--route", "192.168.1.0/40"]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(
            parse(&["lanwatch", "-i", "eth0", "-c", "many"]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse(&["lanwatch", "-i", "eth0", "--snaplen", "0"]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse(&["lanwatch", "-i", "eth0", "--probe", "10.0.0.1"]),
            Err(Error::Config(_))
        ));
        assert!(parse(&["lanwatch"]).is_err());
    }
}
