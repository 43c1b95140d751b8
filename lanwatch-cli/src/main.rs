mod logging;
mod options;

use options::Options;
use std::process;
use tracing::error;

#[cfg(target_os = "linux")]
mod watch {
    use crate::options::Options;
    use afpacket::{BoundSocket, InterfaceInfo, Socket};
    use crossbeam::channel;
    use lanwatch_packets::HwAddr;
    use lanwatch_runtime::tx::LocalSockets;
    use lanwatch_runtime::{
        capture, ChannelObserver, Error, FrameDissector, Interface, InterfaceConfig,
        NeighborEvent, Result, TxEngine,
    };
    use std::ffi::CString;
    use std::io;
    use std::sync::Arc;
    use tracing::{info, warn};

    fn open_interface(opts: &Options) -> Result<Interface> {
        let name = CString::new(opts.interface.as_str())
            .map_err(|_| Error::Config(format!("bad interface name '{}'", opts.interface)))?;
        let info = InterfaceInfo::query(&name).map_err(|err| match err.raw_os_error() {
            Some(libc::ENODEV) => Error::InterfaceNotFound {
                name: opts.interface.clone(),
            },
            _ => Error::Io(err),
        })?;
        if !info.is_up() {
            warn!(iface = %info.name, "interface is down");
        }
        let mut cfg = InterfaceConfig::from_info(&info)?;
        cfg.ring = Some(opts.ring);
        let iface = Interface::new(cfg)?;
        iface.query_capabilities();
        Ok(iface)
    }

    fn open_socket(opts: &Options) -> Result<BoundSocket> {
        let mut socket = Socket::new()?;
        socket.set_read_timeout(Some(opts.capture.read_timeout))?;
        let socket = socket.bind(CString::new(opts.interface.as_str()).map_err(|_| {
            Error::Config(format!("bad interface name '{}'", opts.interface))
        })?)?;
        if opts.promisc {
            socket.set_promiscuous(true)?;
        }
        Ok(socket)
    }

    fn print_event(event: &NeighborEvent) {
        match event {
            NeighborEvent::Added {
                iface,
                hwaddr,
                name: Some(name),
            } => println!("{} new {} ({})", iface, hwaddr, name),
            NeighborEvent::Added {
                iface,
                hwaddr,
                name: None,
            } => println!("{} new {}", iface, hwaddr),
            NeighborEvent::Named {
                iface,
                hwaddr,
                name,
            } => println!("{} {} is {}", iface, hwaddr, name),
        }
    }

    pub fn run(opts: Options) -> Result<()> {
        let iface = Arc::new(open_interface(&opts)?);
        let socket = Arc::new(open_socket(&opts)?);
        info!(
            iface = %iface.name(),
            index = iface.index(),
            hwaddr = %iface.hwaddr(),
            mtu = iface.mtu(),
            link = %iface.link_summary(),
            "opened interface"
        );

        if !opts.routes.is_empty() {
            let mut routes = iface.routes_mut();
            for route in &opts.routes {
                routes.add_route(*route);
            }
            info!(iface = %iface.name(), routes = routes.len(), "routes installed");
        }

        let tx = Arc::new(TxEngine::new(
            iface.clone(),
            Box::new(socket.clone()),
            Box::new(LocalSockets::new()?),
        ));
        let (observer, events) = ChannelObserver::new();
        let dissector = FrameDissector::new(iface.clone())
            .observer(Arc::new(observer))
            .tx(tx.clone());

        if let Some((target, source)) = opts.probe {
            let bcast = HwAddr::broadcast(iface.hwaddr().len());
            let sent = tx.send_arp_probe(&bcast, target, source)?;
            info!(iface = %iface.name(), target = %target, bytes = sent, "probe sent");
        }

        let (done_tx, done) = channel::bounded(1);
        let captured = crossbeam::thread::scope(|scope| {
            scope.spawn(|_| {
                let mut source = &*socket;
                let result = capture::run(&dissector, &mut source, &opts.capture);
                // The receiver is alive until this send lands.
                let _ = done_tx.send(result);
            });

            loop {
                crossbeam::select! {
                    recv(events) -> event => match event {
                        Ok(event) => print_event(&event),
                        Err(_) => break Ok(0),
                    },
                    recv(done) -> result => {
                        break result.unwrap_or(Ok(0));
                    },
                }
            }
        })
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture thread panicked"))?;
        for event in events.try_iter() {
            print_event(&event);
        }
        let frames = captured?;

        let stats = iface.stats();
        println!("{}: {} frames captured", iface.name(), frames);
        println!("{}: {}", iface.name(), stats);
        println!("{}: {}", iface.name(), iface.link_summary());
        let mut xml = String::new();
        if iface.lock().neighbors.write_xml(iface.bcast(), &mut xml).is_ok() {
            println!("{}", xml);
        }
        iface.teardown();
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn run(opts: Options) -> lanwatch_runtime::Result<()> {
    watch::run(opts)
}

#[cfg(not(target_os = "linux"))]
fn run(_opts: Options) -> lanwatch_runtime::Result<()> {
    Err(lanwatch_runtime::Error::Config(
        "capture needs Linux AF_PACKET sockets".into(),
    ))
}

fn main() {
    let matches = options::app().get_matches();
    let opts = match Options::from_matches(&matches) {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("lanwatch: {}", err);
            process::exit(2);
        }
    };
    logging::init_logging(opts.log_level.as_deref(), opts.log_format);

    if let Err(err) = run(opts) {
        error!(error = %err, "lanwatch failed");
        eprintln!("lanwatch: {}", err);
        process::exit(1);
    }
}
