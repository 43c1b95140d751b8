#![cfg(target_os = "linux")]

// These tests open AF_PACKET sockets and need CAP_NET_RAW. Run them with
// `sudo -E cargo test -p afpacket -- --ignored`.

use afpacket;
use lanwatch_packets as packets;
use rand::{self, Rng};
use std::{ffi::CString, sync::mpsc, thread, time::Duration};

#[test]
#[ignore]
fn layer2_loopback() {
    // If this takes more than a second to occur, something's definitely wrong.
    let timeout = Duration::from_secs(1);

    let mut rng = rand::thread_rng();

    let iface_name = CString::new("lo").unwrap();

    let side_a = afpacket::Socket::new().unwrap();
    let side_a = side_a.bind(&iface_name).unwrap();

    let mut side_b = afpacket::Socket::new().unwrap();
    side_b.set_read_timeout(Some(timeout)).unwrap();

    let sender = packets::HwAddr::new(rng.gen());
    let sender_proto: [u8; 4] = [10, 0, 0, rng.gen_range(1..255)];
    let probe = packets::ArpProbe {
        sender_hw: &sender,
        sender_proto: &sender_proto,
        target_hw: &packets::HwAddr::broadcast(6),
        target_proto: &[10, 0, 0, 254],
    };
    let mut frame = vec![0; probe.len()];
    probe.write(&mut frame).unwrap();

    let (tx, rx) = mpsc::channel();
    let thread_b = thread::spawn(move || {
        let side_b = side_b.bind(&iface_name).unwrap();
        side_b.set_promiscuous(true).unwrap();
        tx.send(()).unwrap();

        // lo also shows us unrelated traffic, so wait for the frame carrying our sender.
        let mut in_buffer = vec![0; 1500];
        loop {
            let info = side_b.recv(&mut in_buffer).unwrap();
            let eth = match packets::EthernetHeader::parse(&in_buffer[..info.captured]) {
                Ok(eth) => eth,
                Err(_) => continue,
            };
            if eth.source() == sender.as_bytes() {
                in_buffer.truncate(info.captured);
                break in_buffer;
            }
        }
    });

    rx.recv_timeout(timeout).unwrap();
    assert_eq!(side_a.send(&frame).unwrap(), frame.len());

    let received = thread_b.join().unwrap();
    assert_eq!(received, frame);

    let eth = packets::EthernetHeader::parse(&received).unwrap();
    let arp = packets::ArpPacket::parse(eth.payload()).unwrap();
    assert_eq!(arp.sender_protocol_addr(), &sender_proto);
}

#[test]
#[ignore]
fn statistics_and_ifindex() {
    let iface_name = CString::new("lo").unwrap();
    let info = afpacket::InterfaceInfo::query(&iface_name).unwrap();
    let sock = afpacket::Socket::new().unwrap().bind(&iface_name).unwrap();
    assert_eq!(sock.ifindex(), info.index);
    let stats = sock.statistics().unwrap();
    assert!(stats.drops <= stats.packets);
}
