//! Minimal console chat over one Ethernet segment.
//!
//! Usage: `sudo link_chat <interface> [peer-mac]`
//! Without a peer address, messages are broadcast. Requires the privilege
//! to open raw packet sockets.

#[cfg(target_os = "linux")]
fn main() {
    use std::{io::BufRead, sync::Arc, time::Duration};

    use framelink::prelude::*;

    let mut args = std::env::args().skip(1);
    let interface = match args.next() {
        Some(name) => name,
        None => {
            eprintln!("usage: link_chat <interface> [peer-mac]");
            for iface in framelink::list_interfaces().unwrap_or_default() {
                eprintln!("  {} ({})", iface.name, iface.address);
            }
            std::process::exit(2);
        }
    };
    let destination = args
        .next()
        .map(|mac| mac.parse::<HardwareAddress>().expect("bad peer MAC"))
        .unwrap_or(HardwareAddress::BROADCAST);

    let (sink, events) = ChannelSink::new();
    let mut node = match Node::open(&interface, Arc::new(sink), Config::default()) {
        Ok(node) => node,
        Err(e) => {
            eprintln!("could not open {}: {}", interface, e);
            std::process::exit(1);
        }
    };
    println!("listening on {} as {}", interface, node.local_address());

    let (line_tx, line_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    loop {
        node.poll_events();
        while let Ok(event) = events.try_recv() {
            match event {
                NodeEvent::Message { sender, text } => println!("[{}] {}", sender, text),
                NodeEvent::Error { context, reason } => eprintln!("error ({}): {}", context, reason),
                NodeEvent::PeerFound { address, hostname } => {
                    println!("* discovered {} ({})", hostname, address)
                }
                NodeEvent::Progress { label, done, total } => {
                    println!("* {}: {}/{}", label, done, total)
                }
            }
        }
        while let Ok(line) = line_rx.try_recv() {
            if line == "/quit" {
                return;
            }
            if let Err(e) = node.send_text(destination, &line) {
                eprintln!("send failed: {}", e);
            }
        }
        std::thread::sleep(Duration::from_millis(40));
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("link_chat requires Linux raw packet sockets");
}
