#![warn(missing_docs)]

//! Framelink: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports the most
//! commonly used types for link-layer messaging apps:
//!
//! - The engine and its events (`Node`, `NodeEvent`, `ChannelSink`)
//! - Addressing and configuration (`HardwareAddress`, `Config`)
//! - The event-sink seam (`EventSink`, `NullSink`)
//! - Interface enumeration (`list_interfaces`, `LinkInterface`)
//! - Link statistics (`StatisticsSnapshot`)
//!
//! Example
//! ```ignore
//! use framelink::prelude::*;
//! use std::sync::Arc;
//!
//! let iface = framelink::list_interfaces().unwrap().remove(0);
//! let (sink, events) = ChannelSink::new();
//! let mut node = Node::open(&iface.name, Arc::new(sink), Config::default()).unwrap();
//!
//! node.send_text(HardwareAddress::BROADCAST, "hello segment").unwrap();
//! loop {
//!     node.poll_events();
//!     while let Ok(event) = events.try_recv() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

// Core: addressing, configuration, the event-sink seam
pub use framelink_core::{
    config::Config,
    error::{ErrorKind, Result},
    hwaddr::HardwareAddress,
    sink::{EventSink, NullSink},
};
// Host: the engine, its events, and the peer table
pub use framelink_host::{
    discovery::PeerRecord,
    events::{ChannelSink, NodeEvent},
    node::Node,
};
// Link: statistics
pub use framelink_link::statistics::StatisticsSnapshot;
// Protocol: payload kinds
pub use framelink_protocol::frame::FrameType;
// Utilities: interface enumeration
pub use framelink_utilities::{interface_by_name, list_interfaces, LinkInterface};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        ChannelSink, Config, ErrorKind, EventSink, FrameType, HardwareAddress, LinkInterface,
        Node, NodeEvent, NullSink, PeerRecord, StatisticsSnapshot,
    };
}
