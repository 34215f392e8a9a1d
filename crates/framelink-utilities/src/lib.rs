#![warn(missing_docs)]

//! Utility functions for framelink.
//!
//! This crate provides the OS-dependent interface resolver. Its only
//! contract is "return the name and hardware address of a usable network
//! interface"; everything else in the stack is OS-independent behind the
//! `LinkSocket` trait. Kept as a separate crate so the core stays free of
//! platform code.

use framelink_core::{
    error::{ErrorKind, Result},
    hwaddr::HardwareAddress,
};

/// A physical network interface usable for link-layer messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInterface {
    /// OS interface name (e.g. `eth0`).
    pub name: String,
    /// The interface's hardware address.
    pub address: HardwareAddress,
}

/// Enumerates physical interfaces with a usable hardware address.
///
/// Loopback and interfaces with an all-zero address are skipped.
pub fn list_interfaces() -> std::io::Result<Vec<LinkInterface>> {
    platform::list_interfaces()
}

/// Looks up one interface by name.
pub fn interface_by_name(name: &str) -> Result<LinkInterface> {
    list_interfaces()?
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| ErrorKind::InterfaceNotFound(name.to_owned()))
}

#[cfg(target_os = "linux")]
mod platform {
    use std::{ffi::CStr, io};

    use framelink_core::hwaddr::HardwareAddress;

    use super::LinkInterface;

    /// Walks `getifaddrs`, collecting AF_PACKET entries.
    pub fn list_interfaces() -> io::Result<Vec<LinkInterface>> {
        let mut addrs: *mut libc::ifaddrs = std::ptr::null_mut();
        if unsafe { libc::getifaddrs(&mut addrs) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut interfaces = Vec::new();
        let mut cursor = addrs;
        while !cursor.is_null() {
            let entry = unsafe { &*cursor };
            cursor = entry.ifa_next;

            if entry.ifa_addr.is_null() {
                continue;
            }
            let family = unsafe { (*entry.ifa_addr).sa_family };
            if family as i32 != libc::AF_PACKET {
                continue;
            }
            if entry.ifa_flags & libc::IFF_LOOPBACK as u32 != 0 {
                continue;
            }

            let sll = entry.ifa_addr as *const libc::sockaddr_ll;
            let halen = unsafe { (*sll).sll_halen } as usize;
            if halen != 6 {
                continue;
            }
            let mut octets = [0u8; 6];
            octets.copy_from_slice(unsafe { &(&(*sll).sll_addr)[..6] });
            if octets == [0u8; 6] {
                continue;
            }

            let name = unsafe { CStr::from_ptr(entry.ifa_name) }
                .to_string_lossy()
                .into_owned();
            interfaces.push(LinkInterface { name, address: HardwareAddress::new(octets) });
        }

        unsafe { libc::freeifaddrs(addrs) };
        Ok(interfaces)
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use std::io;

    use super::LinkInterface;

    /// Raw packet interfaces are only resolvable on Linux.
    pub fn list_interfaces() -> io::Result<Vec<LinkInterface>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "interface enumeration is only implemented for Linux",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_interface_is_an_error() {
        // Whatever the platform returns, a made-up name must not resolve.
        match interface_by_name("framelink-test-missing0") {
            Err(ErrorKind::InterfaceNotFound(name)) => {
                assert_eq!(name, "framelink-test-missing0");
            }
            Err(ErrorKind::IoError(_)) => {} // non-Linux platforms
            other => panic!("unexpected result: {:?}", other.map(|i| i.name)),
        }
    }
}
