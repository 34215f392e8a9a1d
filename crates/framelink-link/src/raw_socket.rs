//! Linux raw packet socket transport.
//!
//! Opens an `AF_PACKET`/`SOCK_RAW` socket bound to one interface with the
//! protocol's EtherType, so the kernel filters foreign traffic before it
//! reaches the receive loop. Requires `CAP_NET_RAW` (typically root).

use std::{io, mem, time::Duration};

use framelink_core::{
    constants::LINK_ETHERTYPE,
    error::{ErrorKind, Result},
    hwaddr::HardwareAddress,
    transport::LinkSocket,
};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

/// A raw packet socket bound to one interface.
pub struct RawPacketSocket {
    socket: Socket,
    address: HardwareAddress,
}

impl RawPacketSocket {
    /// Opens and binds the socket.
    ///
    /// `address` is the interface's hardware address (from the interface
    /// resolver); `read_timeout` bounds each blocking receive so the loop
    /// can observe its stop flag.
    pub fn open(
        interface: &str,
        address: HardwareAddress,
        read_timeout: Duration,
    ) -> Result<Self> {
        let index = interface_index(interface)?;
        // Network byte order, as AF_PACKET expects.
        let protocol = LINK_ETHERTYPE.to_be();

        let socket = Socket::new(Domain::PACKET, Type::RAW, Some(Protocol::from(protocol as i32)))?;

        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        {
            let sll = &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_ll;
            unsafe {
                (*sll).sll_family = libc::AF_PACKET as libc::sa_family_t;
                (*sll).sll_protocol = protocol;
                (*sll).sll_ifindex = index as libc::c_int;
            }
        }
        let bind_addr = unsafe {
            SockAddr::new(storage, mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t)
        };
        socket.bind(&bind_addr)?;
        socket.set_read_timeout(Some(read_timeout))?;

        tracing::info!("raw socket bound to {} ({})", interface, address);
        Ok(Self { socket, address })
    }
}

impl LinkSocket for RawPacketSocket {
    fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
        self.socket.send(frame)
    }

    fn recv_frame(&self, buffer: &mut [u8]) -> io::Result<usize> {
        // socket2 reads into MaybeUninit; an initialized &mut [u8] is a
        // valid view of the same memory.
        let uninit = unsafe {
            &mut *(buffer as *mut [u8] as *mut [mem::MaybeUninit<u8>])
        };
        self.socket.recv(uninit)
    }

    fn local_address(&self) -> HardwareAddress {
        self.address
    }
}

/// Resolves an interface name to its OS index.
fn interface_index(name: &str) -> Result<u32> {
    let name_cstr = std::ffi::CString::new(name)
        .map_err(|_| ErrorKind::InterfaceNotFound(name.to_owned()))?;
    let index = unsafe { libc::if_nametoindex(name_cstr.as_ptr()) };
    if index == 0 {
        return Err(ErrorKind::InterfaceNotFound(name.to_owned()));
    }
    Ok(index)
}
