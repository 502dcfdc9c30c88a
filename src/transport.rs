//! AVCTP Transport Seam
//!
//! The connection core never talks to L2CAP directly. It drives an
//! [`AvctTransport`] implementation for outbound operations and consumes
//! [`AvctEvent`]s for everything the transport reports back: connect and
//! disconnect confirmations, incoming connections, and received frames.
//! Tests substitute a recording fake for the real transport.

use crate::BluetoothAddress;
use crate::packet::FrameBuf;

/// Transport-level connection identifier assigned at connect time
pub type ConnectId = u8;

/// Role taken when bringing up a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AvctRole {
    /// Local side opens the L2CAP channels
    Initiator,
    /// Remote side opened the channels
    Acceptor,
}

/// Status codes returned by transport operations and confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AvctStatus {
    /// Operation completed
    Success,
    /// Operation failed
    Failed,
    /// Transport out of channel resources
    NoResources,
    /// Channel already has an operation in progress
    ChannelBusy,
    /// No channel established to the peer
    NotConnected,
}

impl AvctStatus {
    /// Whether the status reports success
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Outbound operations on the AVCTP transport
pub trait AvctTransport {
    /// Register a PSM so the transport accepts incoming connections on it
    fn register(&mut self, psm: u16) -> AvctStatus;

    /// Deregister a previously registered PSM
    fn deregister(&mut self, psm: u16);

    /// Open the control channel to a peer
    fn connect_request(&mut self, addr: BluetoothAddress, role: AvctRole) -> AvctStatus;

    /// Close the control channel
    fn disconnect_request(&mut self, connect_id: ConnectId) -> AvctStatus;

    /// Open the browse channel to an already control-connected peer
    fn browse_connect_request(&mut self, addr: BluetoothAddress) -> AvctStatus;

    /// Close the browse channel
    fn browse_disconnect_request(&mut self, connect_id: ConnectId) -> AvctStatus;

    /// Send an assembled frame on the control channel
    fn send_message(&mut self, connect_id: ConnectId, frame: &[u8]) -> AvctStatus;

    /// Send an assembled frame on the browse channel
    fn browse_send_message(&mut self, connect_id: ConnectId, frame: &[u8]) -> AvctStatus;
}

/// Events the transport reports up to the connection core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvctEvent {
    /// Outbound control connect completed
    ConnectConfirm {
        /// Peer address
        addr: BluetoothAddress,
        /// Assigned connection id, valid on success
        connect_id: ConnectId,
        /// Result of the connect
        status: AvctStatus,
        /// Negotiated peer MTU
        peer_mtu: u16,
    },
    /// A peer opened the control channel to us
    ConnectIndication {
        /// Peer address
        addr: BluetoothAddress,
        /// Assigned connection id
        connect_id: ConnectId,
        /// Negotiated peer MTU
        peer_mtu: u16,
    },
    /// Outbound control disconnect completed
    DisconnectConfirm {
        /// Peer address
        addr: BluetoothAddress,
        /// Result of the disconnect
        status: AvctStatus,
    },
    /// The peer closed the control channel
    DisconnectIndication {
        /// Peer address
        addr: BluetoothAddress,
    },
    /// Outbound browse connect completed
    BrowseConnectConfirm {
        /// Peer address
        addr: BluetoothAddress,
        /// Result of the connect
        status: AvctStatus,
        /// Negotiated peer MTU
        peer_mtu: u16,
    },
    /// Browse channel closed, by us or the peer
    BrowseDisconnectConfirm {
        /// Peer address
        addr: BluetoothAddress,
        /// Result of the disconnect
        status: AvctStatus,
    },
    /// A frame arrived on the control channel
    MessageReceived {
        /// Peer address
        addr: BluetoothAddress,
        /// Raw frame
        frame: FrameBuf,
    },
    /// A frame arrived on the browse channel
    BrowseMessageReceived {
        /// Peer address
        addr: BluetoothAddress,
        /// Raw frame
        frame: FrameBuf,
    },
}
