#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::too_many_lines)]

mod address;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod notification;
pub mod packet;
pub mod service;
pub mod state_machine;
pub mod transport;

pub use address::BluetoothAddress;
pub use controller::{AvrcpController, ControllerOptions};
pub use notification::{NotificationEvent, NotificationSet};

use crate::connection::ConnectionError;
use crate::packet::PacketError;
use crate::state_machine::StateMachineError;
use crate::transport::AvctStatus;

/// Errors surfaced by the AVRCP controller API
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AvrcpError {
    /// A parameter failed validation
    InvalidParameter,
    /// The peer is already known
    AlreadyExists,
    /// The peer is unknown
    NotFound,
    /// The required channel is not established
    NotConnected,
    /// The peer does not support the operation
    NotSupported,
    /// The category's pending queue is full
    QueueFull,
    /// A registry is out of capacity
    CapacityExceeded,
    /// The transport reported a failure
    Transport(AvctStatus),
    /// A frame failed to assemble or parse
    Packet(PacketError),
}

impl From<ConnectionError> for AvrcpError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::AlreadyExists => Self::AlreadyExists,
            ConnectionError::CapacityExceeded => Self::CapacityExceeded,
            ConnectionError::QueueFull => Self::QueueFull,
        }
    }
}

impl From<StateMachineError> for AvrcpError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::AlreadyExists => Self::AlreadyExists,
            StateMachineError::NotFound => Self::NotFound,
            StateMachineError::CapacityExceeded => Self::CapacityExceeded,
        }
    }
}

impl From<PacketError> for AvrcpError {
    fn from(err: PacketError) -> Self {
        Self::Packet(err)
    }
}

impl From<AvctStatus> for AvrcpError {
    fn from(status: AvctStatus) -> Self {
        Self::Transport(status)
    }
}
