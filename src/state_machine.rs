//! AVRCP Connection State Machines
//!
//! Each device pairs a control channel machine with an optional browse
//! channel machine. Machines are plain tagged enums; feeding a message
//! into a machine returns the list of side-effect actions the caller must
//! execute against the transport. Dispatch itself never touches the
//! transport or any lock, so handlers can feed follow-up messages without
//! re-entering anything.

use heapless::{FnvIndexMap, Vec};

use crate::BluetoothAddress;
use crate::constants::{MAX_ACTIONS, MAX_CONNECTIONS};
use crate::packet::{CommandCategory, PduId};

/// State machine registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum StateMachineError {
    /// A machine pair for this address already exists
    AlreadyExists,
    /// No machine pair for this address
    NotFound,
    /// The registry is full
    CapacityExceeded,
}

/// Control channel states
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ControlState {
    /// Waiting for the control channel to come up
    Connecting,
    /// Channel up, no command outstanding
    Connected,
    /// A UNIT INFO or vendor command is awaiting its response
    Pending,
    /// Reassembling a fragmented vendor response
    Continuation,
    /// Waiting for the control channel to go down
    Disconnecting,
    /// Profile shutting down, channel deregistered
    Disable,
}

/// Browse channel states
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BrowseState {
    /// Waiting for the browse channel to come up
    Connecting,
    /// Channel up, no command outstanding
    Connected,
    /// A browse command is awaiting its response
    Pending,
    /// Waiting for the browse channel to go down
    Disconnecting,
}

/// Messages fed into a control channel machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ControlMessage {
    /// Channel established or outstanding exchange finished
    ToConnected,
    /// Start tearing the channel down
    ToDisconnecting,
    /// Profile shutdown
    ToDisable,
    /// A fragmented response started, drive the continuation exchange
    ToContinuation,
    /// Send a PASS THROUGH command
    PassThrough,
    /// Send a UNIT INFO / SUB UNIT INFO command
    UnitInfo,
    /// Send a vendor command
    Vendor(PduId),
}

/// Messages fed into a browse channel machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum BrowseMessage {
    /// Channel established or outstanding exchange finished
    ToConnected,
    /// Start tearing the channel down
    ToDisconnecting,
    /// Send a browse command
    Command,
}

/// Side effects a dispatch asks the caller to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Action {
    /// Open the control channel
    ConnectRequest,
    /// Close the control channel
    DisconnectRequest,
    /// Open the browse channel
    BrowseConnectRequest,
    /// Close the browse channel
    BrowseDisconnectRequest,
    /// Assemble and send the in-flight command of the category
    SendControlFrame(CommandCategory),
    /// Send the parked continuation command
    SendContinuation,
    /// Assemble and send the in-flight browse command
    SendBrowseFrame,
    /// Deregister the AVCTP PSMs
    DeregisterChannel,
}

/// Action list produced by one dispatch
pub type ActionVec = Vec<Action, MAX_ACTIONS>;

fn actions(list: &[Action]) -> ActionVec {
    let mut vec = ActionVec::new();
    for action in list {
        vec.push(*action).ok();
    }
    vec
}

/// One device's machine pair
#[derive(Debug)]
pub struct StateMachinePair {
    /// Control channel machine, always present
    pub control: ControlState,
    /// Browse channel machine, present once browsing is requested
    pub browse: Option<BrowseState>,
}

impl StateMachinePair {
    fn dispatch_control(&mut self, message: ControlMessage) -> Option<ActionVec> {
        let (next, effects) = match (self.control, message) {
            (ControlState::Connecting, ControlMessage::ToConnected) => {
                (ControlState::Connected, actions(&[]))
            }
            (ControlState::Connecting, ControlMessage::ToDisable) => (
                ControlState::Disable,
                actions(&[Action::DeregisterChannel, Action::DisconnectRequest]),
            ),

            (ControlState::Connected, ControlMessage::ToDisconnecting) => {
                (ControlState::Disconnecting, actions(&[Action::DisconnectRequest]))
            }
            (ControlState::Connected, ControlMessage::PassThrough) => (
                // PASS THROUGH exchanges do not occupy the machine
                ControlState::Connected,
                actions(&[Action::SendControlFrame(CommandCategory::PassThrough)]),
            ),
            (ControlState::Connected, ControlMessage::UnitInfo) => (
                ControlState::Pending,
                actions(&[Action::SendControlFrame(CommandCategory::UnitInfo)]),
            ),
            (ControlState::Connected, ControlMessage::Vendor(_)) => (
                ControlState::Pending,
                actions(&[Action::SendControlFrame(CommandCategory::Vendor)]),
            ),
            (ControlState::Connected, ControlMessage::ToContinuation) => (
                ControlState::Continuation,
                actions(&[Action::SendContinuation]),
            ),
            (ControlState::Connected, ControlMessage::ToDisable) => (
                ControlState::Disable,
                actions(&[Action::DeregisterChannel, Action::DisconnectRequest]),
            ),

            (ControlState::Pending, ControlMessage::ToConnected) => {
                (ControlState::Connected, actions(&[]))
            }
            (ControlState::Pending, ControlMessage::PassThrough) => (
                ControlState::Pending,
                actions(&[Action::SendControlFrame(CommandCategory::PassThrough)]),
            ),
            (ControlState::Pending, ControlMessage::ToContinuation) => (
                ControlState::Continuation,
                actions(&[Action::SendContinuation]),
            ),
            (ControlState::Pending, ControlMessage::ToDisconnecting) => {
                (ControlState::Disconnecting, actions(&[Action::DisconnectRequest]))
            }
            (ControlState::Pending, ControlMessage::ToDisable) => (
                ControlState::Disable,
                actions(&[Action::DeregisterChannel, Action::DisconnectRequest]),
            ),

            (ControlState::Continuation, ControlMessage::ToConnected) => {
                (ControlState::Connected, actions(&[]))
            }
            (ControlState::Continuation, ControlMessage::PassThrough) => (
                ControlState::Continuation,
                actions(&[Action::SendControlFrame(CommandCategory::PassThrough)]),
            ),
            (ControlState::Continuation, ControlMessage::ToContinuation) => (
                ControlState::Continuation,
                actions(&[Action::SendContinuation]),
            ),
            (ControlState::Continuation, ControlMessage::ToDisconnecting) => {
                (ControlState::Disconnecting, actions(&[Action::DisconnectRequest]))
            }
            (ControlState::Continuation, ControlMessage::ToDisable) => (
                ControlState::Disable,
                actions(&[Action::DeregisterChannel, Action::DisconnectRequest]),
            ),

            // Disconnecting and Disable accept nothing further
            _ => return None,
        };
        self.control = next;
        Some(effects)
    }

    fn dispatch_browse(&mut self, message: BrowseMessage) -> Option<ActionVec> {
        let state = self.browse?;
        let (next, effects) = match (state, message) {
            (BrowseState::Connecting, BrowseMessage::ToConnected) => {
                (BrowseState::Connected, actions(&[]))
            }
            (BrowseState::Connected, BrowseMessage::Command) => {
                (BrowseState::Pending, actions(&[Action::SendBrowseFrame]))
            }
            (BrowseState::Connected, BrowseMessage::ToDisconnecting) => (
                BrowseState::Disconnecting,
                actions(&[Action::BrowseDisconnectRequest]),
            ),
            (BrowseState::Pending, BrowseMessage::ToConnected) => {
                (BrowseState::Connected, actions(&[]))
            }
            (BrowseState::Pending, BrowseMessage::ToDisconnecting) => (
                BrowseState::Disconnecting,
                actions(&[Action::BrowseDisconnectRequest]),
            ),
            _ => return None,
        };
        self.browse = Some(next);
        Some(effects)
    }
}

/// Registry of per-device machine pairs
#[derive(Debug, Default)]
pub struct StateMachineRegistry {
    machines: FnvIndexMap<BluetoothAddress, StateMachinePair, MAX_CONNECTIONS>,
}

impl StateMachineRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a control machine for a device
    ///
    /// The machine starts in `Connecting`. With `connect` set the returned
    /// entry actions open the control channel; acceptor-side devices whose
    /// channel is already up pass `false` and get no entry actions.
    ///
    /// # Errors
    /// Returns `StateMachineError::AlreadyExists` or `CapacityExceeded`
    pub fn add_control_machine(
        &mut self,
        addr: BluetoothAddress,
        connect: bool,
    ) -> Result<ActionVec, StateMachineError> {
        if self.machines.contains_key(&addr) {
            return Err(StateMachineError::AlreadyExists);
        }
        self.machines
            .insert(
                addr,
                StateMachinePair {
                    control: ControlState::Connecting,
                    browse: None,
                },
            )
            .map_err(|_| StateMachineError::CapacityExceeded)?;
        if connect {
            Ok(actions(&[Action::ConnectRequest]))
        } else {
            Ok(actions(&[]))
        }
    }

    /// Add a browse machine next to an existing control machine
    ///
    /// # Errors
    /// Returns `StateMachineError::NotFound` if no control machine exists,
    /// or `AlreadyExists` if a browse machine is already present
    pub fn add_browse_machine(
        &mut self,
        addr: &BluetoothAddress,
    ) -> Result<ActionVec, StateMachineError> {
        let pair = self
            .machines
            .get_mut(addr)
            .ok_or(StateMachineError::NotFound)?;
        if pair.browse.is_some() {
            return Err(StateMachineError::AlreadyExists);
        }
        pair.browse = Some(BrowseState::Connecting);
        Ok(actions(&[Action::BrowseConnectRequest]))
    }

    /// Remove a device's machine pair; no-op for unknown devices
    pub fn remove_pair(&mut self, addr: &BluetoothAddress) {
        if self.machines.remove(addr).is_none() {
            defmt::debug!("remove_pair for unknown peer {}", addr);
        }
    }

    /// Remove only the browse machine, keeping the control machine
    pub fn remove_browse_machine(&mut self, addr: &BluetoothAddress) {
        if let Some(pair) = self.machines.get_mut(addr) {
            pair.browse = None;
        }
    }

    /// Feed a message into a device's control machine
    ///
    /// Returns the actions to execute, or `None` if the device is unknown
    /// or its current state does not handle the message.
    pub fn send_to_control(
        &mut self,
        addr: &BluetoothAddress,
        message: ControlMessage,
    ) -> Option<ActionVec> {
        let Some(pair) = self.machines.get_mut(addr) else {
            defmt::debug!("control message {} for unknown peer {}", message, addr);
            return None;
        };
        let result = pair.dispatch_control(message);
        if result.is_none() {
            defmt::debug!("unhandled control message {} in {}", message, pair.control);
        }
        result
    }

    /// Feed a message into a device's browse machine
    pub fn send_to_browse(
        &mut self,
        addr: &BluetoothAddress,
        message: BrowseMessage,
    ) -> Option<ActionVec> {
        let pair = self.machines.get_mut(addr)?;
        pair.dispatch_browse(message)
    }

    /// Feed a message into every control machine
    pub fn broadcast_control(
        &mut self,
        message: ControlMessage,
    ) -> Vec<(BluetoothAddress, ActionVec), MAX_CONNECTIONS> {
        let mut results = Vec::new();
        for (addr, pair) in &mut self.machines {
            if let Some(effects) = pair.dispatch_control(message) {
                results.push((*addr, effects)).ok();
            }
        }
        results
    }

    /// Feed a message into every browse machine, skipping pairs without one
    pub fn broadcast_browse(
        &mut self,
        message: BrowseMessage,
    ) -> Vec<(BluetoothAddress, ActionVec), MAX_CONNECTIONS> {
        let mut results = Vec::new();
        for (addr, pair) in &mut self.machines {
            if let Some(effects) = pair.dispatch_browse(message) {
                results.push((*addr, effects)).ok();
            }
        }
        results
    }

    /// Whether a pair exists for the address
    #[must_use]
    pub fn contains(&self, addr: &BluetoothAddress) -> bool {
        self.machines.contains_key(addr)
    }

    /// Current control state, if the device is known
    #[must_use]
    pub fn control_state(&self, addr: &BluetoothAddress) -> Option<ControlState> {
        self.machines.get(addr).map(|pair| pair.control)
    }

    /// Current browse state, if a browse machine exists
    #[must_use]
    pub fn browse_state(&self, addr: &BluetoothAddress) -> Option<BrowseState> {
        self.machines.get(addr).and_then(|pair| pair.browse)
    }

    /// Whether the control machine is in `Connecting`
    #[must_use]
    pub fn is_control_connecting(&self, addr: &BluetoothAddress) -> bool {
        self.control_state(addr) == Some(ControlState::Connecting)
    }

    /// Whether the control machine is in `Connected`
    #[must_use]
    pub fn is_control_connected(&self, addr: &BluetoothAddress) -> bool {
        self.control_state(addr) == Some(ControlState::Connected)
    }

    /// Whether the control machine is in `Pending`
    #[must_use]
    pub fn is_control_pending(&self, addr: &BluetoothAddress) -> bool {
        self.control_state(addr) == Some(ControlState::Pending)
    }

    /// Whether the control machine is in `Continuation`
    #[must_use]
    pub fn is_control_continuation(&self, addr: &BluetoothAddress) -> bool {
        self.control_state(addr) == Some(ControlState::Continuation)
    }

    /// Whether the control machine is in `Disconnecting`
    #[must_use]
    pub fn is_control_disconnecting(&self, addr: &BluetoothAddress) -> bool {
        self.control_state(addr) == Some(ControlState::Disconnecting)
    }

    /// Whether the control machine is in `Disable`
    #[must_use]
    pub fn is_control_disable(&self, addr: &BluetoothAddress) -> bool {
        self.control_state(addr) == Some(ControlState::Disable)
    }

    /// Whether the control machine occupies its exchange (Pending or
    /// Continuation)
    #[must_use]
    pub fn is_control_busy(&self, addr: &BluetoothAddress) -> bool {
        matches!(
            self.control_state(addr),
            Some(ControlState::Pending | ControlState::Continuation)
        )
    }

    /// Whether the browse machine is in `Connected`
    #[must_use]
    pub fn is_browse_connected(&self, addr: &BluetoothAddress) -> bool {
        self.browse_state(addr) == Some(BrowseState::Connected)
    }

    /// Whether the browse machine is awaiting a response
    #[must_use]
    pub fn is_browse_pending(&self, addr: &BluetoothAddress) -> bool {
        self.browse_state(addr) == Some(BrowseState::Pending)
    }
}
