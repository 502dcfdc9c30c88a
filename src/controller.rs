//! AVRCP Controller Core
//!
//! [`AvrcpController`] ties the connection registry, the state machine
//! registry and the AVCTP transport together. Outbound commands go through
//! a per-category gate: a free slot sends immediately, an occupied slot
//! queues. Inbound transport events clear timers, release machines and
//! drain the queues.
//!
//! The controller carries no clock; callers pass the current instant into
//! every operation that arms or checks timers.

use embassy_time::Instant;

use crate::connection::ConnectionRegistry;
use crate::constants::{AVCT_BROWSE_PSM, AVCT_CONTROL_PSM, BT_SIG_COMPANY_ID, RESPONSE_TIMEOUT};
use crate::notification::NotificationEvent;
use crate::packet::{
    AvcFrame, AvrcpCommand, BrowseCommand, BrowsePdu, CommandCategory, PassThroughCommand,
    PduId, UnitInfoCommand, UnitInfoKind, UnitInfoResponse, VendorCommand, VendorResponse, avc,
};
use crate::state_machine::{
    Action, ActionVec, BrowseMessage, ControlMessage, StateMachineRegistry,
};
use crate::transport::{AvctEvent, AvctRole, AvctStatus, AvctTransport};
use crate::{AvrcpError, BluetoothAddress};

/// Controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct ControllerOptions {
    /// Response timeout armed per in-flight command
    pub response_timeout: embassy_time::Duration,
    /// Company id placed in outgoing vendor frames
    pub company_id: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            response_timeout: RESPONSE_TIMEOUT,
            company_id: BT_SIG_COMPANY_ID,
        }
    }
}

/// The AVRCP controller core
#[derive(Debug)]
pub struct AvrcpController<T: AvctTransport> {
    transport: T,
    connections: ConnectionRegistry,
    machines: StateMachineRegistry,
    options: ControllerOptions,
    enabled: bool,
}

impl<T: AvctTransport> AvrcpController<T> {
    /// Create a controller with default options
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, ControllerOptions::default())
    }

    /// Create a controller with the given options
    pub fn with_options(transport: T, options: ControllerOptions) -> Self {
        Self {
            transport,
            connections: ConnectionRegistry::new(),
            machines: StateMachineRegistry::new(),
            options,
            enabled: false,
        }
    }

    /// Borrow the connection registry
    #[must_use]
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Borrow the state machine registry
    #[must_use]
    pub fn machines(&self) -> &StateMachineRegistry {
        &self.machines
    }

    /// Register the AVCTP PSMs and start accepting connections
    ///
    /// # Errors
    /// Returns `AvrcpError::Transport` if either PSM registration fails
    pub fn enable(&mut self) -> Result<(), AvrcpError> {
        let status = self.transport.register(AVCT_CONTROL_PSM);
        if !status.is_success() {
            return Err(AvrcpError::Transport(status));
        }
        let status = self.transport.register(AVCT_BROWSE_PSM);
        if !status.is_success() {
            self.transport.deregister(AVCT_CONTROL_PSM);
            return Err(AvrcpError::Transport(status));
        }
        self.enabled = true;
        defmt::info!("avrcp controller enabled");
        Ok(())
    }

    /// Tear down every connection and deregister the AVCTP PSMs
    pub fn disable(&mut self, now: Instant) {
        let results = self.machines.broadcast_control(ControlMessage::ToDisable);
        for (addr, effects) in &results {
            self.apply(*addr, effects, now);
        }
        if self.enabled && results.is_empty() {
            // no connections existed, nothing deregistered the PSMs
            self.transport.deregister(AVCT_CONTROL_PSM);
            self.transport.deregister(AVCT_BROWSE_PSM);
        }
        self.enabled = false;
        defmt::info!("avrcp controller disabled");
    }

    /// Start an outbound connection to a peer
    ///
    /// # Errors
    /// Returns `AvrcpError::AlreadyExists` if the peer is already known,
    /// or `AvrcpError::CapacityExceeded` if either registry is full
    pub fn connect(&mut self, addr: BluetoothAddress, now: Instant) -> Result<(), AvrcpError> {
        self.connections.add(addr, AvctRole::Initiator)?;
        let entry = match self.machines.add_control_machine(addr, true) {
            Ok(entry) => entry,
            Err(err) => {
                self.connections.remove(&addr);
                return Err(err.into());
            }
        };
        defmt::info!("connecting to {}", addr);
        self.apply(addr, &entry, now);
        Ok(())
    }

    /// Open the browse channel to a control-connected peer
    ///
    /// # Errors
    /// Returns `AvrcpError::NotConnected` if the control channel is not up,
    /// or `AvrcpError::AlreadyExists` if a browse machine already exists
    pub fn connect_browse(
        &mut self,
        addr: BluetoothAddress,
        now: Instant,
    ) -> Result<(), AvrcpError> {
        if !self.machines.is_control_connected(&addr) && !self.machines.is_control_busy(&addr) {
            return Err(AvrcpError::NotConnected);
        }
        let entry = self.machines.add_browse_machine(&addr)?;
        self.apply(addr, &entry, now);
        Ok(())
    }

    /// Start disconnecting a peer, browse channel first
    ///
    /// # Errors
    /// Returns `AvrcpError::NotFound` if the peer is unknown
    pub fn disconnect(&mut self, addr: BluetoothAddress, now: Instant) -> Result<(), AvrcpError> {
        if !self.machines.contains(&addr) {
            return Err(AvrcpError::NotFound);
        }
        if let Some(effects) = self
            .machines
            .send_to_browse(&addr, BrowseMessage::ToDisconnecting)
        {
            self.apply(addr, &effects, now);
        }
        if let Some(effects) = self
            .machines
            .send_to_control(&addr, ControlMessage::ToDisconnecting)
        {
            self.apply(addr, &effects, now);
        }
        Ok(())
    }

    /// Send a PASS THROUGH command
    ///
    /// PASS THROUGH has its own slot and never occupies the control
    /// machine, so it interleaves with pending vendor exchanges.
    ///
    /// # Errors
    /// Returns `AvrcpError::NotConnected` or `AvrcpError::QueueFull`
    pub fn send_pass_through(
        &mut self,
        addr: BluetoothAddress,
        command: PassThroughCommand,
        now: Instant,
    ) -> Result<(), AvrcpError> {
        self.submit(addr, command.into(), now)
    }

    /// Send a UNIT INFO or SUB UNIT INFO command
    ///
    /// # Errors
    /// Returns `AvrcpError::NotConnected` or `AvrcpError::QueueFull`
    pub fn send_unit_info(
        &mut self,
        addr: BluetoothAddress,
        kind: UnitInfoKind,
        now: Instant,
    ) -> Result<(), AvrcpError> {
        self.submit(addr, UnitInfoCommand::new(kind).into(), now)
    }

    /// Send a VENDOR DEPENDENT command
    ///
    /// # Errors
    /// Returns `AvrcpError::NotSupported` for SetAbsoluteVolume after the
    /// peer rejected it, `AvrcpError::NotConnected` or `AvrcpError::QueueFull`
    pub fn send_vendor(
        &mut self,
        addr: BluetoothAddress,
        command: VendorCommand,
        now: Instant,
    ) -> Result<(), AvrcpError> {
        if command.pdu_id == PduId::SetAbsoluteVolume
            && self
                .connections
                .get(&addr)
                .is_some_and(|info| info.abs_volume_disabled)
        {
            defmt::debug!("absolute volume disabled for {}", addr);
            return Err(AvrcpError::NotSupported);
        }
        let mut command = command;
        command.company_id = self.options.company_id;
        self.submit(addr, command.into(), now)
    }

    /// Send a browse channel command
    ///
    /// # Errors
    /// Returns `AvrcpError::NotConnected` if the browse channel is not up,
    /// or `AvrcpError::QueueFull`
    pub fn send_browse(
        &mut self,
        addr: BluetoothAddress,
        command: BrowseCommand,
        now: Instant,
    ) -> Result<(), AvrcpError> {
        self.submit(addr, command.into(), now)
    }

    /// Enable a notification event for a peer
    pub fn enable_notification(&mut self, addr: &BluetoothAddress, event: NotificationEvent) {
        self.connections.enable_notification(addr, event);
    }

    /// Disable a notification event for a peer
    pub fn disable_notification(&mut self, addr: &BluetoothAddress, event: NotificationEvent) {
        self.connections.disable_notification(addr, event);
    }

    /// Disable every notification event for a peer except those listed
    ///
    /// Listed events keep their current flag; this never enables one.
    pub fn disable_notifications_excluding(
        &mut self,
        addr: &BluetoothAddress,
        keep: &[NotificationEvent],
    ) {
        self.connections.disable_notifications_excluding(addr, keep);
    }

    /// Feed one transport event through the core
    pub fn process_event(&mut self, event: AvctEvent, now: Instant) {
        match event {
            AvctEvent::ConnectConfirm {
                addr,
                connect_id,
                status,
                peer_mtu,
            } => self.on_connect_confirm(addr, connect_id, status, peer_mtu, now),
            AvctEvent::ConnectIndication {
                addr,
                connect_id,
                peer_mtu,
            } => self.on_connect_indication(addr, connect_id, peer_mtu, now),
            AvctEvent::DisconnectConfirm { addr, status } => {
                if !status.is_success() {
                    defmt::warn!("disconnect from {} failed: {}", addr, status);
                }
                self.drop_peer(&addr);
            }
            AvctEvent::DisconnectIndication { addr } => {
                defmt::info!("{} disconnected", addr);
                self.drop_peer(&addr);
            }
            AvctEvent::BrowseConnectConfirm {
                addr,
                status,
                peer_mtu,
            } => self.on_browse_connect_confirm(addr, status, peer_mtu, now),
            AvctEvent::BrowseDisconnectConfirm { addr, status } => {
                if !status.is_success() {
                    defmt::warn!("browse disconnect from {} failed: {}", addr, status);
                }
                self.connections.clear_category(&addr, CommandCategory::Browse);
                self.connections.set_browse_connected(&addr, false, 0);
                self.machines.remove_browse_machine(&addr);
            }
            AvctEvent::MessageReceived { addr, frame } => {
                self.on_control_message(addr, &frame, now);
            }
            AvctEvent::BrowseMessageReceived { addr, frame } => {
                self.on_browse_message(addr, &frame, now);
            }
        }
    }

    /// Fire expired response timers
    ///
    /// A fired timer abandons the category's in-flight exchange, releases
    /// the machine and services the category's queue.
    pub fn poll_timers(&mut self, now: Instant) {
        let expired = self.connections.expired_timers(now);
        for (addr, category) in expired {
            defmt::warn!("response timeout for {} on {}", addr, category);
            self.connections.clear_category(&addr, category);
            self.release_machine(&addr, category, now);
            if category == CommandCategory::Browse {
                self.service_queue(addr, category, now);
            } else {
                self.service_control_queues(addr, now);
            }
        }
    }

    fn on_connect_confirm(
        &mut self,
        addr: BluetoothAddress,
        connect_id: u8,
        status: AvctStatus,
        peer_mtu: u16,
        now: Instant,
    ) {
        if status.is_success() {
            defmt::info!("{} connected, id {} mtu {}", addr, connect_id, peer_mtu);
            self.connections.set_connect_id(&addr, connect_id);
            self.connections.set_control_mtu(&addr, peer_mtu);
            if let Some(effects) = self
                .machines
                .send_to_control(&addr, ControlMessage::ToConnected)
            {
                self.apply(addr, &effects, now);
            }
        } else {
            defmt::warn!("connect to {} failed: {}", addr, status);
            self.drop_peer(&addr);
        }
    }

    fn on_connect_indication(
        &mut self,
        addr: BluetoothAddress,
        connect_id: u8,
        peer_mtu: u16,
        now: Instant,
    ) {
        if let Err(err) = self.connections.add(addr, AvctRole::Acceptor) {
            defmt::warn!("incoming connection from {} rejected: {}", addr, err);
            return;
        }
        self.connections.set_connect_id(&addr, connect_id);
        self.connections.set_control_mtu(&addr, peer_mtu);
        match self.machines.add_control_machine(addr, false) {
            Ok(_) => {
                defmt::info!("{} connected as acceptor, id {}", addr, connect_id);
                if let Some(effects) = self
                    .machines
                    .send_to_control(&addr, ControlMessage::ToConnected)
                {
                    self.apply(addr, &effects, now);
                }
            }
            Err(err) => {
                defmt::warn!("no machine for incoming {}: {}", addr, err);
                self.connections.remove(&addr);
            }
        }
    }

    fn on_browse_connect_confirm(
        &mut self,
        addr: BluetoothAddress,
        status: AvctStatus,
        peer_mtu: u16,
        now: Instant,
    ) {
        if status.is_success() {
            defmt::info!("{} browse connected, mtu {}", addr, peer_mtu);
            self.connections.set_browse_connected(&addr, true, peer_mtu);
            if let Some(effects) = self
                .machines
                .send_to_browse(&addr, BrowseMessage::ToConnected)
            {
                self.apply(addr, &effects, now);
            }
            self.service_queue(addr, CommandCategory::Browse, now);
        } else {
            defmt::warn!("browse connect to {} failed: {}", addr, status);
            self.machines.remove_browse_machine(&addr);
        }
    }

    fn on_control_message(&mut self, addr: BluetoothAddress, frame: &[u8], now: Instant) {
        let Some(category) = CommandCategory::classify_control(frame) else {
            defmt::warn!("unclassifiable control frame from {}", addr);
            return;
        };
        self.connections.clear_timer(&addr, category);
        match category {
            CommandCategory::PassThrough => {
                // the slot machine stays in Connected for pass through
                self.connections.take_in_flight(&addr, category);
            }
            CommandCategory::UnitInfo => {
                self.connections.take_in_flight(&addr, category);
                if let Ok(resp) = UnitInfoResponse::disassemble(frame) {
                    self.connections.set_company_id(&addr, resp.company_id);
                }
                self.release_machine(&addr, category, now);
            }
            CommandCategory::Vendor => {
                if let Ok(resp) = VendorResponse::disassemble(frame) {
                    self.on_vendor_response(addr, &resp, now);
                } else {
                    defmt::warn!("malformed vendor frame from {}", addr);
                    self.connections.clear_category(&addr, CommandCategory::Vendor);
                    self.release_machine(&addr, category, now);
                }
            }
            CommandCategory::Browse => {}
        }
        self.service_control_queues(addr, now);
    }

    fn on_vendor_response(&mut self, addr: BluetoothAddress, resp: &VendorResponse, now: Instant) {
        if resp.is_partial() {
            // drive the continuation exchange; in-flight stays put until
            // the End fragment arrives
            self.connections.set_continuation(
                &addr,
                VendorCommand::request_continuing_response(resp.pdu_id),
            );
            if let Some(effects) = self
                .machines
                .send_to_control(&addr, ControlMessage::ToContinuation)
            {
                self.apply(addr, &effects, now);
            }
            return;
        }

        self.connections.take_in_flight(&addr, CommandCategory::Vendor);
        self.connections.take_continuation(&addr);

        match resp.pdu_id {
            PduId::SetAbsoluteVolume if resp.response == avc::RESPONSE_REJECTED => {
                defmt::info!("{} rejected absolute volume, disabling", addr);
                self.connections.set_absolute_volume_disabled(&addr, true);
            }
            PduId::RegisterNotification => {
                self.on_notification_response(&addr, resp);
            }
            _ => {}
        }
        self.release_machine(&addr, CommandCategory::Vendor, now);
    }

    fn on_notification_response(&mut self, addr: &BluetoothAddress, resp: &VendorResponse) {
        let Some(event) = resp
            .parameters
            .first()
            .copied()
            .and_then(NotificationEvent::from_u8)
        else {
            defmt::warn!("notification response without event id from {}", addr);
            return;
        };
        match resp.response {
            avc::RESPONSE_INTERIM => {
                defmt::debug!("{} notification {} registered", addr, event);
            }
            avc::RESPONSE_CHANGED => {
                defmt::debug!("{} notification {} fired", addr, event);
            }
            avc::RESPONSE_REJECTED => {
                defmt::info!("{} rejected notification {}", addr, event);
                self.connections.disable_notification(addr, event);
            }
            _ => {}
        }
    }

    fn on_browse_message(&mut self, addr: BluetoothAddress, frame: &[u8], now: Instant) {
        self.connections.clear_timer(&addr, CommandCategory::Browse);
        self.connections
            .take_in_flight(&addr, CommandCategory::Browse);
        match crate::packet::BrowseResponse::disassemble(frame) {
            Ok(resp) => {
                if resp.pdu == BrowsePdu::SetBrowsedPlayer && resp.parameters.len() >= 3 {
                    let uid_counter =
                        u16::from(resp.parameters[1]) << 8 | u16::from(resp.parameters[2]);
                    self.connections.set_uid_counter(&addr, uid_counter);
                }
            }
            Err(err) => defmt::warn!("malformed browse frame from {}: {}", addr, err),
        }
        self.release_machine(&addr, CommandCategory::Browse, now);
        self.service_queue(addr, CommandCategory::Browse, now);
    }

    /// Gate an outbound command through its category slot
    fn submit(
        &mut self,
        addr: BluetoothAddress,
        command: AvrcpCommand,
        now: Instant,
    ) -> Result<(), AvrcpError> {
        let category = command.category();
        if !self.is_channel_up(&addr, category) {
            return Err(AvrcpError::NotConnected);
        }
        if self.is_category_busy(&addr, category) {
            defmt::debug!("{} busy on {}, queueing", addr, category);
            self.connections.push_queue(&addr, command)?;
            return Ok(());
        }
        self.dispatch(addr, command, now)
    }

    fn is_channel_up(&self, addr: &BluetoothAddress, category: CommandCategory) -> bool {
        if !self.connections.contains(addr) {
            return false;
        }
        match category {
            CommandCategory::Browse => {
                self.machines.is_browse_connected(addr) || self.machines.is_browse_pending(addr)
            }
            _ => self.machines.is_control_connected(addr) || self.machines.is_control_busy(addr),
        }
    }

    fn is_category_busy(&self, addr: &BluetoothAddress, category: CommandCategory) -> bool {
        if self.connections.in_flight(addr, category).is_some() {
            return true;
        }
        match category {
            CommandCategory::PassThrough => false,
            CommandCategory::UnitInfo | CommandCategory::Vendor => {
                self.machines.is_control_busy(addr)
            }
            CommandCategory::Browse => self.machines.is_browse_pending(addr),
        }
    }

    fn dispatch(
        &mut self,
        addr: BluetoothAddress,
        command: AvrcpCommand,
        now: Instant,
    ) -> Result<(), AvrcpError> {
        let category = command.category();
        let message = match &command {
            AvrcpCommand::PassThrough(_) => Some(ControlMessage::PassThrough),
            AvrcpCommand::UnitInfo(_) => Some(ControlMessage::UnitInfo),
            AvrcpCommand::Vendor(cmd) => Some(ControlMessage::Vendor(cmd.pdu_id)),
            AvrcpCommand::Browse(_) => None,
        };
        self.connections.set_in_flight(&addr, category, command);

        let effects = match message {
            Some(message) => self.machines.send_to_control(&addr, message),
            None => self.machines.send_to_browse(&addr, BrowseMessage::Command),
        };
        let Some(effects) = effects else {
            self.connections.take_in_flight(&addr, category);
            return Err(AvrcpError::NotConnected);
        };
        self.apply(addr, &effects, now);
        Ok(())
    }

    /// Service every control-channel category queue
    ///
    /// UNIT INFO and vendor share the control machine; once it frees up,
    /// any of their queues may hold the next command to go out.
    fn service_control_queues(&mut self, addr: BluetoothAddress, now: Instant) {
        self.service_queue(addr, CommandCategory::PassThrough, now);
        self.service_queue(addr, CommandCategory::UnitInfo, now);
        self.service_queue(addr, CommandCategory::Vendor, now);
    }

    /// Send the oldest queued command of a category if the slot is free
    fn service_queue(&mut self, addr: BluetoothAddress, category: CommandCategory, now: Instant) {
        if self.is_category_busy(&addr, category) || !self.is_channel_up(&addr, category) {
            return;
        }
        if let Some(command) = self.connections.pop_queue(&addr, category)
            && let Err(err) = self.dispatch(addr, command, now)
        {
            defmt::warn!("queued command for {} dropped: {}", addr, err);
        }
    }

    fn release_machine(&mut self, addr: &BluetoothAddress, category: CommandCategory, now: Instant) {
        let effects = match category {
            CommandCategory::PassThrough => None,
            CommandCategory::Browse => {
                self.machines.send_to_browse(addr, BrowseMessage::ToConnected)
            }
            _ => self.machines.send_to_control(addr, ControlMessage::ToConnected),
        };
        if let Some(effects) = effects {
            self.apply(*addr, &effects, now);
        }
    }

    fn drop_peer(&mut self, addr: &BluetoothAddress) {
        self.machines.remove_pair(addr);
        self.connections.remove(addr);
    }

    /// Execute the side effects of one dispatch against the transport
    ///
    /// A synchronous transport failure is fed back through
    /// [`Self::process_event`] as the matching failure confirmation.
    fn apply(&mut self, addr: BluetoothAddress, effects: &ActionVec, now: Instant) {
        for action in effects {
            match action {
                Action::ConnectRequest => {
                    let status = self.transport.connect_request(addr, AvctRole::Initiator);
                    if !status.is_success() {
                        self.process_event(
                            AvctEvent::ConnectConfirm {
                                addr,
                                connect_id: 0,
                                status,
                                peer_mtu: 0,
                            },
                            now,
                        );
                    }
                }
                Action::DisconnectRequest => {
                    let connect_id = self
                        .connections
                        .get(&addr)
                        .map_or(0, |info| info.connect_id);
                    let status = self.transport.disconnect_request(connect_id);
                    if !status.is_success() {
                        self.process_event(AvctEvent::DisconnectConfirm { addr, status }, now);
                    }
                }
                Action::BrowseConnectRequest => {
                    let status = self.transport.browse_connect_request(addr);
                    if !status.is_success() {
                        self.process_event(
                            AvctEvent::BrowseConnectConfirm {
                                addr,
                                status,
                                peer_mtu: 0,
                            },
                            now,
                        );
                    }
                }
                Action::BrowseDisconnectRequest => {
                    let connect_id = self
                        .connections
                        .get(&addr)
                        .map_or(0, |info| info.connect_id);
                    let status = self.transport.browse_disconnect_request(connect_id);
                    if !status.is_success() {
                        self.process_event(
                            AvctEvent::BrowseDisconnectConfirm { addr, status },
                            now,
                        );
                    }
                }
                Action::SendControlFrame(category) => {
                    self.send_in_flight(addr, *category, now);
                }
                Action::SendContinuation => {
                    self.send_continuation(addr, now);
                }
                Action::SendBrowseFrame => {
                    self.send_in_flight(addr, CommandCategory::Browse, now);
                }
                Action::DeregisterChannel => {
                    self.transport.deregister(AVCT_CONTROL_PSM);
                    self.transport.deregister(AVCT_BROWSE_PSM);
                }
            }
        }
    }

    fn send_in_flight(&mut self, addr: BluetoothAddress, category: CommandCategory, now: Instant) {
        let Some(command) = self.connections.in_flight(&addr, category) else {
            defmt::warn!("nothing in flight for {} on {}", addr, category);
            return;
        };
        let frame = match command.assemble() {
            Ok(frame) => frame,
            Err(err) => {
                defmt::warn!("assembly for {} failed: {}", addr, err);
                self.abandon_exchange(addr, category, now);
                return;
            }
        };
        let connect_id = self
            .connections
            .get(&addr)
            .map_or(0, |info| info.connect_id);
        let status = if category == CommandCategory::Browse {
            self.transport.browse_send_message(connect_id, &frame)
        } else {
            self.transport.send_message(connect_id, &frame)
        };
        if status.is_success() {
            self.connections.set_timer(
                &addr,
                category,
                now + self.options.response_timeout,
                None,
            );
        } else {
            defmt::warn!("send to {} failed: {}", addr, status);
            self.abandon_exchange(addr, category, now);
        }
    }

    fn send_continuation(&mut self, addr: BluetoothAddress, now: Instant) {
        // stays parked: further Start/Continue fragments re-request with it
        let Some(command) = self
            .connections
            .get(&addr)
            .and_then(|info| info.continuation.clone())
        else {
            defmt::warn!("no continuation parked for {}", addr);
            return;
        };
        let frame = match command.assemble() {
            Ok(frame) => frame,
            Err(err) => {
                defmt::warn!("continuation assembly for {} failed: {}", addr, err);
                self.abandon_exchange(addr, CommandCategory::Vendor, now);
                return;
            }
        };
        let connect_id = self
            .connections
            .get(&addr)
            .map_or(0, |info| info.connect_id);
        let status = self.transport.send_message(connect_id, &frame);
        if status.is_success() {
            self.connections.set_timer(
                &addr,
                CommandCategory::Vendor,
                now + self.options.response_timeout,
                None,
            );
        } else {
            defmt::warn!("continuation send to {} failed: {}", addr, status);
            self.abandon_exchange(addr, CommandCategory::Vendor, now);
        }
    }

    fn abandon_exchange(&mut self, addr: BluetoothAddress, category: CommandCategory, now: Instant) {
        self.connections.clear_category(&addr, category);
        self.release_machine(&addr, category, now);
    }
}
