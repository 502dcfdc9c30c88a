//! AVRCP Connection Registry
//!
//! Per-device connection records keyed by Bluetooth address. Each record
//! carries the negotiated channel parameters, the notification enable
//! flags, and one slot per command category holding the response timer,
//! the in-flight command and a FIFO of commands waiting for the slot.
//!
//! The registry owns no clocks: callers pass the current instant into
//! the timer operations, so the same code runs under embassy and in host
//! tests without a timer driver.

use embassy_time::{Duration, Instant};
use heapless::{Deque, FnvIndexMap, Vec};

use crate::BluetoothAddress;
use crate::constants::{
    DEFAULT_BROWSE_MTU, DEFAULT_CONTROL_MTU, MAX_CONNECTIONS, MAX_PENDING_COMMANDS,
};
use crate::notification::{NotificationEvent, NotificationSet};
use crate::packet::{AvrcpCommand, CommandCategory, VendorCommand};
use crate::transport::{AvctRole, ConnectId};

/// Connection registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ConnectionError {
    /// A record for this address already exists
    AlreadyExists,
    /// The registry is full
    CapacityExceeded,
    /// The category's pending queue is full
    QueueFull,
}

/// Response timer for one category slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTimer {
    /// When the timer fires
    pub deadline: Instant,
    /// Re-arm interval for periodic timers
    pub period: Option<Duration>,
}

impl CommandTimer {
    /// Whether the timer has fired at `now`
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// State of one command category on one connection
#[derive(Debug, Default)]
pub struct CategorySlot {
    /// Response timer, armed while a command is outstanding
    pub timer: Option<CommandTimer>,
    /// The command awaiting a response
    pub in_flight: Option<AvrcpCommand>,
    /// Commands waiting for the slot to free up
    pub queue: Deque<AvrcpCommand, MAX_PENDING_COMMANDS>,
}

/// State of one AVRCP connection
#[derive(Debug)]
pub struct ConnectionInfo {
    /// Peer address
    pub addr: BluetoothAddress,
    /// Transport connection id, assigned on connect confirmation
    pub connect_id: ConnectId,
    /// Role taken when the connection came up
    pub role: AvctRole,
    /// Negotiated control channel MTU
    pub control_mtu: u16,
    /// Negotiated browse channel MTU
    pub browse_mtu: u16,
    /// Peer company id learned from UNIT INFO
    pub company_id: u32,
    /// Browsable item generation counter
    pub uid_counter: u16,
    /// Peer rejected SetAbsoluteVolume, stop sending it
    pub abs_volume_disabled: bool,
    /// Browse channel established
    pub browse_connected: bool,
    /// Per-event notification enable flags
    pub notifications: NotificationSet,
    /// Parked continuation command while reassembling a fragmented response
    pub continuation: Option<VendorCommand>,
    slots: [CategorySlot; 4],
}

impl ConnectionInfo {
    /// Create a record with default channel parameters
    #[must_use]
    pub fn new(addr: BluetoothAddress, role: AvctRole) -> Self {
        Self {
            addr,
            connect_id: 0,
            role,
            control_mtu: DEFAULT_CONTROL_MTU,
            browse_mtu: DEFAULT_BROWSE_MTU,
            company_id: 0,
            uid_counter: 0,
            abs_volume_disabled: false,
            browse_connected: false,
            notifications: NotificationSet::default(),
            continuation: None,
            slots: Default::default(),
        }
    }

    /// Borrow the slot for a category
    #[must_use]
    pub fn slot(&self, category: CommandCategory) -> &CategorySlot {
        &self.slots[Self::slot_index(category)]
    }

    /// Mutably borrow the slot for a category
    pub fn slot_mut(&mut self, category: CommandCategory) -> &mut CategorySlot {
        &mut self.slots[Self::slot_index(category)]
    }

    const fn slot_index(category: CommandCategory) -> usize {
        match category {
            CommandCategory::PassThrough => 0,
            CommandCategory::UnitInfo => 1,
            CommandCategory::Vendor => 2,
            CommandCategory::Browse => 3,
        }
    }
}

/// All four command categories, in slot order
pub const ALL_CATEGORIES: [CommandCategory; 4] = [
    CommandCategory::PassThrough,
    CommandCategory::UnitInfo,
    CommandCategory::Vendor,
    CommandCategory::Browse,
];

/// Registry of connection records keyed by peer address
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: FnvIndexMap<BluetoothAddress, ConnectionInfo, MAX_CONNECTIONS>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record for a peer
    ///
    /// # Errors
    /// Returns `ConnectionError::AlreadyExists` if a record for the address
    /// exists, or `ConnectionError::CapacityExceeded` if the registry is full
    pub fn add(&mut self, addr: BluetoothAddress, role: AvctRole) -> Result<(), ConnectionError> {
        if self.connections.contains_key(&addr) {
            return Err(ConnectionError::AlreadyExists);
        }
        self.connections
            .insert(addr, ConnectionInfo::new(addr, role))
            .map_err(|_| ConnectionError::CapacityExceeded)?;
        Ok(())
    }

    /// Remove a record, dropping all slot state; no-op for unknown peers
    pub fn remove(&mut self, addr: &BluetoothAddress) {
        if self.connections.remove(addr).is_none() {
            defmt::debug!("remove for unknown peer {}", addr);
        }
    }

    /// Borrow a record
    #[must_use]
    pub fn get(&self, addr: &BluetoothAddress) -> Option<&ConnectionInfo> {
        self.connections.get(addr)
    }

    /// Mutably borrow a record
    pub fn get_mut(&mut self, addr: &BluetoothAddress) -> Option<&mut ConnectionInfo> {
        self.connections.get_mut(addr)
    }

    /// Whether a record exists for the address
    #[must_use]
    pub fn contains(&self, addr: &BluetoothAddress) -> bool {
        self.connections.contains_key(addr)
    }

    /// Number of active records
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Store the in-flight command for a category
    pub fn set_in_flight(
        &mut self,
        addr: &BluetoothAddress,
        category: CommandCategory,
        command: AvrcpCommand,
    ) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.slot_mut(category).in_flight = Some(command);
        } else {
            defmt::debug!("set_in_flight for unknown peer {}", addr);
        }
    }

    /// Borrow the in-flight command for a category
    #[must_use]
    pub fn in_flight(
        &self,
        addr: &BluetoothAddress,
        category: CommandCategory,
    ) -> Option<&AvrcpCommand> {
        self.connections
            .get(addr)?
            .slot(category)
            .in_flight
            .as_ref()
    }

    /// Take the in-flight command out of a category slot
    pub fn take_in_flight(
        &mut self,
        addr: &BluetoothAddress,
        category: CommandCategory,
    ) -> Option<AvrcpCommand> {
        self.connections
            .get_mut(addr)?
            .slot_mut(category)
            .in_flight
            .take()
    }

    /// Queue a command behind the category's in-flight command
    ///
    /// # Errors
    /// Returns `ConnectionError::QueueFull` if the FIFO is full
    pub fn push_queue(
        &mut self,
        addr: &BluetoothAddress,
        command: AvrcpCommand,
    ) -> Result<(), ConnectionError> {
        let Some(info) = self.connections.get_mut(addr) else {
            defmt::debug!("push_queue for unknown peer {}", addr);
            return Ok(());
        };
        let category = command.category();
        info.slot_mut(category)
            .queue
            .push_back(command)
            .map_err(|_| ConnectionError::QueueFull)
    }

    /// Pop the oldest queued command for a category
    pub fn pop_queue(
        &mut self,
        addr: &BluetoothAddress,
        category: CommandCategory,
    ) -> Option<AvrcpCommand> {
        self.connections
            .get_mut(addr)?
            .slot_mut(category)
            .queue
            .pop_front()
    }

    /// Number of queued commands for a category
    #[must_use]
    pub fn queue_len(&self, addr: &BluetoothAddress, category: CommandCategory) -> usize {
        self.connections
            .get(addr)
            .map_or(0, |info| info.slot(category).queue.len())
    }

    /// Arm the response timer for a category
    pub fn set_timer(
        &mut self,
        addr: &BluetoothAddress,
        category: CommandCategory,
        deadline: Instant,
        period: Option<Duration>,
    ) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.slot_mut(category).timer = Some(CommandTimer { deadline, period });
        } else {
            defmt::debug!("set_timer for unknown peer {}", addr);
        }
    }

    /// Disarm the response timer for a category
    pub fn clear_timer(&mut self, addr: &BluetoothAddress, category: CommandCategory) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.slot_mut(category).timer = None;
        }
    }

    /// Collect every timer that has fired at `now`
    ///
    /// One-shot timers are disarmed; periodic timers are re-armed one
    /// period past `now`.
    pub fn expired_timers(
        &mut self,
        now: Instant,
    ) -> Vec<(BluetoothAddress, CommandCategory), { MAX_CONNECTIONS * 4 }> {
        let mut expired = Vec::new();
        for (addr, info) in &mut self.connections {
            for category in ALL_CATEGORIES {
                let slot = info.slot_mut(category);
                if let Some(timer) = slot.timer
                    && timer.is_expired(now)
                {
                    match timer.period {
                        Some(period) => {
                            slot.timer = Some(CommandTimer {
                                deadline: now + period,
                                period: Some(period),
                            });
                        }
                        None => slot.timer = None,
                    }
                    expired.push((*addr, category)).ok();
                }
            }
        }
        expired
    }

    /// Abandon the category's outstanding exchange
    ///
    /// Disarms the timer and drops the in-flight command. Vendor
    /// continuation state is dropped along with the vendor slot. Queued
    /// commands survive so they can still be serviced.
    pub fn clear_category(&mut self, addr: &BluetoothAddress, category: CommandCategory) {
        let Some(info) = self.connections.get_mut(addr) else {
            return;
        };
        let slot = info.slot_mut(category);
        slot.timer = None;
        slot.in_flight = None;
        if category == CommandCategory::Vendor {
            info.continuation = None;
        }
    }

    /// Whether a notification event is enabled for the peer
    #[must_use]
    pub fn is_notification_enabled(
        &self,
        addr: &BluetoothAddress,
        event: NotificationEvent,
    ) -> bool {
        self.connections
            .get(addr)
            .is_some_and(|info| info.notifications.is_enabled(event))
    }

    /// Enable a notification event for the peer
    pub fn enable_notification(&mut self, addr: &BluetoothAddress, event: NotificationEvent) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.notifications.enable(event);
        }
    }

    /// Disable a notification event for the peer
    pub fn disable_notification(&mut self, addr: &BluetoothAddress, event: NotificationEvent) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.notifications.disable(event);
        }
    }

    /// Disable every notification event not listed in `keep`
    ///
    /// Events in `keep` retain their current flag; this never enables.
    pub fn disable_notifications_excluding(
        &mut self,
        addr: &BluetoothAddress,
        keep: &[NotificationEvent],
    ) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.notifications.retain(keep);
        }
    }

    /// Record the transport connection id after connect confirmation
    pub fn set_connect_id(&mut self, addr: &BluetoothAddress, connect_id: ConnectId) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.connect_id = connect_id;
        }
    }

    /// Record the negotiated control MTU
    pub fn set_control_mtu(&mut self, addr: &BluetoothAddress, mtu: u16) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.control_mtu = mtu;
        }
    }

    /// Record browse channel state and MTU
    pub fn set_browse_connected(&mut self, addr: &BluetoothAddress, connected: bool, mtu: u16) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.browse_connected = connected;
            if connected {
                info.browse_mtu = mtu;
            }
        }
    }

    /// Record the peer company id learned from UNIT INFO
    pub fn set_company_id(&mut self, addr: &BluetoothAddress, company_id: u32) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.company_id = company_id;
        }
    }

    /// Record the uid counter from a browse response
    pub fn set_uid_counter(&mut self, addr: &BluetoothAddress, uid_counter: u16) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.uid_counter = uid_counter;
        }
    }

    /// Mark SetAbsoluteVolume as unsupported by the peer
    pub fn set_absolute_volume_disabled(&mut self, addr: &BluetoothAddress, disabled: bool) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.abs_volume_disabled = disabled;
        }
    }

    /// Park the continuation command while a fragmented response reassembles
    pub fn set_continuation(&mut self, addr: &BluetoothAddress, command: VendorCommand) {
        if let Some(info) = self.connections.get_mut(addr) {
            info.continuation = Some(command);
        }
    }

    /// Take the parked continuation command
    pub fn take_continuation(&mut self, addr: &BluetoothAddress) -> Option<VendorCommand> {
        self.connections.get_mut(addr)?.continuation.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{KeyState, PassThroughCommand, PassThroughOperation};

    fn addr() -> BluetoothAddress {
        BluetoothAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
    }

    fn pass_through(op: PassThroughOperation) -> AvrcpCommand {
        PassThroughCommand::new(op, KeyState::Pressed).into()
    }

    #[test]
    fn test_add_and_remove() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();
        assert!(registry.contains(&addr()));
        assert_eq!(registry.connection_count(), 1);

        registry.remove(&addr());
        assert!(!registry.contains(&addr()));
        // removing again is a no-op
        registry.remove(&addr());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_duplicate_add_preserves_first_record() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();
        registry.set_connect_id(&addr(), 7);

        assert_eq!(
            registry.add(addr(), AvctRole::Acceptor),
            Err(ConnectionError::AlreadyExists)
        );
        let info = registry.get(&addr()).unwrap();
        assert_eq!(info.connect_id, 7);
        assert_eq!(info.role, AvctRole::Initiator);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut registry = ConnectionRegistry::new();
        for i in 0..MAX_CONNECTIONS {
            let a = BluetoothAddress::new([i as u8, 0, 0, 0, 0, 1]);
            registry.add(a, AvctRole::Initiator).unwrap();
        }
        let extra = BluetoothAddress::new([0xFF, 0, 0, 0, 0, 1]);
        assert_eq!(
            registry.add(extra, AvctRole::Initiator),
            Err(ConnectionError::CapacityExceeded)
        );
    }

    #[test]
    fn test_new_record_defaults() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();

        let info = registry.get(&addr()).unwrap();
        assert_eq!(info.control_mtu, DEFAULT_CONTROL_MTU);
        assert_eq!(info.browse_mtu, DEFAULT_BROWSE_MTU);
        assert!(!info.browse_connected);
        assert!(!info.abs_volume_disabled);
        assert_eq!(info.notifications.enabled_count(), 11);
        assert!(
            !registry.is_notification_enabled(&addr(), NotificationEvent::BattStatusChanged)
        );
        assert!(
            !registry.is_notification_enabled(&addr(), NotificationEvent::SystemStatusChanged)
        );
    }

    #[test]
    fn test_queue_fifo_order() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();

        registry
            .push_queue(&addr(), pass_through(PassThroughOperation::Play))
            .unwrap();
        registry
            .push_queue(&addr(), pass_through(PassThroughOperation::Pause))
            .unwrap();
        assert_eq!(registry.queue_len(&addr(), CommandCategory::PassThrough), 2);

        let first = registry
            .pop_queue(&addr(), CommandCategory::PassThrough)
            .unwrap();
        assert_eq!(first, pass_through(PassThroughOperation::Play));
        let second = registry
            .pop_queue(&addr(), CommandCategory::PassThrough)
            .unwrap();
        assert_eq!(second, pass_through(PassThroughOperation::Pause));
        assert!(registry.pop_queue(&addr(), CommandCategory::PassThrough).is_none());
    }

    #[test]
    fn test_queue_full() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();

        for _ in 0..MAX_PENDING_COMMANDS {
            registry
                .push_queue(&addr(), pass_through(PassThroughOperation::Play))
                .unwrap();
        }
        assert_eq!(
            registry.push_queue(&addr(), pass_through(PassThroughOperation::Play)),
            Err(ConnectionError::QueueFull)
        );
    }

    #[test]
    fn test_in_flight_per_category() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();

        registry.set_in_flight(
            &addr(),
            CommandCategory::PassThrough,
            pass_through(PassThroughOperation::Play),
        );
        registry.set_in_flight(
            &addr(),
            CommandCategory::Vendor,
            VendorCommand::get_play_status().into(),
        );

        assert!(registry.in_flight(&addr(), CommandCategory::PassThrough).is_some());
        assert!(registry.in_flight(&addr(), CommandCategory::Vendor).is_some());
        assert!(registry.in_flight(&addr(), CommandCategory::UnitInfo).is_none());

        let taken = registry
            .take_in_flight(&addr(), CommandCategory::Vendor)
            .unwrap();
        assert_eq!(taken.category(), CommandCategory::Vendor);
        assert!(registry.in_flight(&addr(), CommandCategory::Vendor).is_none());
        // other categories untouched
        assert!(registry.in_flight(&addr(), CommandCategory::PassThrough).is_some());
    }

    #[test]
    fn test_expired_timers_one_shot_and_periodic() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();

        let start = Instant::from_millis(0);
        registry.set_timer(
            &addr(),
            CommandCategory::Vendor,
            start + Duration::from_millis(100),
            None,
        );
        registry.set_timer(
            &addr(),
            CommandCategory::Browse,
            start + Duration::from_millis(100),
            Some(Duration::from_millis(100)),
        );

        assert!(registry.expired_timers(start).is_empty());

        let fired = registry.expired_timers(start + Duration::from_millis(150));
        assert_eq!(fired.len(), 2);

        // one-shot disarmed, periodic re-armed
        let fired = registry.expired_timers(start + Duration::from_millis(300));
        assert_eq!(&fired[..], &[(addr(), CommandCategory::Browse)]);
    }

    #[test]
    fn test_clear_category_keeps_queue() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();

        registry.set_in_flight(
            &addr(),
            CommandCategory::Vendor,
            VendorCommand::get_play_status().into(),
        );
        registry.set_continuation(
            &addr(),
            VendorCommand::request_continuing_response(crate::packet::PduId::GetElementAttributes),
        );
        registry.set_timer(
            &addr(),
            CommandCategory::Vendor,
            Instant::from_millis(100),
            None,
        );
        registry
            .push_queue(&addr(), AvrcpCommand::Vendor(VendorCommand::get_capabilities(0x03)))
            .unwrap();

        registry.clear_category(&addr(), CommandCategory::Vendor);

        let info = registry.get(&addr()).unwrap();
        assert!(info.slot(CommandCategory::Vendor).timer.is_none());
        assert!(info.slot(CommandCategory::Vendor).in_flight.is_none());
        assert!(info.continuation.is_none());
        assert_eq!(registry.queue_len(&addr(), CommandCategory::Vendor), 1);
    }

    #[test]
    fn test_notification_retain_contract() {
        let mut registry = ConnectionRegistry::new();
        registry.add(addr(), AvctRole::Initiator).unwrap();

        registry.disable_notifications_excluding(
            &addr(),
            &[
                NotificationEvent::VolumeChanged,
                NotificationEvent::BattStatusChanged,
            ],
        );

        assert!(registry.is_notification_enabled(&addr(), NotificationEvent::VolumeChanged));
        // excluded-but-disabled event stays disabled
        assert!(
            !registry.is_notification_enabled(&addr(), NotificationEvent::BattStatusChanged)
        );
        assert!(
            !registry.is_notification_enabled(&addr(), NotificationEvent::TrackChanged)
        );
    }

    #[test]
    fn test_unknown_peer_is_safe() {
        let mut registry = ConnectionRegistry::new();

        registry.set_in_flight(
            &addr(),
            CommandCategory::PassThrough,
            pass_through(PassThroughOperation::Play),
        );
        assert!(registry.in_flight(&addr(), CommandCategory::PassThrough).is_none());
        assert!(registry.push_queue(&addr(), pass_through(PassThroughOperation::Play)).is_ok());
        assert_eq!(registry.queue_len(&addr(), CommandCategory::PassThrough), 0);
        registry.clear_category(&addr(), CommandCategory::PassThrough);
        assert!(!registry.is_notification_enabled(&addr(), NotificationEvent::TrackChanged));
    }
}
