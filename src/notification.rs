//! AVRCP Notification Events
//!
//! The target signals asynchronous changes (playback status, track, volume,
//! ...) through registered notifications. Each connection keeps a per-event
//! enable flag; this module holds the event id enum and the flag set with its
//! documented default mask.

/// AVRCP notification event identifiers (AVRCP 1.6, §28 Appendix H)
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum NotificationEvent {
    /// Playback status changed
    PlaybackStatusChanged = 0x01,
    /// Current track changed
    TrackChanged = 0x02,
    /// End of the current track reached
    TrackReachedEnd = 0x03,
    /// Start of the current track reached
    TrackReachedStart = 0x04,
    /// Playback position changed
    PlaybackPosChanged = 0x05,
    /// Battery status of the target changed
    BattStatusChanged = 0x06,
    /// System status of the target changed
    SystemStatusChanged = 0x07,
    /// A player application setting changed
    PlayerApplicationSettingChanged = 0x08,
    /// The now-playing content changed
    NowPlayingContentChanged = 0x09,
    /// The set of available players changed
    AvailablePlayersChanged = 0x0A,
    /// The addressed player changed
    AddressedPlayerChanged = 0x0B,
    /// Browsable item identifiers were invalidated
    UidsChanged = 0x0C,
    /// Absolute volume changed
    VolumeChanged = 0x0D,
}

impl NotificationEvent {
    /// All defined notification events
    pub const ALL: [Self; 13] = [
        Self::PlaybackStatusChanged,
        Self::TrackChanged,
        Self::TrackReachedEnd,
        Self::TrackReachedStart,
        Self::PlaybackPosChanged,
        Self::BattStatusChanged,
        Self::SystemStatusChanged,
        Self::PlayerApplicationSettingChanged,
        Self::NowPlayingContentChanged,
        Self::AvailablePlayersChanged,
        Self::AddressedPlayerChanged,
        Self::UidsChanged,
        Self::VolumeChanged,
    ];

    /// Convert from raw event id
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::PlaybackStatusChanged),
            0x02 => Some(Self::TrackChanged),
            0x03 => Some(Self::TrackReachedEnd),
            0x04 => Some(Self::TrackReachedStart),
            0x05 => Some(Self::PlaybackPosChanged),
            0x06 => Some(Self::BattStatusChanged),
            0x07 => Some(Self::SystemStatusChanged),
            0x08 => Some(Self::PlayerApplicationSettingChanged),
            0x09 => Some(Self::NowPlayingContentChanged),
            0x0A => Some(Self::AvailablePlayersChanged),
            0x0B => Some(Self::AddressedPlayerChanged),
            0x0C => Some(Self::UidsChanged),
            0x0D => Some(Self::VolumeChanged),
            _ => None,
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u8 - 1)
    }
}

/// Per-connection notification enable flags
///
/// Backed by one bit per event id. The default set enables every event
/// except [`NotificationEvent::BattStatusChanged`] and
/// [`NotificationEvent::SystemStatusChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct NotificationSet(u16);

impl NotificationSet {
    /// Create a set with every event disabled
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check whether an event is enabled
    #[must_use]
    pub const fn is_enabled(&self, event: NotificationEvent) -> bool {
        self.0 & event.bit() != 0
    }

    /// Enable a single event
    pub fn enable(&mut self, event: NotificationEvent) {
        self.0 |= event.bit();
    }

    /// Disable a single event
    pub fn disable(&mut self, event: NotificationEvent) {
        self.0 &= !event.bit();
    }

    /// Disable every event not present in `keep`
    pub fn retain(&mut self, keep: &[NotificationEvent]) {
        let mut mask = 0u16;
        for event in keep {
            mask |= event.bit();
        }
        self.0 &= mask;
    }

    /// Number of enabled events
    #[must_use]
    pub const fn enabled_count(&self) -> u32 {
        self.0.count_ones()
    }
}

impl Default for NotificationSet {
    fn default() -> Self {
        let mut set = Self::empty();
        for event in NotificationEvent::ALL {
            set.enable(event);
        }
        set.disable(NotificationEvent::BattStatusChanged);
        set.disable(NotificationEvent::SystemStatusChanged);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set() {
        let set = NotificationSet::default();

        assert!(!set.is_enabled(NotificationEvent::BattStatusChanged));
        assert!(!set.is_enabled(NotificationEvent::SystemStatusChanged));
        for event in NotificationEvent::ALL {
            if event != NotificationEvent::BattStatusChanged
                && event != NotificationEvent::SystemStatusChanged
            {
                assert!(set.is_enabled(event), "{event:?} should default to enabled");
            }
        }
        assert_eq!(set.enabled_count(), 11);
    }

    #[test]
    fn test_enable_disable() {
        let mut set = NotificationSet::default();

        set.enable(NotificationEvent::BattStatusChanged);
        assert!(set.is_enabled(NotificationEvent::BattStatusChanged));

        set.disable(NotificationEvent::VolumeChanged);
        assert!(!set.is_enabled(NotificationEvent::VolumeChanged));
    }

    #[test]
    fn test_retain() {
        let mut set = NotificationSet::default();
        set.retain(&[
            NotificationEvent::TrackChanged,
            NotificationEvent::VolumeChanged,
        ]);

        assert!(set.is_enabled(NotificationEvent::TrackChanged));
        assert!(set.is_enabled(NotificationEvent::VolumeChanged));
        assert_eq!(set.enabled_count(), 2);
    }

    #[test]
    fn test_retain_does_not_enable() {
        // retain only disables; a kept-but-disabled event stays disabled
        let mut set = NotificationSet::default();
        set.retain(&[
            NotificationEvent::BattStatusChanged,
            NotificationEvent::TrackChanged,
        ]);

        assert!(!set.is_enabled(NotificationEvent::BattStatusChanged));
        assert!(set.is_enabled(NotificationEvent::TrackChanged));
        assert_eq!(set.enabled_count(), 1);
    }

    #[test]
    fn test_retain_empty_disables_all() {
        let mut set = NotificationSet::default();
        set.retain(&[]);
        assert_eq!(set.enabled_count(), 0);
    }

    #[test]
    fn test_event_id_roundtrip() {
        for event in NotificationEvent::ALL {
            assert_eq!(NotificationEvent::from_u8(event as u8), Some(event));
        }
        assert_eq!(NotificationEvent::from_u8(0x00), None);
        assert_eq!(NotificationEvent::from_u8(0x0E), None);
    }
}
