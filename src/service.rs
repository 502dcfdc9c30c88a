//! AVRCP Service Task and API
//!
//! This module wraps the synchronous [`AvrcpController`] core in an async
//! service loop plus a small channel-based API, so applications never hold
//! the controller directly. Requests and transport events arrive on static
//! channels; a ticker drives the response timers.
//!
//! # Usage
//!
//! Spawn [`run`] as an Embassy task with the controller, then call the API
//! functions from application code:
//!
//! ```rust,no_run
//! use avrcp_ct::service;
//! use avrcp_ct::packet::{KeyState, PassThroughOperation};
//!
//! async fn play(addr: avrcp_ct::BluetoothAddress) -> Result<(), avrcp_ct::AvrcpError> {
//!     service::send_pass_through(addr, PassThroughOperation::Play, KeyState::Pressed).await?;
//!     service::send_pass_through(addr, PassThroughOperation::Play, KeyState::Released).await
//! }
//! ```
//!
//! The transport integration forwards its events with [`deliver_event`].

use embassy_futures::select::{Either3, select3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Ticker};

use crate::constants::{CHANNEL_DEPTH, TIMER_POLL_INTERVAL};
use crate::controller::AvrcpController;
use crate::packet::{
    BrowseCommand, KeyState, PassThroughCommand, PassThroughOperation, UnitInfoKind, VendorCommand,
};
use crate::transport::{AvctEvent, AvctTransport};
use crate::{AvrcpError, BluetoothAddress};

/// Requests from application code to the service task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Register the AVCTP PSMs
    Enable,
    /// Disconnect everything and deregister the PSMs
    Disable,
    /// Connect the control channel to a peer
    Connect(BluetoothAddress),
    /// Open the browse channel to a connected peer
    ConnectBrowse(BluetoothAddress),
    /// Disconnect a peer
    Disconnect(BluetoothAddress),
    /// Send a PASS THROUGH command
    PassThrough(BluetoothAddress, PassThroughCommand),
    /// Send a UNIT INFO / SUB UNIT INFO command
    UnitInfo(BluetoothAddress, UnitInfoKind),
    /// Send a VENDOR DEPENDENT command
    Vendor(BluetoothAddress, VendorCommand),
    /// Send a browse channel command
    Browse(BluetoothAddress, BrowseCommand),
}

/// Responses from the service task back to application code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Request accepted
    Ok,
    /// Request failed
    Error(AvrcpError),
}

pub(crate) static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, Request, CHANNEL_DEPTH> =
    Channel::new();

pub(crate) static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, CHANNEL_DEPTH> =
    Channel::new();

pub(crate) static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, AvctEvent, CHANNEL_DEPTH> =
    Channel::new();

async fn request(request: Request) -> Result<(), AvrcpError> {
    REQUEST_CHANNEL.sender().send(request).await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::Ok => Ok(()),
        Response::Error(e) => Err(e),
    }
}

/// Register the AVCTP PSMs and start accepting connections.
///
/// # Errors
///
/// Returns an error if a PSM registration fails.
pub async fn enable() -> Result<(), AvrcpError> {
    request(Request::Enable).await
}

/// Disconnect every peer and deregister the AVCTP PSMs.
///
/// # Errors
///
/// This request does not fail; the `Result` keeps the API uniform.
pub async fn disable() -> Result<(), AvrcpError> {
    request(Request::Disable).await
}

/// Connect the control channel to a peer.
///
/// # Errors
///
/// Returns an error if the peer is already known or capacity is exhausted.
pub async fn connect_device(addr: BluetoothAddress) -> Result<(), AvrcpError> {
    request(Request::Connect(addr)).await
}

/// Open the browse channel to an already connected peer.
///
/// # Errors
///
/// Returns an error if the control channel is not up.
pub async fn connect_browse(addr: BluetoothAddress) -> Result<(), AvrcpError> {
    request(Request::ConnectBrowse(addr)).await
}

/// Disconnect a peer, browse channel first.
///
/// # Errors
///
/// Returns an error if the peer is unknown.
pub async fn disconnect_device(addr: BluetoothAddress) -> Result<(), AvrcpError> {
    request(Request::Disconnect(addr)).await
}

/// Send a PASS THROUGH key operation to a peer.
///
/// # Errors
///
/// Returns an error if the peer is not connected or the queue is full.
pub async fn send_pass_through(
    addr: BluetoothAddress,
    operation: PassThroughOperation,
    key_state: KeyState,
) -> Result<(), AvrcpError> {
    request(Request::PassThrough(
        addr,
        PassThroughCommand::new(operation, key_state),
    ))
    .await
}

/// Send a UNIT INFO or SUB UNIT INFO command to a peer.
///
/// # Errors
///
/// Returns an error if the peer is not connected or the queue is full.
pub async fn send_unit_info(
    addr: BluetoothAddress,
    kind: UnitInfoKind,
) -> Result<(), AvrcpError> {
    request(Request::UnitInfo(addr, kind)).await
}

/// Send a VENDOR DEPENDENT command to a peer.
///
/// # Errors
///
/// Returns an error if the peer is not connected, the command is disabled
/// for the peer, or the queue is full.
pub async fn send_vendor(
    addr: BluetoothAddress,
    command: VendorCommand,
) -> Result<(), AvrcpError> {
    request(Request::Vendor(addr, command)).await
}

/// Send a browse channel command to a peer.
///
/// # Errors
///
/// Returns an error if the browse channel is not up or the queue is full.
pub async fn send_browse(
    addr: BluetoothAddress,
    command: BrowseCommand,
) -> Result<(), AvrcpError> {
    request(Request::Browse(addr, command)).await
}

/// Forward a transport event into the service task.
///
/// The transport integration calls this for every AVCTP event it produces.
pub async fn deliver_event(event: AvctEvent) {
    EVENT_CHANNEL.sender().send(event).await;
}

fn handle_request<T: AvctTransport>(
    controller: &mut AvrcpController<T>,
    request: Request,
    now: Instant,
) -> Response {
    let result = match request {
        Request::Enable => controller.enable(),
        Request::Disable => {
            controller.disable(now);
            Ok(())
        }
        Request::Connect(addr) => controller.connect(addr, now),
        Request::ConnectBrowse(addr) => controller.connect_browse(addr, now),
        Request::Disconnect(addr) => controller.disconnect(addr, now),
        Request::PassThrough(addr, command) => controller.send_pass_through(addr, command, now),
        Request::UnitInfo(addr, kind) => controller.send_unit_info(addr, kind, now),
        Request::Vendor(addr, command) => controller.send_vendor(addr, command, now),
        Request::Browse(addr, command) => controller.send_browse(addr, command, now),
    };
    match result {
        Ok(()) => Response::Ok,
        Err(e) => Response::Error(e),
    }
}

/// The AVRCP service task
///
/// Owns the controller and multiplexes API requests, transport events and
/// the timer tick. Spawn once as an Embassy task.
pub async fn run<T: AvctTransport>(mut controller: AvrcpController<T>) -> ! {
    let mut ticker = Ticker::every(TIMER_POLL_INTERVAL);
    loop {
        match select3(
            REQUEST_CHANNEL.receiver().receive(),
            EVENT_CHANNEL.receiver().receive(),
            ticker.next(),
        )
        .await
        {
            Either3::First(req) => {
                defmt::debug!("[SERVICE] request: {:?}", defmt::Debug2Format(&req));
                let response = handle_request(&mut controller, req, Instant::now());
                RESPONSE_CHANNEL.sender().send(response).await;
            }
            Either3::Second(event) => {
                defmt::debug!("[SERVICE] event: {:?}", defmt::Debug2Format(&event));
                controller.process_event(event, Instant::now());
            }
            Either3::Third(()) => {
                controller.poll_timers(Instant::now());
            }
        }
    }
}
