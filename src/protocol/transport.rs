//! Link implementations that need no hardware.
//!
//! Concrete device links live in `adapters::ws_link`.  The service is
//! generic over [`Link`], so swapping the transport requires no changes
//! to the sync or connection logic.

use crate::app::ports::{Link, LinkError, LinkEvent};

/// A link that never connects.  Sends fail with
/// [`LinkError::NotConnected`] and no events are ever produced.
///
/// Stands in for the server link in host simulations with no peer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLink;

impl Link for NullLink {
    fn connect(&mut self, _uri: &str) -> Result<(), LinkError> {
        Err(LinkError::ConnectFailed)
    }

    fn disconnect(&mut self) {}

    fn send(&mut self, _text: &str) -> Result<(), LinkError> {
        Err(LinkError::NotConnected)
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        None
    }
}
