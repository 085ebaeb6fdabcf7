//! Control center portal access
//!
//! The monitor only talks to the portal through [`PortalClient`]; the concrete
//! [`ControlCenterClient`] owns the endpoints, headers and response shapes.

pub mod control_center;
pub mod html;
pub mod http;
pub mod payload;

use crate::error::PortalResult;
use crate::models::{ConsumptionSnapshot, ConsumptionSummary, RefillResult};
use crate::session::Session;
use async_trait::async_trait;

pub use control_center::ControlCenterClient;
pub use http::PortalHttp;

pub const DEFAULT_BASE_URL: &str = "https://control-center.1und1.de";

/// Operations the monitor needs from the portal.
///
/// Implementations report a rejected session as
/// [`PortalError::AuthExpired`](crate::error::PortalError::AuthExpired) and nothing else,
/// so callers can re-authenticate and retry.
#[async_trait]
pub trait PortalClient: Send + Sync {
    /// Current consumption; an unparseable body yields a zeroed snapshot
    async fn fetch_snapshot(&self, session: &mut Session, contract_id: &str) -> PortalResult<ConsumptionSnapshot>;

    /// Ask for more high-speed volume. Answered rejections are `Ok` with `success == false`.
    async fn request_refill(&self, session: &mut Session, contract_id: &str) -> PortalResult<RefillResult>;

    /// Full consumption breakdown for display
    async fn fetch_summary(&self, session: &mut Session, contract_id: &str) -> PortalResult<ConsumptionSummary>;

    /// Contract id exposed to a guest session, if any
    async fn guest_contract_id(&self, session: &mut Session) -> PortalResult<Option<String>>;
}
