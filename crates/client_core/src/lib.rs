//! Client side of the live truck feed: a reference-counted registry of
//! streaming connections and the keyed list view that renders them.

pub mod error;
pub mod http;
pub mod list_view;
pub mod live;
pub mod manager;
pub mod transport;

pub use error::ClientError;
pub use http::TruckFeedClient;
pub use list_view::{
    diff_by_key, Keyed, MountId, RenderedList, RenderedRow, RowChange, TruckList,
    TruckListProps,
};
pub use live::{LiveTruckList, TruckSource};
pub use manager::{ConnectionManager, DecodeFailure, Snapshot, Subscription};
pub use transport::{Transport, TransportConnection, TransportEvent, WsTransport};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
