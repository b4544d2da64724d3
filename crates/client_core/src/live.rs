use shared::domain::Truck;

use crate::{
    error::ClientError,
    list_view::{RenderedList, TruckList, TruckListProps},
    manager::{ConnectionManager, Subscription},
};

/// Where the rows of a [`LiveTruckList`] come from. The header always
/// follows the live connection status.
#[derive(Debug, Clone)]
pub enum TruckSource {
    Live,
    Props(TruckListProps),
}

/// A [`TruckList`] mounted on a live endpoint. Dropping it releases the
/// subscription.
pub struct LiveTruckList {
    subscription: Subscription,
    view: TruckList,
    source: TruckSource,
}

impl LiveTruckList {
    pub fn mount(
        manager: &ConnectionManager,
        endpoint: &str,
        source: TruckSource,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            subscription: manager.subscribe(endpoint)?,
            view: TruckList::new(),
            source,
        })
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn set_props(&mut self, props: TruckListProps) {
        self.source = TruckSource::Props(props);
    }

    pub fn render(&mut self) -> RenderedList {
        let status = self.subscription.status();
        match &self.source {
            TruckSource::Live => {
                let snapshot = self.subscription.latest();
                let trucks: &[Truck] = snapshot
                    .as_deref()
                    .map_or(&[][..], |snapshot| snapshot.trucks.as_slice());
                self.view.render(status, trucks)
            }
            TruckSource::Props(props) => self.view.render(status, &props.trucks),
        }
    }

    /// Waits for the subscription to change and renders the result. `None`
    /// once the list has been unmounted.
    pub async fn next_render(&mut self) -> Option<RenderedList> {
        if !self.subscription.changed().await {
            return None;
        }
        Some(self.render())
    }

    pub fn unmount(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
#[path = "tests/live_tests.rs"]
mod tests;
